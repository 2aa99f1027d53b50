//! Scripted input source for unit testing.
//!
//! Hands out a fixed list of samples in order, then reports exhaustion.

use std::collections::VecDeque;

use leapsync_core::InputSample;

use super::InputSource;

/// An [`InputSource`] that plays back a queue of samples.
#[derive(Debug, Default)]
pub struct ScriptedInputSource {
    samples: VecDeque<InputSample>,
    polls: usize,
}

impl ScriptedInputSource {
    /// Creates a source that yields `samples` in order.
    pub fn new(samples: impl IntoIterator<Item = InputSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            polls: 0,
        }
    }

    /// Appends a sample to the end of the queue.
    pub fn push(&mut self, sample: InputSample) {
        self.samples.push_back(sample);
    }

    /// Number of samples not yet handed out.
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }

    /// Number of times [`next_sample`](InputSource::next_sample) was called.
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl InputSource for ScriptedInputSource {
    fn next_sample(&mut self) -> Option<InputSample> {
        self.polls += 1;
        self.samples.pop_front()
    }
}
