//! TOML replay input source.
//!
//! Lets the client binary run on a host without the handheld's input
//! hardware.  A replay file lists ticks in order:
//!
//! ```toml
//! looping = false
//!
//! [[tick]]
//! repeat = 30                       # hold this sample for 30 ticks
//! circle_pad = { dx = 12, dy = -7 }
//!
//! [[tick]]
//! buttons = { down = 1 }            # KEY_A pressed
//!
//! [[tick]]
//! buttons = { up = 1 }              # KEY_A released
//! ```
//!
//! Every field of a tick is optional and defaults to zero.  `down` and `up`
//! are edge masks, so a repeated tick only reports them on its first
//! repetition; `held` and the analog channels persist for every repetition.

use std::path::{Path, PathBuf};

use leapsync_core::InputSample;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::InputSource;

/// Errors raised while loading a replay file.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The file could not be read.
    #[error("could not read replay file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid replay script.
    #[error("failed to parse replay TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    looping: bool,
    #[serde(default, rename = "tick")]
    ticks: Vec<ReplayTick>,
}

#[derive(Debug, Deserialize)]
struct ReplayTick {
    #[serde(default = "default_repeat")]
    repeat: u32,
    #[serde(flatten)]
    sample: InputSample,
}

fn default_repeat() -> u32 {
    1
}

/// An [`InputSource`] that plays back a parsed replay script.
#[derive(Debug)]
pub struct ReplayInputSource {
    ticks: Vec<ReplayTick>,
    looping: bool,
    index: usize,
    repetition: u32,
}

impl ReplayInputSource {
    /// Parses a replay script from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Parse`] if the text is not a valid script.
    pub fn from_toml(text: &str) -> Result<Self, ReplayError> {
        let script: ReplayScript = toml::from_str(text)?;
        debug!(
            ticks = script.ticks.len(),
            looping = script.looping,
            "replay script loaded"
        );
        Ok(Self {
            ticks: script.ticks.into_iter().filter(|t| t.repeat > 0).collect(),
            looping: script.looping,
            index: 0,
            repetition: 0,
        })
    }

    /// Reads and parses the replay script at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] if the file cannot be read and
    /// [`ReplayError::Parse`] if it is malformed.
    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Total number of ticks one pass over the script produces.
    pub fn len(&self) -> usize {
        self.ticks.iter().map(|t| t.repeat as usize).sum()
    }

    /// `true` when the script contains no ticks.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl InputSource for ReplayInputSource {
    fn next_sample(&mut self) -> Option<InputSample> {
        if self.index >= self.ticks.len() {
            if !self.looping || self.ticks.is_empty() {
                return None;
            }
            self.index = 0;
            self.repetition = 0;
        }

        let tick = &self.ticks[self.index];
        let mut sample = tick.sample;
        if self.repetition > 0 {
            sample.buttons.down = 0;
            sample.buttons.up = 0;
        }

        self.repetition += 1;
        if self.repetition >= tick.repeat {
            self.index += 1;
            self.repetition = 0;
        }
        Some(sample)
    }
}
