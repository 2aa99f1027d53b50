//! MirrorInputUseCase: one sample in, zero or more frames out.
//!
//! Each tick the use case diffs the fresh sample against the previous one,
//! encodes every change and writes it to a [`FrameSink`].  It does not know
//! whether the sink is a live socket or a test recorder.
//!
//! # Exit chord
//!
//! Holding START and D-pad DOWN while pressing R asks the client to stop.
//! The check runs after the tick's frames have been sent, so the listener
//! still sees the R press.

use std::time::Duration;

use leapsync_core::protocol::payload::encode_event;
use leapsync_core::{ButtonMasks, ConsoleKey, InputEvent, InputSample, PayloadFormat, StateDiffer};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::infrastructure::input_source::InputSource;
use crate::infrastructure::network::{CancellationFlag, FrameSink, TransportError};

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep ticking.  `sent` frames were written.
    Continue { sent: usize },
    /// The exit chord was pressed.  `sent` frames were written first.
    ExitRequested { sent: usize },
}

/// Why [`MirrorInputUseCase::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ExitChord,
    SourceExhausted,
    Cancelled,
}

/// Totals reported by [`MirrorInputUseCase::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub frames_sent: u64,
    pub stop: StopReason,
}

/// Returns `true` when START and DDOWN are held and R went down this scan.
pub fn is_exit_chord(buttons: &ButtonMasks) -> bool {
    let held = ConsoleKey::Start.mask() | ConsoleKey::DDown.mask();
    buttons.held & held == held && buttons.down & ConsoleKey::R.mask() != 0
}

/// The Mirror Input use case.
pub struct MirrorInputUseCase {
    differ: StateDiffer,
    format: PayloadFormat,
    frames_sent: u64,
    frames_dropped: u64,
}

impl MirrorInputUseCase {
    /// Creates a use case with an all-zero previous sample.
    pub fn new(format: PayloadFormat) -> Self {
        Self {
            differ: StateDiffer::new(),
            format,
            frames_sent: 0,
            frames_dropped: 0,
        }
    }

    /// The payload widths in use.
    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    /// Frames written since creation.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Events skipped because a value did not fit its field.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Processes one sample.
    ///
    /// An event whose value overflows its field width is logged and skipped;
    /// the rest of the tick still goes out.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`TransportError`] on the first failed write.  The
    /// remaining events of the tick are not sent.
    pub async fn tick<S: FrameSink + ?Sized>(
        &mut self,
        sample: &InputSample,
        sink: &mut S,
    ) -> Result<TickOutcome, TransportError> {
        let changes = self.differ.observe(sample);
        let mut sent = 0;

        for event in &changes {
            log_event(event);
            let frame = match encode_event(event, &self.format) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(tag = ?event.tag(), "dropping event: {e}");
                    self.frames_dropped += 1;
                    continue;
                }
            };
            sink.send_frame(&frame).await?;
            sent += 1;
        }
        self.frames_sent += sent as u64;

        if is_exit_chord(&sample.buttons) {
            info!("exit chord pressed");
            Ok(TickOutcome::ExitRequested { sent })
        } else {
            Ok(TickOutcome::Continue { sent })
        }
    }

    /// Ticks every `interval` until the exit chord, source exhaustion or
    /// `cancel` is raised.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first [`TransportError`].
    pub async fn run<S: FrameSink + ?Sized>(
        &mut self,
        source: &mut dyn InputSource,
        sink: &mut S,
        interval: Duration,
        cancel: &CancellationFlag,
    ) -> Result<RunSummary, TransportError> {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0;

        let stop = loop {
            ticker.tick().await;
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            let Some(sample) = source.next_sample() else {
                info!("input source exhausted");
                break StopReason::SourceExhausted;
            };
            ticks += 1;
            if let TickOutcome::ExitRequested { .. } = self.tick(&sample, sink).await? {
                break StopReason::ExitChord;
            }
        };

        Ok(RunSummary {
            ticks,
            frames_sent: self.frames_sent,
            stop,
        })
    }
}

fn log_event(event: &InputEvent) {
    match *event {
        InputEvent::Button { code, state } => match ConsoleKey::from_code(code) {
            Some(key) => debug!(key = %key, ?state, "button"),
            None => debug!(code, ?state, "button"),
        },
        other => debug!(event = ?other, "channel changed"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
