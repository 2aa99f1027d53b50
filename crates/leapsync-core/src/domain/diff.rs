//! StateDiffer: decides, per tick, which channels changed.
//!
//! A single [`StateDiffer`] owns the previous value of every channel.  Each
//! call to [`StateDiffer::observe`] compares a fresh sample against that
//! cache, returns the resulting [`ChangeSet`], and then overwrites the cache
//! with the fresh sample whether or not anything changed.
//!
//! # Channel rules
//!
//! - **Buttons** – only edges produce events.  When any of the down/held/up
//!   masks differs from the previous tick, the low 24 bits are scanned in
//!   ascending order; a bit in `down` emits `Pressed`, a bit in `up` emits
//!   `Released`, and for a key present in both the press comes first.  Held
//!   bits never emit.
//! - **Sticks, touch, gyro, accel** – coarse-grained.  Any differing field
//!   marks the whole channel changed and the full tuple is re-sent.

use tracing::trace;

use crate::domain::sample::{ButtonMasks, InputSample};
use crate::keymap::{ConsoleKey, BUTTON_BITS};
use crate::protocol::payload::{ButtonState, InputEvent, MotionSensor, Stick};

/// The ordered events produced by one tick.
///
/// Order is fixed: button edges first, then CirclePad, C-Stick, touch, gyro,
/// accel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    events: Vec<InputEvent>,
}

impl ChangeSet {
    /// `true` when nothing changed this tick.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events in the set.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// The events in emission order.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Iterates the events in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, InputEvent> {
        self.events.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = InputEvent;
    type IntoIter = std::vec::IntoIter<InputEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a InputEvent;
    type IntoIter = std::slice::Iter<'a, InputEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Holds the last-observed value of each channel.
///
/// Every channel starts at zero, so a first sample of all zeros produces no
/// events.
#[derive(Debug, Clone, Default)]
pub struct StateDiffer {
    previous: InputSample,
}

impl StateDiffer {
    /// Creates a differ whose cache is all zeros.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a differ whose cache starts at `initial`.
    pub fn with_initial(initial: InputSample) -> Self {
        Self { previous: initial }
    }

    /// The cached sample from the most recent [`observe`](Self::observe).
    pub fn previous(&self) -> &InputSample {
        &self.previous
    }

    /// Clears the cache back to all zeros.
    pub fn reset(&mut self) {
        self.previous = InputSample::default();
    }

    /// Compares `sample` with the cache, then stores it as the new cache.
    pub fn observe(&mut self, sample: &InputSample) -> ChangeSet {
        let prev = self.previous;
        let mut events = Vec::new();

        if sample.buttons != prev.buttons {
            push_button_edges(&sample.buttons, &mut events);
        }

        if sample.circle_pad != prev.circle_pad {
            events.push(InputEvent::Stick {
                stick: Stick::CirclePad,
                x: sample.circle_pad.dx.into(),
                y: sample.circle_pad.dy.into(),
            });
        }

        if sample.c_stick != prev.c_stick {
            events.push(InputEvent::Stick {
                stick: Stick::CStick,
                x: sample.c_stick.dx.into(),
                y: sample.c_stick.dy.into(),
            });
        }

        if sample.touch != prev.touch {
            events.push(InputEvent::Touch {
                x: sample.touch.px.into(),
                y: sample.touch.py.into(),
            });
        }

        if sample.gyro != prev.gyro {
            events.push(InputEvent::Motion {
                sensor: MotionSensor::Gyro,
                x: sample.gyro.x.into(),
                y: sample.gyro.y.into(),
                z: sample.gyro.z.into(),
            });
        }

        if sample.accel != prev.accel {
            events.push(InputEvent::Motion {
                sensor: MotionSensor::Accel,
                x: sample.accel.x.into(),
                y: sample.accel.y.into(),
                z: sample.accel.z.into(),
            });
        }

        self.previous = *sample;
        ChangeSet { events }
    }
}

fn push_button_edges(masks: &ButtonMasks, events: &mut Vec<InputEvent>) {
    for bit in 0..BUTTON_BITS {
        let Some(key) = ConsoleKey::from_bit(bit) else {
            continue;
        };
        let mask = key.mask();
        if masks.down & mask != 0 {
            trace!(key = %key, "down");
            events.push(InputEvent::Button {
                code: key.code(),
                state: ButtonState::Pressed,
            });
        }
        if masks.held & mask != 0 {
            trace!(key = %key, "held");
        }
        if masks.up & mask != 0 {
            trace!(key = %key, "up");
            events.push(InputEvent::Button {
                code: key.code(),
                state: ButtonState::Released,
            });
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
