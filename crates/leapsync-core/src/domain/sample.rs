//! One tick's worth of raw input, as read from the device.
//!
//! These are plain data: the core never talks to hardware.  Whatever reads
//! the device fills in an [`InputSample`] and hands it to the differ.

use serde::{Deserialize, Serialize};

/// The three button masks the hardware reports each scan.
///
/// `down` and `up` are edge masks (bits set only on the scan where the key
/// changed); `held` is a level mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonMasks {
    pub down: u32,
    pub held: u32,
    pub up: u32,
}

/// Analog stick deflection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickPosition {
    pub dx: i16,
    pub dy: i16,
}

/// Touch screen coordinate in pixels.  `(0, 0)` while nothing touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchPosition {
    pub px: u16,
    pub py: u16,
}

/// Gyroscope angular rate per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngularRate {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Accelerometer reading per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelVector {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Every tracked channel for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSample {
    pub buttons: ButtonMasks,
    pub circle_pad: StickPosition,
    pub c_stick: StickPosition,
    pub touch: TouchPosition,
    pub gyro: AngularRate,
    pub accel: AccelVector,
}

impl InputSample {
    /// A sample with only the button masks set.
    pub fn with_buttons(down: u32, held: u32, up: u32) -> Self {
        Self {
            buttons: ButtonMasks { down, held, up },
            ..Self::default()
        }
    }
}
