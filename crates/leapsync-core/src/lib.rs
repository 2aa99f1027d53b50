//! # leapsync-core
//!
//! Shared library for LeapSync containing the SLIP frame codec, the input
//! event payload encodings, the per-channel state differ, and the console key
//! table.
//!
//! It has zero dependencies on OS APIs or network sockets: everything in here
//! is a pure transform over in-memory values, so it can be tested without a
//! device or a listener.
//!
//! # Architecture overview (for beginners)
//!
//! LeapSync mirrors the physical controls of a handheld console to a remote
//! listener.  Every tick the client samples the buttons, both sticks, the
//! touch screen, the gyroscope and the accelerometer, works out what changed
//! since the previous tick, and sends one small message per change.
//!
//! - **`protocol`** – How bytes travel over the stream.  Each change becomes a
//!   short payload (`protocol::payload`) which is byte-stuffed into a
//!   self-delimited SLIP frame (`protocol::slip`).
//!
//! - **`domain`** – The change-detection model.  [`StateDiffer`] owns the
//!   last-seen value of every channel and turns a fresh [`InputSample`] into a
//!   [`ChangeSet`] of [`InputEvent`]s.
//!
//! - **`keymap`** – The table mapping button bit positions to their names and
//!   to the one-byte key codes used on the wire.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::diff::{ChangeSet, StateDiffer};
pub use domain::sample::{
    AccelVector, AngularRate, ButtonMasks, InputSample, StickPosition, TouchPosition,
};
pub use keymap::ConsoleKey;
pub use protocol::payload::{
    build_payload, encode_event, ButtonState, ChannelTag, FieldWidth, InputEvent, MotionSensor,
    PayloadError, PayloadFormat, Stick,
};
pub use protocol::slip::{decode_frame, encode_frame, FrameDecoder, FramingError};
