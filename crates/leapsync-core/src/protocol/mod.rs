//! Protocol module containing the SLIP frame codec and the event payloads.

pub mod payload;
pub mod slip;

pub use payload::{build_payload, encode_event, InputEvent, PayloadError, PayloadFormat};
pub use slip::{decode_frame, encode_frame, FrameDecoder, FramingError};
