//! Application layer use cases for the client application.
//!
//! - **`mirror_input`** – One tick of the client: diff the fresh sample
//!   against the previous one, encode each change, and hand the frames to a
//!   [`FrameSink`](crate::infrastructure::network::FrameSink).  Also watches
//!   for the exit chord.

pub mod mirror_input;
