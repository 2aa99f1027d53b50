//! SLIP byte-stuffing codec for framing payloads on a byte stream.
//!
//! Wire format:
//! ```text
//! [stuffed payload:N][END:1]
//! ```
//! `END` (0xC0) inside the payload becomes `ESC ESC_END` (0xDB 0xDC) and
//! `ESC` (0xDB) becomes `ESC ESC_ESC` (0xDB 0xDD).  Every other byte passes
//! through unchanged.
//!
//! # Why byte stuffing? (for beginners)
//!
//! TCP delivers a stream of bytes, not a stream of messages.  If the client
//! writes two messages back to back, the listener may receive them glued
//! together in one read, or split across three reads.  The receiver needs a
//! way to find where one message stops and the next begins.
//!
//! SLIP solves this by reserving one byte value, `END`, as the message
//! terminator.  Because a payload might legitimately contain that value, the
//! encoder rewrites it (and the escape byte itself) as a two-byte escape
//! sequence.  After encoding, the only literal `END` in a frame is the last
//! byte, so a receiver can split the stream by scanning for `END`.

use thiserror::Error;
use tracing::warn;

/// Frame terminator.
pub const END: u8 = 0xC0;
/// Escape marker.
pub const ESC: u8 = 0xDB;
/// Substitute emitted after [`ESC`] for an escaped [`END`].
pub const ESC_END: u8 = 0xDC;
/// Substitute emitted after [`ESC`] for an escaped [`ESC`].
pub const ESC_ESC: u8 = 0xDD;

/// Default cap on the unterminated bytes a [`FrameDecoder`] will buffer.
///
/// The longest LeapSync frame is well under 64 bytes even with every byte
/// escaped.
pub const DEFAULT_MAX_FRAME_LEN: usize = 512;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FramingError {
    /// The frame is empty or its last byte is not [`END`].
    #[error("frame is not terminated by END (0xC0)")]
    MissingTerminator,

    /// An unescaped [`END`] appeared before the terminator.
    #[error("unescaped END at offset {offset} before the frame terminator")]
    UnexpectedEnd { offset: usize },

    /// [`ESC`] was the last byte before the terminator.
    #[error("escape marker at offset {offset} is not followed by a substitute byte")]
    TruncatedEscape { offset: usize },

    /// [`ESC`] was followed by something other than [`ESC_END`] or [`ESC_ESC`].
    #[error("invalid escape substitute 0x{0:02X}")]
    InvalidEscape(u8),

    /// A [`FrameDecoder`] saw more than `limit` bytes without an [`END`] and
    /// dropped them.
    #[error("frame exceeded {limit} bytes without a terminator")]
    FrameTooLong { limit: usize },
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes `payload` into a self-delimited frame.
///
/// # Examples
///
/// ```rust
/// use leapsync_core::protocol::slip::{decode_frame, encode_frame};
///
/// let frame = encode_frame(&[0x01, 0xC0, 0x02]);
/// assert_eq!(frame, vec![0x01, 0xDB, 0xDC, 0x02, 0xC0]);
/// assert_eq!(decode_frame(&frame).unwrap(), vec![0x01, 0xC0, 0x02]);
/// ```
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(payload));
    encode_frame_into(payload, &mut out);
    out
}

/// Appends the frame for `payload` to `out`.
///
/// Lets a caller reuse one buffer across events instead of allocating a new
/// frame each time.
pub fn encode_frame_into(payload: &[u8], out: &mut Vec<u8>) {
    out.reserve(encoded_len(payload));
    for &byte in payload {
        match byte {
            END => out.extend_from_slice(&[ESC, ESC_END]),
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            other => out.push(other),
        }
    }
    out.push(END);
}

/// Returns the exact length of the frame [`encode_frame`] would produce.
pub fn encoded_len(payload: &[u8]) -> usize {
    let escaped = payload.iter().filter(|&&b| b == END || b == ESC).count();
    payload.len() + escaped + 1
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one complete frame (including its trailing [`END`]) back into the
/// original payload.
///
/// # Errors
///
/// Returns [`FramingError`] if the frame is unterminated, contains a stray
/// `END`, or holds a truncated or unknown escape sequence.
pub fn decode_frame(frame: &[u8]) -> Result<Vec<u8>, FramingError> {
    let body = match frame.split_last() {
        Some((&END, body)) => body,
        _ => return Err(FramingError::MissingTerminator),
    };

    let mut payload = Vec::with_capacity(body.len());
    let mut bytes = body.iter().copied().enumerate();
    while let Some((offset, byte)) = bytes.next() {
        match byte {
            END => return Err(FramingError::UnexpectedEnd { offset }),
            ESC => match bytes.next() {
                Some((_, ESC_END)) => payload.push(END),
                Some((_, ESC_ESC)) => payload.push(ESC),
                Some((_, other)) => return Err(FramingError::InvalidEscape(other)),
                None => return Err(FramingError::TruncatedEscape { offset }),
            },
            other => payload.push(other),
        }
    }
    Ok(payload)
}

// ── Streaming splitter ────────────────────────────────────────────────────────

/// Splits a byte stream of concatenated frames back into payloads.
///
/// Bytes may be pushed in chunks of any size; a frame is only yielded once its
/// terminating `END` has arrived.  Empty frames (two `END` bytes in a row) are
/// skipped.  A malformed frame is reported once and the decoder carries on
/// with the bytes after its terminator.
///
/// Memory is bounded: once the unterminated tail grows past the frame limit
/// ([`DEFAULT_MAX_FRAME_LEN`] unless set with
/// [`with_max_frame_len`](Self::with_max_frame_len)), the tail is dropped,
/// everything up to the next `END` is skipped, and the loss is reported as
/// [`FramingError::FrameTooLong`] in stream order.
///
/// ```rust
/// use leapsync_core::protocol::slip::{encode_frame, FrameDecoder};
///
/// let mut stream = encode_frame(b"ab");
/// stream.extend(encode_frame(b"c"));
///
/// let mut decoder = FrameDecoder::new();
/// decoder.push(&stream[..2]);
/// assert!(decoder.next_frame().is_none());
/// decoder.push(&stream[2..]);
/// assert_eq!(decoder.next_frame(), Some(Ok(b"ab".to_vec())));
/// assert_eq!(decoder.next_frame(), Some(Ok(b"c".to_vec())));
/// assert_eq!(decoder.next_frame(), None);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_frame_len: usize,
    /// Skipping bytes until the `END` that closes an oversized frame.
    discarding: bool,
    /// Buffer offset at which a `FrameTooLong` error is due.
    overflow_at: Option<usize>,
    dropped: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameDecoder {
    /// Creates an empty decoder with the default frame limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty decoder that buffers at most `max_frame_len`
    /// unterminated bytes.  A limit of 0 is treated as 1.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_len: max_frame_len.max(1),
            discarding: false,
            overflow_at: None,
            dropped: 0,
        }
    }

    /// Appends raw stream bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|&b| b == END) {
                Some(end) => {
                    self.discarding = false;
                    bytes = &bytes[end + 1..];
                }
                None => return,
            }
        }
        self.buffer.extend_from_slice(bytes);

        let tail_start = self
            .buffer
            .iter()
            .rposition(|&b| b == END)
            .map_or(0, |i| i + 1);
        let tail_len = self.buffer.len() - tail_start;
        if tail_len > self.max_frame_len {
            warn!(
                tail_len,
                limit = self.max_frame_len,
                "unterminated frame too long, resyncing on next END"
            );
            self.buffer.truncate(tail_start);
            self.discarding = true;
            self.dropped += 1;
            self.overflow_at.get_or_insert(tail_start);
        }
    }

    /// Number of oversized frames dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete frame's payload, or `None` if no terminator
    /// has been received yet.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>, FramingError>> {
        loop {
            if self.overflow_at == Some(0) {
                self.overflow_at = None;
                return Some(Err(FramingError::FrameTooLong {
                    limit: self.max_frame_len,
                }));
            }
            let end = self.buffer.iter().position(|&b| b == END)?;
            let frame: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(at) = self.overflow_at.as_mut() {
                *at -= frame.len();
            }
            if frame.len() == 1 {
                continue;
            }
            return Some(decode_frame(&frame));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
