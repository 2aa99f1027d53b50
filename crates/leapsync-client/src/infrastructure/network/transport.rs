//! Frame transport and the event-emitting boundary.
//!
//! [`Transport`] writes exactly one already-encoded frame to a borrowed
//! stream and flushes it.  There is no buffering across events and no retry:
//! a failed write is handed straight back to the caller.
//!
//! [`FrameSink`] is the seam the application layer writes to.  The
//! connection manager implements it for the live socket; tests implement it
//! with a recorder.  [`EventEmitter`] adds the encode-then-send calls on top
//! of any sink.

use async_trait::async_trait;
use leapsync_core::protocol::payload::{
    encode_event, ButtonState, InputEvent, MotionSensor, PayloadError, PayloadFormat, Stick,
};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Errors raised while writing a frame.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The write or flush failed.
    #[error("write to listener failed: {0}")]
    Io(#[from] std::io::Error),

    /// There is no live connection to write to.
    #[error("not connected")]
    NotConnected,
}

/// Errors raised by the [`EventEmitter`] calls.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The event could not be encoded.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The encoded frame could not be written.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Writes single frames to a borrowed stream.
pub struct Transport<'a, W> {
    stream: &'a mut W,
}

impl<'a, W: AsyncWrite + Unpin> Transport<'a, W> {
    /// Borrows `stream` for writing.
    pub fn new(stream: &'a mut W) -> Self {
        Self { stream }
    }

    /// Writes the whole of `frame` and flushes it.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

/// Destination for encoded frames.
#[async_trait]
pub trait FrameSink: Send {
    /// Sends one complete frame.
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for Transport<'_, W> {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.send(frame).await
    }
}

/// Encode-and-send calls available on every [`FrameSink`].
///
/// Each call builds the payload, frames it and sends it as one unit.
#[async_trait]
pub trait EventEmitter: FrameSink {
    /// Encodes `event` under `format` and sends it.
    async fn emit(&mut self, event: InputEvent, format: PayloadFormat) -> Result<(), EmitError> {
        let frame = encode_event(&event, &format)?;
        self.send_frame(&frame).await?;
        Ok(())
    }

    /// Sends a button edge.
    async fn emit_button(&mut self, code: u8, pressed: bool) -> Result<(), EmitError> {
        let state = if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        };
        self.emit(InputEvent::Button { code, state }, PayloadFormat::default())
            .await
    }

    /// Sends a stick position.
    async fn emit_axis(&mut self, stick: Stick, x: i32, y: i32) -> Result<(), EmitError> {
        self.emit(InputEvent::Stick { stick, x, y }, PayloadFormat::default())
            .await
    }

    /// Sends a motion sensor reading using the widths in `format`.
    async fn emit_motion(
        &mut self,
        sensor: MotionSensor,
        x: i32,
        y: i32,
        z: i32,
        format: PayloadFormat,
    ) -> Result<(), EmitError> {
        self.emit(InputEvent::Motion { sensor, x, y, z }, format).await
    }

    /// Sends a touch position.
    async fn emit_touch(&mut self, x: i32, y: i32) -> Result<(), EmitError> {
        self.emit(InputEvent::Touch { x, y }, PayloadFormat::default())
            .await
    }
}

impl<S: FrameSink + ?Sized> EventEmitter for S {}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use leapsync_core::protocol::payload::ChannelTag;
    use leapsync_core::protocol::slip::END;

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            self.frames.push(frame.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_writes_whole_frame() {
        // Arrange
        let mut stream = tokio_test::io::Builder::new()
            .write(&[0x01, 0xF1, END])
            .build();

        // Act
        let result = Transport::new(&mut stream).send(&[0x01, 0xF1, END]).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_write_error_is_surfaced_not_retried() {
        let gone = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone");
        let mut stream = tokio_test::io::Builder::new().write_error(gone).build();

        let result = Transport::new(&mut stream).send(b"abc").await;

        match result {
            Err(TransportError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected a broken pipe, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_emit_button_sends_three_byte_frame() {
        let mut sink = RecordingSink::default();

        sink.emit_button(0x01, true).await.unwrap();
        sink.emit_button(0x01, false).await.unwrap();

        assert_eq!(
            sink.frames,
            vec![
                vec![0x01, ChannelTag::Pressed as u8, END],
                vec![0x01, ChannelTag::Released as u8, END],
            ]
        );
    }

    #[tokio::test]
    async fn test_emit_axis_sends_tuple_frame() {
        let mut sink = RecordingSink::default();

        sink.emit_axis(Stick::CirclePad, 12, -7).await.unwrap();

        let frame = &sink.frames[0];
        assert_eq!(&frame[..11], b"(0012,-007)");
        assert_eq!(frame[11], ChannelTag::CirclePad as u8);
        assert_eq!(frame[12], END);
    }

    #[tokio::test]
    async fn test_emit_touch_overflow_sends_nothing() {
        let mut sink = RecordingSink::default();

        let result = sink.emit_touch(1000, 0).await;

        assert!(matches!(result, Err(EmitError::Payload(_))));
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn test_emit_motion_honours_format() {
        let mut sink = RecordingSink::default();
        let format = PayloadFormat::default();

        sink.emit_motion(MotionSensor::Accel, 1, 2, 3, format).await.unwrap();

        assert_eq!(&sink.frames[0][..19], b"(00001,00002,00003)");
    }
}
