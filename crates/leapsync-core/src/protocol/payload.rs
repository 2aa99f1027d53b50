//! Input event kinds and their payload encodings.
//!
//! Payload layouts (before SLIP framing):
//! ```text
//! Button     [key_code:1][state_tag:1]
//! Stick      "(" ±dddd "," ±dddd ")" [tag:1]
//! Touch      "(" ±ddd "," ±ddd ")" [tag:1]
//! Motion     "(" x "," y "," z ")" [tag:1]   width per PayloadFormat
//! ```
//! Numeric fields are zero-padded signed decimals of a fixed width, where the
//! width includes the minus sign (`-7` at width 4 is `-007`).  Because every
//! width is fixed, the payload length is a pure function of the event kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::slip::encode_frame;

// ── Tags ──────────────────────────────────────────────────────────────────────

/// The trailing byte identifying which channel produced a payload.
///
/// For buttons the tag doubles as the pressed/released flag.  None of these
/// values collide with the SLIP reserved bytes, so tags never need escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelTag {
    Released = 0xF0,
    Pressed = 0xF1,
    CirclePad = 0xF2,
    CStick = 0xF3,
    Touch = 0xF4,
    Gyro = 0xF5,
    Accel = 0xF6,
}

impl TryFrom<u8> for ChannelTag {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0xF0 => Ok(ChannelTag::Released),
            0xF1 => Ok(ChannelTag::Pressed),
            0xF2 => Ok(ChannelTag::CirclePad),
            0xF3 => Ok(ChannelTag::CStick),
            0xF4 => Ok(ChannelTag::Touch),
            0xF5 => Ok(ChannelTag::Gyro),
            0xF6 => Ok(ChannelTag::Accel),
            _ => Err(()),
        }
    }
}

// ── Event kinds ───────────────────────────────────────────────────────────────

/// Edge direction of a button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    /// The tag byte written after the key code.
    pub fn tag(self) -> ChannelTag {
        match self {
            ButtonState::Pressed => ChannelTag::Pressed,
            ButtonState::Released => ChannelTag::Released,
        }
    }
}

/// The two analog sticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stick {
    CirclePad,
    CStick,
}

/// The two three-axis motion sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionSensor {
    Gyro,
    Accel,
}

/// A single channel change, ready to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down or came up.
    Button { code: u8, state: ButtonState },
    /// An analog stick moved.
    Stick { stick: Stick, x: i32, y: i32 },
    /// The touch position changed.
    Touch { x: i32, y: i32 },
    /// A motion sensor reading changed.
    Motion {
        sensor: MotionSensor,
        x: i32,
        y: i32,
        z: i32,
    },
}

impl InputEvent {
    /// The tag byte that terminates this event's payload.
    pub fn tag(&self) -> ChannelTag {
        match self {
            InputEvent::Button { state, .. } => state.tag(),
            InputEvent::Stick { stick, .. } => match stick {
                Stick::CirclePad => ChannelTag::CirclePad,
                Stick::CStick => ChannelTag::CStick,
            },
            InputEvent::Touch { .. } => ChannelTag::Touch,
            InputEvent::Motion { sensor, .. } => match sensor {
                MotionSensor::Gyro => ChannelTag::Gyro,
                MotionSensor::Accel => ChannelTag::Accel,
            },
        }
    }

    /// Length in bytes of this event's payload under `format`.
    pub fn payload_len(&self, format: &PayloadFormat) -> usize {
        match self {
            InputEvent::Button { .. } => 2,
            InputEvent::Stick { .. } | InputEvent::Touch { .. } => {
                // "(" a "," b ")" tag
                2 * format.width_for(self).digits() + 4
            }
            InputEvent::Motion { .. } => 3 * format.width_for(self).digits() + 5,
        }
    }
}

// ── Field widths ──────────────────────────────────────────────────────────────

/// Named fixed field widths.  Each width counts the sign character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldWidth {
    /// 3 characters, used for touch coordinates.
    Touch,
    /// 4 characters, used for stick axes and the narrow motion encoding.
    Narrow,
    /// 5 characters, the wide motion encoding.
    Wide,
}

impl FieldWidth {
    /// Number of characters a field occupies.
    pub fn digits(self) -> usize {
        match self {
            FieldWidth::Touch => 3,
            FieldWidth::Narrow => 4,
            FieldWidth::Wide => 5,
        }
    }
}

/// Per-channel width selection.
///
/// Stick and touch widths are fixed by the wire format.  The two motion
/// sensors have been deployed with both the narrow and the wide encoding, so
/// each can be chosen independently; changing either changes wire
/// compatibility with the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFormat {
    pub gyro: FieldWidth,
    pub accel: FieldWidth,
}

impl Default for PayloadFormat {
    fn default() -> Self {
        Self {
            gyro: FieldWidth::Narrow,
            accel: FieldWidth::Wide,
        }
    }
}

impl PayloadFormat {
    /// The width used for every numeric field of `event`.
    pub fn width_for(&self, event: &InputEvent) -> FieldWidth {
        match event {
            InputEvent::Button { .. } | InputEvent::Stick { .. } => FieldWidth::Narrow,
            InputEvent::Touch { .. } => FieldWidth::Touch,
            InputEvent::Motion { sensor, .. } => match sensor {
                MotionSensor::Gyro => self.gyro,
                MotionSensor::Accel => self.accel,
            },
        }
    }
}

/// Errors produced while building a payload.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PayloadError {
    /// A component needs more characters than its fixed field width allows.
    #[error("value {value} does not fit in a {width}-character field")]
    FieldOverflow { value: i32, width: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds the unframed payload for `event`.
///
/// # Errors
///
/// Returns [`PayloadError::FieldOverflow`] when a component is outside the
/// range its field width can represent.  Callers are expected to clamp to the
/// sensor's physical range first.
///
/// # Examples
///
/// ```rust
/// use leapsync_core::protocol::payload::{
///     build_payload, ChannelTag, InputEvent, PayloadFormat, Stick,
/// };
///
/// let event = InputEvent::Stick {
///     stick: Stick::CirclePad,
///     x: 12,
///     y: -7,
/// };
/// let payload = build_payload(&event, &PayloadFormat::default()).unwrap();
/// assert_eq!(&payload[..11], b"(0012,-007)");
/// assert_eq!(payload[11], ChannelTag::CirclePad as u8);
/// ```
pub fn build_payload(event: &InputEvent, format: &PayloadFormat) -> Result<Vec<u8>, PayloadError> {
    let mut buf = Vec::with_capacity(event.payload_len(format));
    let width = format.width_for(event).digits();
    match *event {
        InputEvent::Button { code, state } => {
            buf.push(code);
            buf.push(state.tag() as u8);
            return Ok(buf);
        }
        InputEvent::Stick { x, y, .. } | InputEvent::Touch { x, y } => {
            write_tuple(&mut buf, &[x, y], width)?;
        }
        InputEvent::Motion { x, y, z, .. } => {
            write_tuple(&mut buf, &[x, y, z], width)?;
        }
    }
    buf.push(event.tag() as u8);
    Ok(buf)
}

/// Builds the payload for `event` and wraps it in a SLIP frame.
///
/// # Errors
///
/// Propagates [`PayloadError`] from [`build_payload`].
pub fn encode_event(event: &InputEvent, format: &PayloadFormat) -> Result<Vec<u8>, PayloadError> {
    build_payload(event, format).map(|payload| encode_frame(&payload))
}

fn write_tuple(buf: &mut Vec<u8>, values: &[i32], width: usize) -> Result<(), PayloadError> {
    buf.push(b'(');
    for (i, &value) in values.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        let field = format!("{value:0width$}");
        if field.len() > width {
            return Err(PayloadError::FieldOverflow { value, width });
        }
        buf.extend_from_slice(field.as_bytes());
    }
    buf.push(b')');
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::slip::END;

    fn payload(event: InputEvent) -> Vec<u8> {
        build_payload(&event, &PayloadFormat::default()).expect("payload must build")
    }

    fn button(code: u8, state: ButtonState) -> InputEvent {
        InputEvent::Button { code, state }
    }

    fn stick(stick: Stick, x: i32, y: i32) -> InputEvent {
        InputEvent::Stick { stick, x, y }
    }

    fn motion(sensor: MotionSensor, x: i32, y: i32, z: i32) -> InputEvent {
        InputEvent::Motion { sensor, x, y, z }
    }

    fn overflow(value: i32, width: usize) -> Result<Vec<u8>, PayloadError> {
        Err(PayloadError::FieldOverflow { value, width })
    }

    // ── Buttons ───────────────────────────────────────────────────────────────

    #[test]
    fn test_button_press_payload_is_code_and_tag() {
        let p = payload(button(0x01, ButtonState::Pressed));
        assert_eq!(p, vec![0x01, ChannelTag::Pressed as u8]);
    }

    #[test]
    fn test_button_press_frame_is_three_bytes() {
        // Arrange
        let event = button(0x01, ButtonState::Pressed);

        // Act
        let frame = encode_event(&event, &PayloadFormat::default()).unwrap();

        // Assert
        assert_eq!(frame, vec![0x01, ChannelTag::Pressed as u8, END]);
    }

    #[test]
    fn test_button_code_colliding_with_end_is_escaped() {
        let event = button(0xC0, ButtonState::Released);
        let frame = encode_event(&event, &PayloadFormat::default()).unwrap();
        assert_eq!(frame, vec![0xDB, 0xDC, ChannelTag::Released as u8, END]);
    }

    // ── Sticks / touch ────────────────────────────────────────────────────────

    #[test]
    fn test_circle_pad_payload_matches_wire_layout() {
        let p = payload(stick(Stick::CirclePad, 12, -7));
        let mut expected = b"(0012,-007)".to_vec();
        expected.push(ChannelTag::CirclePad as u8);
        assert_eq!(p, expected);
    }

    #[test]
    fn test_circle_pad_frame_has_no_escapes() {
        // Arrange
        let event = stick(Stick::CirclePad, 12, -7);

        // Act
        let frame = encode_event(&event, &PayloadFormat::default()).unwrap();

        // Assert – payload bytes + one END, nothing escaped
        assert_eq!(frame.len(), 13);
        assert_eq!(&frame[..11], b"(0012,-007)");
        assert_eq!(frame[11], ChannelTag::CirclePad as u8);
        assert_eq!(frame[12], END);
    }

    #[test]
    fn test_c_stick_uses_its_own_tag() {
        let p = payload(stick(Stick::CStick, -156, 156));
        assert_eq!(&p[..11], b"(-156,0156)");
        assert_eq!(*p.last().unwrap(), ChannelTag::CStick as u8);
    }

    #[test]
    fn test_touch_uses_three_character_fields() {
        let p = payload(InputEvent::Touch { x: 5, y: 239 });
        assert_eq!(&p[..9], b"(005,239)");
        assert_eq!(p[9], ChannelTag::Touch as u8);
    }

    #[test]
    fn test_touch_x_past_three_digits_overflows() {
        let event = InputEvent::Touch { x: 1000, y: 0 };
        let result = build_payload(&event, &PayloadFormat::default());
        assert_eq!(result, overflow(1000, 3));
    }

    // ── Motion ────────────────────────────────────────────────────────────────

    #[test]
    fn test_gyro_default_is_narrow() {
        let p = payload(motion(MotionSensor::Gyro, 1, -2, 300));
        assert_eq!(&p[..16], b"(0001,-002,0300)");
        assert_eq!(p[16], ChannelTag::Gyro as u8);
    }

    #[test]
    fn test_accel_default_is_wide() {
        let p = payload(motion(MotionSensor::Accel, -512, 0, 9999));
        assert_eq!(&p[..19], b"(-0512,00000,09999)");
        assert_eq!(p[19], ChannelTag::Accel as u8);
    }

    #[test]
    fn test_gyro_can_use_wide_encoding() {
        let format = PayloadFormat {
            gyro: FieldWidth::Wide,
            ..PayloadFormat::default()
        };
        let event = motion(MotionSensor::Gyro, -9999, 0, 0);
        let p = build_payload(&event, &format).unwrap();
        assert_eq!(&p[..19], b"(-9999,00000,00000)");
    }

    #[test]
    fn test_narrow_negative_past_three_digits_overflows() {
        // "-1000" needs 5 characters
        let event = motion(MotionSensor::Gyro, 0, -1000, 0);
        let result = build_payload(&event, &PayloadFormat::default());
        assert_eq!(result, overflow(-1000, 4));
    }

    #[test]
    fn test_narrow_field_boundaries_fit() {
        let p = payload(stick(Stick::CirclePad, 9999, -999));
        assert_eq!(&p[..11], b"(9999,-999)");
    }

    // ── Lengths / tags ────────────────────────────────────────────────────────

    #[test]
    fn test_payload_len_is_pure_function_of_kind() {
        let format = PayloadFormat::default();
        let cases = [
            button(3, ButtonState::Released),
            stick(Stick::CStick, -1, 1),
            InputEvent::Touch { x: 0, y: 0 },
            motion(MotionSensor::Gyro, 0, 0, 0),
            motion(MotionSensor::Accel, -1, -1, -1),
        ];
        for event in cases {
            assert_eq!(
                build_payload(&event, &format).unwrap().len(),
                event.payload_len(&format),
                "length mismatch for {event:?}"
            );
        }
    }

    #[test]
    fn test_channel_tag_try_from_round_trips() {
        for tag in [
            ChannelTag::Released,
            ChannelTag::Pressed,
            ChannelTag::CirclePad,
            ChannelTag::CStick,
            ChannelTag::Touch,
            ChannelTag::Gyro,
            ChannelTag::Accel,
        ] {
            assert_eq!(ChannelTag::try_from(tag as u8), Ok(tag));
        }
        assert_eq!(ChannelTag::try_from(0xC0), Err(()));
    }
}
