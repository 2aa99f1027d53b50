//! Console button table.
//!
//! The input hardware reports buttons as a 32-bit mask.  Only the low 24 bits
//! are mirrored as button events; the stick-direction bits above them are
//! derived from the stick positions, which travel as their own channel.
//!
//! Bit positions that have no physical key (12, 13, 16–19, 21–23) carry no
//! key code and are never sent.

/// Number of low mask bits scanned for button edges.
pub const BUTTON_BITS: u32 = 24;

/// A physical button with a wire key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleKey {
    A,
    B,
    Select,
    Start,
    DRight,
    DLeft,
    DUp,
    DDown,
    R,
    L,
    X,
    Y,
    ZL,
    ZR,
    Touch,
}

/// Every key, in bit order.
pub const ALL_KEYS: [ConsoleKey; 15] = [
    ConsoleKey::A,
    ConsoleKey::B,
    ConsoleKey::Select,
    ConsoleKey::Start,
    ConsoleKey::DRight,
    ConsoleKey::DLeft,
    ConsoleKey::DUp,
    ConsoleKey::DDown,
    ConsoleKey::R,
    ConsoleKey::L,
    ConsoleKey::X,
    ConsoleKey::Y,
    ConsoleKey::ZL,
    ConsoleKey::ZR,
    ConsoleKey::Touch,
];

impl ConsoleKey {
    /// Looks up the key reported at mask bit `bit`.
    ///
    /// Returns `None` for unassigned bits and for bits at or above
    /// [`BUTTON_BITS`].
    pub fn from_bit(bit: u32) -> Option<Self> {
        ALL_KEYS.iter().copied().find(|k| k.bit() == bit)
    }

    /// Looks up the key that owns wire code `code`.
    pub fn from_code(code: u8) -> Option<Self> {
        ALL_KEYS.iter().copied().find(|k| k.code() == code)
    }

    /// Bit position in the hardware button mask.
    pub fn bit(self) -> u32 {
        match self {
            ConsoleKey::A => 0,
            ConsoleKey::B => 1,
            ConsoleKey::Select => 2,
            ConsoleKey::Start => 3,
            ConsoleKey::DRight => 4,
            ConsoleKey::DLeft => 5,
            ConsoleKey::DUp => 6,
            ConsoleKey::DDown => 7,
            ConsoleKey::R => 8,
            ConsoleKey::L => 9,
            ConsoleKey::X => 10,
            ConsoleKey::Y => 11,
            ConsoleKey::ZL => 14,
            ConsoleKey::ZR => 15,
            ConsoleKey::Touch => 20,
        }
    }

    /// Mask with only this key's bit set.
    pub fn mask(self) -> u32 {
        1 << self.bit()
    }

    /// One-byte key code sent on the wire.
    ///
    /// The listener's table skips 0x09, 0x0A and 0x0D, so the codes are not
    /// contiguous.
    pub fn code(self) -> u8 {
        match self {
            ConsoleKey::A => 0x00,
            ConsoleKey::B => 0x01,
            ConsoleKey::Select => 0x02,
            ConsoleKey::Start => 0x03,
            ConsoleKey::DRight => 0x04,
            ConsoleKey::DLeft => 0x05,
            ConsoleKey::DUp => 0x06,
            ConsoleKey::DDown => 0x07,
            ConsoleKey::R => 0x08,
            ConsoleKey::L => 0x0B,
            ConsoleKey::X => 0x0C,
            ConsoleKey::Y => 0x0E,
            ConsoleKey::ZL => 0x0F,
            ConsoleKey::ZR => 0x10,
            ConsoleKey::Touch => 0x11,
        }
    }

    /// Display name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            ConsoleKey::A => "KEY_A",
            ConsoleKey::B => "KEY_B",
            ConsoleKey::Select => "KEY_SELECT",
            ConsoleKey::Start => "KEY_START",
            ConsoleKey::DRight => "KEY_DRIGHT",
            ConsoleKey::DLeft => "KEY_DLEFT",
            ConsoleKey::DUp => "KEY_DUP",
            ConsoleKey::DDown => "KEY_DDOWN",
            ConsoleKey::R => "KEY_R",
            ConsoleKey::L => "KEY_L",
            ConsoleKey::X => "KEY_X",
            ConsoleKey::Y => "KEY_Y",
            ConsoleKey::ZL => "KEY_ZL",
            ConsoleKey::ZR => "KEY_ZR",
            ConsoleKey::Touch => "KEY_TOUCH",
        }
    }
}

impl std::fmt::Display for ConsoleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<u8> = ALL_KEYS.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), ALL_KEYS.len());
    }

    #[test]
    fn test_bits_are_below_button_bits() {
        for key in ALL_KEYS {
            assert!(key.bit() < BUTTON_BITS, "{key} bit out of range");
        }
    }

    #[test]
    fn test_from_bit_round_trips() {
        for key in ALL_KEYS {
            assert_eq!(ConsoleKey::from_bit(key.bit()), Some(key));
        }
    }

    #[test]
    fn test_unassigned_bits_have_no_key() {
        for bit in [12, 13, 16, 17, 18, 19, 21, 22, 23, 24, 31] {
            assert_eq!(
                ConsoleKey::from_bit(bit),
                None,
                "bit {bit} should be unassigned"
            );
        }
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(ConsoleKey::B.code(), 0x01);
        assert_eq!(ConsoleKey::L.code(), 0x0B);
        assert_eq!(ConsoleKey::Touch.code(), 0x11);
        assert_eq!(ConsoleKey::from_code(0x0E), Some(ConsoleKey::Y));
    }
}
