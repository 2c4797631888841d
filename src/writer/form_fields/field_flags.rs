//! Field and annotation flags read from form dictionaries.
//!
//! Field flags (`/Ff`) follow ISO 32000-1:2008 Section 12.7.3; annotation
//! flags (`/F`) follow Section 12.5.3. Only the bits this crate acts on are
//! named, unknown bits are kept by `from_bits_retain`.

use bitflags::bitflags;

bitflags! {
    /// Text field flags (field type Tx), PDF spec Table 228.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextFieldFlags: u32 {
        /// Bit 1: Field is read-only
        const READ_ONLY = 1 << 0;
        /// Bit 13: Text may include multiple lines
        const MULTILINE = 1 << 12;
        /// Bit 14: Text is displayed as asterisks
        const PASSWORD = 1 << 13;
        /// Bit 25: Field is divided into equally spaced positions
        const COMB = 1 << 24;
    }
}

bitflags! {
    /// Button field flags (field type Btn), PDF spec Table 226.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ButtonFieldFlags: u32 {
        /// Bit 1: Field is read-only
        const READ_ONLY = 1 << 0;
        /// Bit 15: At least one radio in the group must stay on
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Bit 16: Radio button group
        const RADIO = 1 << 15;
        /// Bit 17: Push button, retains no value
        const PUSHBUTTON = 1 << 16;
        /// Bit 26: Radios with the same on state turn on together
        const RADIOS_IN_UNISON = 1 << 25;
    }
}

bitflags! {
    /// Widget annotation flags (`/F`), PDF spec Table 165.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AnnotationFlags: u32 {
        /// Bit 1: Do not render unknown annotation types
        const INVISIBLE = 1 << 0;
        /// Bit 2: Never display or print
        const HIDDEN = 1 << 1;
        /// Bit 3: Print the annotation
        const PRINT = 1 << 2;
        /// Bit 6: Display nothing on screen, may still print
        const NO_VIEW = 1 << 5;
    }
}

/// Convert a raw `/Ff` or `/F` integer into flag bits.
///
/// Negative values come from files that wrote the high bit as a signed
/// 32-bit integer; they keep their bit pattern.
pub fn raw_bits(value: i64) -> u32 {
    value as u32
}

/// Quadding (`/Q`) of variable text.
///
/// Per PDF spec Section 12.7.3.3 (Variable Text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlignment {
    /// Left-aligned (Q=0)
    #[default]
    Left,
    /// Centered (Q=1)
    Center,
    /// Right-aligned (Q=2)
    Right,
}

impl TextAlignment {
    /// Alignment for a `/Q` value; out-of-range values fall back to left.
    pub fn from_q(q: i64) -> Self {
        match q {
            1 => Self::Center,
            2 => Self::Right,
            _ => Self::Left,
        }
    }
}
