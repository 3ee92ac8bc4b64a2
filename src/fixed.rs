//! Signed Q4.4 fixed point, the encoding of the stimulus current on `ui_in`.

use std::fmt;

/// Signed fixed point with 4 integer and 4 fractional bits, stored as the raw
/// two's-complement byte scaled by 16. Covers -8.0 to 7.9375 in steps of 1/16.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Q4_4(i8);

impl Q4_4 {
    pub const SCALE: f64 = 16.0;
    pub const MIN: Q4_4 = Q4_4(i8::MIN);
    pub const MAX: Q4_4 = Q4_4(i8::MAX);

    /// Nearest representable value, saturating at the range limits.
    ///
    /// Ties round to even. NaN encodes as zero.
    pub fn from_f64(value: f64) -> Self {
        let raw = (value * Self::SCALE).round_ties_even();
        if raw.is_nan() {
            return Q4_4(0);
        }
        Q4_4(raw.clamp(f64::from(i8::MIN), f64::from(i8::MAX)) as i8)
    }

    pub const fn from_raw(raw: i8) -> Self {
        Q4_4(raw)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Q4_4(bits as i8)
    }

    pub const fn raw(self) -> i8 {
        self.0
    }

    /// Two's-complement bit pattern, as driven onto an 8-bit bus.
    pub const fn bits(self) -> u8 {
        self.0 as u8
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / Self::SCALE
    }
}

impl fmt::Display for Q4_4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.to_f64(), self.bits())
    }
}

/// Encodes `value` as a Q4.4 byte ready for an 8-bit input bus.
pub fn q4_4(value: f64) -> u8 {
    Q4_4::from_f64(value).bits()
}
