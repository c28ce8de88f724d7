/// A 16-bit truncated float: sign, the full 8-bit exponent of an IEEE single, and 7 mantissa bits.
/// Conversion from wider floats drops the low mantissa bits (truncation toward zero), it does not
/// round to nearest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bfloat16(u16);

impl Bfloat16 {
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> u16 {
        self.0
    }

    pub fn from_f32(value: f32) -> Self {
        Self((value.to_bits() >> 16) as u16)
    }

    pub fn from_f64(value: f64) -> Self {
        Self::from_f32(value as f32)
    }

    pub fn to_f32(self) -> f32 {
        f32::from_bits((self.0 as u32) << 16)
    }

    pub fn to_f64(self) -> f64 {
        self.to_f32() as f64
    }
}

impl std::fmt::Display for Bfloat16 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}
