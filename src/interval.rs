use crate::expr::Expr;

/// A closed range of values. A missing end is unbounded in that direction. The ends may be
/// arbitrary expressions; consumers that need literals must check for themselves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interval {
    pub min: Option<Expr>,
    pub max: Option<Expr>,
}

impl Interval {
    pub fn new(min: Option<Expr>, max: Option<Expr>) -> Self {
        Self { min, max }
    }

    pub fn bounded(min: Expr, max: Expr) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn single_point(value: Expr) -> Self {
        Self::new(Some(value.clone()), Some(value))
    }

    pub fn everything() -> Self {
        Self::new(None, None)
    }

    pub fn is_everything(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Alignment knowledge: the value equals `modulus * k + remainder` for some integer `k`.
/// A modulus of zero means the value is exactly `remainder`; a modulus of one says nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModulusRemainder {
    pub modulus: i64,
    pub remainder: i64,
}

impl ModulusRemainder {
    pub const fn new(modulus: i64, remainder: i64) -> Self {
        Self { modulus, remainder }
    }

    pub const fn unknown() -> Self {
        Self::new(1, 0)
    }

    pub const fn exactly(value: i64) -> Self {
        Self::new(0, value)
    }
}

impl Default for ModulusRemainder {
    fn default() -> Self {
        Self::unknown()
    }
}
