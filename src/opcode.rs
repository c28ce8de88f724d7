/// Arithmetic and bitwise operators. Both operands and the result share one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Euclidean division: the remainder is never negative. Division by zero yields zero.
    Div,
    /// Euclidean modulo, always non-negative for integers. Modulo by zero yields zero.
    Mod,
    Min,
    Max,
    Shl,
    /// Arithmetic for signed integers, logical for unsigned ones.
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    pub const fn is_commutative(self) -> bool {
        match self {
            BinaryOp::Add
            | BinaryOp::Mul
            | BinaryOp::Min
            | BinaryOp::Max
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => true,
            _ => false,
        }
    }

    /// Operators that do not exist on floating point values.
    pub const fn is_bitwise(self) -> bool {
        match self {
            BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => true,
            _ => false,
        }
    }

    /// Min and max print as calls rather than infix operators.
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

/// Comparisons. Operands share a type; the result is a boolean with the operands' lane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompareOp {
    EQ,
    NE,
    LT,
    LE,
    GT,
    GE,
}

impl CompareOp {
    /// The comparison that holds exactly when this one does not.
    pub const fn negate(self) -> Self {
        match self {
            CompareOp::EQ => CompareOp::NE,
            CompareOp::NE => CompareOp::EQ,
            CompareOp::LT => CompareOp::GE,
            CompareOp::LE => CompareOp::GT,
            CompareOp::GT => CompareOp::LE,
            CompareOp::GE => CompareOp::LT,
        }
    }

    /// The comparison obtained by exchanging the operands.
    pub const fn swap(self) -> Self {
        match self {
            CompareOp::EQ => CompareOp::EQ,
            CompareOp::NE => CompareOp::NE,
            CompareOp::LT => CompareOp::GT,
            CompareOp::LE => CompareOp::GE,
            CompareOp::GT => CompareOp::LT,
            CompareOp::GE => CompareOp::LE,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::EQ => "==",
            CompareOp::NE => "!=",
            CompareOp::LT => "<",
            CompareOp::LE => "<=",
            CompareOp::GT => ">",
            CompareOp::GE => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    /// A compiler-known function such as `likely`.
    Intrinsic,
    /// An opaque function defined outside the IR.
    Extern,
    /// A read from a named multi-dimensional buffer. The arguments are its coordinates.
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForType {
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
}

/// The device a loop body runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceApi {
    None,
    Host,
    Cuda,
    OpenCl,
    Metal,
}

impl Default for DeviceApi {
    fn default() -> Self {
        Self::None
    }
}

pub mod intrinsic {
    /// Hint that a boolean is usually true. Transparent for proofs.
    pub const LIKELY: &str = "likely";
    /// Like `likely`, but only meaningful in the innermost loop.
    pub const LIKELY_IF_INNERMOST: &str = "likely_if_innermost";
}

impl std::fmt::Display for ForType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForType::Serial => write!(f, "for"),
            ForType::Parallel => write!(f, "parallel"),
            ForType::Vectorized => write!(f, "vectorized"),
            ForType::Unrolled => write!(f, "unrolled"),
        }
    }
}
