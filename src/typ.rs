#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    /// Truncated float: the high half of an IEEE single.
    BFloat,
}

impl Default for TypeCode {
    fn default() -> Self {
        Self::Int
    }
}

/// The type of an expression: a scalar kind, its bit width and the number of vector lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    code: TypeCode,
    bits: u8,
    lanes: u16,
}

#[allow(non_upper_case_globals)]
impl Type {
    pub const Bool: Self = Self::new(TypeCode::UInt, 1, 1);
    pub const Int8: Self = Self::int(8);
    pub const Int16: Self = Self::int(16);
    pub const Int32: Self = Self::int(32);
    pub const Int64: Self = Self::int(64);
    pub const UInt8: Self = Self::uint(8);
    pub const UInt16: Self = Self::uint(16);
    pub const UInt32: Self = Self::uint(32);
    pub const UInt64: Self = Self::uint(64);
    pub const Float32: Self = Self::float(32);
    pub const Float64: Self = Self::float(64);
    pub const BFloat16: Self = Self::bfloat(16);

    pub const fn new(code: TypeCode, bits: u8, lanes: u16) -> Self {
        Self { code, bits, lanes }
    }

    pub const fn int(bits: u8) -> Self {
        Self::new(TypeCode::Int, bits, 1)
    }

    pub const fn uint(bits: u8) -> Self {
        Self::new(TypeCode::UInt, bits, 1)
    }

    pub const fn float(bits: u8) -> Self {
        Self::new(TypeCode::Float, bits, 1)
    }

    pub const fn bfloat(bits: u8) -> Self {
        Self::new(TypeCode::BFloat, bits, 1)
    }

    pub const fn code(&self) -> TypeCode {
        self.code
    }

    pub const fn bits(&self) -> u8 {
        self.bits
    }

    pub const fn lanes(&self) -> u16 {
        self.lanes
    }

    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self { lanes, ..self }
    }

    pub const fn with_code(self, code: TypeCode) -> Self {
        Self { code, ..self }
    }

    pub const fn with_bits(self, bits: u8) -> Self {
        Self { bits, ..self }
    }

    pub const fn element_of(self) -> Self {
        self.with_lanes(1)
    }

    pub const fn is_bool(&self) -> bool {
        match self.code {
            TypeCode::UInt => self.bits == 1,
            _ => false,
        }
    }

    pub const fn is_int(&self) -> bool {
        match self.code {
            TypeCode::Int => true,
            _ => false,
        }
    }

    pub const fn is_uint(&self) -> bool {
        match self.code {
            TypeCode::UInt => true,
            _ => false,
        }
    }

    /// True for both IEEE floats and the truncated bfloat format.
    pub const fn is_float(&self) -> bool {
        match self.code {
            TypeCode::Float | TypeCode::BFloat => true,
            _ => false,
        }
    }

    pub const fn is_bfloat(&self) -> bool {
        match self.code {
            TypeCode::BFloat => true,
            _ => false,
        }
    }

    pub const fn is_vector(&self) -> bool {
        self.lanes > 1
    }

    pub const fn is_scalar(&self) -> bool {
        self.lanes == 1
    }

    /// Signed integers of at least 32 bits are assumed not to overflow, as in most compiler IRs.
    pub const fn can_overflow(&self) -> bool {
        !(self.is_int() && self.bits >= 32)
    }

    /// Smallest value of a signed integer type of this width.
    pub const fn int_min(&self) -> i64 {
        i64::MIN >> (64 - self.bits as u32)
    }

    /// Largest value of a signed integer type of this width.
    pub const fn int_max(&self) -> i64 {
        i64::MAX >> (64 - self.bits as u32)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_bool() {
            write!(f, "bool")?;
        } else {
            match self.code {
                TypeCode::Int => write!(f, "int{}", self.bits)?,
                TypeCode::UInt => write!(f, "uint{}", self.bits)?,
                TypeCode::Float => write!(f, "float{}", self.bits)?,
                TypeCode::BFloat => write!(f, "bfloat{}", self.bits)?,
            }
        }

        if self.is_vector() {
            write!(f, "x{}", self.lanes)?;
        }

        Ok(())
    }
}
