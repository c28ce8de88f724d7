use std::rc::Rc;

use crate::{
    bfloat16::Bfloat16,
    ir_operator::make_const,
    opcode::{intrinsic, BinaryOp, CallType, CompareOp},
    typ::{Type, TypeCode},
};

/// An immutable, reference-counted expression node. Cloning is cheap and shares the subtree;
/// rewrites build new parents over old or new children and never mutate a node in place.
#[derive(Clone)]
pub struct Expr(Rc<ExprNode>);

#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    typ: Type,
    kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Signed literal, sign-extended from the type's width.
    IntImm(i64),
    /// Unsigned literal, masked to the type's width. Booleans are `uint1`.
    UIntImm(u64),
    /// Float literal, already rounded (or truncated for bfloat) to the type's precision.
    FloatImm(f64),
    Variable(String),
    /// Value-preserving conversion.
    Cast(Expr),
    /// Bit-preserving conversion between types of the same total width.
    Reinterpret(Expr),
    Binary(BinaryOp, Expr, Expr),
    Compare(CompareOp, Expr, Expr),
    And(Expr, Expr),
    Or(Expr, Expr),
    Not(Expr),
    Select(Expr, Expr, Expr),
    /// A scalar replicated across the lanes of the node's type.
    Broadcast(Expr),
    Load {
        name: String,
        index: Expr,
    },
    Let {
        name: String,
        value: Expr,
        body: Expr,
    },
    Call {
        name: String,
        call_type: CallType,
        args: Vec<Expr>,
    },
}

pub(crate) fn normalize_int(bits: u8, value: i64) -> i64 {
    if bits >= 64 {
        value
    } else {
        let shift = 64 - bits as u32;
        (value << shift) >> shift
    }
}

pub(crate) fn normalize_uint(bits: u8, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

pub(crate) fn normalize_float(typ: Type, value: f64) -> f64 {
    match typ.code() {
        TypeCode::BFloat => Bfloat16::from_f64(value).to_f64(),
        _ if typ.bits() <= 32 => value as f32 as f64,
        _ => value,
    }
}

impl Expr {
    fn new(typ: Type, kind: ExprKind) -> Self {
        Self(Rc::new(ExprNode { typ, kind }))
    }

    pub fn typ(&self) -> Type {
        self.0.typ
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Pointer identity. Structural equality is `==`.
    pub fn same_as(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self.kind() {
            ExprKind::Variable(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_intrinsic(&self, name: &str) -> bool {
        match self.kind() {
            ExprKind::Call {
                name: call_name,
                call_type: CallType::Intrinsic,
                ..
            } => call_name == name,
            _ => false,
        }
    }

    pub fn int_imm(typ: Type, value: i64) -> Self {
        internal_assert!(
            typ.is_int() && typ.is_scalar(),
            "int literal with type {}",
            typ
        );
        Self::new(typ, ExprKind::IntImm(normalize_int(typ.bits(), value)))
    }

    pub fn uint_imm(typ: Type, value: u64) -> Self {
        internal_assert!(
            typ.is_uint() && typ.is_scalar(),
            "uint literal with type {}",
            typ
        );
        Self::new(typ, ExprKind::UIntImm(normalize_uint(typ.bits(), value)))
    }

    pub fn float_imm(typ: Type, value: f64) -> Self {
        internal_assert!(
            typ.is_float() && typ.is_scalar(),
            "float literal with type {}",
            typ
        );
        Self::new(typ, ExprKind::FloatImm(normalize_float(typ, value)))
    }

    pub fn bool_imm(value: bool) -> Self {
        Self::uint_imm(Type::Bool, value as u64)
    }

    pub fn var(typ: Type, name: impl Into<String>) -> Self {
        Self::new(typ, ExprKind::Variable(name.into()))
    }

    pub fn cast(typ: Type, value: Expr) -> Self {
        internal_assert!(
            typ.lanes() == value.typ().lanes(),
            "cast of {} to {} changes the lane count",
            value,
            typ
        );
        Self::new(typ, ExprKind::Cast(value))
    }

    pub fn reinterpret(typ: Type, value: Expr) -> Self {
        let from = value.typ();
        internal_assert!(
            typ.bits() as u32 * typ.lanes() as u32 == from.bits() as u32 * from.lanes() as u32,
            "reinterpret of {} to {} changes the bit width",
            value,
            typ
        );
        Self::new(typ, ExprKind::Reinterpret(value))
    }

    pub fn binary(op: BinaryOp, a: Expr, b: Expr) -> Self {
        internal_assert!(
            a.typ() == b.typ(),
            "{} operands have different types: {} and {}",
            op.symbol(),
            a,
            b
        );
        internal_assert!(
            !(op.is_bitwise() && a.typ().is_float()),
            "{} of float operands {} and {}",
            op.symbol(),
            a,
            b
        );
        Self::new(a.typ(), ExprKind::Binary(op, a, b))
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Add, a, b)
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Sub, a, b)
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Mul, a, b)
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Div, a, b)
    }

    pub fn modulo(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Mod, a, b)
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Min, a, b)
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Max, a, b)
    }

    pub fn shl(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Shl, a, b)
    }

    pub fn shr(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Shr, a, b)
    }

    pub fn compare(op: CompareOp, a: Expr, b: Expr) -> Self {
        internal_assert!(
            a.typ() == b.typ(),
            "{} operands have different types: {} and {}",
            op.symbol(),
            a,
            b
        );
        let typ = Type::Bool.with_lanes(a.typ().lanes());
        Self::new(typ, ExprKind::Compare(op, a, b))
    }

    pub fn eq(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::EQ, a, b)
    }

    pub fn ne(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::NE, a, b)
    }

    pub fn lt(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::LT, a, b)
    }

    pub fn le(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::LE, a, b)
    }

    pub fn gt(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::GT, a, b)
    }

    pub fn ge(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::GE, a, b)
    }

    pub fn and(a: Expr, b: Expr) -> Self {
        internal_assert!(
            a.typ().is_bool() && a.typ() == b.typ(),
            "&& of non-matching or non-boolean operands {} and {}",
            a,
            b
        );
        Self::new(a.typ(), ExprKind::And(a, b))
    }

    pub fn or(a: Expr, b: Expr) -> Self {
        internal_assert!(
            a.typ().is_bool() && a.typ() == b.typ(),
            "|| of non-matching or non-boolean operands {} and {}",
            a,
            b
        );
        Self::new(a.typ(), ExprKind::Or(a, b))
    }

    pub fn logical_not(a: Expr) -> Self {
        internal_assert!(a.typ().is_bool(), "! of non-boolean {}", a);
        Self::new(a.typ(), ExprKind::Not(a))
    }

    pub fn select(condition: Expr, true_value: Expr, false_value: Expr) -> Self {
        internal_assert!(
            condition.typ().is_bool(),
            "select condition {} is not boolean",
            condition
        );
        internal_assert!(
            true_value.typ() == false_value.typ(),
            "select arms have different types: {} and {}",
            true_value,
            false_value
        );
        internal_assert!(
            condition.typ().is_scalar() || condition.typ().lanes() == true_value.typ().lanes(),
            "select condition {} does not match the lanes of {}",
            condition,
            true_value
        );
        Self::new(
            true_value.typ(),
            ExprKind::Select(condition, true_value, false_value),
        )
    }

    pub fn broadcast(value: Expr, lanes: u16) -> Self {
        internal_assert!(
            value.typ().is_scalar(),
            "broadcast of vector {}",
            value
        );
        let typ = value.typ().with_lanes(lanes);
        Self::new(typ, ExprKind::Broadcast(value))
    }

    pub fn load(typ: Type, name: impl Into<String>, index: Expr) -> Self {
        internal_assert!(
            index.typ().lanes() == typ.lanes() && !index.typ().is_float(),
            "load index {} does not match type {}",
            index,
            typ
        );
        Self::new(
            typ,
            ExprKind::Load {
                name: name.into(),
                index,
            },
        )
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Self::new(
            body.typ(),
            ExprKind::Let {
                name: name.into(),
                value,
                body,
            },
        )
    }

    pub fn call(typ: Type, name: impl Into<String>, call_type: CallType, args: Vec<Expr>) -> Self {
        Self::new(
            typ,
            ExprKind::Call {
                name: name.into(),
                call_type,
                args,
            },
        )
    }

    pub fn likely(condition: Expr) -> Self {
        Self::call(
            condition.typ(),
            intrinsic::LIKELY,
            CallType::Intrinsic,
            vec![condition],
        )
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other) || *self.0 == *other.0
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::int_imm(Type::Int32, value as i64)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::bool_imm(value)
    }
}

impl From<f32> for Expr {
    fn from(value: f32) -> Self {
        Expr::float_imm(Type::Float32, value as f64)
    }
}

macro_rules! arith_operator {
    ($trait:ident, $method:ident, $ctor:ident) => {
        impl std::ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$ctor(self, rhs)
            }
        }

        impl std::ops::$trait<i32> for Expr {
            type Output = Expr;

            fn $method(self, rhs: i32) -> Expr {
                let rhs = make_const(self.typ(), rhs as i64);
                Expr::$ctor(self, rhs)
            }
        }
    };
}

arith_operator!(Add, add, add);
arith_operator!(Sub, sub, sub);
arith_operator!(Mul, mul, mul);
arith_operator!(Div, div, div);
arith_operator!(Rem, rem, modulo);

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::logical_not(self)
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let typ = self.typ();
        match self.kind() {
            ExprKind::IntImm(value) => {
                if typ == Type::Int32 {
                    write!(f, "{}", value)
                } else {
                    write!(f, "({}){}", typ, value)
                }
            }
            ExprKind::UIntImm(value) => {
                if typ.is_bool() {
                    write!(f, "{}", *value != 0)
                } else {
                    write!(f, "({}){}", typ, value)
                }
            }
            ExprKind::FloatImm(value) => {
                if typ == Type::Float32 {
                    write!(f, "{}f", value)
                } else {
                    write!(f, "({}){}", typ, value)
                }
            }
            ExprKind::Variable(name) => write!(f, "{}", name),
            ExprKind::Cast(value) => write!(f, "{}({})", typ, value),
            ExprKind::Reinterpret(value) => write!(f, "reinterpret<{}>({})", typ, value),
            ExprKind::Binary(op @ (BinaryOp::Min | BinaryOp::Max), a, b) => {
                write!(f, "{}({}, {})", op.symbol(), a, b)
            }
            ExprKind::Binary(op, a, b) => write!(f, "({} {} {})", a, op.symbol(), b),
            ExprKind::Compare(op, a, b) => write!(f, "({} {} {})", a, op.symbol(), b),
            ExprKind::And(a, b) => write!(f, "({} && {})", a, b),
            ExprKind::Or(a, b) => write!(f, "({} || {})", a, b),
            ExprKind::Not(a) => write!(f, "!{}", a),
            ExprKind::Select(c, t, e) => write!(f, "select({}, {}, {})", c, t, e),
            ExprKind::Broadcast(value) => write!(f, "x{}({})", typ.lanes(), value),
            ExprKind::Load { name, index } => write!(f, "{}[{}]", name, index),
            ExprKind::Let { name, value, body } => {
                write!(f, "(let {} = {} in {})", name, value, body)
            }
            ExprKind::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
