//! Constant folding of nodes whose operands are all literals.
//!
//! Each folder returns `None` when it cannot produce a literal, and the caller keeps the node.
//! Vector operands fold lane-wise when they are broadcasts of literals.

use std::cmp::Ordering;

use crate::{
    bfloat16::Bfloat16,
    euclidean_div, euclidean_mod,
    expr::{normalize_int, normalize_uint, Expr, ExprKind},
    fmax, fmin,
    ir_operator::{as_const_bool, make_bool},
    opcode::{BinaryOp, CompareOp},
    tri_state,
    typ::{Type, TypeCode},
    udiv, umod, TriState,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// The literal held by `e`, looking through a broadcast.
pub fn as_scalar(e: &Expr) -> Option<Scalar> {
    match e.kind() {
        ExprKind::IntImm(value) => Some(Scalar::Int(*value)),
        ExprKind::UIntImm(value) => Some(Scalar::UInt(*value)),
        ExprKind::FloatImm(value) => Some(Scalar::Float(*value)),
        ExprKind::Broadcast(value) => as_scalar(value),
        _ => None,
    }
}

/// A literal of type `typ`, broadcast if `typ` is a vector.
pub fn make_scalar(typ: Type, value: Scalar) -> Expr {
    let element = typ.element_of();
    let scalar = match value {
        Scalar::Int(v) => Expr::int_imm(element, v),
        Scalar::UInt(v) => Expr::uint_imm(element, v),
        Scalar::Float(v) => Expr::float_imm(element, v),
    };
    if typ.is_vector() {
        Expr::broadcast(scalar, typ.lanes())
    } else {
        scalar
    }
}

fn binary_scalar(op: BinaryOp, typ: Type, a: Scalar, b: Scalar) -> Option<Scalar> {
    let bits = typ.bits() as u64;
    match (a, b) {
        (Scalar::Int(a), Scalar::Int(b)) => Some(Scalar::Int(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => euclidean_div(a, b),
            BinaryOp::Mod => euclidean_mod(a, b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Shl | BinaryOp::Shr if b < 0 || b as u64 >= bits => return None,
            BinaryOp::Shl => a.wrapping_shl(b as u32),
            BinaryOp::Shr => a >> b,
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            BinaryOp::BitXor => a ^ b,
        })),
        (Scalar::UInt(a), Scalar::UInt(b)) => Some(Scalar::UInt(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => udiv(a, b),
            BinaryOp::Mod => umod(a, b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Shl | BinaryOp::Shr if b >= bits => return None,
            BinaryOp::Shl => a.wrapping_shl(b as u32),
            BinaryOp::Shr => a >> b,
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            BinaryOp::BitXor => a ^ b,
        })),
        (Scalar::Float(a), Scalar::Float(b)) => {
            // Truncated floats are lowered before anything folds them.
            if typ.is_bfloat() {
                return None;
            }
            Some(Scalar::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a - b * (a / b).floor(),
                BinaryOp::Min => fmin(a, b),
                BinaryOp::Max => fmax(a, b),
                _ => return None,
            }))
        }
        _ => None,
    }
}

pub fn fold_binary(op: BinaryOp, a: &Expr, b: &Expr) -> Option<Expr> {
    let typ = a.typ();
    let value = binary_scalar(op, typ, as_scalar(a)?, as_scalar(b)?)?;
    Some(make_scalar(typ, value))
}

pub fn compare_constant(op: CompareOp, a: Scalar, b: Scalar) -> TriState {
    let ordering = match (a, b) {
        (Scalar::Int(a), Scalar::Int(b)) => a.partial_cmp(&b),
        (Scalar::UInt(a), Scalar::UInt(b)) => a.partial_cmp(&b),
        (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(&b),
        _ => return TriState::Undeterminate,
    };
    let result = match (op, ordering) {
        // NaN is unordered with everything, including itself.
        (CompareOp::NE, None) => true,
        (_, None) => false,
        (CompareOp::EQ, Some(o)) => o == Ordering::Equal,
        (CompareOp::NE, Some(o)) => o != Ordering::Equal,
        (CompareOp::LT, Some(o)) => o == Ordering::Less,
        (CompareOp::LE, Some(o)) => o != Ordering::Greater,
        (CompareOp::GT, Some(o)) => o == Ordering::Greater,
        (CompareOp::GE, Some(o)) => o != Ordering::Less,
    };
    tri_state(result)
}

pub fn fold_compare(op: CompareOp, a: &Expr, b: &Expr) -> Option<Expr> {
    if a.typ().is_bfloat() {
        return None;
    }
    match compare_constant(op, as_scalar(a)?, as_scalar(b)?) {
        TriState::True => Some(make_bool(true, a.typ().lanes())),
        TriState::False => Some(make_bool(false, a.typ().lanes())),
        TriState::Undeterminate => None,
    }
}

fn is_nonzero(value: Scalar) -> bool {
    match value {
        Scalar::Int(v) => v != 0,
        Scalar::UInt(v) => v != 0,
        Scalar::Float(v) => v != 0.0,
    }
}

fn cast_scalar(to: Type, value: Scalar) -> Scalar {
    if to.is_bool() {
        return Scalar::UInt(is_nonzero(value) as u64);
    }
    match to.code() {
        TypeCode::Int => Scalar::Int(match value {
            Scalar::Int(v) => v,
            Scalar::UInt(v) => v as i64,
            Scalar::Float(v) => v as i64,
        }),
        TypeCode::UInt => Scalar::UInt(match value {
            Scalar::Int(v) => v as u64,
            Scalar::UInt(v) => v,
            Scalar::Float(v) if v < 0.0 => (v as i64) as u64,
            Scalar::Float(v) => v as u64,
        }),
        TypeCode::Float | TypeCode::BFloat => Scalar::Float(match value {
            Scalar::Int(v) => v as f64,
            Scalar::UInt(v) => v as f64,
            Scalar::Float(v) => v,
        }),
    }
}

pub fn fold_cast(to: Type, value: &Expr) -> Option<Expr> {
    let scalar = as_scalar(value)?;
    Some(make_scalar(to, cast_scalar(to, scalar)))
}

fn reinterpret_scalar(from: Type, to: Type, value: Scalar) -> Option<Scalar> {
    if from.bits() != to.bits() {
        return None;
    }

    let bits = match (from.code(), value) {
        (_, Scalar::Int(v)) => normalize_uint(from.bits(), v as u64),
        (_, Scalar::UInt(v)) => v,
        (TypeCode::BFloat, Scalar::Float(v)) => Bfloat16::from_f64(v).to_bits() as u64,
        (TypeCode::Float, Scalar::Float(v)) if from.bits() == 32 => (v as f32).to_bits() as u64,
        (TypeCode::Float, Scalar::Float(v)) if from.bits() == 64 => v.to_bits(),
        _ => return None,
    };

    Some(match to.code() {
        TypeCode::Int => Scalar::Int(normalize_int(to.bits(), bits as i64)),
        TypeCode::UInt => Scalar::UInt(bits),
        TypeCode::BFloat => Scalar::Float(Bfloat16::from_bits(bits as u16).to_f64()),
        TypeCode::Float if to.bits() == 32 => Scalar::Float(f32::from_bits(bits as u32) as f64),
        TypeCode::Float if to.bits() == 64 => Scalar::Float(f64::from_bits(bits)),
        TypeCode::Float => return None,
    })
}

pub fn fold_reinterpret(to: Type, value: &Expr) -> Option<Expr> {
    if to.lanes() != value.typ().lanes() {
        return None;
    }
    let scalar = reinterpret_scalar(value.typ(), to, as_scalar(value)?)?;
    Some(make_scalar(to, scalar))
}

/// Folds the node at the root of `e` if its operands are literals. Children are not visited.
pub fn fold_constants(e: &Expr, no_float_simplify: bool) -> Option<Expr> {
    let lanes = e.typ().lanes();
    match e.kind() {
        ExprKind::Cast(value) => fold_cast(e.typ(), value),
        ExprKind::Reinterpret(value) => fold_reinterpret(e.typ(), value),
        ExprKind::Binary(_, a, _) | ExprKind::Compare(_, a, _)
            if no_float_simplify && a.typ().is_float() =>
        {
            None
        }
        ExprKind::Binary(op, a, b) => fold_binary(*op, a, b),
        ExprKind::Compare(op, a, b) => fold_compare(*op, a, b),
        ExprKind::And(a, b) => Some(make_bool(as_const_bool(a)? && as_const_bool(b)?, lanes)),
        ExprKind::Or(a, b) => Some(make_bool(as_const_bool(a)? || as_const_bool(b)?, lanes)),
        ExprKind::Not(a) => Some(make_bool(!as_const_bool(a)?, lanes)),
        _ => None,
    }
}
