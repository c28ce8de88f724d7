//! Small queries and builders over expressions: constant inspection and literal construction.

use crate::{
    expr::{Expr, ExprKind},
    stmt::{Stmt, StmtNode},
    typ::{Type, TypeCode},
};

/// The value of a signed integer literal, or of a broadcast of one.
pub fn as_const_int(e: &Expr) -> Option<i64> {
    match e.kind() {
        ExprKind::IntImm(value) => Some(*value),
        ExprKind::Broadcast(value) => as_const_int(value),
        _ => None,
    }
}

/// The value of an unsigned integer literal, or of a broadcast of one.
pub fn as_const_uint(e: &Expr) -> Option<u64> {
    match e.kind() {
        ExprKind::UIntImm(value) => Some(*value),
        ExprKind::Broadcast(value) => as_const_uint(value),
        _ => None,
    }
}

/// The value of a float literal, or of a broadcast of one.
pub fn as_const_float(e: &Expr) -> Option<f64> {
    match e.kind() {
        ExprKind::FloatImm(value) => Some(*value),
        ExprKind::Broadcast(value) => as_const_float(value),
        _ => None,
    }
}

/// A literal, or a broadcast of one.
pub fn is_const(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::IntImm(_) | ExprKind::UIntImm(_) | ExprKind::FloatImm(_) => true,
        ExprKind::Broadcast(value) => is_const(value),
        _ => false,
    }
}

/// True if `e` is a literal (or broadcast of a literal) equal to `value`.
pub fn is_const_of(e: &Expr, value: i64) -> bool {
    if let Some(i) = as_const_int(e) {
        i == value
    } else if let Some(u) = as_const_uint(e) {
        value >= 0 && u == value as u64
    } else if let Some(f) = as_const_float(e) {
        f == value as f64
    } else {
        false
    }
}

pub fn is_one(e: &Expr) -> bool {
    is_const_of(e, 1)
}

pub fn is_zero(e: &Expr) -> bool {
    is_const_of(e, 0)
}

/// A literal of type `typ` holding `value`, wrapped to the type's width. Vector types get a
/// broadcast.
pub fn make_const(typ: Type, value: i64) -> Expr {
    if typ.is_vector() {
        return Expr::broadcast(make_const(typ.element_of(), value), typ.lanes());
    }

    if typ.is_bool() {
        return Expr::bool_imm(value != 0);
    }

    match typ.code() {
        TypeCode::Int => Expr::int_imm(typ, value),
        TypeCode::UInt => Expr::uint_imm(typ, value as u64),
        TypeCode::Float | TypeCode::BFloat => Expr::float_imm(typ, value as f64),
    }
}

pub fn make_zero(typ: Type) -> Expr {
    make_const(typ, 0)
}

pub fn make_bool(value: bool, lanes: u16) -> Expr {
    make_const(Type::Bool.with_lanes(lanes), value as i64)
}

pub fn const_true(lanes: u16) -> Expr {
    make_bool(true, lanes)
}

pub fn const_false(lanes: u16) -> Expr {
    make_bool(false, lanes)
}

/// `Some(true)` / `Some(false)` for boolean literals, `None` for anything else.
pub fn as_const_bool(e: &Expr) -> Option<bool> {
    if !e.typ().is_bool() {
        return None;
    }
    as_const_uint(e).map(|value| value != 0)
}

/// Strips one level of `likely` or `likely_if_innermost`.
pub fn unwrap_likely(e: &Expr) -> Option<&Expr> {
    match e.kind() {
        ExprKind::Call { args, .. }
            if e.is_intrinsic(crate::opcode::intrinsic::LIKELY)
                || e.is_intrinsic(crate::opcode::intrinsic::LIKELY_IF_INNERMOST) =>
        {
            args.first()
        }
        _ => None,
    }
}

/// A statement with no effect: evaluation of a literal.
pub fn is_no_op(s: &Stmt) -> bool {
    match s.node() {
        StmtNode::Evaluate(value) => is_const(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractors_see_through_broadcast() {
        let v = make_const(Type::Int32.with_lanes(4), 3);
        assert_eq!(as_const_int(&v), Some(3));
        assert!(is_const(&v));
        assert_eq!(as_const_uint(&make_const(Type::UInt8, 300)), Some(44));
        assert_eq!(as_const_float(&make_const(Type::Float64, -2)), Some(-2.0));
    }

    #[test]
    fn booleans() {
        assert_eq!(as_const_bool(&const_true(1)), Some(true));
        assert_eq!(as_const_bool(&const_false(8)), Some(false));
        assert_eq!(const_true(4).typ(), Type::Bool.with_lanes(4));
        assert_eq!(as_const_bool(&make_const(Type::UInt8, 1)), None);
        assert!(is_one(&const_true(1)));
    }

    #[test]
    fn likely_unwraps_one_level() {
        let x = Expr::var(Type::Bool, "x");
        let wrapped = Expr::likely(x.clone());
        assert_eq!(unwrap_likely(&wrapped), Some(&x));
        assert_eq!(unwrap_likely(&x), None);
    }
}
