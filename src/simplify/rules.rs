use crate::{
    expr::{Expr, ExprKind},
    fold::fold_binary,
    ir_operator::{
        as_const_bool, as_const_int, is_const, is_one, is_zero, make_bool, make_const, make_zero,
    },
    opcode::{BinaryOp, CompareOp},
    typ::Type,
};

/// Algebraic rewriting of the root of an expression.
///
/// The simplifier calls `rewrite` on a node whose children are already simplified and keeps
/// calling it on whatever comes back until it returns `None`. A rule must therefore only build
/// nodes out of the simplified children (or literals) it was handed, and the rule set as a whole
/// must be monotonic: no chain of rewrites may lead back to where it started.
pub trait RewriteRules {
    fn rewrite(&self, e: &Expr) -> Option<Expr>;
}

// Here are some of the rules we have:
//
// Canonical form of commutative operations: if the operation involves a constant, the constant must
// come second. Add(x, constant) is canonical, while Add(constant, x) is not. The same holds for EQ
// and NE.
//
// Canonical form of ordered comparisons: only LT and LE survive. GT(a, b) is LT(b, a) and GE(a, b)
// is LE(b, a).
//
// Canonical form of subtracting a signed constant: Add(x, -c). Nothing turns an Add back into a
// Sub, so the two forms cannot fight.
//
// Float arithmetic is left alone apart from reordering operands. Zero is not the neutral value of
// float addition (negative zero is) and NaN breaks every reflexive identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlgebraicRules;

impl RewriteRules for AlgebraicRules {
    fn rewrite(&self, e: &Expr) -> Option<Expr> {
        match e.kind() {
            ExprKind::Binary(op, a, b) => rewrite_binary(*op, a, b),
            ExprKind::Compare(op, a, b) => rewrite_compare(*op, a, b),
            ExprKind::And(a, b) => rewrite_and(a, b),
            ExprKind::Or(a, b) => rewrite_or(a, b),
            ExprKind::Not(a) => rewrite_not(a),
            ExprKind::Select(c, t, f) => rewrite_select(c, t, f),
            // Turn this: Cast<T>(value of type T)
            // Into this: value
            ExprKind::Cast(value) if value.typ() == e.typ() => Some(value.clone()),
            _ => None,
        }
    }
}

fn is_negation_of(a: &Expr, b: &Expr) -> bool {
    matches!(b.kind(), ExprKind::Not(inner) if inner == a)
        || matches!(a.kind(), ExprKind::Not(inner) if inner == b)
}

fn rewrite_binary(op: BinaryOp, a: &Expr, b: &Expr) -> Option<Expr> {
    let typ = a.typ();

    if op.is_commutative() && is_const(a) && !is_const(b) {
        return Some(Expr::binary(op, b.clone(), a.clone()));
    }

    if typ.is_float() {
        return None;
    }

    match op {
        BinaryOp::Add => {
            // Turn this: Add(value, zero)
            // Into an Identity.
            if is_zero(b) {
                return Some(a.clone());
            }

            // Turn this: Add(Add(value, constant1), constant2)
            // Into this: Add(value, constant1 + constant2)
            if let ExprKind::Binary(BinaryOp::Add, value, constant1) = a.kind() {
                if is_const(constant1) && is_const(b) {
                    let sum = fold_binary(BinaryOp::Add, constant1, b)?;
                    return Some(Expr::add(value.clone(), sum));
                }
            }

            // Turn this: Add(Sub(value, otherValue), otherValue)
            // Into this: value
            if let ExprKind::Binary(BinaryOp::Sub, value, other) = a.kind() {
                if other == b {
                    return Some(value.clone());
                }
            }

            // Turn this: Add(otherValue, Sub(value, otherValue))
            // Into this: value
            if let ExprKind::Binary(BinaryOp::Sub, value, other) = b.kind() {
                if other == a {
                    return Some(value.clone());
                }
            }

            None
        }
        BinaryOp::Sub => {
            // Turn this: Sub(value, zero)
            // Into an Identity.
            if is_zero(b) {
                return Some(a.clone());
            }

            // Turn this: Sub(value, value)
            // Into this: zero
            if a == b {
                return Some(make_zero(typ));
            }

            if let ExprKind::Binary(BinaryOp::Add, x, y) = a.kind() {
                // Turn this: Sub(Add(value, otherValue), otherValue)
                // Into this: value
                if y == b {
                    return Some(x.clone());
                }
                // Turn this: Sub(Add(value, otherValue), value)
                // Into this: otherValue
                if x == b {
                    return Some(y.clone());
                }
            }

            // Turn this: Sub(Add(value, constant1), Add(value, constant2))
            // Into this: constant1 - constant2
            if let (
                ExprKind::Binary(BinaryOp::Add, x1, c1),
                ExprKind::Binary(BinaryOp::Add, x2, c2),
            ) = (a.kind(), b.kind())
            {
                if x1 == x2 && is_const(c1) && is_const(c2) {
                    return fold_binary(BinaryOp::Sub, c1, c2);
                }
            }

            // Turn this: Sub(value, constant)
            // Into this: Add(value, -constant)
            // The most negative constant is its own negation and stays a Sub.
            if typ.is_int() && is_const(b) {
                let negated = fold_binary(BinaryOp::Sub, &make_zero(typ), b)?;
                if negated != *b {
                    return Some(Expr::add(a.clone(), negated));
                }
            }

            None
        }
        BinaryOp::Mul => {
            if is_zero(b) {
                return Some(b.clone());
            }
            if is_one(b) {
                return Some(a.clone());
            }

            // Turn this: Mul(Mul(value, constant1), constant2)
            // Into this: Mul(value, constant1 * constant2)
            if let ExprKind::Binary(BinaryOp::Mul, value, constant1) = a.kind() {
                if is_const(constant1) && is_const(b) {
                    let product = fold_binary(BinaryOp::Mul, constant1, b)?;
                    return Some(Expr::mul(value.clone(), product));
                }
            }

            None
        }
        BinaryOp::Div => {
            if is_one(b) {
                return Some(a.clone());
            }
            None
        }
        BinaryOp::Mod => {
            if is_one(b) {
                return Some(make_zero(typ));
            }
            None
        }
        BinaryOp::Min | BinaryOp::Max => {
            if a == b {
                return Some(a.clone());
            }

            // Turn this: Min(Min(value, constant1), constant2)
            // Into this: Min(value, Min(constant1, constant2))
            if let ExprKind::Binary(inner, value, constant1) = a.kind() {
                if *inner == op && is_const(constant1) && is_const(b) {
                    let bound = fold_binary(op, constant1, b)?;
                    return Some(Expr::binary(op, value.clone(), bound));
                }
            }

            None
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            if is_zero(b) {
                return Some(a.clone());
            }
            None
        }
        BinaryOp::BitAnd | BinaryOp::BitOr => {
            if a == b {
                return Some(a.clone());
            }
            None
        }
        BinaryOp::BitXor => {
            if a == b {
                return Some(make_zero(typ));
            }
            None
        }
    }
}

/// Splits `e` into a term and a constant offset. A missing term means `e` is the constant.
fn split_offset(e: &Expr) -> (Option<&Expr>, i64) {
    if let Some(c) = as_const_int(e) {
        return (None, c);
    }
    if let ExprKind::Binary(BinaryOp::Add, x, c) = e.kind() {
        if let Some(c) = as_const_int(c) {
            return (Some(x), c);
        }
    }
    (Some(e), 0)
}

fn compare_offsets(op: CompareOp, a: i64, b: i64) -> bool {
    match op {
        CompareOp::EQ => a == b,
        CompareOp::NE => a != b,
        CompareOp::LT => a < b,
        CompareOp::LE => a <= b,
        CompareOp::GT => a > b,
        CompareOp::GE => a >= b,
    }
}

/// `value` if `typ` can hold it, otherwise whether it lies above the type's range.
fn offset_in_range(typ: Type, value: i128) -> Result<i64, bool> {
    if value > typ.int_max() as i128 {
        Err(true)
    } else if value < typ.int_min() as i128 {
        Err(false)
    } else {
        Ok(value as i64)
    }
}

fn rewrite_compare(op: CompareOp, a: &Expr, b: &Expr) -> Option<Expr> {
    let typ = a.typ();
    let lanes = typ.lanes();

    match op {
        CompareOp::GT => return Some(Expr::lt(b.clone(), a.clone())),
        CompareOp::GE => return Some(Expr::le(b.clone(), a.clone())),
        CompareOp::EQ | CompareOp::NE if is_const(a) && !is_const(b) => {
            return Some(Expr::compare(op, b.clone(), a.clone()))
        }
        _ => {}
    }

    if typ.is_float() {
        return None;
    }

    // Turn this: Compare(value, value)
    // Into this: constant
    if a == b {
        return Some(make_bool(
            matches!(op, CompareOp::EQ | CompareOp::LE),
            lanes,
        ));
    }

    // Bools compare as bools.
    if typ.is_bool() {
        if op == CompareOp::EQ {
            // Turn this: EQ(value, true)
            // Into this: value
            match as_const_bool(b) {
                Some(true) => return Some(a.clone()),
                Some(false) => return Some(Expr::logical_not(a.clone())),
                None => {}
            }
        }
        if op == CompareOp::NE {
            match as_const_bool(b) {
                Some(false) => return Some(a.clone()),
                Some(true) => return Some(Expr::logical_not(a.clone())),
                None => {}
            }
        }
        return None;
    }

    if !typ.is_int() {
        return None;
    }

    // Offsets can only be cancelled across an ordering when nothing wraps. Equality survives
    // wrapping because adding a constant is a bijection.
    let ordered = matches!(op, CompareOp::LT | CompareOp::LE);
    if ordered && typ.can_overflow() {
        return None;
    }

    let (xa, ca) = split_offset(a);
    let (xb, cb) = split_offset(b);
    match (xa, xb) {
        // Turn this: Compare(Add(value, constant1), Add(value, constant2))
        // Into this: Compare(constant1, constant2)
        (Some(xa), Some(xb)) if xa == xb => Some(make_bool(compare_offsets(op, ca, cb), lanes)),
        // Turn this: Compare(Add(value, constant1), constant2)
        // Into this: Compare(value, constant2 - constant1)
        (Some(x), None) if ca != 0 => {
            let c = cb as i128 - ca as i128;
            match offset_in_range(typ, c) {
                Ok(c) => Some(Expr::compare(op, x.clone(), make_const(typ, c))),
                // value would have to overflow to reach the bound.
                Err(above) => ordered.then(|| make_bool(above, lanes)),
            }
        }
        // Turn this: Compare(constant1, Add(value, constant2))
        // Into this: Compare(constant1 - constant2, value)
        (None, Some(x)) if cb != 0 => {
            let c = ca as i128 - cb as i128;
            match offset_in_range(typ, c) {
                Ok(c) => Some(Expr::compare(op, make_const(typ, c), x.clone())),
                Err(above) => ordered.then(|| make_bool(!above, lanes)),
            }
        }
        _ => None,
    }
}

fn rewrite_not(a: &Expr) -> Option<Expr> {
    match a.kind() {
        // Turn this: Not(Not(value))
        // Into this: value
        ExprKind::Not(value) => Some(value.clone()),
        // Turn this: Not(Compare(x, y))
        // Into this: NegatedCompare(x, y)
        // Ordered float comparisons are false for NaN both ways and cannot be negated.
        ExprKind::Compare(op, x, y)
            if !x.typ().is_float() || matches!(op, CompareOp::EQ | CompareOp::NE) =>
        {
            Some(Expr::compare(op.negate(), x.clone(), y.clone()))
        }
        _ => None,
    }
}

fn rewrite_and(a: &Expr, b: &Expr) -> Option<Expr> {
    if is_const(a) && !is_const(b) {
        return Some(Expr::and(b.clone(), a.clone()));
    }
    match as_const_bool(b) {
        Some(true) => return Some(a.clone()),
        Some(false) => return Some(b.clone()),
        None => {}
    }
    if a == b {
        return Some(a.clone());
    }
    // Turn this: And(value, Not(value))
    // Into this: false
    if is_negation_of(a, b) {
        return Some(make_bool(false, a.typ().lanes()));
    }
    None
}

fn rewrite_or(a: &Expr, b: &Expr) -> Option<Expr> {
    if is_const(a) && !is_const(b) {
        return Some(Expr::or(b.clone(), a.clone()));
    }
    match as_const_bool(b) {
        Some(true) => return Some(b.clone()),
        Some(false) => return Some(a.clone()),
        None => {}
    }
    if a == b {
        return Some(a.clone());
    }
    // Turn this: Or(value, Not(value))
    // Into this: true
    if is_negation_of(a, b) {
        return Some(make_bool(true, a.typ().lanes()));
    }
    None
}

fn rewrite_select(condition: &Expr, t: &Expr, f: &Expr) -> Option<Expr> {
    if t == f {
        return Some(t.clone());
    }

    // Turn this: Select(Not(condition), t, f)
    // Into this: Select(condition, f, t)
    if let ExprKind::Not(inner) = condition.kind() {
        return Some(Expr::select(inner.clone(), f.clone(), t.clone()));
    }

    if t.typ() == condition.typ() && t.typ().is_bool() {
        match (as_const_bool(t), as_const_bool(f)) {
            // Turn this: Select(condition, true, false)
            // Into this: condition
            (Some(true), Some(false)) => return Some(condition.clone()),
            (Some(false), Some(true)) => return Some(Expr::logical_not(condition.clone())),
            _ => {}
        }
    }

    None
}
