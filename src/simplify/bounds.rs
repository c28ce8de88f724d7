//! What the simplifier knows about integer values: constant bounds and modulus/remainder
//! alignment, and the rewrites that knowledge allows.
//!
//! Arithmetic reasoning is only done for types that cannot overflow (signed integers of at least
//! 32 bits). Literals and variables with recorded facts are used for every integer type.

use num_integer::Integer;

use super::{ConstBounds, Simplify};
use crate::{
    expr::{Expr, ExprKind},
    interval::ModulusRemainder,
    ir_operator::{as_const_int, make_bool, make_const},
    opcode::{BinaryOp, CompareOp},
};

fn union(a: ConstBounds, b: ConstBounds) -> ConstBounds {
    ConstBounds {
        min: a.min.zip(b.min).map(|(x, y)| x.min(y)),
        max: a.max.zip(b.max).map(|(x, y)| x.max(y)),
    }
}

fn at_most(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) | (None, x) => x,
    }
}

fn at_least(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) | (None, x) => x,
    }
}

fn mul_bounds(a: ConstBounds, b: ConstBounds) -> ConstBounds {
    if let Some(c) = b.single_point() {
        let (lo, hi) = if c >= 0 { (a.min, a.max) } else { (a.max, a.min) };
        return ConstBounds {
            min: lo.and_then(|v| v.checked_mul(c)),
            max: hi.and_then(|v| v.checked_mul(c)),
        };
    }
    if a.single_point().is_some() {
        return mul_bounds(b, a);
    }
    match (a.min, a.max, b.min, b.max) {
        (Some(a0), Some(a1), Some(b0), Some(b1)) => {
            let products = [
                a0.checked_mul(b0),
                a0.checked_mul(b1),
                a1.checked_mul(b0),
                a1.checked_mul(b1),
            ];
            if products.iter().any(Option::is_none) {
                return ConstBounds::default();
            }
            let products = products.iter().flatten();
            ConstBounds {
                min: products.clone().min().copied(),
                max: products.max().copied(),
            }
        }
        _ => ConstBounds::default(),
    }
}

fn div_bounds(a: ConstBounds, c: i64) -> ConstBounds {
    match c.cmp(&0) {
        std::cmp::Ordering::Greater => ConstBounds {
            min: a.min.map(|v| Integer::div_floor(&v, &c)),
            max: a.max.map(|v| Integer::div_floor(&v, &c)),
        },
        std::cmp::Ordering::Less => match c.checked_neg() {
            Some(d) => ConstBounds {
                min: a.max.and_then(|v| v.checked_neg()).map(|v| Integer::div_ceil(&v, &d)),
                max: a.min.and_then(|v| v.checked_neg()).map(|v| Integer::div_ceil(&v, &d)),
            },
            None => ConstBounds::default(),
        },
        std::cmp::Ordering::Equal => ConstBounds::point(0),
    }
}

impl Simplify<'_> {
    /// Constant bounds on the value of `e`. Ends that cannot be established are left unknown.
    pub fn const_bounds(&self, e: &Expr) -> ConstBounds {
        let typ = e.typ();
        match e.kind() {
            ExprKind::IntImm(value) => return ConstBounds::point(*value),
            ExprKind::UIntImm(value) => {
                return i64::try_from(*value)
                    .map(ConstBounds::point)
                    .unwrap_or_default()
            }
            ExprKind::Variable(name) => {
                return self.bounds_info.get(name).copied().unwrap_or_default()
            }
            ExprKind::Broadcast(value) => return self.const_bounds(value),
            _ => {}
        }

        if typ.code() != crate::typ::TypeCode::Int || typ.can_overflow() {
            return ConstBounds::default();
        }

        match e.kind() {
            ExprKind::Binary(op, a, b) => {
                let ba = self.const_bounds(a);
                let bb = self.const_bounds(b);
                match op {
                    BinaryOp::Add => ConstBounds {
                        min: ba.min.zip(bb.min).and_then(|(x, y)| x.checked_add(y)),
                        max: ba.max.zip(bb.max).and_then(|(x, y)| x.checked_add(y)),
                    },
                    BinaryOp::Sub => ConstBounds {
                        min: ba.min.zip(bb.max).and_then(|(x, y)| x.checked_sub(y)),
                        max: ba.max.zip(bb.min).and_then(|(x, y)| x.checked_sub(y)),
                    },
                    BinaryOp::Mul => mul_bounds(ba, bb),
                    BinaryOp::Div => match bb.single_point() {
                        Some(c) => div_bounds(ba, c),
                        None => ConstBounds::default(),
                    },
                    BinaryOp::Mod => match bb.single_point() {
                        Some(0) => ConstBounds::point(0),
                        Some(c) => match c.checked_abs() {
                            Some(c) => ConstBounds::new(Some(0), Some(c - 1)),
                            None => ConstBounds::new(Some(0), None),
                        },
                        None => ConstBounds::new(Some(0), None),
                    },
                    BinaryOp::Min => ConstBounds {
                        min: ba.min.zip(bb.min).map(|(x, y)| x.min(y)),
                        max: at_most(ba.max, bb.max),
                    },
                    BinaryOp::Max => ConstBounds {
                        min: at_least(ba.min, bb.min),
                        max: ba.max.zip(bb.max).map(|(x, y)| x.max(y)),
                    },
                    _ => ConstBounds::default(),
                }
            }
            ExprKind::Select(_, t, f) => union(self.const_bounds(t), self.const_bounds(f)),
            ExprKind::Let { body, .. } => self.const_bounds(body),
            _ => ConstBounds::default(),
        }
    }

    /// What is known about `e` modulo some stride.
    pub fn alignment_of(&self, e: &Expr) -> ModulusRemainder {
        match e.kind() {
            ExprKind::IntImm(value) => return ModulusRemainder::exactly(*value),
            ExprKind::Variable(name) => {
                return self.alignment_info.get(name).copied().unwrap_or_default()
            }
            ExprKind::Broadcast(value) => return self.alignment_of(value),
            _ => {}
        }

        let typ = e.typ();
        if typ.code() != crate::typ::TypeCode::Int || typ.can_overflow() {
            return ModulusRemainder::unknown();
        }

        match e.kind() {
            ExprKind::Binary(BinaryOp::Add, a, b) => {
                let (a, b) = (self.alignment_of(a), self.alignment_of(b));
                combine(
                    a.modulus.gcd(&b.modulus),
                    a.remainder.checked_add(b.remainder),
                )
            }
            ExprKind::Binary(BinaryOp::Sub, a, b) => {
                let (a, b) = (self.alignment_of(a), self.alignment_of(b));
                combine(
                    a.modulus.gcd(&b.modulus),
                    a.remainder.checked_sub(b.remainder),
                )
            }
            ExprKind::Binary(BinaryOp::Mul, a, b) => {
                let (a, b) = (self.alignment_of(a), self.alignment_of(b));
                // (m1 * i + r1) * (m2 * j + r2) is r1 * r2 plus multiples of m1 * m2, m1 * r2 and
                // m2 * r1.
                let modulus = a
                    .modulus
                    .checked_mul(b.modulus)
                    .zip(a.modulus.checked_mul(b.remainder))
                    .zip(b.modulus.checked_mul(a.remainder))
                    .map(|((x, y), z)| x.gcd(&y).gcd(&z));
                match modulus {
                    Some(modulus) => combine(modulus, a.remainder.checked_mul(b.remainder)),
                    None => ModulusRemainder::unknown(),
                }
            }
            ExprKind::Select(_, t, f) => {
                let (t, f) = (self.alignment_of(t), self.alignment_of(f));
                let diff = t.remainder.checked_sub(f.remainder);
                match diff {
                    Some(diff) => combine(t.modulus.gcd(&f.modulus).gcd(&diff), Some(t.remainder)),
                    None => ModulusRemainder::unknown(),
                }
            }
            _ => ModulusRemainder::unknown(),
        }
    }

    /// Rewrites the root of `e` using bounds and alignment. Children must already be simplified.
    pub(crate) fn rewrite_with_facts(&self, e: &Expr) -> Option<Expr> {
        match e.kind() {
            ExprKind::Compare(op, a, b) if !a.typ().is_float() => {
                let ba = self.const_bounds(a);
                let bb = self.const_bounds(b);
                let lanes = a.typ().lanes();
                let always_lt = ba.max.zip(bb.min).map_or(false, |(x, y)| x < y);
                let always_le = ba.max.zip(bb.min).map_or(false, |(x, y)| x <= y);
                let always_gt = ba.min.zip(bb.max).map_or(false, |(x, y)| x > y);
                let always_ge = ba.min.zip(bb.max).map_or(false, |(x, y)| x >= y);
                let result = match op {
                    CompareOp::LT if always_lt => true,
                    CompareOp::LT if always_ge => false,
                    CompareOp::LE if always_le => true,
                    CompareOp::LE if always_gt => false,
                    CompareOp::GT if always_gt => true,
                    CompareOp::GT if always_le => false,
                    CompareOp::GE if always_ge => true,
                    CompareOp::GE if always_lt => false,
                    CompareOp::EQ | CompareOp::NE if always_lt || always_gt => {
                        *op == CompareOp::NE
                    }
                    _ => return None,
                };
                Some(make_bool(result, lanes))
            }
            ExprKind::Binary(BinaryOp::Min, a, b) if !a.typ().is_float() => {
                let ba = self.const_bounds(a);
                let bb = self.const_bounds(b);
                if ba.max.zip(bb.min).map_or(false, |(x, y)| x <= y) {
                    Some(a.clone())
                } else if bb.max.zip(ba.min).map_or(false, |(x, y)| x <= y) {
                    Some(b.clone())
                } else {
                    None
                }
            }
            ExprKind::Binary(BinaryOp::Max, a, b) if !a.typ().is_float() => {
                let ba = self.const_bounds(a);
                let bb = self.const_bounds(b);
                if ba.min.zip(bb.max).map_or(false, |(x, y)| x >= y) {
                    Some(a.clone())
                } else if bb.min.zip(ba.max).map_or(false, |(x, y)| x >= y) {
                    Some(b.clone())
                } else {
                    None
                }
            }
            ExprKind::Binary(BinaryOp::Mod, a, b) if a.typ().code() == crate::typ::TypeCode::Int => {
                let c = as_const_int(b).filter(|c| *c > 0)?;
                let ba = self.const_bounds(a);
                if ba.min.map_or(false, |v| v >= 0) && ba.max.map_or(false, |v| v < c) {
                    return Some(a.clone());
                }
                let alignment = self.alignment_of(a);
                if alignment.modulus > 0 && alignment.modulus % c == 0 {
                    return Some(make_const(e.typ(), Integer::mod_floor(&alignment.remainder, &c)));
                }
                None
            }
            _ => None,
        }
    }
}

fn combine(modulus: i64, remainder: Option<i64>) -> ModulusRemainder {
    match remainder {
        Some(remainder) if modulus == 0 => ModulusRemainder::exactly(remainder),
        Some(remainder) => ModulusRemainder::new(modulus, Integer::mod_floor(&remainder, &modulus)),
        None => ModulusRemainder::unknown(),
    }
}
