//! Removes bfloat16 from a statement.
//!
//! bfloat16 values are stored as their raw 16 bits in a `uint16`. Arithmetic on them widens both
//! operands to `float32`, computes there and narrows the result back. Narrowing truncates the low
//! mantissa bits rather than rounding.
//!
//! Call arguments and return values are not converted; a call returning bfloat16 is left as it is
//! and trips the final check.

use crate::{
    bfloat16::Bfloat16,
    expr::{Expr, ExprKind},
    ir_mutator::{walk_expr, walk_stmt, IrMutator},
    ir_operator::make_const,
    opcode::{BinaryOp, CompareOp, DeviceApi},
    stmt::{Stmt, StmtNode},
    typ::{Type, TypeCode},
};

/// `uint16` bits to the `float32` they are the top half of.
fn bfloat_to_float(e: Expr) -> Expr {
    let lanes = e.typ().lanes();
    let wide = Expr::cast(Type::UInt32.with_lanes(lanes), e);
    let shifted = Expr::shl(wide, make_const(Type::UInt32.with_lanes(lanes), 16));
    Expr::reinterpret(Type::Float32.with_lanes(lanes), shifted)
}

/// The top half of a `float32`'s bits, as `uint16`.
fn float_to_bfloat(e: Expr) -> Expr {
    let lanes = e.typ().lanes();
    let bits = Expr::reinterpret(Type::UInt32.with_lanes(lanes), e);
    let shifted = Expr::shr(bits, make_const(Type::UInt32.with_lanes(lanes), 16));
    Expr::cast(Type::UInt16.with_lanes(lanes), shifted)
}

/// Whether code for `device_api` can do bfloat16 arithmetic itself. No target can yet.
fn device_supports_bfloat(_device_api: DeviceApi) -> bool {
    false
}

fn storage_type(typ: Type) -> Type {
    typ.with_code(TypeCode::UInt)
}

struct LowerBfloatMath;

impl LowerBfloatMath {
    fn lower(&mut self, e: &Expr) -> Expr {
        let typ = e.typ();
        match e.kind() {
            ExprKind::Binary(
                op @ (BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Mod
                | BinaryOp::Min
                | BinaryOp::Max),
                a,
                b,
            ) if typ.is_bfloat() => {
                let a = bfloat_to_float(self.mutate_expr(a));
                let b = bfloat_to_float(self.mutate_expr(b));
                float_to_bfloat(Expr::binary(*op, a, b))
            }
            ExprKind::Compare(
                op @ (CompareOp::LT | CompareOp::LE | CompareOp::GT | CompareOp::GE),
                a,
                b,
            ) if a.typ().is_bfloat() => {
                let a = bfloat_to_float(self.mutate_expr(a));
                let b = bfloat_to_float(self.mutate_expr(b));
                Expr::compare(*op, a, b)
            }
            ExprKind::FloatImm(value) if typ.is_bfloat() => Expr::uint_imm(
                storage_type(typ),
                Bfloat16::from_f64(*value).to_bits() as u64,
            ),
            ExprKind::Cast(value) if typ.is_bfloat() => {
                let as_float = Expr::cast(Type::Float32.with_lanes(typ.lanes()), value.clone());
                float_to_bfloat(self.mutate_expr(&as_float))
            }
            ExprKind::Cast(value) if value.typ().is_bfloat() => {
                Expr::cast(typ, bfloat_to_float(self.mutate_expr(value)))
            }
            ExprKind::Reinterpret(value) if typ.is_bfloat() => {
                Expr::reinterpret(storage_type(typ), self.mutate_expr(value))
            }
            ExprKind::Load { name, index } if typ.is_bfloat() => {
                Expr::load(storage_type(typ), name.clone(), self.mutate_expr(index))
            }
            ExprKind::Variable(name) if typ.is_bfloat() => Expr::var(storage_type(typ), name.clone()),
            _ => walk_expr(self, e),
        }
    }
}

impl IrMutator for LowerBfloatMath {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        let lowered = self.lower(e);
        if e.typ().is_bfloat() {
            internal_assert!(
                lowered.typ() == storage_type(e.typ()),
                "Failed to remove bfloat16 from {}, left {} of type {}",
                e,
                lowered,
                lowered.typ()
            );
        }
        lowered
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        match s.node() {
            StmtNode::For { device_api, .. } if device_supports_bfloat(*device_api) => s.clone(),
            _ => walk_stmt(self, s),
        }
    }
}

/// Rewrites every bfloat16 value in `s` as `uint16` bits and every operation on one as `float32`
/// arithmetic. Panics if any bfloat16 node survives.
pub fn lower_narrow_float_math(s: &Stmt) -> Stmt {
    LowerBfloatMath.mutate_stmt(s)
}

/// [`lower_narrow_float_math`] for a lone expression.
pub fn lower_narrow_float_math_expr(e: &Expr) -> Expr {
    LowerBfloatMath.mutate_expr(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ir_operator::as_const_uint, simplify::simplify_expr};

    fn bf16(value: f32) -> Expr {
        Expr::float_imm(Type::BFloat16, value as f64)
    }

    #[test]
    fn literals_become_bit_patterns() {
        assert_eq!(
            lower_narrow_float_math_expr(&bf16(2.0)),
            Expr::uint_imm(Type::UInt16, 0x4000)
        );
        assert_eq!(
            lower_narrow_float_math_expr(&bf16(-1.0)),
            Expr::uint_imm(Type::UInt16, 0xbf80)
        );
    }

    #[test]
    fn arithmetic_widens_and_narrows() {
        let sum = Expr::add(bf16(2.0), bf16(3.0));
        let lowered = lower_narrow_float_math_expr(&sum);
        assert_eq!(lowered.typ(), Type::UInt16);
        assert_eq!(as_const_uint(&simplify_expr(&lowered)), Some(0x40a0));

        let product = Expr::mul(bf16(1.5), bf16(-4.0));
        let lowered = lower_narrow_float_math_expr(&product);
        assert_eq!(as_const_uint(&simplify_expr(&lowered)), Some(0xc0c0));
    }

    #[test]
    fn comparisons_only_widen() {
        let e = Expr::lt(bf16(1.0), bf16(2.0));
        let lowered = lower_narrow_float_math_expr(&e);
        assert_eq!(lowered.typ(), Type::Bool);
        assert_eq!(simplify_expr(&lowered), Expr::from(true));
    }

    #[test]
    fn casts_go_through_float() {
        let to = Expr::cast(Type::BFloat16, Expr::from(3));
        let lowered = lower_narrow_float_math_expr(&to);
        assert_eq!(as_const_uint(&simplify_expr(&lowered)), Some(0x4040));

        let from = Expr::cast(Type::Int32, bf16(5.0));
        let lowered = lower_narrow_float_math_expr(&from);
        assert_eq!(simplify_expr(&lowered), Expr::from(5));
    }

    #[test]
    fn narrowing_truncates() {
        let x = Expr::var(Type::Float32, "x");
        let e = Expr::cast(Type::BFloat16, x);
        let lowered = lower_narrow_float_math_expr(&e);
        let mut map = indexmap::IndexMap::new();
        // 1.005859375f32 is 0x3f80c000. Rounding would give 0x3f81.
        map.insert("x".to_string(), Expr::from(1.005_859_375f32));
        let value = simplify_expr(&crate::substitute::substitute(&map, &lowered));
        assert_eq!(as_const_uint(&value), Some(0x3f80));
    }

    #[test]
    fn loads_and_variables_keep_their_bits() {
        let index = Expr::var(Type::Int32, "i");
        let load = Expr::load(Type::BFloat16.with_lanes(1), "buf", index.clone());
        let s = Stmt::store(
            "out",
            Expr::max(load, Expr::var(Type::BFloat16, "b")),
            index.clone(),
        );
        let lowered = lower_narrow_float_math(&s);
        match lowered.node() {
            StmtNode::Store { value, .. } => {
                assert_eq!(value.typ(), Type::UInt16);
                let text = value.to_string();
                assert!(text.contains("buf["), "{}", text);
            }
            _ => panic!("expected a store, got {}", lowered),
        }
    }

    #[test]
    fn vectors_keep_their_lanes() {
        let v = Expr::var(Type::BFloat16.with_lanes(4), "v");
        let e = Expr::add(v.clone(), v);
        let lowered = lower_narrow_float_math_expr(&e);
        assert_eq!(lowered.typ(), Type::UInt16.with_lanes(4));
    }

    #[test]
    fn loop_bodies_are_lowered() {
        let body = Stmt::evaluate(Expr::var(Type::BFloat16, "b"));
        let s = Stmt::for_loop(
            "i",
            Expr::from(0),
            Expr::from(4),
            crate::opcode::ForType::Serial,
            DeviceApi::Cuda,
            body,
        );
        let lowered = lower_narrow_float_math(&s);
        match lowered.node() {
            StmtNode::For { body, .. } => match body.node() {
                StmtNode::Evaluate(value) => assert_eq!(value.typ(), Type::UInt16),
                _ => panic!("unexpected body {}", body),
            },
            _ => panic!("expected a loop, got {}", lowered),
        }
    }

    #[test]
    #[should_panic(expected = "Failed to remove bfloat16")]
    fn bfloat_calls_are_not_lowered() {
        let call = Expr::call(
            Type::BFloat16,
            "f",
            crate::opcode::CallType::Extern,
            vec![],
        );
        lower_narrow_float_math_expr(&call);
    }
}
