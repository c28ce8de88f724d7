use num_traits::{Float, PrimInt, Signed, Unsigned};

#[macro_use]
pub mod error;

pub mod bfloat16;
pub mod expr;
pub mod fold;
pub mod interval;
pub mod ir_mutator;
pub mod ir_operator;
pub mod lower_bfloat_math;
pub mod opcode;
pub mod prove;
pub mod scope;
pub mod simplify;
pub mod stmt;
pub mod substitute;
pub mod typ;

#[cfg(test)]
mod tests;

pub use bfloat16::Bfloat16;
pub use expr::{Expr, ExprKind};
pub use interval::{Interval, ModulusRemainder};
pub use lower_bfloat_math::{lower_narrow_float_math, lower_narrow_float_math_expr};
pub use opcode::{BinaryOp, CallType, CompareOp, DeviceApi, ForType};
pub use prove::{can_prove, Prover};
pub use scope::Scope;
pub use simplify::{
    simplify, simplify_all_subexpressions, simplify_expr, simplify_stmt, AlgebraicRules,
    RewriteRules, ScopedFact, Simplify,
};
pub use stmt::{Stmt, StmtNode};
pub use typ::{Type, TypeCode};

/// Knobs shared by the simplifier and the prover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Drop `Let` bindings whose name no longer occurs after simplification.
    pub remove_dead_lets: bool,
    /// Leave float arithmetic unfolded.
    pub no_float_simplify: bool,
    /// Number of random trials `can_prove` tries before giving up.
    pub proof_trials: usize,
    /// Seed for the trial value generator. Proof results are reproducible for a given seed.
    pub proof_seed: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            remove_dead_lets: true,
            no_float_simplify: false,
            proof_trials: 100,
            proof_seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriState {
    False,
    True,
    Undeterminate,
}

pub fn tri_state(x: bool) -> TriState {
    if x {
        TriState::True
    } else {
        TriState::False
    }
}

/// Division rounding so that the remainder is non-negative. Dividing by zero yields zero, and
/// `MIN / -1` wraps to `MIN`.
pub fn euclidean_div<T: PrimInt + Signed>(numerator: T, denominator: T) -> T {
    if denominator == T::zero() {
        T::zero()
    } else if denominator == -T::one() && numerator == T::min_value() {
        T::min_value()
    } else {
        let q = numerator / denominator;
        let r = numerator % denominator;
        if r < T::zero() {
            if denominator > T::zero() {
                q - T::one()
            } else {
                q + T::one()
            }
        } else {
            q
        }
    }
}

/// The non-negative remainder matching [`euclidean_div`]. Modulo zero yields zero.
pub fn euclidean_mod<T: PrimInt + Signed>(numerator: T, denominator: T) -> T {
    if denominator == T::zero() || (denominator == -T::one() && numerator == T::min_value()) {
        T::zero()
    } else {
        let r = numerator % denominator;
        if r < T::zero() {
            r + denominator.abs()
        } else {
            r
        }
    }
}

pub fn udiv<T: PrimInt + Unsigned>(numerator: T, denominator: T) -> T {
    if denominator == T::zero() {
        T::zero()
    } else {
        numerator / denominator
    }
}

pub fn umod<T: PrimInt + Unsigned>(numerator: T, denominator: T) -> T {
    if denominator == T::zero() {
        T::zero()
    } else {
        numerator % denominator
    }
}

pub fn fmax<T: Float>(a: T, b: T) -> T {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.max(b)
    }
}

pub fn fmin<T: Float>(a: T, b: T) -> T {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.min(b)
    }
}
