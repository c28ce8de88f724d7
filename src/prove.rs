//! Proving boolean expressions true.
//!
//! A proof is a simplification to the literal `true`. When the simplifier cannot get there, the
//! prover goes looking for a counter-example by substituting random values for the free variables.
//! It never claims a proof it does not have: if no counter-example turns up, the answer is still
//! `false`, and the expression is logged as a missed simplification.

use indexmap::IndexMap;
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::{
    expr::{Expr, ExprKind},
    ir_mutator::{walk_expr, IrMutator},
    ir_operator::{is_const, is_one, make_const, unwrap_likely},
    opcode::intrinsic,
    scope::Scope,
    simplify::simplify_expr,
    substitute::substitute,
    typ::Type,
    Options,
};

/// Strips `likely` markers anywhere in the tree.
struct RemoveLikelies;

impl IrMutator for RemoveLikelies {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e.kind() {
            ExprKind::Call { args, .. }
                if e.is_intrinsic(intrinsic::LIKELY)
                    || e.is_intrinsic(intrinsic::LIKELY_IF_INNERMOST) =>
            {
                match args.first() {
                    Some(arg) => self.mutate_expr(arg),
                    None => e.clone(),
                }
            }
            _ => walk_expr(self, e),
        }
    }
}

/// Gives every variable a short fresh name, so that trials only deal with the free variables and
/// `Let` bodies keep referring to their own bindings.
#[derive(Default)]
struct RenameVariables {
    count: usize,
    vars: IndexMap<String, String>,
    lets: Scope<'static, String>,
    /// The free variables, by new name, in order of first occurrence.
    out_vars: Vec<(Type, String)>,
}

impl RenameVariables {
    fn fresh_name(&mut self) -> String {
        let name = format!("v{}", self.count);
        self.count += 1;
        name
    }
}

impl IrMutator for RenameVariables {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e.kind() {
            ExprKind::Variable(name) => {
                if let Some(renamed) = self.lets.get(name) {
                    return Expr::var(e.typ(), renamed.clone());
                }
                if let Some(renamed) = self.vars.get(name) {
                    return Expr::var(e.typ(), renamed.clone());
                }
                let renamed = self.fresh_name();
                self.vars.insert(name.clone(), renamed.clone());
                self.out_vars.push((e.typ(), renamed.clone()));
                Expr::var(e.typ(), renamed)
            }
            ExprKind::Let { name, value, body } => {
                let renamed = self.fresh_name();
                let new_value = self.mutate_expr(value);
                self.lets.push(name.clone(), renamed.clone());
                let new_body = self.mutate_expr(body);
                self.lets.pop(name);
                Expr::let_in(renamed, new_value, new_body)
            }
            _ => walk_expr(self, e),
        }
    }
}

/// A random value for one trial, in `[-0x7fff, 0x8000]`.
fn trial_value(rng: &mut StdRng) -> i64 {
    (rng.next_u32() & 0xffff) as i64 - 0x7fff
}

/// A trial literal of type `typ`. Booleans take the low bit, so both values turn up.
fn trial_const(typ: Type, rng: &mut StdRng) -> Expr {
    let value = trial_value(rng);
    if typ.is_bool() {
        make_const(typ, value & 1)
    } else {
        make_const(typ, value)
    }
}

pub struct Prover {
    rng: StdRng,
    trials: usize,
}

impl Prover {
    pub fn new(seed: u64) -> Self {
        Self::with_options(&Options {
            proof_seed: seed,
            ..Options::default()
        })
    }

    pub fn with_options(options: &Options) -> Self {
        Self {
            rng: StdRng::seed_from_u64(options.proof_seed),
            trials: options.proof_trials,
        }
    }

    /// Returns true only if `e` is provably true for every value of its free variables.
    pub fn can_prove(&mut self, e: &Expr) -> bool {
        let e = RemoveLikelies.mutate_expr(e);
        internal_assert!(
            e.typ().is_bool(),
            "Argument to can_prove is not a boolean Expr: {}",
            e
        );

        let mut e = simplify_expr(&e);
        if let Some(arg) = unwrap_likely(&e) {
            e = arg.clone();
        }

        if is_const(&e) {
            return is_one(&e);
        }

        let mut renamer = RenameVariables::default();
        let renamed = renamer.mutate_expr(&e);

        for trial in 0..self.trials {
            let substitutions = renamer
                .out_vars
                .iter()
                .map(|(typ, name)| (name.clone(), trial_const(*typ, &mut self.rng)))
                .collect::<IndexMap<_, _>>();

            let mut outcome = simplify_expr(&substitute(&substitutions, &renamed));
            if let Some(arg) = unwrap_likely(&outcome) {
                outcome = arg.clone();
            }
            if !is_one(&outcome) {
                log::debug!(
                    "can_prove: counter-example for {} on trial {}: {:?} gives {}",
                    e,
                    trial,
                    substitutions,
                    outcome
                );
                return false;
            }
        }

        log::info!(
            "Failed to prove, but could not find a counter-example:\n {}",
            e
        );
        false
    }
}

/// Attempts to prove `e` true with default options. A `false` answer means "not proven", not
/// "disproven".
pub fn can_prove(e: &Expr) -> bool {
    Prover::with_options(&Options::default()).can_prove(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_free_and_bound_variables() {
        let x = Expr::var(Type::Int32, "x");
        let y = Expr::var(Type::Int32, "y");
        let e = Expr::let_in("x", y.clone() + 1, x.clone() * y) + x;

        let mut renamer = RenameVariables::default();
        let renamed = renamer.mutate_expr(&e);

        let names = renamer
            .out_vars
            .iter()
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["v1", "v2"]);
        let v0 = Expr::var(Type::Int32, "v0");
        let v1 = Expr::var(Type::Int32, "v1");
        let v2 = Expr::var(Type::Int32, "v2");
        assert_eq!(
            renamed,
            Expr::let_in("v0", v1.clone() + 1, v0 * v1) + v2
        );
    }

    #[test]
    fn likely_markers_are_removed() {
        let x = Expr::var(Type::Int32, "x");
        let y = Expr::var(Type::Int32, "y");
        let e = Expr::and(
            Expr::likely(Expr::lt(x.clone(), Expr::from(3))),
            Expr::lt(y.clone(), Expr::from(4)),
        );
        assert_eq!(
            RemoveLikelies.mutate_expr(&e),
            Expr::and(Expr::lt(x, Expr::from(3)), Expr::lt(y, Expr::from(4)))
        );
    }

    #[test]
    fn trial_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..1000 {
            let value = trial_value(&mut rng);
            assert!((-0x7fff..=0x8000).contains(&value));
        }
    }

    #[test]
    fn boolean_trials_take_both_values() {
        let mut rng = StdRng::seed_from_u64(0);
        let values = (0..64)
            .map(|_| trial_const(Type::Bool, &mut rng))
            .collect::<Vec<_>>();
        assert!(values.contains(&Expr::from(true)));
        assert!(values.contains(&Expr::from(false)));
    }

    #[test]
    fn same_seed_same_answer() {
        let x = Expr::var(Type::Int32, "x");
        let e = Expr::ge(x.clone() * x, Expr::from(0));
        assert!(!Prover::new(7).can_prove(&e));
        assert!(!Prover::new(7).can_prove(&e));
    }
}
