//! Symbolic simplification of expression and statement trees.
//!
//! [`Simplify`] walks a tree bottom-up. Children are simplified first; then the node is constant
//! folded, checked against what is known about the values flowing into it (constant bounds and
//! alignment), and finally handed to a pluggable [`RewriteRules`] facility, repeating at the node
//! until nothing applies. Context flows down the walk through three scopes:
//!
//! - `bounds_info`: constant bounds per integer variable, seeded from the caller and extended by
//!   `Let` values and loop ranges;
//! - `alignment_info`: modulus/remainder facts, linked from the caller's scope;
//! - `var_info`: per-variable use counts and an optional replacement, pushed by `Let` bindings and
//!   by the facts learned on entry to a branch (see [`ScopedFact`]).

mod bounds;
mod rules;
mod scoped_fact;
mod visit;

pub use rules::{AlgebraicRules, RewriteRules};
pub use scoped_fact::ScopedFact;

use crate::{
    expr::{Expr, ExprKind},
    interval::{Interval, ModulusRemainder},
    ir_mutator::IrMutator,
    ir_operator::{as_const_float, as_const_int, as_const_uint},
    opcode::CallType,
    scope::Scope,
    stmt::{Stmt, StmtNode},
    Options,
};

/// Literal bounds on an integer variable. A missing end is unknown, never approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstBounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl ConstBounds {
    pub const fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    pub const fn point(value: i64) -> Self {
        Self::new(Some(value), Some(value))
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The single value these bounds allow, if they pin one.
    pub fn single_point(&self) -> Option<i64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => Some(min),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VarInfo {
    /// Occurrences of the variable left in place.
    pub old_uses: usize,
    /// Occurrences replaced by `replacement`.
    pub new_uses: usize,
    pub replacement: Option<Expr>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyStats {
    /// Variable occurrences replaced by a known value.
    pub replaced_uses: usize,
    /// `Let` bindings dropped because nothing referenced them any more.
    pub dead_lets: usize,
}

static DEFAULT_RULES: AlgebraicRules = AlgebraicRules;

pub struct Simplify<'a> {
    pub(crate) remove_dead_lets: bool,
    pub(crate) no_float_simplify: bool,
    pub(crate) bounds_info: Scope<'a, ConstBounds>,
    pub(crate) alignment_info: Scope<'a, ModulusRemainder>,
    pub(crate) var_info: Scope<'a, VarInfo>,
    pub(crate) rules: &'a dyn RewriteRules,
    pub(crate) stats: SimplifyStats,
}

impl<'a> Simplify<'a> {
    /// Only literal bounds are taken from `bounds`; symbolic ends are dropped. The alignment
    /// scope is read through, not copied.
    pub fn new(
        remove_dead_lets: bool,
        bounds: &Scope<'_, Interval>,
        alignment: &'a Scope<'a, ModulusRemainder>,
    ) -> Self {
        let mut alignment_info = Scope::new();
        alignment_info.set_containing_scope(Some(alignment));

        let mut bounds_info = Scope::new();
        for (name, interval) in bounds.iter() {
            let bounds = ConstBounds {
                min: interval.min.as_ref().and_then(as_const_int),
                max: interval.max.as_ref().and_then(as_const_int),
            };
            if !bounds.is_unbounded() {
                bounds_info.push(name, bounds);
            }
        }

        Self {
            remove_dead_lets,
            no_float_simplify: false,
            bounds_info,
            alignment_info,
            var_info: Scope::new(),
            rules: &DEFAULT_RULES,
            stats: SimplifyStats::default(),
        }
    }

    pub fn with_options(
        options: &Options,
        bounds: &Scope<'_, Interval>,
        alignment: &'a Scope<'a, ModulusRemainder>,
    ) -> Self {
        let mut simplify = Self::new(options.remove_dead_lets, bounds, alignment);
        simplify.no_float_simplify = options.no_float_simplify;
        simplify
    }

    /// Replaces the algebraic rule facility.
    pub fn with_rules(mut self, rules: &'a dyn RewriteRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn stats(&self) -> SimplifyStats {
        self.stats
    }

    pub fn var_info(&self, name: &str) -> Option<&VarInfo> {
        self.var_info.get(name)
    }

    /// Starts a branch scope with nothing learned yet.
    pub fn scoped_fact(&mut self) -> ScopedFact<'_, 'a> {
        ScopedFact::new(self)
    }

    /// Starts a branch scope in which `fact` holds.
    pub fn scoped_truth(&mut self, fact: &Expr) -> ScopedFact<'_, 'a> {
        let mut scoped = ScopedFact::new(self);
        scoped.learn_true(fact);
        scoped
    }

    /// Starts a branch scope in which `fact` does not hold.
    pub fn scoped_falsehood(&mut self, fact: &Expr) -> ScopedFact<'_, 'a> {
        let mut scoped = ScopedFact::new(self);
        scoped.learn_false(fact);
        scoped
    }

    /// A scalar float literal. Vectors never count, even if every lane holds the same value.
    pub fn const_float(e: &Expr) -> Option<f64> {
        if e.typ().is_vector() {
            None
        } else {
            as_const_float(e)
        }
    }

    /// A scalar signed integer literal. Vectors never count.
    pub fn const_int(e: &Expr) -> Option<i64> {
        if e.typ().is_vector() {
            None
        } else {
            as_const_int(e)
        }
    }

    /// A scalar unsigned integer literal. Vectors never count.
    pub fn const_uint(e: &Expr) -> Option<u64> {
        if e.typ().is_vector() {
            None
        } else {
            as_const_uint(e)
        }
    }

    /// Records that buffer `name` is accessed, which keeps alive the bindings of its base name
    /// and of its stride and min for each of its first `dimensions` dimensions.
    pub fn found_buffer_reference(&mut self, name: &str, dimensions: usize) {
        for referenced in buffer_reference_names(name, dimensions) {
            if let Some(info) = self.var_info.get_mut(&referenced) {
                info.old_uses += 1;
            }
        }
    }
}

/// The variable names a reference to buffer `name` with `dimensions` coordinates keeps alive.
pub(crate) fn buffer_reference_names(name: &str, dimensions: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(2 * dimensions + 1);
    for i in 0..dimensions {
        names.push(format!("{}.stride.{}", name, i));
        names.push(format!("{}.min.{}", name, i));
    }
    names.push(name.to_string());
    names
}

fn expr_references(e: &Expr, var: &str) -> bool {
    match e.kind() {
        ExprKind::Variable(name) => name == var,
        ExprKind::Load { name, index } => {
            buffer_reference_names(name, 0).iter().any(|n| n == var) || expr_references(index, var)
        }
        ExprKind::Call {
            name,
            call_type: CallType::Image,
            args,
        } => {
            buffer_reference_names(name, args.len())
                .iter()
                .any(|n| n == var)
                || args.iter().any(|arg| expr_references(arg, var))
        }
        ExprKind::Call { args, .. } => args.iter().any(|arg| expr_references(arg, var)),
        ExprKind::Let { name, value, body } => {
            expr_references(value, var) || (name != var && expr_references(body, var))
        }
        ExprKind::IntImm(_) | ExprKind::UIntImm(_) | ExprKind::FloatImm(_) => false,
        ExprKind::Cast(a) | ExprKind::Reinterpret(a) | ExprKind::Broadcast(a) | ExprKind::Not(a) => {
            expr_references(a, var)
        }
        ExprKind::Binary(_, a, b)
        | ExprKind::Compare(_, a, b)
        | ExprKind::And(a, b)
        | ExprKind::Or(a, b) => expr_references(a, var) || expr_references(b, var),
        ExprKind::Select(c, t, f) => {
            expr_references(c, var) || expr_references(t, var) || expr_references(f, var)
        }
    }
}

/// Like a free-variable query, but buffer accesses also count as references to the buffer's
/// metadata variables.
fn stmt_references(s: &Stmt, var: &str) -> bool {
    match s.node() {
        StmtNode::LetStmt { name, value, body } => {
            expr_references(value, var) || (name != var && stmt_references(body, var))
        }
        StmtNode::AssertStmt { condition, message } => {
            expr_references(condition, var) || expr_references(message, var)
        }
        StmtNode::For {
            name,
            min,
            extent,
            body,
            ..
        } => {
            expr_references(min, var)
                || expr_references(extent, var)
                || (name != var && stmt_references(body, var))
        }
        StmtNode::Store { name, value, index } => {
            name == var || expr_references(value, var) || expr_references(index, var)
        }
        StmtNode::IfThenElse {
            condition,
            then_case,
            else_case,
        } => {
            expr_references(condition, var)
                || stmt_references(then_case, var)
                || else_case
                    .as_ref()
                    .map_or(false, |else_case| stmt_references(else_case, var))
        }
        StmtNode::Evaluate(value) => expr_references(value, var),
        StmtNode::Block(first, rest) => stmt_references(first, var) || stmt_references(rest, var),
    }
}

/// Simplifies an expression. `bounds` and `alignment` describe the free variables of `e`.
pub fn simplify(
    e: &Expr,
    remove_dead_lets: bool,
    bounds: &Scope<'_, Interval>,
    alignment: &Scope<'_, ModulusRemainder>,
) -> Expr {
    Simplify::new(remove_dead_lets, bounds, alignment).mutate_expr(e)
}

/// Simplifies a statement with the same machinery as [`simplify`].
pub fn simplify_stmt(
    s: &Stmt,
    remove_dead_lets: bool,
    bounds: &Scope<'_, Interval>,
    alignment: &Scope<'_, ModulusRemainder>,
) -> Stmt {
    Simplify::new(remove_dead_lets, bounds, alignment).mutate_stmt(s)
}

/// Simplifies an expression with no outside knowledge, dropping dead lets.
pub fn simplify_expr(e: &Expr) -> Expr {
    simplify(e, true, &Scope::new(), &Scope::new())
}

struct SimplifyExprs;

impl IrMutator for SimplifyExprs {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        simplify_expr(e)
    }
}

/// Simplifies each expression embedded in `s` on its own, leaving the statement structure
/// alone. No context flows between expressions.
pub fn simplify_all_subexpressions(s: &Stmt) -> Stmt {
    SimplifyExprs.mutate_stmt(s)
}
