//! Structural tree rewriting.
//!
//! A mutator overrides [`IrMutator::mutate_expr`] / [`IrMutator::mutate_stmt`] for the node kinds
//! it cares about and calls [`walk_expr`] / [`walk_stmt`] for the rest. The walkers rebuild a node
//! from its mutated children, and hand back the original node untouched when no child changed, so
//! unmodified subtrees stay shared between the input and output trees.

use crate::{
    expr::{Expr, ExprKind},
    stmt::{Stmt, StmtNode},
};

pub trait IrMutator {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        walk_expr(self, e)
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        walk_stmt(self, s)
    }
}

pub fn walk_expr<M: IrMutator + ?Sized>(m: &mut M, e: &Expr) -> Expr {
    match e.kind() {
        ExprKind::IntImm(_)
        | ExprKind::UIntImm(_)
        | ExprKind::FloatImm(_)
        | ExprKind::Variable(_) => e.clone(),
        ExprKind::Cast(value) => {
            let new_value = m.mutate_expr(value);
            if new_value.same_as(value) {
                e.clone()
            } else {
                Expr::cast(e.typ().with_lanes(new_value.typ().lanes()), new_value)
            }
        }
        ExprKind::Reinterpret(value) => {
            let new_value = m.mutate_expr(value);
            if new_value.same_as(value) {
                e.clone()
            } else {
                Expr::reinterpret(e.typ(), new_value)
            }
        }
        ExprKind::Binary(op, a, b) => {
            let new_a = m.mutate_expr(a);
            let new_b = m.mutate_expr(b);
            if new_a.same_as(a) && new_b.same_as(b) {
                e.clone()
            } else {
                Expr::binary(*op, new_a, new_b)
            }
        }
        ExprKind::Compare(op, a, b) => {
            let new_a = m.mutate_expr(a);
            let new_b = m.mutate_expr(b);
            if new_a.same_as(a) && new_b.same_as(b) {
                e.clone()
            } else {
                Expr::compare(*op, new_a, new_b)
            }
        }
        ExprKind::And(a, b) => {
            let new_a = m.mutate_expr(a);
            let new_b = m.mutate_expr(b);
            if new_a.same_as(a) && new_b.same_as(b) {
                e.clone()
            } else {
                Expr::and(new_a, new_b)
            }
        }
        ExprKind::Or(a, b) => {
            let new_a = m.mutate_expr(a);
            let new_b = m.mutate_expr(b);
            if new_a.same_as(a) && new_b.same_as(b) {
                e.clone()
            } else {
                Expr::or(new_a, new_b)
            }
        }
        ExprKind::Not(a) => {
            let new_a = m.mutate_expr(a);
            if new_a.same_as(a) {
                e.clone()
            } else {
                Expr::logical_not(new_a)
            }
        }
        ExprKind::Select(c, t, f) => {
            let new_c = m.mutate_expr(c);
            let new_t = m.mutate_expr(t);
            let new_f = m.mutate_expr(f);
            if new_c.same_as(c) && new_t.same_as(t) && new_f.same_as(f) {
                e.clone()
            } else {
                Expr::select(new_c, new_t, new_f)
            }
        }
        ExprKind::Broadcast(value) => {
            let new_value = m.mutate_expr(value);
            if new_value.same_as(value) {
                e.clone()
            } else {
                Expr::broadcast(new_value, e.typ().lanes())
            }
        }
        ExprKind::Load { name, index } => {
            let new_index = m.mutate_expr(index);
            if new_index.same_as(index) {
                e.clone()
            } else {
                Expr::load(e.typ(), name.clone(), new_index)
            }
        }
        ExprKind::Let { name, value, body } => {
            let new_value = m.mutate_expr(value);
            let new_body = m.mutate_expr(body);
            if new_value.same_as(value) && new_body.same_as(body) {
                e.clone()
            } else {
                Expr::let_in(name.clone(), new_value, new_body)
            }
        }
        ExprKind::Call {
            name,
            call_type,
            args,
        } => {
            let new_args = args.iter().map(|arg| m.mutate_expr(arg)).collect::<Vec<_>>();
            if new_args.iter().zip(args).all(|(new, old)| new.same_as(old)) {
                e.clone()
            } else {
                Expr::call(e.typ(), name.clone(), *call_type, new_args)
            }
        }
    }
}

pub fn walk_stmt<M: IrMutator + ?Sized>(m: &mut M, s: &Stmt) -> Stmt {
    match s.node() {
        StmtNode::LetStmt { name, value, body } => {
            let new_value = m.mutate_expr(value);
            let new_body = m.mutate_stmt(body);
            if new_value.same_as(value) && new_body.same_as(body) {
                s.clone()
            } else {
                Stmt::let_stmt(name.clone(), new_value, new_body)
            }
        }
        StmtNode::AssertStmt { condition, message } => {
            let new_condition = m.mutate_expr(condition);
            let new_message = m.mutate_expr(message);
            if new_condition.same_as(condition) && new_message.same_as(message) {
                s.clone()
            } else {
                Stmt::assert_stmt(new_condition, new_message)
            }
        }
        StmtNode::For {
            name,
            min,
            extent,
            for_type,
            device_api,
            body,
        } => {
            let new_min = m.mutate_expr(min);
            let new_extent = m.mutate_expr(extent);
            let new_body = m.mutate_stmt(body);
            if new_min.same_as(min) && new_extent.same_as(extent) && new_body.same_as(body) {
                s.clone()
            } else {
                Stmt::for_loop(
                    name.clone(),
                    new_min,
                    new_extent,
                    *for_type,
                    *device_api,
                    new_body,
                )
            }
        }
        StmtNode::Store { name, value, index } => {
            let new_value = m.mutate_expr(value);
            let new_index = m.mutate_expr(index);
            if new_value.same_as(value) && new_index.same_as(index) {
                s.clone()
            } else {
                Stmt::store(name.clone(), new_value, new_index)
            }
        }
        StmtNode::IfThenElse {
            condition,
            then_case,
            else_case,
        } => {
            let new_condition = m.mutate_expr(condition);
            let new_then = m.mutate_stmt(then_case);
            let new_else = else_case.as_ref().map(|else_case| m.mutate_stmt(else_case));
            let else_same = match (&new_else, else_case) {
                (Some(new), Some(old)) => new.same_as(old),
                _ => true,
            };
            if new_condition.same_as(condition) && new_then.same_as(then_case) && else_same {
                s.clone()
            } else {
                Stmt::if_then_else(new_condition, new_then, new_else)
            }
        }
        StmtNode::Evaluate(value) => {
            let new_value = m.mutate_expr(value);
            if new_value.same_as(value) {
                s.clone()
            } else {
                Stmt::evaluate(new_value)
            }
        }
        StmtNode::Block(first, rest) => {
            let new_first = m.mutate_stmt(first);
            let new_rest = m.mutate_stmt(rest);
            if new_first.same_as(first) && new_rest.same_as(rest) {
                s.clone()
            } else {
                Stmt::block(new_first, new_rest)
            }
        }
    }
}

/// Does `name` occur free in `e`?
pub fn expr_uses_var(e: &Expr, name: &str) -> bool {
    match e.kind() {
        ExprKind::IntImm(_) | ExprKind::UIntImm(_) | ExprKind::FloatImm(_) => false,
        ExprKind::Variable(var) => var == name,
        ExprKind::Cast(value) | ExprKind::Reinterpret(value) | ExprKind::Broadcast(value) => {
            expr_uses_var(value, name)
        }
        ExprKind::Not(a) => expr_uses_var(a, name),
        ExprKind::Binary(_, a, b)
        | ExprKind::Compare(_, a, b)
        | ExprKind::And(a, b)
        | ExprKind::Or(a, b) => expr_uses_var(a, name) || expr_uses_var(b, name),
        ExprKind::Select(c, t, f) => {
            expr_uses_var(c, name) || expr_uses_var(t, name) || expr_uses_var(f, name)
        }
        ExprKind::Load { index, .. } => expr_uses_var(index, name),
        ExprKind::Let {
            name: bound,
            value,
            body,
        } => expr_uses_var(value, name) || (bound != name && expr_uses_var(body, name)),
        ExprKind::Call { args, .. } => args.iter().any(|arg| expr_uses_var(arg, name)),
    }
}

/// Does `name` occur free in `s`?
pub fn stmt_uses_var(s: &Stmt, name: &str) -> bool {
    match s.node() {
        StmtNode::LetStmt {
            name: bound,
            value,
            body,
        } => expr_uses_var(value, name) || (bound != name && stmt_uses_var(body, name)),
        StmtNode::AssertStmt { condition, message } => {
            expr_uses_var(condition, name) || expr_uses_var(message, name)
        }
        StmtNode::For {
            name: bound,
            min,
            extent,
            body,
            ..
        } => {
            expr_uses_var(min, name)
                || expr_uses_var(extent, name)
                || (bound != name && stmt_uses_var(body, name))
        }
        StmtNode::Store { value, index, .. } => {
            expr_uses_var(value, name) || expr_uses_var(index, name)
        }
        StmtNode::IfThenElse {
            condition,
            then_case,
            else_case,
        } => {
            expr_uses_var(condition, name)
                || stmt_uses_var(then_case, name)
                || else_case
                    .as_ref()
                    .map_or(false, |else_case| stmt_uses_var(else_case, name))
        }
        StmtNode::Evaluate(value) => expr_uses_var(value, name),
        StmtNode::Block(first, rest) => stmt_uses_var(first, name) || stmt_uses_var(rest, name),
    }
}
