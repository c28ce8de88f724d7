use super::{expr_references, stmt_references, ConstBounds, Simplify, VarInfo};
use crate::{
    expr::{Expr, ExprKind},
    fold::fold_constants,
    interval::ModulusRemainder,
    ir_mutator::{walk_expr, IrMutator},
    ir_operator::{as_const_bool, is_no_op, is_one, is_zero, make_const},
    opcode::{CallType, DeviceApi},
    stmt::{Stmt, StmtNode},
};

impl Simplify<'_> {
    /// Loops on the root of `e` until nothing applies. The children of `e` must already be
    /// simplified.
    fn finish(&self, mut e: Expr) -> Expr {
        loop {
            if let Some(folded) = fold_constants(&e, self.no_float_simplify) {
                log::trace!("folded {} into {}", e, folded);
                return folded;
            }

            let rewritten = self
                .rewrite_with_facts(&e)
                .or_else(|| self.rules.rewrite(&e));
            match rewritten {
                Some(next) => {
                    log::trace!("rewrote {} into {}", e, next);
                    e = next;
                }
                None => return e,
            }
        }
    }

    fn visit_variable(&mut self, e: &Expr, name: &str) -> Expr {
        if let Some(info) = self.var_info.get_mut(name) {
            if let Some(replacement) = &info.replacement {
                info.new_uses += 1;
                return replacement.clone();
            }
            info.old_uses += 1;
        }

        let typ = e.typ();
        if !typ.is_float() {
            if let Some(value) = self.bounds_info.get(name).and_then(ConstBounds::single_point) {
                return make_const(typ, value);
            }
        }

        e.clone()
    }

    /// Pushes everything known about a freshly bound `name` whose value simplified to `value`.
    fn enter_binding(&mut self, name: &str, value: &Expr) {
        let replacement = if crate::ir_operator::is_const(value) {
            Some(value.clone())
        } else {
            None
        };
        self.var_info.push(
            name,
            VarInfo {
                replacement,
                ..VarInfo::default()
            },
        );

        let bounds = if value.typ().is_float() {
            ConstBounds::default()
        } else {
            self.const_bounds(value)
        };
        self.bounds_info.push(name, bounds);

        let alignment = if value.typ().is_int() {
            self.alignment_of(value)
        } else {
            ModulusRemainder::unknown()
        };
        self.alignment_info.push(name, alignment);
    }

    fn exit_binding(&mut self, name: &str) -> VarInfo {
        self.bounds_info.pop(name);
        self.alignment_info.pop(name);
        let info = self.var_info.pop(name);
        self.stats.replaced_uses += info.new_uses;
        info
    }

    fn should_drop_let(&mut self, name: &str, info: &VarInfo, still_referenced: bool) -> bool {
        if !self.remove_dead_lets {
            return false;
        }
        // A zero count is exact. A positive count may include uses that a rewrite later erased,
        // so it is confirmed against the new body.
        let dead = info.old_uses == 0 || !still_referenced;
        if dead {
            log::debug!("dropping dead binding of {}", name);
            self.stats.dead_lets += 1;
        }
        dead
    }

    /// Whether loops for `device_api` have their bodies simplified. Every device does today.
    fn should_simplify_loop_body(&self, _device_api: DeviceApi) -> bool {
        true
    }
}

impl IrMutator for Simplify<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e.kind() {
            ExprKind::IntImm(_) | ExprKind::UIntImm(_) | ExprKind::FloatImm(_) => e.clone(),
            ExprKind::Variable(name) => self.visit_variable(e, name),
            ExprKind::Select(condition, true_value, false_value) => {
                let new_condition = self.mutate_expr(condition);
                match as_const_bool(&new_condition) {
                    Some(true) => return self.mutate_expr(true_value),
                    Some(false) => return self.mutate_expr(false_value),
                    None => {}
                }

                let new_true = self.scoped_truth(&new_condition).mutate_expr(true_value);
                let new_false = self.scoped_falsehood(&new_condition).mutate_expr(false_value);

                if new_condition.same_as(condition)
                    && new_true.same_as(true_value)
                    && new_false.same_as(false_value)
                {
                    self.finish(e.clone())
                } else {
                    self.finish(Expr::select(new_condition, new_true, new_false))
                }
            }
            ExprKind::Let { name, value, body } => {
                let new_value = self.mutate_expr(value);
                self.enter_binding(name, &new_value);
                let new_body = self.mutate_expr(body);
                let info = self.exit_binding(name);

                let still_referenced = info.old_uses > 0 && expr_references(&new_body, name);
                if self.should_drop_let(name, &info, still_referenced) {
                    new_body
                } else if new_value.same_as(value) && new_body.same_as(body) {
                    e.clone()
                } else {
                    Expr::let_in(name.clone(), new_value, new_body)
                }
            }
            ExprKind::Load { name, .. } => {
                self.found_buffer_reference(name, 0);
                let new_e = walk_expr(self, e);
                self.finish(new_e)
            }
            ExprKind::Call {
                name,
                call_type: CallType::Image,
                args,
            } => {
                self.found_buffer_reference(name, args.len());
                walk_expr(self, e)
            }
            _ => {
                let new_e = walk_expr(self, e);
                self.finish(new_e)
            }
        }
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        match s.node() {
            StmtNode::LetStmt { name, value, body } => {
                let new_value = self.mutate_expr(value);
                self.enter_binding(name, &new_value);
                let new_body = self.mutate_stmt(body);
                let info = self.exit_binding(name);

                let still_referenced = info.old_uses > 0 && stmt_references(&new_body, name);
                if self.should_drop_let(name, &info, still_referenced) {
                    new_body
                } else if new_value.same_as(value) && new_body.same_as(body) {
                    s.clone()
                } else {
                    Stmt::let_stmt(name.clone(), new_value, new_body)
                }
            }
            StmtNode::AssertStmt { condition, message } => {
                let new_condition = self.mutate_expr(condition);
                if is_one(&new_condition) {
                    return Stmt::no_op();
                }
                if is_zero(&new_condition) {
                    log::warn!("This assertion is guaranteed to fail: {}", message);
                }
                let new_message = self.mutate_expr(message);
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
                let new_min = self.mutate_expr(min);
                let new_extent = self.mutate_expr(extent);
                if Self::const_int(&new_extent).map_or(false, |extent| extent <= 0) {
                    return Stmt::no_op();
                }

                let min_bounds = self.const_bounds(&new_min);
                let extent_bounds = self.const_bounds(&new_extent);
                let loop_bounds = ConstBounds {
                    min: min_bounds.min,
                    max: min_bounds
                        .max
                        .zip(extent_bounds.max)
                        .and_then(|(m, e)| m.checked_add(e))
                        .and_then(|last| last.checked_sub(1)),
                };
                log::trace!("loop {} ranges over {:?}", name, loop_bounds);

                self.bounds_info.push(name.as_str(), loop_bounds);
                self.alignment_info
                    .push(name.as_str(), ModulusRemainder::unknown());
                self.var_info.push(name.as_str(), VarInfo::default());
                let new_body = if self.should_simplify_loop_body(*device_api) {
                    self.mutate_stmt(body)
                } else {
                    body.clone()
                };
                self.var_info.pop(name);
                self.alignment_info.pop(name);
                self.bounds_info.pop(name);

                if is_no_op(&new_body) {
                    Stmt::no_op()
                } else if new_min.same_as(min)
                    && new_extent.same_as(extent)
                    && new_body.same_as(body)
                {
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
            StmtNode::Store { name, .. } => {
                self.found_buffer_reference(name, 0);
                crate::ir_mutator::walk_stmt(self, s)
            }
            StmtNode::IfThenElse {
                condition,
                then_case,
                else_case,
            } => {
                let new_condition = self.mutate_expr(condition);
                match as_const_bool(&new_condition) {
                    Some(true) => return self.mutate_stmt(then_case),
                    Some(false) => {
                        return match else_case {
                            Some(else_case) => self.mutate_stmt(else_case),
                            None => Stmt::no_op(),
                        }
                    }
                    None => {}
                }

                let new_then = self.scoped_truth(&new_condition).mutate_stmt(then_case);
                let new_else = else_case.as_ref().and_then(|else_case| {
                    let new_else = self.scoped_falsehood(&new_condition).mutate_stmt(else_case);
                    (!is_no_op(&new_else)).then_some(new_else)
                });

                match new_else {
                    None if is_no_op(&new_then) => Stmt::no_op(),
                    // Turn this: if (c) {} else { s }
                    // Into this: if (!c) { s }
                    Some(new_else) if is_no_op(&new_then) => {
                        let negated = self.finish(Expr::logical_not(new_condition));
                        Stmt::if_then_else(negated, new_else, None)
                    }
                    new_else => {
                        let else_same = match (&new_else, else_case) {
                            (Some(new), Some(old)) => new.same_as(old),
                            (None, None) => true,
                            _ => false,
                        };
                        if new_condition.same_as(condition) && new_then.same_as(then_case) && else_same
                        {
                            s.clone()
                        } else {
                            Stmt::if_then_else(new_condition, new_then, new_else)
                        }
                    }
                }
            }
            StmtNode::Evaluate(_) => crate::ir_mutator::walk_stmt(self, s),
            StmtNode::Block(first, rest) => {
                let new_first = self.mutate_stmt(first);
                let new_rest = self.mutate_stmt(rest);
                if is_no_op(&new_first) {
                    new_rest
                } else if is_no_op(&new_rest) {
                    new_first
                } else if new_first.same_as(first) && new_rest.same_as(rest) {
                    s.clone()
                } else {
                    Stmt::block(new_first, new_rest)
                }
            }
        }
    }
}
