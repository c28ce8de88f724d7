use std::ops::{Deref, DerefMut};

use tinyvec::TinyVec;

use super::{Simplify, VarInfo};
use crate::{
    expr::{Expr, ExprKind},
    ir_operator::{const_false, const_true, is_const},
    opcode::CompareOp,
};

/// Facts assumed while simplifying one branch.
///
/// Each learned fact binds a variable to the value it must hold inside the branch. The bindings
/// shadow anything already known about the variable and are undone, innermost first, when the
/// guard goes out of scope. Simplification of the branch goes through the guard, which derefs to
/// the simplifier it borrows.
pub struct ScopedFact<'s, 'a> {
    simplify: &'s mut Simplify<'a>,
    pop_list: TinyVec<[String; 4]>,
}

impl<'s, 'a> ScopedFact<'s, 'a> {
    pub fn new(simplify: &'s mut Simplify<'a>) -> Self {
        Self {
            simplify,
            pop_list: TinyVec::new(),
        }
    }

    fn bind(&mut self, name: &str, value: Expr) {
        log::trace!("assuming {} = {}", name, value);
        self.simplify.var_info.push(
            name,
            VarInfo {
                replacement: Some(value),
                ..VarInfo::default()
            },
        );
        self.pop_list.push(name.to_string());
    }

    /// Records what follows from `fact` being true. Facts of other shapes teach nothing.
    pub fn learn_true(&mut self, fact: &Expr) {
        match fact.kind() {
            ExprKind::Variable(name) => self.bind(name, const_true(fact.typ().lanes())),
            ExprKind::Compare(CompareOp::EQ, a, b) => {
                if let Some(name) = a.as_variable() {
                    if is_const(b) {
                        self.bind(name, b.clone());
                    }
                }
            }
            ExprKind::And(a, b) => {
                self.learn_true(a);
                self.learn_true(b);
            }
            ExprKind::Not(a) => self.learn_false(a),
            _ => {}
        }
    }

    /// Records what follows from `fact` being false.
    pub fn learn_false(&mut self, fact: &Expr) {
        match fact.kind() {
            ExprKind::Variable(name) => self.bind(name, const_false(fact.typ().lanes())),
            ExprKind::Compare(CompareOp::NE, a, b) => {
                if let Some(name) = a.as_variable() {
                    if is_const(b) {
                        self.bind(name, b.clone());
                    }
                }
            }
            ExprKind::Or(a, b) => {
                self.learn_false(a);
                self.learn_false(b);
            }
            ExprKind::Not(a) => self.learn_true(a),
            _ => {}
        }
    }

    /// Number of bindings this guard will undo.
    pub fn len(&self) -> usize {
        self.pop_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pop_list.is_empty()
    }
}

impl<'a> Deref for ScopedFact<'_, 'a> {
    type Target = Simplify<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.simplify
    }
}

impl<'a> DerefMut for ScopedFact<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.simplify
    }
}

impl Drop for ScopedFact<'_, '_> {
    fn drop(&mut self) {
        for name in self.pop_list.iter().rev() {
            self.simplify.var_info.pop(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{interval::ModulusRemainder, ir_mutator::IrMutator, scope::Scope, typ::Type};

    #[test]
    fn facts_are_undone_on_drop() {
        let alignment = Scope::<ModulusRemainder>::new();
        let mut simplify = Simplify::new(true, &Scope::new(), &alignment);
        let x = Expr::var(Type::Int32, "x");
        let b = Expr::var(Type::Bool, "b");

        {
            let mut fact = simplify.scoped_fact();
            fact.learn_true(&Expr::and(Expr::eq(x.clone(), Expr::from(5)), b.clone()));
            assert_eq!(fact.len(), 2);
            assert_eq!(fact.mutate_expr(&(x.clone() + 1)), Expr::from(6));
            assert_eq!(fact.mutate_expr(&b), Expr::from(true));
        }

        assert!(simplify.var_info("x").is_none());
        assert_eq!(simplify.mutate_expr(&(x.clone() + 1)), x + 1);
    }

    #[test]
    fn falsehood_learns_through_or_and_not() {
        let alignment = Scope::<ModulusRemainder>::new();
        let mut simplify = Simplify::new(true, &Scope::new(), &alignment);
        let x = Expr::var(Type::Int32, "x");
        let b = Expr::var(Type::Bool, "b");
        let fact = Expr::or(
            Expr::ne(x.clone(), Expr::from(3)),
            Expr::logical_not(b.clone()),
        );

        let mut scoped = simplify.scoped_falsehood(&fact);
        assert_eq!(scoped.len(), 2);
        assert_eq!(scoped.mutate_expr(&(x * 2)), Expr::from(6));
        assert_eq!(scoped.mutate_expr(&b), Expr::from(true));
    }

    #[test]
    fn unhelpful_facts_teach_nothing() {
        let alignment = Scope::<ModulusRemainder>::new();
        let mut simplify = Simplify::new(true, &Scope::new(), &alignment);
        let x = Expr::var(Type::Int32, "x");
        let y = Expr::var(Type::Int32, "y");

        let mut scoped = simplify.scoped_fact();
        scoped.learn_true(&Expr::lt(x.clone(), Expr::from(3)));
        scoped.learn_true(&Expr::eq(x.clone(), y));
        scoped.learn_false(&Expr::eq(x, Expr::from(3)));
        assert!(scoped.is_empty());
    }
}
