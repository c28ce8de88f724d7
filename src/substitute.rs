use indexmap::IndexMap;

use crate::{
    expr::{Expr, ExprKind},
    ir_mutator::{walk_expr, IrMutator},
    scope::Scope,
};

struct Substitute<'m> {
    replacements: &'m IndexMap<String, Expr>,
    hidden: Scope<'static, ()>,
}

impl IrMutator for Substitute<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e.kind() {
            ExprKind::Variable(name) => {
                if self.hidden.contains(name) {
                    return e.clone();
                }
                match self.replacements.get(name) {
                    Some(replacement) => {
                        internal_assert!(
                            replacement.typ() == e.typ(),
                            "substituting {} of type {} for {} of type {}",
                            replacement,
                            replacement.typ(),
                            name,
                            e.typ()
                        );
                        replacement.clone()
                    }
                    None => e.clone(),
                }
            }
            ExprKind::Let { name, value, body } => {
                let new_value = self.mutate_expr(value);
                self.hidden.push(name.clone(), ());
                let new_body = self.mutate_expr(body);
                self.hidden.pop(name);
                if new_value.same_as(value) && new_body.same_as(body) {
                    e.clone()
                } else {
                    Expr::let_in(name.clone(), new_value, new_body)
                }
            }
            _ => walk_expr(self, e),
        }
    }
}

/// Replaces every free occurrence of the named variables in `e`. Names rebound by an inner `Let`
/// are left alone inside its body.
pub fn substitute(replacements: &IndexMap<String, Expr>, e: &Expr) -> Expr {
    if replacements.is_empty() {
        return e.clone();
    }
    Substitute {
        replacements,
        hidden: Scope::new(),
    }
    .mutate_expr(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typ::Type;

    #[test]
    fn respects_shadowing() {
        let x = Expr::var(Type::Int32, "x");
        let e = x.clone() + Expr::let_in("x", Expr::from(7), x.clone() * 2);
        let mut map = IndexMap::new();
        map.insert("x".to_string(), Expr::from(3));
        let result = substitute(&map, &e);
        assert_eq!(
            result,
            Expr::from(3) + Expr::let_in("x", Expr::from(7), x * 2)
        );
    }
}
