use std::rc::Rc;

use crate::{
    expr::Expr,
    opcode::{DeviceApi, ForType},
    typ::Type,
};

/// An immutable, reference-counted statement node.
#[derive(Clone)]
pub struct Stmt(Rc<StmtNode>);

#[derive(Debug, Clone, PartialEq)]
pub enum StmtNode {
    LetStmt {
        name: String,
        value: Expr,
        body: Stmt,
    },
    AssertStmt {
        condition: Expr,
        message: Expr,
    },
    For {
        name: String,
        min: Expr,
        extent: Expr,
        for_type: ForType,
        device_api: DeviceApi,
        body: Stmt,
    },
    Store {
        name: String,
        value: Expr,
        index: Expr,
    },
    IfThenElse {
        condition: Expr,
        then_case: Stmt,
        else_case: Option<Stmt>,
    },
    Evaluate(Expr),
    Block(Stmt, Stmt),
}

impl Stmt {
    fn new(node: StmtNode) -> Self {
        Self(Rc::new(node))
    }

    pub fn node(&self) -> &StmtNode {
        &self.0
    }

    pub fn same_as(&self, other: &Stmt) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn let_stmt(name: impl Into<String>, value: Expr, body: Stmt) -> Self {
        Self::new(StmtNode::LetStmt {
            name: name.into(),
            value,
            body,
        })
    }

    pub fn assert_stmt(condition: Expr, message: Expr) -> Self {
        internal_assert!(
            condition.typ() == Type::Bool,
            "assert condition {} is not a scalar boolean",
            condition
        );
        Self::new(StmtNode::AssertStmt { condition, message })
    }

    pub fn for_loop(
        name: impl Into<String>,
        min: Expr,
        extent: Expr,
        for_type: ForType,
        device_api: DeviceApi,
        body: Stmt,
    ) -> Self {
        internal_assert!(
            min.typ() == extent.typ() && min.typ().is_scalar() && !min.typ().is_float(),
            "loop bounds {} and {} must be scalar integers of one type",
            min,
            extent
        );
        Self::new(StmtNode::For {
            name: name.into(),
            min,
            extent,
            for_type,
            device_api,
            body,
        })
    }

    pub fn store(name: impl Into<String>, value: Expr, index: Expr) -> Self {
        internal_assert!(
            value.typ().lanes() == index.typ().lanes(),
            "store of {} at {} with mismatched lanes",
            value,
            index
        );
        Self::new(StmtNode::Store {
            name: name.into(),
            value,
            index,
        })
    }

    pub fn if_then_else(condition: Expr, then_case: Stmt, else_case: Option<Stmt>) -> Self {
        internal_assert!(
            condition.typ() == Type::Bool,
            "if condition {} is not a scalar boolean",
            condition
        );
        Self::new(StmtNode::IfThenElse {
            condition,
            then_case,
            else_case,
        })
    }

    pub fn evaluate(value: Expr) -> Self {
        Self::new(StmtNode::Evaluate(value))
    }

    pub fn block(first: Stmt, rest: Stmt) -> Self {
        Self::new(StmtNode::Block(first, rest))
    }

    /// Chains statements into nested blocks. An empty list is a no-op.
    pub fn block_of(stmts: impl IntoIterator<Item = Stmt>) -> Self {
        let mut stmts = stmts.into_iter().collect::<Vec<_>>();
        let mut result = match stmts.pop() {
            Some(last) => last,
            None => return Self::no_op(),
        };
        while let Some(s) = stmts.pop() {
            result = Self::block(s, result);
        }
        result
    }

    /// `Evaluate(0)`.
    pub fn no_op() -> Self {
        Self::evaluate(Expr::from(0))
    }
}

impl PartialEq for Stmt {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other) || *self.0 == *other.0
    }
}

fn indent(f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
    for _ in 0..depth {
        write!(f, "  ")?;
    }
    Ok(())
}

impl Stmt {
    fn fmt_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        match self.node() {
            StmtNode::LetStmt { name, value, body } => {
                indent(f, depth)?;
                writeln!(f, "let {} = {}", name, value)?;
                body.fmt_indented(f, depth)
            }
            StmtNode::AssertStmt { condition, message } => {
                indent(f, depth)?;
                writeln!(f, "assert({}, {})", condition, message)
            }
            StmtNode::For {
                name,
                min,
                extent,
                for_type,
                body,
                ..
            } => {
                indent(f, depth)?;
                writeln!(f, "{} ({}, {}, {}) {{", for_type, name, min, extent)?;
                body.fmt_indented(f, depth + 1)?;
                indent(f, depth)?;
                writeln!(f, "}}")
            }
            StmtNode::Store { name, value, index } => {
                indent(f, depth)?;
                writeln!(f, "{}[{}] = {}", name, index, value)
            }
            StmtNode::IfThenElse {
                condition,
                then_case,
                else_case,
            } => {
                indent(f, depth)?;
                writeln!(f, "if ({}) {{", condition)?;
                then_case.fmt_indented(f, depth + 1)?;
                if let Some(else_case) = else_case {
                    indent(f, depth)?;
                    writeln!(f, "}} else {{")?;
                    else_case.fmt_indented(f, depth + 1)?;
                }
                indent(f, depth)?;
                writeln!(f, "}}")
            }
            StmtNode::Evaluate(value) => {
                indent(f, depth)?;
                writeln!(f, "{}", value)
            }
            StmtNode::Block(first, rest) => {
                first.fmt_indented(f, depth)?;
                rest.fmt_indented(f, depth)
            }
        }
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl std::fmt::Debug for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
