use crate::expr::{Expr, Segment};
use crate::function::Label;
use crate::types::IrType;

/// Statement node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stmt {
    /// `lhs = rhs;` — the lhs is a register, parameter, local, or a load
    /// treated as an lvalue.
    Assign {
        /// Assignment destination.
        lhs: Expr,
        /// Assigned value.
        rhs: Expr,
    },
    /// Typed memory write.
    Store {
        /// Address expression.
        address: Expr,
        /// Stored value.
        value: Expr,
        /// Element type of the access.
        elem: IrType,
        /// Optional segment override.
        segment: Option<Segment>,
    },
    /// Call evaluated for its side effects; must hold an [`Expr::Call`].
    Call(Expr),
    /// `if (cond) goto target;`
    IfGoto {
        /// Branch condition.
        cond: Expr,
        /// Branch target.
        target: Label,
    },
    /// `goto target;`
    Goto(Label),
    /// Label definition site.
    Label(Label),
    /// `return;` or `return value;`
    Return(Option<Expr>),
    /// Preserved disassembly line, printed as a block comment.
    AsmComment(String),
    /// Free-form annotation, printed as `__pseudo(text);`.
    Pseudo(String),
    /// No operation.
    Nop,
}

impl Stmt {
    /// `lhs = rhs;`
    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        Stmt::Assign { lhs, rhs }
    }

    /// Store without a segment override.
    pub fn store(address: Expr, value: Expr, elem: IrType) -> Self {
        Stmt::Store {
            address,
            value,
            elem,
            segment: None,
        }
    }

    /// Preserved disassembly line.
    pub fn asm(text: impl Into<String>) -> Self {
        Stmt::AsmComment(text.into())
    }

    /// Free-form annotation.
    pub fn pseudo(text: impl Into<String>) -> Self {
        Stmt::Pseudo(text.into())
    }
}
