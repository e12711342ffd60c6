//! Medium-level, C-like intermediate representation for lifted x64 code.
//!
//! The IR is a tree of owned values: expressions own their sub-expressions,
//! statements own their expressions, blocks own their statements, and a
//! [`Function`] owns everything. There are no back-references and no
//! sharing, so rewrites never alias and cycles are impossible by
//! construction.
//!
//! [`printer::Printer`] renders a [`Function`] to C-like pseudocode; the
//! output is deterministic, byte for byte, for a given IR and options.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod expr;
mod function;
mod provider;
mod stmt;
mod types;

pub mod printer;

pub use expr::{BinOpKind, CallTarget, CastKind, CmpOp, Expr, Segment, UnOpKind};
pub use function::{Block, Function, Label, LocalVar, Parameter, Tags};
pub use provider::{ConstantProvider, EnumDef, NoopProvider, TableProvider};
pub use stmt::Stmt;
pub use types::IrType;
