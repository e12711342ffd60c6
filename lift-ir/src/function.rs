use std::hash::{Hash, Hasher};

use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::types::IrType;

/// A code label.
///
/// Identity is the numeric `id`; the name exists only for rendering. Two
/// labels with the same id are the same label even if renamed.
#[derive(Debug, Clone, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Label {
    /// Identity.
    pub id: u32,
    /// Rendered name, e.g. `L1`.
    pub name: String,
}

impl Label {
    /// Label with the conventional `L{n}` name.
    pub fn numbered(id: u32) -> Self {
        Label {
            id,
            name: format!("L{id}"),
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Ordered run of statements, optionally introduced by a label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// Label defining this block as a branch target, if any.
    pub label: Option<Label>,
    /// Statements in program order.
    pub stmts: Vec<Stmt>,
}

impl Block {
    /// Empty block introduced by `label`.
    pub fn labeled(label: Label) -> Self {
        Block {
            label: Some(label),
            stmts: Vec::new(),
        }
    }
}

/// Positional function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    /// Rendered name, e.g. `p1`.
    pub name: String,
    /// Parameter type.
    pub ty: IrType,
    /// Zero-based position.
    pub index: usize,
}

/// Local variable declared at the top of the function.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalVar {
    /// Rendered name.
    pub name: String,
    /// Declared type.
    pub ty: IrType,
    /// Optional initializer, conceptually evaluated at function entry.
    pub init: Option<Expr>,
}

/// Analysis artifacts the lifter derives and the printer consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tags {
    /// `push rbp; mov rbp, rsp` prologue was recognized.
    pub uses_frame_pointer: bool,
    /// Stack bytes reserved by `sub rsp, imm`, when recognized.
    pub local_size: u32,
    /// The function reads the PEB through `gs:[0x60]`.
    pub uses_gs_peb: bool,
}

/// A lifted function: containers for parameters, locals and blocks, plus
/// the addresses needed to relate the IR back to the image.
///
/// Built once per function, mutated only by refinement passes, then
/// rendered. Nothing in here references another function.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    /// Rendered function name.
    pub name: String,
    /// Preferred image base of the containing module.
    pub image_base: u64,
    /// Virtual address of the first instruction.
    pub entry_address: u64,
    /// Rendered return type.
    pub return_type: IrType,
    /// Positional parameters, indices dense from 0.
    pub params: Vec<Parameter>,
    /// Locals declared at the top of the body.
    pub locals: Vec<LocalVar>,
    /// Blocks in print order.
    pub blocks: Vec<Block>,
    /// Analysis artifacts.
    pub tags: Tags,
}

impl Function {
    /// Empty function at `entry_address` with the given name.
    pub fn new(name: impl Into<String>, image_base: u64, entry_address: u64) -> Self {
        Function {
            name: name.into(),
            image_base,
            entry_address,
            return_type: IrType::u64(),
            params: Vec::new(),
            locals: Vec::new(),
            blocks: Vec::new(),
            tags: Tags::default(),
        }
    }

    /// Iterate all statements of all blocks in program order.
    pub fn stmts(&self) -> impl Iterator<Item = &Stmt> {
        self.blocks.iter().flat_map(|b| b.stmts.iter())
    }

    /// Add a local unless one with the same name already exists.
    pub fn declare_local(&mut self, local: LocalVar) {
        if !self.locals.iter().any(|l| l.name == local.name) {
            self.locals.push(local);
        }
    }
}
