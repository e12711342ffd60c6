//! Operand translation: registers, immediates, and memory references.

use iced_x86::{Instruction, OpKind, Register};
use lift_ir::{Expr, IrType, LocalVar, Segment, Stmt};

use super::Lifter;

impl Lifter<'_> {
    /// Register read or write destination, under the current naming.
    pub(crate) fn reg_expr(&self, reg: Register) -> Expr {
        Expr::reg(self.ctx.reg_name(reg))
    }

    /// Width of operand `op` in bits.
    pub(crate) fn op_bits(&self, instr: &Instruction, op: u32) -> u16 {
        match instr.op_kind(op) {
            OpKind::Register => (instr.op_register(op).size() * 8) as u16,
            OpKind::Memory => (instr.memory_size().size() * 8) as u16,
            _ if op > 0 => self.op_bits(instr, 0),
            _ => 64,
        }
    }

    /// Read operand `op` as an expression.
    pub(crate) fn op_read(&mut self, instr: &Instruction, op: u32) -> Expr {
        match instr.op_kind(op) {
            OpKind::Register => self.reg_expr(instr.op_register(op)),
            OpKind::Memory => self.mem_read(instr),
            OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
                Expr::uint(instr.near_branch_target(), 64)
            }
            _ => Expr::uint(instr.immediate(op), self.op_bits(instr, 0)),
        }
    }

    /// Segment override of the memory operand, when `fs`/`gs`.
    pub(crate) fn mem_segment(instr: &Instruction) -> Option<Segment> {
        match instr.segment_prefix() {
            Register::FS => Some(Segment::Fs),
            Register::GS => Some(Segment::Gs),
            _ => None,
        }
    }

    /// `gs:[0x60]` with no base or index: the PEB idiom.
    pub(crate) fn is_gs_peb(instr: &Instruction) -> bool {
        instr.segment_prefix() == Register::GS
            && instr.memory_base() == Register::None
            && instr.memory_index() == Register::None
            && instr.memory_displacement64() == 0x60
    }

    /// Element type of the memory operand.
    pub(crate) fn mem_elem(instr: &Instruction) -> IrType {
        IrType::uint_of_size(instr.memory_size().size())
    }

    /// `[rbp - K]` under a recognized frame pointer becomes the local
    /// `local_K`.
    pub(crate) fn frame_local(&self, instr: &Instruction) -> Option<(String, i64)> {
        if !self.ctx.uses_frame_pointer {
            return None;
        }
        if instr.memory_base() != Register::RBP || instr.memory_index() != Register::None {
            return None;
        }
        let disp = instr.memory_displacement64() as i64;
        (disp < 0).then(|| (format!("local_{}", -disp), disp))
    }

    /// Read the memory operand of `instr` as a value.
    pub(crate) fn mem_read(&mut self, instr: &Instruction) -> Expr {
        if self.ctx.uses_gs_peb && Self::is_gs_peb(instr) {
            return Expr::local("peb");
        }
        if let Some((name, _)) = self.frame_local(instr) {
            self.declare_frame_local(&name, Self::mem_elem(instr));
            return Expr::local(name);
        }
        Expr::Load {
            address: Box::new(self.mem_address(instr)),
            elem: Self::mem_elem(instr),
            segment: Self::mem_segment(instr),
        }
    }

    /// Write `value` through the memory operand of `instr`.
    pub(crate) fn mem_write(&mut self, instr: &Instruction, value: Expr) -> Stmt {
        if let Some((name, _)) = self.frame_local(instr) {
            self.declare_frame_local(&name, Self::mem_elem(instr));
            return Stmt::assign(Expr::local(name), value);
        }
        Stmt::Store {
            address: self.mem_address(instr),
            value,
            elem: Self::mem_elem(instr),
            segment: Self::mem_segment(instr),
        }
    }

    /// Address computed by the memory operand, without the load.
    pub(crate) fn mem_address(&self, instr: &Instruction) -> Expr {
        if instr.is_ip_rel_memory_operand() {
            return Expr::uint(instr.ip_rel_memory_address(), 64);
        }
        let base = instr.memory_base();
        let index = instr.memory_index();
        let disp = instr.memory_displacement64() as i64;

        let mut expr = (base != Register::None).then(|| self.reg_expr(base));
        if index != Register::None {
            let scaled = match instr.memory_index_scale() {
                1 => self.reg_expr(index),
                scale => Expr::mul(self.reg_expr(index), Expr::uint(scale as u64, 64)),
            };
            expr = Some(match expr {
                Some(e) => Expr::add(e, scaled),
                None => scaled,
            });
        }
        match expr {
            None => Expr::uint(disp as u64, 64),
            Some(e) => add_offset(e, disp),
        }
    }

    /// Declare `local_K` with the width of its first-seen access.
    pub(crate) fn declare_frame_local(&mut self, name: &str, ty: IrType) {
        self.func.declare_local(LocalVar {
            name: name.to_owned(),
            ty,
            init: None,
        });
    }
}

/// `base`, `base + K` or `base - K` depending on the sign of `offset`.
pub(crate) fn add_offset(base: Expr, offset: i64) -> Expr {
    match offset {
        0 => base,
        o if o > 0 => Expr::add(base, Expr::uint(o as u64, 64)),
        o => Expr::sub(base, Expr::uint(o.unsigned_abs(), 64)),
    }
}
