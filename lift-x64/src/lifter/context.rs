//! Sliding state threaded through the lift of one function.
//!
//! Everything here is owned by the [`super::Lifter`] and lives only for
//! the duration of a single lift; nothing escapes into the produced IR.

use std::collections::{BTreeMap, HashMap};

use iced_x86::Register;
use lift_ir::{Expr, Label};

/// Operands of the most recent `cmp`/`test`, kept until a call or a
/// fresh flag setter invalidates them.
///
/// The operand expressions are stored directly; pseudo-statement text is
/// rendered at the emission site instead of being round-tripped.
#[derive(Debug, Clone)]
pub(crate) struct LastCmp {
    /// Left operand.
    pub left: Expr,
    /// Right operand.
    pub right: Expr,
    /// `test` rather than `cmp`.
    pub is_test: bool,
    /// Operand width in bits.
    pub bits: u16,
    /// Address of the flag-setting instruction.
    pub ip: u64,
}

/// Operands of the most recent `bt`/`bts`/`btr`/`btc`; single-shot.
#[derive(Debug, Clone)]
pub(crate) struct LastBt {
    /// Value whose bit is tested.
    pub value: Expr,
    /// Bit index.
    pub index: Expr,
    /// Address of the bit-test instruction.
    pub ip: u64,
}

/// Best-effort summary of what a register currently holds, used by the
/// memset call-shape heuristic and the constant-return window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegValue {
    /// Still holds the incoming argument it was seeded with.
    Param,
    /// Holds `rsp`/`rbp` plus the recorded offset (from `lea`).
    StackAddr(i64),
    /// Holds a known constant (from `mov reg, imm` or a zero idiom).
    Const(u64),
}

/// Mutable lifting context: register naming, flag memory, and the small
/// summaries the heuristics read.
#[derive(Debug, Default)]
pub(crate) struct LifterCtx {
    /// Stable rendering aliases, keyed by full register.
    pub aliases: HashMap<Register, String>,
    /// Branch targets that became labels, keyed by target IP.
    pub label_by_ip: BTreeMap<u64, Label>,
    /// Most recent `cmp`/`test`.
    pub last_cmp: Option<LastCmp>,
    /// Most recent bit test.
    pub last_bt: Option<LastBt>,
    /// The previous translated instruction was a call.
    pub last_was_call: bool,
    /// XMM register currently known to be all-zero.
    pub last_zeroed_xmm: Option<Register>,
    /// Immediate moved into eax/rax by the directly preceding `mov`.
    pub pending_ret_const: Option<(u64, u16)>,
    /// Per-register value summaries.
    pub reg_values: HashMap<Register, RegValue>,
    /// `push rbp; mov rbp, rsp` was recognized.
    pub uses_frame_pointer: bool,
    /// Bytes reserved by the recognized `sub rsp, imm`.
    pub local_size: u32,
    /// The function reads `gs:[0x60]`.
    pub uses_gs_peb: bool,
    /// IP of the first decoded instruction.
    pub start_ip: u64,
}

/// Collapse a register to the key used by alias and summary maps: the
/// containing 64-bit GPR, or the register itself otherwise.
pub(crate) fn canonical_reg(reg: Register) -> Register {
    if reg.is_gpr() {
        reg.full_register()
    } else {
        reg
    }
}

impl LifterCtx {
    /// Seed the entry naming: argument registers and XMM argument
    /// registers get their stable aliases, which hold for the whole
    /// function.
    pub fn seed_entry_names(&mut self) {
        for (reg, name) in [
            (Register::RCX, "p1"),
            (Register::RDX, "p2"),
            (Register::R8, "p3"),
            (Register::R9, "p4"),
            (Register::XMM0, "fp1"),
            (Register::XMM1, "fp2"),
            (Register::XMM2, "fp3"),
            (Register::XMM3, "fp4"),
        ] {
            self.aliases.insert(reg, name.to_owned());
        }
        for reg in [Register::RCX, Register::RDX, Register::R8, Register::R9] {
            self.reg_values.insert(reg, RegValue::Param);
        }
    }

    /// Rendered name for a register read or write at the current point.
    ///
    /// Argument aliases are permanent; `rax` is called `ret` only while
    /// it still holds the result of the directly preceding call.
    pub fn reg_name(&self, reg: Register) -> String {
        let full = canonical_reg(reg);
        if let Some(alias) = self.aliases.get(&full) {
            return alias.clone();
        }
        if full == Register::RAX && self.last_was_call {
            return "ret".to_owned();
        }
        format!("{reg:?}").to_ascii_lowercase()
    }

    /// Record a write to `reg`, dropping every summary derived from its
    /// previous contents.
    pub fn note_write(&mut self, reg: Register) {
        let full = canonical_reg(reg);
        self.reg_values.remove(&full);
        if self.last_zeroed_xmm == Some(full) {
            self.last_zeroed_xmm = None;
        }
    }

    /// Invalidate everything a call may clobber.
    pub fn after_call(&mut self) {
        self.last_cmp = None;
        self.last_bt = None;
        self.last_zeroed_xmm = None;
        self.pending_ret_const = None;
        for reg in [
            Register::RAX,
            Register::RCX,
            Register::RDX,
            Register::R8,
            Register::R9,
            Register::R10,
            Register::R11,
        ] {
            self.reg_values.remove(&reg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> LifterCtx {
        let mut ctx = LifterCtx::default();
        ctx.seed_entry_names();
        ctx
    }

    #[test]
    fn argument_aliases_cover_subregisters() {
        let ctx = seeded();
        assert_eq!(ctx.reg_name(Register::RCX), "p1");
        assert_eq!(ctx.reg_name(Register::ECX), "p1");
        assert_eq!(ctx.reg_name(Register::R8D), "p3");
        assert_eq!(ctx.reg_name(Register::XMM0), "fp1");
    }

    #[test]
    fn rax_is_ret_only_right_after_a_call() {
        let mut ctx = seeded();
        assert_eq!(ctx.reg_name(Register::RAX), "rax");
        assert_eq!(ctx.reg_name(Register::EAX), "eax");
        ctx.last_was_call = true;
        assert_eq!(ctx.reg_name(Register::RAX), "ret");
        assert_eq!(ctx.reg_name(Register::EAX), "ret");
    }

    #[test]
    fn unaliased_registers_use_their_own_name() {
        let ctx = seeded();
        assert_eq!(ctx.reg_name(Register::RDI), "rdi");
        assert_eq!(ctx.reg_name(Register::XMM7), "xmm7");
    }

    #[test]
    fn after_call_clears_flag_memory_and_volatiles() {
        let mut ctx = seeded();
        ctx.last_zeroed_xmm = Some(Register::XMM0);
        ctx.reg_values.insert(Register::RAX, RegValue::Const(1));
        ctx.after_call();
        assert!(ctx.last_cmp.is_none());
        assert!(ctx.last_zeroed_xmm.is_none());
        assert!(ctx.reg_values.get(&Register::RAX).is_none());
        // Arguments were volatile too.
        assert!(ctx.reg_values.get(&Register::RCX).is_none());
    }
}
