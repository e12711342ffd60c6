//! Call and string-operation translation.

use iced_x86::{FlowControl, Instruction, OpKind, Register};
use lift_ir::{Expr, Stmt};

use super::context::RegValue;
use super::Lifter;

impl Lifter<'_> {
    /// Translate a near or indirect call.
    ///
    /// The call-shape heuristic runs first: a call reached with a
    /// pointer-like first argument and a small constant length byte in
    /// `edx` is rendered as `memset`. Everything else becomes a call
    /// assigned to `ret`, with the four integer argument registers passed
    /// positionally.
    pub(crate) fn translate_call(&mut self, instr: &Instruction) -> Vec<Stmt> {
        let stmts = if let Some(call) = self.memset_shaped_call() {
            vec![Stmt::Call(call)]
        } else {
            let args = self.call_args();
            let call = match instr.flow_control() {
                FlowControl::IndirectCall => self.indirect_call(instr, args),
                _ if matches!(
                    instr.op_kind(0),
                    OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64
                ) =>
                {
                    let target = instr.near_branch_target();
                    Expr::call_named(format!("sub_{target:x}"), args)
                }
                _ => {
                    self.ctx.after_call();
                    return vec![Stmt::pseudo("far call".to_owned())];
                }
            };
            vec![Stmt::assign(Expr::reg("ret"), call)]
        };
        self.ctx.after_call();
        stmts
    }

    fn indirect_call(&mut self, instr: &Instruction, args: Vec<Expr>) -> Expr {
        if instr.op_kind(0) == OpKind::Memory && instr.is_ip_rel_memory_operand() {
            let slot = instr.ip_rel_memory_address();
            if let Some(resolver) = self.req.import_resolver {
                if let Some(name) = resolver.resolve(slot) {
                    tracing::debug!(slot, %name, "resolved import call");
                    return Expr::call_named(name, args);
                }
            }
            return Expr::call_indirect(Expr::uint(slot, 64), args);
        }
        let target = self.op_read(instr, 0);
        Expr::call_indirect(target, args)
    }

    /// The four MS x64 integer argument registers under current naming.
    fn call_args(&self) -> Vec<Expr> {
        [Register::RCX, Register::RDX, Register::R8, Register::R9]
            .into_iter()
            .map(|r| self.reg_expr(r))
            .collect()
    }

    /// Best-effort `memset` call-site recognition: `rcx` still holds a
    /// named parameter or a stack address, and `edx` holds zero or a
    /// small constant fill byte.
    fn memset_shaped_call(&self) -> Option<Expr> {
        let pointer_like = matches!(
            self.ctx.reg_values.get(&Register::RCX),
            Some(RegValue::Param) | Some(RegValue::StackAddr(_))
        );
        if !pointer_like {
            return None;
        }
        let fill = match self.ctx.reg_values.get(&Register::RDX) {
            Some(RegValue::Const(v)) if *v < 0x100 => *v,
            _ => return None,
        };
        let len = match self.ctx.reg_values.get(&Register::R8) {
            Some(RegValue::Const(v)) => Expr::uint(*v, 32),
            _ => self.reg_expr(Register::R8D),
        };
        tracing::debug!("call site matches the memset register shape");
        Some(Expr::call_named(
            "memset",
            vec![self.reg_expr(Register::RCX), Expr::uint(fill, 32), len],
        ))
    }

    /// `rep movs{b,w,d,q}` becomes `memcpy(rdi, rsi, rcx * size)`.
    pub(crate) fn translate_rep_movs(&mut self, elem_size: u64) -> Stmt {
        self.note_string_op_clobbers();
        Stmt::Call(Expr::call_named(
            "memcpy",
            vec![
                Expr::reg("rdi"),
                Expr::reg("rsi"),
                Expr::mul(Expr::reg("rcx"), Expr::uint(elem_size, 64)),
            ],
        ))
    }

    /// `rep stos{b,w,d,q}` becomes `memset(rdi, al.., rcx * size)`.
    pub(crate) fn translate_rep_stos(&mut self, elem_size: u64) -> Stmt {
        self.note_string_op_clobbers();
        let fill = match elem_size {
            1 => "al",
            2 => "ax",
            4 => "eax",
            _ => "rax",
        };
        Stmt::Call(Expr::call_named(
            "memset",
            vec![
                Expr::reg("rdi"),
                Expr::reg(fill),
                Expr::mul(Expr::reg("rcx"), Expr::uint(elem_size, 64)),
            ],
        ))
    }

    // rep string ops advance rdi/rsi and count rcx down to zero.
    fn note_string_op_clobbers(&mut self) {
        for reg in [Register::RCX, Register::RDI, Register::RSI] {
            self.ctx.note_write(reg);
        }
    }
}
