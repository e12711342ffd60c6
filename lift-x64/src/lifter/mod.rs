//! Linear decode-and-translate of one function body.
//!
//! The lifter walks the decoded instructions once, emitting the preserved
//! disassembly comment for every instruction and a semantic statement for
//! each mnemonic family it understands. Small sliding contexts (the last
//! compare, the last bit test, register aliases, the last zeroed XMM
//! register) recover conditions and call shapes that a purely local
//! translation would miss.

mod calls;
mod cond;
mod context;
mod operands;
mod peephole;

use std::collections::HashSet;

use iced_x86::{
    FlowControl, Formatter, Instruction, IntelFormatter, Mnemonic, OpKind, Register,
};
use itertools::Itertools;
use lift_ir::printer::expr_text;
use lift_ir::{
    BinOpKind, Block, CastKind, Expr, Function, IrType, Label, LocalVar, Parameter, Stmt,
    UnOpKind,
};

use crate::decode;
use crate::error::LiftError;
use crate::request::LiftRequest;
use context::{canonical_reg, LastBt, LastCmp, LifterCtx, RegValue};

/// Lift the function body described by `req` into IR.
///
/// Every decoded instruction is preserved as a disassembly comment;
/// instructions with no semantic translation contribute nothing else.
/// The only fatal condition is an undecodable byte stream.
pub fn lift_function(req: &LiftRequest<'_>) -> Result<Function, LiftError> {
    let instrs = decode::decode_window(req.bytes, req.base, req.options.max_bytes)?;
    let mut lifter = Lifter::new(req, instrs);
    lifter.analyze();
    lifter.run()
}

pub(crate) struct Lifter<'a> {
    pub(crate) req: &'a LiftRequest<'a>,
    pub(crate) instrs: Vec<Instruction>,
    pub(crate) ctx: LifterCtx,
    pub(crate) func: Function,
    formatter: IntelFormatter,
    prologue_len: usize,
}

impl<'a> Lifter<'a> {
    fn new(req: &'a LiftRequest<'a>, instrs: Vec<Instruction>) -> Self {
        let mut formatter = IntelFormatter::new();
        let options = formatter.options_mut();
        options.set_hex_prefix("0x");
        options.set_hex_suffix("");
        options.set_uppercase_hex(false);
        options.set_space_after_operand_separator(true);
        options.set_rip_relative_addresses(true);

        let mut func = Function::new(req.function_name(), req.options.image_base, req.base);
        func.params = (1..=4usize)
            .map(|i| Parameter {
                name: format!("p{i}"),
                ty: IrType::u64(),
                index: i - 1,
            })
            .collect();
        func.blocks.push(Block::default());

        Lifter {
            req,
            instrs,
            ctx: LifterCtx::default(),
            func,
            formatter,
            prologue_len: 0,
        }
    }

    fn analyze(&mut self) {
        self.ctx.start_ip = self.req.base;
        self.ctx.seed_entry_names();
        self.detect_prologue();
        self.detect_peb();
        self.collect_labels();
    }

    fn run(mut self) -> Result<Function, LiftError> {
        let mut index = 0;
        while index < self.instrs.len() {
            let instr = self.instrs[index];
            if let Some(label) = self.ctx.label_by_ip.get(&instr.ip()).cloned() {
                self.func.blocks.push(Block::labeled(label));
            }
            let comment = self.asm_text(&instr);
            self.emit(Stmt::asm(comment));

            if let Some(run) = self.try_coalesce(index) {
                let span: Vec<Instruction> =
                    self.instrs[index + 1..index + run.consumed].to_vec();
                for extra in &span {
                    let comment = self.asm_text(extra);
                    self.emit(Stmt::asm(comment));
                }
                for stmt in run.stmts {
                    self.emit(stmt);
                }
                self.ctx.pending_ret_const = None;
                self.ctx.last_was_call = false;
                index += run.consumed;
                continue;
            }

            for stmt in self.translate(index) {
                self.emit(stmt);
            }
            self.ctx.last_was_call = matches!(
                instr.flow_control(),
                FlowControl::Call | FlowControl::IndirectCall
            );
            index += 1;
        }
        Ok(self.func)
    }

    fn emit(&mut self, stmt: Stmt) {
        self.func
            .blocks
            .last_mut()
            .expect("the lifter always has an open block")
            .stmts
            .push(stmt);
    }

    fn asm_text(&mut self, instr: &Instruction) -> String {
        let mut text = String::new();
        self.formatter.format(instr, &mut text);
        format!("0x{:X}: {}", instr.ip(), text)
    }

    // Analysis

    fn detect_prologue(&mut self) {
        let is_push_rbp = |x: &Instruction| {
            x.mnemonic() == Mnemonic::Push
                && x.op_kind(0) == OpKind::Register
                && x.op_register(0) == Register::RBP
        };
        let is_mov_rbp_rsp = |x: &Instruction| {
            x.mnemonic() == Mnemonic::Mov
                && x.op_kind(0) == OpKind::Register
                && x.op_register(0) == Register::RBP
                && x.op_kind(1) == OpKind::Register
                && x.op_register(1) == Register::RSP
        };
        let sub_rsp_imm = |x: &Instruction| -> Option<u32> {
            (x.mnemonic() == Mnemonic::Sub
                && x.op_kind(0) == OpKind::Register
                && x.op_register(0) == Register::RSP
                && is_imm_kind(x.op_kind(1)))
            .then(|| x.immediate(1))
            .filter(|v| *v > 0 && *v % 8 == 0 && *v <= u32::MAX as u64)
            .map(|v| v as u32)
        };

        if self.instrs.len() >= 2 && is_push_rbp(&self.instrs[0]) && is_mov_rbp_rsp(&self.instrs[1])
        {
            self.ctx.uses_frame_pointer = true;
            self.prologue_len = 2;
            if let Some(size) = self.instrs.get(2).and_then(sub_rsp_imm) {
                self.ctx.local_size = size;
                self.prologue_len = 3;
            }
            tracing::debug!(local_size = self.ctx.local_size, "rbp prologue recognized");
        } else if let Some(size) = self.instrs.first().and_then(sub_rsp_imm) {
            self.ctx.local_size = size;
            self.prologue_len = 1;
            tracing::debug!(local_size = size, "stack frame without frame pointer");
        }
        self.func.tags.uses_frame_pointer = self.ctx.uses_frame_pointer;
        self.func.tags.local_size = self.ctx.local_size;
    }

    /// Epilogue counterpart of the recognized prologue: the frame
    /// teardown forms are suppressed only when prologue detection fired.
    /// Any other write to `rsp` (realignment, mid-function adjustment)
    /// translates normally.
    fn is_epilogue_instr(&self, instr: &Instruction) -> bool {
        if self.prologue_len == 0 {
            return false;
        }
        match instr.mnemonic() {
            Mnemonic::Add => {
                self.ctx.local_size > 0
                    && instr.op_kind(0) == OpKind::Register
                    && instr.op_register(0) == Register::RSP
                    && is_imm_kind(instr.op_kind(1))
                    && instr.immediate(1) == self.ctx.local_size as u64
            }
            Mnemonic::Mov => {
                self.ctx.uses_frame_pointer
                    && instr.op_kind(0) == OpKind::Register
                    && instr.op_register(0) == Register::RSP
                    && instr.op_kind(1) == OpKind::Register
                    && instr.op_register(1) == Register::RBP
            }
            Mnemonic::Lea => {
                self.ctx.uses_frame_pointer
                    && instr.op_register(0) == Register::RSP
                    && instr.memory_base() == Register::RBP
            }
            _ => false,
        }
    }

    fn detect_peb(&mut self) {
        let reads_peb = self.instrs.iter().any(|x| {
            (0..x.op_count()).any(|op| x.op_kind(op) == OpKind::Memory) && Self::is_gs_peb(x)
        });
        if !reads_peb {
            return;
        }
        tracing::debug!("function reads the PEB via gs:[0x60]");
        self.ctx.uses_gs_peb = true;
        self.func.tags.uses_gs_peb = true;
        let ty = IrType::pointer(IrType::Named("u8".into()));
        self.func.declare_local(LocalVar {
            name: "peb".into(),
            ty: ty.clone(),
            init: Some(Expr::cast(
                Expr::intrinsic("__readgsqword", vec![Expr::uint(0x60, 64)]),
                ty,
                CastKind::Reinterpret,
            )),
        });
    }

    fn collect_labels(&mut self) {
        let start = self.ctx.start_ip;
        let end = decode::window_end(&self.instrs);
        let ips: HashSet<u64> = self.instrs.iter().map(|x| x.ip()).collect();
        let targets: Vec<u64> = self
            .instrs
            .iter()
            .filter(|x| {
                matches!(
                    x.flow_control(),
                    FlowControl::UnconditionalBranch
                        | FlowControl::ConditionalBranch
                        | FlowControl::Call
                )
            })
            .filter(|x| {
                matches!(
                    x.op_kind(0),
                    OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64
                )
            })
            .map(|x| x.near_branch_target())
            .filter(|t| *t >= start && *t < end && ips.contains(t))
            .unique()
            .collect();
        for (i, target) in targets.into_iter().enumerate() {
            self.ctx
                .label_by_ip
                .insert(target, Label::numbered(i as u32 + 1));
        }
    }

    // Translation

    fn translate(&mut self, index: usize) -> Vec<Stmt> {
        let instr = self.instrs[index];
        let pending_ret = self.ctx.pending_ret_const.take();
        if index < self.prologue_len {
            return Vec::new();
        }

        if self.is_epilogue_instr(&instr) {
            return Vec::new();
        }

        let mnemonic = instr.mnemonic();
        match mnemonic {
            Mnemonic::Mov => self.translate_mov(&instr),
            Mnemonic::Movzx => self.translate_extend(&instr, CastKind::ZeroExtend),
            Mnemonic::Movsx | Mnemonic::Movsxd => {
                self.translate_extend(&instr, CastKind::SignExtend)
            }
            Mnemonic::Lea => self.translate_lea(&instr),
            Mnemonic::Xor => self.translate_xor(&instr),
            Mnemonic::Or => self.translate_binop(&instr, BinOpKind::Or),
            Mnemonic::And => self.translate_binop(&instr, BinOpKind::And),
            Mnemonic::Add => self.translate_binop(&instr, BinOpKind::Add),
            Mnemonic::Sub => self.translate_binop(&instr, BinOpKind::Sub),
            Mnemonic::Inc => {
                let one = Expr::uint(1, self.op_bits(&instr, 0));
                self.translate_binop_with(&instr, BinOpKind::Add, Some(one))
            }
            Mnemonic::Dec => {
                let one = Expr::uint(1, self.op_bits(&instr, 0));
                self.translate_binop_with(&instr, BinOpKind::Sub, Some(one))
            }
            Mnemonic::Neg => self.translate_unop(&instr, UnOpKind::Neg),
            Mnemonic::Not => self.translate_unop(&instr, UnOpKind::BitNot),
            Mnemonic::Imul => self.translate_imul(&instr),
            Mnemonic::Mul => self.translate_wide_mul_div(
                &instr,
                "RDX:RAX = RAX * {} (unsigned)",
            ),
            Mnemonic::Idiv => self.translate_wide_mul_div(
                &instr,
                "RAX = RDX:RAX / {0}; RDX = RDX:RAX % {0} (signed)",
            ),
            Mnemonic::Div => self.translate_wide_mul_div(
                &instr,
                "RAX = RDX:RAX / {0}; RDX = RDX:RAX % {0} (unsigned)",
            ),
            Mnemonic::Shl => self.translate_binop(&instr, BinOpKind::Shl),
            Mnemonic::Shr => self.translate_binop(&instr, BinOpKind::Shr),
            Mnemonic::Sar => self.translate_binop(&instr, BinOpKind::Sar),
            Mnemonic::Rol => self.translate_rotate(&instr, "rotl"),
            Mnemonic::Ror => self.translate_rotate(&instr, "rotr"),
            Mnemonic::Bt | Mnemonic::Bts | Mnemonic::Btr | Mnemonic::Btc => {
                self.translate_bit_test(&instr)
            }
            Mnemonic::Cmp => self.translate_flags(&instr, false),
            Mnemonic::Test => self.translate_flags(&instr, true),
            Mnemonic::Jmp => self.translate_jmp(&instr),
            Mnemonic::Jrcxz => self.translate_jcxz(&instr, Register::RCX),
            Mnemonic::Jecxz => self.translate_jcxz(&instr, Register::ECX),
            Mnemonic::Jcxz => self.translate_jcxz(&instr, Register::CX),
            m if is_jcc(m) => {
                let cond = cond::condition(&mut self.ctx, instr.condition_code());
                vec![self.branch_stmt(Some(cond), instr.near_branch_target())]
            }
            m if is_setcc(m) => self.translate_setcc(&instr),
            m if is_cmovcc(m) => self.translate_cmovcc(&instr),
            Mnemonic::Call => self.translate_call(&instr),
            Mnemonic::Ret | Mnemonic::Retf => {
                let value = match pending_ret {
                    Some((v, bits)) => Expr::uint(v, bits),
                    None => Expr::reg("ret"),
                };
                vec![Stmt::Return(Some(value))]
            }
            Mnemonic::Movsb if instr.has_rep_prefix() => vec![self.translate_rep_movs(1)],
            Mnemonic::Movsw if instr.has_rep_prefix() => vec![self.translate_rep_movs(2)],
            Mnemonic::Movsd if instr.has_rep_prefix() => vec![self.translate_rep_movs(4)],
            Mnemonic::Movsq if instr.has_rep_prefix() => vec![self.translate_rep_movs(8)],
            Mnemonic::Stosb if instr.has_rep_prefix() => vec![self.translate_rep_stos(1)],
            Mnemonic::Stosw if instr.has_rep_prefix() => vec![self.translate_rep_stos(2)],
            Mnemonic::Stosd if instr.has_rep_prefix() => vec![self.translate_rep_stos(4)],
            Mnemonic::Stosq if instr.has_rep_prefix() => vec![self.translate_rep_stos(8)],
            Mnemonic::Movups | Mnemonic::Movaps | Mnemonic::Movdqu | Mnemonic::Movdqa => {
                self.translate_vec_mov(&instr)
            }
            Mnemonic::Xorps | Mnemonic::Pxor => self.translate_vec_zero(&instr),
            Mnemonic::Push
            | Mnemonic::Pop
            | Mnemonic::Nop
            | Mnemonic::Leave
            | Mnemonic::Cdq
            | Mnemonic::Cqo => Vec::new(),
            _ => {
                tracing::trace!(mnemonic = ?mnemonic, "no semantic translation");
                Vec::new()
            }
        }
    }

    fn translate_mov(&mut self, instr: &Instruction) -> Vec<Stmt> {
        if instr.op_kind(0) == OpKind::Memory {
            let value = self.op_read(instr, 1);
            return vec![self.mem_write(instr, value)];
        }
        let dst = instr.op_register(0);
        let rhs = self.op_read(instr, 1);
        self.ctx.note_write(dst);
        if is_imm_kind(instr.op_kind(1)) {
            let value = instr.immediate(1);
            self.ctx
                .reg_values
                .insert(canonical_reg(dst), RegValue::Const(value));
            if canonical_reg(dst) == Register::RAX {
                self.ctx.pending_ret_const = Some((value, self.op_bits(instr, 0)));
            }
        } else if instr.op_kind(1) == OpKind::Register {
            if let Some(summary) = self
                .ctx
                .reg_values
                .get(&canonical_reg(instr.op_register(1)))
                .copied()
            {
                self.ctx.reg_values.insert(canonical_reg(dst), summary);
            }
        }
        vec![Stmt::assign(self.reg_expr(dst), rhs)]
    }

    fn translate_extend(&mut self, instr: &Instruction, kind: CastKind) -> Vec<Stmt> {
        let dst = instr.op_register(0);
        let src = self.op_read(instr, 1);
        let bits = (dst.size() * 8) as u16;
        let target = match kind {
            CastKind::SignExtend => IrType::int(bits),
            _ => IrType::uint(bits),
        };
        self.ctx.note_write(dst);
        vec![Stmt::assign(
            self.reg_expr(dst),
            Expr::cast(src, target, kind),
        )]
    }

    fn translate_lea(&mut self, instr: &Instruction) -> Vec<Stmt> {
        let dst = instr.op_register(0);
        let value = if let Some((name, _)) = self.frame_local(instr) {
            self.declare_frame_local(&name, IrType::unknown());
            Expr::addr_of(Expr::local(name))
        } else {
            self.mem_address(instr)
        };
        self.ctx.note_write(dst);
        if instr.memory_index() == Register::None {
            let disp = instr.memory_displacement64() as i64;
            let stack_base = instr.memory_base() == Register::RSP
                || (instr.memory_base() == Register::RBP && self.ctx.uses_frame_pointer);
            if stack_base {
                self.ctx
                    .reg_values
                    .insert(canonical_reg(dst), RegValue::StackAddr(disp));
            }
        }
        vec![Stmt::assign(self.reg_expr(dst), value)]
    }

    fn translate_xor(&mut self, instr: &Instruction) -> Vec<Stmt> {
        let same_reg = instr.op_kind(0) == OpKind::Register
            && instr.op_kind(1) == OpKind::Register
            && instr.op_register(0) == instr.op_register(1);
        if same_reg {
            let dst = instr.op_register(0);
            let bits = (dst.size() * 8) as u16;
            self.ctx.note_write(dst);
            self.ctx
                .reg_values
                .insert(canonical_reg(dst), RegValue::Const(0));
            return vec![Stmt::assign(self.reg_expr(dst), Expr::uint(0, bits))];
        }
        self.translate_binop(instr, BinOpKind::Xor)
    }

    fn translate_binop(&mut self, instr: &Instruction, op: BinOpKind) -> Vec<Stmt> {
        self.translate_binop_with(instr, op, None)
    }

    fn translate_binop_with(
        &mut self,
        instr: &Instruction,
        op: BinOpKind,
        rhs_override: Option<Expr>,
    ) -> Vec<Stmt> {
        match instr.op_kind(0) {
            OpKind::Register => {
                let dst = instr.op_register(0);
                let lhs = self.reg_expr(dst);
                let rhs = match rhs_override {
                    Some(rhs) => rhs,
                    None => self.op_read(instr, 1),
                };
                self.ctx.note_write(dst);
                vec![Stmt::assign(lhs.clone(), Expr::binop(op, lhs, rhs))]
            }
            OpKind::Memory => {
                let current = self.mem_read(instr);
                let rhs = match rhs_override {
                    Some(rhs) => rhs,
                    None => self.op_read(instr, 1),
                };
                let value = Expr::binop(op, current, rhs);
                vec![self.mem_write(instr, value)]
            }
            _ => Vec::new(),
        }
    }

    fn translate_unop(&mut self, instr: &Instruction, op: UnOpKind) -> Vec<Stmt> {
        match instr.op_kind(0) {
            OpKind::Register => {
                let dst = instr.op_register(0);
                let operand = self.reg_expr(dst);
                self.ctx.note_write(dst);
                vec![Stmt::assign(operand.clone(), Expr::un(op, operand))]
            }
            OpKind::Memory => {
                let current = self.mem_read(instr);
                let value = Expr::un(op, current);
                vec![self.mem_write(instr, value)]
            }
            _ => Vec::new(),
        }
    }

    fn translate_imul(&mut self, instr: &Instruction) -> Vec<Stmt> {
        match instr.op_count() {
            1 => self.translate_wide_mul_div(instr, "RDX:RAX = RAX * {} (signed)"),
            2 => self.translate_binop(instr, BinOpKind::Mul),
            _ => {
                let dst = instr.op_register(0);
                let src = self.op_read(instr, 1);
                let imm = self.op_read(instr, 2);
                self.ctx.note_write(dst);
                vec![Stmt::assign(self.reg_expr(dst), Expr::mul(src, imm))]
            }
        }
    }

    // One-operand multiply/divide families widen through RDX:RAX; the IR
    // has no 128-bit values, so they stay pseudo.
    fn translate_wide_mul_div(&mut self, instr: &Instruction, template: &str) -> Vec<Stmt> {
        let operand = self.op_read(instr, 0);
        let text = expr_text(&operand);
        self.ctx.note_write(Register::RAX);
        self.ctx.note_write(Register::RDX);
        vec![Stmt::pseudo(template.replace("{0}", &text).replace("{}", &text))]
    }

    fn translate_rotate(&mut self, instr: &Instruction, intrinsic: &str) -> Vec<Stmt> {
        if instr.op_kind(0) != OpKind::Register {
            return Vec::new();
        }
        let dst = instr.op_register(0);
        let amount = self.op_read(instr, 1);
        let value = self.reg_expr(dst);
        self.ctx.note_write(dst);
        vec![Stmt::assign(
            value.clone(),
            Expr::intrinsic(intrinsic, vec![value, amount]),
        )]
    }

    fn translate_bit_test(&mut self, instr: &Instruction) -> Vec<Stmt> {
        let value = self.op_read(instr, 0);
        let index = self.op_read(instr, 1);
        let value_text = expr_text(&value);
        let index_text = expr_text(&index);
        self.ctx.last_cmp = None;
        self.ctx.last_bt = Some(LastBt {
            value,
            index,
            ip: instr.ip(),
        });
        vec![Stmt::pseudo(format!("CF = bit({value_text}, {index_text})"))]
    }

    fn translate_flags(&mut self, instr: &Instruction, is_test: bool) -> Vec<Stmt> {
        let left = self.op_read(instr, 0);
        let right = self.op_read(instr, 1);
        let bits = self.op_bits(instr, 0);
        let pseudo = self.req.options.emit_compare_pseudo.then(|| {
            let verb = if is_test { "test" } else { "compare" };
            Stmt::pseudo(format!("{verb} {}, {}", expr_text(&left), expr_text(&right)))
        });
        self.ctx.last_bt = None;
        self.ctx.last_cmp = Some(LastCmp {
            left,
            right,
            is_test,
            bits,
            ip: instr.ip(),
        });
        pseudo.into_iter().collect()
    }

    fn translate_jmp(&mut self, instr: &Instruction) -> Vec<Stmt> {
        match instr.op_kind(0) {
            OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
                vec![self.branch_stmt(None, instr.near_branch_target())]
            }
            _ => {
                let target = self.op_read(instr, 0);
                vec![Stmt::pseudo(format!("goto {}", expr_text(&target)))]
            }
        }
    }

    fn translate_jcxz(&mut self, instr: &Instruction, reg: Register) -> Vec<Stmt> {
        let bits = (reg.size() * 8) as u16;
        let cond = Expr::cmp(
            lift_ir::CmpOp::Eq,
            self.reg_expr(reg),
            Expr::uint(0, bits),
        );
        vec![self.branch_stmt(Some(cond), instr.near_branch_target())]
    }

    fn translate_setcc(&mut self, instr: &Instruction) -> Vec<Stmt> {
        let cond = cond::condition(&mut self.ctx, instr.condition_code());
        self.ctx.last_bt = None;
        let value = Expr::ternary(cond, Expr::uint(1, 8), Expr::uint(0, 8));
        match instr.op_kind(0) {
            OpKind::Register => {
                let dst = instr.op_register(0);
                self.ctx.note_write(dst);
                vec![Stmt::assign(self.reg_expr(dst), value)]
            }
            OpKind::Memory => vec![self.mem_write(instr, value)],
            _ => Vec::new(),
        }
    }

    fn translate_cmovcc(&mut self, instr: &Instruction) -> Vec<Stmt> {
        let cond = cond::condition(&mut self.ctx, instr.condition_code());
        self.ctx.last_bt = None;
        let dst = instr.op_register(0);
        let src = self.op_read(instr, 1);
        let current = self.reg_expr(dst);
        self.ctx.note_write(dst);
        vec![Stmt::assign(
            self.reg_expr(dst),
            Expr::ternary(cond, src, current),
        )]
    }

    fn translate_vec_mov(&mut self, instr: &Instruction) -> Vec<Stmt> {
        match (instr.op_kind(0), instr.op_kind(1)) {
            (OpKind::Register, OpKind::Memory) => {
                let dst = instr.op_register(0);
                let value = self.mem_read(instr);
                self.ctx.note_write(dst);
                vec![Stmt::assign(self.reg_expr(dst), value)]
            }
            (OpKind::Memory, OpKind::Register) => {
                let src = instr.op_register(1);
                let value = if self.ctx.last_zeroed_xmm == Some(src) {
                    Expr::uint(0, 128)
                } else {
                    self.reg_expr(src)
                };
                vec![self.mem_write(instr, value)]
            }
            (OpKind::Register, OpKind::Register) => {
                let dst = instr.op_register(0);
                let src = self.op_read(instr, 1);
                self.ctx.note_write(dst);
                vec![Stmt::assign(self.reg_expr(dst), src)]
            }
            _ => Vec::new(),
        }
    }

    fn translate_vec_zero(&mut self, instr: &Instruction) -> Vec<Stmt> {
        if !peephole::is_xmm_zero_idiom(instr) {
            return Vec::new();
        }
        let dst = instr.op_register(0);
        self.ctx.note_write(dst);
        self.ctx.last_zeroed_xmm = Some(dst);
        vec![Stmt::assign(self.reg_expr(dst), Expr::uint(0, 128))]
    }

    fn branch_stmt(&mut self, cond: Option<Expr>, target: u64) -> Stmt {
        if let Some(label) = self.ctx.label_by_ip.get(&target).cloned() {
            return match cond {
                Some(cond) => Stmt::IfGoto {
                    cond,
                    target: label,
                },
                None => Stmt::Goto(label),
            };
        }
        tracing::debug!(target, "branch target outside the function window");
        match cond {
            Some(cond) => Stmt::pseudo(format!("if ({}) goto {target:#x}", expr_text(&cond))),
            None => Stmt::pseudo(format!("goto {target:#x}")),
        }
    }
}

fn is_imm_kind(kind: OpKind) -> bool {
    matches!(
        kind,
        OpKind::Immediate8
            | OpKind::Immediate8_2nd
            | OpKind::Immediate16
            | OpKind::Immediate32
            | OpKind::Immediate64
            | OpKind::Immediate8to16
            | OpKind::Immediate8to32
            | OpKind::Immediate8to64
            | OpKind::Immediate32to64
    )
}

fn is_jcc(mnemonic: Mnemonic) -> bool {
    matches!(
        mnemonic,
        Mnemonic::Ja
            | Mnemonic::Jae
            | Mnemonic::Jb
            | Mnemonic::Jbe
            | Mnemonic::Je
            | Mnemonic::Jg
            | Mnemonic::Jge
            | Mnemonic::Jl
            | Mnemonic::Jle
            | Mnemonic::Jne
            | Mnemonic::Jno
            | Mnemonic::Jnp
            | Mnemonic::Jns
            | Mnemonic::Jo
            | Mnemonic::Jp
            | Mnemonic::Js
    )
}

fn is_setcc(mnemonic: Mnemonic) -> bool {
    matches!(
        mnemonic,
        Mnemonic::Seta
            | Mnemonic::Setae
            | Mnemonic::Setb
            | Mnemonic::Setbe
            | Mnemonic::Sete
            | Mnemonic::Setg
            | Mnemonic::Setge
            | Mnemonic::Setl
            | Mnemonic::Setle
            | Mnemonic::Setne
            | Mnemonic::Setno
            | Mnemonic::Setnp
            | Mnemonic::Setns
            | Mnemonic::Seto
            | Mnemonic::Setp
            | Mnemonic::Sets
    )
}

fn is_cmovcc(mnemonic: Mnemonic) -> bool {
    matches!(
        mnemonic,
        Mnemonic::Cmova
            | Mnemonic::Cmovae
            | Mnemonic::Cmovb
            | Mnemonic::Cmovbe
            | Mnemonic::Cmove
            | Mnemonic::Cmovg
            | Mnemonic::Cmovge
            | Mnemonic::Cmovl
            | Mnemonic::Cmovle
            | Mnemonic::Cmovne
            | Mnemonic::Cmovno
            | Mnemonic::Cmovnp
            | Mnemonic::Cmovns
            | Mnemonic::Cmovo
            | Mnemonic::Cmovp
            | Mnemonic::Cmovs
    )
}
