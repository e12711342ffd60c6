//! Coalescing of SSE store/copy runs into `memset`/`memcpy` calls.
//!
//! Both matchers are greedy over consecutive instructions, require a
//! structurally identical base address and a stride of exactly 16 bytes,
//! and refuse runs shorter than 32 bytes. A run with a branch target in
//! its interior is never consumed.

use iced_x86::{Instruction, Mnemonic, Register};
use lift_ir::{CastKind, Expr, IrType, Stmt};

use super::operands::add_offset;
use super::Lifter;

/// Result of a successful coalesce: replacement statements and how many
/// instructions they stand for.
pub(crate) struct Coalesced {
    pub stmts: Vec<Stmt>,
    pub consumed: usize,
}

fn is_vec_mov(mnemonic: Mnemonic) -> bool {
    matches!(
        mnemonic,
        Mnemonic::Movups | Mnemonic::Movaps | Mnemonic::Movdqu
    )
}

pub(crate) fn is_xmm_zero_idiom(instr: &Instruction) -> bool {
    matches!(instr.mnemonic(), Mnemonic::Xorps | Mnemonic::Pxor)
        && instr.op_count() == 2
        && instr.op_register(0) != Register::None
        && instr.op_register(0) == instr.op_register(1)
        && instr.op_register(0).is_xmm()
}

fn is_vec_store(instr: &Instruction) -> bool {
    is_vec_mov(instr.mnemonic())
        && instr.op_kind(0) == iced_x86::OpKind::Memory
        && instr.op_register(1).is_xmm()
}

fn is_vec_load(instr: &Instruction) -> bool {
    is_vec_mov(instr.mnemonic())
        && instr.op_register(0).is_xmm()
        && instr.op_kind(1) == iced_x86::OpKind::Memory
}

fn plain_memory(instr: &Instruction) -> bool {
    instr.memory_index() == Register::None
        && !instr.is_ip_rel_memory_operand()
        && instr.memory_base() != Register::None
}

impl Lifter<'_> {
    /// Try both coalescers at `start`.
    pub(crate) fn try_coalesce(&mut self, start: usize) -> Option<Coalesced> {
        self.try_zero_store_run(start)
            .or_else(|| self.try_copy_run(start))
    }

    /// Split a plain memory operand into `(base, offset)`. An operand
    /// without an explicit displacement is `(base, 0)`; bases are later
    /// matched structurally.
    pub(crate) fn split_base_plus_offset(&self, instr: &Instruction) -> (Expr, i64) {
        let base = instr.memory_base();
        if base == Register::None {
            return (Expr::uint(instr.memory_displacement64(), 64), 0);
        }
        (self.reg_expr(base), instr.memory_displacement64() as i64)
    }

    /// A zeroed XMM register stored to consecutive 16-byte slots.
    fn try_zero_store_run(&mut self, start: usize) -> Option<Coalesced> {
        let first = self.instrs[start];
        let (zero_reg, stores_from) = if is_xmm_zero_idiom(&first) {
            (first.op_register(0), start + 1)
        } else if is_vec_store(&first)
            && self.ctx.last_zeroed_xmm == Some(first.op_register(1))
        {
            (first.op_register(1), start)
        } else {
            return None;
        };

        let mut split: Option<(Expr, i64)> = None;
        let mut count = 0usize;
        let mut next = stores_from;
        while let Some(instr) = self.instrs.get(next).copied() {
            if !is_vec_store(&instr)
                || instr.op_register(1) != zero_reg
                || !plain_memory(&instr)
                || instr.memory_size().size() != 16
            {
                break;
            }
            let (base, offset) = self.split_base_plus_offset(&instr);
            match &split {
                None => split = Some((base, offset)),
                Some((first_base, first_offset)) => {
                    if *first_base != base || offset != first_offset + 16 * count as i64 {
                        break;
                    }
                }
            }
            count += 1;
            next += 1;
        }

        let total = 16 * count;
        if total < 32 {
            return None;
        }
        let consumed = next - start;
        if self.span_has_interior_label(start, consumed) {
            return None;
        }

        let (base, offset) = split.expect("a matched run records its base");
        tracing::debug!(bytes = total, "coalesced zero-store run into memset");
        self.ctx.last_zeroed_xmm = Some(zero_reg);
        let dst = Expr::cast(
            add_offset(base, offset),
            IrType::void_ptr(),
            CastKind::Reinterpret,
        );
        let call = Expr::call_named(
            "memset",
            vec![dst, Expr::uint(0, 32), Expr::uint(total as u64, 64)],
        );
        Some(Coalesced {
            stmts: vec![Stmt::Call(call)],
            consumed,
        })
    }

    /// Paired 16-byte load/store runs copying between two bases.
    fn try_copy_run(&mut self, start: usize) -> Option<Coalesced> {
        let mut src_split: Option<(Expr, i64)> = None;
        let mut dst_split: Option<(Expr, i64)> = None;
        let mut pairs = 0usize;
        let mut next = start;

        while next + 1 < self.instrs.len() {
            let load = self.instrs[next];
            let store = self.instrs[next + 1];
            if !is_vec_load(&load)
                || !is_vec_store(&store)
                || load.op_register(0) != store.op_register(1)
                || !plain_memory(&load)
                || !plain_memory(&store)
                || load.memory_size().size() != 16
                || store.memory_size().size() != 16
            {
                break;
            }
            let (sb, so) = self.split_base_plus_offset(&load);
            let (db, doff) = self.split_base_plus_offset(&store);
            match (&src_split, &dst_split) {
                (None, None) => {
                    if so != doff {
                        break;
                    }
                    src_split = Some((sb, so));
                    dst_split = Some((db, doff));
                }
                (Some((src_base, src_off)), Some((dst_base, dst_off))) => {
                    let stride = 16 * pairs as i64;
                    if *src_base != sb
                        || *dst_base != db
                        || so != src_off + stride
                        || doff != dst_off + stride
                    {
                        break;
                    }
                }
                _ => break,
            }
            pairs += 1;
            next += 2;
        }

        if pairs < 2 {
            return None;
        }
        let consumed = next - start;
        if self.span_has_interior_label(start, consumed) {
            return None;
        }

        let (src_base, offset) = src_split.expect("a matched run records its source");
        let (dst_base, _) = dst_split.expect("a matched run records its destination");
        if let Some(zeroed) = self.ctx.last_zeroed_xmm {
            let overwritten = self.instrs[start..next]
                .iter()
                .any(|i| is_vec_load(i) && i.op_register(0) == zeroed);
            if overwritten {
                self.ctx.last_zeroed_xmm = None;
            }
        }
        let total = 16 * pairs;
        tracing::debug!(bytes = total, "coalesced paired load/store run into memcpy");
        let cast = |base: Expr| {
            Expr::cast(
                add_offset(base, offset),
                IrType::void_ptr(),
                CastKind::Reinterpret,
            )
        };
        let call = Expr::call_named(
            "memcpy",
            vec![
                cast(dst_base),
                cast(src_base),
                Expr::uint(total as u64, 64),
            ],
        );
        Some(Coalesced {
            stmts: vec![Stmt::Call(call)],
            consumed,
        })
    }

    /// Branch target strictly inside the span (after its first
    /// instruction).
    fn span_has_interior_label(&self, start: usize, consumed: usize) -> bool {
        self.instrs[start + 1..start + consumed]
            .iter()
            .any(|i| self.ctx.label_by_ip.contains_key(&i.ip()))
    }
}
