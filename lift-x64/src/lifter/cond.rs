//! Boolean conditions for `jcc`/`setcc`/`cmovcc`.
//!
//! Conditions are reconstructed from the sliding compare/bit-test
//! contexts when available, with signed/unsigned discipline taken from
//! the condition code. Without context, the canonical flag expressions
//! are used verbatim.

use iced_x86::ConditionCode;
use lift_ir::{BinOpKind, CmpOp, Expr};

use super::context::LifterCtx;

/// Build the condition for `cc` from the current context. Consumes a
/// pending bit test when `cc` reads the carry flag.
pub(crate) fn condition(ctx: &mut LifterCtx, cc: ConditionCode) -> Expr {
    if matches!(cc, ConditionCode::b | ConditionCode::ae) {
        if let Some(bt) = ctx.last_bt.take() {
            tracing::trace!(bt_ip = bt.ip, "condition from bit-test context");
            let bit = Expr::and(
                Expr::binop(BinOpKind::Shr, bt.value, bt.index),
                Expr::uint(1, 64),
            );
            let op = if cc == ConditionCode::b {
                CmpOp::Ne
            } else {
                CmpOp::Eq
            };
            return Expr::cmp(op, bit, Expr::uint(0, 64));
        }
    }

    if let Some(cmp) = ctx.last_cmp.clone() {
        tracing::trace!(cmp_ip = cmp.ip, "condition from compare context");
        let zero = Expr::uint(0, cmp.bits);
        let relational = |op: CmpOp| {
            if cmp.is_test {
                if cmp.left == cmp.right {
                    Expr::cmp(op, cmp.left.clone(), zero.clone())
                } else {
                    Expr::cmp(
                        op,
                        Expr::and(cmp.left.clone(), cmp.right.clone()),
                        zero.clone(),
                    )
                }
            } else {
                Expr::cmp(op, cmp.left.clone(), cmp.right.clone())
            }
        };
        match cc {
            ConditionCode::e => return relational(CmpOp::Eq),
            ConditionCode::ne => return relational(CmpOp::Ne),
            ConditionCode::l => return relational(CmpOp::Slt),
            ConditionCode::ge => return relational(CmpOp::Sge),
            ConditionCode::le => return relational(CmpOp::Sle),
            ConditionCode::g => return relational(CmpOp::Sgt),
            ConditionCode::b => return relational(CmpOp::Ult),
            ConditionCode::ae => return relational(CmpOp::Uge),
            ConditionCode::be => return relational(CmpOp::Ule),
            ConditionCode::a => return relational(CmpOp::Ugt),
            _ => {}
        }
    }

    flag_table(cc)
}

fn flag(name: &str, set: bool) -> Expr {
    let op = if set { CmpOp::Ne } else { CmpOp::Eq };
    Expr::cmp(op, Expr::reg(name), Expr::uint(0, 8))
}

fn sf_ne_of() -> Expr {
    Expr::cmp(CmpOp::Ne, Expr::reg("SF"), Expr::reg("OF"))
}

fn sf_eq_of() -> Expr {
    Expr::cmp(CmpOp::Eq, Expr::reg("SF"), Expr::reg("OF"))
}

/// Canonical flag expressions, used when no compare context is live.
fn flag_table(cc: ConditionCode) -> Expr {
    match cc {
        ConditionCode::e => flag("ZF", true),
        ConditionCode::ne => flag("ZF", false),
        ConditionCode::b => flag("CF", true),
        ConditionCode::ae => flag("CF", false),
        ConditionCode::be => Expr::or(flag("CF", true), flag("ZF", true)),
        ConditionCode::a => Expr::and(flag("CF", false), flag("ZF", false)),
        ConditionCode::l => sf_ne_of(),
        ConditionCode::ge => sf_eq_of(),
        ConditionCode::le => Expr::or(flag("ZF", true), sf_ne_of()),
        ConditionCode::g => Expr::and(flag("ZF", false), sf_eq_of()),
        ConditionCode::s => flag("SF", true),
        ConditionCode::ns => flag("SF", false),
        ConditionCode::o => flag("OF", true),
        ConditionCode::no => flag("OF", false),
        ConditionCode::p => flag("PF", true),
        ConditionCode::np => flag("PF", false),
        ConditionCode::None => Expr::uint(1, 8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifter::context::LastCmp;
    use lift_ir::printer::expr_text;
    use test_case::test_case;

    fn ctx_with_cmp(left: Expr, right: Expr, is_test: bool) -> LifterCtx {
        let mut ctx = LifterCtx::default();
        ctx.last_cmp = Some(LastCmp {
            left,
            right,
            is_test,
            bits: 32,
            ip: 0x1000,
        });
        ctx
    }

    #[test_case(ConditionCode::e, "eax == 0xa"; "equal")]
    #[test_case(ConditionCode::ne, "eax != 0xa"; "not equal")]
    #[test_case(ConditionCode::l, "eax < 0xa /* signed */"; "signed less")]
    #[test_case(ConditionCode::ge, "eax >= 0xa /* signed */"; "signed ge")]
    #[test_case(ConditionCode::b, "eax < 0xa /* unsigned */"; "unsigned less")]
    #[test_case(ConditionCode::a, "eax > 0xa /* unsigned */"; "unsigned greater")]
    fn compare_context_feeds_relationals(cc: ConditionCode, expected: &str) {
        let mut ctx = ctx_with_cmp(Expr::reg("eax"), Expr::uint(10, 32), false);
        assert_eq!(expr_text(&condition(&mut ctx, cc)), expected);
    }

    #[test]
    fn test_same_register_simplifies_to_zero_check() {
        let mut ctx = ctx_with_cmp(Expr::reg("r9"), Expr::reg("r9"), true);
        assert_eq!(expr_text(&condition(&mut ctx, ConditionCode::e)), "r9 == 0");
        let mut ctx = ctx_with_cmp(Expr::reg("r9"), Expr::reg("r9"), true);
        assert_eq!(expr_text(&condition(&mut ctx, ConditionCode::ne)), "r9 != 0");
    }

    #[test]
    fn test_with_distinct_operands_masks_first() {
        let mut ctx = ctx_with_cmp(Expr::reg("eax"), Expr::uint(0x80, 32), true);
        assert_eq!(
            expr_text(&condition(&mut ctx, ConditionCode::ne)),
            "(eax & 0x80) != 0"
        );
    }

    #[test]
    fn bit_test_context_wins_for_carry_conditions() {
        let mut ctx = LifterCtx::default();
        ctx.last_bt = Some(crate::lifter::context::LastBt {
            value: Expr::reg("ecx"),
            index: Expr::uint(3, 32),
            ip: 0x1000,
        });
        let cond = condition(&mut ctx, ConditionCode::b);
        assert_eq!(expr_text(&cond), "(ecx >> 3 & 1) != 0");
        // Consumed by the first reader.
        assert!(ctx.last_bt.is_none());
    }

    #[test_case(ConditionCode::le, "ZF != 0 | SF != OF"; "le fallback")]
    #[test_case(ConditionCode::g, "ZF == 0 & SF == OF"; "g fallback")]
    #[test_case(ConditionCode::b, "CF != 0"; "carry fallback")]
    #[test_case(ConditionCode::np, "PF == 0"; "parity fallback")]
    fn flag_table_covers_contextless_codes(cc: ConditionCode, expected: &str) {
        let mut ctx = LifterCtx::default();
        assert_eq!(expr_text(&condition(&mut ctx, cc)), expected);
    }

    #[test]
    fn compare_context_survives_a_conditional_ladder() {
        let mut ctx = ctx_with_cmp(Expr::reg("eax"), Expr::uint(10, 32), false);
        let _ = condition(&mut ctx, ConditionCode::e);
        assert!(ctx.last_cmp.is_some());
        let second = condition(&mut ctx, ConditionCode::l);
        assert_eq!(expr_text(&second), "eax < 0xa /* signed */");
    }
}
