//! Refinement passes run between lifting and printing.
//!
//! Each pass is a local, idempotent rewrite over one function. Passes
//! never reorder labels or statements; the only structural change they
//! are allowed is deleting a statement they explicitly recognize.

use lift_ir::{ConstantProvider, Expr, Function, Stmt};

/// Run the standard pass order: parameter rewriting, named return
/// constants (when an enum type and provider are configured), and
/// redundant-assign elimination.
pub fn run(
    func: &mut Function,
    provider: Option<&dyn ConstantProvider>,
    return_enum_type: Option<&str>,
) {
    replace_param_regs(func);
    if let (Some(provider), Some(enum_type)) = (provider, return_enum_type) {
        map_named_return_constants(func, provider, enum_type);
    }
    simplify_redundant_assign(func);
}

/// Rewrite every `p1..p4` register reference into a parameter reference
/// with the matching index.
pub fn replace_param_regs(func: &mut Function) {
    let params: Vec<(String, usize)> = func
        .params
        .iter()
        .map(|p| (p.name.clone(), p.index))
        .collect();
    rewrite_exprs(func, &|e| match e {
        Expr::Reg { name } => match params.iter().find(|(n, _)| *n == name) {
            Some((_, index)) => Expr::param(name, *index),
            None => Expr::Reg { name },
        },
        other => other,
    });
}

/// Replace constant return values that the provider can name under
/// `enum_type` with the symbolic constant.
pub fn map_named_return_constants(
    func: &mut Function,
    provider: &dyn ConstantProvider,
    enum_type: &str,
) {
    for block in &mut func.blocks {
        for stmt in &mut block.stmts {
            let Stmt::Return(Some(value)) = stmt else {
                continue;
            };
            if !value.is_const() {
                continue;
            }
            let Some(raw) = const_bits(value) else {
                continue;
            };
            if let Some(name) = provider.format_value(enum_type, raw) {
                tracing::debug!(value = raw, %name, "named constant return");
                *value = Expr::sym(raw, 32, name);
            }
        }
    }
}

/// Drop assignments whose destination and source are the same register,
/// parameter, or local.
pub fn simplify_redundant_assign(func: &mut Function) {
    for block in &mut func.blocks {
        block.stmts.retain(|stmt| {
            let redundant = match stmt {
                Stmt::Assign { lhs, rhs } => is_simple(lhs) && lhs == rhs,
                _ => false,
            };
            if redundant {
                tracing::debug!("dropped self-assignment");
            }
            !redundant
        });
    }
}

fn is_simple(e: &Expr) -> bool {
    matches!(
        e,
        Expr::Reg { .. } | Expr::Param { .. } | Expr::Local { .. }
    )
}

fn const_bits(e: &Expr) -> Option<u64> {
    match e {
        Expr::UConst { value, .. } | Expr::SymConst { value, .. } => Some(*value),
        Expr::Const { value, bits } => {
            let mask = match bits {
                0 | 64 => u64::MAX,
                b => (1u64 << b) - 1,
            };
            Some((*value as u64) & mask)
        }
        _ => None,
    }
}

fn rewrite_exprs(func: &mut Function, f: &impl Fn(Expr) -> Expr) {
    let placeholder = || Expr::Reg {
        name: String::new(),
    };
    let mut apply = |slot: &mut Expr| {
        let owned = std::mem::replace(slot, placeholder());
        *slot = owned.rewrite(f);
    };
    for local in &mut func.locals {
        if let Some(init) = &mut local.init {
            apply(init);
        }
    }
    for block in &mut func.blocks {
        for stmt in &mut block.stmts {
            match stmt {
                Stmt::Assign { lhs, rhs } => {
                    apply(lhs);
                    apply(rhs);
                }
                Stmt::Store { address, value, .. } => {
                    apply(address);
                    apply(value);
                }
                Stmt::Call(call) => apply(call),
                Stmt::IfGoto { cond, .. } => apply(cond),
                Stmt::Return(Some(value)) => apply(value),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lift_ir::{Block, EnumDef, IrType, Parameter, TableProvider};

    fn function_with(stmts: Vec<Stmt>) -> Function {
        let mut func = Function::new("f", 0x1_4000_0000, 0x1_4000_1000);
        func.params = (1..=4usize)
            .map(|i| Parameter {
                name: format!("p{i}"),
                ty: IrType::u64(),
                index: i - 1,
            })
            .collect();
        func.blocks.push(Block {
            label: None,
            stmts,
        });
        func
    }

    #[test]
    fn param_regs_become_params_everywhere() {
        let mut func = function_with(vec![
            Stmt::assign(Expr::reg("rax"), Expr::add(Expr::reg("p1"), Expr::reg("p3"))),
            Stmt::Call(Expr::call_named("sub_140002000", vec![Expr::reg("p2")])),
        ]);
        replace_param_regs(&mut func);
        let mut saw_param = 0;
        for stmt in func.stmts() {
            let mut walk = |e: &Expr| {
                let mut count = 0;
                fn visit(e: &Expr, count: &mut usize) {
                    match e {
                        Expr::Param { .. } => *count += 1,
                        Expr::Reg { name } => {
                            assert!(!name.starts_with('p'), "unrewritten {name}")
                        }
                        _ => {}
                    }
                    e.for_each_child(&mut |c| visit(c, count));
                }
                visit(e, &mut count);
                count
            };
            match stmt {
                Stmt::Assign { lhs, rhs } => saw_param += walk(lhs) + walk(rhs),
                Stmt::Call(call) => saw_param += walk(call),
                _ => {}
            }
        }
        assert_eq!(saw_param, 3);
    }

    #[test]
    fn param_indices_match_the_table() {
        let mut func = function_with(vec![Stmt::assign(
            Expr::reg("rax"),
            Expr::reg("p3"),
        )]);
        replace_param_regs(&mut func);
        let Some(Stmt::Assign { rhs, .. }) = func.stmts().nth(0) else {
            panic!("assign survived");
        };
        assert_eq!(*rhs, Expr::param("p3", 2));
    }

    #[test]
    fn constant_returns_take_their_enum_name() {
        let mut provider = TableProvider::new();
        provider.define_enum(
            "NTSTATUS",
            EnumDef::new([(0xC000000Du64, "STATUS_INVALID_PARAMETER")]),
        );
        let mut func = function_with(vec![Stmt::Return(Some(Expr::uint(0xC000000D, 32)))]);
        map_named_return_constants(&mut func, &provider, "NTSTATUS");
        assert_eq!(
            func.stmts().next(),
            Some(&Stmt::Return(Some(Expr::sym(
                0xC000000D,
                32,
                "STATUS_INVALID_PARAMETER"
            ))))
        );
    }

    #[test]
    fn register_returns_are_left_alone() {
        let mut provider = TableProvider::new();
        provider.define_enum("NTSTATUS", EnumDef::new([(0u64, "STATUS_SUCCESS")]));
        let mut func = function_with(vec![Stmt::Return(Some(Expr::reg("ret")))]);
        map_named_return_constants(&mut func, &provider, "NTSTATUS");
        assert_eq!(func.stmts().next(), Some(&Stmt::Return(Some(Expr::reg("ret")))));
    }

    #[test]
    fn self_assigns_are_deleted_but_real_assigns_stay() {
        let mut func = function_with(vec![
            Stmt::assign(Expr::reg("rax"), Expr::reg("rax")),
            Stmt::assign(Expr::param("p1", 0), Expr::param("p1", 0)),
            Stmt::assign(Expr::reg("rax"), Expr::reg("rbx")),
            Stmt::store(Expr::reg("rax"), Expr::reg("rax"), IrType::u64()),
        ]);
        simplify_redundant_assign(&mut func);
        assert_eq!(func.stmts().count(), 2);
    }

    #[test]
    fn passes_are_idempotent() {
        let mut func = function_with(vec![
            Stmt::assign(Expr::reg("rax"), Expr::reg("p1")),
            Stmt::Return(Some(Expr::reg("ret"))),
        ]);
        run(&mut func, None, None);
        let once = func.clone();
        run(&mut func, None, None);
        assert_eq!(func, once);
    }
}
