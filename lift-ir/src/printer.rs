//! Deterministic rendering of the IR to C-like pseudocode.
//!
//! The printer is pure: the same function and options produce the same
//! output, byte for byte. Expression printing is driven by a numeric
//! precedence table; parentheses appear exactly where the child binds
//! weaker than its context requires.

use crate::expr::{BinOpKind, CallTarget, Expr};
use crate::function::{Function, LocalVar};
use crate::provider::ConstantProvider;
use crate::stmt::Stmt;
use crate::types::IrType;

/// Rendering options.
#[derive(Debug, Clone)]
pub struct PrinterOptions {
    /// Emit the fixed assumptions comment above the function header.
    pub preamble: bool,
    /// Append `/* signed */` / `/* unsigned */` hints to ordered
    /// relational comparisons.
    pub signedness_hints: bool,
    /// Render integer types in `stdint.h` style (`uint32_t`) instead of
    /// C native names (`unsigned int`).
    pub stdint_types: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        PrinterOptions {
            preamble: true,
            signedness_hints: true,
            stdint_types: true,
        }
    }
}

// Precedence levels, in increasing binding order. A child is wrapped in
// parentheses exactly when its own level is below the context level.
const PREC_MIN: u8 = 0;
#[allow(dead_code)]
const PREC_ASSIGN: u8 = 1;
const PREC_COND: u8 = 2;
const PREC_BIT_OR: u8 = 3;
const PREC_BIT_XOR: u8 = 4;
const PREC_BIT_AND: u8 = 5;
const PREC_REL: u8 = 6;
const PREC_SHIFT: u8 = 7;
const PREC_ADD: u8 = 8;
const PREC_MUL: u8 = 9;
const PREC_PREFIX: u8 = 10;
const PREC_ATOM: u8 = 11;

const INDENT: &str = "    ";

fn binop_prec(op: BinOpKind) -> u8 {
    match op {
        BinOpKind::Or => PREC_BIT_OR,
        BinOpKind::Xor => PREC_BIT_XOR,
        BinOpKind::And => PREC_BIT_AND,
        BinOpKind::Shl | BinOpKind::Shr | BinOpKind::Sar => PREC_SHIFT,
        BinOpKind::Add | BinOpKind::Sub => PREC_ADD,
        BinOpKind::Mul | BinOpKind::UDiv | BinOpKind::SDiv | BinOpKind::URem | BinOpKind::SRem => {
            PREC_MUL
        }
    }
}

fn expr_prec(e: &Expr) -> u8 {
    match e {
        Expr::BinOp { op, .. } => binop_prec(*op),
        Expr::Compare { .. } => PREC_REL,
        Expr::Ternary { .. } => PREC_COND,
        Expr::UnOp { .. } | Expr::AddrOf { .. } | Expr::Cast { .. } | Expr::Load { .. } => {
            PREC_PREFIX
        }
        _ => PREC_ATOM,
    }
}

fn width_mask(bits: u16) -> u64 {
    match bits {
        0 | 64 => u64::MAX,
        b => (1u64 << b) - 1,
    }
}

fn uconst_text(value: u64) -> String {
    if value < 10 {
        value.to_string()
    } else {
        format!("{value:#x}")
    }
}

/// Renders [`Function`]s and expressions to text.
pub struct Printer<'a> {
    options: &'a PrinterOptions,
    provider: Option<&'a dyn ConstantProvider>,
}

impl<'a> Printer<'a> {
    /// Printer over the given options, with no constant naming.
    pub fn new(options: &'a PrinterOptions) -> Self {
        Printer {
            options,
            provider: None,
        }
    }

    /// Attach a constant-naming provider used at call arguments.
    pub fn with_provider(mut self, provider: &'a dyn ConstantProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Render a whole function.
    pub fn print(&self, func: &Function) -> String {
        let mut out = String::new();
        if self.options.preamble {
            out.push_str(
                "/*\n * Reconstructed pseudocode, not compilable C.\n \
                 * Calling convention: Microsoft x64 (args in rcx, rdx, r8, r9).\n \
                 * Types are best-effort widths; memory is typed at the access site.\n */\n",
            );
        }

        out.push_str(&self.render_type(&func.return_type));
        out.push(' ');
        out.push_str(&func.name);
        out.push('(');
        for (i, p) in func.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.render_type(&p.ty));
            out.push(' ');
            out.push_str(&p.name);
        }
        out.push_str(") {\n");

        self.render_frame_comments(func, &mut out);
        for local in &func.locals {
            self.render_local(local, &mut out);
        }
        if !func.locals.is_empty() {
            out.push('\n');
        }

        for block in &func.blocks {
            if let Some(label) = &block.label {
                out.push_str(&label.name);
                out.push_str(":\n");
            }
            for stmt in &block.stmts {
                self.render_stmt(stmt, &mut out);
            }
        }

        out.push_str("}\n");
        out
    }

    /// Render a single expression with default (minimum) context.
    pub fn expr_to_string(&self, e: &Expr) -> String {
        let mut out = String::new();
        self.render_expr(e, PREC_MIN, &mut out);
        out
    }

    fn render_frame_comments(&self, func: &Function, out: &mut String) {
        let tags = &func.tags;
        if tags.uses_frame_pointer {
            if tags.local_size > 0 {
                out.push_str(INDENT);
                out.push_str(&format!(
                    "// frame: rbp-based; locals reserved with sub rsp, {:#x}\n",
                    tags.local_size
                ));
            } else {
                out.push_str(INDENT);
                out.push_str("// frame: rbp-based; no fixed local area\n");
            }
        } else if tags.local_size > 0 {
            out.push_str(INDENT);
            out.push_str(&format!("// frame: sub rsp, {:#x}\n", tags.local_size));
        }
        out.push_str(INDENT);
        out.push_str("// memory accesses are shown as *(uintXX_t*)(addr)\n");
    }

    fn render_local(&self, local: &LocalVar, out: &mut String) {
        out.push_str(INDENT);
        out.push_str(&self.render_type(&local.ty));
        out.push(' ');
        out.push_str(&local.name);
        if let Some(init) = &local.init {
            out.push_str(" = ");
            self.render_expr(init, PREC_MIN, out);
        }
        out.push_str(";\n");
    }

    fn render_stmt(&self, stmt: &Stmt, out: &mut String) {
        match stmt {
            Stmt::Assign { lhs, rhs } => {
                out.push_str(INDENT);
                let is_call = matches!(rhs, Expr::Call { .. });
                if is_call {
                    out.push_str("/* call */ ");
                }
                self.render_expr(lhs, PREC_MIN, out);
                out.push_str(" = ");
                self.render_expr(rhs, PREC_MIN, out);
                out.push(';');
                if is_call && lhs_is_rax(lhs) {
                    out.push_str("  // RAX");
                }
                out.push('\n');
            }
            Stmt::Store {
                address,
                value,
                elem,
                segment,
            } => {
                out.push_str(INDENT);
                self.render_memory(address, elem, *segment, out);
                out.push_str(" = ");
                self.render_expr(value, PREC_MIN, out);
                out.push_str(";\n");
            }
            Stmt::Call(call) => {
                out.push_str(INDENT);
                self.render_expr(call, PREC_MIN, out);
                out.push_str(";\n");
            }
            Stmt::IfGoto { cond, target } => {
                out.push_str(INDENT);
                out.push_str("if (");
                self.render_expr(cond, PREC_MIN, out);
                out.push_str(") goto ");
                out.push_str(&target.name);
                out.push_str(";\n");
            }
            Stmt::Goto(target) => {
                out.push_str(INDENT);
                out.push_str("goto ");
                out.push_str(&target.name);
                out.push_str(";\n");
            }
            Stmt::Label(label) => {
                out.push_str(&label.name);
                out.push_str(":\n");
            }
            Stmt::Return(value) => {
                out.push_str(INDENT);
                out.push_str("return");
                if let Some(value) = value {
                    out.push(' ');
                    self.render_expr(value, PREC_MIN, out);
                }
                out.push_str(";\n");
            }
            Stmt::AsmComment(text) => {
                out.push_str(INDENT);
                out.push_str("/* ");
                out.push_str(text);
                out.push_str(" */\n");
            }
            Stmt::Pseudo(text) => {
                out.push_str(INDENT);
                out.push_str("__pseudo(");
                out.push_str(text);
                out.push_str(");\n");
            }
            Stmt::Nop => {
                out.push_str(INDENT);
                out.push_str("__pseudo(nop);\n");
            }
        }
    }

    fn render_expr(&self, e: &Expr, ctx: u8, out: &mut String) {
        let prec = expr_prec(e);
        let parens = prec < ctx;
        if parens {
            out.push('(');
        }
        match e {
            Expr::Const { value, bits } => {
                if *value >= 0 {
                    out.push_str(&uconst_text(*value as u64));
                } else {
                    let raw = (*value as u64) & width_mask(*bits);
                    out.push_str(&format!("{raw:#x}"));
                }
            }
            Expr::UConst { value, .. } => out.push_str(&uconst_text(*value)),
            Expr::SymConst { name, .. } => out.push_str(name),
            Expr::Reg { name } | Expr::Param { name, .. } | Expr::Local { name } => {
                out.push_str(name)
            }
            Expr::SegmentBase { seg } => {
                out.push_str(match seg {
                    crate::Segment::Fs => "fs_base",
                    crate::Segment::Gs => "gs_base",
                });
            }
            Expr::LabelRef { label } => out.push_str(&label.name),
            Expr::AddrOf { operand } => {
                out.push('&');
                self.render_unary_operand(operand, out);
            }
            Expr::Load {
                address,
                elem,
                segment,
            } => self.render_memory(address, elem, *segment, out),
            Expr::BinOp { op, left, right } => {
                let p = binop_prec(*op);
                self.render_expr(left, p, out);
                out.push(' ');
                out.push_str(op.token());
                out.push(' ');
                self.render_expr(right, p + 1, out);
            }
            Expr::UnOp { op, operand } => {
                out.push_str(op.token());
                self.render_unary_operand(operand, out);
            }
            Expr::Compare { op, left, right } => {
                self.render_expr(left, PREC_REL, out);
                out.push(' ');
                out.push_str(op.token());
                out.push(' ');
                self.render_expr(right, PREC_REL + 1, out);
                if self.options.signedness_hints {
                    if op.is_signed_ordered() {
                        out.push_str(" /* signed */");
                    } else if op.is_unsigned_ordered() {
                        out.push_str(" /* unsigned */");
                    }
                }
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.render_expr(cond, PREC_COND + 1, out);
                out.push_str(" ? ");
                self.render_expr(then_expr, PREC_COND, out);
                out.push_str(" : ");
                self.render_expr(else_expr, PREC_COND, out);
            }
            Expr::Cast {
                value,
                target,
                kind: _,
            } => {
                out.push('(');
                out.push_str(&self.render_type(target));
                out.push(')');
                // Calls and intrinsics self-delimit; everything else is
                // wrapped so the cast operand can never be misread.
                if matches!(value.as_ref(), Expr::Call { .. } | Expr::Intrinsic { .. }) {
                    self.render_expr(value, PREC_PREFIX, out);
                } else {
                    out.push('(');
                    self.render_expr(value, PREC_MIN, out);
                    out.push(')');
                }
            }
            Expr::Call { target, args } => {
                let symbol = match target {
                    CallTarget::ByName(name) => {
                        out.push_str(name);
                        Some(name.as_str())
                    }
                    CallTarget::Indirect(address) => {
                        out.push_str("(*");
                        self.render_expr(address, PREC_MIN, out);
                        out.push(')');
                        None
                    }
                };
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.render_call_arg(symbol, i, arg, out);
                }
                out.push(')');
            }
            Expr::Intrinsic { name, args } => {
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.render_expr(arg, PREC_MIN, out);
                }
                out.push(')');
            }
        }
        if parens {
            out.push(')');
        }
    }

    fn render_unary_operand(&self, operand: &Expr, out: &mut String) {
        // A unary operand that is itself unary gets explicit parentheses,
        // so `-(-x)` can never collapse into `--x`.
        if matches!(operand, Expr::UnOp { .. } | Expr::AddrOf { .. }) {
            out.push('(');
            self.render_expr(operand, PREC_MIN, out);
            out.push(')');
        } else {
            self.render_expr(operand, PREC_PREFIX, out);
        }
    }

    fn render_call_arg(&self, symbol: Option<&str>, index: usize, arg: &Expr, out: &mut String) {
        // Byte counts in the coalesced runtime calls read better in
        // decimal: `memset(p, 0, 32)` rather than `0x20`.
        if matches!(symbol, Some("memset") | Some("memcpy")) {
            if let Expr::Const { .. } | Expr::UConst { .. } = arg {
                if let Some(v) = arg.as_uint() {
                    out.push_str(&v.to_string());
                    return;
                }
            }
        }
        if let (Some(provider), Some(symbol)) = (self.provider, symbol) {
            if let Some(enum_type) = provider.expected_enum_type(symbol, index) {
                if let Some(value) = arg.as_uint() {
                    if let Some(name) = provider.format_value(&enum_type, value) {
                        out.push_str(&name);
                        return;
                    }
                }
            }
        }
        self.render_expr(arg, PREC_MIN, out);
    }

    fn render_memory(
        &self,
        address: &Expr,
        elem: &IrType,
        segment: Option<crate::Segment>,
        out: &mut String,
    ) {
        out.push_str("*((");
        out.push_str(&self.render_type(elem));
        out.push_str("*)(");
        if let Some(seg) = segment {
            out.push_str(seg.prefix());
        }
        self.render_expr(address, PREC_MIN, out);
        out.push_str("))");
    }

    /// Render a type name.
    pub fn render_type(&self, ty: &IrType) -> String {
        match ty {
            IrType::Void => "void".to_owned(),
            IrType::Int { bits, signed } => {
                if self.options.stdint_types {
                    if *signed {
                        format!("int{bits}_t")
                    } else {
                        format!("uint{bits}_t")
                    }
                } else {
                    native_int_name(*bits, *signed).to_owned()
                }
            }
            IrType::Float { bits: 32 } => "float".to_owned(),
            IrType::Float { .. } => "double".to_owned(),
            IrType::Pointer { element } => format!("{}*", self.render_type(element)),
            IrType::Vector { bits } => format!("vec{bits}_t"),
            IrType::Named(name) => name.clone(),
            IrType::Unknown { .. } => "uint64_t /* unknown */".to_owned(),
        }
    }
}

fn native_int_name(bits: u16, signed: bool) -> &'static str {
    match (bits, signed) {
        (8, true) => "char",
        (8, false) => "unsigned char",
        (16, true) => "short",
        (16, false) => "unsigned short",
        (32, true) => "int",
        (32, false) => "unsigned int",
        (_, true) => "long long",
        (_, false) => "unsigned long long",
    }
}

fn lhs_is_rax(lhs: &Expr) -> bool {
    match lhs {
        Expr::Reg { name } | Expr::Param { name, .. } | Expr::Local { name } => {
            name.eq_ignore_ascii_case("ret") || name.eq_ignore_ascii_case("rax")
        }
        _ => false,
    }
}

/// Render an expression with default options and no provider.
///
/// Used for pseudo-statement text, where the rendering must match what
/// the printer would produce for the same expression.
pub fn expr_text(e: &Expr) -> String {
    let options = PrinterOptions::default();
    Printer::new(&options).expr_to_string(e)
}
