use crate::function::Label;
use crate::types::IrType;

/// Binary operators.
///
/// Shifts distinguish logical (`Shr`) from arithmetic (`Sar`) right
/// shifts; division and remainder distinguish signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinOpKind {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// Unsigned `/`
    UDiv,
    /// Signed `/`
    SDiv,
    /// Unsigned `%`
    URem,
    /// Signed `%`
    SRem,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<`
    Shl,
    /// Logical `>>`
    Shr,
    /// Arithmetic `>>`
    Sar,
}

impl BinOpKind {
    /// C operator token.
    pub const fn token(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::UDiv | BinOpKind::SDiv => "/",
            BinOpKind::URem | BinOpKind::SRem => "%",
            BinOpKind::And => "&",
            BinOpKind::Or => "|",
            BinOpKind::Xor => "^",
            BinOpKind::Shl => "<<",
            BinOpKind::Shr | BinOpKind::Sar => ">>",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnOpKind {
    /// `-`
    Neg,
    /// `~`
    BitNot,
    /// `!`
    LogNot,
}

impl UnOpKind {
    /// C operator token.
    pub const fn token(self) -> &'static str {
        match self {
            UnOpKind::Neg => "-",
            UnOpKind::BitNot => "~",
            UnOpKind::LogNot => "!",
        }
    }
}

/// Comparison operators with explicit signedness on the ordered forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// Signed `<`
    Slt,
    /// Signed `<=`
    Sle,
    /// Signed `>`
    Sgt,
    /// Signed `>=`
    Sge,
    /// Unsigned `<`
    Ult,
    /// Unsigned `<=`
    Ule,
    /// Unsigned `>`
    Ugt,
    /// Unsigned `>=`
    Uge,
}

impl CmpOp {
    /// C operator token.
    pub const fn token(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Slt | CmpOp::Ult => "<",
            CmpOp::Sle | CmpOp::Ule => "<=",
            CmpOp::Sgt | CmpOp::Ugt => ">",
            CmpOp::Sge | CmpOp::Uge => ">=",
        }
    }

    /// `true` for the four signed ordered comparisons.
    pub const fn is_signed_ordered(self) -> bool {
        matches!(self, CmpOp::Slt | CmpOp::Sle | CmpOp::Sgt | CmpOp::Sge)
    }

    /// `true` for the four unsigned ordered comparisons.
    pub const fn is_unsigned_ordered(self) -> bool {
        matches!(self, CmpOp::Ult | CmpOp::Ule | CmpOp::Ugt | CmpOp::Uge)
    }
}

/// Cast flavor carried by [`Expr::Cast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastKind {
    /// Widening with zero fill.
    ZeroExtend,
    /// Widening with sign fill.
    SignExtend,
    /// Narrowing.
    Trunc,
    /// Same width, different interpretation.
    Bitcast,
    /// Pointer/integer reinterpretation.
    Reinterpret,
}

/// Segment override on loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    /// `fs:`
    Fs,
    /// `gs:`
    Gs,
}

impl Segment {
    /// Rendered prefix, including the colon.
    pub const fn prefix(self) -> &'static str {
        match self {
            Segment::Fs => "fs:",
            Segment::Gs => "gs:",
        }
    }
}

/// Call destination: a symbol, or an address computed at runtime.
///
/// The two forms are mutually exclusive by construction; there is no way
/// to build a call that carries both a name and an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CallTarget {
    /// Direct call to a named symbol.
    ByName(String),
    /// Indirect call through an address expression.
    Indirect(Box<Expr>),
}

/// Expression node.
///
/// Composite variants own their children via `Box`/`Vec`; equality and
/// hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    /// Signed constant with a width in bits.
    Const {
        /// Signed payload.
        value: i64,
        /// Width in bits.
        bits: u16,
    },
    /// Unsigned constant with a width in bits.
    UConst {
        /// Unsigned payload.
        value: u64,
        /// Width in bits.
        bits: u16,
    },
    /// Named constant; prints as its name.
    SymConst {
        /// Numeric value.
        value: u64,
        /// Width in bits.
        bits: u16,
        /// Symbolic name, e.g. `STATUS_INVALID_PARAMETER`.
        name: String,
    },
    /// Named register or pseudo-register, e.g. `rax`, `p1`, `ret`.
    Reg {
        /// Register name as rendered.
        name: String,
    },
    /// Function parameter reference.
    Param {
        /// Parameter name as rendered.
        name: String,
        /// Zero-based position.
        index: usize,
    },
    /// Local variable reference.
    Local {
        /// Local name as rendered.
        name: String,
    },
    /// Segment base pseudo-value (`fs` or `gs` base).
    SegmentBase {
        /// Which segment.
        seg: Segment,
    },
    /// Reference to a code label.
    LabelRef {
        /// The referenced label.
        label: Label,
    },
    /// Address-of.
    AddrOf {
        /// Operand whose address is taken.
        operand: Box<Expr>,
    },
    /// Typed memory read.
    Load {
        /// Address expression.
        address: Box<Expr>,
        /// Element type of the access.
        elem: IrType,
        /// Optional segment override.
        segment: Option<Segment>,
    },
    /// Binary operation.
    BinOp {
        /// Operator.
        op: BinOpKind,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Unary operation.
    UnOp {
        /// Operator.
        op: UnOpKind,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Comparison producing a 0/1 value.
    Compare {
        /// Comparison operator.
        op: CmpOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `cond ? then : else`.
    Ternary {
        /// Condition.
        cond: Box<Expr>,
        /// Value when the condition is non-zero.
        then_expr: Box<Expr>,
        /// Value when the condition is zero.
        else_expr: Box<Expr>,
    },
    /// Width or interpretation change.
    Cast {
        /// Value being cast.
        value: Box<Expr>,
        /// Target type.
        target: IrType,
        /// Cast flavor.
        kind: CastKind,
    },
    /// Function call.
    Call {
        /// Call destination.
        target: CallTarget,
        /// Positional arguments.
        args: Vec<Expr>,
    },
    /// Compiler-intrinsic-style call, e.g. `rotl(x, 5)`.
    Intrinsic {
        /// Intrinsic name.
        name: String,
        /// Positional arguments.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Signed constant.
    pub const fn int(value: i64, bits: u16) -> Self {
        Expr::Const { value, bits }
    }

    /// Unsigned constant.
    pub const fn uint(value: u64, bits: u16) -> Self {
        Expr::UConst { value, bits }
    }

    /// Named constant.
    pub fn sym(value: u64, bits: u16, name: impl Into<String>) -> Self {
        Expr::SymConst {
            value,
            bits,
            name: name.into(),
        }
    }

    /// Register reference.
    pub fn reg(name: impl Into<String>) -> Self {
        Expr::Reg { name: name.into() }
    }

    /// Parameter reference.
    pub fn param(name: impl Into<String>, index: usize) -> Self {
        Expr::Param {
            name: name.into(),
            index,
        }
    }

    /// Local variable reference.
    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local { name: name.into() }
    }

    /// Untyped binary operation.
    pub fn binop(op: BinOpKind, left: Expr, right: Expr) -> Self {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left + right`
    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binop(BinOpKind::Add, left, right)
    }

    /// `left - right`
    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binop(BinOpKind::Sub, left, right)
    }

    /// `left * right`
    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binop(BinOpKind::Mul, left, right)
    }

    /// `left & right`
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binop(BinOpKind::And, left, right)
    }

    /// `left | right`
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binop(BinOpKind::Or, left, right)
    }

    /// Unary operation.
    pub fn un(op: UnOpKind, operand: Expr) -> Self {
        Expr::UnOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Comparison.
    pub fn cmp(op: CmpOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Conditional value.
    pub fn ternary(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::Ternary {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    /// Cast.
    pub fn cast(value: Expr, target: IrType, kind: CastKind) -> Self {
        Expr::Cast {
            value: Box::new(value),
            target,
            kind,
        }
    }

    /// Memory read without a segment override.
    pub fn load(address: Expr, elem: IrType) -> Self {
        Expr::Load {
            address: Box::new(address),
            elem,
            segment: None,
        }
    }

    /// Memory read with a segment override.
    pub fn load_seg(address: Expr, elem: IrType, segment: Segment) -> Self {
        Expr::Load {
            address: Box::new(address),
            elem,
            segment: Some(segment),
        }
    }

    /// Address-of.
    pub fn addr_of(operand: Expr) -> Self {
        Expr::AddrOf {
            operand: Box::new(operand),
        }
    }

    /// Direct call to a named symbol.
    pub fn call_named(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: CallTarget::ByName(name.into()),
            args,
        }
    }

    /// Indirect call through an address expression.
    pub fn call_indirect(address: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: CallTarget::Indirect(Box::new(address)),
            args,
        }
    }

    /// Intrinsic call.
    pub fn intrinsic(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Intrinsic {
            name: name.into(),
            args,
        }
    }

    /// `true` for plain numeric or symbolic constants.
    pub const fn is_const(&self) -> bool {
        matches!(
            self,
            Expr::Const { .. } | Expr::UConst { .. } | Expr::SymConst { .. }
        )
    }

    /// `true` when the expression is a constant zero.
    pub fn is_zero(&self) -> bool {
        matches!(
            self,
            Expr::Const { value: 0, .. } | Expr::UConst { value: 0, .. }
        )
    }

    /// Fold to an unsigned integer when the expression is a compile-time
    /// constant: a plain constant, or an `|`/`+` combination of such.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Expr::Const { value, .. } if *value >= 0 => Some(*value as u64),
            Expr::UConst { value, .. } => Some(*value),
            Expr::SymConst { value, .. } => Some(*value),
            Expr::BinOp {
                op: BinOpKind::Or,
                left,
                right,
            } => Some(left.as_uint()? | right.as_uint()?),
            Expr::BinOp {
                op: BinOpKind::Add,
                left,
                right,
            } => left.as_uint()?.checked_add(right.as_uint()?),
            _ => None,
        }
    }

    /// Visit every direct child expression.
    pub fn for_each_child<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        match self {
            Expr::Const { .. }
            | Expr::UConst { .. }
            | Expr::SymConst { .. }
            | Expr::Reg { .. }
            | Expr::Param { .. }
            | Expr::Local { .. }
            | Expr::SegmentBase { .. }
            | Expr::LabelRef { .. } => {}
            Expr::AddrOf { operand } => f(operand),
            Expr::Load { address, .. } => f(address),
            Expr::BinOp { left, right, .. } | Expr::Compare { left, right, .. } => {
                f(left);
                f(right);
            }
            Expr::UnOp { operand, .. } => f(operand),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                f(cond);
                f(then_expr);
                f(else_expr);
            }
            Expr::Cast { value, .. } => f(value),
            Expr::Call { target, args } => {
                if let CallTarget::Indirect(address) = target {
                    f(address);
                }
                args.iter().for_each(f);
            }
            Expr::Intrinsic { args, .. } => args.iter().for_each(f),
        }
    }

    /// Rewrite the tree bottom-up, applying `f` to every node.
    pub fn rewrite(self, f: &impl Fn(Expr) -> Expr) -> Expr {
        let rewritten = match self {
            Expr::AddrOf { operand } => Expr::AddrOf {
                operand: Box::new(operand.rewrite(f)),
            },
            Expr::Load {
                address,
                elem,
                segment,
            } => Expr::Load {
                address: Box::new(address.rewrite(f)),
                elem,
                segment,
            },
            Expr::BinOp { op, left, right } => Expr::BinOp {
                op,
                left: Box::new(left.rewrite(f)),
                right: Box::new(right.rewrite(f)),
            },
            Expr::UnOp { op, operand } => Expr::UnOp {
                op,
                operand: Box::new(operand.rewrite(f)),
            },
            Expr::Compare { op, left, right } => Expr::Compare {
                op,
                left: Box::new(left.rewrite(f)),
                right: Box::new(right.rewrite(f)),
            },
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => Expr::Ternary {
                cond: Box::new(cond.rewrite(f)),
                then_expr: Box::new(then_expr.rewrite(f)),
                else_expr: Box::new(else_expr.rewrite(f)),
            },
            Expr::Cast {
                value,
                target,
                kind,
            } => Expr::Cast {
                value: Box::new(value.rewrite(f)),
                target,
                kind,
            },
            Expr::Call { target, args } => {
                let target = match target {
                    CallTarget::ByName(name) => CallTarget::ByName(name),
                    CallTarget::Indirect(address) => {
                        CallTarget::Indirect(Box::new(address.rewrite(f)))
                    }
                };
                Expr::Call {
                    target,
                    args: args.into_iter().map(|a| a.rewrite(f)).collect(),
                }
            }
            Expr::Intrinsic { name, args } => Expr::Intrinsic {
                name,
                args: args.into_iter().map(|a| a.rewrite(f)).collect(),
            },
            leaf => leaf,
        };
        f(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Expr::uint(7, 32), Some(7); "plain unsigned")]
    #[test_case(Expr::int(-1, 32), None; "negative stays unfolded")]
    #[test_case(
        Expr::or(Expr::uint(0x1, 32), Expr::uint(0x4, 32)),
        Some(0x5);
        "or of constants"
    )]
    #[test_case(
        Expr::add(Expr::uint(8, 32), Expr::sym(2, 32, "TWO")),
        Some(10);
        "add folds through symbolic"
    )]
    #[test_case(Expr::add(Expr::reg("rax"), Expr::uint(8, 32)), None; "register blocks fold")]
    fn as_uint_folds_constant_shapes(e: Expr, expected: Option<u64>) {
        assert_eq!(e.as_uint(), expected);
    }

    #[test]
    fn rewrite_visits_bottom_up() {
        let e = Expr::add(Expr::reg("p1"), Expr::uint(1, 64));
        let rewritten = e.rewrite(&|node| match node {
            Expr::Reg { name } if name == "p1" => Expr::param("p1", 0),
            other => other,
        });
        assert_eq!(rewritten, Expr::add(Expr::param("p1", 0), Expr::uint(1, 64)));
    }

    #[test]
    fn every_operator_has_a_token() {
        use strum::IntoEnumIterator;
        for op in BinOpKind::iter() {
            assert!(!op.token().is_empty());
        }
        for op in CmpOp::iter() {
            assert!(!op.token().is_empty());
        }
        for op in UnOpKind::iter() {
            assert!(!op.token().is_empty());
        }
    }

    #[test]
    fn structural_equality_ignores_nothing() {
        let a = Expr::load(Expr::reg("rcx"), crate::IrType::u32());
        let b = Expr::load(Expr::reg("rcx"), crate::IrType::u32());
        assert_eq!(a, b);
        assert_ne!(a, Expr::load(Expr::reg("rcx"), crate::IrType::u64()));
    }
}
