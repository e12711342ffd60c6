use std::collections::BTreeMap;

/// Pluggable constant-naming capability.
///
/// The printer asks, per call site and argument position, whether the
/// argument has a known enum type, and then asks for the rendered name of
/// a concrete value under that type. Implementations are read-only during
/// lifting and printing and may be shared across workers when `Sync`.
pub trait ConstantProvider {
    /// Enum type expected at `arg_index` of `call_symbol`, if known.
    ///
    /// An optional `module!` prefix on the symbol is ignored, and the
    /// symbol itself is matched case-insensitively.
    fn expected_enum_type(&self, call_symbol: &str, arg_index: usize) -> Option<String>;

    /// Formatted name for `value` under `enum_type`.
    ///
    /// Returns `None` when the enum type itself is unknown. For a known
    /// enum type, the result is an exact member name, a `A | B` flag
    /// union, or a hex literal as the last resort.
    fn format_value(&self, enum_type: &str, value: u64) -> Option<String>;
}

/// Provider that knows nothing; the core must work fully against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

impl ConstantProvider for NoopProvider {
    fn expected_enum_type(&self, _call_symbol: &str, _arg_index: usize) -> Option<String> {
        None
    }

    fn format_value(&self, _enum_type: &str, _value: u64) -> Option<String> {
        None
    }
}

/// One enum known to a [`TableProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumDef {
    members: BTreeMap<u64, String>,
}

impl EnumDef {
    /// Enum with the given `(value, name)` members. A value listed twice
    /// keeps the first name.
    pub fn new(members: impl IntoIterator<Item = (u64, impl Into<String>)>) -> Self {
        let mut table = BTreeMap::new();
        for (value, name) in members {
            table.entry(value).or_insert_with(|| name.into());
        }
        EnumDef { members: table }
    }

    fn exact(&self, value: u64) -> Option<&str> {
        self.members.get(&value).map(String::as_str)
    }

    /// Decompose `value` into a union of single-bit members, names sorted
    /// by mask descending. Fails unless the union covers the value
    /// exactly.
    fn flags(&self, value: u64) -> Option<String> {
        if value == 0 {
            return None;
        }
        let mut parts: Vec<(u64, &str)> = Vec::new();
        let mut remaining = value;
        while remaining != 0 {
            let bit = 1u64 << remaining.trailing_zeros();
            let name = self.members.get(&bit)?.as_str();
            parts.push((bit, name));
            remaining &= !bit;
        }
        parts.sort_by(|a, b| b.0.cmp(&a.0));
        Some(
            parts
                .iter()
                .map(|(_, name)| *name)
                .collect::<Vec<_>>()
                .join(" | "),
        )
    }
}

/// In-memory [`ConstantProvider`] backed by plain tables.
///
/// Production deployments back this interface with a Win32 metadata
/// database; this implementation covers tests and small embeddings.
#[derive(Debug, Clone, Default)]
pub struct TableProvider {
    enums: BTreeMap<String, EnumDef>,
    // key: (lowercased bare symbol, argument index)
    arg_types: BTreeMap<(String, usize), String>,
    return_types: BTreeMap<String, String>,
}

impl TableProvider {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enum definition under `name`.
    pub fn define_enum(&mut self, name: impl Into<String>, def: EnumDef) -> &mut Self {
        self.enums.insert(name.into(), def);
        self
    }

    /// Declare that `arg_index` of `symbol` takes `enum_type`.
    pub fn define_arg(
        &mut self,
        symbol: &str,
        arg_index: usize,
        enum_type: impl Into<String>,
    ) -> &mut Self {
        self.arg_types
            .insert((symbol.to_ascii_lowercase(), arg_index), enum_type.into());
        self
    }

    fn bare_symbol(symbol: &str) -> &str {
        symbol.rsplit_once('!').map_or(symbol, |(_, bare)| bare)
    }
}

impl ConstantProvider for TableProvider {
    fn expected_enum_type(&self, call_symbol: &str, arg_index: usize) -> Option<String> {
        let key = (
            Self::bare_symbol(call_symbol).to_ascii_lowercase(),
            arg_index,
        );
        self.arg_types.get(&key).cloned()
    }

    fn format_value(&self, enum_type: &str, value: u64) -> Option<String> {
        let def = self.enums.get(enum_type)?;
        if let Some(name) = def.exact(value) {
            return Some(name.to_owned());
        }
        if let Some(union) = def.flags(value) {
            return Some(union);
        }
        Some(format!("{value:#x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn provider() -> TableProvider {
        let mut p = TableProvider::new();
        p.define_enum(
            "FILE_ACCESS",
            EnumDef::new([
                (0x1u64, "FILE_READ"),
                (0x2, "FILE_WRITE"),
                (0x4, "FILE_APPEND"),
                (0x80000000, "GENERIC_READ"),
            ]),
        );
        p.define_enum(
            "NTSTATUS",
            EnumDef::new([(0xC000000Du64, "STATUS_INVALID_PARAMETER")]),
        );
        p.define_arg("CreateFileW", 1, "FILE_ACCESS");
        p
    }

    #[rstest]
    #[case("CreateFileW", 1, Some("FILE_ACCESS"))]
    #[case("createfilew", 1, Some("FILE_ACCESS"))]
    #[case("kernel32!CreateFileW", 1, Some("FILE_ACCESS"))]
    #[case("CreateFileW", 0, None)]
    #[case("OtherFn", 1, None)]
    fn symbol_lookup_is_prefix_stripping_and_case_insensitive(
        #[case] symbol: &str,
        #[case] index: usize,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            provider().expected_enum_type(symbol, index).as_deref(),
            expected
        );
    }

    #[test]
    fn exact_match_wins_over_decomposition() {
        assert_eq!(
            provider().format_value("FILE_ACCESS", 0x1).as_deref(),
            Some("FILE_READ")
        );
    }

    #[test]
    fn flag_union_sorts_by_mask_descending() {
        assert_eq!(
            provider().format_value("FILE_ACCESS", 0x80000003).as_deref(),
            Some("GENERIC_READ | FILE_WRITE | FILE_READ")
        );
    }

    #[test]
    fn uncovered_bits_fall_back_to_hex() {
        assert_eq!(
            provider().format_value("FILE_ACCESS", 0x9).as_deref(),
            Some("0x9")
        );
    }

    #[test]
    fn unknown_enum_is_a_miss() {
        assert_eq!(provider().format_value("NO_SUCH_ENUM", 1), None);
    }

    #[test]
    fn noop_provider_knows_nothing() {
        assert_eq!(NoopProvider.expected_enum_type("memset", 0), None);
        assert_eq!(NoopProvider.format_value("NTSTATUS", 0), None);
    }
}
