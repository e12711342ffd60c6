//! Input descriptor for a single lift.

/// Resolves an Import Address Table slot to the imported symbol name.
///
/// The lifter consults this for RIP-relative indirect calls; a hit turns
/// `(*0x140003020)(...)` into `module!Symbol(...)`.
pub trait ImportResolver {
    /// Name for the import slot at `address`, if known.
    fn resolve(&self, address: u64) -> Option<String>;
}

impl<F> ImportResolver for F
where
    F: Fn(u64) -> Option<String>,
{
    fn resolve(&self, address: u64) -> Option<String> {
        self(address)
    }
}

/// Knobs for a single lift.
#[derive(Debug, Clone)]
pub struct LiftOptions {
    /// Rendered function name; defaults to `sub_{entry:x}`.
    pub function_name: Option<String>,
    /// Stop decoding after this many bytes even without a return.
    pub max_bytes: Option<usize>,
    /// Preferred image base recorded on the produced function.
    pub image_base: u64,
    /// Also emit `__pseudo(compare l, r)` lines for `cmp`/`test`.
    pub emit_compare_pseudo: bool,
    /// Enum type used to name constant return values, e.g. `NTSTATUS`.
    pub return_enum_type: Option<String>,
}

impl Default for LiftOptions {
    fn default() -> Self {
        LiftOptions {
            function_name: None,
            max_bytes: None,
            image_base: 0x1_4000_0000,
            emit_compare_pseudo: false,
            return_enum_type: None,
        }
    }
}

/// A function body to lift: raw bytes, their virtual address, options,
/// and the optional import-name capability.
pub struct LiftRequest<'a> {
    /// Machine code of the function body.
    pub bytes: &'a [u8],
    /// Virtual address of `bytes[0]`.
    pub base: u64,
    /// Lift options.
    pub options: LiftOptions,
    /// Optional IAT name resolution.
    pub import_resolver: Option<&'a dyn ImportResolver>,
}

impl<'a> LiftRequest<'a> {
    /// Request with default options and no import resolution.
    pub fn new(bytes: &'a [u8], base: u64) -> Self {
        LiftRequest {
            bytes,
            base,
            options: LiftOptions::default(),
            import_resolver: None,
        }
    }

    /// Function name to render, applying the `sub_{addr:x}` default.
    pub fn function_name(&self) -> String {
        self.options
            .function_name
            .clone()
            .unwrap_or_else(|| format!("sub_{:x}", self.base))
    }
}
