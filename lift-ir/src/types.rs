/// Type attached to loads, stores, casts, locals and parameters.
///
/// This is a width-level type system only: integers with signedness,
/// floats, pointers, SIMD vectors, and an explicit unknown. Recovering
/// richer types is out of scope for the IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IrType {
    /// No value.
    Void,
    /// Integer with an explicit width in bits (8, 16, 32 or 64).
    Int {
        /// Width in bits.
        bits: u16,
        /// Signedness used for rendering and relational operators.
        signed: bool,
    },
    /// IEEE float, 32 or 64 bits wide.
    Float {
        /// Width in bits.
        bits: u16,
    },
    /// Pointer to an element type.
    Pointer {
        /// The pointed-to type.
        element: Box<IrType>,
    },
    /// SIMD vector register contents (128, 256 or 512 bits).
    Vector {
        /// Width in bits.
        bits: u16,
    },
    /// A named type rendered verbatim, e.g. `NTSTATUS` or `u8`.
    Named(String),
    /// Width or meaning could not be determined.
    Unknown {
        /// Optional free-form annotation about why the type is unknown.
        note: Option<String>,
    },
}

impl IrType {
    /// Unsigned integer of the given width.
    pub const fn uint(bits: u16) -> Self {
        IrType::Int {
            bits,
            signed: false,
        }
    }

    /// Signed integer of the given width.
    pub const fn int(bits: u16) -> Self {
        IrType::Int { bits, signed: true }
    }

    /// `uint8_t`
    pub const fn u8() -> Self {
        Self::uint(8)
    }

    /// `uint16_t`
    pub const fn u16() -> Self {
        Self::uint(16)
    }

    /// `uint32_t`
    pub const fn u32() -> Self {
        Self::uint(32)
    }

    /// `uint64_t`
    pub const fn u64() -> Self {
        Self::uint(64)
    }

    /// Pointer to `element`.
    pub fn pointer(element: IrType) -> Self {
        IrType::Pointer {
            element: Box::new(element),
        }
    }

    /// Pointer to an untyped byte region, i.e. `void*`.
    pub fn void_ptr() -> Self {
        Self::pointer(IrType::Void)
    }

    /// SIMD vector of the given width.
    pub const fn vector(bits: u16) -> Self {
        IrType::Vector { bits }
    }

    /// Unknown type without an annotation.
    pub const fn unknown() -> Self {
        IrType::Unknown { note: None }
    }

    /// Unsigned integer type matching a byte count, falling back to
    /// [`IrType::unknown`] for widths outside 1/2/4/8.
    pub fn uint_of_size(bytes: usize) -> Self {
        match bytes {
            1 => Self::uint(8),
            2 => Self::uint(16),
            4 => Self::uint(32),
            8 => Self::uint(64),
            16 => Self::vector(128),
            32 => Self::vector(256),
            64 => Self::vector(512),
            _ => Self::unknown(),
        }
    }

    /// Width of the type in bits, when it has one.
    pub fn bits(&self) -> Option<u16> {
        match self {
            IrType::Int { bits, .. } | IrType::Float { bits } | IrType::Vector { bits } => {
                Some(*bits)
            }
            IrType::Pointer { .. } => Some(64),
            IrType::Void | IrType::Named(_) | IrType::Unknown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_of_size_maps_scalar_and_vector_widths() {
        assert_eq!(IrType::uint_of_size(4), IrType::u32());
        assert_eq!(IrType::uint_of_size(16), IrType::vector(128));
        assert_eq!(IrType::uint_of_size(3), IrType::unknown());
    }

    #[test]
    fn pointer_bits_are_always_64() {
        assert_eq!(IrType::pointer(IrType::u8()).bits(), Some(64));
    }
}
