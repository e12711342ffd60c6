//! Lifts x64 machine code to annotated, C-like pseudocode.
//!
//! The pipeline is a single forward pass: bytes are decoded with
//! [`iced_x86`], translated instruction by instruction into the
//! [`lift_ir`] tree (with peephole coalescing of `memset`/`memcpy`
//! idioms), refined by a short fixed sequence of passes, and rendered by
//! the deterministic printer.
//!
//! The lifter targets Windows/MSVC code under the Microsoft x64 calling
//! convention. It is strictly synchronous and owns all of its state;
//! independent functions can be lifted from parallel workers without
//! sharing anything but a read-only constant provider.
//!
//! ```
//! use lift_x64::{lift_to_pseudocode, LiftRequest};
//! use lift_ir::printer::PrinterOptions;
//!
//! // xor rax, rax; ret
//! let bytes = [0x48, 0x31, 0xC0, 0xC3];
//! let req = LiftRequest::new(&bytes, 0x1_4000_1000);
//! let text = lift_to_pseudocode(&req, &PrinterOptions::default(), None).unwrap();
//! assert!(text.contains("rax = 0;"));
//! assert!(text.contains("return ret;"));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod decode;
pub mod error;
mod lifter;
pub mod passes;
mod request;

pub use error::LiftError;
pub use lifter::lift_function;
pub use request::{ImportResolver, LiftOptions, LiftRequest};

use lift_ir::printer::{Printer, PrinterOptions};
use lift_ir::ConstantProvider;

/// Common imports for embedders.
pub mod prelude {
    pub use crate::{
        lift_function, lift_to_pseudocode, ImportResolver, LiftError, LiftOptions, LiftRequest,
    };
    pub use lift_ir::printer::{Printer, PrinterOptions};
    pub use lift_ir::{ConstantProvider, Expr, Function, IrType, NoopProvider, Stmt};
}

/// Lift, refine, and print in one call.
///
/// This is the whole pipeline: [`lift_function`], the standard
/// [`passes`], and a [`Printer`] over `printer_options` and the optional
/// constant provider. The output is a single UTF-8 string; there are no
/// side effects.
pub fn lift_to_pseudocode(
    req: &LiftRequest<'_>,
    printer_options: &PrinterOptions,
    provider: Option<&dyn ConstantProvider>,
) -> Result<String, LiftError> {
    let mut func = lift_function(req)?;
    passes::run(&mut func, provider, req.options.return_enum_type.as_deref());
    let printer = match provider {
        Some(p) => Printer::new(printer_options).with_provider(p),
        None => Printer::new(printer_options),
    };
    Ok(printer.print(&func))
}
