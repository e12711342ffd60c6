//! Lifter error type.
//!
//! Only a broken byte stream is fatal. Reaching the byte limit without a
//! return is a clean stop, branches out of the function window degrade to
//! pseudo statements, and unknown mnemonics keep their disassembly
//! comment and nothing else.

/// Errors surfaced by [`crate::lift_function`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiftError {
    /// The decoder could not produce an instruction at `ip`. The
    /// partially built IR is discarded.
    #[error("no instruction could be decoded at {ip:#x}")]
    MalformedInput {
        /// Address of the undecodable bytes.
        ip: u64,
    },
}
