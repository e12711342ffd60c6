//! Bounded linear decode of a function window.

use iced_x86::{Decoder, DecoderOptions, FlowControl, Instruction};

use crate::error::LiftError;

/// Decode instructions from `base` until the first return (inclusive),
/// the optional byte bound, or the end of the buffer.
///
/// Running out of bytes or hitting the bound without a return is a clean
/// stop; an undecodable byte sequence is fatal.
pub(crate) fn decode_window(
    bytes: &[u8],
    base: u64,
    max_bytes: Option<usize>,
) -> Result<Vec<Instruction>, LiftError> {
    let limit = max_bytes.map(|m| base.saturating_add(m as u64));
    let mut decoder = Decoder::with_ip(64, bytes, base, DecoderOptions::NONE);
    let mut instrs = Vec::new();

    while decoder.can_decode() {
        if let Some(limit) = limit {
            if decoder.ip() >= limit {
                tracing::debug!(ip = decoder.ip(), "byte bound reached without a return");
                break;
            }
        }
        let instr = decoder.decode();
        if instr.is_invalid() {
            return Err(LiftError::MalformedInput { ip: instr.ip() });
        }
        tracing::trace!(ip = instr.ip(), len = instr.len(), "decoded");
        let flow = instr.flow_control();
        instrs.push(instr);
        if flow == FlowControl::Return {
            break;
        }
    }

    if instrs.is_empty() {
        return Err(LiftError::MalformedInput { ip: base });
    }
    Ok(instrs)
}

/// End of the decoded window: one past the last byte of the last
/// instruction.
pub(crate) fn window_end(instrs: &[Instruction]) -> u64 {
    instrs
        .last()
        .map(|i| i.ip() + i.len() as u64)
        .unwrap_or_default()
}
