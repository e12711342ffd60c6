//! Lift a hard-coded function body and print the annotated pseudocode.
//!
//! Run with `cargo run --example lift_bytes`.

use lift_ir::printer::PrinterOptions;
use lift_x64::{lift_to_pseudocode, LiftRequest};

fn main() {
    // cmp eax, 0; je L1; xorps xmm0, xmm0; movups [rcx], xmm0;
    // movups [rcx+16], xmm0; L1: ret
    let bytes = [
        0x83, 0xF8, 0x00, // cmp eax, 0
        0x74, 0x0A, // je +10
        0x0F, 0x57, 0xC0, // xorps xmm0, xmm0
        0x0F, 0x11, 0x01, // movups [rcx], xmm0
        0x0F, 0x11, 0x41, 0x10, // movups [rcx+16], xmm0
        0xC3, // ret
    ];

    let req = LiftRequest::new(&bytes, 0x1_4000_1000);
    let text = lift_to_pseudocode(&req, &PrinterOptions::default(), None)
        .expect("the byte stream is well formed");
    println!("{text}");
}
