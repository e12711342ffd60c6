//! End-to-end scenarios: bytes in, annotated pseudocode out.

use lift_ir::printer::PrinterOptions;
use lift_ir::{EnumDef, TableProvider};
use lift_x64::{lift_to_pseudocode, LiftOptions, LiftRequest};
use rstest::rstest;

const BASE: u64 = 0x1_4000_0000;

fn lift(bytes: &[u8]) -> String {
    let req = LiftRequest::new(bytes, BASE);
    lift_to_pseudocode(&req, &PrinterOptions::default(), None).expect("lift failed")
}

#[test]
fn zeroing_xor_and_pseudo_return_register() {
    // xor rax, rax; ret
    let text = lift(&[0x48, 0x31, 0xC0, 0xC3]);
    assert!(text.contains("rax = 0;"), "{text}");
    assert!(text.contains("return ret;"), "{text}");
    assert!(text.contains("0x140000000: xor rax, rax"), "{text}");
    assert!(text.contains("0x140000003: ret"), "{text}");
}

#[test]
fn zero_store_run_collapses_to_memset() {
    // xorps xmm0, xmm0; movups [rcx], xmm0; movups [rcx+16], xmm0; ret
    let text = lift(&[
        0x0F, 0x57, 0xC0, 0x0F, 0x11, 0x01, 0x0F, 0x11, 0x41, 0x10, 0xC3,
    ]);
    assert!(text.contains("memset((void*)(p1), 0, 32);"), "{text}");
    assert!(!text.contains("vec128_t"), "stores should be coalesced: {text}");
    // The consumed instructions stay visible as comments.
    assert!(text.contains("xorps xmm0, xmm0"), "{text}");
    assert!(text.contains("movups"), "{text}");
}

#[test]
fn short_zero_store_run_is_left_alone() {
    // xorps xmm0, xmm0; movups [rcx], xmm0; ret — 16 bytes, below the
    // 32-byte minimum.
    let text = lift(&[0x0F, 0x57, 0xC0, 0x0F, 0x11, 0x01, 0xC3]);
    assert!(!text.contains("memset"), "{text}");
    assert!(text.contains("*((vec128_t*)(p1)) = 0;"), "{text}");
}

#[test]
fn rep_movsb_is_memcpy() {
    // rep movsb; ret
    let text = lift(&[0xF3, 0xA4, 0xC3]);
    assert!(text.contains("memcpy(rdi, rsi, rcx * 1);"), "{text}");
}

#[test]
fn rep_stosq_is_memset_with_rax_fill() {
    // rep stosq; ret
    let text = lift(&[0xF3, 0x48, 0xAB, 0xC3]);
    assert!(text.contains("memset(rdi, rax, rcx * 8);"), "{text}");
}

#[test]
fn paired_vector_copies_collapse_to_memcpy() {
    // movups xmm0, [rdx]; movups [rcx], xmm0;
    // movups xmm1, [rdx+16]; movups [rcx+16], xmm1; ret
    let text = lift(&[
        0x0F, 0x10, 0x02, 0x0F, 0x11, 0x01, 0x0F, 0x10, 0x4A, 0x10, 0x0F, 0x11, 0x49, 0x10,
        0xC3,
    ]);
    assert!(
        text.contains("memcpy((void*)(p1), (void*)(p2), 32);"),
        "{text}"
    );
}

#[test]
fn single_vector_copy_pair_is_left_alone() {
    // movups xmm0, [rdx]; movups [rcx], xmm0; ret — one pair, 16 bytes.
    let text = lift(&[0x0F, 0x10, 0x02, 0x0F, 0x11, 0x01, 0xC3]);
    assert!(!text.contains("memcpy"), "{text}");
}

#[test]
fn compare_and_branch_recovers_the_condition() {
    // cmp eax, 0; je +2; jmp +0; ret
    let text = lift(&[0x83, 0xF8, 0x00, 0x74, 0x02, 0xEB, 0x00, 0xC3]);
    assert!(text.contains("if (eax == 0) goto L1;"), "{text}");
    assert!(text.contains("goto L1;"), "{text}");
    let label_at = text.find("L1:").expect("label printed");
    let ret_at = text.rfind("return").expect("return printed");
    assert!(label_at < ret_at, "label must precede the return: {text}");
}

#[rstest]
#[case::jb(0x72, "eax < 0xa /* unsigned */")]
#[case::ja(0x77, "eax > 0xa /* unsigned */")]
#[case::jl(0x7C, "eax < 0xa /* signed */")]
#[case::jg(0x7F, "eax > 0xa /* signed */")]
fn conditional_jumps_carry_signedness_hints(#[case] opcode: u8, #[case] expected: &str) {
    // cmp eax, 10; jcc +0; ret
    let text = lift(&[0x83, 0xF8, 0x0A, opcode, 0x00, 0xC3]);
    assert!(text.contains(expected), "{text}");
}

#[test]
fn test_same_register_prints_zero_check() {
    // test eax, eax; je +0; ret
    let text = lift(&[0x85, 0xC0, 0x74, 0x00, 0xC3]);
    assert!(text.contains("if (eax == 0) goto L1;"), "{text}");
}

#[test]
fn named_return_constant_uses_the_enum() {
    // mov eax, 0xC000000D; ret
    let bytes = [0xB8, 0x0D, 0x00, 0x00, 0xC0, 0xC3];
    let mut provider = TableProvider::new();
    provider.define_enum(
        "NTSTATUS",
        EnumDef::new([(0xC000000Du64, "STATUS_INVALID_PARAMETER")]),
    );
    let req = LiftRequest {
        bytes: &bytes,
        base: BASE,
        options: LiftOptions {
            return_enum_type: Some("NTSTATUS".into()),
            ..LiftOptions::default()
        },
        import_resolver: None,
    };
    let text =
        lift_to_pseudocode(&req, &PrinterOptions::default(), Some(&provider)).expect("lift");
    assert!(text.contains("return STATUS_INVALID_PARAMETER;"), "{text}");
    assert!(!text.contains("return 0xc000000d"), "{text}");
}

#[test]
fn without_a_provider_the_raw_constant_returns() {
    let text = lift(&[0xB8, 0x0D, 0x00, 0x00, 0xC0, 0xC3]);
    assert!(text.contains("return 0xc000000d;"), "{text}");
}

#[test]
fn gs_peb_read_becomes_a_local() {
    // mov rax, gs:[0x60]; ret
    let text = lift(&[0x65, 0x48, 0x8B, 0x04, 0x25, 0x60, 0x00, 0x00, 0x00, 0xC3]);
    assert!(
        text.contains("u8* peb = (u8*)__readgsqword(0x60);"),
        "{text}"
    );
    assert!(text.contains("rax = peb;"), "{text}");
    // The raw listing still shows the segment access, the IR must not.
    assert!(!text.contains("(gs:"), "no raw segment load expected: {text}");
}

#[test]
fn rip_relative_call_resolves_through_the_import_table() {
    // call qword ptr [rip]; ret — the slot address is the next ip.
    let bytes = [0xFF, 0x15, 0x00, 0x00, 0x00, 0x00, 0xC3];
    let slot = BASE + 6;
    let resolver = move |address: u64| {
        (address == slot).then(|| "kernel32!GetTickCount64".to_owned())
    };
    let req = LiftRequest {
        bytes: &bytes,
        base: BASE,
        options: LiftOptions::default(),
        import_resolver: Some(&resolver),
    };
    let text = lift_to_pseudocode(&req, &PrinterOptions::default(), None).expect("lift");
    assert!(
        text.contains("/* call */ ret = kernel32!GetTickCount64(p1, p2, p3, p4);  // RAX"),
        "{text}"
    );
}

#[test]
fn unresolved_rip_relative_call_stays_indirect() {
    let bytes = [0xFF, 0x15, 0x00, 0x00, 0x00, 0x00, 0xC3];
    let text = lift(&bytes);
    assert!(
        text.contains("ret = (*0x140000006)(p1, p2, p3, p4);"),
        "{text}"
    );
}

#[test]
fn direct_call_targets_get_synthetic_names() {
    // call +0; ret — target is the next instruction, inside the window.
    let text = lift(&[0xE8, 0x00, 0x00, 0x00, 0x00, 0xC3]);
    assert!(text.contains("ret = sub_140000005("), "{text}");
}

#[test]
fn branch_outside_the_window_degrades_to_pseudo() {
    // jmp +0x7f; ret
    let text = lift(&[0xEB, 0x7F, 0xC3]);
    assert!(text.contains("__pseudo(goto 0x140000081);"), "{text}");
    assert!(!text.contains("goto L"), "{text}");
}

#[test]
fn self_assignment_is_removed_by_refinement() {
    // mov rcx, rcx; ret
    let text = lift(&[0x48, 0x89, 0xC9, 0xC3]);
    assert!(!text.contains("p1 = p1;"), "{text}");
    // The instruction itself is still visible in the listing.
    assert!(text.contains("mov rcx, rcx"), "{text}");
}

#[test]
fn frame_prologue_and_epilogue_are_suppressed_and_tagged() {
    // push rbp; mov rbp, rsp; sub rsp, 0x20; mov [rbp-8], rcx;
    // add rsp, 0x20; pop rbp; ret
    let text = lift(&[
        0x55, 0x48, 0x89, 0xE5, 0x48, 0x83, 0xEC, 0x20, 0x48, 0x89, 0x4D, 0xF8, 0x48, 0x83,
        0xC4, 0x20, 0x5D, 0xC3,
    ]);
    assert!(text.contains("// frame: rbp-based"), "{text}");
    assert!(text.contains("local_8 = p1;"), "{text}");
    assert!(!text.contains("rbp = rsp;"), "{text}");
    assert!(!text.contains("rsp = rsp"), "{text}");
}
