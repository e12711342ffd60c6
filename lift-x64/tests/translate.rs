//! Per-mnemonic translation shapes, checked through the whole pipeline.

use lift_ir::printer::PrinterOptions;
use lift_x64::{lift_to_pseudocode, LiftRequest};

const BASE: u64 = 0x1_4000_0000;

fn lift(bytes: &[u8]) -> String {
    let req = LiftRequest::new(bytes, BASE);
    lift_to_pseudocode(&req, &PrinterOptions::default(), None).expect("lift failed")
}

#[test]
fn setcc_assigns_a_ternary() {
    // test eax, eax; sete dl; ret
    let text = lift(&[0x85, 0xC0, 0x0F, 0x94, 0xC2, 0xC3]);
    assert!(text.contains("p2 = eax == 0 ? 1 : 0;"), "{text}");
}

#[test]
fn cmovcc_keeps_the_old_value_in_the_else_arm() {
    // cmp eax, ebx; cmove eax, ebx; ret
    let text = lift(&[0x39, 0xD8, 0x0F, 0x44, 0xC3, 0xC3]);
    assert!(text.contains("eax = eax == ebx ? ebx : eax;"), "{text}");
}

#[test]
fn bit_test_feeds_the_following_carry_branch() {
    // bt eax, ecx; jb +0; ret
    let text = lift(&[0x0F, 0xA3, 0xC8, 0x72, 0x00, 0xC3]);
    assert!(text.contains("__pseudo(CF = bit(eax, p1));"), "{text}");
    assert!(
        text.contains("if ((eax >> p1 & 1) != 0) goto L1;"),
        "{text}"
    );
}

#[test]
fn rotates_become_intrinsics() {
    // rol eax, 5; ret
    let text = lift(&[0xC1, 0xC0, 0x05, 0xC3]);
    assert!(text.contains("eax = rotl(eax, 5);"), "{text}");

    // ror eax, 3; ret
    let text = lift(&[0xC1, 0xC8, 0x03, 0xC3]);
    assert!(text.contains("eax = rotr(eax, 3);"), "{text}");
}

#[test]
fn one_operand_multiply_stays_pseudo() {
    // imul ebx; ret
    let text = lift(&[0xF7, 0xEB, 0xC3]);
    assert!(
        text.contains("__pseudo(RDX:RAX = RAX * ebx (signed));"),
        "{text}"
    );
}

#[test]
fn unsigned_divide_stays_pseudo() {
    // div ebx; ret
    let text = lift(&[0xF7, 0xF3, 0xC3]);
    assert!(
        text.contains("__pseudo(RAX = RDX:RAX / ebx; RDX = RDX:RAX % ebx (unsigned));"),
        "{text}"
    );
}

#[test]
fn zero_and_sign_extension_render_as_casts() {
    // movzx eax, bl; ret
    let text = lift(&[0x0F, 0xB6, 0xC3, 0xC3]);
    assert!(text.contains("eax = (uint32_t)(bl);"), "{text}");

    // movsxd rax, ebx; ret
    let text = lift(&[0x48, 0x63, 0xC3, 0xC3]);
    assert!(text.contains("rax = (int64_t)(ebx);"), "{text}");
}

#[test]
fn frame_locals_are_named_by_offset() {
    // push rbp; mov rbp, rsp; mov rax, [rbp-16]; ret
    let text = lift(&[0x55, 0x48, 0x89, 0xE5, 0x48, 0x8B, 0x45, 0xF0, 0xC3]);
    assert!(text.contains("uint64_t local_16;"), "{text}");
    assert!(text.contains("rax = local_16;"), "{text}");
}

#[test]
fn memset_call_shape_wins_over_the_synthetic_name() {
    // lea rcx, [rsp+0x20]; mov edx, 0; mov r8d, 0x40; call +0; ret
    let text = lift(&[
        0x48, 0x8D, 0x4C, 0x24, 0x20, // lea rcx, [rsp+0x20]
        0xBA, 0x00, 0x00, 0x00, 0x00, // mov edx, 0
        0x41, 0xB8, 0x40, 0x00, 0x00, 0x00, // mov r8d, 0x40
        0xE8, 0x00, 0x00, 0x00, 0x00, // call +0
        0xC3, // ret
    ]);
    assert!(text.contains("memset(p1, 0, 64);"), "{text}");
    assert!(!text.contains("sub_140000015("), "{text}");
}

#[test]
fn clobbered_pointer_register_disables_the_memset_shape() {
    // mov rcx, rax; mov edx, 0; call +0; ret — rcx no longer holds a
    // parameter or stack address.
    let text = lift(&[
        0x48, 0x89, 0xC1, // mov rcx, rax
        0xBA, 0x00, 0x00, 0x00, 0x00, // mov edx, 0
        0xE8, 0x00, 0x00, 0x00, 0x00, // call +0
        0xC3, // ret
    ]);
    assert!(!text.contains("memset"), "{text}");
    assert!(text.contains("ret = sub_14000000d("), "{text}");
}

#[test]
fn jrcxz_compares_the_count_register_to_zero() {
    // jrcxz +0; ret
    let text = lift(&[0xE3, 0x00, 0xC3]);
    assert!(text.contains("if (p1 == 0) goto L1;"), "{text}");
}

#[test]
fn cdq_is_listing_only() {
    // cdq; ret
    let text = lift(&[0x99, 0xC3]);
    assert!(text.contains("/* 0x140000000: cdq */"), "{text}");
    assert!(!text.contains("__pseudo"), "{text}");
}

#[test]
fn read_modify_write_through_memory() {
    // add [rax], ebx; ret
    let text = lift(&[0x01, 0x18, 0xC3]);
    assert!(
        text.contains("*((uint32_t*)(rax)) = *((uint32_t*)(rax)) + ebx;"),
        "{text}"
    );
}

#[test]
fn shift_by_cl_uses_the_aliased_count() {
    // shl rax, cl; ret
    let text = lift(&[0x48, 0xD3, 0xE0, 0xC3]);
    assert!(text.contains("rax = rax << p1;"), "{text}");
}

#[test]
fn indirect_jumps_degrade_to_pseudo() {
    // jmp rax; ret
    let text = lift(&[0xFF, 0xE0, 0xC3]);
    assert!(text.contains("__pseudo(goto rax);"), "{text}");
}

#[test]
fn stack_realignment_is_not_frame_management() {
    // and rsp, -16; ret — no prologue was recognized, so the write to
    // rsp is a real statement.
    let text = lift(&[0x48, 0x83, 0xE4, 0xF0, 0xC3]);
    assert!(text.contains("rsp = rsp & 0xfffffffffffffff0;"), "{text}");
}

#[test]
fn mid_function_stack_adjustment_survives() {
    // nop; sub rsp, 0x20; ret — not the opening instruction, so the
    // local-size detection never fires and the adjustment is kept.
    let text = lift(&[0x90, 0x48, 0x83, 0xEC, 0x20, 0xC3]);
    assert!(text.contains("rsp = rsp - 0x20;"), "{text}");
}

#[test]
fn negation_and_complement() {
    // neg eax; not ebx; ret
    let text = lift(&[0xF7, 0xD8, 0xF7, 0xD3, 0xC3]);
    assert!(text.contains("eax = -eax;"), "{text}");
    assert!(text.contains("ebx = ~ebx;"), "{text}");
}
