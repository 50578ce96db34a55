//! Algebraic properties of the primitive helpers, the bus and the stack.

use proptest::prelude::*;

use w65c816::{hi, join, join_bank, lo, swap, Cpu, Mem, Memory};

fn boot(program: &[u8]) -> Cpu<Memory<'static>> {
    let mut mem = Memory::new(0xff_ffff, 0x1_0000, None);
    for (i, &b) in program.iter().enumerate() {
        mem.store8(0x0400 + i as u32, b);
    }
    mem.store16(0xfffc, 0x0400);
    Cpu::new(mem)
}

proptest! {
    #[test]
    fn split_and_join_roundtrip(w in any::<u16>()) {
        prop_assert_eq!(join(lo(w), hi(w)), w);
    }

    #[test]
    fn swap_is_an_involution(w in any::<u16>()) {
        prop_assert_eq!(swap(swap(w)), w);
        prop_assert_eq!(lo(swap(w)), hi(w));
    }

    #[test]
    fn bank_join_splits_back(b in any::<u8>(), offset in any::<u16>()) {
        let ea = join_bank(b, offset);
        prop_assert_eq!((ea >> 16) as u8, b);
        prop_assert_eq!(ea as u16, offset);
    }

    #[test]
    fn ram_byte_roundtrip(addr in 0u32..0x1_0000, v in any::<u8>()) {
        let mut mem = Memory::new(0xff_ffff, 0x1_0000, None);
        mem.store8(addr, v);
        prop_assert_eq!(mem.load8(addr), v);
    }

    #[test]
    fn ram_word_roundtrip(addr in 0u32..0xffff, v in any::<u16>()) {
        let mut mem = Memory::new(0xff_ffff, 0x1_0000, None);
        mem.store16(addr, v);
        prop_assert_eq!(mem.load16(addr), v);
        prop_assert_eq!(mem.load8(addr), lo(v));
        prop_assert_eq!(mem.load8(addr + 1), hi(v));
    }

    #[test]
    fn rom_region_ignores_stores(addr in 0x100u32..0x1000, v in any::<u8>()) {
        let rom = [0u8; 0xf00];
        let mut mem = Memory::new(0xff_ffff, 0x100, Some(&rom));
        mem.store8(addr, v);
        prop_assert_eq!(mem.load8(addr), 0);
    }

    #[test]
    fn push_pull_restores_accumulator(v in any::<u8>()) {
        // lda #v / pha / lda #$00 / pla / stp
        let mut cpu = boot(&[0xa9, v, 0x48, 0xa9, 0x00, 0x68, 0xdb]);
        cpu.run();

        prop_assert_eq!(lo(cpu.a), v);
        prop_assert_eq!(cpu.sp, 0x0100);
        prop_assert_eq!(cpu.p.zero(), v == 0);
        prop_assert_eq!(cpu.p.negative(), v & 0x80 != 0);
    }

    #[test]
    fn binary_adc_matches_wrapping_add(a in any::<u8>(), b in any::<u8>()) {
        // lda #a / adc #b / stp, starting with C clear
        let mut cpu = boot(&[0xa9, a, 0x69, b, 0xdb]);
        cpu.run();

        let wide = u16::from(a) + u16::from(b);
        prop_assert_eq!(lo(cpu.a), a.wrapping_add(b));
        prop_assert_eq!(cpu.p.carry(), wide > 0xff);
        prop_assert_eq!(cpu.p.zero(), a.wrapping_add(b) == 0);
    }

    #[test]
    fn sbc_with_carry_set_is_wrapping_sub(a in any::<u8>(), b in any::<u8>()) {
        // sec / lda #a / sbc #b / stp
        let mut cpu = boot(&[0x38, 0xa9, a, 0xe9, b, 0xdb]);
        cpu.run();

        prop_assert_eq!(lo(cpu.a), a.wrapping_sub(b));
        prop_assert_eq!(cpu.p.carry(), a >= b);
    }

    #[test]
    fn cycles_never_decrease(ops in proptest::collection::vec(any::<u8>(), 1..32)) {
        let mut cpu = boot(&ops);
        let mut last = cpu.cycles();
        for _ in 0..ops.len() {
            cpu.step();
            prop_assert!(cpu.cycles() >= last);
            last = cpu.cycles();
        }
    }
}
