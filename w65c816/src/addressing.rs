//! Effective-address computation for all addressing modes.
//!
//! Each resolver reads its operand bytes from the code stream at PBR:PC,
//! advances PC past them, charges the mode's base cycle cost and returns the
//! 24-bit effective address. Immediate modes return the address of the
//! operand itself, so the operation handlers can stay oblivious to where
//! their data comes from.

use crate::{hi, join, join_bank, lo, Cpu, Mem, ADDR_MASK};

impl<M: Mem> Cpu<M> {
    /// "Absolute-a": (DBR, operand)
    pub(crate) fn am_absolute(&mut self) -> u32 {
        let ea = join_bank(self.dbr, self.mem.load16(join_bank(self.pbr, self.pc)));
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 2;
        ea
    }

    /// "Absolute Indexed with X-a,x": (DBR, operand) + X
    pub(crate) fn am_abs_indexed_x(&mut self) -> u32 {
        let base = join_bank(self.dbr, self.mem.load16(join_bank(self.pbr, self.pc)));
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 2;
        base.wrapping_add(u32::from(self.x)) & ADDR_MASK
    }

    /// "Absolute Indexed with Y-a,y": (DBR, operand) + Y
    pub(crate) fn am_abs_indexed_y(&mut self) -> u32 {
        let base = join_bank(self.dbr, self.mem.load16(join_bank(self.pbr, self.pc)));
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 2;
        base.wrapping_add(u32::from(self.y)) & ADDR_MASK
    }

    /// "Absolute Indirect-(a)": the pointer lives in bank 0
    pub(crate) fn am_absolute_indirect(&mut self) -> u32 {
        let ia = u32::from(self.mem.load16(join_bank(self.pbr, self.pc)));
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 4;
        u32::from(self.mem.load16(ia))
    }

    /// "Absolute Indexed Indirect-(a,x)": the pointer lives in the program bank
    pub(crate) fn am_abs_indexed_indirect(&mut self) -> u32 {
        let ia = join_bank(self.pbr, self.mem.load16(join_bank(self.pbr, self.pc)))
            .wrapping_add(u32::from(self.x))
            & ADDR_MASK;
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 4;
        join_bank(self.pbr, self.mem.load16(ia))
    }

    /// "Absolute Long->a": full 24-bit operand
    pub(crate) fn am_absolute_long(&mut self) -> u32 {
        let ea = self.mem.load24(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(3);
        self.cycles += 3;
        ea
    }

    /// "Absolute Long Indexed->a,x"
    pub(crate) fn am_abs_long_indexed_x(&mut self) -> u32 {
        let ea = self.mem.load24(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(3);
        self.cycles += 3;
        ea.wrapping_add(u32::from(self.x)) & ADDR_MASK
    }

    /// "Absolute Indirect Long-[a]": 24-bit pointer in bank 0
    pub(crate) fn am_abs_indirect_long(&mut self) -> u32 {
        let ia = u32::from(self.mem.load16(join_bank(self.pbr, self.pc)));
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 5;
        self.mem.load24(ia)
    }

    /// "Direct-d": D + offset, wrapping inside bank 0
    pub(crate) fn am_direct(&mut self) -> u32 {
        let offset = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 1;
        u32::from(self.dp.wrapping_add(u16::from(offset)))
    }

    /// "Direct Indexed with X-d,x": the offset+X sum wraps at 8 bits
    pub(crate) fn am_direct_indexed_x(&mut self) -> u32 {
        let offset = self.mem.load8(join_bank(self.pbr, self.pc)).wrapping_add(lo(self.x));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 1;
        u32::from(self.dp.wrapping_add(u16::from(offset)))
    }

    /// "Direct Indexed with Y-d,y"
    pub(crate) fn am_direct_indexed_y(&mut self) -> u32 {
        let offset = self.mem.load8(join_bank(self.pbr, self.pc)).wrapping_add(lo(self.y));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 1;
        u32::from(self.dp.wrapping_add(u16::from(offset)))
    }

    /// "Direct Indirect-(d)": pointer in bank 0, data in the data bank
    pub(crate) fn am_direct_indirect(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 3;
        let ptr = u32::from(self.dp.wrapping_add(u16::from(disp)));
        join_bank(self.dbr, self.mem.load16(ptr))
    }

    /// "Direct Indexed Indirect-(d,x)": X (full width) is added to the pointer
    pub(crate) fn am_direct_indexed_indirect(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 3;
        let ptr = u32::from(self.dp.wrapping_add(u16::from(disp)).wrapping_add(self.x));
        join_bank(self.dbr, self.mem.load16(ptr))
    }

    /// "Direct Indirect Indexed-(d),y": the indirect word is read first, then
    /// Y is added with the carry spilling into the bank bits.
    pub(crate) fn am_direct_indirect_indexed(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 3;
        let ptr = u32::from(self.dp.wrapping_add(u16::from(disp)));
        let base = join_bank(self.dbr, self.mem.load16(ptr));
        base.wrapping_add(u32::from(self.y)) & ADDR_MASK
    }

    /// "Direct Indirect Long-[d]": 24-bit pointer in bank 0
    pub(crate) fn am_direct_indirect_long(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 4;
        let ptr = u32::from(self.dp.wrapping_add(u16::from(disp)));
        self.mem.load24(ptr)
    }

    /// "Direct Indirect Long Indexed-[d],y"
    pub(crate) fn am_direct_indirect_long_idx(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 4;
        let ptr = u32::from(self.dp.wrapping_add(u16::from(disp)));
        let base = self.mem.load24(ptr);
        base.wrapping_add(u32::from(self.y)) & ADDR_MASK
    }

    /// Immediate byte: the operand itself is the addressed datum
    pub(crate) fn am_immediate8(&mut self) -> u32 {
        let ea = join_bank(self.pbr, self.pc);
        self.pc = self.pc.wrapping_add(1);
        ea
    }

    /// Immediate word
    pub(crate) fn am_immediate16(&mut self) -> u32 {
        let ea = join_bank(self.pbr, self.pc);
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 1;
        ea
    }

    /// Immediate sized by the accumulator width (M flag)
    pub(crate) fn am_immediate_acc(&mut self) -> u32 {
        let ea = join_bank(self.pbr, self.pc);
        let size = if self.e || self.p.small_acc() { 1 } else { 2 };
        self.pc = self.pc.wrapping_add(size);
        self.cycles += u64::from(size) - 1;
        ea
    }

    /// Immediate sized by the index register width (X flag)
    pub(crate) fn am_immediate_index(&mut self) -> u32 {
        let ea = join_bank(self.pbr, self.pc);
        let size = if self.e || self.p.small_index() { 1 } else { 2 };
        self.pc = self.pc.wrapping_add(size);
        self.cycles += u64::from(size) - 1;
        ea
    }

    /// "Program Counter Relative-r": signed 8-bit displacement off the
    /// post-operand PC, wrapping inside the program bank. The branch ops
    /// carry the whole cycle cost for this mode.
    pub(crate) fn am_pc_rel(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc)) as i8;
        self.pc = self.pc.wrapping_add(1);
        join_bank(self.pbr, self.pc.wrapping_add(disp as u16))
    }

    /// "PC Relative Long-r": signed 16-bit displacement
    pub(crate) fn am_pc_rel_long(&mut self) -> u32 {
        let disp = self.mem.load16(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(2);
        self.cycles += 2;
        join_bank(self.pbr, self.pc.wrapping_add(disp))
    }

    /// "Stack Relative-d,s": unsigned displacement off SP in bank 0. In
    /// emulation mode the sum stays inside the stack page.
    pub(crate) fn am_stack_rel(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 1;
        if self.e {
            u32::from(join(lo(self.sp).wrapping_add(disp), hi(self.sp)))
        } else {
            u32::from(self.sp.wrapping_add(u16::from(disp)))
        }
    }

    /// "Stack Relative Indirect Indexed-(d,s),y"
    pub(crate) fn am_stack_rel_indirect_idx(&mut self) -> u32 {
        let disp = self.mem.load8(join_bank(self.pbr, self.pc));
        self.pc = self.pc.wrapping_add(1);
        self.cycles += 3;
        let ia = if self.e {
            u32::from(join(lo(self.sp).wrapping_add(disp), hi(self.sp)))
        } else {
            u32::from(self.sp.wrapping_add(u16::from(disp)))
        };
        let base = join_bank(self.dbr, self.mem.load16(ia));
        base.wrapping_add(u32::from(self.y)) & ADDR_MASK
    }
}

#[cfg(test)]
mod tests {
    use crate::{Cpu, Mem, Memory};

    /// CPU parked at $8000 with nothing but the RESET vector set up.
    fn make_cpu() -> Cpu<Memory<'static>> {
        let mut mem = Memory::new(0xff_ffff, 0x2_0000, None);
        mem.store16(0xfffc, 0x8000);
        Cpu::new(mem)
    }

    #[test]
    fn direct_page_wraps_inside_bank_zero() {
        let mut cpu = make_cpu();
        cpu.dp = 0xfff0;
        cpu.mem.store8(0x8000, 0x20);
        assert_eq!(cpu.am_direct(), 0x0010);
        assert_eq!(cpu.pc, 0x8001);
    }

    #[test]
    fn direct_indexed_offset_wraps_at_8_bits() {
        let mut cpu = make_cpu();
        cpu.dp = 0x1000;
        cpu.x = 0x00f0;
        cpu.mem.store8(0x8000, 0x20);
        assert_eq!(cpu.am_direct_indexed_x(), 0x1010);
    }

    #[test]
    fn stack_relative_stays_in_page_one_while_emulating() {
        let mut cpu = make_cpu();
        cpu.sp = 0x01f0;
        cpu.mem.store8(0x8000, 0x20);
        assert_eq!(cpu.am_stack_rel(), 0x0110);
    }

    #[test]
    fn stack_relative_uses_full_pointer_in_native_mode() {
        let mut cpu = make_cpu();
        cpu.e = false;
        cpu.sp = 0x01f0;
        cpu.mem.store8(0x8000, 0x20);
        assert_eq!(cpu.am_stack_rel(), 0x0210);
    }

    #[test]
    fn indirect_indexed_carries_into_the_bank() {
        let mut cpu = make_cpu();
        cpu.dbr = 0x12;
        cpu.y = 0x0002;
        cpu.mem.store8(0x8000, 0x10);
        cpu.mem.store16(0x0010, 0xffff);
        assert_eq!(cpu.am_direct_indirect_indexed(), 0x13_0001);
    }

    #[test]
    fn absolute_indexed_wraps_at_24_bits() {
        let mut cpu = make_cpu();
        cpu.dbr = 0xff;
        cpu.x = 0x0002;
        cpu.mem.store16(0x8000, 0xffff);
        assert_eq!(cpu.am_abs_indexed_x(), 0x00_0001);
    }

    #[test]
    fn immediate_size_follows_the_m_flag() {
        let mut cpu = make_cpu();
        assert_eq!(cpu.am_immediate_acc(), 0x8000);
        assert_eq!(cpu.pc, 0x8001);

        let mut cpu = make_cpu();
        cpu.e = false;
        cpu.p.set_small_acc(false);
        assert_eq!(cpu.am_immediate_acc(), 0x8000);
        assert_eq!(cpu.pc, 0x8002);
    }

    #[test]
    fn relative_branches_sign_extend() {
        let mut cpu = make_cpu();
        cpu.mem.store8(0x8000, 0xfe);
        assert_eq!(cpu.am_pc_rel(), 0x7fff);

        let mut cpu = make_cpu();
        cpu.mem.store8(0x8000, 0x10);
        assert_eq!(cpu.am_pc_rel(), 0x8011);
    }
}
