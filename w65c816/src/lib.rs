//! WDC 65C816 emulator core.
//!
//! The interpreter is a classic fetch-decode-execute loop: `step` fetches the
//! opcode at PBR:PC and dispatches it to a pair of an addressing-mode
//! resolver (which consumes operand bytes and yields a 24-bit effective
//! address) and an operation handler (whose width depends on the current
//! M/X flags and the E bit). Memory is reached through the [`Mem`] trait;
//! [`Memory`] provides the standard masked RAM/ROM map.

#[macro_use]
extern crate log;

mod addressing;
mod memory;
mod pins;
mod statusreg;

pub use self::memory::Memory;
pub use self::pins::Pins;
pub use self::statusreg::StatusReg;

/// All effective addresses live in a 16 MiB space.
pub const ADDR_MASK: u32 = 0x00ff_ffff;

// Emulation mode vectors
const IRQ_VEC8: u32 = 0xfffe;
const RESET_VEC: u32 = 0xfffc;
const NMI_VEC8: u32 = 0xfffa;
#[allow(dead_code)]
const ABORT_VEC8: u32 = 0xfff8;
const COP_VEC8: u32 = 0xfff4;
/// Shared with the IRQ vector in emulation mode.
const BRK_VEC8: u32 = IRQ_VEC8;

// Native mode vectors
const IRQ_VEC16: u32 = 0xffee;
const NMI_VEC16: u32 = 0xffea;
#[allow(dead_code)]
const ABORT_VEC16: u32 = 0xffe8;
const BRK_VEC16: u32 = 0xffe6;
const COP_VEC16: u32 = 0xffe4;

/// Returns the low byte of a word.
pub fn lo(value: u16) -> u8 {
    value as u8
}

/// Returns the high byte of a word.
pub fn hi(value: u16) -> u8 {
    (value >> 8) as u8
}

/// Combines two bytes into a word.
pub fn join(l: u8, h: u8) -> u16 {
    u16::from(l) | (u16::from(h) << 8)
}

/// Shifts a bank number into address position.
pub fn bank(b: u8) -> u32 {
    u32::from(b) << 16
}

/// Combines a bank and a 16-bit offset into a 24-bit address.
pub fn join_bank(b: u8, offset: u16) -> u32 {
    bank(b) | u32::from(offset)
}

/// Swaps the high and low bytes of a word.
pub fn swap(value: u16) -> u16 {
    (value >> 8) | (value << 8)
}

/// Trait for devices attached to the 65816's 24-bit address/data bus.
///
/// Only byte transfers are required; the word and long accessors are derived
/// from them, treating the address space as flat with wraparound at 2^24.
/// (Addressing modes that wrap at 16 bits do so before the bus is reached.)
pub trait Mem {
    fn load8(&mut self, ea: u32) -> u8;
    fn store8(&mut self, ea: u32, value: u8);

    /// Little-endian word read.
    fn load16(&mut self, ea: u32) -> u16 {
        let l = self.load8(ea);
        let h = self.load8(ea.wrapping_add(1) & ADDR_MASK);
        join(l, h)
    }

    /// Little-endian 24-bit read.
    fn load24(&mut self, ea: u32) -> u32 {
        let w = self.load16(ea);
        let b = self.load8(ea.wrapping_add(2) & ADDR_MASK);
        join_bank(b, w)
    }

    /// Little-endian word write.
    fn store16(&mut self, ea: u32, value: u16) {
        self.store8(ea, lo(value));
        self.store8(ea.wrapping_add(1) & ADDR_MASK, hi(value));
    }
}

/// Host hook invoked by the `WDM` opcode.
///
/// Receives the CPU and the operand byte. The runner uses this for console
/// I/O and for the conventional `WDM #$FF` halt.
pub type WdmHook<M> = Box<dyn FnMut(&mut Cpu<M>, u8)>;

pub struct Cpu<M: Mem> {
    /// Accumulator. In 8-bit mode (M=1) operations touch only the low byte.
    pub a: u16,
    pub x: u16,
    pub y: u16,
    /// Stack pointer. Pinned to page 1 while in emulation mode.
    pub sp: u16,
    /// Direct page register: base of the zero-page-like window in bank 0.
    pub dp: u16,
    /// Program counter. PBR is not changed on PC overflow, so code cannot
    /// span banks without `jml`/`jsl`.
    pub pc: u16,
    /// Program bank register.
    pub pbr: u8,
    /// Data bank register, the default bank for absolute addressing.
    pub dbr: u8,
    pub p: StatusReg,
    e: bool,

    stopped: bool,
    /// Set when an interrupt is taken; `wai` consumes it to resume.
    interrupted: bool,
    cycles: u64,
    pins: Pins,
    wdm: Option<WdmHook<M>>,

    /// Log one `trace!` line per instruction when enabled.
    pub trace: bool,
    pub mem: M,
}

impl<M: Mem> Cpu<M> {
    /// Creates a new CPU and executes a reset, fetching the entry point from
    /// the RESET vector.
    pub fn new(mem: M) -> Cpu<M> {
        let mut cpu = Cpu {
            a: 0,
            x: 0,
            y: 0,
            sp: 0x0100,
            dp: 0,
            pc: 0,
            pbr: 0,
            dbr: 0,
            p: StatusReg(0x34),
            e: true,
            stopped: false,
            interrupted: false,
            cycles: 0,
            pins: Pins::new(),
            wdm: None,
            trace: false,
            mem,
        };
        cpu.reset();
        cpu
    }

    /// Puts the processor back into its power-on state: emulation mode,
    /// 8-bit registers, IRQs masked, stack in page 1, PC from the RESET
    /// vector. The cycle counter is left alone.
    pub fn reset(&mut self) {
        self.e = true;
        self.pbr = 0;
        self.dbr = 0;
        self.dp = 0;
        self.sp = 0x0100;
        self.p = StatusReg(0x34);
        self.x &= 0xff;
        self.y &= 0xff;
        self.pc = self.mem.load16(RESET_VEC);
        self.stopped = false;
        self.interrupted = false;
    }

    /// Clonable handle to the NMI/IRQ/RESET request lines.
    pub fn pins(&self) -> Pins {
        self.pins.clone()
    }

    /// Installs the host hook invoked by `WDM`. Without a hook, `WDM #$FF`
    /// stops the processor and every other operand is a no-op.
    pub fn set_wdm_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Cpu<M>, u8) + 'static,
    {
        self.wdm = Some(Box::new(hook));
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn emulation(&self) -> bool {
        self.e
    }

    /// Runs instructions until the processor is stopped (via `stp`,
    /// `wdm #$ff` or [`Cpu::stop`] from a hook).
    pub fn run(&mut self) {
        while !self.stopped {
            self.step();
        }
    }

    /// Services pending interrupt requests, then executes one instruction.
    ///
    /// A self-rewinding instruction (`mvn`/`mvp`/`wai`/`stp`) still counts as
    /// one call; block moves transfer exactly one byte per step so that
    /// interrupts can preempt a long move.
    pub fn step(&mut self) {
        if self.pins.take_reset() {
            self.reset();
            return;
        }
        if self.pins.take_nmi() {
            let vector = if self.e { NMI_VEC8 } else { NMI_VEC16 };
            self.interrupt(vector);
        } else if !self.p.irq_disable() && self.pins.take_irq() {
            let vector = if self.e { IRQ_VEC8 } else { IRQ_VEC16 };
            self.interrupt(vector);
        }

        let pc = self.pc;
        let op = self.mem.load8(join_bank(self.pbr, pc));
        self.pc = self.pc.wrapping_add(1);

        macro_rules! instr {
            ( $name:ident ) => {{
                self.trace_op(pc, op, stringify!($name));
                self.$name()
            }};
            ( $name:ident, $am:ident ) => {{
                self.trace_op(pc, op, stringify!($name));
                let ea = self.$am();
                self.$name(ea)
            }};
        }

        match op {
            0x00 => instr!(brk, am_immediate8),
            0x01 => instr!(ora, am_direct_indexed_indirect),
            0x02 => instr!(cop, am_immediate8),
            0x03 => instr!(ora, am_stack_rel),
            0x04 => instr!(tsb, am_direct),
            0x05 => instr!(ora, am_direct),
            0x06 => instr!(asl, am_direct),
            0x07 => instr!(ora, am_direct_indirect_long),
            0x08 => instr!(php),
            0x09 => instr!(ora, am_immediate_acc),
            0x0a => instr!(asl_a),
            0x0b => instr!(phd),
            0x0c => instr!(tsb, am_absolute),
            0x0d => instr!(ora, am_absolute),
            0x0e => instr!(asl, am_absolute),
            0x0f => instr!(ora, am_absolute_long),

            0x10 => instr!(bpl, am_pc_rel),
            0x11 => instr!(ora, am_direct_indirect_indexed),
            0x12 => instr!(ora, am_direct_indirect),
            0x13 => instr!(ora, am_stack_rel_indirect_idx),
            0x14 => instr!(trb, am_direct),
            0x15 => instr!(ora, am_direct_indexed_x),
            0x16 => instr!(asl, am_direct_indexed_x),
            0x17 => instr!(ora, am_direct_indirect_long_idx),
            0x18 => instr!(clc),
            0x19 => instr!(ora, am_abs_indexed_y),
            0x1a => instr!(ina),
            0x1b => instr!(tcs),
            0x1c => instr!(trb, am_absolute),
            0x1d => instr!(ora, am_abs_indexed_x),
            0x1e => instr!(asl, am_abs_indexed_x),
            0x1f => instr!(ora, am_abs_long_indexed_x),

            0x20 => instr!(jsr, am_absolute),
            0x21 => instr!(and, am_direct_indexed_indirect),
            0x22 => instr!(jsl, am_absolute_long),
            0x23 => instr!(and, am_stack_rel),
            0x24 => instr!(bit, am_direct),
            0x25 => instr!(and, am_direct),
            0x26 => instr!(rol, am_direct),
            0x27 => instr!(and, am_direct_indirect_long),
            0x28 => instr!(plp),
            0x29 => instr!(and, am_immediate_acc),
            0x2a => instr!(rol_a),
            0x2b => instr!(pld),
            0x2c => instr!(bit, am_absolute),
            0x2d => instr!(and, am_absolute),
            0x2e => instr!(rol, am_absolute),
            0x2f => instr!(and, am_absolute_long),

            0x30 => instr!(bmi, am_pc_rel),
            0x31 => instr!(and, am_direct_indirect_indexed),
            0x32 => instr!(and, am_direct_indirect),
            0x33 => instr!(and, am_stack_rel_indirect_idx),
            0x34 => instr!(bit, am_direct_indexed_x),
            0x35 => instr!(and, am_direct_indexed_x),
            0x36 => instr!(rol, am_direct_indexed_x),
            0x37 => instr!(and, am_direct_indirect_long_idx),
            0x38 => instr!(sec),
            0x39 => instr!(and, am_abs_indexed_y),
            0x3a => instr!(dea),
            0x3b => instr!(tsc),
            0x3c => instr!(bit, am_abs_indexed_x),
            0x3d => instr!(and, am_abs_indexed_x),
            0x3e => instr!(rol, am_abs_indexed_x),
            0x3f => instr!(and, am_abs_long_indexed_x),

            0x40 => instr!(rti),
            0x41 => instr!(eor, am_direct_indexed_indirect),
            0x42 => instr!(wdm, am_immediate8),
            0x43 => instr!(eor, am_stack_rel),
            0x44 => instr!(mvp, am_immediate16),
            0x45 => instr!(eor, am_direct),
            0x46 => instr!(lsr, am_direct),
            0x47 => instr!(eor, am_direct_indirect_long),
            0x48 => instr!(pha),
            0x49 => instr!(eor, am_immediate_acc),
            0x4a => instr!(lsr_a),
            0x4b => instr!(phk),
            0x4c => instr!(jmp, am_absolute),
            0x4d => instr!(eor, am_absolute),
            0x4e => instr!(lsr, am_absolute),
            0x4f => instr!(eor, am_absolute_long),

            0x50 => instr!(bvc, am_pc_rel),
            0x51 => instr!(eor, am_direct_indirect_indexed),
            0x52 => instr!(eor, am_direct_indirect),
            0x53 => instr!(eor, am_stack_rel_indirect_idx),
            0x54 => instr!(mvn, am_immediate16),
            0x55 => instr!(eor, am_direct_indexed_x),
            0x56 => instr!(lsr, am_direct_indexed_x),
            0x57 => instr!(eor, am_direct_indirect_long_idx),
            0x58 => instr!(cli),
            0x59 => instr!(eor, am_abs_indexed_y),
            0x5a => instr!(phy),
            0x5b => instr!(tcd),
            0x5c => instr!(jml, am_absolute_long),
            0x5d => instr!(eor, am_abs_indexed_x),
            0x5e => instr!(lsr, am_abs_indexed_x),
            0x5f => instr!(eor, am_abs_long_indexed_x),

            0x60 => instr!(rts),
            0x61 => instr!(adc, am_direct_indexed_indirect),
            0x62 => instr!(per, am_pc_rel_long),
            0x63 => instr!(adc, am_stack_rel),
            0x64 => instr!(stz, am_direct),
            0x65 => instr!(adc, am_direct),
            0x66 => instr!(ror, am_direct),
            0x67 => instr!(adc, am_direct_indirect_long),
            0x68 => instr!(pla),
            0x69 => instr!(adc, am_immediate_acc),
            0x6a => instr!(ror_a),
            0x6b => instr!(rtl),
            0x6c => instr!(jmp, am_absolute_indirect),
            0x6d => instr!(adc, am_absolute),
            0x6e => instr!(ror, am_absolute),
            0x6f => instr!(adc, am_absolute_long),

            0x70 => instr!(bvs, am_pc_rel),
            0x71 => instr!(adc, am_direct_indirect_indexed),
            0x72 => instr!(adc, am_direct_indirect),
            0x73 => instr!(adc, am_stack_rel_indirect_idx),
            0x74 => instr!(stz, am_direct_indexed_x),
            0x75 => instr!(adc, am_direct_indexed_x),
            0x76 => instr!(ror, am_direct_indexed_x),
            0x77 => instr!(adc, am_direct_indirect_long_idx),
            0x78 => instr!(sei),
            0x79 => instr!(adc, am_abs_indexed_y),
            0x7a => instr!(ply),
            0x7b => instr!(tdc),
            0x7c => instr!(jmp, am_abs_indexed_indirect),
            0x7d => instr!(adc, am_abs_indexed_x),
            0x7e => instr!(ror, am_abs_indexed_x),
            0x7f => instr!(adc, am_abs_long_indexed_x),

            0x80 => instr!(bra, am_pc_rel),
            0x81 => instr!(sta, am_direct_indexed_indirect),
            0x82 => instr!(brl, am_pc_rel_long),
            0x83 => instr!(sta, am_stack_rel),
            0x84 => instr!(sty, am_direct),
            0x85 => instr!(sta, am_direct),
            0x86 => instr!(stx, am_direct),
            0x87 => instr!(sta, am_direct_indirect_long),
            0x88 => instr!(dey),
            0x89 => instr!(bit_imm, am_immediate_acc),
            0x8a => instr!(txa),
            0x8b => instr!(phb),
            0x8c => instr!(sty, am_absolute),
            0x8d => instr!(sta, am_absolute),
            0x8e => instr!(stx, am_absolute),
            0x8f => instr!(sta, am_absolute_long),

            0x90 => instr!(bcc, am_pc_rel),
            0x91 => instr!(sta, am_direct_indirect_indexed),
            0x92 => instr!(sta, am_direct_indirect),
            0x93 => instr!(sta, am_stack_rel_indirect_idx),
            0x94 => instr!(sty, am_direct_indexed_x),
            0x95 => instr!(sta, am_direct_indexed_x),
            0x96 => instr!(stx, am_direct_indexed_y),
            0x97 => instr!(sta, am_direct_indirect_long_idx),
            0x98 => instr!(tya),
            0x99 => instr!(sta, am_abs_indexed_y),
            0x9a => instr!(txs),
            0x9b => instr!(txy),
            0x9c => instr!(stz, am_absolute),
            0x9d => instr!(sta, am_abs_indexed_x),
            0x9e => instr!(stz, am_abs_indexed_x),
            0x9f => instr!(sta, am_abs_long_indexed_x),

            0xa0 => instr!(ldy, am_immediate_index),
            0xa1 => instr!(lda, am_direct_indexed_indirect),
            0xa2 => instr!(ldx, am_immediate_index),
            0xa3 => instr!(lda, am_stack_rel),
            0xa4 => instr!(ldy, am_direct),
            0xa5 => instr!(lda, am_direct),
            0xa6 => instr!(ldx, am_direct),
            0xa7 => instr!(lda, am_direct_indirect_long),
            0xa8 => instr!(tay),
            0xa9 => instr!(lda, am_immediate_acc),
            0xaa => instr!(tax),
            0xab => instr!(plb),
            0xac => instr!(ldy, am_absolute),
            0xad => instr!(lda, am_absolute),
            0xae => instr!(ldx, am_absolute),
            0xaf => instr!(lda, am_absolute_long),

            0xb0 => instr!(bcs, am_pc_rel),
            0xb1 => instr!(lda, am_direct_indirect_indexed),
            0xb2 => instr!(lda, am_direct_indirect),
            0xb3 => instr!(lda, am_stack_rel_indirect_idx),
            0xb4 => instr!(ldy, am_direct_indexed_x),
            0xb5 => instr!(lda, am_direct_indexed_x),
            0xb6 => instr!(ldx, am_direct_indexed_y),
            0xb7 => instr!(lda, am_direct_indirect_long_idx),
            0xb8 => instr!(clv),
            0xb9 => instr!(lda, am_abs_indexed_y),
            0xba => instr!(tsx),
            0xbb => instr!(tyx),
            0xbc => instr!(ldy, am_abs_indexed_x),
            0xbd => instr!(lda, am_abs_indexed_x),
            0xbe => instr!(ldx, am_abs_indexed_y),
            0xbf => instr!(lda, am_abs_long_indexed_x),

            0xc0 => instr!(cpy, am_immediate_index),
            0xc1 => instr!(cmp, am_direct_indexed_indirect),
            0xc2 => instr!(rep, am_immediate8),
            0xc3 => instr!(cmp, am_stack_rel),
            0xc4 => instr!(cpy, am_direct),
            0xc5 => instr!(cmp, am_direct),
            0xc6 => instr!(dec, am_direct),
            0xc7 => instr!(cmp, am_direct_indirect_long),
            0xc8 => instr!(iny),
            0xc9 => instr!(cmp, am_immediate_acc),
            0xca => instr!(dex),
            0xcb => instr!(wai),
            0xcc => instr!(cpy, am_absolute),
            0xcd => instr!(cmp, am_absolute),
            0xce => instr!(dec, am_absolute),
            0xcf => instr!(cmp, am_absolute_long),

            0xd0 => instr!(bne, am_pc_rel),
            0xd1 => instr!(cmp, am_direct_indirect_indexed),
            0xd2 => instr!(cmp, am_direct_indirect),
            0xd3 => instr!(cmp, am_stack_rel_indirect_idx),
            0xd4 => instr!(pei, am_direct),
            0xd5 => instr!(cmp, am_direct_indexed_x),
            0xd6 => instr!(dec, am_direct_indexed_x),
            0xd7 => instr!(cmp, am_direct_indirect_long_idx),
            0xd8 => instr!(cld),
            0xd9 => instr!(cmp, am_abs_indexed_y),
            0xda => instr!(phx),
            0xdb => instr!(stp),
            0xdc => instr!(jml, am_abs_indirect_long),
            0xdd => instr!(cmp, am_abs_indexed_x),
            0xde => instr!(dec, am_abs_indexed_x),
            0xdf => instr!(cmp, am_abs_long_indexed_x),

            0xe0 => instr!(cpx, am_immediate_index),
            0xe1 => instr!(sbc, am_direct_indexed_indirect),
            0xe2 => instr!(sep, am_immediate8),
            0xe3 => instr!(sbc, am_stack_rel),
            0xe4 => instr!(cpx, am_direct),
            0xe5 => instr!(sbc, am_direct),
            0xe6 => instr!(inc, am_direct),
            0xe7 => instr!(sbc, am_direct_indirect_long),
            0xe8 => instr!(inx),
            0xe9 => instr!(sbc, am_immediate_acc),
            0xea => instr!(nop),
            0xeb => instr!(xba),
            0xec => instr!(cpx, am_absolute),
            0xed => instr!(sbc, am_absolute),
            0xee => instr!(inc, am_absolute),
            0xef => instr!(sbc, am_absolute_long),

            0xf0 => instr!(beq, am_pc_rel),
            0xf1 => instr!(sbc, am_direct_indirect_indexed),
            0xf2 => instr!(sbc, am_direct_indirect),
            0xf3 => instr!(sbc, am_stack_rel_indirect_idx),
            0xf4 => instr!(pea, am_immediate16),
            0xf5 => instr!(sbc, am_direct_indexed_x),
            0xf6 => instr!(inc, am_direct_indexed_x),
            0xf7 => instr!(sbc, am_direct_indirect_long_idx),
            0xf8 => instr!(sed),
            0xf9 => instr!(sbc, am_abs_indexed_y),
            0xfa => instr!(plx),
            0xfb => instr!(xce),
            0xfc => instr!(jsr, am_abs_indexed_indirect),
            0xfd => instr!(sbc, am_abs_indexed_x),
            0xfe => instr!(inc, am_abs_indexed_x),
            0xff => instr!(sbc, am_abs_long_indexed_x),
        }
    }

    fn trace_op(&self, pc: u16, raw: u8, op: &str) {
        if !log_enabled!(log::Level::Trace) || !self.trace {
            return;
        }
        trace!(
            "{:02X}:{:04X} {:02X}  {:5} a:{:04X} x:{:04X} y:{:04X} sp:{:04X} dp:{:04X} dbr:{:02X} e:{} {}",
            self.pbr,
            pc,
            raw,
            op,
            self.a,
            self.x,
            self.y,
            self.sp,
            self.dp,
            self.dbr,
            self.e as u8,
            self.p,
        );
    }

    /// Pushes a byte and decrements the stack pointer. In emulation mode the
    /// pointer wraps within page 1.
    fn push8(&mut self, value: u8) {
        let sp = self.sp;
        self.mem.store8(u32::from(sp), value);
        if self.e {
            self.sp = 0x0100 | u16::from(lo(sp).wrapping_sub(1));
        } else {
            self.sp = sp.wrapping_sub(1);
        }
    }

    fn push16(&mut self, value: u16) {
        self.push8(hi(value));
        self.push8(lo(value));
    }

    fn pull8(&mut self) -> u8 {
        if self.e {
            self.sp = 0x0100 | u16::from(lo(self.sp).wrapping_add(1));
        } else {
            self.sp = self.sp.wrapping_add(1);
        }
        self.mem.load8(u32::from(self.sp))
    }

    fn pull16(&mut self) -> u16 {
        let l = self.pull8();
        let h = self.pull8();
        join(l, h)
    }

    /// Replaces P, keeping the architectural invariants: emulation mode
    /// forces M and X on, and whenever X is on the index register high bytes
    /// are zero.
    fn set_p(&mut self, value: u8) {
        self.p = StatusReg(if self.e { value | 0x30 } else { value });
        if self.p.small_index() {
            self.x &= 0xff;
            self.y &= 0xff;
        }
    }

    /// NMI/IRQ entry: pushes PBR (native mode only), PC and P, masks IRQs,
    /// leaves decimal mode and jumps through the vector in bank 0.
    fn interrupt(&mut self, vector: u32) {
        if !self.e {
            let pbr = self.pbr;
            self.push8(pbr);
        }
        let pc = self.pc;
        self.push16(pc);
        let p = self.p.0;
        self.push8(p);

        self.p.set_irq_disable(true);
        self.p.set_decimal(false);
        self.pbr = 0;
        self.pc = self.mem.load16(vector);
        self.interrupted = true;
        self.cycles += if self.e { 7 } else { 8 };
    }
}

/// Operation handlers. Each one charges the operation's share of the cycle
/// cost; the addressing mode has already charged its own.
impl<M: Mem> Cpu<M> {
    /// Add with carry, binary or BCD depending on the D flag.
    fn adc(&mut self, ea: u32) {
        let c = u16::from(self.p.carry());
        if self.e || self.p.small_acc() {
            let a = self.a & 0xff;
            let data = u16::from(self.mem.load8(ea));
            let sum = a + data + c;
            let mut res = sum;
            if self.p.decimal() {
                if (res & 0x0f) > 0x09 {
                    res += 0x06;
                }
                if (res & 0xf0) > 0x90 {
                    res += 0x60;
                }
            }
            self.p.set_carry(res & 0x100 != 0);
            self.p.set_overflow(!(a ^ data) & (a ^ sum) & 0x80 != 0);
            let res = self.p.set_nz_8(lo(res));
            self.a = (self.a & 0xff00) | u16::from(res);
            self.cycles += 2;
        } else {
            let a = u32::from(self.a);
            let data = u32::from(self.mem.load16(ea));
            let sum = a + data + u32::from(c);
            let mut res = sum;
            if self.p.decimal() {
                if (res & 0x000f) > 0x0009 {
                    res += 0x0006;
                }
                if (res & 0x00f0) > 0x0090 {
                    res += 0x0060;
                }
                if (res & 0x0f00) > 0x0900 {
                    res += 0x0600;
                }
                if (res & 0xf000) > 0x9000 {
                    res += 0x6000;
                }
            }
            self.p.set_carry(res & 0x1_0000 != 0);
            self.p.set_overflow(!(a ^ data) & (a ^ sum) & 0x8000 != 0);
            self.a = self.p.set_nz(res as u16);
            self.cycles += 3;
        }
    }

    /// Subtract with borrow: an add of the inverted operand, with the same
    /// digit corrections applied when in decimal mode.
    fn sbc(&mut self, ea: u32) {
        let c = u16::from(self.p.carry());
        if self.e || self.p.small_acc() {
            let a = self.a & 0xff;
            let data = u16::from(!self.mem.load8(ea));
            let sum = a + data + c;
            let mut res = sum;
            if self.p.decimal() {
                if (res & 0x0f) > 0x09 {
                    res += 0x06;
                }
                if (res & 0xf0) > 0x90 {
                    res += 0x60;
                }
            }
            self.p.set_carry(res & 0x100 != 0);
            self.p.set_overflow(!(a ^ data) & (a ^ sum) & 0x80 != 0);
            let res = self.p.set_nz_8(lo(res));
            self.a = (self.a & 0xff00) | u16::from(res);
            self.cycles += 2;
        } else {
            let a = u32::from(self.a);
            let data = u32::from(!self.mem.load16(ea));
            let sum = a + data + u32::from(c);
            let mut res = sum;
            if self.p.decimal() {
                if (res & 0x000f) > 0x0009 {
                    res += 0x0006;
                }
                if (res & 0x00f0) > 0x0090 {
                    res += 0x0060;
                }
                if (res & 0x0f00) > 0x0900 {
                    res += 0x0600;
                }
                if (res & 0xf000) > 0x9000 {
                    res += 0x6000;
                }
            }
            self.p.set_carry(res & 0x1_0000 != 0);
            self.p.set_overflow(!(a ^ data) & (a ^ sum) & 0x8000 != 0);
            self.a = self.p.set_nz(res as u16);
            self.cycles += 3;
        }
    }

    fn and(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let res = lo(self.a) & self.mem.load8(ea);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(res));
            self.cycles += 2;
        } else {
            let res = self.a & self.mem.load16(ea);
            self.a = self.p.set_nz(res);
            self.cycles += 3;
        }
    }

    fn ora(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let res = lo(self.a) | self.mem.load8(ea);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(res));
            self.cycles += 2;
        } else {
            let res = self.a | self.mem.load16(ea);
            self.a = self.p.set_nz(res);
            self.cycles += 3;
        }
    }

    fn eor(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let res = lo(self.a) ^ self.mem.load8(ea);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(res));
            self.cycles += 2;
        } else {
            let res = self.a ^ self.mem.load16(ea);
            self.a = self.p.set_nz(res);
            self.cycles += 3;
        }
    }

    /// Shared comparison: computes `reg - data` via the inverted add so that
    /// C ends up set exactly when there was no borrow (reg >= data).
    fn compare8(&mut self, reg: u8, data: u8) {
        let diff = u16::from(reg) + u16::from(!data) + 1;
        self.p.set_carry(diff & 0x100 != 0);
        self.p.set_nz_8(lo(diff));
    }

    fn compare16(&mut self, reg: u16, data: u16) {
        let diff = u32::from(reg) + u32::from(!data) + 1;
        self.p.set_carry(diff & 0x1_0000 != 0);
        self.p.set_nz(diff as u16);
    }

    fn cmp(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let data = self.mem.load8(ea);
            let a = lo(self.a);
            self.compare8(a, data);
            self.cycles += 2;
        } else {
            let data = self.mem.load16(ea);
            let a = self.a;
            self.compare16(a, data);
            self.cycles += 3;
        }
    }

    fn cpx(&mut self, ea: u32) {
        if self.e || self.p.small_index() {
            let data = self.mem.load8(ea);
            let x = lo(self.x);
            self.compare8(x, data);
            self.cycles += 2;
        } else {
            let data = self.mem.load16(ea);
            let x = self.x;
            self.compare16(x, data);
            self.cycles += 3;
        }
    }

    fn cpy(&mut self, ea: u32) {
        if self.e || self.p.small_index() {
            let data = self.mem.load8(ea);
            let y = lo(self.y);
            self.compare8(y, data);
            self.cycles += 2;
        } else {
            let data = self.mem.load16(ea);
            let y = self.y;
            self.compare16(y, data);
            self.cycles += 3;
        }
    }

    /// Test memory bits against the accumulator: Z from the AND, N and V
    /// copied from the top bits of the operand.
    fn bit(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let data = self.mem.load8(ea);
            self.p.set_zero(lo(self.a) & data == 0);
            self.p.set_negative(data & 0x80 != 0);
            self.p.set_overflow(data & 0x40 != 0);
            self.cycles += 2;
        } else {
            let data = self.mem.load16(ea);
            self.p.set_zero(self.a & data == 0);
            self.p.set_negative(data & 0x8000 != 0);
            self.p.set_overflow(data & 0x4000 != 0);
            self.cycles += 3;
        }
    }

    /// The immediate form of `bit` only affects Z.
    fn bit_imm(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let data = self.mem.load8(ea);
            self.p.set_zero(lo(self.a) & data == 0);
        } else {
            let data = self.mem.load16(ea);
            self.p.set_zero(self.a & data == 0);
        }
        self.cycles += 2;
    }

    /// Test and set memory bits.
    fn tsb(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let data = self.mem.load8(ea);
            self.mem.store8(ea, data | lo(self.a));
            self.p.set_zero(lo(self.a) & data == 0);
            self.cycles += 4;
        } else {
            let data = self.mem.load16(ea);
            self.mem.store16(ea, data | self.a);
            self.p.set_zero(self.a & data == 0);
            self.cycles += 5;
        }
    }

    /// Test and reset memory bits.
    fn trb(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let data = self.mem.load8(ea);
            self.mem.store8(ea, data & !lo(self.a));
            self.p.set_zero(lo(self.a) & data == 0);
            self.cycles += 4;
        } else {
            let data = self.mem.load16(ea);
            self.mem.store16(ea, data & !self.a);
            self.p.set_zero(self.a & data == 0);
            self.cycles += 5;
        }
    }

    fn asl(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let data = self.mem.load8(ea);
            self.p.set_carry(data & 0x80 != 0);
            let res = self.p.set_nz_8(data << 1);
            self.mem.store8(ea, res);
            self.cycles += 4;
        } else {
            let data = self.mem.load16(ea);
            self.p.set_carry(data & 0x8000 != 0);
            let res = self.p.set_nz(data << 1);
            self.mem.store16(ea, res);
            self.cycles += 5;
        }
    }

    fn asl_a(&mut self) {
        if self.e || self.p.small_acc() {
            let a = lo(self.a);
            self.p.set_carry(a & 0x80 != 0);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(a << 1));
        } else {
            self.p.set_carry(self.a & 0x8000 != 0);
            self.a = self.p.set_nz(self.a << 1);
        }
        self.cycles += 2;
    }

    fn lsr(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let data = self.mem.load8(ea);
            self.p.set_carry(data & 0x01 != 0);
            let res = self.p.set_nz_8(data >> 1);
            self.mem.store8(ea, res);
            self.cycles += 4;
        } else {
            let data = self.mem.load16(ea);
            self.p.set_carry(data & 0x0001 != 0);
            let res = self.p.set_nz(data >> 1);
            self.mem.store16(ea, res);
            self.cycles += 5;
        }
    }

    fn lsr_a(&mut self) {
        if self.e || self.p.small_acc() {
            let a = lo(self.a);
            self.p.set_carry(a & 0x01 != 0);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(a >> 1));
        } else {
            self.p.set_carry(self.a & 0x0001 != 0);
            self.a = self.p.set_nz(self.a >> 1);
        }
        self.cycles += 2;
    }

    fn rol(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let carry = u8::from(self.p.carry());
            let data = self.mem.load8(ea);
            self.p.set_carry(data & 0x80 != 0);
            let res = self.p.set_nz_8((data << 1) | carry);
            self.mem.store8(ea, res);
            self.cycles += 4;
        } else {
            let carry = u16::from(self.p.carry());
            let data = self.mem.load16(ea);
            self.p.set_carry(data & 0x8000 != 0);
            let res = self.p.set_nz((data << 1) | carry);
            self.mem.store16(ea, res);
            self.cycles += 5;
        }
    }

    fn rol_a(&mut self) {
        if self.e || self.p.small_acc() {
            let carry = u8::from(self.p.carry());
            let a = lo(self.a);
            self.p.set_carry(a & 0x80 != 0);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8((a << 1) | carry));
        } else {
            let carry = u16::from(self.p.carry());
            self.p.set_carry(self.a & 0x8000 != 0);
            self.a = self.p.set_nz((self.a << 1) | carry);
        }
        self.cycles += 2;
    }

    fn ror(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let carry = if self.p.carry() { 0x80 } else { 0x00 };
            let data = self.mem.load8(ea);
            self.p.set_carry(data & 0x01 != 0);
            let res = self.p.set_nz_8((data >> 1) | carry);
            self.mem.store8(ea, res);
            self.cycles += 4;
        } else {
            let carry = if self.p.carry() { 0x8000 } else { 0x0000 };
            let data = self.mem.load16(ea);
            self.p.set_carry(data & 0x0001 != 0);
            let res = self.p.set_nz((data >> 1) | carry);
            self.mem.store16(ea, res);
            self.cycles += 5;
        }
    }

    fn ror_a(&mut self) {
        if self.e || self.p.small_acc() {
            let carry = if self.p.carry() { 0x80 } else { 0x00 };
            let a = lo(self.a);
            self.p.set_carry(a & 0x01 != 0);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8((a >> 1) | carry));
        } else {
            let carry = if self.p.carry() { 0x8000 } else { 0x0000 };
            self.p.set_carry(self.a & 0x0001 != 0);
            self.a = self.p.set_nz((self.a >> 1) | carry);
        }
        self.cycles += 2;
    }

    fn inc(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let res = self.mem.load8(ea).wrapping_add(1);
            self.p.set_nz_8(res);
            self.mem.store8(ea, res);
            self.cycles += 4;
        } else {
            let res = self.mem.load16(ea).wrapping_add(1);
            self.p.set_nz(res);
            self.mem.store16(ea, res);
            self.cycles += 5;
        }
    }

    fn dec(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let res = self.mem.load8(ea).wrapping_sub(1);
            self.p.set_nz_8(res);
            self.mem.store8(ea, res);
            self.cycles += 4;
        } else {
            let res = self.mem.load16(ea).wrapping_sub(1);
            self.p.set_nz(res);
            self.mem.store16(ea, res);
            self.cycles += 5;
        }
    }

    fn ina(&mut self) {
        if self.e || self.p.small_acc() {
            let res = self.p.set_nz_8(lo(self.a).wrapping_add(1));
            self.a = (self.a & 0xff00) | u16::from(res);
        } else {
            self.a = self.p.set_nz(self.a.wrapping_add(1));
        }
        self.cycles += 2;
    }

    fn dea(&mut self) {
        if self.e || self.p.small_acc() {
            let res = self.p.set_nz_8(lo(self.a).wrapping_sub(1));
            self.a = (self.a & 0xff00) | u16::from(res);
        } else {
            self.a = self.p.set_nz(self.a.wrapping_sub(1));
        }
        self.cycles += 2;
    }

    fn inx(&mut self) {
        if self.e || self.p.small_index() {
            self.x = u16::from(self.p.set_nz_8(lo(self.x).wrapping_add(1)));
        } else {
            self.x = self.p.set_nz(self.x.wrapping_add(1));
        }
        self.cycles += 2;
    }

    fn iny(&mut self) {
        if self.e || self.p.small_index() {
            self.y = u16::from(self.p.set_nz_8(lo(self.y).wrapping_add(1)));
        } else {
            self.y = self.p.set_nz(self.y.wrapping_add(1));
        }
        self.cycles += 2;
    }

    fn dex(&mut self) {
        if self.e || self.p.small_index() {
            self.x = u16::from(self.p.set_nz_8(lo(self.x).wrapping_sub(1)));
        } else {
            self.x = self.p.set_nz(self.x.wrapping_sub(1));
        }
        self.cycles += 2;
    }

    fn dey(&mut self) {
        if self.e || self.p.small_index() {
            self.y = u16::from(self.p.set_nz_8(lo(self.y).wrapping_sub(1)));
        } else {
            self.y = self.p.set_nz(self.y.wrapping_sub(1));
        }
        self.cycles += 2;
    }

    fn lda(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let val = self.mem.load8(ea);
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(val));
            self.cycles += 2;
        } else {
            let val = self.mem.load16(ea);
            self.a = self.p.set_nz(val);
            self.cycles += 3;
        }
    }

    fn ldx(&mut self, ea: u32) {
        if self.e || self.p.small_index() {
            let val = self.mem.load8(ea);
            self.x = u16::from(self.p.set_nz_8(val));
            self.cycles += 2;
        } else {
            let val = self.mem.load16(ea);
            self.x = self.p.set_nz(val);
            self.cycles += 3;
        }
    }

    fn ldy(&mut self, ea: u32) {
        if self.e || self.p.small_index() {
            let val = self.mem.load8(ea);
            self.y = u16::from(self.p.set_nz_8(val));
            self.cycles += 2;
        } else {
            let val = self.mem.load16(ea);
            self.y = self.p.set_nz(val);
            self.cycles += 3;
        }
    }

    fn sta(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            let a = lo(self.a);
            self.mem.store8(ea, a);
            self.cycles += 2;
        } else {
            let a = self.a;
            self.mem.store16(ea, a);
            self.cycles += 3;
        }
    }

    fn stx(&mut self, ea: u32) {
        if self.e || self.p.small_index() {
            let x = lo(self.x);
            self.mem.store8(ea, x);
            self.cycles += 2;
        } else {
            let x = self.x;
            self.mem.store16(ea, x);
            self.cycles += 3;
        }
    }

    fn sty(&mut self, ea: u32) {
        if self.e || self.p.small_index() {
            let y = lo(self.y);
            self.mem.store8(ea, y);
            self.cycles += 2;
        } else {
            let y = self.y;
            self.mem.store16(ea, y);
            self.cycles += 3;
        }
    }

    fn stz(&mut self, ea: u32) {
        if self.e || self.p.small_acc() {
            self.mem.store8(ea, 0);
            self.cycles += 2;
        } else {
            self.mem.store16(ea, 0);
            self.cycles += 3;
        }
    }

    /// Conditional branch tail: taken branches cost one extra cycle, and in
    /// emulation mode crossing a page boundary costs another.
    fn branch(&mut self, ea: u32, taken: bool) {
        if taken {
            let target = ea as u16;
            if self.e && (self.pc ^ target) & 0xff00 != 0 {
                self.cycles += 1;
            }
            self.pc = target;
            self.cycles += 3;
        } else {
            self.cycles += 2;
        }
    }

    fn bcc(&mut self, ea: u32) {
        let taken = !self.p.carry();
        self.branch(ea, taken);
    }

    fn bcs(&mut self, ea: u32) {
        let taken = self.p.carry();
        self.branch(ea, taken);
    }

    fn bne(&mut self, ea: u32) {
        let taken = !self.p.zero();
        self.branch(ea, taken);
    }

    fn beq(&mut self, ea: u32) {
        let taken = self.p.zero();
        self.branch(ea, taken);
    }

    fn bpl(&mut self, ea: u32) {
        let taken = !self.p.negative();
        self.branch(ea, taken);
    }

    fn bmi(&mut self, ea: u32) {
        let taken = self.p.negative();
        self.branch(ea, taken);
    }

    fn bvc(&mut self, ea: u32) {
        let taken = !self.p.overflow();
        self.branch(ea, taken);
    }

    fn bvs(&mut self, ea: u32) {
        let taken = self.p.overflow();
        self.branch(ea, taken);
    }

    fn bra(&mut self, ea: u32) {
        self.branch(ea, true);
    }

    /// Branch always long: three cycles in total, with no page-cross
    /// penalty. The operand fetch has already charged two.
    fn brl(&mut self, ea: u32) {
        self.pc = ea as u16;
        self.cycles += 1;
    }

    /// Jump within the current program bank.
    fn jmp(&mut self, ea: u32) {
        self.pc = ea as u16;
        self.cycles += 1;
    }

    /// Jump long: also loads PBR from the top bits of the target.
    fn jml(&mut self, ea: u32) {
        self.pbr = (ea >> 16) as u8;
        self.pc = ea as u16;
        self.cycles += 1;
    }

    /// Jump to subroutine. The address pushed is that of the last operand
    /// byte, not of the next instruction.
    fn jsr(&mut self, ea: u32) {
        let ret = self.pc.wrapping_sub(1);
        self.push16(ret);
        self.pc = ea as u16;
        self.cycles += 4;
    }

    /// Long jump to subroutine: saves PBR too, then loads it from the target.
    fn jsl(&mut self, ea: u32) {
        let pbr = self.pbr;
        self.push8(pbr);
        let ret = self.pc.wrapping_sub(1);
        self.push16(ret);
        self.pbr = (ea >> 16) as u8;
        self.pc = ea as u16;
        self.cycles += 5;
    }

    fn rts(&mut self) {
        self.pc = self.pull16().wrapping_add(1);
        self.cycles += 6;
    }

    fn rtl(&mut self) {
        self.pc = self.pull16().wrapping_add(1);
        self.pbr = self.pull8();
        self.cycles += 6;
    }

    /// Return from interrupt: restores P and PC (and PBR in native mode),
    /// then re-enables IRQs.
    fn rti(&mut self) {
        let p = self.pull8();
        self.set_p(p);
        self.pc = self.pull16();
        if self.e {
            self.cycles += 6;
        } else {
            self.pbr = self.pull8();
            self.cycles += 7;
        }
        self.p.set_irq_disable(false);
    }

    /// Software break. The signature byte has already been consumed by the
    /// addressing mode, so the pushed PC points past it.
    fn brk(&mut self, _ea: u32) {
        if self.e {
            let pc = self.pc;
            self.push16(pc);
            let p = self.p.0 | 0x10;
            self.push8(p);
            self.p.set_irq_disable(true);
            self.p.set_decimal(false);
            self.pbr = 0;
            self.pc = self.mem.load16(BRK_VEC8);
            self.cycles += 7;
        } else {
            let pbr = self.pbr;
            self.push8(pbr);
            let pc = self.pc;
            self.push16(pc);
            let p = self.p.0;
            self.push8(p);
            self.p.set_irq_disable(true);
            self.p.set_decimal(false);
            self.pbr = 0;
            self.pc = self.mem.load16(BRK_VEC16);
            self.cycles += 8;
        }
    }

    /// Co-processor trap; same sequence as `brk` through its own vector.
    fn cop(&mut self, _ea: u32) {
        if self.e {
            let pc = self.pc;
            self.push16(pc);
            let p = self.p.0;
            self.push8(p);
            self.p.set_irq_disable(true);
            self.p.set_decimal(false);
            self.pbr = 0;
            self.pc = self.mem.load16(COP_VEC8);
            self.cycles += 7;
        } else {
            let pbr = self.pbr;
            self.push8(pbr);
            let pc = self.pc;
            self.push16(pc);
            let p = self.p.0;
            self.push8(p);
            self.p.set_irq_disable(true);
            self.p.set_decimal(false);
            self.pbr = 0;
            self.pc = self.mem.load16(COP_VEC16);
            self.cycles += 8;
        }
    }

    fn pha(&mut self) {
        if self.e || self.p.small_acc() {
            let a = lo(self.a);
            self.push8(a);
            self.cycles += 3;
        } else {
            let a = self.a;
            self.push16(a);
            self.cycles += 4;
        }
    }

    fn pla(&mut self) {
        if self.e || self.p.small_acc() {
            let val = self.pull8();
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(val));
            self.cycles += 4;
        } else {
            let val = self.pull16();
            self.a = self.p.set_nz(val);
            self.cycles += 5;
        }
    }

    fn phx(&mut self) {
        if self.e || self.p.small_index() {
            let x = lo(self.x);
            self.push8(x);
            self.cycles += 3;
        } else {
            let x = self.x;
            self.push16(x);
            self.cycles += 4;
        }
    }

    fn plx(&mut self) {
        if self.e || self.p.small_index() {
            let val = self.pull8();
            self.x = u16::from(self.p.set_nz_8(val));
            self.cycles += 4;
        } else {
            let val = self.pull16();
            self.x = self.p.set_nz(val);
            self.cycles += 5;
        }
    }

    fn phy(&mut self) {
        if self.e || self.p.small_index() {
            let y = lo(self.y);
            self.push8(y);
            self.cycles += 3;
        } else {
            let y = self.y;
            self.push16(y);
            self.cycles += 4;
        }
    }

    fn ply(&mut self) {
        if self.e || self.p.small_index() {
            let val = self.pull8();
            self.y = u16::from(self.p.set_nz_8(val));
            self.cycles += 4;
        } else {
            let val = self.pull16();
            self.y = self.p.set_nz(val);
            self.cycles += 5;
        }
    }

    fn phb(&mut self) {
        let dbr = self.dbr;
        self.push8(dbr);
        self.cycles += 3;
    }

    fn plb(&mut self) {
        let dbr = self.pull8();
        self.dbr = self.p.set_nz_8(dbr);
        self.cycles += 4;
    }

    fn phk(&mut self) {
        let pbr = self.pbr;
        self.push8(pbr);
        self.cycles += 3;
    }

    fn phd(&mut self) {
        let dp = self.dp;
        self.push16(dp);
        self.cycles += 4;
    }

    fn pld(&mut self) {
        let dp = self.pull16();
        self.dp = self.p.set_nz(dp);
        self.cycles += 5;
    }

    /// Push P. In emulation mode M and X are held at 1, so the pushed byte
    /// always carries bits 4-5 set there.
    fn php(&mut self) {
        let p = self.p.0;
        self.push8(p);
        self.cycles += 3;
    }

    fn plp(&mut self) {
        let p = self.pull8();
        self.set_p(p);
        self.cycles += 4;
    }

    /// Push effective absolute address: the immediate word goes on the stack.
    fn pea(&mut self, ea: u32) {
        let val = self.mem.load16(ea);
        self.push16(val);
        self.cycles += 5;
    }

    /// Push effective indirect address: the word at the direct page address.
    fn pei(&mut self, ea: u32) {
        let val = self.mem.load16(ea);
        self.push16(val);
        self.cycles += 6;
    }

    /// Push effective PC-relative address.
    fn per(&mut self, ea: u32) {
        self.push16(ea as u16);
        self.cycles += 6;
    }

    /// Block move, ascending. One byte per execution; PC rewinds onto the
    /// opcode until A (always 16 bits wide) wraps to 0xFFFF, so interrupts
    /// can preempt a long move.
    fn mvn(&mut self, ea: u32) {
        let dst = self.mem.load8(ea);
        let src = self.mem.load8(ea.wrapping_add(1) & ADDR_MASK);
        self.dbr = dst;

        let (x, y) = (self.x, self.y);
        let val = self.mem.load8(join_bank(src, x));
        self.mem.store8(join_bank(dst, y), val);

        if self.e || self.p.small_index() {
            self.x = u16::from(lo(self.x).wrapping_add(1));
            self.y = u16::from(lo(self.y).wrapping_add(1));
        } else {
            self.x = self.x.wrapping_add(1);
            self.y = self.y.wrapping_add(1);
        }
        self.a = self.a.wrapping_sub(1);
        if self.a != 0xffff {
            self.pc = self.pc.wrapping_sub(3);
        }
        self.cycles += 6;
    }

    /// Block move, descending.
    fn mvp(&mut self, ea: u32) {
        let dst = self.mem.load8(ea);
        let src = self.mem.load8(ea.wrapping_add(1) & ADDR_MASK);
        self.dbr = dst;

        let (x, y) = (self.x, self.y);
        let val = self.mem.load8(join_bank(src, x));
        self.mem.store8(join_bank(dst, y), val);

        if self.e || self.p.small_index() {
            self.x = u16::from(lo(self.x).wrapping_sub(1));
            self.y = u16::from(lo(self.y).wrapping_sub(1));
        } else {
            self.x = self.x.wrapping_sub(1);
            self.y = self.y.wrapping_sub(1);
        }
        self.a = self.a.wrapping_sub(1);
        if self.a != 0xffff {
            self.pc = self.pc.wrapping_sub(3);
        }
        self.cycles += 6;
    }

    fn tax(&mut self) {
        if self.e || self.p.small_index() {
            self.x = u16::from(self.p.set_nz_8(lo(self.a)));
        } else {
            self.x = self.p.set_nz(self.a);
        }
        self.cycles += 2;
    }

    fn tay(&mut self) {
        if self.e || self.p.small_index() {
            self.y = u16::from(self.p.set_nz_8(lo(self.a)));
        } else {
            self.y = self.p.set_nz(self.a);
        }
        self.cycles += 2;
    }

    fn txa(&mut self) {
        if self.e || self.p.small_acc() {
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(lo(self.x)));
        } else {
            self.a = self.p.set_nz(self.x);
        }
        self.cycles += 2;
    }

    fn tya(&mut self) {
        if self.e || self.p.small_acc() {
            self.a = (self.a & 0xff00) | u16::from(self.p.set_nz_8(lo(self.y)));
        } else {
            self.a = self.p.set_nz(self.y);
        }
        self.cycles += 2;
    }

    fn txy(&mut self) {
        if self.e || self.p.small_index() {
            self.y = u16::from(self.p.set_nz_8(lo(self.x)));
        } else {
            self.y = self.p.set_nz(self.x);
        }
        self.cycles += 2;
    }

    fn tyx(&mut self) {
        if self.e || self.p.small_index() {
            self.x = u16::from(self.p.set_nz_8(lo(self.y)));
        } else {
            self.x = self.p.set_nz(self.y);
        }
        self.cycles += 2;
    }

    fn tsx(&mut self) {
        if self.e || self.p.small_index() {
            self.x = u16::from(self.p.set_nz_8(lo(self.sp)));
        } else {
            self.x = self.p.set_nz(self.sp);
        }
        self.cycles += 2;
    }

    /// Transfer X to SP. No flags; in emulation mode SP stays in page 1.
    fn txs(&mut self) {
        if self.e {
            self.sp = 0x0100 | (self.x & 0xff);
        } else {
            self.sp = self.x;
        }
        self.cycles += 2;
    }

    /// Transfer the 16-bit accumulator to the direct page register.
    fn tcd(&mut self) {
        self.dp = self.a;
        self.cycles += 2;
    }

    /// Transfer the direct page register to the accumulator. The transfer is
    /// always 16 bits wide; only the flags honour the M width.
    fn tdc(&mut self) {
        self.a = self.dp;
        if self.e || self.p.small_acc() {
            self.p.set_nz_8(lo(self.a));
        } else {
            self.p.set_nz(self.a);
        }
        self.cycles += 2;
    }

    /// Transfer the 16-bit accumulator to SP. In emulation mode the high
    /// byte of SP is forced to 0x01 instead.
    fn tcs(&mut self) {
        if self.e {
            self.sp = 0x0100 | (self.a & 0xff);
        } else {
            self.sp = self.a;
        }
        self.cycles += 2;
    }

    /// Transfer SP to the accumulator, always 16 bits wide.
    fn tsc(&mut self) {
        self.a = self.sp;
        if self.e || self.p.small_acc() {
            self.p.set_nz_8(lo(self.a));
        } else {
            self.p.set_nz(self.a);
        }
        self.cycles += 2;
    }

    fn clc(&mut self) {
        self.p.set_carry(false);
        self.cycles += 2;
    }

    fn sec(&mut self) {
        self.p.set_carry(true);
        self.cycles += 2;
    }

    fn cld(&mut self) {
        self.p.set_decimal(false);
        self.cycles += 2;
    }

    fn sed(&mut self) {
        self.p.set_decimal(true);
        self.cycles += 2;
    }

    fn cli(&mut self) {
        self.p.set_irq_disable(false);
        self.cycles += 2;
    }

    fn sei(&mut self) {
        self.p.set_irq_disable(true);
        self.cycles += 2;
    }

    fn clv(&mut self) {
        self.p.set_overflow(false);
        self.cycles += 2;
    }

    /// Reset status bits: clears the P bits set in the operand.
    fn rep(&mut self, ea: u32) {
        let mask = self.mem.load8(ea);
        let p = self.p.0 & !mask;
        self.set_p(p);
        self.cycles += 3;
    }

    /// Set status bits.
    fn sep(&mut self, ea: u32) {
        let mask = self.mem.load8(ea);
        let p = self.p.0 | mask;
        self.set_p(p);
        self.cycles += 3;
    }

    /// Exchange the carry and emulation flags. Entering emulation mode
    /// narrows everything: M and X are forced on, the index high bytes are
    /// cleared and SP moves back into page 1.
    fn xce(&mut self) {
        let carry = self.p.carry();
        self.p.set_carry(self.e);
        self.e = carry;
        if self.e {
            self.p.0 |= 0x30;
            self.sp = 0x0100 | (self.sp & 0xff);
            self.x &= 0xff;
            self.y &= 0xff;
        }
        self.cycles += 2;
    }

    /// Exchange the accumulator halves. NZ reflect the new low byte even in
    /// 16-bit mode.
    fn xba(&mut self) {
        self.a = swap(self.a);
        let a = lo(self.a);
        self.p.set_nz_8(a);
        self.cycles += 3;
    }

    /// Stop the clock. PC rewinds onto the opcode so a reset resumes here.
    fn stp(&mut self) {
        self.pc = self.pc.wrapping_sub(1);
        self.stopped = true;
        self.cycles += 3;
    }

    /// Wait for interrupt: spins on the opcode until an interrupt has been
    /// taken, then falls through.
    fn wai(&mut self) {
        if self.interrupted {
            self.interrupted = false;
        } else {
            self.pc = self.pc.wrapping_sub(1);
        }
        self.cycles += 3;
    }

    fn nop(&mut self) {
        self.cycles += 2;
    }

    /// Reserved opcode, used as the host escape hatch: the operand byte is
    /// handed to the installed hook. Without one, `#$FF` stops the processor.
    fn wdm(&mut self, ea: u32) {
        let value = self.mem.load8(ea);
        let mut hook = self.wdm.take();
        match hook.as_mut() {
            Some(hook) => hook(self, value),
            None => {
                if value == 0xff {
                    self.stopped = true;
                }
            }
        }
        if self.wdm.is_none() {
            self.wdm = hook;
        }
        self.cycles += 3;
    }
}
