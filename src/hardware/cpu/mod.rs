//! The SM83 core. Instructions are straight-line sequences of bus accesses
//! interleaved with ALU work; every bus access advances the clock by one
//! machine cycle (see `fetch.rs`), so there is no per-instruction cycle
//! table to keep in sync.

use crate::hardware::cpu::execute::JumpModifier;
use crate::hardware::cpu::registers::Reg8::A;
use crate::hardware::cpu::registers::{Reg16, Registers};
use crate::hardware::cpu::traits::{SetU16, SetU8, ToU16, ToU8};
use crate::hardware::mmu::MemoryMapper;
use crate::io::interrupts::{Interrupt, InterruptFlags};

use std::fmt::Debug;

#[cfg(test)]
mod tests;

mod alu;
pub mod execute;
mod fetch;
pub mod traits;

pub mod registers;

pub struct Cpu<M: MemoryMapper> {
    pub mmu: M,
    pub registers: Registers,
    opcode: u8,
    pub ime: bool,
    halted: bool,
    /// STOP state; only ended by joypad input (or a speed switch on CGB).
    stopped: bool,
    /// The byte after HALT will be executed twice.
    halt_bug: bool,
    delayed_ime: bool,
    /// Set when a frame completed during this instruction; drained by the
    /// emulator's run loop.
    pub frame_finished: bool,
    /// `LD B,B` executed, exposed through the test info struct.
    pub ld_b_b_executed: bool,
}

impl<M: MemoryMapper> Cpu<M> {
    pub fn new(mmu: M) -> Self {
        let mut result = Cpu {
            opcode: 0,
            registers: Registers::new(),
            mmu,
            ime: false,
            halted: false,
            stopped: false,
            halt_bug: false,
            delayed_ime: false,
            frame_finished: false,
            ld_b_b_executed: false,
        };

        // Registers as the boot ROM leaves them.
        result.registers.pc = 0x100;
        if result.mmu.model().is_dmg() {
            result.registers.set_af(0x01B0);
            result.registers.set_bc(0x0013);
            result.registers.set_de(0x00D8);
            result.registers.set_hl(0x014D);
        } else {
            result.registers.set_af(0x1180);
            result.registers.set_bc(0x0000);
            result.registers.set_de(0xFF56);
            result.registers.set_hl(0x000D);
        }
        result.registers.sp = 0xFFFE;

        result
    }

    /// Run one instruction (or one idle machine cycle while halted), interrupt
    /// dispatch included.
    pub fn step_cycle(&mut self) {
        if self.stopped {
            if self.mmu.should_wake_from_stop() {
                self.stopped = false;
            } else {
                self.add_cycles();
                return;
            }
        }

        if self.halted {
            // Any enabled pending interrupt ends HALT, IME or not.
            if self.mmu.interrupts().pending().is_empty() {
                self.add_cycles();
                return;
            }
            self.halted = false;
        }

        if self.ime && !self.mmu.interrupts().pending().is_empty() {
            self.interrupt_service_routine();
            return;
        }

        // EI only takes effect after the instruction following it.
        if self.delayed_ime {
            self.ime = true;
            self.delayed_ime = false;
        }

        self.opcode = if self.halt_bug {
            // The PC fails to increment for one fetch: the byte after HALT
            // runs twice.
            self.halt_bug = false;
            self.read_byte_cycle(self.registers.pc)
        } else {
            self.get_instr_u8()
        };

        #[cfg(feature = "cpu-logging")]
        log::trace!("Executing opcode: {:02X} - registers: {}", self.opcode, self.registers);

        self.execute(self.opcode);
    }

    /// The 5 machine cycle dispatch sequence.
    ///
    /// The vector is chosen *after* the high byte of PC has been pushed; if
    /// that push clobbered IE and nothing is pending anymore the CPU ends up
    /// at 0x0000 (mooneye: acceptance/interrupts/ie_push).
    fn interrupt_service_routine(&mut self) {
        self.add_cycles();
        self.add_cycles();

        self.ime = false;
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, (self.registers.pc >> 8) as u8);

        let pending = self.mmu.interrupts().pending();
        let vector = match Interrupt::iter().find(|i| pending.contains(InterruptFlags::from_bits_truncate(*i as u8))) {
            Some(interrupt) => {
                self.mmu.interrupts_mut().acknowledge(interrupt);
                interrupt.vector()
            }
            None => 0x0000,
        };

        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, self.registers.pc as u8);

        self.registers.pc = vector;
        self.add_cycles();
    }

    fn nop(&mut self) {}

    /// `ld rr,nn` OR `ld (nn),SP`
    fn load_16bit<T: Copy, U: Copy>(&mut self, destination: T, source: U)
    where
        Self: SetU16<T>,
        Self: ToU16<U>,
    {
        let source_value = self.read_u16_value(source);

        self.set_u16_value(destination, source_value);
    }

    /// `ld` never sets any flags.
    fn load_8bit<T: Copy, U: Copy>(&mut self, destination: T, source: U)
    where
        T: Debug,
        Self: SetU8<T>,
        Self: ToU8<U>,
    {
        let source_value = self.read_u8_value(source);

        self.set_u8_value(destination, source_value);
    }

    /// `r=r+1` OR `(HL)=(HL)+1`
    ///
    /// Flags: `z0h-`
    fn increment<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        let old_value = self.read_u8_value(target);
        let new_value = old_value.wrapping_add(1);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h((old_value & 0xF) + 0x1 > 0xF);

        self.set_u8_value(target, new_value);
    }

    /// `rr = rr+1`
    ///
    /// Flags: `----`
    fn increment16(&mut self, target: Reg16) {
        let new_value = self.read_u16_value(target).wrapping_add(1);

        self.set_u16_value(target, new_value);
        // The 16 bit inc/dec spend an extra internal cycle.
        self.add_cycles();
    }

    /// `r=r-1` OR `(HL)=(HL)-1`
    ///
    /// Flags: `z1h-`
    fn decrement<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        let old_value = self.read_u8_value(target);
        let new_value = old_value.wrapping_sub(1);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers.set_h(old_value & 0xF == 0);

        self.set_u8_value(target, new_value);
    }

    /// `rr = rr-1`
    ///
    /// Flags: `----`
    fn decrement16(&mut self, target: Reg16) {
        let new_value = self.read_u16_value(target).wrapping_sub(1);

        self.set_u16_value(target, new_value);
        self.add_cycles();
    }

    /// `HL = HL+rr`
    ///
    /// Flags: `-0hc`
    fn add16(&mut self, target: Reg16) {
        let value = self.read_u16_value(target);
        let (result, overflowed) = self.registers.hl().overflowing_add(value);
        self.registers.set_n(false);
        self.registers.set_cf(overflowed);
        self.registers
            .set_h((value & 0x0FFF) + (self.registers.hl() & 0x0FFF) > 0x0FFF);

        self.registers.set_hl(result);
        self.add_cycles();
    }

    /// `rotate A left; 7th bit to Carry flag`
    ///
    /// Flags: `000c`
    fn rlca(&mut self) {
        self.rotate_left(A);
        self.registers.set_zf(false);
    }

    /// `Rotate A right. Old bit 0 to Carry flag.`
    ///
    /// Flags: `000C`
    fn rrca(&mut self) {
        self.rotate_right(A);
        self.registers.set_zf(false);
    }

    /// Rotate A left through Carry flag.
    ///
    /// Flags: `000C`
    fn rla(&mut self) {
        self.rotate_left_carry(A);
        self.registers.set_zf(false);
    }

    /// Rotate A right through Carry flag.
    ///
    /// Flags: `000C`
    fn rra(&mut self) {
        self.rotate_right_carry(A);
        self.registers.set_zf(false);
    }

    /// `jr PC+dd` OR `jr f,PC+dd`
    ///
    /// Flags: `----`
    fn relative_jump(&mut self, condition: JumpModifier) {
        let offset = self.get_instr_u8() as i8;
        if self.matches_jmp_condition(condition) {
            self.registers.pc = self.registers.pc.wrapping_add(offset as u16);
            self.add_cycles();
        }
    }

    /// Decimal adjust register A to a correct BCD representation after an
    /// arithmetic instruction.
    ///
    /// Flags: `Z-0C`
    fn daa(&mut self) {
        // After an addition, adjust if a (half-)carry occurred or if the
        // result is out of bounds.
        if !self.registers.n() {
            if self.registers.cf() || self.registers.a > 0x99 {
                self.registers.a = self.registers.a.wrapping_add(0x60);
                self.registers.set_cf(true);
            }
            if self.registers.hf() || (self.registers.a & 0x0F) > 0x09 {
                self.registers.a = self.registers.a.wrapping_add(0x06);
            }
        } else {
            // After a subtraction, only adjust if a (half-)carry occurred.
            if self.registers.cf() {
                self.registers.a = self.registers.a.wrapping_sub(0x60);
            }
            if self.registers.hf() {
                self.registers.a = self.registers.a.wrapping_sub(0x06);
            }
        }

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_h(false);
    }

    /// ComPLement accumulator (A = ~A).
    ///
    /// Flags: `-11-`
    fn cpl(&mut self) {
        self.registers.a = !self.registers.a;

        self.registers.set_n(true);
        self.registers.set_h(true);
    }

    /// Set Carry Flag.
    ///
    /// Flags: `-001`
    fn scf(&mut self) {
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(true);
    }

    /// Complement Carry Flag.
    ///
    /// Flags: `-00i` where `i = inverted`
    fn ccf(&mut self) {
        self.registers.set_n(false);
        self.registers.set_h(false);
        let carry = self.registers.cf();
        self.registers.set_cf(!carry);
    }

    /// `halt until interrupt occurs (low power)`
    ///
    /// Entering HALT with IME cleared while an enabled interrupt is already
    /// pending triggers the HALT bug instead: the next byte executes twice.
    fn halt(&mut self) {
        if !self.ime && !self.mmu.interrupts().pending().is_empty() {
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
    }

    /// STOP: on a CGB with an armed KEY1 this performs the speed switch,
    /// otherwise the CPU stands still until the joypad wakes it.
    fn stop(&mut self) {
        // STOP skips the byte that follows it.
        let _ = self.get_instr_u8();

        if self.mmu.speed_switch_armed() {
            let frame_finished = self.mmu.execute_speed_switch();
            self.frame_finished |= frame_finished;
        } else {
            self.stopped = true;
        }
    }

    /// `A=A+r` OR `A=A+n` OR `A=A+(HL)`
    ///
    /// Flags: `Z0HC`
    fn add<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let (new_value, overflowed) = self.registers.a.overflowing_add(value);
        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_cf(overflowed);
        // Half carry is set on a carry out of the lower nibble.
        self.registers.set_h((self.registers.a & 0xF) + (value & 0xF) > 0xF);

        self.registers.a = new_value;
    }

    /// Add the value in `target` plus the carry flag to A.
    ///
    /// Flags: `Z0HC`
    fn adc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let carry_flag = self.registers.cf() as u8;
        let new_value = self.registers.a.wrapping_add(value).wrapping_add(carry_flag);
        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers
            .set_h((self.registers.a & 0xF) + (value & 0xF) + carry_flag > 0xF);
        self.registers
            .set_cf((self.registers.a as u16) + (value as u16) + carry_flag as u16 > 0xFF);

        self.registers.a = new_value;
    }

    /// Subtract the value in `target` from A.
    ///
    /// Flags: `Z1HC`
    fn sub<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = self.registers.a.wrapping_sub(value);
        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers
            .set_h((self.registers.a & 0xF).wrapping_sub(value & 0xF) & 0x10 != 0);
        self.registers.set_cf(value > self.registers.a);

        self.registers.a = new_value;
    }

    /// Subtract the value in `target` and the carry flag from A.
    ///
    /// Flags: `Z1HC`
    fn sbc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let carry_flag = self.registers.cf() as u8;
        let new_value = self.registers.a.wrapping_sub(value).wrapping_sub(carry_flag);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers.set_h(
            (self.registers.a & 0xF).wrapping_sub(value & 0xF).wrapping_sub(carry_flag) & 0x10 != 0,
        );
        self.registers
            .set_cf(value as u16 + carry_flag as u16 > self.registers.a as u16);

        self.registers.a = new_value;
    }

    /// Bitwise AND between the value in `target` and A.
    ///
    /// Flags: `Z010`
    fn and<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        self.registers.a &= self.read_u8_value(target);

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_n(false);
        self.registers.set_h(true);
        self.registers.set_cf(false);
    }

    /// Bitwise XOR between the value in `target` and A.
    ///
    /// Flags: `Z000`
    fn xor<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        self.registers.a ^= self.read_u8_value(target);

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(false);
    }

    /// Store into A the bitwise OR of the value in `target` and A.
    ///
    /// Flags: `Z000`
    fn or<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        self.registers.a |= self.read_u8_value(target);

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(false);
    }

    /// Subtract the value in `target` from A and set flags accordingly
    /// without storing the result.
    ///
    /// Flags: `Z1HC`
    fn compare<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = self.registers.a.wrapping_sub(value);
        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers.set_cf(value > self.registers.a);
        self.registers
            .set_h((self.registers.a & 0xF).wrapping_sub(value & 0xF) & 0x10 != 0);
    }

    /// Unconditional return from subroutine, basically a `POP PC`.
    fn ret(&mut self) {
        self.registers.pc = self.read_short_cycle(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(2);
        self.add_cycles();
    }

    /// Conditional return; spends an extra cycle on the condition check.
    fn ret_conditional(&mut self, condition: JumpModifier) {
        self.add_cycles();
        if self.matches_jmp_condition(condition) {
            self.registers.pc = self.read_short_cycle(self.registers.sp);
            self.registers.sp = self.registers.sp.wrapping_add(2);
            self.add_cycles();
        }
    }

    /// Return from subroutine and enable interrupts, without the EI delay.
    ///
    /// Flags: `----`
    fn reti(&mut self) {
        self.ime = true;
        self.registers.pc = self.read_short_cycle(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(2);
        self.add_cycles();
    }

    /// Pop register `target` from the stack.
    ///
    /// Flags: `----` (except for `POP AF`, which writes all of them)
    fn pop(&mut self, target: Reg16) {
        let sp_target = self.read_short_cycle(self.registers.sp);
        self.set_u16_value(target, sp_target);
        self.registers.sp = self.registers.sp.wrapping_add(2);
    }

    /// `jump to nn, PC=nn` OR `conditional jump if nz,z,nc,c`
    fn jump(&mut self, condition: JumpModifier) {
        let target = self.get_instr_u16();

        if self.matches_jmp_condition(condition) {
            self.registers.pc = target;
            self.add_cycles();
        }
    }

    /// `JP HL`: one machine cycle, no immediate operand.
    fn jump_hl(&mut self) {
        self.registers.pc = self.registers.hl();
    }

    fn matches_jmp_condition(&self, condition: JumpModifier) -> bool {
        match condition {
            JumpModifier::NotZero => !self.registers.zf(),
            JumpModifier::Zero => self.registers.zf(),
            JumpModifier::NotCarry => !self.registers.cf(),
            JumpModifier::Carry => self.registers.cf(),
            JumpModifier::Always => true,
        }
    }

    /// Call address n16 if condition `target` is met: push the address of
    /// the next instruction and perform an implicit `JP`.
    ///
    /// Flags: `----`
    fn call(&mut self, target: JumpModifier) {
        let address = self.get_instr_u16();
        if self.matches_jmp_condition(target) {
            self.push_helper(self.registers.pc);
            self.registers.pc = address;
        }
    }

    /// Push register `target` onto the stack.
    ///
    /// Flags: `----`
    fn push(&mut self, target: Reg16) {
        let value = self.read_u16_value(target);
        self.push_helper(value);
    }

    fn push_helper(&mut self, value: u16) {
        self.add_cycles();
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, (value >> 8) as u8);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, value as u8);
    }

    /// Call address `vec`, the shorter and faster `CALL` for the reset
    /// vectors.
    ///
    /// Flags: `----`
    fn rst(&mut self, vec: u8) {
        self.push_helper(self.registers.pc);
        self.registers.pc = vec as u16;
    }

    /// The unused opcodes lock up a real CPU; games never execute them on
    /// purpose so treat it as a fatal emulation fault.
    fn unknown(&mut self) {
        panic!("Invalid opcode executed: {:02X}", self.opcode)
    }

    /// `ADD SP,e8`
    ///
    /// Flags: `00HC`
    fn add_sp(&mut self) {
        let value = self.get_instr_u8() as i8 as u16;
        let new_value = self.registers.sp.wrapping_add(value);

        self.registers.set_zf(false);
        self.registers.set_n(false);
        self.registers.set_h((self.registers.sp & 0xF) + (value & 0xF) > 0xF);
        self.registers.set_cf((self.registers.sp & 0xFF) + (value & 0xFF) > 0xFF);

        self.registers.sp = new_value;

        self.add_cycles();
        self.add_cycles();
    }

    /// `DI`
    ///
    /// Flags: `----`
    fn di(&mut self) {
        self.ime = false;
        self.delayed_ime = false;
    }

    /// `LD HL,SP+i8`
    ///
    /// Flags: `00HC`
    fn load_sp_i(&mut self) {
        let value = self.get_instr_u8() as i8 as u16;
        let new_value = self.registers.sp.wrapping_add(value);

        self.registers.set_hl(new_value);
        self.registers.set_zf(false);
        self.registers.set_n(false);
        self.registers.set_h((self.registers.sp & 0xF) + (value & 0xF) > 0xF);
        self.registers.set_cf((self.registers.sp & 0xFF) + (value & 0xFF) > 0xFF);

        self.add_cycles();
    }

    /// `LD SP, HL`
    ///
    /// Flags: `----`
    fn load_sp_hl(&mut self) {
        self.registers.sp = self.registers.hl();
        self.add_cycles();
    }

    /// `EI`
    /// Enable interrupts, but only after the instruction following this one.
    fn ei(&mut self) {
        if !self.ime {
            self.delayed_ime = true;
        }
    }

    /*
       Prefixed Instructions
    */

    /// `RLC r8/[HL]`
    /// Rotate register `target` left.
    ///
    /// C <- [7 <- 0] <- [7]
    ///
    /// Flags: `Z00C`
    fn rlc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        self.rotate_left(target);
    }

    /// `RRC r8/[HL]`
    /// Rotate register r8 right.
    ///
    /// [0] -> [7 -> 0] -> C
    ///
    /// Flags: `Z00C`
    fn rrc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        self.rotate_right(target);
    }

    /// `RL r8/[HL]`
    /// Rotate bits in register `target` left through carry.
    ///
    /// C <- [7 <- 0] <- C
    ///
    /// Flags: `Z00C`
    fn rl<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        self.rotate_left_carry(target);
    }

    /// `RR r8/[HL]`
    /// Rotate register `target` right through carry.
    ///
    /// C -> [7 -> 0] -> C
    ///
    /// Flags: `Z00C`
    fn rr<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        self.rotate_right_carry(target);
    }

    /// `SLA r8/[HL]`
    /// Shift Left Arithmetic on register `target`.
    ///
    /// C <- [7 <- 0] <- 0
    ///
    /// Flags: `Z00C`
    fn sla<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        self.shift_left(target);
    }

    /// `SRA r8/[HL]`
    /// Shift Right Arithmetic register `target`.
    ///
    /// [7] -> [7 -> 0] -> C
    ///
    /// Flags: `Z00C`
    fn sra<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = (value & 0x80) | value.wrapping_shr(1);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(value & 0x1 != 0);

        self.set_u8_value(target, new_value);
    }

    /// `SWAP r8/[HL]`
    /// Swap the upper and lower 4 bits in register `target`.
    ///
    /// Flags: `Z000`
    fn swap<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = (value << 4) | (value >> 4);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(false);

        self.set_u8_value(target, new_value);
    }

    /// `SRL r8/[HL]`
    /// Shift Right Logic register `target`.
    ///
    /// 0 -> [7 -> 0] -> C
    ///
    /// Flags: `Z00C`
    fn srl<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        self.shift_right(target);
    }

    /// `BIT u3,r8/[HL]`
    /// Test bit u3 in register `target`, set the zero flag if bit not set.
    ///
    /// Flags: `Z01-`
    fn bit<T: Copy>(&mut self, bit: u8, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);

        self.registers.set_zf(value & (1 << bit) == 0);
        self.registers.set_n(false);
        self.registers.set_h(true)
    }

    /// `SET u3,r8/[HL]`
    /// Set bit u3 in register r8 to 1.
    ///
    /// Flags: `----`
    fn set<T: Copy>(&mut self, bit: u8, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        let value = self.read_u8_value(target);

        self.set_u8_value(target, value | (1 << bit));
    }

    /// `RES u3,r8/[HL]`
    /// Set bit u3 in register r8 to 0.
    ///
    /// Flags: `----`
    fn res<T: Copy>(&mut self, bit: u8, target: T)
    where
        Self: ToU8<T>,
        Self: SetU8<T>,
    {
        let value = self.read_u8_value(target);

        self.set_u8_value(target, value & !(1 << bit));
    }
}
