use super::*;
use crate::emulator::GameBoyModel;
use crate::hardware::cpu::execute::InstructionAddress::{self, HLI};
use crate::hardware::cpu::registers::{Reg16::*, Reg8::*};
use crate::hardware::mmu::MemoryMapper;
use crate::io::interrupts::Interrupts;

/// A flat 64KB memory with no timing side effects, just an m-cycle counter.
struct TestMemory {
    memory: Vec<u8>,
    interrupts: Interrupts,
    m_cycles: u64,
}

impl TestMemory {
    fn new() -> Self {
        TestMemory {
            memory: vec![0; 0x10000],
            interrupts: Interrupts::default(),
            m_cycles: 0,
        }
    }

    fn set_short(&mut self, address: u16, value: u16) {
        self.memory[address as usize] = (value & 0xFF) as u8;
        self.memory[address.wrapping_add(1) as usize] = (value >> 8) as u8;
    }

    fn read_short(&self, address: u16) -> u16 {
        self.memory[address as usize] as u16 | ((self.memory[address.wrapping_add(1) as usize] as u16) << 8)
    }
}

impl MemoryMapper for TestMemory {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        match address {
            0xFF0F => self.interrupts.overwrite_if(value),
            0xFFFF => self.interrupts.overwrite_ie(value),
            _ => self.memory[address as usize] = value,
        }
    }

    fn do_m_cycle(&mut self) -> bool {
        self.m_cycles += 1;
        false
    }

    fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    fn interrupts_mut(&mut self) -> &mut Interrupts {
        &mut self.interrupts
    }

    fn model(&self) -> GameBoyModel {
        GameBoyModel::Dmg
    }

    fn speed_switch_armed(&self) -> bool {
        false
    }

    fn execute_speed_switch(&mut self) -> bool {
        false
    }

    fn should_wake_from_stop(&self) -> bool {
        false
    }
}

fn initial_cpu() -> Cpu<TestMemory> {
    let mut cpu = Cpu::new(TestMemory::new());
    cpu.registers.pc = 0;
    cpu
}

/// Run a single instruction placed at 0x0000 and return how many machine
/// cycles it took.
fn run_instruction(cpu: &mut Cpu<TestMemory>, code: &[u8]) -> u64 {
    cpu.registers.pc = 0;
    cpu.mmu.memory[..code.len()].copy_from_slice(code);
    let before = cpu.mmu.m_cycles;
    cpu.step_cycle();
    cpu.mmu.m_cycles - before
}

#[test]
fn load_16bit_moves_values() {
    let mut cpu = initial_cpu();

    cpu.registers.set_hl(0x500);
    cpu.load_16bit(SP, HL);
    assert_eq!(cpu.registers.sp, 0x500);

    cpu.registers.pc = 1;
    cpu.mmu.set_short(1, 0x0105);
    cpu.load_16bit(BC, InstructionAddress::Direct);
    assert_eq!(cpu.registers.bc(), 0x0105);
}

#[test]
fn load_nn_sp_writes_stack_pointer() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0x500;

    // LD (nn),SP
    let cycles = run_instruction(&mut cpu, &[0x08, 0x05, 0x01]);

    assert_eq!(cpu.mmu.read_short(0x0105), 0x500);
    assert_eq!(cpu.registers.pc, 3);
    assert_eq!(cycles, 5);
}

#[test]
fn load_8bit_from_registers_and_memory() {
    let mut cpu = initial_cpu();

    cpu.registers.c = 40;
    cpu.registers.set_hl(0x4000);
    cpu.mmu.memory[0x4000] = 30;

    cpu.load_8bit(B, C);
    assert_eq!(cpu.registers.b, 40);

    cpu.load_8bit(D, HLI);
    assert_eq!(cpu.registers.d, 30);

    cpu.load_8bit(HLI, C);
    assert_eq!(cpu.mmu.memory[0x4000], 40);

    cpu.execute(0x7A);
    assert_eq!(cpu.registers.a, 30);
}

#[test]
fn increment_sets_half_carry_and_zero() {
    let mut cpu = initial_cpu();

    cpu.registers.a = 15;
    cpu.increment(A);
    assert_eq!(cpu.registers.a, 16);
    assert!(cpu.registers.hf());

    cpu.registers.b = 255;
    cpu.increment(B);
    assert_eq!(cpu.registers.b, 0);
    assert!(cpu.registers.zf());
}

#[test]
fn add_with_overflow_sets_carry() {
    let mut cpu = initial_cpu();
    cpu.registers.a = 10;
    cpu.registers.c = 20;

    cpu.add(C);
    assert_eq!(cpu.registers.a, 30);

    cpu.registers.c = 230;
    cpu.add(C);
    assert_eq!(cpu.registers.a, 4);
    assert!(cpu.registers.cf());
}

#[test]
fn adc_and_sbc_chain_the_carry() {
    let mut cpu = initial_cpu();
    cpu.registers.a = 0xFF;
    cpu.registers.b = 0x01;
    cpu.add(B);
    assert!(cpu.registers.cf());
    assert_eq!(cpu.registers.a, 0);

    cpu.registers.b = 0x0F;
    cpu.adc(B);
    assert_eq!(cpu.registers.a, 0x10);
    assert!(cpu.registers.hf());
    assert!(!cpu.registers.cf());

    cpu.registers.a = 0x10;
    cpu.registers.b = 0x20;
    cpu.sub(B);
    assert!(cpu.registers.cf());
    assert_eq!(cpu.registers.a, 0xF0);

    cpu.registers.b = 0x01;
    cpu.sbc(B);
    assert_eq!(cpu.registers.a, 0xEE);
}

#[test]
fn daa_corrects_bcd_addition() {
    let mut cpu = initial_cpu();

    // 0x15 + 0x27 = 0x3C, DAA corrects to 0x42.
    cpu.registers.a = 0x15;
    cpu.registers.b = 0x27;
    cpu.add(B);
    cpu.daa();
    assert_eq!(cpu.registers.a, 0x42);

    // 0x91 + 0x19 = 0xAA, DAA corrects to 0x10 with carry.
    cpu.registers.a = 0x91;
    cpu.registers.b = 0x19;
    cpu.add(B);
    cpu.daa();
    assert_eq!(cpu.registers.a, 0x10);
    assert!(cpu.registers.cf());
}

#[test]
fn rlca_rotates_through_bit_7() {
    let mut cpu = initial_cpu();
    cpu.registers.a = 0b0100_0101;

    cpu.rlca();
    assert_eq!(cpu.registers.a, 0b1000_1010);
    assert!(!cpu.registers.cf());

    cpu.rlca();
    assert_eq!(cpu.registers.a, 0b0001_0100 | 1);
    assert!(cpu.registers.cf());
}

#[test]
fn push_pop_round_trip() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0xFFFE;
    cpu.registers.set_de(0x1234);

    cpu.push(DE);
    cpu.pop(BC);

    assert_eq!(cpu.registers.bc(), 0x1234);
    assert_eq!(cpu.registers.sp, 0xFFFE);
}

#[test]
fn pop_af_discards_low_nibble() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0xFFF0;
    cpu.mmu.set_short(0xFFF0, 0x12FF);

    cpu.pop(AF);
    assert_eq!(cpu.registers.af(), 0x12F0);
}

#[test]
fn jp_and_jr_change_pc() {
    let mut cpu = initial_cpu();

    let cycles = run_instruction(&mut cpu, &[0xC3, 0x34, 0x12]);
    assert_eq!(cpu.registers.pc, 0x1234);
    assert_eq!(cycles, 4);

    // JR -2 lands back on the JR opcode itself.
    let cycles = run_instruction(&mut cpu, &[0x18, 0xFE]);
    assert_eq!(cpu.registers.pc, 0x0000);
    assert_eq!(cycles, 3);

    // Untaken conditional jump costs only the operand fetch.
    cpu.registers.set_zf(false);
    let cycles = run_instruction(&mut cpu, &[0xCA, 0x34, 0x12]);
    assert_eq!(cpu.registers.pc, 3);
    assert_eq!(cycles, 3);
}

#[test]
fn jp_hl_is_single_cycle() {
    let mut cpu = initial_cpu();
    cpu.registers.set_hl(0x8000);
    let cycles = run_instruction(&mut cpu, &[0xE9]);
    assert_eq!(cpu.registers.pc, 0x8000);
    assert_eq!(cycles, 1);
}

#[test]
fn call_and_ret_timings() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0xFFFE;

    let cycles = run_instruction(&mut cpu, &[0xCD, 0x00, 0x40]);
    assert_eq!(cpu.registers.pc, 0x4000);
    assert_eq!(cycles, 6);
    assert_eq!(cpu.mmu.read_short(0xFFFC), 0x0003);

    cpu.mmu.memory[0x4000] = 0xC9; // RET
    cpu.registers.pc = 0x4000;
    let before = cpu.mmu.m_cycles;
    cpu.step_cycle();
    assert_eq!(cpu.registers.pc, 0x0003);
    assert_eq!(cpu.mmu.m_cycles - before, 4);
}

#[test]
fn interrupt_dispatch_takes_five_cycles_and_clears_if() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0xFFFE;
    cpu.registers.pc = 0x1234;
    cpu.ime = true;
    cpu.mmu.interrupts.overwrite_ie(0x04);
    cpu.mmu.interrupts.overwrite_if(0x04);

    let before = cpu.mmu.m_cycles;
    cpu.step_cycle();

    assert_eq!(cpu.mmu.m_cycles - before, 5);
    assert_eq!(cpu.registers.pc, 0x0050);
    assert!(!cpu.ime);
    assert!(cpu.mmu.interrupts.pending().is_empty());
    assert_eq!(cpu.mmu.read_short(0xFFFC), 0x1234);
}

#[test]
fn interrupt_cancelled_by_ie_push_jumps_to_zero() {
    let mut cpu = initial_cpu();
    // SP placed so the PC high byte push lands in IE.
    cpu.registers.sp = 0x0000;
    cpu.registers.pc = 0x0012;
    cpu.ime = true;
    cpu.mmu.interrupts.overwrite_ie(0x04);
    cpu.mmu.interrupts.overwrite_if(0x04);

    cpu.step_cycle();

    // The push of 0x00 wiped IE, nothing is pending, so the CPU falls
    // through to vector 0x0000.
    assert_eq!(cpu.registers.pc, 0x0000);
    assert!(cpu.mmu.interrupts.interrupt_enable.is_empty());
}

#[test]
fn ei_takes_effect_after_one_instruction() {
    let mut cpu = initial_cpu();
    cpu.mmu.interrupts.overwrite_ie(0x01);
    cpu.mmu.interrupts.overwrite_if(0x01);

    // EI; NOP; next step dispatches.
    cpu.mmu.memory[0] = 0xFB;
    cpu.mmu.memory[1] = 0x00;

    cpu.step_cycle();
    assert!(!cpu.ime);

    cpu.step_cycle();
    assert!(cpu.ime);
    assert_eq!(cpu.registers.pc, 2);

    cpu.step_cycle();
    assert_eq!(cpu.registers.pc, 0x0040);
}

#[test]
fn halt_idles_until_interrupt_flag() {
    let mut cpu = initial_cpu();
    cpu.mmu.interrupts.overwrite_ie(0x04);
    cpu.mmu.memory[0] = 0x76; // HALT
    cpu.mmu.memory[1] = 0x04; // INC B

    cpu.step_cycle();
    for _ in 0..10 {
        cpu.step_cycle();
    }
    assert_eq!(cpu.registers.pc, 1, "halted CPU must not advance");

    // Without IME the CPU resumes right after HALT without dispatching.
    cpu.mmu.interrupts.overwrite_if(0x04);
    cpu.step_cycle();
    assert_eq!(cpu.registers.pc, 2);
    assert_eq!(cpu.registers.b, 1);
}

#[test]
fn halt_bug_executes_next_byte_twice() {
    let mut cpu = initial_cpu();
    cpu.mmu.interrupts.overwrite_ie(0x04);
    cpu.mmu.interrupts.overwrite_if(0x04);

    cpu.mmu.memory[0] = 0x76; // HALT with IME=0 and pending interrupt
    cpu.mmu.memory[1] = 0x04; // INC B, runs twice

    cpu.step_cycle();
    cpu.step_cycle();
    cpu.step_cycle();

    assert_eq!(cpu.registers.b, 2);
    assert_eq!(cpu.registers.pc, 2);
}

#[test]
fn ld_b_b_sets_debug_flag() {
    let mut cpu = initial_cpu();
    assert!(!cpu.ld_b_b_executed);
    run_instruction(&mut cpu, &[0x40]);
    assert!(cpu.ld_b_b_executed);
}

#[test]
fn prefixed_bit_ops() {
    let mut cpu = initial_cpu();
    cpu.registers.e = 0b0000_0100;

    // BIT 2,E
    run_instruction(&mut cpu, &[0xCB, 0x53]);
    assert!(!cpu.registers.zf());

    // RES 2,E
    run_instruction(&mut cpu, &[0xCB, 0x93]);
    assert_eq!(cpu.registers.e, 0);

    // SET 7,E
    run_instruction(&mut cpu, &[0xCB, 0xFB]);
    assert_eq!(cpu.registers.e, 0x80);

    // SWAP E
    run_instruction(&mut cpu, &[0xCB, 0x33]);
    assert_eq!(cpu.registers.e, 0x08);
}

#[test]
fn add_sp_flag_semantics() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0x00FF;

    // ADD SP,+1: carry out of both nibble and byte.
    let cycles = run_instruction(&mut cpu, &[0xE8, 0x01]);
    assert_eq!(cpu.registers.sp, 0x0100);
    assert!(cpu.registers.hf());
    assert!(cpu.registers.cf());
    assert!(!cpu.registers.zf());
    assert_eq!(cycles, 4);

    // ADD SP,-1: flags come from the unsigned low byte addition.
    cpu.registers.sp = 0x0000;
    run_instruction(&mut cpu, &[0xE8, 0xFF]);
    assert_eq!(cpu.registers.sp, 0xFFFF);
    assert!(!cpu.registers.hf());
    assert!(!cpu.registers.cf());
}
