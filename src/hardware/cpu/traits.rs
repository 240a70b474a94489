//! Operand resolution for the instruction implementations.
//!
//! Instructions are generic over their operands: a `Reg8`, a memory operand
//! described by [`InstructionAddress`](super::execute::InstructionAddress),
//! or the [`WrapperEnum`](super::execute::WrapperEnum) the row decoders
//! produce. Resolving a memory operand performs the bus access and therefore
//! costs the machine cycles the real instruction would spend on it.

use crate::hardware::cpu::execute::{InstructionAddress, WrapperEnum};
use crate::hardware::cpu::registers::{Reg16, Reg8};
use crate::hardware::cpu::Cpu;
use crate::hardware::mmu::MemoryMapper;

pub trait ToU8<T: Copy> {
    /// Resolve the operand to a value, reading memory (and spending cycles)
    /// where required.
    fn read_u8_value(&mut self, target: T) -> u8;
}

pub trait SetU8<T: Copy> {
    fn set_u8_value(&mut self, target: T, value: u8);
}

pub trait ToU16<T: Copy> {
    fn read_u16_value(&mut self, target: T) -> u16;
}

pub trait SetU16<T: Copy> {
    fn set_u16_value(&mut self, target: T, value: u16);
}

impl<M: MemoryMapper> ToU8<Reg8> for Cpu<M> {
    fn read_u8_value(&mut self, target: Reg8) -> u8 {
        use Reg8::*;
        match target {
            A => self.registers.a,
            B => self.registers.b,
            C => self.registers.c,
            D => self.registers.d,
            E => self.registers.e,
            H => self.registers.h,
            L => self.registers.l,
        }
    }
}

impl<M: MemoryMapper> SetU8<Reg8> for Cpu<M> {
    fn set_u8_value(&mut self, target: Reg8, value: u8) {
        use Reg8::*;
        match target {
            A => self.registers.a = value,
            B => self.registers.b = value,
            C => self.registers.c = value,
            D => self.registers.d = value,
            E => self.registers.e = value,
            H => self.registers.h = value,
            L => self.registers.l = value,
        }
    }
}

impl<M: MemoryMapper> ToU8<InstructionAddress> for Cpu<M> {
    fn read_u8_value(&mut self, target: InstructionAddress) -> u8 {
        use InstructionAddress::*;
        match target {
            BCI => self.read_byte_cycle(self.registers.bc()),
            DEI => self.read_byte_cycle(self.registers.de()),
            HLI => self.read_byte_cycle(self.registers.hl()),
            HLIP => {
                let address = self.registers.hl();
                self.registers.set_hl(address.wrapping_add(1));
                self.read_byte_cycle(address)
            }
            HLIN => {
                let address = self.registers.hl();
                self.registers.set_hl(address.wrapping_sub(1));
                self.read_byte_cycle(address)
            }
            Direct => self.get_instr_u8(),
            DirectMem => {
                let address = self.get_instr_u16();
                self.read_byte_cycle(address)
            }
            IoDirect => {
                let offset = self.get_instr_u8();
                self.read_byte_cycle(0xFF00 | offset as u16)
            }
            IoC => self.read_byte_cycle(0xFF00 | self.registers.c as u16),
        }
    }
}

impl<M: MemoryMapper> SetU8<InstructionAddress> for Cpu<M> {
    fn set_u8_value(&mut self, target: InstructionAddress, value: u8) {
        use InstructionAddress::*;
        match target {
            BCI => self.write_byte_cycle(self.registers.bc(), value),
            DEI => self.write_byte_cycle(self.registers.de(), value),
            HLI => self.write_byte_cycle(self.registers.hl(), value),
            HLIP => {
                let address = self.registers.hl();
                self.registers.set_hl(address.wrapping_add(1));
                self.write_byte_cycle(address, value)
            }
            HLIN => {
                let address = self.registers.hl();
                self.registers.set_hl(address.wrapping_sub(1));
                self.write_byte_cycle(address, value)
            }
            Direct => unreachable!("Immediate operands can not be written to"),
            DirectMem => {
                let address = self.get_instr_u16();
                self.write_byte_cycle(address, value)
            }
            IoDirect => {
                let offset = self.get_instr_u8();
                self.write_byte_cycle(0xFF00 | offset as u16, value)
            }
            IoC => self.write_byte_cycle(0xFF00 | self.registers.c as u16, value),
        }
    }
}

impl<M: MemoryMapper> ToU8<WrapperEnum> for Cpu<M> {
    fn read_u8_value(&mut self, target: WrapperEnum) -> u8 {
        match target {
            WrapperEnum::Reg8(result) => self.read_u8_value(result),
            WrapperEnum::InstructionAddress(result) => self.read_u8_value(result),
        }
    }
}

impl<M: MemoryMapper> SetU8<WrapperEnum> for Cpu<M> {
    fn set_u8_value(&mut self, target: WrapperEnum, value: u8) {
        match target {
            WrapperEnum::Reg8(result) => self.set_u8_value(result, value),
            WrapperEnum::InstructionAddress(result) => self.set_u8_value(result, value),
        }
    }
}

impl<M: MemoryMapper> ToU16<Reg16> for Cpu<M> {
    fn read_u16_value(&mut self, target: Reg16) -> u16 {
        use Reg16::*;
        match target {
            AF => self.registers.af(),
            BC => self.registers.bc(),
            DE => self.registers.de(),
            HL => self.registers.hl(),
            SP => self.registers.sp,
        }
    }
}

impl<M: MemoryMapper> SetU16<Reg16> for Cpu<M> {
    fn set_u16_value(&mut self, target: Reg16, value: u16) {
        use Reg16::*;
        match target {
            AF => self.registers.set_af(value),
            BC => self.registers.set_bc(value),
            DE => self.registers.set_de(value),
            HL => self.registers.set_hl(value),
            SP => self.registers.sp = value,
        }
    }
}

impl<M: MemoryMapper> ToU16<InstructionAddress> for Cpu<M> {
    fn read_u16_value(&mut self, target: InstructionAddress) -> u16 {
        match target {
            InstructionAddress::Direct => self.get_instr_u16(),
            _ => unreachable!("No 16 bit reads for other memory operands exist"),
        }
    }
}

impl<M: MemoryMapper> SetU16<InstructionAddress> for Cpu<M> {
    fn set_u16_value(&mut self, target: InstructionAddress, value: u16) {
        match target {
            InstructionAddress::DirectMem => {
                let address = self.get_instr_u16();
                self.write_short_cycle(address, value);
            }
            _ => unreachable!("No 16 bit writes for other memory operands exist"),
        }
    }
}
