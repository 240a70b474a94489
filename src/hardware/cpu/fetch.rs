//! Bus access helpers: every read or write here moves simulated time forward
//! by one machine cycle, and due scheduler events run before the access
//! itself. That is the whole timing model in one place.

use crate::hardware::cpu::Cpu;
use crate::hardware::mmu::MemoryMapper;

impl<M: MemoryMapper> Cpu<M> {
    /// Pass one machine cycle without a bus access.
    pub fn add_cycles(&mut self) {
        self.frame_finished |= self.mmu.do_m_cycle();
    }

    /// Read the next opcode, advance the PC, and call the execute function
    /// for a prefix opcode.
    pub fn cb_prefix_call(&mut self) {
        self.opcode = self.get_instr_u8();
        self.execute_prefix(self.opcode);
    }

    /// Based on the current `PC` will interpret the value at the location in
    /// memory as a `u8` value.
    ///
    /// Advances the `PC` by 1.
    pub fn get_instr_u8(&mut self) -> u8 {
        let result = self.read_byte_cycle(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);

        result
    }

    /// Based on the current `PC` will interpret the `current` and `current + 1`
    /// bytes at those locations in memory as a `u16` value resolved as little
    /// endian (least significant byte first).
    ///
    /// Advances the `PC` by 2.
    pub fn get_instr_u16(&mut self) -> u16 {
        let least_s_byte = self.get_instr_u8() as u16;
        let most_s_byte = self.get_instr_u8() as u16;

        (most_s_byte << 8) | least_s_byte
    }

    /// Read a byte from the `MMU` and pass one machine cycle.
    pub fn read_byte_cycle(&mut self, address: u16) -> u8 {
        self.add_cycles();
        self.mmu.read_byte(address)
    }

    /// Set a byte in the `MMU` and pass one machine cycle.
    pub fn write_byte_cycle(&mut self, address: u16, value: u8) {
        self.add_cycles();
        self.mmu.write_byte(address, value);
    }

    /// Read a `short` from the `MMU` and pass two machine cycles.
    pub fn read_short_cycle(&mut self, address: u16) -> u16 {
        let least_s_byte = self.read_byte_cycle(address) as u16;
        let most_s_byte = self.read_byte_cycle(address.wrapping_add(1)) as u16;

        (most_s_byte << 8) | least_s_byte
    }

    /// Set a `short` in the `MMU` and pass two machine cycles.
    pub fn write_short_cycle(&mut self, address: u16, value: u16) {
        self.write_byte_cycle(address, (value & 0xFF) as u8); // Least significant byte first.
        self.write_byte_cycle(address.wrapping_add(1), (value >> 8) as u8);
    }
}
