use bitflags::*;

/// The five interrupt sources, ordered by dispatch priority.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum Interrupt {
    Vblank = 0b0000_0001,
    LcdStat = 0b0000_0010,
    Timer = 0b0000_0100,
    Serial = 0b0000_1000,
    Joypad = 0b0001_0000,
}

impl Interrupt {
    pub fn iter() -> impl Iterator<Item = Interrupt> {
        use crate::io::interrupts::Interrupt::{Joypad, LcdStat, Serial, Timer, Vblank};
        [Vblank, LcdStat, Timer, Serial, Joypad].iter().copied()
    }

    /// The fixed vector this interrupt jumps to when dispatched.
    pub fn vector(self) -> u16 {
        match self {
            Interrupt::Vblank => 0x0040,
            Interrupt::LcdStat => 0x0048,
            Interrupt::Timer => 0x0050,
            Interrupt::Serial => 0x0058,
            Interrupt::Joypad => 0x0060,
        }
    }
}

bitflags! {
    #[derive(Default)]
    pub struct InterruptFlags: u8 {
        /// V-Blank
        const VBLANK = 0b0000_0001;
        /// LCD Stat
        const LCD    = 0b0000_0010;
        /// Timer
        const TIMER  = 0b0000_0100;
        /// Serial
        const SERIAL = 0b0000_1000;
        /// Joypad
        const JOYPAD = 0b0001_0000;
        /// The upper three bits exist in IE but have no interrupt source.
        const UNUSED = 0b1110_0000;
    }
}

/// IE/IF register pair. IME itself lives in the CPU since it is toggled at
/// instruction boundaries only.
#[derive(Default, Debug, Clone)]
pub struct Interrupts {
    pub interrupt_enable: InterruptFlags,
    pub interrupt_flag: InterruptFlags,
}

impl Interrupts {
    #[inline]
    pub fn insert_interrupt(&mut self, interrupt: InterruptFlags) {
        self.interrupt_flag.insert(interrupt);
    }

    /// IE keeps all eight written bits, including the three unused ones.
    pub fn overwrite_ie(&mut self, value: u8) {
        self.interrupt_enable = InterruptFlags::from_bits_truncate(value);
    }

    /// Writes to IF clear the upper three bits.
    pub fn overwrite_if(&mut self, value: u8) {
        self.interrupt_flag = InterruptFlags::from_bits_truncate(value & 0x1F);
    }

    pub fn read_ie(&self) -> u8 {
        self.interrupt_enable.bits()
    }

    /// The unused upper bits of IF always read as 1.
    pub fn read_if(&self) -> u8 {
        0xE0 | self.interrupt_flag.bits()
    }

    /// The set of interrupts that are both requested and enabled.
    #[inline]
    pub fn pending(&self) -> InterruptFlags {
        let mask = self.interrupt_flag & self.interrupt_enable;
        InterruptFlags::from_bits_truncate(mask.bits() & 0x1F)
    }

    /// Acknowledge `interrupt` by clearing its IF bit.
    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        self.interrupt_flag
            .remove(InterruptFlags::from_bits_truncate(interrupt as u8));
    }
}
