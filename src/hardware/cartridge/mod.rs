use crate::hardware::cartridge::header::{CartridgeHeader, MINIMAL_ROM_SIZE};
use crate::hardware::cartridge::mbc::{decode_cartridge_type, Mbc};
use crate::hardware::cartridge::rtc::is_rtc_register;
use crate::hardware::mmu::INVALID_READ;
use crate::EmulatorError;

pub mod header;
pub mod mbc;
pub mod rtc;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;
/// MBC2 has 512 half-bytes of built-in RAM instead of external banks.
pub const MBC2_RAM_SIZE: usize = 0x200;

/// The logo every licensed cartridge repeats at 0x104; finding it several
/// times at 0x40000 strides marks an MBC1 multi-cart.
const NINTENDO_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99,
    0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];

/// The cartridge: ROM, optional (battery backed) RAM and the bank controller.
///
/// Bank switching is resolved eagerly into byte offsets so the read path is a
/// single indexed load.
pub struct Cartridge {
    header: CartridgeHeader,
    mbc: Mbc,
    has_battery: bool,
    ram_enabled: bool,
    num_rom_banks: u16,
    num_ram_banks: u16,
    rom: Vec<u8>,
    ram: Vec<u8>,
    rom_0000_offset: usize,
    rom_4000_offset: usize,
    ram_offset: usize,
}

impl Cartridge {
    pub fn new(rom: &[u8], saved_ram: Option<&[u8]>) -> Result<Self, EmulatorError> {
        if rom.len() < MINIMAL_ROM_SIZE {
            return Err(EmulatorError::BadCartridgeHeader);
        }

        let header = CartridgeHeader::new(rom);
        let (mut mbc, has_battery) =
            decode_cartridge_type(header.cartridge_type).ok_or(EmulatorError::BadCartridgeHeader)?;

        if let Mbc::Mbc1 { multicart, .. } = &mut mbc {
            *multicart = is_multicart_rom(rom);
        }

        let num_rom_banks = num_rom_banks(header.rom_size);
        let num_ram_banks = num_ram_banks(header.ram_size);

        // Pad the ROM up to a full power-of-two bank count so that wrapped
        // bank selections always land inside the buffer.
        let mut rom_data = rom.to_vec();
        rom_data.resize(num_rom_banks as usize * ROM_BANK_SIZE, INVALID_READ);

        let ram_len = match mbc {
            Mbc::Mbc2 => MBC2_RAM_SIZE,
            _ => num_ram_banks as usize * RAM_BANK_SIZE,
        };

        log::info!(
            "Loaded cartridge '{}': type {:#04X}, {} ROM bank(s), {} RAM bank(s), battery: {}",
            header.display_title(),
            header.cartridge_type,
            num_rom_banks,
            num_ram_banks,
            has_battery
        );

        let mut result = Cartridge {
            header,
            mbc,
            has_battery,
            ram_enabled: false,
            num_rom_banks,
            num_ram_banks,
            rom: rom_data,
            ram: vec![0; ram_len],
            rom_0000_offset: 0,
            rom_4000_offset: ROM_BANK_SIZE,
            ram_offset: 0,
        };

        if let Some(saved) = saved_ram {
            result.set_battery_ram(saved);
        }

        Ok(result)
    }

    pub fn cartridge_header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn has_battery(&self) -> bool {
        self.has_battery
    }

    #[inline]
    pub fn read_0000_3fff(&self, address: u16) -> u8 {
        self.rom[self.rom_0000_offset + address as usize]
    }

    #[inline]
    pub fn read_4000_7fff(&self, address: u16) -> u8 {
        self.rom[self.rom_4000_offset + (address & 0x3FFF) as usize]
    }

    pub fn read_external_ram(&self, address: u16) -> u8 {
        if !self.ram_enabled {
            return INVALID_READ;
        }
        match &self.mbc {
            // The 512x4bit RAM is echoed through the whole window and the
            // upper nibble always reads high.
            Mbc::Mbc2 => self.ram[(address & 0x1FF) as usize] | 0xF0,
            Mbc::Mbc3Rtc(rtc) if is_rtc_register(rtc.mapped_register) => rtc.read_mapped(),
            // TODO: accelerometer and EEPROM, see `Mbc::Mbc7`.
            Mbc::Mbc7 => INVALID_READ,
            _ if self.num_ram_banks == 0 => INVALID_READ,
            _ => self.ram[self.ram_offset + (address & 0x1FFF) as usize],
        }
    }

    pub fn write_external_ram(&mut self, address: u16, value: u8, clock: i64) {
        if !self.ram_enabled {
            return;
        }
        match &mut self.mbc {
            Mbc::Mbc2 => self.ram[(address & 0x1FF) as usize] = value | 0xF0,
            Mbc::Mbc3Rtc(rtc) if is_rtc_register(rtc.mapped_register) => rtc.write_mapped(value, clock),
            Mbc::Mbc7 => {}
            _ if self.num_ram_banks == 0 => {}
            _ => self.ram[self.ram_offset + (address & 0x1FFF) as usize] = value,
        }
    }

    /// A write to the 0x0000-0x7FFF region, which configures the controller.
    pub fn write_control(&mut self, address: u16, value: u8, clock: i64) {
        match self.mbc {
            Mbc::None => {
                log::trace!("Ignoring control write {:#06X} = {:#04X} without MBC", address, value)
            }
            Mbc::Mbc1 {
                mut bank1,
                mut bank2,
                mut mode1,
                multicart,
            } => {
                match address & 0x6000 {
                    0x0000 => self.set_cart_ram_enabled(value),
                    // Bank 0 can never be selected directly through bank1.
                    0x2000 => bank1 = if value & 0x1F == 0 { value.wrapping_add(1) } else { value },
                    0x4000 => bank2 = value,
                    // Mode 0: bank2 affects only 0x4000-0x7FFF.
                    // Mode 1: bank2 also affects 0x0000-0x3FFF and the RAM bank.
                    _ => mode1 = value & 0x01 != 0,
                }

                let high_bits = ((bank2 & 0x03) as u16) << if multicart { 4 } else { 5 };
                let low_bank = if mode1 { high_bits } else { 0 };
                let high_bank = high_bits + (bank1 & if multicart { 0x0F } else { 0x1F }) as u16;

                self.set_rom_banks(low_bank, high_bank);
                self.set_ram_bank(if mode1 { (bank2 & 0x03) as u16 } else { 0 });
                self.mbc = Mbc::Mbc1 {
                    bank1,
                    bank2,
                    mode1,
                    multicart,
                };
            }
            Mbc::Mbc2 => {
                // Writes to 0x4000-0x7FFF have no effect; bit 8 of the
                // address selects between RAM enable and ROM bank.
                if address < 0x4000 {
                    if address & 0x100 == 0 {
                        self.set_cart_ram_enabled(value);
                    } else {
                        let bank = (value & 0x0F) as u16;
                        self.set_rom_banks(0, if bank == 0 { 1 } else { bank });
                    }
                }
            }
            Mbc::Mbc3 => self.mbc3_control_write(address, value),
            Mbc::Mbc3Rtc(_) => match address & 0x6000 {
                0x4000 => {
                    if let Mbc::Mbc3Rtc(rtc) = &mut self.mbc {
                        rtc.mapped_register = value;
                    }
                    if !is_rtc_register(value) {
                        self.set_ram_bank((value & 0x03) as u16);
                    }
                }
                0x6000 => {
                    if let Mbc::Mbc3Rtc(rtc) = &mut self.mbc {
                        rtc.write_latch(value, clock);
                    }
                }
                _ => self.mbc3_control_write(address, value),
            },
            Mbc::Mbc5 {
                mut bank_2000,
                mut bank_3000,
                rumble,
            } => {
                let mut value = value;
                match address & 0x7000 {
                    0x0000 | 0x1000 => self.set_cart_ram_enabled(value),
                    0x2000 => bank_2000 = value,
                    0x3000 => bank_3000 = value,
                    0x4000 | 0x5000 => {
                        // The rumble motor consumes bit 3 of the RAM bank select.
                        if rumble {
                            value &= !0x08;
                        }
                        self.set_ram_bank((value & 0x0F) as u16);
                    }
                    _ => {}
                }
                // MBC5 can genuinely map bank 0 into 0x4000-0x7FFF.
                self.set_rom_banks(0, (((bank_3000 & 0x01) as u16) << 8) | bank_2000 as u16);
                self.mbc = Mbc::Mbc5 {
                    bank_2000,
                    bank_3000,
                    rumble,
                };
            }
            Mbc::Mbc7 => {
                if address & 0x6000 == 0x0000 {
                    self.set_cart_ram_enabled(value);
                }
            }
        }
    }

    fn mbc3_control_write(&mut self, address: u16, value: u8) {
        match address & 0x6000 {
            0x0000 => self.set_cart_ram_enabled(value),
            0x2000 => {
                let bank = (value & 0x7F) as u16;
                self.set_rom_banks(0, if bank == 0 { 1 } else { bank });
            }
            0x4000 => self.set_ram_bank((value & 0x03) as u16),
            _ => {}
        }
    }

    /// Bring a possibly lagging RTC up to date (before saving, for example).
    pub fn update_rtc(&mut self, clock: i64) {
        if let Mbc::Mbc3Rtc(rtc) = &mut self.mbc {
            rtc.update(clock);
        }
    }

    pub fn shift_back(&mut self, offset: i64) {
        if let Mbc::Mbc3Rtc(rtc) = &mut self.mbc {
            rtc.shift_back(offset);
        }
    }

    /// The contents of the battery backed RAM, bank order, no header.
    /// Empty when the cartridge has no battery.
    pub fn battery_ram(&self) -> Vec<u8> {
        if self.has_battery && !self.ram.is_empty() {
            self.ram.clone()
        } else {
            Vec::new()
        }
    }

    /// Restore battery backed RAM. Oversized sources are truncated, short
    /// ones leave the remainder zeroed.
    pub fn set_battery_ram(&mut self, source: &[u8]) {
        if !self.has_battery || self.ram.is_empty() {
            return;
        }
        let bytes_to_copy = source.len().min(self.ram.len());
        self.ram[..bytes_to_copy].copy_from_slice(&source[..bytes_to_copy]);
        for byte in self.ram[bytes_to_copy..].iter_mut() {
            *byte = 0;
        }
    }

    fn set_cart_ram_enabled(&mut self, value: u8) {
        self.ram_enabled = value & 0x0F == 0x0A;
    }

    /// ROM bank count is always a power of two, so wrapping is a mask.
    fn set_rom_banks(&mut self, low_bank: u16, high_bank: u16) {
        let mask = self.num_rom_banks - 1;
        self.rom_0000_offset = (low_bank & mask) as usize * ROM_BANK_SIZE;
        self.rom_4000_offset = (high_bank & mask) as usize * ROM_BANK_SIZE;
    }

    fn set_ram_bank(&mut self, bank: u16) {
        if self.num_ram_banks > 0 {
            self.ram_offset = (bank & (self.num_ram_banks - 1)) as usize * RAM_BANK_SIZE;
        }
    }
}

fn num_rom_banks(rom_size_code: u8) -> u16 {
    match rom_size_code {
        0x01 => 4,
        0x02 => 8,
        0x03 => 16,
        0x04 => 32,
        0x05 => 64,
        0x06 => 128,
        0x07 => 256,
        0x08 => 512,
        _ => 2,
    }
}

fn num_ram_banks(ram_size_code: u8) -> u16 {
    match ram_size_code {
        0x02 => 1,
        0x03 => 4,
        0x04 => 16,
        0x05 => 8,
        _ => 0,
    }
}

/// Multi-cart heuristic borrowed from mooneye-gb: the Nintendo logo appearing
/// at three or more 0x40000 strides means the ROM is a menu plus several
/// games behind one MBC1.
fn is_multicart_rom(rom: &[u8]) -> bool {
    let mut findings = 0;
    let mut offset = 0;

    while offset + 0x134 <= rom.len() {
        if rom[offset + 0x104..offset + 0x134] == NINTENDO_LOGO {
            findings += 1;
        }
        offset += 0x40000;
    }

    findings >= 3
}
