use itertools::Itertools;

use crate::emulator::GameBoyModel;
use crate::hardware::apu::{
    Apu, APU_MEM_END, APU_MEM_START, PCM12_REGISTER, PCM34_REGISTER, WAVE_SAMPLE_END, WAVE_SAMPLE_START,
};
use crate::hardware::cartridge::Cartridge;
use crate::hardware::mmu::cgb_mem::{HdmaRegister, SpeedSwitch};
use crate::hardware::mmu::dma::OamDma;
use crate::hardware::mmu::hram::Hram;
use crate::hardware::mmu::wram::Wram;
use crate::hardware::ppu::memory_binds::*;
use crate::hardware::ppu::tiledata::{TILE_BLOCK_0_START, TILE_BLOCK_2_END};
use crate::hardware::ppu::{Ppu, MODE_2_DURATION, SCANLINE_DURATION};
use crate::io::event_log::{EventLog, LogCategory};
use crate::io::interrupts::Interrupts;
use crate::io::io_registers::UndocumentedRegisters;
use crate::io::joypad::{Joypad, JOYPAD_REGISTER};
use crate::io::serial::{SerialPort, SIO_CONT, SIO_DATA};
use crate::io::timer::*;
use crate::scheduler::{EventType, Scheduler};
use crate::EmulatorOptions;

pub mod cgb_mem;
pub mod dma;
pub mod hram;
pub mod wram;

/// 16 KB ROM bank, usually 00. From cartridge, read-only.
pub const ROM_BANK_00_START: u16 = 0x0000;
pub const ROM_BANK_00_END: u16 = 0x3FFF;
/// 16 KB ROM Bank 01~NN. From cartridge, switchable bank via MBC. Read-only.
pub const ROM_BANK_NN_START: u16 = 0x4000;
pub const ROM_BANK_NN_END: u16 = 0x7FFF;
/// 8 KB of VRAM, only bank 0 in Non-CGB mode. Switchable bank 0/1 in CGB mode.
pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9FFF;
/// 8 KB of external RAM, in cartridge, switchable banks. May hold save data.
pub const EXTERNAL_RAM_START: u16 = 0xA000;
pub const EXTERNAL_RAM_END: u16 = 0xBFFF;
/// 4 KB Work RAM bank 0.
pub const WRAM_BANK_00_START: u16 = 0xC000;
pub const WRAM_BANK_00_END: u16 = 0xCFFF;
/// 4 KB Work RAM bank 1~N. Only bank 1 in Non-CGB mode, switchable 1~7 via SVBK in CGB mode.
pub const WRAM_BANK_NN_START: u16 = 0xD000;
pub const WRAM_BANK_NN_END: u16 = 0xDFFF;
/// Mirror of C000~DDFF (echo RAM).
pub const ECHO_RAM_START: u16 = 0xE000;
pub const ECHO_RAM_END: u16 = 0xFDFF;
/// Sprite attribute table (OAM).
pub const OAM_ATTRIBUTE_START: u16 = 0xFE00;
pub const OAM_ATTRIBUTE_END: u16 = 0xFE9F;
/// Not usable.
pub const NOT_USABLE_START: u16 = 0xFEA0;
pub const NOT_USABLE_END: u16 = 0xFEFF;
/// I/O registers.
pub const IO_START: u16 = 0xFF00;
pub const IO_END: u16 = 0xFF7F;
/// High RAM.
pub const HRAM_START: u16 = 0xFF80;
pub const HRAM_END: u16 = 0xFFFE;

/// The flag used to signal that an interrupt is pending.
pub const INTERRUPTS_FLAG: u16 = 0xFF0F;
/// Interrupts Enable Register (IE).
pub const INTERRUPTS_ENABLE: u16 = 0xFFFF;

pub const CGB_PREPARE_SWITCH: u16 = 0xFF4D;
/// Specifies the higher byte of the HDMA source address. Write only.
pub const CGB_HDMA_1: u16 = 0xFF51;
/// Lower byte of the HDMA source address, aligned to 0x10. Write only.
pub const CGB_HDMA_2: u16 = 0xFF52;
/// Higher byte of the HDMA destination, always within VRAM. Write only.
pub const CGB_HDMA_3: u16 = 0xFF53;
/// Lower byte of the HDMA destination, aligned to 0x10. Write only.
pub const CGB_HDMA_4: u16 = 0xFF54;
/// Length/mode of the HDMA transfer; writing starts (or cancels) it.
pub const CGB_HDMA_5: u16 = 0xFF55;
/// Infrared communications port, not connected to anything here.
pub const CGB_RP: u16 = 0xFF56;
/// Work RAM bank switching.
pub const CGB_WRAM_BANK: u16 = 0xFF70;

/// The value to return for an invalid read.
pub const INVALID_READ: u8 = 0xFF;

/// How long a CGB speed switch stalls the CPU.
const SPEED_SWITCH_PAUSE: i64 = 8200;

/// Memory interface the CPU talks to; every access costs one machine cycle,
/// accounted for through `do_m_cycle`.
pub trait MemoryMapper {
    fn read_byte(&mut self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);
    /// Perform one M-cycle (4 cycles) on all components of the system.
    /// Returns `true` if a frame was completed during this cycle.
    fn do_m_cycle(&mut self) -> bool;
    fn interrupts(&self) -> &Interrupts;
    fn interrupts_mut(&mut self) -> &mut Interrupts;
    fn model(&self) -> GameBoyModel;
    /// Whether KEY1 has been armed for a speed switch.
    fn speed_switch_armed(&self) -> bool;
    /// Toggle the speed and stall for the switch duration.
    /// Returns `true` if a frame was completed while stalled.
    fn execute_speed_switch(&mut self) -> bool;
    /// Whether a STOP should end (DMG: any selected joypad line held).
    fn should_wake_from_stop(&self) -> bool;
}

pub struct Memory {
    pub cartridge: Cartridge,
    pub scheduler: Scheduler,
    pub model: GameBoyModel,
    pub speed_switch: SpeedSwitch,
    pub hdma: HdmaRegister,

    pub ppu: Ppu,
    pub apu: Apu,
    pub oam_dma: OamDma,
    pub hram: Hram,
    pub wram: Wram,

    pub joypad: Joypad,
    pub timers: TimerRegisters,
    pub serial: SerialPort,
    pub interrupts: Interrupts,
    pub undocumented: UndocumentedRegisters,
    pub event_log: EventLog,
}

impl Memory {
    pub fn new(rom: &[u8], model: GameBoyModel, options: &EmulatorOptions) -> Result<Self, crate::EmulatorError> {
        let cartridge = Cartridge::new(rom, options.saved_ram.as_deref())?;
        let div_seed: u16 = if model.is_dmg() { 0xABCC } else { 0x1EA0 };

        let mut timers = TimerRegisters::default();
        timers.system_clock = div_seed;

        Ok(Memory {
            ppu: Ppu::new(model, options.colors, cartridge.cartridge_header()),
            apu: Apu::new(model, div_seed),
            oam_dma: OamDma::new(model.is_cgb()),
            cartridge,
            scheduler: Scheduler::new(),
            model,
            speed_switch: SpeedSwitch::new(),
            hdma: HdmaRegister::new(),
            hram: Hram::new(),
            wram: Wram::new(),
            joypad: Joypad::new(),
            timers,
            serial: SerialPort::new(),
            interrupts: Interrupts::default(),
            undocumented: UndocumentedRegisters::default(),
            event_log: EventLog::new(&options.log_categories),
        })
    }

    pub fn read_byte(&mut self, address: u16) -> u8 {
        // While OAM DMA runs, reads on the bus it occupies observe the byte
        // the DMA is currently moving.
        if self.oam_dma.conflicts_with(address, self.model.is_cgb()) {
            let source = self.oam_dma.current_source();
            return self.dma_read_byte(source);
        }

        match address {
            ROM_BANK_00_START..=ROM_BANK_00_END => self.cartridge.read_0000_3fff(address),
            ROM_BANK_NN_START..=ROM_BANK_NN_END => self.cartridge.read_4000_7fff(address),
            VRAM_START..=VRAM_END => self.read_vram_byte(address),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read_external_ram(address),
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.read_bank_0(address),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.read_bank_n(address),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.read_echo_ram(address),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END => self.ppu.get_oam_byte(address),
            NOT_USABLE_START..=NOT_USABLE_END => self.non_usable_call(address),
            IO_START..=IO_END => self.read_io_byte(address),
            HRAM_START..=HRAM_END => self.hram.read_byte(address),
            INTERRUPTS_ENABLE => self.interrupts.read_ie(),
        }
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        match address {
            ROM_BANK_00_START..=ROM_BANK_NN_END => {
                self.log_event(LogCategory::Memory, || {
                    format!("MBC control write {:#06X} = {:#04X}", address, value)
                });
                let clock = self.scheduler.current_time;
                self.cartridge.write_control(address, value, clock);
            }
            VRAM_START..=VRAM_END => self.write_vram_byte(address, value),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                let clock = self.scheduler.current_time;
                self.cartridge.write_external_ram(address, value, clock);
            }
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.write_bank_0(address, value),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.write_bank_n(address, value),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.write_echo_ram(address, value),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END => self.ppu.set_oam_byte(address, value),
            NOT_USABLE_START..=NOT_USABLE_END => {
                log::trace!("Write to non-usable memory: {:#06X}", address)
            }
            IO_START..=IO_END => self.write_io_byte(address, value),
            HRAM_START..=HRAM_END => self.hram.set_byte(address, value),
            INTERRUPTS_ENABLE => {
                self.log_event(LogCategory::Interrupts, || format!("IE = {:#04X}", value));
                self.interrupts.overwrite_ie(value);
            }
        }
    }

    fn read_vram_byte(&mut self, address: u16) -> u8 {
        match address {
            TILE_BLOCK_0_START..=TILE_BLOCK_2_END => self.ppu.get_tile_byte(address),
            _ => self.ppu.get_tilemap_byte(address),
        }
    }

    fn write_vram_byte(&mut self, address: u16, value: u8) {
        match address {
            TILE_BLOCK_0_START..=TILE_BLOCK_2_END => self.ppu.set_tile_byte(address, value),
            _ => self.ppu.set_tilemap_byte(address, value),
        }
    }

    /// Specific method for all reads of the I/O registers.
    fn read_io_byte(&mut self, address: u16) -> u8 {
        let speed_shift = self.speed_switch.speed_shift();
        match address {
            JOYPAD_REGISTER => self.joypad.get_register(),
            SIO_DATA => self.serial.data,
            SIO_CONT => self.serial.read_control(self.model.is_cgb()),
            DIVIDER_REGISTER => self.timers.divider_register(),
            TIMER_COUNTER => self.timers.timer_counter,
            TIMER_MODULO => self.timers.timer_modulo,
            TIMER_CONTROL => self.timers.timer_control.to_bits(),
            INTERRUPTS_FLAG => self.interrupts.read_if(),
            APU_MEM_START..=APU_MEM_END => self.apu.read_register(address, &mut self.scheduler, speed_shift),
            WAVE_SAMPLE_START..=WAVE_SAMPLE_END => {
                self.apu.read_wave_sample(address, &mut self.scheduler, speed_shift)
            }
            LCD_CONTROL_REGISTER => self.ppu.get_lcd_control(),
            LCD_STATUS_REGISTER => self.ppu.get_lcd_status(),
            SCY_REGISTER => self.ppu.get_scy(),
            SCX_REGISTER => self.ppu.get_scx(),
            LY_REGISTER => self.ppu.get_ly(self.scheduler.current_time),
            LYC_REGISTER => self.ppu.get_lyc(),
            DMA_TRANSFER => self.oam_dma.read_register(),
            BG_PALETTE => self.ppu.get_bg_palette(),
            OB_PALETTE_0 => self.ppu.get_oam_palette_0(),
            OB_PALETTE_1 => self.ppu.get_oam_palette_1(),
            WY_REGISTER => self.ppu.get_window_y(),
            WX_REGISTER => self.ppu.get_window_x(),
            CGB_PREPARE_SWITCH if self.model.is_cgb() => self.speed_switch.read_key1(),
            CGB_VRAM_BANK_REGISTER if self.model.is_cgb() => self.ppu.get_vram_bank(),
            CGB_HDMA_1..=CGB_HDMA_4 => INVALID_READ,
            CGB_HDMA_5 if self.model.is_cgb() => self.hdma.hdma5(),
            CGB_BACKGROUND_COLOR_INDEX if self.model.is_cgb() => self.ppu.get_bg_color_palette_index(),
            CGB_BACKGROUND_PALETTE_DATA if self.model.is_cgb() => self.ppu.get_bg_palette_data(),
            CGB_SPRITE_COLOR_INDEX if self.model.is_cgb() => self.ppu.get_sprite_color_palette_index(),
            CGB_OBJECT_PALETTE_DATA if self.model.is_cgb() => self.ppu.get_obj_palette_data(),
            CGB_OBJECT_PRIORITY_MODE if self.model.is_cgb() => self.ppu.get_object_priority(),
            CGB_WRAM_BANK if self.model.is_cgb() => self.wram.read_bank_select(),
            PCM12_REGISTER | PCM34_REGISTER if self.model.is_cgb() => {
                self.apu.read_pcm(address, &mut self.scheduler, speed_shift)
            }
            0xFF72..=0xFF75 => self.undocumented.read_byte(address, self.model.is_cgb()),
            _ => INVALID_READ,
        }
    }

    fn write_io_byte(&mut self, address: u16, value: u8) {
        let speed_shift = self.speed_switch.speed_shift();
        match address {
            JOYPAD_REGISTER => self.joypad.set_register(value),
            SIO_DATA => self.serial.data = value,
            SIO_CONT => {
                self.log_event(LogCategory::Serial, || format!("SC = {:#04X}", value));
                let is_cgb = self.model.is_cgb();
                self.serial.write_control(value, is_cgb, &mut self.scheduler);
            }
            DIVIDER_REGISTER => {
                self.log_event(LogCategory::Timer, || "DIV reset".to_owned());
                // The APU frame sequencer hangs off the DIV counter and has
                // to observe the reset synchronously.
                let div_clock = self.timers.div_clock();
                self.apu.on_div_reset(&mut self.scheduler, speed_shift, div_clock);
                self.timers.set_divider(&mut self.scheduler);
            }
            TIMER_COUNTER => self.timers.set_timer_counter(value, &mut self.scheduler),
            TIMER_MODULO => self.timers.set_tma(value),
            TIMER_CONTROL => {
                self.log_event(LogCategory::Timer, || format!("TAC = {:#04X}", value));
                self.timers.set_timer_control(value, &mut self.scheduler);
            }
            INTERRUPTS_FLAG => {
                self.log_event(LogCategory::Interrupts, || format!("IF = {:#04X}", value));
                self.interrupts.overwrite_if(value);
            }
            APU_MEM_START..=APU_MEM_END => {
                let div_clock = self.timers.div_clock();
                self.apu
                    .write_register(address, value, &mut self.scheduler, speed_shift, div_clock);
            }
            WAVE_SAMPLE_START..=WAVE_SAMPLE_END => {
                self.apu
                    .write_wave_sample(address, value, &mut self.scheduler, speed_shift)
            }
            LCD_CONTROL_REGISTER => {
                self.log_event(LogCategory::LcdRegisters, || format!("LCDC = {:#04X}", value));
                self.ppu.set_lcd_control(value, &mut self.scheduler, speed_shift);
            }
            LCD_STATUS_REGISTER => self.ppu.set_lcd_status(value, &mut self.interrupts),
            SCY_REGISTER => self.ppu.set_scy(value),
            SCX_REGISTER => self.ppu.set_scx(value),
            LY_REGISTER => log::trace!("Ignoring write to LY with value: {:#04X}", value),
            LYC_REGISTER => self.ppu.set_lyc(value, &mut self.interrupts),
            DMA_TRANSFER => {
                self.log_event(LogCategory::LcdOamDma, || format!("DMA = {:#04X}", value));
                self.oam_dma.write_register(value, &mut self.scheduler);
            }
            BG_PALETTE => self.ppu.set_bg_palette(value),
            OB_PALETTE_0 => self.ppu.set_oam_palette_0(value),
            OB_PALETTE_1 => self.ppu.set_oam_palette_1(value),
            WY_REGISTER => self.ppu.set_window_y(value),
            WX_REGISTER => self.ppu.set_window_x(value),
            CGB_PREPARE_SWITCH if self.model.is_cgb() => {
                self.log_event(LogCategory::Clock, || format!("KEY1 = {:#04X}", value));
                self.speed_switch.write_key1(value);
            }
            CGB_VRAM_BANK_REGISTER if self.model.is_cgb() => self.ppu.set_vram_bank(value),
            CGB_HDMA_1 if self.model.is_cgb() => self.hdma.write_hdma1(value),
            CGB_HDMA_2 if self.model.is_cgb() => self.hdma.write_hdma2(value),
            CGB_HDMA_3 if self.model.is_cgb() => self.hdma.write_hdma3(value),
            CGB_HDMA_4 if self.model.is_cgb() => self.hdma.write_hdma4(value),
            CGB_HDMA_5 if self.model.is_cgb() => {
                self.log_event(LogCategory::Hdma, || format!("HDMA5 = {:#04X}", value));
                if self.hdma.write_hdma5(value) {
                    self.gdma_transfer();
                }
            }
            CGB_OBJECT_PRIORITY_MODE if self.model.is_cgb() => self.ppu.set_object_priority(value),
            CGB_BACKGROUND_COLOR_INDEX if self.model.is_cgb() => self.ppu.set_bg_color_palette_index(value),
            CGB_BACKGROUND_PALETTE_DATA if self.model.is_cgb() => self.ppu.set_bg_palette_data(value),
            CGB_SPRITE_COLOR_INDEX if self.model.is_cgb() => self.ppu.set_sprite_color_palette_index(value),
            CGB_OBJECT_PALETTE_DATA if self.model.is_cgb() => self.ppu.set_obj_palette_data(value),
            CGB_WRAM_BANK if self.model.is_cgb() => self.wram.write_bank_select(value),
            0xFF72..=0xFF75 => self.undocumented.write_byte(address, value, self.model.is_cgb()),
            _ => log::trace!("Ignoring IO write {:#06X} = {:#04X}", address, value),
        }
    }

    /// Simply returns 0xFF while also noting the access in the trace log.
    fn non_usable_call(&self, address: u16) -> u8 {
        log::trace!("Read of non-usable memory: {:#06X}", address);
        INVALID_READ
    }

    /// Ticks the scheduler by 4 cycles and executes any events that come up.
    /// Returns true if a frame was completed.
    fn tick_scheduler(&mut self) -> bool {
        let speed_shift = self.speed_switch.speed_shift();
        let mut frame_finished = false;
        self.scheduler.add_cycles(4);

        while let Some(event) = self.scheduler.pop_closest() {
            match event.event_type {
                EventType::None => {
                    // Bootstrap: kick off the PPU line machinery.
                    if self.ppu.lcd_enabled() {
                        self.scheduler.push_full_event(event.update_self(EventType::OamSearch, 0));
                    }
                }
                EventType::OamSearch => {
                    self.ppu.oam_search(&mut self.interrupts, event.timestamp);
                    self.scheduler
                        .push_full_event(event.update_self(EventType::LcdTransfer, MODE_2_DURATION << speed_shift));
                }
                EventType::LcdTransfer => {
                    self.ppu.lcd_transfer(&mut self.interrupts);
                    self.scheduler
                        .push_full_event(event.update_self(EventType::Hblank, self.ppu.mode3_length() << speed_shift));
                }
                EventType::Hblank => {
                    self.ppu.hblank(&mut self.interrupts);

                    // HDMA moves one block at the start of every visible h-blank.
                    if self.hdma.hblank_step_pending() && self.ppu.current_line() < 144 {
                        self.scheduler.push_event(EventType::HdmaStep, event.timestamp);
                    }

                    let remaining =
                        (SCANLINE_DURATION - MODE_2_DURATION - self.ppu.mode3_length()) << speed_shift;
                    if self.ppu.current_line() == 143 {
                        self.scheduler
                            .push_full_event(event.update_self(EventType::Vblank, remaining));
                    } else {
                        self.scheduler
                            .push_full_event(event.update_self(EventType::OamSearch, remaining));
                    }
                }
                EventType::Vblank => {
                    self.ppu.vblank(&mut self.interrupts, event.timestamp);
                    self.scheduler
                        .push_full_event(event.update_self(EventType::VblankWait, SCANLINE_DURATION << speed_shift));
                }
                EventType::VblankWait => {
                    if self.ppu.vblank_wait(&mut self.interrupts, event.timestamp) {
                        frame_finished = true;
                        self.scheduler
                            .push_full_event(event.update_self(EventType::OamSearch, 0));
                    } else {
                        self.scheduler
                            .push_full_event(event.update_self(EventType::VblankWait, SCANLINE_DURATION << speed_shift));
                    }
                }
                EventType::TimerOverflow => {
                    self.timers.handle_overflow(&mut self.scheduler, &mut self.interrupts)
                }
                EventType::TimerPostOverflow => self.timers.handle_post_overflow(),
                EventType::OamDmaStart => {
                    let source = self.oam_dma.start(event.timestamp);
                    self.ppu.set_oam_dma_ongoing(true);
                    self.log_event(LogCategory::LcdOamDma, || {
                        format!("OAM DMA started from {:#06X}", source)
                    });
                }
                EventType::HdmaStep => self.hdma_step(),
                EventType::SerialTransferComplete => {
                    self.log_event(LogCategory::Serial, || "serial transfer complete".to_owned());
                    self.serial.transfer_complete(&mut self.interrupts);
                }
                EventType::SpeedSwitchDone => {
                    let double_speed = self.speed_switch.double_speed;
                    self.log_event(LogCategory::Clock, move || {
                        format!("speed switch done, double speed: {}", double_speed)
                    });
                }
            };
        }
        frame_finished
    }

    /// General purpose DMA: the whole block in one burst, CPU stalled.
    fn gdma_transfer(&mut self) {
        let (size, source, destination) = (
            self.hdma.transfer_size(),
            self.hdma.source_address,
            self.hdma.destination_address,
        );
        self.log_event(LogCategory::Hdma, move || {
            format!("GDMA of {:#06X} bytes from {:#06X} to {:#06X}", size, source, destination)
        });

        while self.hdma.transfer_ongoing {
            self.copy_hdma_block();
            // The CPU sits still for 8 machine cycles per block.
            for _ in 0..8 {
                self.do_m_cycle();
            }
        }
    }

    /// One 0x10 byte h-blank DMA step.
    fn hdma_step(&mut self) {
        self.copy_hdma_block();
        for _ in 0..8 {
            self.do_m_cycle();
        }
    }

    fn copy_hdma_block(&mut self) {
        let source = self.hdma.source_address;
        let values = (0..0x10).map(|i| self.read_byte(source.wrapping_add(i))).collect_vec();

        for (i, value) in values.into_iter().enumerate() {
            let destination = self.hdma.destination_address.wrapping_add(i as u16);
            self.write_vram_byte((destination & 0x1FFF) | 0x8000, value);
        }
        self.hdma.advance_block();
    }

    /// Record an entry in the per-instance event log, lazily formatting the
    /// message only when the category is enabled.
    pub fn log_event<F: FnOnce() -> String>(&mut self, category: LogCategory, message: F) {
        if self.event_log.enabled(category) {
            let clock = self.scheduler.current_time;
            let div_clock = self.timers.div_clock();
            self.event_log.push(category, clock, div_clock, message());
        }
    }

    /// Press buttons by public mask, raising the joypad interrupt on edges.
    pub fn press_buttons(&mut self, mask: u8) {
        self.joypad.press_keys(mask, &mut self.interrupts);
    }

    pub fn release_buttons(&mut self, mask: u8) {
        self.joypad.release_keys(mask);
    }

    /// Subtract `offset` from every absolute cycle stored anywhere in the
    /// system, scheduler included.
    pub fn shift_back(&mut self, offset: i64) {
        self.scheduler.shift_back(offset);
        self.ppu.shift_back(offset);
        self.apu.shift_back(offset);
        self.serial.shift_back(offset);
        self.oam_dma.shift_back(offset);
        self.cartridge.shift_back(offset);
    }
}

impl MemoryMapper for Memory {
    fn read_byte(&mut self, address: u16) -> u8 {
        Memory::read_byte(self, address)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        Memory::write_byte(self, address, value)
    }

    fn do_m_cycle(&mut self) -> bool {
        let frame_finished = self.tick_scheduler();
        // The timer is ticked after the scheduler to make the overflow
        // timings work out for the mooneye tests.
        self.timers.tick_timers(&mut self.scheduler);

        if self.oam_dma.active() {
            self.continue_oam_dma();
        }
        frame_finished
    }

    fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    fn interrupts_mut(&mut self) -> &mut Interrupts {
        &mut self.interrupts
    }

    fn model(&self) -> GameBoyModel {
        self.model
    }

    fn speed_switch_armed(&self) -> bool {
        self.model.is_cgb() && self.speed_switch.should_switch()
    }

    fn execute_speed_switch(&mut self) -> bool {
        self.speed_switch.toggle_speed();
        let double_speed = self.speed_switch.double_speed;
        self.log_event(LogCategory::Clock, move || {
            format!("speed switch started, double speed: {}", double_speed)
        });
        self.scheduler.push_relative(EventType::SpeedSwitchDone, SPEED_SWITCH_PAUSE);

        let mut frame_finished = false;
        for _ in 0..SPEED_SWITCH_PAUSE / 4 {
            frame_finished |= self.do_m_cycle();
        }
        frame_finished
    }

    fn should_wake_from_stop(&self) -> bool {
        self.joypad.any_selected_line_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::ppu::Mode;
    use crate::EmulatorOptionsBuilder;

    fn test_rom(cartridge_type: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x147] = cartridge_type;
        rom
    }

    fn test_memory(model: GameBoyModel, rom: &[u8]) -> Memory {
        let options = EmulatorOptionsBuilder::new().with_model(model).build();
        Memory::new(rom, model, &options).unwrap()
    }

    fn run_m_cycles(memory: &mut Memory, cycles: i64) {
        for _ in 0..cycles {
            memory.do_m_cycle();
        }
    }

    #[test]
    fn echo_ram_reads_through_to_wram() {
        let mut memory = test_memory(GameBoyModel::Dmg, &test_rom(0x00));
        memory.write_byte(0xC100, 0x42);
        assert_eq!(memory.read_byte(0xE100), 0x42);
    }

    #[test]
    fn oam_dma_blocks_the_source_bus() {
        let mut memory = test_memory(GameBoyModel::Dmg, &test_rom(0x00));
        for i in 0..160 {
            memory.write_byte(0xC000 + i, i as u8);
        }
        // Reference data in VRAM to show the video bus stays usable; LCD off
        // so VRAM is always accessible.
        memory.write_byte(LCD_CONTROL_REGISTER, 0x11);
        memory.write_byte(0x8000, 0x77);

        memory.write_byte(DMA_TRANSFER, 0xC0);
        assert_eq!(memory.read_byte(DMA_TRANSFER), 0xC0);

        // Two machine cycles of start-up delay.
        run_m_cycles(&mut memory, 2);

        for machine_cycle in 0..159_u16 {
            run_m_cycles(&mut memory, 1);
            let expected = (machine_cycle + 1).min(159) as u8;
            // The external bus (WRAM, ROM, cart RAM) echoes the DMA byte...
            assert_eq!(memory.read_byte(0xC000), expected, "cycle {}", machine_cycle);
            assert_eq!(memory.read_byte(0xD123), expected, "cycle {}", machine_cycle);
            // ...while the video bus reads normally.
            assert_eq!(memory.read_byte(0x8000), 0x77);
        }

        // Transfer finished: the bus is released and OAM holds the data.
        run_m_cycles(&mut memory, 2);
        assert_eq!(memory.read_byte(0xC000), 0x00);
        assert_eq!(memory.read_byte(0xFE00), 0x00);
        assert_eq!(memory.read_byte(0xFE9F), 159);
    }

    #[test]
    fn oam_dma_source_above_dfff_wraps_into_wram() {
        let mut memory = test_memory(GameBoyModel::Dmg, &test_rom(0x00));
        memory.write_byte(LCD_CONTROL_REGISTER, 0x11);
        memory.write_byte(0xC005, 0xAB);

        memory.write_byte(DMA_TRANSFER, 0xE0);
        run_m_cycles(&mut memory, 2 + 161);

        assert_eq!(memory.read_byte(0xFE05), 0xAB);
    }

    #[test]
    fn cpu_oam_writes_are_dropped_during_dma() {
        let mut memory = test_memory(GameBoyModel::Dmg, &test_rom(0x00));
        memory.write_byte(LCD_CONTROL_REGISTER, 0x11);
        memory.write_byte(0xC000, 0x12);

        memory.write_byte(DMA_TRANSFER, 0xC0);
        run_m_cycles(&mut memory, 4);
        memory.write_byte(0xFE00, 0x99);

        run_m_cycles(&mut memory, 160);
        assert_eq!(memory.read_byte(0xFE00), 0x12);
    }

    #[test]
    fn gdma_transfers_full_burst() {
        let mut memory = test_memory(GameBoyModel::CgbAbcd, &test_rom(0x00));
        memory.write_byte(LCD_CONTROL_REGISTER, 0x11);
        for i in 0..0x800_u16 {
            memory.write_byte(0xC000 + i, (i & 0xFF) as u8);
        }

        memory.write_byte(CGB_HDMA_1, 0xC0);
        memory.write_byte(CGB_HDMA_2, 0x00);
        memory.write_byte(CGB_HDMA_3, 0x00);
        memory.write_byte(CGB_HDMA_4, 0x00);
        // Length 0x7F => 0x80 blocks => 2048 bytes.
        memory.write_byte(CGB_HDMA_5, 0x7F);

        assert_eq!(memory.read_byte(CGB_HDMA_5), 0xFF);
        for i in (0..0x800_u16).step_by(97) {
            assert_eq!(memory.read_byte(0x8000 + i), (i & 0xFF) as u8, "offset {}", i);
        }
    }

    #[test]
    fn vblank_cadence_from_cold_boot() {
        let mut memory = test_memory(GameBoyModel::Dmg, &test_rom(0x00));
        let mut frames = 0;
        // Slightly over one frame: exactly one v-blank interrupt and one
        // completed frame.
        for _ in 0..(70224 + 456) / 4 {
            if memory.do_m_cycle() {
                frames += 1;
            }
        }

        assert_eq!(frames, 1);
        assert!(memory.interrupts.interrupt_flag.contains(crate::io::interrupts::InterruptFlags::VBLANK));
        assert_eq!(memory.ppu.frame_id(), 1);
    }

    fn run_to(memory: &mut Memory, target: i64) {
        while memory.scheduler.current_time < target {
            memory.do_m_cycle();
        }
    }

    #[test]
    fn ppu_mode_cycles_through_scanline() {
        let mut memory = test_memory(GameBoyModel::Dmg, &test_rom(0x00));

        run_to(&mut memory, 4);
        assert_eq!(memory.ppu.current_mode(), Mode::OamSearch);

        // Mode 3 starts after the 80 clock OAM scan.
        run_to(&mut memory, MODE_2_DURATION + 4);
        assert_eq!(memory.ppu.current_mode(), Mode::LcdTransfer);

        // Plain line: no sprites, no window, SCX 0.
        let mode3_length = memory.ppu.mode3_length();
        run_to(&mut memory, MODE_2_DURATION + mode3_length + 4);
        assert_eq!(memory.ppu.current_mode(), Mode::Hblank);

        // Wrap to the next line.
        run_to(&mut memory, SCANLINE_DURATION + 4);
        assert_eq!(memory.ppu.current_mode(), Mode::OamSearch);
        assert_eq!(memory.ppu.current_line(), 1);
    }

    #[test]
    fn serial_transfer_raises_interrupt_after_4096_cycles() {
        let mut memory = test_memory(GameBoyModel::Dmg, &test_rom(0x00));
        memory.write_byte(SIO_DATA, 0x5A);
        memory.write_byte(SIO_CONT, 0x81);

        run_m_cycles(&mut memory, 4096 / 4 + 1);

        assert_eq!(memory.read_byte(SIO_DATA), 0xFF);
        assert!(memory
            .interrupts
            .interrupt_flag
            .contains(crate::io::interrupts::InterruptFlags::SERIAL));
    }
}
