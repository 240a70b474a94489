use crate::hardware::apu::{StereoFrame, PCM_SAMPLING_RATE};
use crate::hardware::cpu::Cpu;
use crate::hardware::mmu::Memory;
use crate::hardware::ppu::palette::Pixel;
use crate::hardware::ppu::FRAMEBUFFER_SIZE;
use crate::io::event_log::LogEntry;
use crate::scheduler::{SHIFT_BACK_OFFSET, SHIFT_BACK_THRESHOLD};
use crate::{EmulatorError, EmulatorOptions};

pub const DMG_CLOCK_SPEED: i32 = 4_194_304;
pub const SCREEN_WIDTH: i16 = 160;
pub const SCREEN_HEIGHT: i16 = 144;
/// One frame is 154 scanlines of 456 cycles each.
pub const CYCLES_PER_FRAME: i32 = 70224;

/// Which device to emulate.
///
/// Picking a specific model is usually only relevant for test roms; end users
/// should rely on auto detection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameBoyModel {
    /// Pick DMG or CGB based on the cartridge CGB flag.
    AutoDetect,
    /// The original monochrome brick.
    Dmg,
    /// Game Boy Color, revisions A through D.
    CgbAbcd,
    /// The final CGB revision, with slightly different PPU/APU edge cases.
    CgbE,
}

impl GameBoyModel {
    pub fn is_dmg(self) -> bool {
        self == GameBoyModel::Dmg
    }

    pub fn is_cgb(self) -> bool {
        matches!(self, GameBoyModel::CgbAbcd | GameBoyModel::CgbE)
    }

    pub fn is_cgb_e(self) -> bool {
        self == GameBoyModel::CgbE
    }
}

/// Part of the CPU state, exposed for evaluating test rom results.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TestInfo {
    /// Whether `LD B,B`, the canonical debug breakpoint, was executed.
    pub ld_b_b: bool,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
}

/// A complete Game Boy.
///
/// Owns every component; the only way time moves forward is [`Emulator::run`].
pub struct Emulator {
    cpu: Cpu<Memory>,
    /// Total amount subtracted from the internal clock by set-backs, so the
    /// externally visible cycle count stays monotonic.
    cycles_shifted: i64,
}

impl Emulator {
    pub fn new(rom: &[u8], options: EmulatorOptions) -> Result<Self, EmulatorError> {
        if rom.len() < 0x150 {
            return Err(EmulatorError::BadCartridgeHeader);
        }

        let model = match options.hardware {
            GameBoyModel::AutoDetect => {
                if matches!(rom[0x143], 0x80 | 0xC0) {
                    GameBoyModel::CgbAbcd
                } else {
                    GameBoyModel::Dmg
                }
            }
            model => model,
        };

        let memory = Memory::new(rom, model, &options)?;
        Ok(Emulator {
            cpu: Cpu::new(memory),
            cycles_shifted: 0,
        })
    }

    /// Run the emulation for (at least) `cycles` clock cycles.
    ///
    /// Returns `true` if a frame was completed during this call. The audio
    /// buffer is discarded on entry, so a host that cares about sound has to
    /// drain it between calls.
    pub fn run(&mut self, cycles: i32) -> bool {
        self.cpu.mmu.apu.clear_audio_buffer();
        if cycles <= 0 {
            return false;
        }

        self.cpu.frame_finished = false;
        let target = self.cpu.mmu.scheduler.current_time + cycles as i64;
        while self.cpu.mmu.scheduler.current_time < target {
            self.cpu.step_cycle();
        }

        // Settle the APU so the PCM buffer covers every emulated cycle.
        let mmu = &mut self.cpu.mmu;
        let speed_shift = mmu.speed_switch.speed_shift();
        mmu.apu.synchronise(&mut mmu.scheduler, speed_shift);

        if self.cpu.mmu.scheduler.current_time >= SHIFT_BACK_THRESHOLD {
            self.cpu.mmu.shift_back(SHIFT_BACK_OFFSET);
            self.cycles_shifted += SHIFT_BACK_OFFSET;
        }

        self.cpu.frame_finished
    }

    /// The cartridge title, restricted to `[A-Za-z0-9_]` with spaces mapped
    /// to underscores.
    pub fn title(&self) -> String {
        self.cpu.mmu.cartridge.cartridge_header().sanitised_title()
    }

    pub fn screen_width(&self) -> i16 {
        SCREEN_WIDTH
    }

    pub fn screen_height(&self) -> i16 {
        SCREEN_HEIGHT
    }

    /// The last fully rendered screen, RGBA with alpha always 0xFF.
    /// Valid until the next call to [`Emulator::run`].
    pub fn screen_front_buffer(&self) -> &[Pixel; FRAMEBUFFER_SIZE] {
        self.cpu.mmu.ppu.screen_buffer.front_buffer()
    }

    /// The PCM samples produced by the last [`Emulator::run`] call.
    pub fn audio_buffer(&self) -> &[StereoFrame] {
        self.cpu.mmu.apu.audio_buffer()
    }

    /// Native sampling rate of [`Emulator::audio_buffer`]; note that this is
    /// not one of the usual host rates, a downsampler is expected downstream.
    pub fn pcm_sampling_rate(&self) -> i32 {
        PCM_SAMPLING_RATE
    }

    pub fn cycles_per_second(&self) -> i32 {
        DMG_CLOCK_SPEED
    }

    /// Total emulated cycles; monotonic for the lifetime of the emulator,
    /// clock set-backs included.
    pub fn emulated_cycles(&self) -> i64 {
        self.cpu.mmu.scheduler.current_time + self.cycles_shifted
    }

    /// A copy of the battery backed cartridge RAM, empty if the cartridge
    /// has no battery.
    pub fn persistent_ram(&self) -> Vec<u8> {
        self.cpu.mmu.cartridge.battery_ram()
    }

    /// Restore battery backed cartridge RAM; a no-op without a battery.
    /// Oversized buffers are truncated, short ones zero-padded.
    pub fn set_persistent_ram(&mut self, source: &[u8]) {
        self.cpu.mmu.cartridge.set_battery_ram(source);
    }

    /// Press the buttons in `mask` (see the `BUTTON_*` constants).
    pub fn buttons_down(&mut self, mask: u8) {
        self.cpu.mmu.press_buttons(mask);
    }

    pub fn buttons_up(&mut self, mask: u8) {
        self.cpu.mmu.release_buttons(mask);
    }

    pub fn test_info(&self) -> TestInfo {
        let registers = &self.cpu.registers;
        TestInfo {
            ld_b_b: self.cpu.ld_b_b_executed,
            a: registers.a,
            b: registers.b,
            c: registers.c,
            d: registers.d,
            e: registers.e,
            h: registers.h,
            l: registers.l,
        }
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        self.cpu.mmu.event_log.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::event_log::LogCategory;
    use crate::io::interrupts::InterruptFlags;
    use crate::io::joypad::{BUTTON_A, BUTTON_START};
    use crate::EmulatorOptionsBuilder;
    use pretty_assertions::assert_eq;

    /// A 32KB ROM with `NOP; JP 0x0150` at the entry point and `program`
    /// starting at 0x0150.
    fn rom_with_program(program: &[u8]) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
        rom[0x150..0x150 + program.len()].copy_from_slice(program);
        rom
    }

    fn emulator_with_program(program: &[u8]) -> Emulator {
        Emulator::new(&rom_with_program(program), EmulatorOptionsBuilder::new().build()).unwrap()
    }

    #[test]
    fn cpu_fib_registers_and_debug_marker() {
        let emulator_program = [
            0x06, 0x03, // LD B,3
            0x0E, 0x05, // LD C,5
            0x16, 0x08, // LD D,8
            0x1E, 0x0D, // LD E,13
            0x26, 0x15, // LD H,21
            0x2E, 0x22, // LD L,34
            0x40, // LD B,B
            0x76, // HALT
        ];
        let mut emulator = emulator_with_program(&emulator_program);
        emulator.run(1_000_000);

        let info = emulator.test_info();
        assert!(info.ld_b_b);
        assert_eq!(info.b, 3);
        assert_eq!(info.c, 5);
        assert_eq!(info.d, 8);
        assert_eq!(info.e, 13);
        assert_eq!(info.h, 21);
        assert_eq!(info.l, 34);
    }

    #[test]
    fn timer_interrupt_dispatches_to_vector_50() {
        let program = [
            0x3E, 0xFF, // LD A,0xFF
            0xE0, 0x05, // LDH (TIMA),A
            0x3E, 0x05, // LD A,0x05 (262144 Hz, enabled)
            0xE0, 0x07, // LDH (TAC),A
            0x3E, 0x04, // LD A,0x04 (timer only)
            0xE0, 0xFF, // LDH (IE),A
            0xFB, // EI
            0x76, // HALT
            0x00, // NOP
        ];
        let mut rom = rom_with_program(&program);
        // Timer vector: INC B; HALT.
        rom[0x50] = 0x04;
        rom[0x51] = 0x76;

        let mut emulator = Emulator::new(&rom, EmulatorOptionsBuilder::new().build()).unwrap();
        emulator.run(600);

        // Exactly one dispatch: B incremented once and IF.2 acknowledged.
        assert_eq!(emulator.test_info().b, 1);
        assert!(!emulator
            .cpu
            .mmu
            .interrupts
            .interrupt_flag
            .contains(InterruptFlags::TIMER));
    }

    #[test]
    fn vblank_cadence_produces_one_frame() {
        let program = [
            0x3E, 0x01, // LD A,1
            0xE0, 0xFF, // LDH (IE),A
            0xFB, // EI
            0x76, // HALT
            0x18, 0xFC, // JR -4 (back to HALT)
        ];
        let mut rom = rom_with_program(&program);
        // V-blank vector: INC B; RETI.
        rom[0x40] = 0x04;
        rom[0x41] = 0xD9;

        let mut emulator = Emulator::new(&rom, EmulatorOptionsBuilder::new().build()).unwrap();
        let frame_produced = emulator.run(CYCLES_PER_FRAME + 456);

        assert!(frame_produced);
        assert_eq!(emulator.test_info().b, 1, "exactly one v-blank interrupt");
        assert_eq!(emulator.cpu.mmu.ppu.frame_id(), 1);
    }

    #[test]
    fn front_buffer_pixels_are_opaque() {
        let mut emulator = emulator_with_program(&[0x76]);
        emulator.run(CYCLES_PER_FRAME + 456);

        let buffer = emulator.screen_front_buffer();
        assert_eq!(buffer.len(), 160 * 144);
        assert!(buffer.iter().all(|pixel| pixel.a == 0xFF));
    }

    #[test]
    fn audio_dc_level_with_channel_one_at_full_volume() {
        let program = [
            0x3E, 0x77, // LD A,0x77 (full master volume)
            0xE0, 0x24, // LDH (NR50),A
            0x3E, 0x11, // LD A,0x11 (channel 1 on both sides)
            0xE0, 0x25, // LDH (NR51),A
            0x3E, 0x80, // LD A,0x80 (duty 2)
            0xE0, 0x11, // LDH (NR11),A
            0x3E, 0xF0, // LD A,0xF0 (volume 15, no decay)
            0xE0, 0x12, // LDH (NR12),A
            0x3E, 0xC1, // LD A,0xC1
            0xE0, 0x13, // LDH (NR13),A
            0x3E, 0x87, // LD A,0x87 (trigger, frequency 0x7C1)
            0xE0, 0x14, // LDH (NR14),A
            0x76, // HALT
        ];
        let mut emulator = emulator_with_program(&program);
        emulator.run(DMG_CLOCK_SPEED / 60);

        let buffer = emulator.audio_buffer();
        assert_eq!(buffer.len() as i64, emulator.emulated_cycles() / 2);

        let average = buffer.iter().map(|frame| (frame.left as i64).abs()).sum::<i64>() / buffer.len() as i64;
        assert!(
            average >= i16::max_value() as i64 / 80,
            "expected an audible DC level, got {}",
            average
        );
    }

    #[test]
    fn persistent_ram_round_trip() {
        let program = [
            0x3E, 0x0A, // LD A,0x0A
            0xEA, 0x00, 0x00, // LD (0x0000),A: enable cartridge RAM
            0x21, 0x00, 0xA0, // LD HL,0xA000
            0x06, 0x00, // LD B,0
            // loop:
            0x78, // LD A,B
            0x22, // LD (HL+),A
            0x04, // INC B
            0x78, // LD A,B
            0xFE, 0x20, // CP 0x20
            0x20, 0xF8, // JR NZ,loop
            0x76, // HALT
        ];
        let mut rom = rom_with_program(&program);
        rom[0x147] = 0x1B; // MBC5 + RAM + battery
        rom[0x149] = 0x03; // 32 KiB of cartridge RAM

        let mut emulator = Emulator::new(&rom, EmulatorOptionsBuilder::new().build()).unwrap();
        emulator.run(100_000);

        let ram = emulator.persistent_ram();
        assert_eq!(ram.len(), 0x8000);
        assert_eq!(&ram[0..32], &(0..32).collect::<Vec<u8>>()[..]);

        // Restoring the same image is the identity.
        emulator.set_persistent_ram(&ram);
        assert_eq!(emulator.persistent_ram(), ram);
    }

    #[test]
    fn run_zero_is_a_no_op() {
        let mut emulator = emulator_with_program(&[0x76]);
        emulator.run(1000);
        let cycles = emulator.emulated_cycles();

        assert!(!emulator.run(0));
        assert_eq!(emulator.emulated_cycles(), cycles);
        assert!(emulator.audio_buffer().is_empty());
    }

    #[test]
    fn buttons_round_trip_and_stop_wakeup() {
        let program = [
            0x3E, 0x10, // LD A,0x10: select the button row
            0xE0, 0x00, // LDH (P1),A
            0x10, 0x00, // STOP
            0x04, // INC B
            0x76, // HALT
        ];
        let mut emulator = emulator_with_program(&program);
        emulator.run(10_000);
        assert_eq!(emulator.test_info().b, 0, "still stopped");

        emulator.buttons_down(BUTTON_A | BUTTON_START);
        emulator.run(10_000);
        assert_eq!(emulator.test_info().b, 1, "woken by joypad");

        emulator.buttons_up(BUTTON_A | BUTTON_START);
        let p1 = emulator.cpu.mmu.joypad.get_register();
        assert_eq!(p1 & 0x0F, 0x0F, "all lines released");
    }

    #[test]
    fn title_is_sanitised() {
        let mut rom = rom_with_program(&[0x76]);
        rom[0x134..0x134 + 11].copy_from_slice(b"POKEMON RED");
        let emulator = Emulator::new(&rom, EmulatorOptionsBuilder::new().build()).unwrap();
        assert_eq!(emulator.title(), "POKEMON_RED");
    }

    #[test]
    fn construction_rejects_bad_roms() {
        assert!(matches!(
            Emulator::new(&[0u8; 0x100], EmulatorOptionsBuilder::new().build()),
            Err(EmulatorError::BadCartridgeHeader)
        ));

        let mut rom = rom_with_program(&[0x76]);
        rom[0x147] = 0xF0;
        assert!(matches!(
            Emulator::new(&rom, EmulatorOptionsBuilder::new().build()),
            Err(EmulatorError::BadCartridgeHeader)
        ));
    }

    #[test]
    fn clock_set_back_keeps_emulated_cycles_stable() {
        let mut emulator = emulator_with_program(&[0x76]);
        emulator.run(10_000);
        let cycles = emulator.emulated_cycles();

        emulator.cpu.mmu.shift_back(8192);
        emulator.cycles_shifted += 8192;
        assert_eq!(emulator.emulated_cycles(), cycles);

        // The machinery still works after the set-back.
        assert!(emulator.run(CYCLES_PER_FRAME + 456));
    }

    #[test]
    fn log_entries_carry_category_and_clocks() {
        let program = [
            0x3E, 0x05, // LD A,0x05
            0xE0, 0x07, // LDH (TAC),A
            0x76, // HALT
        ];
        let rom = rom_with_program(&program);
        let options = EmulatorOptionsBuilder::new()
            .log_categories(&[LogCategory::Timer])
            .build();
        let mut emulator = Emulator::new(&rom, options).unwrap();
        emulator.run(10_000);

        let entries = emulator.log_entries();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|entry| entry.category == LogCategory::Timer));
        assert!(entries[0].clock > 0);
    }

    #[test]
    fn auto_detect_selects_cgb_for_cgb_carts() {
        let mut rom = rom_with_program(&[0x76]);
        rom[0x143] = 0x80;
        let emulator = Emulator::new(&rom, EmulatorOptionsBuilder::new().build()).unwrap();
        assert!(emulator.cpu.mmu.model.is_cgb());

        let dmg = Emulator::new(&rom_with_program(&[0x76]), EmulatorOptionsBuilder::new().build()).unwrap();
        assert!(dmg.cpu.mmu.model.is_dmg());
    }
}
