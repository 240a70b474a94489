//! The APU is evaluated lazily: it only runs up to the cycle it *should* be
//! at when one of its registers is touched (and once more at the end of every
//! `run` call so the PCM buffer always covers the full emulated span).
//! The frame sequencer is folded into that catch-up, except for DIV writes
//! which advance it synchronously (that is how the "DIV reset glitch"
//! surfaces to software).

use num_integer::Integer;

use crate::emulator::GameBoyModel;
use crate::hardware::apu::noise_channel::NoiseChannel;
use crate::hardware::apu::square_channel::SquareWaveChannel;
use crate::hardware::apu::wave_channel::WaveformChannel;
use crate::hardware::mmu::INVALID_READ;
use crate::scheduler::{shift_cycle_back, Scheduler};

pub mod channel_features;
pub mod noise_channel;
pub mod square_channel;
pub mod wave_channel;

/// The frame sequencer advances every 8192 clocks (512 Hz).
pub const FRAME_SEQUENCE_CYCLES: i64 = 8192;
/// One stereo frame is produced every 2 clocks: 2097152 Hz.
pub const CYCLES_PER_SAMPLE: i64 = 2;
pub const PCM_SAMPLING_RATE: i32 = 2_097_152;

pub const APU_MEM_START: u16 = 0xFF10;
pub const APU_MEM_END: u16 = 0xFF2F;
pub const WAVE_SAMPLE_START: u16 = 0xFF30;
pub const WAVE_SAMPLE_END: u16 = 0xFF3F;
/// CGB only: the current 4-bit amplitudes of channels 1/2 and 3/4.
pub const PCM12_REGISTER: u16 = 0xFF76;
pub const PCM34_REGISTER: u16 = 0xFF77;

/// Scale factor applied to the summed DAC outputs; one channel at peak
/// volume lands just below `i16::MAX / 8`.
const OUTPUT_SCALE: i32 = 34;

/// One native-rate stereo PCM frame, left sample first.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct StereoFrame {
    pub left: i16,
    pub right: i16,
}

pub struct Apu {
    voice1: SquareWaveChannel,
    voice2: SquareWaveChannel,
    voice3: WaveformChannel,
    voice4: NoiseChannel,
    // The vin bits are unused by virtually all games, but are kept for the
    // sake of register readback accuracy.
    vin_l_enable: bool,
    vin_r_enable: bool,
    left_volume: u8,
    right_volume: u8,
    // Index 0-3 represent voices 1-4 respectively.
    left_channel_enable: [bool; 4],
    right_channel_enable: [bool; 4],
    global_sound_enable: bool,
    output_buffer: Vec<StereoFrame>,
    /// The next step the sequencer will execute.
    frame_sequencer_step: u8,
    /// Set when powering on at specific DIV alignments: the first step after
    /// the power-on is swallowed.
    skip_next_sequencer_step: bool,
    clk_last_synchronised: i64,
    clk_next_frame_sequence: i64,
    sample_remainder: i64,
    is_cgb: bool,
}

impl Apu {
    pub fn new(model: GameBoyModel, div_seed: u16) -> Self {
        let is_cgb = model.is_cgb();
        let mut result = Apu {
            voice1: SquareWaveChannel::new(true),
            voice2: SquareWaveChannel::new(false),
            voice3: WaveformChannel::new(is_cgb),
            voice4: NoiseChannel::default(),
            vin_l_enable: false,
            vin_r_enable: false,
            left_volume: 7,
            right_volume: 7,
            left_channel_enable: [true; 4],
            right_channel_enable: [true, true, false, false],
            global_sound_enable: true,
            // Two frames of audio head room.
            output_buffer: Vec::with_capacity(2 * 70224 / CYCLES_PER_SAMPLE as usize),
            frame_sequencer_step: if is_cgb { 0 } else { 1 },
            skip_next_sequencer_step: false,
            clk_last_synchronised: 0,
            clk_next_frame_sequence: FRAME_SEQUENCE_CYCLES - (div_seed as i64 & (FRAME_SEQUENCE_CYCLES - 1)),
            sample_remainder: 0,
            is_cgb,
        };
        // The boot ROM leaves channel 1 playing the chime.
        result.voice1.seed_boot_state();
        result
    }

    /// Bring the whole unit up to date with the scheduler.
    ///
    /// This is safe and valid so long as it happens before every APU register
    /// access; everything in between is generated in one go here, which is
    /// where the speedup over per-cycle ticking comes from.
    pub fn synchronise(&mut self, scheduler: &mut Scheduler, speed_shift: i64) {
        let now = scheduler.current_time;

        if self.global_sound_enable {
            while now >= self.clk_next_frame_sequence {
                let until = self.clk_next_frame_sequence;
                self.generate_samples_until(until, speed_shift);
                self.step_frame_sequencer();
                self.clk_next_frame_sequence += FRAME_SEQUENCE_CYCLES << speed_shift;
            }
        }

        self.generate_samples_until(now, speed_shift);
    }

    /// A DIV write also resets the timer feeding the frame sequencer: if the
    /// relevant DIV bit was high the sequencer steps immediately, and the
    /// next regular step moves a full period away.
    pub fn on_div_reset(&mut self, scheduler: &mut Scheduler, speed_shift: i64, div_clock: u16) {
        if !self.global_sound_enable {
            return;
        }
        self.synchronise(scheduler, speed_shift);

        if div_clock as i64 & ((FRAME_SEQUENCE_CYCLES << speed_shift) / 2) != 0 {
            self.step_frame_sequencer();
        }
        self.clk_next_frame_sequence = scheduler.current_time + (FRAME_SEQUENCE_CYCLES << speed_shift);
    }

    fn generate_samples_until(&mut self, target: i64, speed_shift: i64) {
        let delta = target - self.clk_last_synchronised;
        if delta <= 0 {
            return;
        }
        self.clk_last_synchronised = target;

        let (samples, remainder) = (delta + self.sample_remainder).div_rem(&CYCLES_PER_SAMPLE);
        self.sample_remainder = remainder;

        let mut clk = target - delta;
        for _ in 0..samples {
            clk += CYCLES_PER_SAMPLE;
            if self.global_sound_enable {
                self.voice1.tick_sample(speed_shift);
                self.voice2.tick_sample(speed_shift);
                self.voice3.tick_sample(speed_shift, clk);
                self.voice4.tick_sample(speed_shift);
            }
            let frame = self.mix_sample();
            self.output_buffer.push(frame);
        }
    }

    /// Sum the four DAC outputs per side, scaled by NR50 master volume.
    fn mix_sample(&self) -> StereoFrame {
        if !self.global_sound_enable {
            return StereoFrame::default();
        }

        let amplitudes = [
            self.voice1.amplitude(),
            self.voice2.amplitude(),
            self.voice3.amplitude(),
            self.voice4.amplitude(),
        ];
        let dac_enabled = [
            self.voice1.dac_enabled(),
            self.voice2.dac_enabled(),
            self.voice3.dac_enabled(),
            self.voice4.dac_enabled(),
        ];

        let mut left = 0_i32;
        let mut right = 0_i32;
        for i in 0..4 {
            if !dac_enabled[i] {
                continue;
            }
            // A powered DAC outputs -15..=15 centered around zero.
            let dac_output = amplitudes[i] as i32 * 2 - 15;
            if self.left_channel_enable[i] {
                left += dac_output;
            }
            if self.right_channel_enable[i] {
                right += dac_output;
            }
        }

        StereoFrame {
            left: (left * (self.left_volume as i32 + 1) * OUTPUT_SCALE) as i16,
            right: (right * (self.right_volume as i32 + 1) * OUTPUT_SCALE) as i16,
        }
    }

    fn step_frame_sequencer(&mut self) {
        // Triggered by switching the APU on at specific DIV alignments: the
        // swallowed event leaves the step counter untouched.
        if self.skip_next_sequencer_step {
            self.skip_next_sequencer_step = false;
            return;
        }

        match self.frame_sequencer_step {
            0 | 4 => self.tick_lengths(),
            2 | 6 => {
                self.tick_lengths();
                self.voice1.tick_sweep();
            }
            7 => {
                self.voice1.tick_envelope();
                self.voice2.tick_envelope();
                self.voice4.tick_envelope();
            }
            _ => {}
        }
        self.frame_sequencer_step = (self.frame_sequencer_step + 1) % 8;
    }

    /// Whether the *upcoming* sequencer step skips the length counters,
    /// which is when the extra NRx4 length clocking quirks apply.
    fn first_half_of_length_period(&self) -> bool {
        self.frame_sequencer_step % 2 == 1
    }

    fn tick_lengths(&mut self) {
        self.voice1.tick_length();
        self.voice2.tick_length();
        self.voice3.tick_length();
        self.voice4.tick_length();
    }

    pub fn read_register(&mut self, address: u16, scheduler: &mut Scheduler, speed_shift: i64) -> u8 {
        self.synchronise(scheduler, speed_shift);
        match address & 0xFF {
            0x10..=0x14 => self.voice1.read_nrx((address & 0xFF) as u8 - 0x10),
            0x15..=0x19 => self.voice2.read_nrx((address & 0xFF) as u8 - 0x15),
            0x1A..=0x1E => self.voice3.read_nrx((address & 0xFF) as u8 - 0x1A),
            0x1F..=0x23 => self.voice4.read_nrx((address & 0xFF) as u8 - 0x1F),
            0x24 => {
                let mut output = (self.left_volume << 4) | self.right_volume;
                set_bit(&mut output, 7, self.vin_l_enable);
                set_bit(&mut output, 3, self.vin_r_enable);
                output
            }
            0x25 => {
                let mut output = 0;
                for i in 0..4 {
                    set_bit(&mut output, i as u8, self.right_channel_enable[i]);
                    set_bit(&mut output, i as u8 + 4, self.left_channel_enable[i]);
                }
                output
            }
            0x26 => {
                let mut output = 0x70;
                set_bit(&mut output, 7, self.global_sound_enable);
                set_bit(&mut output, 0, self.voice1.active());
                set_bit(&mut output, 1, self.voice2.active());
                set_bit(&mut output, 2, self.voice3.active());
                set_bit(&mut output, 3, self.voice4.active());
                output
            }
            // Unused registers always read 0xFF.
            0x27..=0x2F => INVALID_READ,
            _ => unreachable!("Out of bounds APU register read: {:#06X}", address),
        }
    }

    pub fn write_register(
        &mut self,
        address: u16,
        value: u8,
        scheduler: &mut Scheduler,
        speed_shift: i64,
        div_clock: u16,
    ) {
        self.synchronise(scheduler, speed_shift);
        let register = address & 0xFF;

        // With the master switch off the register file is read only.
        // Caveat: the DMG still allows length counter writes.
        if !self.global_sound_enable && register != 0x26 {
            match register {
                0x11 if !self.is_cgb => self.voice1.write_length_only(value),
                0x16 if !self.is_cgb => self.voice2.write_length_only(value),
                0x1B if !self.is_cgb => self.voice3.write_length_only(value),
                0x20 if !self.is_cgb => self.voice4.write_length_only(value),
                _ => log::trace!("Ignoring APU write {:#06X} = {:#04X} while powered off", address, value),
            }
            return;
        }

        let first_half = self.first_half_of_length_period();
        match register {
            0x10..=0x14 => self
                .voice1
                .write_nrx(register as u8 - 0x10, value, first_half, speed_shift),
            0x15..=0x19 => self
                .voice2
                .write_nrx(register as u8 - 0x15, value, first_half, speed_shift),
            0x1A..=0x1E => self.voice3.write_nrx(
                register as u8 - 0x1A,
                value,
                first_half,
                self.is_cgb,
                speed_shift,
            ),
            0x1F..=0x23 => self
                .voice4
                .write_nrx(register as u8 - 0x1F, value, first_half, speed_shift),
            0x24 => {
                self.vin_l_enable = value & 0x80 != 0;
                self.vin_r_enable = value & 0x08 != 0;
                self.left_volume = (value & 0x70) >> 4;
                self.right_volume = value & 0x07;
            }
            0x25 => {
                for i in 0..4 {
                    self.right_channel_enable[i] = value & (1 << i) != 0;
                    self.left_channel_enable[i] = value & (1 << (i + 4)) != 0;
                }
            }
            0x26 => self.write_master_switch(value, scheduler, speed_shift, div_clock),
            // Writes to unused registers are silently ignored.
            0x27..=0x2F => {}
            _ => unreachable!("Out of bounds APU register write: {:#06X}", address),
        }
    }

    /// NR52: powering off zeroes the whole register file; powering back on
    /// restarts the frame sequencer DIV-aligned, skipping the first step on
    /// specific alignments.
    fn write_master_switch(&mut self, value: u8, scheduler: &mut Scheduler, speed_shift: i64, div_clock: u16) {
        let enable = value & 0x80 != 0;

        if self.global_sound_enable && !enable {
            let keep_length = !self.is_cgb;
            self.voice1.reset(keep_length);
            self.voice2.reset(keep_length);
            self.voice3.reset(keep_length, self.is_cgb);
            self.voice4.reset(keep_length);
            self.vin_l_enable = false;
            self.vin_r_enable = false;
            self.left_volume = 0;
            self.right_volume = 0;
            self.left_channel_enable = [false; 4];
            self.right_channel_enable = [false; 4];
            log::debug!("APU powered off");
        } else if !self.global_sound_enable && enable {
            let period = FRAME_SEQUENCE_CYCLES << speed_shift;
            let clks_into_period = div_clock as i64 & (period - 1);
            self.clk_next_frame_sequence = scheduler.current_time + period - clks_into_period;
            self.frame_sequencer_step = 0;
            self.skip_next_sequencer_step = false;

            // On specific DIV alignments the first sequencer step after
            // power-on is swallowed (gambatte: div_write_trigger tests).
            let offset = if speed_shift != 0 { 2 } else { 4 };
            if (div_clock as i64 + offset) & (period / 2) != 0 {
                self.skip_next_sequencer_step = true;
            }
            log::debug!("APU powered on, first sequencer step in {} cycles", period - clks_into_period);
        }

        self.global_sound_enable = enable;
    }

    pub fn read_wave_sample(&mut self, address: u16, scheduler: &mut Scheduler, speed_shift: i64) -> u8 {
        self.synchronise(scheduler, speed_shift);
        self.voice3
            .read_wave_ram((address & 0xF) as usize, self.is_cgb, scheduler.current_time)
    }

    pub fn write_wave_sample(&mut self, address: u16, value: u8, scheduler: &mut Scheduler, speed_shift: i64) {
        self.synchronise(scheduler, speed_shift);
        self.voice3
            .write_wave_ram((address & 0xF) as usize, value, self.is_cgb, scheduler.current_time)
    }

    /// PCM12/PCM34 (CGB): raw 4-bit DAC inputs of the channel pairs.
    pub fn read_pcm(&mut self, address: u16, scheduler: &mut Scheduler, speed_shift: i64) -> u8 {
        self.synchronise(scheduler, speed_shift);
        match address {
            PCM12_REGISTER => self.voice1.amplitude() | (self.voice2.amplitude() << 4),
            _ => self.voice3.amplitude() | (self.voice4.amplitude() << 4),
        }
    }

    pub fn audio_buffer(&self) -> &[StereoFrame] {
        &self.output_buffer
    }

    pub fn clear_audio_buffer(&mut self) {
        self.output_buffer.clear();
    }

    pub fn shift_back(&mut self, offset: i64) {
        shift_cycle_back(&mut self.clk_last_synchronised, offset);
        shift_cycle_back(&mut self.clk_next_frame_sequence, offset);
        self.voice3.shift_back(offset);
    }
}

fn set_bit(output: &mut u8, bit: u8, set: bool) {
    if set {
        *output |= 1 << bit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::GameBoyModel;

    fn test_apu() -> (Apu, Scheduler) {
        (Apu::new(GameBoyModel::Dmg, 0), Scheduler::new())
    }

    /// One stereo frame per two clock cycles, for any synchronisation
    /// pattern.
    #[test]
    fn sample_count_is_half_the_cycle_count() {
        let (mut apu, mut scheduler) = test_apu();

        for step in [2_i64, 4, 30, 1000, 8192, 70224].iter() {
            scheduler.add_cycles(*step);
            apu.synchronise(&mut scheduler, 0);
        }

        let expected = scheduler.current_time / CYCLES_PER_SAMPLE;
        assert_eq!(apu.audio_buffer().len() as i64, expected);
    }

    #[test]
    fn boot_channel_one_produces_audible_output() {
        let (mut apu, mut scheduler) = test_apu();
        // NR50/NR51 defaults route channel 1 to both sides already.
        scheduler.add_cycles(70224);
        apu.synchronise(&mut scheduler, 0);

        let average: i64 = apu
            .audio_buffer()
            .iter()
            .map(|frame| (frame.left as i64).abs())
            .sum::<i64>()
            / apu.audio_buffer().len() as i64;
        assert!(average > i16::max_value() as i64 / 80, "average {}", average);
    }

    #[test]
    fn nr52_power_off_clears_registers() {
        let (mut apu, mut scheduler) = test_apu();
        apu.write_register(0xFF24, 0x77, &mut scheduler, 0, 0);
        apu.write_register(0xFF25, 0xFF, &mut scheduler, 0, 0);

        apu.write_register(0xFF26, 0x00, &mut scheduler, 0, 0);
        assert_eq!(apu.read_register(0xFF24, &mut scheduler, 0), 0x00);
        assert_eq!(apu.read_register(0xFF25, &mut scheduler, 0), 0x00);
        assert_eq!(apu.read_register(0xFF26, &mut scheduler, 0), 0x70);

        // Writes are ignored while off (except DMG length counters).
        apu.write_register(0xFF24, 0x77, &mut scheduler, 0, 0);
        assert_eq!(apu.read_register(0xFF24, &mut scheduler, 0), 0x00);
    }

    #[test]
    fn repeated_register_write_is_idempotent_without_trigger() {
        let (mut apu, mut scheduler) = test_apu();
        apu.write_register(0xFF12, 0xA3, &mut scheduler, 0, 0);
        let nr52_once = apu.read_register(0xFF26, &mut scheduler, 0);
        let nr12_once = apu.read_register(0xFF12, &mut scheduler, 0);

        apu.write_register(0xFF12, 0xA3, &mut scheduler, 0, 0);
        assert_eq!(apu.read_register(0xFF26, &mut scheduler, 0), nr52_once);
        assert_eq!(apu.read_register(0xFF12, &mut scheduler, 0), nr12_once);
    }

    #[test]
    fn div_reset_in_second_half_steps_the_sequencer() {
        let (mut apu, mut scheduler) = test_apu();
        let step_before = apu.frame_sequencer_step;

        // Bit 12 of DIV set: the reset looks like a falling edge.
        apu.on_div_reset(&mut scheduler, 0, 0x1000);
        assert_eq!(apu.frame_sequencer_step, (step_before + 1) % 8);

        let step_before = apu.frame_sequencer_step;
        apu.on_div_reset(&mut scheduler, 0, 0x0000);
        assert_eq!(apu.frame_sequencer_step, step_before);
    }

    #[test]
    fn unused_registers_read_ff() {
        let (mut apu, mut scheduler) = test_apu();
        for address in 0xFF27..=0xFF2F {
            assert_eq!(apu.read_register(address, &mut scheduler, 0), 0xFF);
        }
    }
}
