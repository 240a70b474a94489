use crate::hardware::apu::channel_features::{EnvelopeFeature, LengthFeature, SweepFeature};
use crate::hardware::mmu::INVALID_READ;

/// Voices 1 and 2: a square wave with 4 duty patterns, volume envelope and,
/// for voice 1 only, a frequency sweep. The two are merged here, the second
/// one simply never has its sweep clocked.
#[derive(Default, Debug)]
pub struct SquareWaveChannel {
    pub length: LengthFeature,
    envelope: EnvelopeFeature,
    sweep: SweepFeature,
    has_sweep: bool,
    enabled: bool,
    frequency: u16,
    /// Remaining samples (1 sample = 2 clocks) until the duty step advances.
    timer: u32,
    wave_table_index: usize,
    duty_select: usize,
}

impl SquareWaveChannel {
    const SQUARE_WAVE_TABLE: [[u8; 8]; 4] = [
        [0, 0, 0, 0, 0, 0, 0, 1], // 12.5% Duty cycle square
        [1, 0, 0, 0, 0, 0, 0, 1], // 25%
        [1, 0, 0, 0, 0, 1, 1, 1], // 50%
        [0, 1, 1, 1, 1, 1, 1, 0], // 75%
    ];

    pub fn new(has_sweep: bool) -> Self {
        SquareWaveChannel {
            has_sweep,
            ..Default::default()
        }
    }

    pub fn active(&self) -> bool {
        self.enabled
    }

    pub fn dac_enabled(&self) -> bool {
        self.envelope.dac_enabled()
    }

    /// The current 4-bit DAC input, `0` while the channel is off.
    pub fn amplitude(&self) -> u8 {
        if self.enabled {
            self.envelope.volume * Self::SQUARE_WAVE_TABLE[self.duty_select][self.wave_table_index]
        } else {
            0
        }
    }

    /// Advance by one sample (2 clocks at single speed).
    pub fn tick_sample(&mut self, speed_shift: i64) {
        if self.timer > 1 {
            self.timer -= 1;
            return;
        }
        // One duty step lasts (2048 - frequency) * 4 clocks.
        self.timer = self.period_samples(speed_shift);
        self.wave_table_index = (self.wave_table_index + 1) % 8;
    }

    fn period_samples(&self, speed_shift: i64) -> u32 {
        (((2048 - self.frequency) as u32) * 2) << speed_shift
    }

    pub fn read_nrx(&self, register: u8) -> u8 {
        match register {
            0 if self.has_sweep => 0x80 | self.sweep.read_register(),
            0 => INVALID_READ,
            1 => 0x3F | ((self.duty_select as u8) << 6),
            2 => self.envelope.read_register(),
            3 => INVALID_READ, // Frequency bits are write only
            4 => 0xBF | if self.length.length_enable { 0x40 } else { 0x0 },
            _ => unreachable!("Out of bounds square channel register read: {}", register),
        }
    }

    pub fn write_nrx(&mut self, register: u8, value: u8, first_half: bool, speed_shift: i64) {
        match register {
            0 if self.has_sweep => self.sweep.write_register(value, &mut self.enabled),
            0 => {}
            1 => {
                self.duty_select = ((value & 0b1100_0000) >> 6) as usize;
                self.length.write_register(value);
            }
            2 => {
                self.envelope.write_register(value);
                // Disabling the DAC also kills the channel immediately.
                if !self.envelope.dac_enabled() {
                    self.enabled = false;
                }
            }
            3 => self.frequency = (self.frequency & 0x0700) | value as u16,
            4 => {
                let was_enabled = self.length.length_enable;
                self.length.length_enable = value & 0x40 != 0;
                self.frequency = (self.frequency & 0xFF) | (((value & 0x07) as u16) << 8);

                self.length
                    .nrx4_enable_tick(&mut self.enabled, was_enabled, first_half);

                if value & 0x80 != 0 {
                    self.trigger(first_half, speed_shift);
                }
            }
            _ => unreachable!("Out of bounds square channel register write: {}", register),
        }
    }

    /// Length-only write, used for DMG NRx1 writes while the APU is off.
    pub fn write_length_only(&mut self, value: u8) {
        self.length.write_register(value);
    }

    /// Trigger behaviour on an NRx4 write with bit 7 set, see
    /// [this gist](https://gist.github.com/drhelius/3652407) for the full list.
    fn trigger(&mut self, first_half: bool, speed_shift: i64) {
        self.enabled = true;
        self.length.trigger(first_half);
        self.envelope.trigger();
        self.timer = self.period_samples(speed_shift);

        if self.has_sweep {
            self.sweep.trigger(&mut self.enabled, self.frequency);
        }

        // A trigger with the DAC off leaves the channel disabled.
        if !self.envelope.dac_enabled() {
            self.enabled = false;
        }
    }

    pub fn tick_length(&mut self) {
        self.length.tick(&mut self.enabled);
    }

    pub fn tick_envelope(&mut self) {
        self.envelope.tick();
    }

    pub fn tick_sweep(&mut self) {
        self.sweep.tick(&mut self.enabled, &mut self.frequency);
    }

    /// Power-off reset. A DMG keeps its length counters.
    pub fn reset(&mut self, keep_length: bool) {
        let length = self.length;
        *self = SquareWaveChannel::new(self.has_sweep);
        if keep_length {
            self.length = length;
            self.length.length_enable = false;
        }
    }

    /// Post-boot state of voice 1: mid beep, duty 2, full volume.
    pub fn seed_boot_state(&mut self) {
        self.enabled = true;
        self.envelope.write_register(0xF3);
        self.envelope.trigger();
        self.duty_select = 2;
        self.frequency = 0x7C1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_with_dac_off_does_not_activate() {
        let mut channel = SquareWaveChannel::new(false);
        channel.write_nrx(2, 0x00, false, 0);
        channel.write_nrx(4, 0x80, false, 0);
        assert!(!channel.active());

        channel.write_nrx(2, 0xF0, false, 0);
        channel.write_nrx(4, 0x80, false, 0);
        assert!(channel.active());
    }

    #[test]
    fn duty_cycle_produces_expected_waveform() {
        let mut channel = SquareWaveChannel::new(false);
        channel.write_nrx(2, 0xF0, false, 0); // volume 15, no decay
        channel.write_nrx(1, 0x80, false, 0); // duty 2 (50%)
        channel.write_nrx(3, 0xFF, false, 0);
        channel.write_nrx(4, 0x87, false, 0); // trigger, frequency 0x7FF

        // Period is (2048 - 2047) * 2 = 2 samples per duty step.
        let mut high = 0;
        for _ in 0..16 {
            channel.tick_sample(0);
            channel.tick_sample(0);
            if channel.amplitude() == 15 {
                high += 1;
            }
        }
        assert_eq!(high, 8, "50% duty should be high half the time");
    }

    #[test]
    fn sweep_overflow_on_trigger_kills_channel() {
        let mut channel = SquareWaveChannel::new(true);
        channel.write_nrx(2, 0xF0, false, 0);
        channel.write_nrx(0, 0x01, false, 0); // shift 1
        channel.write_nrx(3, 0xFF, false, 0);
        channel.write_nrx(4, 0x87, false, 0); // trigger at 0x7FF

        assert!(!channel.active());
    }

    #[test]
    fn length_expiry_stops_the_channel() {
        let mut channel = SquareWaveChannel::new(false);
        channel.write_nrx(2, 0xF0, false, 0);
        channel.write_nrx(1, 0x3E, false, 0); // length counter = 2
        channel.write_nrx(4, 0xC0, false, 0); // trigger with the counter enabled

        assert!(channel.active());
        channel.tick_length();
        channel.tick_length();
        assert!(!channel.active());
    }
}
