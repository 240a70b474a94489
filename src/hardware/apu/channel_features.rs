//! The three features shared between channels: length counter, volume
//! envelope and frequency sweep.

/// A length counter stops its channel once it reaches zero (if enabled).
///
/// The "first half" quirks: while the frame sequencer is in the half period
/// where the next step will not clock lengths, enabling the counter or
/// triggering with a full counter clocks it one extra time.
#[derive(Default, Debug, Copy, Clone)]
pub struct LengthFeature {
    pub length_enable: bool,
    counter: u16,
}

impl LengthFeature {
    /// Load from an NRx1 write for the 64-step channels.
    pub fn write_register(&mut self, value: u8) {
        self.counter = 64 - (value & 0x3F) as u16;
    }

    /// Load from NR31, the wave channel counts 256 steps.
    pub fn write_register_256(&mut self, value: u8) {
        self.counter = 256 - value as u16;
    }

    pub fn tick(&mut self, channel_enabled: &mut bool) {
        if self.length_enable && self.counter > 0 {
            self.counter -= 1;
            if self.counter == 0 {
                *channel_enabled = false;
            }
        }
    }

    /// Handle an NRx4 write that may enable the counter during the first
    /// half of the sequencer period: a 0->1 enable with a non-zero counter
    /// clocks it immediately.
    pub fn nrx4_enable_tick(&mut self, channel_enabled: &mut bool, was_enabled: bool, first_half: bool) {
        if first_half && !was_enabled && self.length_enable {
            self.tick(channel_enabled);
        }
    }

    /// Trigger behaviour: an expired counter reloads to the maximum, one
    /// less when triggered in the first half with the counter enabled.
    pub fn trigger(&mut self, first_half: bool) {
        self.trigger_with_max(first_half, 64);
    }

    pub fn trigger_256(&mut self, first_half: bool) {
        self.trigger_with_max(first_half, 256);
    }

    fn trigger_with_max(&mut self, first_half: bool, max: u16) {
        if self.counter == 0 {
            self.counter = max;
            if first_half && self.length_enable {
                self.counter -= 1;
            }
        }
    }
}

/// A volume envelope: a 4-bit volume stepped up or down at 64 Hz.
#[derive(Default, Debug, Copy, Clone)]
pub struct EnvelopeFeature {
    pub volume: u8,
    register_value: u8,
    envelope_enabled: bool,
    envelope_add_mode: bool,
    envelope_period_load_value: u8,
    envelope_period: u8,
}

impl EnvelopeFeature {
    /// When the timer fires and the period is not zero the volume moves one
    /// step; once it would leave 0..=15 the envelope stops until retriggered.
    pub fn tick(&mut self) {
        if self.envelope_enabled && self.envelope_period > 0 {
            self.envelope_period = self.envelope_period.saturating_sub(1);

            if self.envelope_period == 0 {
                let new_volume = if self.envelope_add_mode {
                    self.volume as i8 + 1
                } else {
                    self.volume as i8 - 1
                };

                if (0..=15).contains(&new_volume) {
                    self.volume = new_volume as u8;
                    self.envelope_period = self.envelope_period_load_value;
                } else {
                    self.envelope_enabled = false;
                }
            }
        }
    }

    pub fn trigger(&mut self) {
        self.envelope_enabled = true;
        self.envelope_period = self.envelope_period_load_value;
        self.volume = self.volume_load();
    }

    /// The DAC is powered while any of the upper 5 bits of NRx2 is set.
    pub fn dac_enabled(&self) -> bool {
        self.volume_load() != 0 || self.envelope_add_mode
    }

    fn volume_load(&self) -> u8 {
        self.register_value >> 4
    }

    pub fn read_register(&self) -> u8 {
        self.register_value
    }

    pub fn write_register(&mut self, value: u8) {
        self.register_value = value;
        self.envelope_add_mode = value & 0x8 == 0x8;
        self.envelope_period_load_value = value & 0x7;
    }
}

/// Channel 1's frequency sweep.
#[derive(Default, Debug, Copy, Clone)]
pub struct SweepFeature {
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    // Internal state
    sweep_enabled: bool,
    sweep_timer: u8,
    sweep_frequency_shadow: u16,
    /// At least one calculation ran in negate mode since the last trigger.
    negate_calculated: bool,
}

impl SweepFeature {
    pub fn read_register(&self) -> u8 {
        (self.sweep_period << 4) | if self.sweep_negate { 0x8 } else { 0 } | self.sweep_shift
    }

    /// Clearing negate mode after a negate calculation kills the channel.
    pub fn write_register(&mut self, value: u8, channel_enabled: &mut bool) {
        let old_negate = self.sweep_negate;
        self.sweep_period = (value >> 4) & 0x7;
        self.sweep_negate = value & 0x8 == 0x8;
        self.sweep_shift = value & 0x7;

        if old_negate && !self.sweep_negate && self.negate_calculated {
            *channel_enabled = false;
        }
    }

    /// Trigger: reload the shadow register and timer; a non-zero shift runs
    /// an immediate overflow check which may disable the channel right away.
    pub fn trigger(&mut self, channel_enabled: &mut bool, frequency: u16) {
        self.sweep_frequency_shadow = frequency;
        self.sweep_timer = self.effective_period();
        self.sweep_enabled = self.sweep_period != 0 || self.sweep_shift != 0;
        self.negate_calculated = false;

        if self.sweep_shift != 0 {
            self.calculate_next_frequency(channel_enabled);
        }
    }

    /// Clocked on frame sequencer steps 2 and 6.
    pub fn tick(&mut self, channel_enabled: &mut bool, frequency: &mut u16) {
        if !self.sweep_enabled {
            return;
        }
        self.sweep_timer = self.sweep_timer.saturating_sub(1);
        if self.sweep_timer != 0 {
            return;
        }
        self.sweep_timer = self.effective_period();

        if self.sweep_period != 0 {
            let new_frequency = self.calculate_next_frequency(channel_enabled);
            if *channel_enabled && self.sweep_shift != 0 && new_frequency <= 2047 {
                self.sweep_frequency_shadow = new_frequency;
                *frequency = new_frequency;
                // The written back value is immediately checked again.
                self.calculate_next_frequency(channel_enabled);
            }
        }
    }

    /// A period of zero behaves as 8.
    fn effective_period(&self) -> u8 {
        if self.sweep_period == 0 {
            8
        } else {
            self.sweep_period
        }
    }

    fn calculate_next_frequency(&mut self, channel_enabled: &mut bool) -> u16 {
        let delta = self.sweep_frequency_shadow >> self.sweep_shift;
        let new_frequency = if self.sweep_negate {
            self.negate_calculated = true;
            self.sweep_frequency_shadow.wrapping_sub(delta)
        } else {
            self.sweep_frequency_shadow + delta
        };

        if new_frequency > 2047 {
            *channel_enabled = false;
        }
        new_frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counts_down_to_channel_disable() {
        let mut length = LengthFeature::default();
        let mut enabled = true;
        length.write_register(0x3E); // counter = 2
        length.length_enable = true;

        length.tick(&mut enabled);
        assert!(enabled);
        length.tick(&mut enabled);
        assert!(!enabled);

        // Expired counter no longer ticks.
        length.tick(&mut enabled);
    }

    #[test]
    fn envelope_moves_towards_bounds_then_stops() {
        let mut envelope = EnvelopeFeature::default();
        envelope.write_register(0xE1); // volume 14, subtract, period 1
        envelope.trigger();

        for _ in 0..14 {
            envelope.tick();
        }
        assert_eq!(envelope.volume, 0);
        envelope.tick();
        assert_eq!(envelope.volume, 0);
    }

    #[test]
    fn sweep_overflow_on_trigger_disables_channel() {
        let mut sweep = SweepFeature::default();
        let mut enabled = true;
        sweep.write_register(0x11, &mut enabled); // period 1, shift 1

        sweep.trigger(&mut enabled, 0x7FF);
        assert!(!enabled, "0x7FF + (0x7FF >> 1) overflows");
    }

    #[test]
    fn clearing_negate_after_calculation_disables_channel() {
        let mut sweep = SweepFeature::default();
        let mut enabled = true;
        sweep.write_register(0x19, &mut enabled); // negate, shift 1
        sweep.trigger(&mut enabled, 0x400);
        assert!(enabled);

        sweep.write_register(0x11, &mut enabled);
        assert!(!enabled);
    }
}
