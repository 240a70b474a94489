use crate::io::interrupts::{InterruptFlags, Interrupts};
use crate::io::timer::InputClock::C256;
use crate::scheduler::{EventType, Scheduler};

/// This register is incremented at a rate of 16384Hz.
/// Writing any value to this register resets the whole internal counter to 0.
///
/// Note: the divider is affected by CGB double speed mode, and will increment at 32768Hz in double speed.
pub const DIVIDER_REGISTER: u16 = 0xFF04;
/// This timer is incremented at the clock frequency specified by the TAC register ($FF07).
/// When the value overflows it is reloaded with the value specified in TMA (FF06)
/// and an interrupt is requested, both delayed by one machine cycle.
pub const TIMER_COUNTER: u16 = 0xFF05;
/// When the TIMA overflows, this data will be loaded.
pub const TIMER_MODULO: u16 = 0xFF06;
/// Several flags to indicate the incrementing rate of the timer.
pub const TIMER_CONTROL: u16 = 0xFF07;

#[derive(Debug, Copy, Clone)]
enum InputClock {
    C16 = 0x1,
    C64 = 0x2,
    C256 = 0x3,
    C1024 = 0x0,
}

#[derive(Debug, Copy, Clone)]
pub struct TimerControl {
    timer_enabled: bool,
    input_select: InputClock,
}

/// The 16-bit free running counter behind DIV and TIMA.
///
/// `TIMA` increments on the falling edge of the counter bit selected by TAC,
/// which is what makes the DIV-write and TAC-write glitches below fall out
/// naturally.
#[derive(Debug, Default)]
pub struct TimerRegisters {
    pub system_clock: u16,
    pub timer_counter: u8,
    pub timer_modulo: u8,
    pub timer_control: TimerControl,
    /// A `TimerOverflow` event is outstanding.
    overflow_pending: bool,
    /// We are inside the machine cycle in which TMA was just loaded into TIMA.
    just_reloaded: bool,
}

impl TimerRegisters {
    pub fn divider_register(&self) -> u8 {
        (self.system_clock >> 8) as u8
    }

    /// The raw 16-bit counter, used for DIV-aligned bookkeeping elsewhere.
    pub fn div_clock(&self) -> u16 {
        self.system_clock
    }

    /// Advance the counter by one machine cycle (4 clocks).
    pub fn tick_timers(&mut self, scheduler: &mut Scheduler) {
        let old_sys_clock = self.system_clock;
        self.system_clock = self.system_clock.wrapping_add(4);

        if self.timer_control.timer_enabled {
            let select_bit = self.timer_control.input_select.to_relevant_bit();

            if self.fallen_sys_clock(old_sys_clock, select_bit) {
                self.tick_timer(scheduler);
            }
        }
    }

    /// Reload TIMA from TMA and request the timer interrupt.
    /// Fired by the scheduler one machine cycle after the overflow itself.
    pub fn handle_overflow(&mut self, scheduler: &mut Scheduler, interrupts: &mut Interrupts) {
        self.overflow_pending = false;
        self.just_reloaded = true;
        self.timer_counter = self.timer_modulo;
        interrupts.insert_interrupt(InterruptFlags::TIMER);
        scheduler.push_relative(EventType::TimerPostOverflow, 4);
    }

    pub fn handle_post_overflow(&mut self) {
        self.just_reloaded = false;
    }

    fn fallen_sys_clock(&self, old_clock: u16, select_bit: u16) -> bool {
        (old_clock & select_bit) != 0 && (self.system_clock & select_bit) == 0
    }

    fn tick_timer(&mut self, scheduler: &mut Scheduler) {
        let (new_value, overflowed) = self.timer_counter.overflowing_add(1);

        self.timer_counter = new_value;
        if overflowed {
            // The reload and interrupt happen one machine cycle later.
            self.overflow_pending = true;
            scheduler.push_relative(EventType::TimerOverflow, 4);
        }
    }

    /// Write to the `TIMA` register (`timer_counter` internally).
    ///
    /// Writing during the delay cycle after an overflow cancels the reload and
    /// the interrupt. Writing during the cycle the reload lands is ignored,
    /// TMA wins.
    pub fn set_timer_counter(&mut self, value: u8, scheduler: &mut Scheduler) {
        if self.overflow_pending {
            self.overflow_pending = false;
            scheduler.remove_event_type(EventType::TimerOverflow);
        }

        if self.just_reloaded {
            self.timer_counter = self.timer_modulo;
        } else {
            self.timer_counter = value;
        }
    }

    /// Write to the `TMA` register. If TIMA was reloaded this very machine
    /// cycle the new value lands in TIMA as well.
    pub fn set_tma(&mut self, value: u8) {
        if self.just_reloaded {
            self.timer_counter = value;
        }
        self.timer_modulo = value;
    }

    /// Write to the divider register, this always resets the counter to 0x0000.
    ///
    /// Resetting while the selected multiplexer bit is high produces a falling
    /// edge and therefore a spurious TIMA increment.
    pub fn set_divider(&mut self, scheduler: &mut Scheduler) {
        let old_sys_clock = self.system_clock;
        self.system_clock = 0;

        if self.timer_control.timer_enabled
            && (old_sys_clock & self.timer_control.input_select.to_relevant_bit()) != 0
        {
            self.tick_timer(scheduler);
        }
    }

    pub fn set_timer_control(&mut self, value: u8, scheduler: &mut Scheduler) {
        let old_control = self.timer_control;
        self.timer_control = TimerControl::from(value);
        let old_select_bit = old_control.input_select.to_relevant_bit();
        let select_bit = self.timer_control.input_select.to_relevant_bit();

        // Disabling the timer while the selected bit is high also looks like a
        // falling edge to the DMG multiplexer.
        if old_control.timer_enabled && !self.timer_control.timer_enabled && (self.system_clock & select_bit) != 0 {
            self.tick_timer(scheduler);
        }

        // If the old selected bit was high and the newly selected one is low
        // the edge detector fires as well.
        if old_control.timer_enabled
            && self.timer_control.timer_enabled
            && (self.system_clock & old_select_bit) != 0
            && (self.system_clock & select_bit) == 0
        {
            self.tick_timer(scheduler)
        }
    }
}

impl TimerControl {
    pub fn to_bits(&self) -> u8 {
        let result = if self.timer_enabled { 0x4 } else { 0 };

        0xF8 | result | self.input_select as u8
    }
}

impl Default for TimerControl {
    fn default() -> Self {
        TimerControl {
            input_select: C256,
            timer_enabled: false,
        }
    }
}

impl From<u8> for TimerControl {
    fn from(val: u8) -> Self {
        TimerControl {
            timer_enabled: val & 0b0000_0100 > 0,
            input_select: InputClock::from(val),
        }
    }
}

impl From<u8> for InputClock {
    fn from(val: u8) -> Self {
        match val & 0x3 {
            0x0 => InputClock::C1024,
            0x1 => InputClock::C16,
            0x2 => InputClock::C64,
            _ => InputClock::C256,
        }
    }
}

impl InputClock {
    pub fn to_relevant_bit(&self) -> u16 {
        match self {
            InputClock::C16 => 0x0008,
            InputClock::C64 => 0x0020,
            InputClock::C256 => 0x0080,
            InputClock::C1024 => 0x0200,
        }
    }
}
