use crate::scheduler::shift_cycle_back;

const CYCLES_PER_SECOND: i64 = 4_194_304;

const IDX_SECONDS: usize = 0;
const IDX_MINUTES: usize = 1;
const IDX_HOURS: usize = 2;
const IDX_DAYS: usize = 3;
const IDX_CONTROL: usize = 4;

/// Writable bits per register.
const REG_BITS: [u8; 5] = [0x3F, 0x3F, 0x1F, 0xFF, 0xC1];
/// Carry thresholds per register.
const REG_LIMITS: [i64; 5] = [60, 60, 24, 256, 0];

const RTC_DAY_BIT_9: u8 = 0x01;
const RTC_STOP_TIMER: u8 = 0x40;
const RTC_DAY_CARRY: u8 = 0x80;

pub const FIRST_RTC_REGISTER: u8 = 0x08;
pub const LAST_RTC_REGISTER: u8 = 0x0C;

pub fn is_rtc_register(value: u8) -> bool {
    (FIRST_RTC_REGISTER..=LAST_RTC_REGISTER).contains(&value)
}

/// The MBC3 real time clock.
///
/// Time is derived from the emulated clock, one RTC second per
/// 4194304 cycles. The live registers are only brought up to date when
/// software interacts with them; reads always go through the latched
/// snapshot.
#[derive(Debug)]
pub struct RealTimeClock {
    /// Value last written to the 0x4000-0x5FFF region; maps an RTC register
    /// into the cartridge RAM window when in `0x08..=0x0C`.
    pub mapped_register: u8,
    registers: [u8; 5],
    latched: [u8; 5],
    last_latch_write: u8,
    clks_last_update: i64,
    clks_sub_second: i64,
}

impl RealTimeClock {
    pub fn new() -> Self {
        RealTimeClock {
            mapped_register: 0,
            registers: [0; 5],
            latched: [0; 5],
            last_latch_write: 0xFF,
            clks_last_update: 0,
            clks_sub_second: 0,
        }
    }

    /// Writing 1 after a 0 copies the live counters into the latch.
    pub fn write_latch(&mut self, value: u8, clock: i64) {
        if self.last_latch_write == 0 && value == 1 {
            self.update(clock);
            self.latched = self.registers;
            log::debug!("Latched RTC values: {:02X?}", self.latched);
        }
        self.last_latch_write = value;
    }

    pub fn read_mapped(&self) -> u8 {
        self.latched[(self.mapped_register - FIRST_RTC_REGISTER) as usize]
    }

    pub fn write_mapped(&mut self, value: u8, clock: i64) {
        self.update(clock);

        let index = (self.mapped_register - FIRST_RTC_REGISTER) as usize;
        self.registers[index] = value & REG_BITS[index];

        // A seconds write also restarts the current second.
        if index == IDX_SECONDS {
            self.clks_sub_second = 0;
        }
    }

    /// Bring the live registers up to date with the emulated clock.
    pub fn update(&mut self, clock: i64) {
        // The halt bit freezes counting.
        if self.registers[IDX_CONTROL] & RTC_STOP_TIMER != 0 {
            self.clks_last_update = clock;
            return;
        }

        let clks_diff = clock - self.clks_last_update + self.clks_sub_second;
        self.clks_last_update = clock;

        if clks_diff < CYCLES_PER_SECOND {
            self.clks_sub_second = clks_diff;
            return;
        }

        let seconds = clks_diff / CYCLES_PER_SECOND;
        self.clks_sub_second = clks_diff % CYCLES_PER_SECOND;

        let minutes = self.add_to_register(IDX_SECONDS, seconds);
        let hours = self.add_to_register(IDX_MINUTES, minutes);
        let mut days = self.add_to_register(IDX_HOURS, hours);

        days += if self.registers[IDX_CONTROL] & RTC_DAY_BIT_9 != 0 { 256 } else { 0 };
        let days_high = self.add_to_register(IDX_DAYS, days);

        let day_msb = if days_high & 1 != 0 { RTC_DAY_BIT_9 } else { 0 };
        // The day carry is sticky until software clears it.
        let day_carry =
            (self.registers[IDX_CONTROL] & RTC_DAY_CARRY) | if days_high >= 2 { RTC_DAY_CARRY } else { 0 };

        self.registers[IDX_CONTROL] = day_msb | day_carry;
    }

    /// Add to a single register, returning the carry into the next one.
    ///
    /// A register that was set above its limit does not carry: it first wraps
    /// around to zero once its full bit range overflows.
    fn add_to_register(&mut self, index: usize, add: i64) -> i64 {
        let limit = REG_LIMITS[index];
        let bits = REG_BITS[index] as i64;

        let mut sum = self.registers[index] as i64 + add;

        if self.registers[index] as i64 >= limit {
            if sum <= bits {
                self.registers[index] = sum as u8;
                return 0;
            }
            // Simulate the wraparound to zero, then carry as usual.
            sum -= bits + 1;
        }

        self.registers[index] = (sum % limit) as u8;
        sum / limit
    }

    pub fn shift_back(&mut self, offset: i64) {
        shift_cycle_back(&mut self.clks_last_update, offset);
    }
}
