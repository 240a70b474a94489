use crate::hardware::cartridge::rtc::RealTimeClock;

/// The memory bank controller soldered onto the cartridge.
///
/// Each variant carries exactly the state the controller itself holds; the
/// resulting ROM/RAM bank selections live in [`super::Cartridge`] as
/// precomputed offsets. Dispatch is a plain `match`, there is no dynamic
/// lookup involved.
#[derive(Debug)]
pub enum Mbc {
    None,
    Mbc1 {
        bank1: u8,
        bank2: u8,
        mode1: bool,
        multicart: bool,
    },
    Mbc2,
    Mbc3,
    Mbc3Rtc(RealTimeClock),
    Mbc5 {
        bank_2000: u8,
        bank_3000: u8,
        rumble: bool,
    },
    /// Accelerometer + EEPROM cart.
    /// TODO: implement the accelerometer and EEPROM protocols; both currently
    /// read as 0xFF.
    Mbc7,
}

/// Which controller (plus battery) a cartridge-type byte maps to.
///
/// Returns `None` for types we do not support, which surfaces as a
/// construction error.
pub fn decode_cartridge_type(cartridge_type: u8) -> Option<(Mbc, bool)> {
    let mbc = match cartridge_type {
        0x00 | 0x08 | 0x09 => Mbc::None,
        0x01..=0x03 => Mbc::Mbc1 {
            bank1: 1,
            bank2: 0,
            mode1: false,
            // The multi-cart heuristic needs the full ROM and is applied
            // by the cartridge constructor.
            multicart: false,
        },
        0x05 | 0x06 => Mbc::Mbc2,
        0x0F | 0x10 => Mbc::Mbc3Rtc(RealTimeClock::new()),
        0x11..=0x13 => Mbc::Mbc3,
        0x19..=0x1B => Mbc::Mbc5 {
            bank_2000: 1,
            bank_3000: 0,
            rumble: false,
        },
        0x1C..=0x1E => Mbc::Mbc5 {
            bank_2000: 1,
            bank_3000: 0,
            rumble: true,
        },
        0x22 => Mbc::Mbc7,
        _ => return None,
    };

    let battery = matches!(cartridge_type, 0x03 | 0x06 | 0x09 | 0x0D | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E | 0x22);

    Some((mbc, battery))
}
