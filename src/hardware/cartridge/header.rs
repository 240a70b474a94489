use std::str::from_utf8;

pub const HEADER_START: u16 = 0x0100;
pub const HEADER_END: u16 = 0x014F;

/// A ROM must at least contain the full cartridge information area.
pub const MINIMAL_ROM_SIZE: usize = 0x150;

#[derive(Debug, Default)]
pub struct CartridgeHeader {
    /// Upper case ASCII, 16 characters on DMG carts, zero filled if less than
    /// that. CGB carts reuse the last bytes for flags, so we keep the raw
    /// bytes around and sanitise on demand.
    pub title: [u8; 16],
    /// Part of the title area on old carts, a mode flag on CGB carts.
    pub cgb_flag: bool,
    /// Specifies whether the game supports SGB functions.
    pub sgb_flag: bool,
    /// Which Memory Bank Controller (if any) is used in the cartridge,
    /// and if further external hardware exists in the cartridge.
    pub cartridge_type: u8,
    /// ROM size code, the number of banks is `2 << code`.
    pub rom_size: u8,
    /// RAM size code, see `num_ram_banks`.
    pub ram_size: u8,
    /// Contains an 8 bit checksum across the cartridge header bytes 0134-014C.
    pub header_checksum: u8,
}

impl CartridgeHeader {
    pub fn new(rom: &[u8]) -> Self {
        let mut title = [0; 16];
        title.copy_from_slice(&rom[0x134..=0x143]);

        CartridgeHeader {
            title,
            cgb_flag: matches!(rom[0x143], 0x80 | 0xC0),
            sgb_flag: rom[0x146] == 0x03,
            cartridge_type: rom[0x147],
            rom_size: rom[0x148],
            ram_size: rom[0x149],
            header_checksum: rom[0x14D],
        }
    }

    /// The title restricted to `[A-Za-z0-9_]`: anything else truncates,
    /// spaces become underscores.
    pub fn sanitised_title(&self) -> String {
        let mut result = String::with_capacity(16);
        for &byte in self.title.iter() {
            match byte {
                b' ' => result.push('_'),
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => result.push(byte as char),
                _ => break,
            }
        }
        result
    }

    /// The 8-bit sum over the title bytes, used by the CGB boot ROM to pick
    /// compatibility palettes for DMG-only carts.
    pub fn title_checksum(&self) -> u8 {
        self.title.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
    }

    /// The fourth title character disambiguates titles that share a checksum.
    pub fn title_disambiguation_byte(&self) -> u8 {
        self.title[3]
    }

    /// Lossy human readable title, mostly for logging.
    pub fn display_title(&self) -> String {
        from_utf8(&self.title)
            .unwrap_or("")
            .trim_matches(char::from(0))
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_title(title: &[u8]) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x134..0x134 + title.len()].copy_from_slice(title);
        rom
    }

    #[test]
    fn sanitised_title_truncates_at_first_invalid_byte() {
        let header = CartridgeHeader::new(&rom_with_title(b"ZELDA\x99DX"));
        assert_eq!(header.sanitised_title(), "ZELDA");
    }

    #[test]
    fn sanitised_title_replaces_spaces() {
        let header = CartridgeHeader::new(&rom_with_title(b"METROID II"));
        assert_eq!(header.sanitised_title(), "METROID_II");
    }

    #[test]
    fn cgb_flag_detection() {
        let mut rom = rom_with_title(b"TEST");
        assert!(!CartridgeHeader::new(&rom).cgb_flag);
        rom[0x143] = 0x80;
        assert!(CartridgeHeader::new(&rom).cgb_flag);
        rom[0x143] = 0xC0;
        assert!(CartridgeHeader::new(&rom).cgb_flag);
    }
}
