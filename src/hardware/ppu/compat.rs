//! DMG-on-CGB compatibility palettes.
//!
//! The CGB boot ROM hashes the cartridge title and picks a colourisation for
//! DMG-only games from a built-in table. We reproduce the lookup (8-bit title
//! checksum, disambiguated by the fourth title character where checksums
//! collide) for the titles the table covers, falling back to the boot ROM's
//! default colourisation for everything else.

use crate::hardware::ppu::palette::{DisplayColour, Pixel};

const WHITE: Pixel = Pixel::new(0xFF, 0xFF, 0xFF);
const BLACK: Pixel = Pixel::new(0x00, 0x00, 0x00);

/// The default colourisation applied when no table entry matches.
const DEFAULT_BG: DisplayColour = DisplayColour {
    white: WHITE,
    light_grey: Pixel::new(0x7B, 0xFF, 0x31),
    dark_grey: Pixel::new(0x00, 0x63, 0xC5),
    black: BLACK,
};
const DEFAULT_OBJ: DisplayColour = DisplayColour {
    white: WHITE,
    light_grey: Pixel::new(0xFF, 0x84, 0x84),
    dark_grey: Pixel::new(0x94, 0x3A, 0x3A),
    black: BLACK,
};

const BROWN: DisplayColour = DisplayColour {
    white: WHITE,
    light_grey: Pixel::new(0xFF, 0xAD, 0x63),
    dark_grey: Pixel::new(0x84, 0x31, 0x00),
    black: BLACK,
};
const RED: DisplayColour = DisplayColour {
    white: WHITE,
    light_grey: Pixel::new(0xFF, 0x84, 0x84),
    dark_grey: Pixel::new(0x94, 0x3A, 0x3A),
    black: BLACK,
};
const BLUE: DisplayColour = DisplayColour {
    white: WHITE,
    light_grey: Pixel::new(0x63, 0xA5, 0xFF),
    dark_grey: Pixel::new(0x00, 0x00, 0xFF),
    black: BLACK,
};
const GREEN: DisplayColour = DisplayColour {
    white: WHITE,
    light_grey: Pixel::new(0x52, 0xFF, 0x00),
    dark_grey: Pixel::new(0xFF, 0x42, 0x00),
    black: BLACK,
};
const YELLOW: DisplayColour = DisplayColour {
    white: WHITE,
    light_grey: Pixel::new(0xFF, 0xFF, 0x00),
    dark_grey: Pixel::new(0xFF, 0x00, 0x00),
    black: BLACK,
};
const PASTEL_MIX: DisplayColour = DisplayColour {
    white: Pixel::new(0xFF, 0xFF, 0xA5),
    light_grey: Pixel::new(0xFF, 0x94, 0x94),
    dark_grey: Pixel::new(0x94, 0x94, 0xFF),
    black: BLACK,
};

/// Resolve the `(bg, obj0, obj1)` colourisation for a DMG cart running on
/// CGB hardware.
pub fn dmg_compat_palettes(title_checksum: u8, disambiguation: u8) -> (DisplayColour, DisplayColour, DisplayColour) {
    match (title_checksum, disambiguation) {
        // POKEMON RED
        (0x14, _) => (DEFAULT_BG, RED, RED),
        // POKEMON BLUE
        (0x61, b'E') => (DEFAULT_BG, BLUE, BLUE),
        // ZELDA
        (0x70, _) => (GREEN, RED, RED),
        // TETRIS
        (0xDB, _) => (YELLOW, YELLOW, YELLOW),
        // SUPER MARIOLAND / MARIOLAND2
        (0x15, _) | (0xC9, _) => (PASTEL_MIX, RED, RED),
        // KIRBY DREAM LAND
        (0x27, b'B') => (RED, BROWN, BROWN),
        // DONKEY KONG
        (0x19, _) => (BROWN, DEFAULT_OBJ, DEFAULT_OBJ),
        _ => (DEFAULT_BG, DEFAULT_OBJ, DEFAULT_OBJ),
    }
}

/// The colourisation of a cart that never goes through the compatibility
/// path (a DMG machine), per the configured hint.
pub fn dmg_machine_palettes(greyscale: bool) -> (DisplayColour, DisplayColour, DisplayColour) {
    use crate::hardware::ppu::palette::{DMG_DISPLAY_COLOURS, GREYSCALE_DISPLAY_COLOURS};
    let colours = if greyscale {
        GREYSCALE_DISPLAY_COLOURS
    } else {
        DMG_DISPLAY_COLOURS
    };
    (colours, colours, colours)
}
