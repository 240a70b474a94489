use crate::hardware::ppu::Mode;

use bitflags::*;

// # PPU FLAGS #

bitflags! {
    /// FF40
    /// LCDC is a powerful tool: each bit controls a lot of behavior,
    /// and can be modified at any time during the frame.
    ///
    /// One of the important aspects of LCDC is that unlike VRAM,
    /// the PPU never locks it. It's thus possible to modify it mid-scanline!
    #[derive(Default)]
    pub struct LcdControl: u8 {
        /// `BG_WINDOW_PRIORITY` has different meanings depending on Game Boy type and Mode:
        ///
        /// Monochrome Gameboy and CGB in Non-CGB Mode: when cleared, both
        /// background and window become blank (white) and the window display
        /// bit is ignored.
        ///
        /// CGB in CGB Mode: when cleared the background and window lose their
        /// priority - sprites are always displayed on top.
        const BG_WINDOW_PRIORITY = 0b0000_0001;
        /// This bit toggles whether sprites are displayed or not.
        const SPRITE_DISPLAY_ENABLE = 0b0000_0010;
        /// This bit controls the sprite size (1 tile or 2 stacked vertically).
        const SPRITE_SIZE = 0b0000_0100;
        /// If the bit is reset the BG uses tilemap `$9800`, otherwise `$9C00`.
        const BG_TILE_MAP_SELECT = 0b0000_1000;
        /// 0=8800-97FF, 1=8000-8FFF.
        /// Controls which addressing mode the BG and Window use to pick tiles.
        /// Sprites always use $8000 addressing.
        const BG_WINDOW_TILE_SELECT = 0b0001_0000;
        /// Whether the window is displayed.
        /// Overridden on DMG by bit 0 if that bit is reset.
        const WINDOW_DISPLAY = 0b0010_0000;
        /// Which background map the window uses, `$9800` or `$9C00`.
        const WINDOW_MAP_SELECT = 0b0100_0000;
        /// Whether the LCD is on and the PPU active. Setting it to 0 grants
        /// immediate and full access to VRAM and OAM.
        const LCD_DISPLAY = 0b1000_0000;
    }
}

bitflags! {
    /// FF41
    /// The mode bits and the coincidence flag are read only; the four
    /// interrupt enable bits select which conditions pull the STAT line high.
    #[derive(Default)]
    pub struct LcdStatus: u8 {
        /// Mode Flag (Mode 0-3) (Read Only)
        /// * 0: During H-Blank
        /// * 1: During V-Blank
        /// * 2: During Searching OAM
        /// * 3: During Transferring Data to LCD Driver
        const MODE_FLAG_0 = 0b0000_0001;
        /// Extension of `MODE_FLAG_0`
        const MODE_FLAG_1 = 0b0000_0010;
        /// (0:LYC<>LY, 1:LYC=LY) (Read Only)
        const COINCIDENCE_FLAG = 0b0000_0100;
        /// Mode 0 H-Blank Interrupt
        const MODE_0_H_INTERRUPT = 0b0000_1000;
        /// Mode 1 V-Blank Interrupt
        const MODE_1_V_INTERRUPT = 0b0001_0000;
        /// Mode 2 OAM Interrupt
        const MODE_2_OAM_INTERRUPT = 0b0010_0000;
        /// LYC=LY Coincidence Interrupt (1=Enable) (Read/Write)
        const COINCIDENCE_INTERRUPT = 0b0100_0000;

        const UNUSED = 0b1000_0000;
    }
}

bitflags! {
    /// The attribute byte of an OAM entry.
    #[derive(Default)]
    pub struct AttributeFlags: u8 {
        /// **CGB Mode Only** (OBP0-7)
        const PALETTE_NUMBER_CGB = 0b0000_0111;
        /// **CGB Mode Only** (0=Bank 0, 1=Bank 1)
        const TILE_VRAM_BANK = 0b0000_1000;
        /// **Non CGB Mode Only** (0=OBP0, 1=OBP1)
        const PALETTE_NUMBER = 0b0001_0000;
        /// (0=Normal, 1=Horizontally mirrored)
        const X_FLIP = 0b0010_0000;
        /// (0=Normal, 1=Vertically mirrored)
        const Y_FLIP = 0b0100_0000;
        /// (0=OBJ Above BG, 1=OBJ Behind BG color 1-3)
        const OBJ_TO_BG_PRIORITY = 0b1000_0000;
    }
}

impl AttributeFlags {
    pub fn get_cgb_palette_number(&self) -> usize {
        (self.bits & 0x07) as usize
    }
}

impl LcdStatus {
    pub fn mode_flag(&self) -> Mode {
        match self.bits & 0x3 {
            0 => Mode::Hblank,
            1 => Mode::Vblank,
            2 => Mode::OamSearch,
            _ => Mode::LcdTransfer,
        }
    }

    pub fn set_mode_flag(&mut self, value: Mode) {
        self.bits = (self.bits & 0xFC)
            | match value {
                Mode::Hblank => 0,
                Mode::Vblank => 1,
                Mode::OamSearch => 2,
                Mode::LcdTransfer => 3,
            }
    }
}
