use crate::hardware::ppu::tiledata::BACKGROUND_TILE_SIZE;
use bitflags::*;

/// The attribute plane behind a tile map, only reachable through VRAM bank 1.
#[derive(Debug)]
pub struct CgbTileMap {
    pub attributes: [CgbTileAttribute; BACKGROUND_TILE_SIZE],
}

impl CgbTileMap {
    pub fn new() -> Self {
        CgbTileMap {
            attributes: [CgbTileAttribute::default(); BACKGROUND_TILE_SIZE],
        }
    }
}

bitflags! {
    #[derive(Default)]
    pub struct CgbTileAttribute: u8 {
        /// BGP 0-7
        const BG_PALETTE_NUMBER = 0b0000_0111;
        /// 0=Bank 0, 1=Bank 1
        const TILE_VRAM_BANK_NUMBER = 0b0000_1000;
        /// Purely so that the full byte is transferred.
        const UNUSED = 0b0001_0000;
        /// (0=Normal, 1=Horizontally mirrored)
        const X_FLIP = 0b0010_0000;
        /// (0=Normal, 1=Vertically mirrored)
        const Y_FLIP = 0b0100_0000;
        /// (0=Use OAM priority bit, 1=BG Priority)
        const BG_TO_OAM_PRIORITY = 0b1000_0000;
    }
}

impl CgbTileAttribute {
    /// Returns the BG palette number in the range `0..=7`
    pub fn bg_palette_numb(&self) -> usize {
        (self.bits & 0x7) as usize
    }
}
