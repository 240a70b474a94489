//! CGB specific rendering; the DMG paths live in ppu/mod.rs.

use crate::hardware::ppu::cgb_vram::CgbTileAttribute;
use crate::hardware::ppu::register_flags::{AttributeFlags, LcdControl};
use crate::hardware::ppu::tiledata::{BACKGROUND_TILE_SIZE, TILES_PER_BANK};
use crate::hardware::ppu::{Ppu, RESOLUTION_WIDTH};

impl Ppu {
    pub(super) fn draw_cgb_scanline(&mut self, window_drawn: bool) {
        // In CGB mode the background always renders; LCDC bit 0 only demotes
        // its priority over sprites.
        self.draw_cgb_bg_scanline();
        if window_drawn {
            self.draw_cgb_window_scanline();
        }

        if self.lcd_control.contains(LcdControl::SPRITE_DISPLAY_ENABLE) {
            self.draw_cgb_sprite_scanline();
        }
    }

    fn draw_cgb_bg_scanline(&mut self) {
        let y = self.current_y.wrapping_add(self.scroll_y);
        let tile_row = (y / 8) as usize * 32;

        for pixel_x in 0..RESOLUTION_WIDTH {
            let x = (pixel_x as u8).wrapping_add(self.scroll_x);
            let map_index = (tile_row + (x / 8) as usize) % BACKGROUND_TILE_SIZE;

            let tile_id = self.get_tile_address_bg(map_index);
            let attributes = self.get_tile_attributes_cgb_bg(map_index);

            let colour = self.cgb_tile_pixel(tile_id, attributes, (x % 8) as usize, (y % 8) as usize);
            self.scanline_buffer[pixel_x] =
                self.cgb_bg_palette[attributes.bg_palette_numb()].colour(colour);
            self.scanline_buffer_unpalette[pixel_x] =
                (colour, attributes.contains(CgbTileAttribute::BG_TO_OAM_PRIORITY));
        }
    }

    fn draw_cgb_window_scanline(&mut self) {
        let window_x = self.window_x as i16 - 7;
        let tile_row = (self.window_counter / 8) as usize * 32;
        let tile_line = (self.window_counter % 8) as usize;
        self.window_counter += 1;

        for pixel_x in window_x.max(0)..RESOLUTION_WIDTH as i16 {
            let x = (pixel_x - window_x) as usize;
            let map_index = (tile_row + x / 8) % BACKGROUND_TILE_SIZE;

            let tile_id = self.get_tile_address_window(map_index);
            let attributes = self.get_tile_attributes_cgb_window(map_index);

            let colour = self.cgb_tile_pixel(tile_id, attributes, x % 8, tile_line);
            self.scanline_buffer[pixel_x as usize] =
                self.cgb_bg_palette[attributes.bg_palette_numb()].colour(colour);
            self.scanline_buffer_unpalette[pixel_x as usize] =
                (colour, attributes.contains(CgbTileAttribute::BG_TO_OAM_PRIORITY));
        }
    }

    fn draw_cgb_sprite_scanline(&mut self) {
        let tall_sprites = self.lcd_control.contains(LcdControl::SPRITE_SIZE);
        let y_size = if tall_sprites { 16 } else { 8 };
        // With LCDC bit 0 cleared sprites win over everything.
        let always_display_sprite = !self.lcd_control.contains(LcdControl::BG_WINDOW_PRIORITY);

        let mut sprites = self.sprites_on_line();
        // The CGB prioritises by OAM index unless OPRI selects DMG rules.
        if !self.cgb_object_priority {
            sprites.sort_unstable_by_key(|(index, sprite)| (sprite.x_pos, *index));
        }

        for &(_, sprite) in sprites.iter().rev() {
            let screen_x_pos = sprite.x_pos as i16 - 8;
            let screen_y_pos = sprite.y_pos as i16 - 16;

            let x_flip = sprite.attribute_flags.contains(AttributeFlags::X_FLIP);
            let y_flip = sprite.attribute_flags.contains(AttributeFlags::Y_FLIP);
            let is_background_sprite = sprite.attribute_flags.contains(AttributeFlags::OBJ_TO_BG_PRIORITY);

            let mut line = (self.current_y as i16 - screen_y_pos) as u8;
            if y_flip {
                line = y_size - (line + 1);
            }

            let mut tile_index = sprite.tile_number as usize;
            if tall_sprites {
                tile_index = if line < 8 { tile_index & 0xFE } else { tile_index | 0x01 };
            }
            tile_index +=
                TILES_PER_BANK * sprite.attribute_flags.contains(AttributeFlags::TILE_VRAM_BANK) as usize;

            let tile = &self.tiles[tile_index];
            let palette = &self.cgb_sprite_palette[sprite.attribute_flags.get_cgb_palette_number()];

            for j in 0..8_i16 {
                let pixel = screen_x_pos + j;
                if pixel < 0 || pixel > 159 {
                    continue;
                }

                let tile_x = if x_flip { 7 - j } else { j } as usize;
                let colour = tile.get_pixel(tile_x, (line % 8) as usize);
                if colour == 0 {
                    continue;
                }

                // BG-to-OAM priority comes from three places: LCDC bit 0,
                // the tile attribute and the sprite attribute.
                let (bg_colour, bg_has_priority) = self.scanline_buffer_unpalette[pixel as usize];
                if !always_display_sprite && bg_colour != 0 && (is_background_sprite || bg_has_priority) {
                    continue;
                }

                self.scanline_buffer[pixel as usize] = palette.colour(colour);
            }
        }
    }

    /// Resolve one pixel of a BG/window tile, honouring the CGB attribute
    /// flips and the bank selection bit.
    #[inline]
    fn cgb_tile_pixel(&self, tile_id: u8, attributes: CgbTileAttribute, x: usize, y: usize) -> u8 {
        let mut tile_address = self.resolve_bg_window_tile(tile_id);
        tile_address += TILES_PER_BANK * attributes.contains(CgbTileAttribute::TILE_VRAM_BANK_NUMBER) as usize;

        let x = if attributes.contains(CgbTileAttribute::X_FLIP) { 7 - x } else { x };
        let y = if attributes.contains(CgbTileAttribute::Y_FLIP) { 7 - y } else { y };

        self.tiles[tile_address].get_pixel(x, y)
    }

    fn get_tile_attributes_cgb_bg(&self, index: usize) -> CgbTileAttribute {
        if !self.lcd_control.contains(LcdControl::BG_TILE_MAP_SELECT) {
            self.cgb_9800_tile_map.attributes[index]
        } else {
            self.cgb_9c00_tile_map.attributes[index]
        }
    }

    fn get_tile_attributes_cgb_window(&self, index: usize) -> CgbTileAttribute {
        if !self.lcd_control.contains(LcdControl::WINDOW_MAP_SELECT) {
            self.cgb_9800_tile_map.attributes[index]
        } else {
            self.cgb_9c00_tile_map.attributes[index]
        }
    }
}
