use tinyvec::ArrayVec;

use crate::emulator::GameBoyModel;
use crate::hardware::cartridge::header::CartridgeHeader;
use crate::hardware::ppu::cgb_vram::CgbTileMap;
use crate::hardware::ppu::compat::{dmg_compat_palettes, dmg_machine_palettes};
use crate::hardware::ppu::palette::{
    CgbPalette, CgbPaletteIndex, ColorsHint, DisplayColour, Palette, Pixel,
};
use crate::hardware::ppu::register_flags::*;
use crate::hardware::ppu::tiledata::*;
use crate::io::interrupts::{InterruptFlags, Interrupts};
use crate::scheduler::{shift_cycle_back, EventType, Scheduler};

pub mod cgb_ppu;
pub mod cgb_vram;
pub mod compat;
pub mod memory_binds;
pub mod palette;
pub mod register_flags;
pub mod tiledata;

pub const RESOLUTION_WIDTH: usize = 160;
pub const RESOLUTION_HEIGHT: usize = 144;
pub const FRAMEBUFFER_SIZE: usize = RESOLUTION_WIDTH * RESOLUTION_HEIGHT;

pub const SCANLINE_DURATION: i64 = 456;
pub const MODE_2_DURATION: i64 = 80;
/// Base duration of mode 3, before the SCX/window/sprite extensions.
pub const MODE_3_BASE_DURATION: i64 = 172;
pub const CYCLES_PER_FRAME: i64 = SCANLINE_DURATION * 154;
/// LY only reads as 153 for the first few clocks of the last line.
pub(crate) const LY_153_VISIBLE_CYCLES: i64 = 4;

/// The memory dump a real boot ROM leaves behind at 0x8010
/// (every other byte, the in-between bytes stay zero), based on the *.bin
/// files used by gambatte tests and gambatte source code (initstate.cpp).
const BOOT_SPARSE_VRAM_DUMP: [u8; 200] = [
    0xF0, 0xF0, 0xFC, 0xFC, 0xFC, 0xFC, 0xF3, 0xF3, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C,
    0xF0, 0xF0, 0xF0, 0xF0, 0x00, 0x00, 0xF3, 0xF3, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xCF, 0xCF,
    0x00, 0x00, 0x0F, 0x0F, 0x3F, 0x3F, 0x0F, 0x0F, 0x00, 0x00, 0x00, 0x00, 0xC0, 0xC0, 0x0F, 0x0F,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF3, 0xF3,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0xC0, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0xFF, 0xFF,
    0xC0, 0xC0, 0xC0, 0xC0, 0xC0, 0xC0, 0xC3, 0xC3, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFC, 0xFC,
    0xF3, 0xF3, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0x3C, 0x3C, 0xFC, 0xFC, 0xFC, 0xFC, 0x3C, 0x3C,
    0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3,
    0xCF, 0xCF, 0xCF, 0xCF, 0xCF, 0xCF, 0xCF, 0xCF, 0x3C, 0x3C, 0x3F, 0x3F, 0x3C, 0x3C, 0x0F, 0x0F,
    0x3C, 0x3C, 0xFC, 0xFC, 0x00, 0x00, 0xFC, 0xFC, 0xFC, 0xFC, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0,
    0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xF3, 0xF0, 0xF0, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xFF, 0xFF,
    0xCF, 0xCF, 0xCF, 0xCF, 0xCF, 0xCF, 0xC3, 0xC3, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0xFC, 0xFC,
    0x3C, 0x42, 0xB9, 0xA5, 0xB9, 0xA5, 0x42, 0x3C,
];

#[derive(Debug, PartialOrd, PartialEq, Copy, Clone)]
pub enum Mode {
    Hblank,
    Vblank,
    OamSearch,
    LcdTransfer,
}

/// Double buffered 160x144 output.
pub struct ScreenBuffer {
    front: Box<[Pixel; FRAMEBUFFER_SIZE]>,
    back: Box<[Pixel; FRAMEBUFFER_SIZE]>,
    frame_id: u64,
}

impl ScreenBuffer {
    fn new() -> Self {
        ScreenBuffer {
            front: Box::new([Pixel::default(); FRAMEBUFFER_SIZE]),
            back: Box::new([Pixel::default(); FRAMEBUFFER_SIZE]),
            frame_id: 0,
        }
    }

    pub fn front_buffer(&self) -> &[Pixel; FRAMEBUFFER_SIZE] {
        &self.front
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}

pub struct Ppu {
    pub(crate) screen_buffer: ScreenBuffer,
    scanline_buffer: [Pixel; RESOLUTION_WIDTH],
    /// The raw 2-bit colour index per pixel plus the CGB BG-priority bit,
    /// needed for sprite priority decisions.
    scanline_buffer_unpalette: [(u8, bool); RESOLUTION_WIDTH],

    /// 384 tiles per bank, bank 1 only reachable on CGB.
    tiles: [Tile; 2 * TILES_PER_BANK],
    tile_map_9800: TileMap,
    tile_map_9c00: TileMap,
    cgb_9800_tile_map: CgbTileMap,
    cgb_9c00_tile_map: CgbTileMap,
    oam: [SpriteAttribute; 40],

    lcd_control: LcdControl,
    lcd_status: LcdStatus,

    bg_window_palette: Palette,
    oam_palette_0: Palette,
    oam_palette_1: Palette,
    bg_display_colours: DisplayColour,
    sp0_display_colours: DisplayColour,
    sp1_display_colours: DisplayColour,

    cgb_bg_palette: [CgbPalette; 8],
    cgb_sprite_palette: [CgbPalette; 8],
    cgb_bg_palette_ind: CgbPaletteIndex,
    cgb_sprite_palette_ind: CgbPaletteIndex,
    colors_hint: ColorsHint,

    compare_line: u8,
    current_y: u8,
    scroll_x: u8,
    scroll_y: u8,
    window_x: u8,
    window_y: u8,
    window_counter: u8,
    window_triggered: bool,
    tile_bank_currently_used: u8,
    /// OPRI: false = DMG style x-coordinate priority, true = OAM index priority.
    cgb_object_priority: bool,

    /// Current level of the (OR'ed) STAT interrupt line, for edge detection.
    stat_irq_triggered: bool,
    /// Set by the OAM DMA unit while it owns the OAM.
    oam_transfer_ongoing: bool,

    clk_current_line_start: i64,
    current_mode3_length: i64,
    /// Suppresses the LY increment for the first line of a fresh frame.
    frame_restarted: bool,
    /// The line right after enabling the LCD reports mode 0 during its
    /// (shortened) OAM period.
    first_line_after_enable: bool,

    model: GameBoyModel,
    /// True when rendering with the full CGB feature set (CGB cart on CGB).
    cgb_rendering: bool,
}

impl Ppu {
    pub fn new(model: GameBoyModel, colors_hint: ColorsHint, header: &CartridgeHeader) -> Self {
        let cgb_rendering = model.is_cgb() && header.cgb_flag;

        let (bg, sp0, sp1) = if model.is_dmg() {
            dmg_machine_palettes(colors_hint == ColorsHint::DmgGreyscale)
        } else if !header.cgb_flag {
            dmg_compat_palettes(header.title_checksum(), header.title_disambiguation_byte())
        } else {
            // Unused for CGB rendering, the colours come from palette memory.
            dmg_machine_palettes(false)
        };

        let mut result = Ppu {
            screen_buffer: ScreenBuffer::new(),
            scanline_buffer: [Pixel::default(); RESOLUTION_WIDTH],
            scanline_buffer_unpalette: [(0, false); RESOLUTION_WIDTH],
            tiles: [Tile::default(); 2 * TILES_PER_BANK],
            tile_map_9800: TileMap::new(),
            tile_map_9c00: TileMap::new(),
            cgb_9800_tile_map: CgbTileMap::new(),
            cgb_9c00_tile_map: CgbTileMap::new(),
            oam: [SpriteAttribute::default(); 40],
            lcd_control: LcdControl::from_bits_truncate(0x91),
            lcd_status: LcdStatus::from_bits_truncate(0x02),
            bg_window_palette: Palette::new(0xFC, bg),
            oam_palette_0: Palette::new(0xFF, sp0),
            oam_palette_1: Palette::new(0xFF, sp1),
            bg_display_colours: bg,
            sp0_display_colours: sp0,
            sp1_display_colours: sp1,
            cgb_bg_palette: [CgbPalette::default(); 8],
            cgb_sprite_palette: [CgbPalette::default(); 8],
            cgb_bg_palette_ind: CgbPaletteIndex::default(),
            cgb_sprite_palette_ind: CgbPaletteIndex::default(),
            colors_hint,
            compare_line: 0,
            current_y: 0,
            scroll_x: 0,
            scroll_y: 0,
            window_x: 0,
            window_y: 0,
            window_counter: 0,
            window_triggered: false,
            tile_bank_currently_used: 0,
            cgb_object_priority: cgb_rendering,
            stat_irq_triggered: false,
            oam_transfer_ongoing: false,
            clk_current_line_start: 0,
            current_mode3_length: MODE_3_BASE_DURATION,
            frame_restarted: true,
            first_line_after_enable: false,
            model,
            cgb_rendering,
        };

        result.seed_boot_vram();
        result
    }

    /// Replicate the VRAM contents a real boot ROM leaves behind: the sparse
    /// tile pattern at 0x8010 and, on DMG, the logo tilemap rows at 0x9904.
    fn seed_boot_vram(&mut self) {
        for (i, &value) in BOOT_SPARSE_VRAM_DUMP.iter().enumerate() {
            let relative = 0x10 + i * 2;
            self.tiles[relative / 16].update_byte(relative % 16, value);
        }

        if self.model.is_dmg() {
            self.tile_map_9800.data[0x110] = 0x19;
            for i in 1..=0x0C_u8 {
                self.tile_map_9800.data[0x103 + i as usize] = i;
                self.tile_map_9800.data[0x123 + i as usize] = i + 0x0C;
            }
        }
    }

    /*
       Scheduler event handlers. The actual (re)scheduling of follow-up events
       is done by the memory unit owning both us and the scheduler.
    */

    /// Start of a visible line (mode 2).
    pub fn oam_search(&mut self, interrupts: &mut Interrupts, now: i64) {
        self.clk_current_line_start = now;
        if self.frame_restarted {
            self.frame_restarted = false;
        } else {
            self.current_y += 1;
        }

        self.lcd_status.set_mode_flag(Mode::OamSearch);
        self.ly_lyc_compare(interrupts);
    }

    /// Start of mode 3; this is where we rasterise the line.
    pub fn lcd_transfer(&mut self, interrupts: &mut Interrupts) {
        self.first_line_after_enable = false;
        self.lcd_status.set_mode_flag(Mode::LcdTransfer);
        // No mode 3 STAT source exists, but the line level still has to be
        // re-evaluated so the next h-blank produces a clean rising edge.
        self.request_stat_interrupt(interrupts);
        self.draw_scanline();
    }

    /// Start of mode 0.
    pub fn hblank(&mut self, interrupts: &mut Interrupts) {
        self.lcd_status.set_mode_flag(Mode::Hblank);
        self.request_stat_interrupt(interrupts);
    }

    /// Start of line 144.
    pub fn vblank(&mut self, interrupts: &mut Interrupts, now: i64) {
        self.clk_current_line_start = now;
        self.current_y += 1;
        self.lcd_status.set_mode_flag(Mode::Vblank);
        interrupts.insert_interrupt(InterruptFlags::VBLANK);
        self.ly_lyc_compare(interrupts);
    }

    /// Start of lines 145..=153 plus the end of line 153.
    ///
    /// Returns `true` once the frame is complete, which is also the moment
    /// the front/back buffers trade places.
    pub fn vblank_wait(&mut self, interrupts: &mut Interrupts, now: i64) -> bool {
        self.clk_current_line_start = now;

        if self.current_y == 153 {
            self.current_y = 0;
            self.frame_restarted = true;
            self.window_counter = 0;
            self.window_triggered = false;
            self.screen_buffer.swap();
            true
        } else {
            self.current_y += 1;
            self.ly_lyc_compare(interrupts);
            false
        }
    }

    /// The LCD was just switched on mid-frame: a fresh frame starts with a
    /// line that is 3 clocks short and reports mode 0 during its OAM period.
    /// The LY=LYC comparison stays suppressed until the next line.
    pub fn turn_on_lcd(&mut self, scheduler: &mut Scheduler, speed_shift: i64) {
        log::debug!("Turning on LCD");
        self.current_y = 0;
        self.window_counter = 0;
        self.window_triggered = false;
        self.frame_restarted = false;
        self.first_line_after_enable = true;
        self.clk_current_line_start = scheduler.current_time;
        self.lcd_status.set_mode_flag(Mode::Hblank);
        scheduler.push_relative(EventType::LcdTransfer, (MODE_2_DURATION - 3) << speed_shift);
    }

    /// LY and the mode freeze to 0; the coincidence flag keeps its last value.
    pub fn turn_off_lcd(&mut self, scheduler: &mut Scheduler) {
        log::debug!("Turning off LCD");
        self.current_y = 0;
        self.window_counter = 0;
        self.lcd_status.set_mode_flag(Mode::Hblank);
        self.stat_irq_triggered = false;
        scheduler.remove_event_type(EventType::OamSearch);
        scheduler.remove_event_type(EventType::LcdTransfer);
        scheduler.remove_event_type(EventType::Hblank);
        scheduler.remove_event_type(EventType::Vblank);
        scheduler.remove_event_type(EventType::VblankWait);
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcd_control.contains(LcdControl::LCD_DISPLAY)
    }

    /// How long mode 3 lasts on the line that was just drawn.
    pub fn mode3_length(&self) -> i64 {
        self.current_mode3_length
    }

    pub fn current_line(&self) -> u8 {
        self.current_y
    }

    pub fn frame_id(&self) -> u64 {
        self.screen_buffer.frame_id()
    }

    pub fn shift_back(&mut self, offset: i64) {
        shift_cycle_back(&mut self.clk_current_line_start, offset);
    }

    /*
       Rendering.
    */

    fn draw_scanline(&mut self) {
        // The window latches on the first line where it matches WY while
        // enabled, and keeps rendering from its own line counter afterwards.
        if self.lcd_control.contains(LcdControl::WINDOW_DISPLAY)
            && !self.window_triggered
            && self.current_y == self.window_y
        {
            self.window_triggered = true;
        }

        let window_drawn = self.window_drawn_this_line();
        self.current_mode3_length = MODE_3_BASE_DURATION
            + (self.scroll_x & 7) as i64
            + if window_drawn { 6 } else { 0 }
            + self.sprite_fetch_penalty();

        if self.cgb_rendering {
            self.draw_cgb_scanline(window_drawn);
        } else {
            self.draw_dmg_scanline(window_drawn);
        }

        let current_address = self.current_y as usize * RESOLUTION_WIDTH;
        self.screen_buffer.back[current_address..current_address + RESOLUTION_WIDTH]
            .copy_from_slice(&self.scanline_buffer);
    }

    fn window_drawn_this_line(&self) -> bool {
        let enabled = self.lcd_control.contains(LcdControl::WINDOW_DISPLAY)
            && (self.cgb_rendering || self.lcd_control.contains(LcdControl::BG_WINDOW_PRIORITY));
        enabled && self.window_triggered && self.window_x < 167
    }

    fn draw_dmg_scanline(&mut self, window_drawn: bool) {
        if self.lcd_control.contains(LcdControl::BG_WINDOW_PRIORITY) {
            self.draw_bg_scanline();
            if window_drawn {
                self.draw_window_scanline();
            }
        } else {
            // Both background and window are blanked to colour 0.
            let colour = self.bg_window_palette.colour(0);
            for (pixel, unpalette) in self
                .scanline_buffer
                .iter_mut()
                .zip(self.scanline_buffer_unpalette.iter_mut())
            {
                *pixel = colour;
                *unpalette = (0, false);
            }
        }

        if self.lcd_control.contains(LcdControl::SPRITE_DISPLAY_ENABLE) {
            self.draw_sprite_scanline();
        }
    }

    fn draw_bg_scanline(&mut self) {
        let y = self.current_y.wrapping_add(self.scroll_y);
        let tile_row = (y / 8) as usize * 32;
        let tile_line = (y % 8) as usize;

        for pixel_x in 0..RESOLUTION_WIDTH {
            let x = (pixel_x as u8).wrapping_add(self.scroll_x);
            let tile_id = self.get_tile_address_bg(tile_row + (x / 8) as usize);
            let tile = &self.tiles[self.resolve_bg_window_tile(tile_id)];

            let colour = tile.get_pixel((x % 8) as usize, tile_line);
            self.scanline_buffer[pixel_x] = self.bg_window_palette.colour(colour);
            self.scanline_buffer_unpalette[pixel_x] = (colour, false);
        }
    }

    fn draw_window_scanline(&mut self) {
        let window_x = self.window_x as i16 - 7;
        let tile_row = (self.window_counter / 8) as usize * 32;
        let tile_line = (self.window_counter % 8) as usize;
        // The window keeps its own line counter for the rest of the frame.
        self.window_counter += 1;

        for pixel_x in window_x.max(0)..RESOLUTION_WIDTH as i16 {
            let x = (pixel_x - window_x) as usize;
            let tile_id = self.get_tile_address_window(tile_row + x / 8);
            let tile = &self.tiles[self.resolve_bg_window_tile(tile_id)];

            let colour = tile.get_pixel(x % 8, tile_line);
            self.scanline_buffer[pixel_x as usize] = self.bg_window_palette.colour(colour);
            self.scanline_buffer_unpalette[pixel_x as usize] = (colour, false);
        }
    }

    fn draw_sprite_scanline(&mut self) {
        let tall_sprites = self.lcd_control.contains(LcdControl::SPRITE_SIZE);
        let y_size = if tall_sprites { 16 } else { 8 };

        let mut sprites = self.sprites_on_line();
        // DMG: a lower x position always wins, ties go to the lower OAM
        // index. We render in reverse priority order so the winner lands last.
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

            let tile_index = sprite.tile_number as usize;
            let tile = if !tall_sprites {
                &self.tiles[tile_index]
            } else if line < 8 {
                &self.tiles[tile_index & 0xFE]
            } else {
                &self.tiles[tile_index | 0x01]
            };

            let palette = if sprite.attribute_flags.contains(AttributeFlags::PALETTE_NUMBER) {
                self.oam_palette_1
            } else {
                self.oam_palette_0
            };

            for j in 0..8_i16 {
                let pixel = screen_x_pos + j;
                if pixel < 0 || pixel > 159 {
                    continue;
                }

                let tile_x = if x_flip { 7 - j } else { j } as usize;
                let colour = tile.get_pixel(tile_x, (line % 8) as usize);

                // Colour 0 is transparent for sprites; a "background" sprite
                // only shows through BG colour 0.
                if colour == 0
                    || (is_background_sprite && self.scanline_buffer_unpalette[pixel as usize].0 != 0)
                {
                    continue;
                }

                self.scanline_buffer[pixel as usize] = palette.colour(colour);
            }
        }
    }

    /// The (up to 10) sprites overlapping the current line, in OAM order.
    fn sprites_on_line(&self) -> ArrayVec<[(u8, SpriteAttribute); 10]> {
        let y_size = if self.lcd_control.contains(LcdControl::SPRITE_SIZE) {
            16
        } else {
            8
        };

        let mut result = ArrayVec::new();
        for (index, sprite) in self.oam.iter().enumerate() {
            let screen_y_pos = sprite.y_pos as i16 - 16;
            if is_sprite_on_scanline(self.current_y as i16, screen_y_pos, y_size) {
                result.push((index as u8, *sprite));
                if result.len() == 10 {
                    break;
                }
            }
        }
        result
    }

    /// Every selected sprite stalls the fetcher for 6 to 11 clocks depending
    /// on how its x position aligns with the background fetch.
    fn sprite_fetch_penalty(&self) -> i64 {
        if !self.lcd_control.contains(LcdControl::SPRITE_DISPLAY_ENABLE) {
            return 0;
        }
        self.sprites_on_line()
            .iter()
            .map(|(_, sprite)| {
                let alignment = (sprite.x_pos.wrapping_add(self.scroll_x) & 7) as i64;
                11 - alignment.min(5)
            })
            .sum()
    }

    #[inline]
    fn resolve_bg_window_tile(&self, tile_id: u8) -> usize {
        if self.lcd_control.contains(LcdControl::BG_WINDOW_TILE_SELECT) {
            tile_id as usize
        } else {
            (256 + (tile_id as i8 as i32)) as usize
        }
    }

    fn get_tile_address_bg(&self, index: usize) -> u8 {
        let index = index % BACKGROUND_TILE_SIZE;
        if !self.lcd_control.contains(LcdControl::BG_TILE_MAP_SELECT) {
            self.tile_map_9800.data[index]
        } else {
            self.tile_map_9c00.data[index]
        }
    }

    fn get_tile_address_window(&self, index: usize) -> u8 {
        let index = index % BACKGROUND_TILE_SIZE;
        if !self.lcd_control.contains(LcdControl::WINDOW_MAP_SELECT) {
            self.tile_map_9800.data[index]
        } else {
            self.tile_map_9c00.data[index]
        }
    }

    /*
       STAT handling.
    */

    fn ly_lyc_compare(&mut self, interrupts: &mut Interrupts) {
        self.lcd_status
            .set(LcdStatus::COINCIDENCE_FLAG, self.current_y == self.compare_line);
        self.request_stat_interrupt(interrupts);
    }

    /// Re-evaluate the OR of all enabled STAT sources; only a rising edge of
    /// the line raises the LCD interrupt.
    pub fn request_stat_interrupt(&mut self, interrupts: &mut Interrupts) {
        if !self.lcd_enabled() {
            return;
        }

        let old_stat_irq = self.stat_irq_triggered;

        self.stat_irq_triggered = match self.lcd_status.mode_flag() {
            Mode::Hblank => self.lcd_status.contains(LcdStatus::MODE_0_H_INTERRUPT),
            // On DMG the mode 2 enable bit is OR'ed in at v-blank as well.
            Mode::Vblank if self.model.is_dmg() => {
                self.lcd_status.contains(LcdStatus::MODE_1_V_INTERRUPT)
                    || self.lcd_status.contains(LcdStatus::MODE_2_OAM_INTERRUPT)
            }
            Mode::Vblank => self.lcd_status.contains(LcdStatus::MODE_1_V_INTERRUPT),
            Mode::OamSearch if !self.first_line_after_enable => {
                self.lcd_status.contains(LcdStatus::MODE_2_OAM_INTERRUPT)
            }
            _ => false,
        };

        if self.lcd_status.contains(LcdStatus::COINCIDENCE_INTERRUPT)
            && self.lcd_status.contains(LcdStatus::COINCIDENCE_FLAG)
        {
            self.stat_irq_triggered = true;
        }

        if !old_stat_irq && self.stat_irq_triggered {
            interrupts.insert_interrupt(InterruptFlags::LCD);
        }
    }
}

fn is_sprite_on_scanline(scanline_y: i16, y_pos: i16, y_size: i16) -> bool {
    (scanline_y >= y_pos) && (scanline_y < (y_pos + y_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::cartridge::header::CartridgeHeader;

    fn test_ppu() -> Ppu {
        let rom = vec![0u8; 0x8000];
        Ppu::new(GameBoyModel::Dmg, ColorsHint::DmgGreyscale, &CartridgeHeader::new(&rom))
    }

    #[test]
    fn boot_vram_seed_contains_logo_tilemap() {
        let ppu = test_ppu();
        assert_eq!(ppu.tile_map_9800.data[0x110], 0x19);
        assert_eq!(ppu.tile_map_9800.data[0x104], 0x01);
        assert_eq!(ppu.tile_map_9800.data[0x12F], 0x18);
        // Sparse dump: 0x8010 holds 0xF0, 0x8011 stays zero.
        assert_eq!(ppu.tiles[1].get_byte(0), 0xF0);
        assert_eq!(ppu.tiles[1].get_byte(1), 0x00);
    }

    #[test]
    fn mode3_length_accounts_for_scx_and_sprites() {
        let mut ppu = test_ppu();
        let mut interrupts = Interrupts::default();
        ppu.scroll_x = 5;
        ppu.lcd_transfer(&mut interrupts);
        assert_eq!(ppu.mode3_length(), MODE_3_BASE_DURATION + 5);

        // A sprite at x=0 costs the full 11 cycle stall.
        ppu.scroll_x = 0;
        ppu.lcd_control.insert(LcdControl::SPRITE_DISPLAY_ENABLE);
        ppu.oam[0] = SpriteAttribute {
            y_pos: 16,
            x_pos: 0,
            tile_number: 0,
            attribute_flags: Default::default(),
        };
        ppu.current_y = 0;
        ppu.lcd_transfer(&mut interrupts);
        assert_eq!(ppu.mode3_length(), MODE_3_BASE_DURATION + 11);
    }

    #[test]
    fn ten_sprite_per_line_limit() {
        let mut ppu = test_ppu();
        for i in 0..12 {
            ppu.oam[i] = SpriteAttribute {
                y_pos: 16,
                x_pos: 8 + i as u8,
                tile_number: 0,
                attribute_flags: Default::default(),
            };
        }
        ppu.current_y = 0;
        assert_eq!(ppu.sprites_on_line().len(), 10);
    }

    #[test]
    fn stat_interrupt_fires_on_rising_edge_only() {
        let mut ppu = test_ppu();
        let mut interrupts = Interrupts::default();

        ppu.lcd_status.insert(LcdStatus::MODE_0_H_INTERRUPT);
        ppu.hblank(&mut interrupts);
        assert!(interrupts.interrupt_flag.contains(InterruptFlags::LCD));

        // Still in h-blank: no second edge, no second interrupt.
        interrupts.overwrite_if(0);
        ppu.request_stat_interrupt(&mut interrupts);
        assert!(!interrupts.interrupt_flag.contains(InterruptFlags::LCD));
    }

    #[test]
    fn frame_swap_happens_at_end_of_line_153() {
        let mut ppu = test_ppu();
        let mut interrupts = Interrupts::default();
        ppu.current_y = 152;

        assert!(!ppu.vblank_wait(&mut interrupts, 0));
        assert_eq!(ppu.current_line(), 153);
        let before = ppu.frame_id();

        assert!(ppu.vblank_wait(&mut interrupts, 456));
        assert_eq!(ppu.current_line(), 0);
        assert_eq!(ppu.frame_id(), before.wrapping_add(1));
    }
}
