//! A cycle-level Game Boy (DMG) and Game Boy Color emulation core.
//!
//! The crate exposes a single [`Emulator`] object that consumes a cartridge
//! image plus input, and produces frames and native-rate PCM audio. All I/O
//! (files, display, sound devices) is the host's business.

use std::error::Error;
use std::fmt;

pub use crate::emulator::{Emulator, GameBoyModel, TestInfo};
pub use crate::hardware::apu::StereoFrame;
pub use crate::hardware::ppu::palette::{ColorsHint, Pixel};
pub use crate::hardware::ppu::{FRAMEBUFFER_SIZE, RESOLUTION_HEIGHT, RESOLUTION_WIDTH};
pub use crate::io::event_log::{LogCategory, LogEntry};
pub use crate::io::joypad::{
    InputKey, BUTTON_A, BUTTON_B, BUTTON_DOWN, BUTTON_LEFT, BUTTON_RIGHT, BUTTON_SELECT, BUTTON_START, BUTTON_UP,
};

pub mod emulator;
pub mod hardware;
mod io;
mod scheduler;

/// The errors construction can surface. A successfully constructed emulator
/// never fails afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EmulatorError {
    /// The ROM is smaller than the cartridge header, or names a cartridge
    /// type we do not support.
    BadCartridgeHeader,
}

impl fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulatorError::BadCartridgeHeader => write!(f, "rom has a missing or unsupported cartridge header"),
        }
    }
}

impl Error for EmulatorError {}

/// Struct for wrapping all the various options for the `Emulator`.
#[derive(Debug)]
pub struct EmulatorOptions {
    pub hardware: GameBoyModel,
    pub colors: ColorsHint,
    pub saved_ram: Option<Vec<u8>>,
    pub log_categories: Vec<LogCategory>,
}

#[derive(Debug)]
pub struct EmulatorOptionsBuilder {
    hardware: GameBoyModel,
    colors: ColorsHint,
    saved_ram: Option<Vec<u8>>,
    log_categories: Vec<LogCategory>,
}

impl EmulatorOptionsBuilder {
    pub fn new() -> Self {
        EmulatorOptionsBuilder {
            hardware: GameBoyModel::AutoDetect,
            colors: ColorsHint::Default,
            saved_ram: None,
            log_categories: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: GameBoyModel) -> Self {
        self.hardware = model;
        self
    }

    pub fn colors_hint(mut self, colors: ColorsHint) -> Self {
        self.colors = colors;
        self
    }

    pub fn saved_ram(mut self, saved_ram: Option<Vec<u8>>) -> Self {
        self.saved_ram = saved_ram;
        self
    }

    pub fn log_categories(mut self, categories: &[LogCategory]) -> Self {
        self.log_categories = categories.to_vec();
        self
    }

    pub fn build(self) -> EmulatorOptions {
        EmulatorOptions {
            hardware: self.hardware,
            colors: self.colors,
            saved_ram: self.saved_ram,
            log_categories: self.log_categories,
        }
    }
}

impl From<EmulatorOptions> for EmulatorOptionsBuilder {
    fn from(from: EmulatorOptions) -> Self {
        EmulatorOptionsBuilder {
            hardware: from.hardware,
            colors: from.colors,
            saved_ram: from.saved_ram,
            log_categories: from.log_categories,
        }
    }
}
