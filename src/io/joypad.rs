//! Joypad implementation, heavily inspired by MoonEyeGB,
//! as the docs are rather vague on how games interact with the selection rows.

use crate::io::interrupts::{InterruptFlags, Interrupts};
use bitflags::*;

pub const JOYPAD_REGISTER: u16 = 0xFF00;

/// Public button masks as exposed through `buttons_down`/`buttons_up`.
pub const BUTTON_RIGHT: u8 = 0x01;
pub const BUTTON_LEFT: u8 = 0x02;
pub const BUTTON_UP: u8 = 0x04;
pub const BUTTON_DOWN: u8 = 0x08;
pub const BUTTON_A: u8 = 0x10;
pub const BUTTON_B: u8 = 0x20;
pub const BUTTON_SELECT: u8 = 0x40;
pub const BUTTON_START: u8 = 0x80;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum InputKey {
    Start,
    Select,
    A,
    B,
    Up,
    Down,
    Left,
    Right,
}

impl InputKey {
    /// Translate a public button mask into the individual keys it names.
    pub fn from_mask(mask: u8) -> impl Iterator<Item = InputKey> {
        use InputKey::*;
        const ORDER: [InputKey; 8] = [Right, Left, Up, Down, A, B, Select, Start];
        ORDER
            .iter()
            .enumerate()
            .filter(move |(i, _)| mask & (1 << i) != 0)
            .map(|(_, key)| *key)
    }

    fn matrix_line(self) -> JoypadFlags {
        match self {
            InputKey::Start | InputKey::Down => JoypadFlags::DOWN_START,
            InputKey::Select | InputKey::Up => JoypadFlags::UP_SELECT,
            InputKey::B | InputKey::Left => JoypadFlags::LEFT_B,
            InputKey::A | InputKey::Right => JoypadFlags::RIGHT_A,
        }
    }
}

/// The P1 button matrix. All flags are kept active-high internally and
/// inverted when the register is read, like the hardware does.
#[derive(Debug, Clone)]
pub struct Joypad {
    pressed_buttons: JoypadFlags,
    pressed_directions: JoypadFlags,
    selected_mode: JoypadFlags,
}

impl Joypad {
    pub fn new() -> Self {
        Joypad {
            pressed_buttons: JoypadFlags::empty(),
            pressed_directions: JoypadFlags::empty(),
            selected_mode: JoypadFlags::from_bits_truncate(0xFF),
        }
    }

    /// Get the current P1 register for the most recently selected mode (Button, Direction)
    pub fn get_register(&self) -> u8 {
        !self.visible_lines().bits()
    }

    /// Set the register, primarily used to select the mode (Button, Direction) by games.
    /// Writes to the lower nibble are discarded.
    pub fn set_register(&mut self, mode: u8) {
        self.selected_mode = JoypadFlags::from_bits_truncate(!mode & 0b0011_0000);
    }

    /// Register every key in `mask` as pressed down.
    ///
    /// Raises the joypad interrupt on any 1→0 transition of a line that is
    /// visible through the current row selection.
    pub fn press_keys(&mut self, mask: u8, interrupts: &mut Interrupts) {
        let before = self.visible_lines();
        for key in InputKey::from_mask(mask) {
            self.press_key(key);
        }
        let after = self.visible_lines();

        // An edge exists if a line is active now that was not before.
        if (after - before).intersects(JoypadFlags::ALL_LINES) {
            interrupts.insert_interrupt(InterruptFlags::JOYPAD);
        }
    }

    /// Release every key in `mask`.
    pub fn release_keys(&mut self, mask: u8) {
        for key in InputKey::from_mask(mask) {
            self.release_key(key);
        }
    }

    fn press_key(&mut self, input: InputKey) {
        use InputKey::*;
        match input {
            Down | Up | Left | Right => self.pressed_directions.insert(input.matrix_line()),
            A | B | Select | Start => self.pressed_buttons.insert(input.matrix_line()),
        }
    }

    fn release_key(&mut self, input: InputKey) {
        use InputKey::*;
        match input {
            Down | Up | Left | Right => self.pressed_directions.remove(input.matrix_line()),
            A | B | Select | Start => self.pressed_buttons.remove(input.matrix_line()),
        }
    }

    /// Whether any selected line is currently held, used to wake from STOP.
    pub fn any_selected_line_active(&self) -> bool {
        self.visible_lines().intersects(JoypadFlags::ALL_LINES)
    }

    /// The matrix lines visible through the currently selected rows, plus the
    /// selection bits themselves.
    fn visible_lines(&self) -> JoypadFlags {
        let mut result = self.selected_mode;
        if self.selected_mode.contains(JoypadFlags::BUTTON_KEYS) {
            result.insert(self.pressed_buttons);
        }
        if self.selected_mode.contains(JoypadFlags::DIRECTION_KEYS) {
            result.insert(self.pressed_directions);
        }
        result
    }
}

bitflags! {
    #[derive(Default)]
    struct JoypadFlags: u8 {
        /// Right or A
        const RIGHT_A         = 0b0000_0001;
        /// Left or B
        const LEFT_B          = 0b0000_0010;
        /// Input Up or Select
        const UP_SELECT       = 0b0000_0100;
        /// Input Down or Start
        const DOWN_START      = 0b0000_1000;
        /// Select Direction Keys
        const DIRECTION_KEYS  = 0b0001_0000;
        /// Select Button Keys
        const BUTTON_KEYS     = 0b0010_0000;
        const ALL_LINES       = 0b0000_1111;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_release_round_trip_restores_register() {
        let mut interrupts = Interrupts::default();
        let mut joypad = Joypad::new();
        joypad.set_register(0b0001_0000); // select buttons row

        let initial = joypad.get_register();
        joypad.press_keys(BUTTON_A | BUTTON_START, &mut interrupts);
        assert_ne!(joypad.get_register(), initial);

        joypad.release_keys(BUTTON_A | BUTTON_START);
        assert_eq!(joypad.get_register(), initial);
    }

    #[test]
    fn interrupt_fires_on_visible_edge_only() {
        let mut interrupts = Interrupts::default();
        let mut joypad = Joypad::new();

        // Direction row selected: a button press is invisible and must not fire.
        joypad.set_register(0b0010_0000);
        joypad.press_keys(BUTTON_A, &mut interrupts);
        assert!(interrupts.interrupt_flag.is_empty());

        joypad.press_keys(BUTTON_LEFT, &mut interrupts);
        assert!(interrupts.interrupt_flag.contains(InterruptFlags::JOYPAD));
    }

    #[test]
    fn lower_nibble_writes_are_discarded() {
        let mut joypad = Joypad::new();
        joypad.set_register(0b0010_1111);
        // Only the row selection may stick; lines read back released (high).
        assert_eq!(joypad.get_register() & 0x0F, 0x0F);
    }
}
