pub const KEY_COUNT: usize = 16;

/// Latched state of the sixteen hex keys, written by the host before each step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; KEY_COUNT],
}

impl Keypad {
    /// Keys outside 0x0..=0xF are never down.
    pub fn is_key_down(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    pub fn set_key(&mut self, key: u8, down: bool) {
        if let Some(state) = self.keys.get_mut(key as usize) {
            *state = down;
        }
    }

    pub fn set_all(&mut self, keys: [bool; KEY_COUNT]) {
        self.keys = keys;
    }
}
