//! Input handling.
//!
//! Window/keyboard plumbing lives outside the client; it reports key presses
//! and releases into a [`KeyTable`]. Once per frame the engine samples the
//! table through the configured [`KeyBindings`] to refresh the local player's
//! controller intents.

use std::collections::BTreeSet;

use arena_shared::{components::PlayerController, config::KeyBindings};
use tracing::debug;

/// Live key state, keyed by key character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTable {
    down: BTreeSet<char>,
}

impl KeyTable {
    pub fn press(&mut self, key: char) {
        if self.down.insert(key) {
            debug!(%key, "key down");
        }
    }

    pub fn release(&mut self, key: char) {
        if self.down.remove(&key) {
            debug!(%key, "key up");
        }
    }

    pub fn is_down(&self, key: char) -> bool {
        self.down.contains(&key)
    }

    /// Keys currently held, in sorted order.
    pub fn held(&self) -> impl Iterator<Item = char> + '_ {
        self.down.iter().copied()
    }
}

/// Samples the key table into controller intents.
pub fn capture(bindings: &KeyBindings, keys: &KeyTable) -> PlayerController {
    PlayerController {
        move_forward: keys.is_down(bindings.forward),
        move_backward: keys.is_down(bindings.backward),
        move_left: keys.is_down(bindings.left),
        move_right: keys.is_down(bindings.right),
        has_shot: keys.is_down(bindings.shoot),
    }
}

/// A key event parsed from a console line such as `+w` or `-w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Press(char),
    Release(char),
}

impl KeyEvent {
    pub fn parse(line: &str) -> Option<Self> {
        let mut chars = line.trim().chars();
        let sign = chars.next()?;
        let key = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match sign {
            '+' => Some(KeyEvent::Press(key)),
            '-' => Some(KeyEvent::Release(key)),
            _ => None,
        }
    }

    pub fn apply(self, keys: &mut KeyTable) {
        match self {
            KeyEvent::Press(k) => keys.press(k),
            KeyEvent::Release(k) => keys.release(k),
        }
    }
}
