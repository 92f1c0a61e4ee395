//! Key bindings: which HID action each logical input produces.
//!
//! Six bindings exist, fixed-indexed by [`KeyId`]. Each binding also carries
//! the last observed logical state of its input, which only the input
//! engine touches (see [`KeyBinding::observe`]).

use crate::config::KEY_COUNT;

/// Logical inputs of the keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyId {
    Key1 = 0,
    Key2 = 1,
    Key3 = 2,
    EncoderSwitch = 3,
    EncoderClockwise = 4,
    EncoderCounterClockwise = 5,
}

impl KeyId {
    pub const ALL: [KeyId; KEY_COUNT] = [
        KeyId::Key1,
        KeyId::Key2,
        KeyId::Key3,
        KeyId::EncoderSwitch,
        KeyId::EncoderClockwise,
        KeyId::EncoderCounterClockwise,
    ];

    /// Position in the binding table and in the NVM layout.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Indicator flashed when this key goes down. Only the three buttons
    /// own one.
    pub const fn indicator(self) -> Option<usize> {
        match self {
            KeyId::Key1 => Some(0),
            KeyId::Key2 => Some(1),
            KeyId::Key3 => Some(2),
            KeyId::EncoderSwitch | KeyId::EncoderClockwise | KeyId::EncoderCounterClockwise => None,
        }
    }
}

/// What a key sends to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Keyboard usage with modifier bits.
    Keyboard { modifier: u8, code: u8 },
    /// Consumer-control usage.
    Consumer { code: u16 },
}

impl Action {
    /// NVM kind byte for [`Action::Keyboard`].
    pub const KIND_KEYBOARD: u8 = 0;
    /// NVM kind byte for [`Action::Consumer`].
    pub const KIND_CONSUMER: u8 = 1;

    /// Decode a stored `(modifier, kind, code)` triple.
    ///
    /// Kind 0 is a keyboard key; every other kind is treated as consumer
    /// control, whose modifier byte is ignored.
    pub const fn from_nvm(modifier: u8, kind: u8, code: u8) -> Self {
        match kind {
            Self::KIND_KEYBOARD => Action::Keyboard { modifier, code },
            _ => Action::Consumer { code: code as u16 },
        }
    }

    /// Encode as a `(modifier, kind, code)` triple.
    ///
    /// Consumer usages above 0xFF do not fit the one-byte code field and
    /// are truncated.
    pub const fn to_nvm(self) -> [u8; 3] {
        match self {
            Action::Keyboard { modifier, code } => [modifier, Self::KIND_KEYBOARD, code],
            Action::Consumer { code } => [0, Self::KIND_CONSUMER, code as u8],
        }
    }
}

/// Logical transition of a key's input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Pressed,
    Released,
}

/// One key's action plus its last observed logical state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyBinding {
    pub action: Action,
    last: bool,
}

impl KeyBinding {
    pub const fn new(action: Action) -> Self {
        Self { action, last: false }
    }

    /// Last logical state seen by the input engine.
    pub fn is_held(&self) -> bool {
        self.last
    }

    /// Record the current sample; yields an edge only when it differs from
    /// the previous one.
    pub(crate) fn observe(&mut self, pressed: bool) -> Option<Edge> {
        if pressed == self.last {
            return None;
        }
        self.last = pressed;
        Some(if pressed { Edge::Pressed } else { Edge::Released })
    }
}

/// The six bindings in [`KeyId`] order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Keymap {
    bindings: [KeyBinding; KEY_COUNT],
}

impl Keymap {
    pub const fn new(actions: [Action; KEY_COUNT]) -> Self {
        Self {
            bindings: [
                KeyBinding::new(actions[0]),
                KeyBinding::new(actions[1]),
                KeyBinding::new(actions[2]),
                KeyBinding::new(actions[3]),
                KeyBinding::new(actions[4]),
                KeyBinding::new(actions[5]),
            ],
        }
    }

    pub fn get(&self, key: KeyId) -> &KeyBinding {
        &self.bindings[key.index()]
    }

    pub(crate) fn get_mut(&mut self, key: KeyId) -> &mut KeyBinding {
        &mut self.bindings[key.index()]
    }

    pub fn action(&self, key: KeyId) -> Action {
        self.get(key).action
    }
}
