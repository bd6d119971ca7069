//! The input device: a thread-safe FIFO of key codes.
//!
//! Key events arrive from a UI thread while the execution engine consumes the
//! queue on its own thread, so every queue operation holds the same lock for
//! its whole critical section. [Keyboard] is a cheap cloneable handle; the
//! platform-specific key capture keeps one clone and calls
//! [press](Keyboard::press) from its event callbacks.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;

/// Symbolic names for the keys the machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    D0, D1, D2, D3, D4, D5, D6, D7, D8, D9,
    Space,
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
}

lazy_static! {
    /// The symbolic-key → key-code table. Letters and digits map to their
    /// ASCII codes, the arrow keys to `0x80`-`0x83`.
    pub static ref KEY_CODES: HashMap<Key, u8> = {
        use Key::*;

        let mut codes = HashMap::new();

        for (i, key) in [A, B, C, D, E, F, G, H, I, J, K, L, M,
                         N, O, P, Q, R, S, T, U, V, W, X, Y, Z].iter().enumerate()
        {
            codes.insert(*key, 0x41 + i as u8);
        }

        for (i, key) in [D0, D1, D2, D3, D4, D5, D6, D7, D8, D9].iter().enumerate() {
            codes.insert(*key, 0x30 + i as u8);
        }

        codes.insert(Space, 0x20);
        codes.insert(Enter, 0x0D);
        codes.insert(Escape, 0x1B);
        codes.insert(Up, 0x80);
        codes.insert(Down, 0x81);
        codes.insert(Left, 0x82);
        codes.insert(Right, 0x83);

        codes
    };
}

/// Handle to the shared key code queue.
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    queue: Arc<Mutex<VecDeque<u8>>>,
}

impl Keyboard {
    pub fn new() -> Keyboard {
        Keyboard::default()
    }

    /// A poisoned lock means a producer panicked mid-push; the queue contents
    /// are still plain bytes, so we keep going with them.
    fn queue(&self) -> MutexGuard<VecDeque<u8>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Translates the key through [KEY_CODES] and enqueues its code.
    pub fn press(&self, key: Key) {
        if let Some(code) = KEY_CODES.get(&key) {
            self.push_code(*code);
        }
    }

    /// Enqueues a raw key code. Producers that already deal in codes (or want
    /// codes outside the table) use this directly.
    pub fn push_code(&self, code: u8) {
        self.queue().push_back(code);
    }

    pub fn has_key(&self) -> bool {
        !self.queue().is_empty()
    }

    /// Dequeues the next key code, or 0 if the queue is empty.
    pub fn pop_key(&self) -> u8 {
        self.queue().pop_front().unwrap_or(0)
    }

    /// Returns the front key code without dequeuing it, or 0 if the queue is
    /// empty.
    pub fn peek_key(&self) -> u8 {
        self.queue().front().copied().unwrap_or(0)
    }
}
