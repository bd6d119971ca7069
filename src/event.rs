//! Event handling.
//!
//! This library exposes an event-based interface for reacting to the state
//! changes of the machine in real-time. [EventListeners](EventListener) can be
//! registered on the [Emulator](crate::emulator::Emulator) with the
//! [add_listener](crate::emulator::Emulator::add_listener) method.
//!
//! A blanket implementation of [EventListener] for all `Fn(&Event)` is
//! provided.

/// Represents an event that occurred while executing a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The program committed a pixel into the framebuffer.
    PixelDrawn {
        x: u8,
        y: u8,
        r: u8,
        g: u8,
        b: u8,
    },

    /// The program cleared the framebuffer.
    ScreenCleared,

    /// The program consumed a key code from the input queue.
    KeyConsumed {
        code: u8,
    },

    /// The program printed the log register.
    LogPrinted {
        /// The raw value of the log register.
        value: u8,

        /// The rendered `Binary=… Hex=… Decimal=… Char=…` line.
        rendered: String,
    },

    /// The execution halted.
    Halted {
        /// The address of the instruction that caused the halt.
        address: u16,
    },
}

/// Trait for consuming events.
pub trait EventListener {
    /// Called whenever a new event has been created.
    fn event(&mut self, event: &Event);
}

impl<F> EventListener for F where F: Fn(&Event) {
    fn event(&mut self, event: &Event) {
        self(event)
    }
}

pub(crate) struct EventDispatcher {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> EventDispatcher {
        EventDispatcher {
            listeners: Vec::new(),
        }
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener) as Box<dyn EventListener>)
    }

    pub fn dispatch(&mut self, event: Event) {
        for listener in &mut self.listeners {
            listener.event(&event);
        }
    }
}
