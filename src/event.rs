//! Event handling.
//!
//! This library exposes an event-based interface for reacting
//! to the state changes of the emulator in real-time. [EventListeners](EventListener)
//! can be registered on the [Emulator](crate::emulator::Emulator) with the
//! [add_listener](crate::emulator::Emulator::add_listener) method.
//!
//! A blanket implementation of [EventListener] for all `FnMut(&Event)` is provided.

use crate::emulator::Flags;
use crate::instruction::Register;

/// Represents an event that occurred while executing a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The program modified a memory location.
    MemoryChange {
        /// The address of the changed memory location.
        address: u16,

        /// New value of the changed memory location.
        data: u16,
    },

    /// The program modified a register.
    RegisterChange {
        /// The register which was modified.
        register: Register,

        /// The new value of the register.
        data: u16,
    },

    /// An instruction changed the value of the flags register.
    FlagsChange {
        flags: Flags,
    },

    /// A jump was taken.
    Jump {
        /// Address of the jump instruction.
        from: u16,

        /// The new value of the program counter.
        to: u16,
    },

    /// The program executed `HALT`.
    Halt {
        /// Address of the `HALT` instruction.
        address: u16,
    },
}

/// Trait for consuming events.
pub trait EventListener {
    /// Called whenever a new event has been created.
    fn event(&mut self, event: &Event);
}

impl<F> EventListener for F where F: FnMut(&Event) {
    fn event(&mut self, event: &Event) {
        self(event)
    }
}

#[derive(Default)]
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
