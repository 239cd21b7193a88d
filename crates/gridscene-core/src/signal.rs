//! Single-threaded listener lists with explicit, droppable subscriptions.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Dispatch order for listeners. Capture listeners see a value before any bubble listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

type Listener<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    id: u64,
    phase: Phase,
    listener: Listener<T>,
}

struct SignalInner<T> {
    next_id: u64,
    slots: Vec<Slot<T>>,
}

/// A list of listeners for values of type `T`.
///
/// Cloning a `Signal` yields another handle to the same listener list.
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays connected until the returned subscription is
    /// disconnected or dropped.
    pub fn connect(&self, phase: Phase, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.slots.push(Slot {
                id,
                phase,
                listener: Rc::new(listener),
            });
            id
        };

        let weak: Weak<RefCell<SignalInner<T>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().slots.retain(|slot| slot.id != id);
            }
        })
    }

    /// Deliver `value` to capture listeners, then bubble listeners, each in connect order.
    ///
    /// The listener list is snapshotted first, so listeners may connect or
    /// disconnect while being called.
    pub fn emit(&self, value: &T) {
        let listeners: Vec<Listener<T>> = {
            let inner = self.inner.borrow();
            let capture = inner.slots.iter().filter(|s| s.phase == Phase::Capture);
            let bubble = inner.slots.iter().filter(|s| s.phase == Phase::Bubble);
            capture.chain(bubble).map(|s| Rc::clone(&s.listener)).collect()
        };
        for listener in listeners {
            listener(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a connected listener. Disconnects on drop.
#[must_use = "dropping a Subscription disconnects its listener"]
pub struct Subscription {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.disconnect.is_some()
    }

    /// Remove the listener now. Safe to call more than once.
    pub fn disconnect(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
