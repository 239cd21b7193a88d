//! Keyboard input: the global input surface and the modifier slow-down state machine.

use gridscene_core::{Phase, Signal, Subscription};

/// Speed multiplier while the modifier is held.
pub const SLOWED_MULTIPLIER: f64 = 0.1;
pub const NORMAL_MULTIPLIER: f64 = 1.0;

/// Modifier keys held at the time of a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn down(key: &str, modifiers: Modifiers) -> Self {
        Self {
            kind: KeyEventKind::Down,
            key: key.to_string(),
            modifiers,
        }
    }

    pub fn up(key: &str, modifiers: Modifiers) -> Self {
        Self {
            kind: KeyEventKind::Up,
            key: key.to_string(),
            modifiers,
        }
    }
}

/// The application-wide input surface key events are dispatched on.
///
/// Clones share listeners, so the host keeps one handle for dispatching and
/// hands another to the scene.
#[derive(Clone, Default)]
pub struct InputSurface {
    key_down: Signal<KeyEvent>,
    key_up: Signal<KeyEvent>,
}

impl InputSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(
        &self,
        kind: KeyEventKind,
        phase: Phase,
        listener: impl Fn(&KeyEvent) + 'static,
    ) -> Subscription {
        self.signal(kind).connect(phase, listener)
    }

    pub fn dispatch(&self, event: &KeyEvent) {
        self.signal(event.kind).emit(event);
    }

    pub fn listener_count(&self) -> usize {
        self.key_down.listener_count() + self.key_up.listener_count()
    }

    fn signal(&self, kind: KeyEventKind) -> &Signal<KeyEvent> {
        match kind {
            KeyEventKind::Down => &self.key_down,
            KeyEventKind::Up => &self.key_up,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModifierState {
    #[default]
    Normal,
    Slowed,
}

/// Two-state machine toggling the camera speed multiplier from shift presses.
///
/// Each handler returns the multiplier to apply, or `None` when nothing changes.
#[derive(Debug, Default)]
pub struct InputModifierTracker {
    state: ModifierState,
}

impl InputModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ModifierState {
        self.state
    }

    pub fn is_slowed(&self) -> bool {
        self.state == ModifierState::Slowed
    }

    pub fn on_key_down(&mut self, modifiers: Modifiers) -> Option<f64> {
        match (self.state, modifiers.shift) {
            (ModifierState::Normal, true) => {
                self.state = ModifierState::Slowed;
                Some(SLOWED_MULTIPLIER)
            }
            // Key repeat while slowed must not reset the speed again.
            _ => None,
        }
    }

    pub fn on_key_up(&mut self, modifiers: Modifiers) -> Option<f64> {
        match (self.state, modifiers.shift) {
            (ModifierState::Slowed, false) => {
                self.state = ModifierState::Normal;
                Some(NORMAL_MULTIPLIER)
            }
            _ => None,
        }
    }

    pub fn handle(&mut self, event: &KeyEvent) -> Option<f64> {
        match event.kind {
            KeyEventKind::Down => self.on_key_down(event.modifiers),
            KeyEventKind::Up => self.on_key_up(event.modifiers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_repeated_key_down_changes_speed_once() {
        let mut tracker = InputModifierTracker::new();
        assert_eq!(tracker.on_key_down(Modifiers::SHIFT), Some(0.1));
        assert_eq!(tracker.on_key_down(Modifiers::SHIFT), None);
        assert_eq!(tracker.state(), ModifierState::Slowed);
    }

    #[test]
    fn test_key_up_in_normal_is_noop() {
        let mut tracker = InputModifierTracker::new();
        assert_eq!(tracker.on_key_up(Modifiers::NONE), None);
        assert_eq!(tracker.state(), ModifierState::Normal);
    }

    #[test]
    fn test_release_returns_to_normal() {
        let mut tracker = InputModifierTracker::new();
        tracker.on_key_down(Modifiers::SHIFT);
        // Another key released while shift is still held keeps the slow down.
        assert_eq!(tracker.on_key_up(Modifiers::SHIFT), None);
        assert!(tracker.is_slowed());
        assert_eq!(tracker.on_key_up(Modifiers::NONE), Some(1.0));
        assert_eq!(tracker.state(), ModifierState::Normal);
    }

    #[test]
    fn test_plain_key_down_does_not_slow() {
        let mut tracker = InputModifierTracker::new();
        assert_eq!(tracker.handle(&KeyEvent::down("a", Modifiers::NONE)), None);
        assert!(!tracker.is_slowed());
    }

    #[test]
    fn test_surface_dispatches_by_kind() {
        let surface = InputSurface::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _down = surface.listen(KeyEventKind::Down, Phase::Capture, move |e| {
            s.borrow_mut().push(e.key.clone())
        });

        surface.dispatch(&KeyEvent::down("Shift", Modifiers::SHIFT));
        surface.dispatch(&KeyEvent::up("Shift", Modifiers::NONE));
        assert_eq!(*seen.borrow(), vec!["Shift".to_string()]);
        assert_eq!(surface.listener_count(), 1);
    }
}
