use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::signal::{Phase, Signal, Subscription};

/// A camera transform reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformEvent {
    /// Camera origin; `origin[2]` is the distance along the view axis.
    pub origin: [f64; 3],
}

impl TransformEvent {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { origin: [x, y, z] }
    }

    /// Zoom depth: absolute distance along the view axis.
    pub fn zoom_depth(&self) -> f64 {
        self.origin[2].abs()
    }
}

/// Notification topics published by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    LineColor,
    BackgroundColor,
    SceneTransform,
}

/// A state-change notification with its normalized payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    LineColor(Color),
    BackgroundColor(Color),
    SceneTransform(TransformEvent),
}

impl SceneEvent {
    pub fn topic(&self) -> Topic {
        match self {
            SceneEvent::LineColor(_) => Topic::LineColor,
            SceneEvent::BackgroundColor(_) => Topic::BackgroundColor,
            SceneEvent::SceneTransform(_) => Topic::SceneTransform,
        }
    }
}

/// Topic-based fan-out of scene notifications. Clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    topics: std::rc::Rc<std::cell::RefCell<HashMap<Topic, Signal<SceneEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, topic: Topic, listener: impl Fn(&SceneEvent) + 'static) -> Subscription {
        self.signal(topic).connect(Phase::Bubble, listener)
    }

    pub fn publish(&self, event: SceneEvent) {
        let topic = event.topic();
        log::trace!("publish {:?}", topic);
        // Clone the signal out so listeners may subscribe while being notified.
        let signal = self.topics.borrow().get(&topic).cloned();
        if let Some(signal) = signal {
            signal.emit(&event);
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics
            .borrow()
            .get(&topic)
            .map_or(0, |signal| signal.listener_count())
    }

    fn signal(&self, topic: Topic) -> Signal<SceneEvent> {
        self.topics.borrow_mut().entry(topic).or_default().clone()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics.borrow().len())
            .finish()
    }
}
