//! # GridScene Scene
//!
//! The scene controller: an ordered layer registry, asynchronous grid loads
//! with cancellation, zoom-dependent camera speed, and the shift-key slow down.

pub mod controller;
pub mod input;
pub mod layer;
pub mod load;
pub mod registry;

pub use controller::SceneController;
pub use input::{InputModifierTracker, InputSurface, KeyEvent, KeyEventKind, ModifierState, Modifiers};
pub use layer::{GridLayer, LayerHandle};
pub use load::{LoadError, LoadHandle, LoadOutcome};
pub use registry::LayerRegistry;
