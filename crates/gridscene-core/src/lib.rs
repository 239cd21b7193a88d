//! # GridScene Core
//!
//! Data model shared by the GridScene crates: loaded grids and their spatial
//! index, normalized colors, scene configuration, load options and the query
//! boundary, plus the single-threaded signal/event bus used for notifications.

pub mod color;
pub mod config;
pub mod events;
pub mod geometry;
pub mod grid;
pub mod query;
pub mod signal;
pub mod spatial;

pub use color::{Color, ColorError};
pub use config::SceneConfig;
pub use events::{EventBus, SceneEvent, Topic, TransformEvent};
pub use geometry::{BBox, Point, Segment};
pub use grid::{Grid, GridDocument, GridError, IdentityProjector, OffsetProjector, Projector};
pub use query::{GridQuery, LoadDefaults, LoadOptions, OptionsError, QueryError, QueryParams, RawLoadOptions};
pub use signal::{Phase, Signal, Subscription};
