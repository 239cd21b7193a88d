//! # GridScene I/O
//!
//! Reading and writing scene configuration files, and a grid query backed by
//! a directory of JSON grid documents.

pub mod config;
pub mod source;

pub use config::{load_config, load_config_or_default, save_config, ConfigError};
pub use source::FileGridSource;
