// src/config/mod.rs
pub mod timeline;

pub use timeline::{TimelineConfig, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
