// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod fallback;
pub mod media;
pub mod metrics;
pub mod model;
pub mod rate_limit;
pub mod resolver;
pub mod stats;
pub mod store;
pub mod strategy;
pub mod text;
pub mod timeline;
pub mod wiki;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::TimelineConfig;
pub use crate::error::ResolveError;
pub use crate::model::{EventKind, EventRecord, MediaKind, MediaRecord};
pub use crate::resolver::EventResolver;
pub use crate::wiki::{HttpWikiClient, WikiApi};
