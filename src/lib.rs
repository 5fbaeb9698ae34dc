// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod app;
pub mod config;
pub mod dedup;
pub mod error;
pub mod gate;
pub mod generate;
pub mod ingest;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod scoring;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod watcher;

// ---- Re-exports for a stable public API ----
pub use crate::api::router;
pub use crate::app::App;
pub use crate::config::Settings;
pub use crate::pipeline::{Discovery, DiscoveryReport};
pub use crate::watcher::{ObservedStatusCache, PollReport, StatusWatcher};
