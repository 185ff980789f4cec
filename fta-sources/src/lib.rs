//! Lap sources for F1 Telemetry Analyzer
//!
//! Everything that produces or holds lap samples: the in-memory store the
//! service analyzes from, upload parsing, and the synthetic demo generator.

pub mod demo;
pub mod ingest;
pub mod store;

pub use demo::{DemoLapGenerator, LapSpec};
pub use ingest::UploadRequest;
pub use store::{InsertSummary, LapStore};
