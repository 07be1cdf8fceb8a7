//! Backend client for Trellis
//!
//! This crate talks to the pipeline backend: fetching graphs, deploying
//! edited graphs back, and browsing the component catalog.

pub mod api;
pub mod config;
pub mod http;
pub mod sync;


pub use api::{ApiError, PipelineApi};
pub use config::ClientConfig;
pub use http::HttpPipelineApi;
pub use sync::{DeployReport, SyncError, Syncer};
