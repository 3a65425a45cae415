//! Orchestrator REST surface
//!
//! One file per endpoint family, all going through the shared
//! [`client::HttpClient`] wrapper and returning normalized models.

pub mod client;
pub mod config;
pub mod history;
pub mod log_stream;
pub mod timeline;
pub mod trigger;
