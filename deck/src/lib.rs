//! Pipedeck core library
//!
//! Client-side core of the pipeline orchestrator dashboard: fetches
//! deployment timelines, history and config snapshots from the backend,
//! normalizes them into one canonical schema and derives the presentation
//! models (status breakdown, config diff) the views render.

pub mod api;
pub mod app;
pub mod breakdown;
pub mod bulk;
pub mod diff;
pub mod errors;
pub mod logs;
pub mod models;
pub mod utils;
pub mod workers;
