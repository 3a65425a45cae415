//! Canonical models
//!
//! One internal schema for everything the backend reports. Raw wire DTOs
//! from `orchestrator-api` are converted here, exactly once, at the
//! `TryFrom` boundary; downstream code never touches wire shapes.

pub mod config;
pub mod history;
pub mod timeline;
