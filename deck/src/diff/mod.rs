//! Config diff engine
//!
//! Compares the configuration snapshots of two deployments resource by
//! resource and classifies each one as added, deleted, changed or
//! unchanged. The comparison is structural JSON equality, optionally after
//! scope-variable substitution.

pub mod classifier;
pub mod model;
pub mod variables;
