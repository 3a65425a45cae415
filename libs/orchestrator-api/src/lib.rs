//! Orchestrator API wire types
//!
//! Raw request/response shapes of the pipeline orchestrator backend, exactly
//! as they appear on the wire. No normalization happens here; consumers are
//! expected to convert these into their own canonical models.

pub mod models;
