//! Deployment status breakdown
//!
//! Turns one deployment's timeline events into the step-by-step progress
//! view: a fixed, app-type dependent sequence of stages, each with an icon
//! state, timestamps and optional per-object detail.

pub mod model;
pub mod reducer;
pub mod stage;
