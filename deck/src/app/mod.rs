//! Application wiring: options, command parsing and the run loop

pub mod options;
pub mod run;
