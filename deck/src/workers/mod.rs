//! Background workers

pub mod status_poller;
