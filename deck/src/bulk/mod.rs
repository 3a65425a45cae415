//! Bulk operation tracking and execution
//!
//! A fixed batch of operations runs once per store; outcomes accumulate in
//! an [`store::OperationResultStore`] and a retry round is a fresh store
//! built from the failures of the previous one.

pub mod executor;
pub mod store;
