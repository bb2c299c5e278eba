//! Controller module for lws-operator.
//!
//! Contains the sync loop, apply helper, error handling and status
//! management for the LeaderWorkerSetOperator.

pub mod apply;
pub mod context;
pub mod error;
pub mod reconciler;
pub mod status;
