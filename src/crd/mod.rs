//! Custom Resource Definitions for lws-operator.
//!
//! - `LeaderWorkerSetOperator`: cluster-scoped singleton configuring the
//!   LeaderWorkerSet controller deployment

mod leader_worker_set_operator;

pub use leader_worker_set_operator::*;
