pub mod admin;
pub mod api;
pub mod args;
pub mod breaker;
pub mod bulkhead;
pub mod cache;
pub mod client;
pub mod config;
pub mod r#const;
pub mod dedup;
pub mod error;
pub mod m2m;
pub mod metrics;
pub mod retry;

pub use crate::client::{CallDescriptor, CommunicationManager, ServiceResponse};
pub use crate::error::{AppError, CallError, FailureCategory};
pub use crate::metrics::METRICS;
