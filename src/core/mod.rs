//! Core abstractions and interfaces for basesoap
//!
//! This module provides the capability traits, shared types and the unified
//! error type the rest of the crate is built on.

pub mod context;
pub mod error;
pub mod traits;
pub mod types;


// Re-export commonly used types
pub use context::{CallContext, RequestLogEntry};
pub use error::{ErrorContext, SoapError, SoapResult};
pub use traits::*;
pub use types::{merge_params, Params, RequestOptions, SoapResponse};
