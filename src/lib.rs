//! This crate wraps an injected SOAP client with an async request interface.
//!
//! It defines the modules for configuration, response caching, request
//! logging and the orchestration of a single `request` call.

pub mod cache;
pub mod config;
pub mod core;
pub mod logging;
pub mod orchestration;

pub use crate::cache::{CacheKeyScope, MemoryCache};
pub use crate::config::Config;
pub use crate::core::{
    Params, RequestLogEntry, RequestLogger, RequestOptions, ResponseCache, SoapClient,
    SoapClientFactory, SoapError, SoapResponse, SoapResult,
};
pub use crate::orchestration::RequestOrchestrator;
