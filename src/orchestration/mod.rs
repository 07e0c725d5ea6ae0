//! Request orchestration layer
//!
//! This module ties the SOAP client, the response cache and the request
//! logger together behind a single `request` call.

pub mod orchestrator;


pub use orchestrator::RequestOrchestrator;
