//! Core traits for basesoap components
//!
//! The SOAP protocol, the response store and the request logger are all
//! external collaborators. These traits are the seams they plug into.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{
    context::RequestLogEntry,
    error::SoapResult,
    types::{Params, RequestOptions, SoapResponse},
};

/// Produces SOAP clients from a WSDL location
#[async_trait]
pub trait SoapClientFactory: Send + Sync {
    /// Build a client for the service described by `wsdl`
    async fn create_client(
        &self,
        wsdl: &str,
        options: &RequestOptions,
    ) -> SoapResult<Arc<dyn SoapClient>>;
}

/// A ready-to-use SOAP client bound to one service description
#[async_trait]
pub trait SoapClient: Send + Sync {
    /// Whether the service description exposes `operation`
    fn has_operation(&self, operation: &str) -> bool;

    /// Invoke `operation` with the given arguments
    async fn call(
        &self,
        operation: &str,
        args: &Params,
        options: &RequestOptions,
    ) -> SoapResult<SoapResponse>;

    /// Envelope of the most recent request sent by this client
    fn last_request(&self) -> Option<String> {
        None
    }
}

/// Key/value store for SOAP responses
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Option<JsonValue>;

    /// Insert or replace an entry
    async fn set(&self, key: &str, value: JsonValue);

    /// Drop one entry, returning whether it was present
    async fn remove(&self, key: &str) -> bool;

    /// Drop every entry
    async fn clear(&self);
}

/// Receives one entry per completed request
pub trait RequestLogger: Send + Sync {
    fn log(&self, entry: &RequestLogEntry<'_>);
}
