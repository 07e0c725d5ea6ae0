//! Request context management
//!
//! This module provides the CallContext that holds per-request state and
//! turns it into the entry handed to a [`RequestLogger`](super::RequestLogger).

use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::time::Instant;
use uuid::Uuid;

use super::{
    error::SoapError,
    types::{Params, RequestOptions},
};

/// State that follows one `request` call from start to finish
pub struct CallContext {
    /// Correlation id, unique per request
    pub request_id: String,

    /// Operation name on the SOAP service
    pub action: String,

    /// Base parameters overlaid with the call parameters
    pub params: Params,

    /// Options in effect for this call
    pub options: RequestOptions,

    /// Cache key, when the call went through the cache
    pub cache_key: Option<String>,

    /// Whether the response was served from the cache
    pub cache_hit: bool,

    /// Envelope the client sent, when a call was made
    pub soap_request: Option<String>,

    started: Instant,
}

impl CallContext {
    pub fn new(action: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            action: action.into(),
            params: Params::new(),
            options,
            cache_key: None,
            cache_hit: false,
            soap_request: None,
            started: Instant::now(),
        }
    }

    /// Time since the context was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Build the log entry for a finished call
    pub fn log_entry<'a>(
        &'a self,
        wsdl: &'a str,
        outcome: &'a Result<JsonValue, SoapError>,
    ) -> RequestLogEntry<'a> {
        let (result, err) = match outcome {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e)),
        };

        RequestLogEntry {
            request_id: &self.request_id,
            wsdl,
            service: &self.action,
            params: &self.params,
            err,
            result,
            soap_request: self.soap_request.as_deref(),
            stat_info: result.and_then(|value| value.pointer("/result/statInfo")),
            cached: self.cache_hit,
            elapsed: self.elapsed(),
        }
    }
}

/// What a request logger sees for each call
#[derive(Debug)]
pub struct RequestLogEntry<'a> {
    pub request_id: &'a str,
    pub wsdl: &'a str,
    /// The SOAP operation that was invoked
    pub service: &'a str,
    pub params: &'a Params,
    pub err: Option<&'a SoapError>,
    pub result: Option<&'a JsonValue>,
    /// Request envelope as sent by the client
    pub soap_request: Option<&'a str>,
    /// `result.statInfo` of the response body, when the service reports one
    pub stat_info: Option<&'a JsonValue>,
    pub cached: bool,
    pub elapsed: Duration,
}

impl RequestLogEntry<'_> {
    pub fn is_success(&self) -> bool {
        self.err.is_none()
    }
}
