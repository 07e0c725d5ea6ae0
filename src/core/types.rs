//! Shared value types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Request arguments, a JSON object
pub type Params = Map<String, JsonValue>;

/// Per-call options, handed to the client factory on first use and to
/// every call afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Alternative service endpoint overriding the one in the WSDL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Anything else the client implementation understands
    #[serde(flatten)]
    pub extra: Params,
}

impl RequestOptions {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.extra.get(key)
    }
}

/// What a SOAP client hands back for one call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoapResponse {
    /// Decoded response body
    pub body: JsonValue,

    /// Raw response envelope as received
    pub raw: Option<String>,

    /// Decoded SOAP header
    pub header: Option<JsonValue>,
}

impl SoapResponse {
    pub fn new(body: JsonValue) -> Self {
        Self {
            body,
            ..Default::default()
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn with_header(mut self, header: JsonValue) -> Self {
        self.header = Some(header);
        self
    }

    /// The body, with the envelope under `raw` and the header under
    /// `soapHeader` when the body is an object.
    pub fn into_value(self) -> JsonValue {
        match self.body {
            JsonValue::Object(mut map) => {
                if let Some(raw) = self.raw {
                    map.insert("raw".to_string(), JsonValue::String(raw));
                }
                if let Some(header) = self.header {
                    map.insert("soapHeader".to_string(), header);
                }
                JsonValue::Object(map)
            }
            body => body,
        }
    }
}

/// Shallow merge: a copy of `base` with every key of `overlay` written on top.
pub fn merge_params(base: &Params, overlay: &Params) -> Params {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
