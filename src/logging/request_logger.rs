use log::Level;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::core::{Params, RequestLogEntry, RequestLogger, SoapError, SoapResult};

pub const REDACTED: &str = "***";

const LOG_TARGET: &str = "basesoap::request";

/// Masks values whose object key matches any of the configured patterns.
#[derive(Debug, Default)]
pub struct Redactor {
    patterns: Vec<Regex>,
}

impl Redactor {
    pub fn new(patterns: &[String]) -> SoapResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    SoapError::Configuration(format!("Invalid redaction pattern {p}: {e}"))
                })
            })
            .collect::<SoapResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn redact(&self, params: &Params) -> JsonValue {
        self.redact_value(&JsonValue::Object(params.clone()))
    }

    /// Walks nested objects and arrays.
    pub fn redact_value(&self, value: &JsonValue) -> JsonValue {
        if self.is_empty() {
            return value.clone();
        }

        match value {
            JsonValue::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| {
                        let value = if self.matches(key) {
                            JsonValue::String(REDACTED.to_string())
                        } else {
                            self.redact_value(value)
                        };
                        (key.clone(), value)
                    })
                    .collect(),
            ),
            JsonValue::Array(items) => {
                JsonValue::Array(items.iter().map(|v| self.redact_value(v)).collect())
            }
            other => other.clone(),
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(key))
    }
}

/// Request logger backed by the `log` facade.
///
/// Successful calls are logged at `info`, failures at `warn`. The request
/// envelope, when the client reports one, goes out at `debug`.
pub struct LogRequestLogger {
    redactor: Redactor,
}

impl LogRequestLogger {
    pub fn new(redactor: Redactor) -> Self {
        Self { redactor }
    }

    pub fn render(&self, entry: &RequestLogEntry<'_>) -> String {
        let params = self.redactor.redact(entry.params);
        match (entry.err, entry.result) {
            (Some(err), _) => format!(
                "SOAP {} failed params={} err={}",
                entry.service, params, err
            ),
            (None, Some(result)) => {
                let mut line = format!(
                    "SOAP {} params={} result={}",
                    entry.service,
                    params,
                    self.redactor.redact_value(result)
                );
                if let Some(stat_info) = entry.stat_info {
                    line.push_str(&format!(" statInfo={stat_info}"));
                }
                line
            }
            (None, None) => format!("SOAP {} params={}", entry.service, params),
        }
    }
}

impl RequestLogger for LogRequestLogger {
    fn log(&self, entry: &RequestLogEntry<'_>) {
        let level = if entry.is_success() {
            Level::Info
        } else {
            Level::Warn
        };
        let elapsed_ms = entry.elapsed.as_millis() as u64;

        log::log!(
            target: LOG_TARGET,
            level,
            request_id = entry.request_id,
            wsdl = entry.wsdl,
            cached = entry.cached,
            elapsed_ms = elapsed_ms;
            "{}",
            self.render(entry)
        );

        if let Some(soap_request) = entry.soap_request {
            log::debug!(
                target: LOG_TARGET,
                request_id = entry.request_id;
                "SOAP {} request: {}",
                entry.service,
                soap_request
            );
        }
    }
}
