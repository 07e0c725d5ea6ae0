use std::fs;
use std::str::FromStr;

use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    cache::{CacheKeyScope, DEFAULT_MAX_ENTRIES, DEFAULT_TTL},
    config_error,
    core::{Params, RequestOptions, SoapResult},
};

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Location of the service description, URL or file path
    #[validate(length(min = 1))]
    pub wsdl: String,

    /// Base parameters merged under every request's parameters
    #[serde(default)]
    pub params: Params,

    /// Options used when a request passes none
    #[serde(default)]
    pub options: RequestOptions,

    #[validate(nested)]
    #[serde(default)]
    pub cache: Cache,

    #[validate(nested)]
    #[serde(default)]
    pub log: Log,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> SoapResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .map_err(|e| config_error!("Unable to read conf file from {path}: {e}"))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> SoapResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| config_error!("Unable to parse yaml conf: {e}"))?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()?;

        Ok(conf)
    }

    pub fn to_yaml(&self) -> SoapResult<String> {
        serde_yaml::to_string(self).map_err(|e| config_error!("Unable to dump conf: {e}"))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Cache {
    #[serde(default = "Cache::default_enabled")]
    pub enabled: bool,

    /// Maximum number of stored responses
    #[serde(default = "Cache::default_max")]
    #[validate(range(min = 1))]
    pub max: usize,

    /// Seconds a response stays valid
    #[serde(default = "Cache::default_ttl")]
    #[validate(range(min = 1))]
    pub ttl: u64,

    #[serde(default)]
    pub key_scope: CacheKeyScope,
}

impl Cache {
    fn default_enabled() -> bool {
        true
    }

    fn default_max() -> usize {
        DEFAULT_MAX_ENTRIES
    }

    fn default_ttl() -> u64 {
        DEFAULT_TTL.as_secs()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            max: Self::default_max(),
            ttl: Self::default_ttl(),
            key_scope: CacheKeyScope::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Log {
    /// File to write process logs to; stderr when unset
    pub path: Option<String>,

    #[serde(default = "Log::default_level")]
    #[validate(custom(function = "validate_level"))]
    pub level: String,

    /// Log every request/response pair
    #[serde(default)]
    pub requests: bool,

    /// Regexes over parameter names whose values are masked in request logs
    #[serde(default)]
    #[validate(custom(function = "validate_regexes"))]
    pub redact: Vec<String>,
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            path: None,
            level: Self::default_level(),
            requests: false,
            redact: Vec::new(),
        }
    }
}

fn validate_level(level: &str) -> Result<(), ValidationError> {
    if log::LevelFilter::from_str(level).is_err() {
        return Err(ValidationError::new("invalid_log_level"));
    }
    Ok(())
}

fn validate_regexes(patterns: &[String]) -> Result<(), ValidationError> {
    for pattern in patterns {
        if Regex::new(pattern).is_err() {
            return Err(ValidationError::new("invalid_regex_pattern"));
        }
    }
    Ok(())
}
