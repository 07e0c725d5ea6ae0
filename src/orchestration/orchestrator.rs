//! SOAP request orchestration
//!
//! [`RequestOrchestrator`] sits between callers and an injected SOAP client.
//! It acquires the client once, merges call parameters over the base
//! configuration, routes the call through the response cache and reports
//! every request to the request logger.

use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use serde_json::Value as JsonValue;
use tokio::sync::OnceCell;
use validator::Validate;

use crate::{
    cache::{self, CacheKeyScope, CacheLayer, MemoryCache},
    config::Config,
    core::{
        merge_params, CallContext, Params, RequestLogger, RequestOptions, ResponseCache,
        SoapClient, SoapClientFactory, SoapError, SoapResult,
    },
    logging::{LogRequestLogger, Redactor},
};

/// Async request interface over one SOAP service
pub struct RequestOrchestrator {
    wsdl: String,
    base_params: Params,
    default_options: RequestOptions,
    factory: Arc<dyn SoapClientFactory>,
    client: OnceCell<Arc<dyn SoapClient>>,
    cache: Option<CacheLayer>,
    key_scope: CacheKeyScope,
    logger: Option<Arc<dyn RequestLogger>>,
}

impl RequestOrchestrator {
    /// Create an orchestrator backed by the process-wide response cache
    pub fn new(
        wsdl: impl Into<String>,
        base_params: Params,
        factory: Arc<dyn SoapClientFactory>,
    ) -> Self {
        Self {
            wsdl: wsdl.into(),
            base_params,
            default_options: RequestOptions::default(),
            factory,
            client: OnceCell::new(),
            cache: Some(CacheLayer::new(cache::default_cache())),
            key_scope: CacheKeyScope::default(),
            logger: None,
        }
    }

    /// Build an orchestrator from a validated configuration.
    ///
    /// The cache gets its own store sized from `cache.max` and `cache.ttl`.
    pub fn from_config(config: &Config, factory: Arc<dyn SoapClientFactory>) -> SoapResult<Self> {
        config.validate()?;

        let mut orchestrator = Self::new(config.wsdl.clone(), config.params.clone(), factory)
            .with_default_options(config.options.clone())
            .with_key_scope(config.cache.key_scope);

        orchestrator = if config.cache.enabled {
            orchestrator.with_cache(Arc::new(MemoryCache::new(
                config.cache.max,
                Duration::from_secs(config.cache.ttl),
            )))
        } else {
            orchestrator.without_cache()
        };

        if config.log.requests {
            let redactor = Redactor::new(&config.log.redact)?;
            orchestrator = orchestrator.with_logger(Arc::new(LogRequestLogger::new(redactor)));
        }

        info!(
            "SOAP orchestrator configured for {} (cache: {}, request log: {})",
            config.wsdl, config.cache.enabled, config.log.requests
        );
        Ok(orchestrator)
    }

    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_cache(mut self, store: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(CacheLayer::new(store));
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn with_default_options(mut self, options: RequestOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn with_key_scope(mut self, scope: CacheKeyScope) -> Self {
        self.key_scope = scope;
        self
    }

    pub fn wsdl(&self) -> &str {
        &self.wsdl
    }

    pub fn base_params(&self) -> &Params {
        &self.base_params
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Get the SOAP client, creating it on first use.
    ///
    /// Concurrent first callers share one factory call. A failed creation is
    /// not remembered, so the next caller tries again.
    pub async fn client(&self, options: &RequestOptions) -> SoapResult<Arc<dyn SoapClient>> {
        let client = self
            .client
            .get_or_try_init(|| async {
                debug!("Creating SOAP client for {}", self.wsdl);
                self.factory
                    .create_client(&self.wsdl, options)
                    .await
                    .map_err(|e| match e {
                        SoapError::ClientCreation(_) => e,
                        other => SoapError::ClientCreation(other.to_string()),
                    })
            })
            .await?;
        Ok(client.clone())
    }

    /// Base parameters overlaid with `params`; the base is left untouched
    pub fn merge_params(&self, params: &Params) -> Params {
        merge_params(&self.base_params, params)
    }

    /// Invoke `action` on the service.
    ///
    /// `options` falls back to the default options. With `ignore_cache` the
    /// response cache is neither read nor written. A call that yields neither
    /// a fault nor a body fails with [`SoapError::EmptyResponse`]. The request
    /// logger, when set, sees every request before its result is returned.
    pub async fn request(
        &self,
        action: &str,
        params: Params,
        options: Option<RequestOptions>,
        ignore_cache: bool,
    ) -> SoapResult<JsonValue> {
        let options = options.unwrap_or_else(|| self.default_options.clone());
        let mut ctx = CallContext::new(action, options);

        let outcome = self.execute(&mut ctx, &params, ignore_cache).await;

        if let Err(e) = &outcome {
            warn!("SOAP request {} {} failed: {}", ctx.request_id, action, e);
        }
        if let Some(logger) = &self.logger {
            logger.log(&ctx.log_entry(&self.wsdl, &outcome));
        }

        outcome
    }

    /// Drop the cached response for a request, if any
    pub async fn invalidate(&self, action: &str, params: &Params) -> SoapResult<bool> {
        let Some(cache) = &self.cache else {
            return Ok(false);
        };
        let merged = self.merge_params(params);
        let key = cache::cache_key(self.key_scope, &self.wsdl, action, &merged)?;
        Ok(cache.invalidate(&key).await)
    }

    /// Drop every response in this orchestrator's cache store
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
    }

    async fn execute(
        &self,
        ctx: &mut CallContext,
        params: &Params,
        ignore_cache: bool,
    ) -> SoapResult<JsonValue> {
        ctx.params = self.merge_params(params);
        let client = self.client(&ctx.options).await?;

        if !client.has_operation(&ctx.action) {
            return Err(SoapError::UnknownOperation(ctx.action.clone()));
        }

        let outcome = match &self.cache {
            Some(cache) if !ignore_cache => {
                let key = cache::cache_key(self.key_scope, &self.wsdl, &ctx.action, &ctx.params)?;
                let cached = cache
                    .wrap(&key, || invoke(&*client, &ctx.action, &ctx.params, &ctx.options))
                    .await;
                ctx.cache_key = Some(key);
                cached.map(|cached| {
                    ctx.cache_hit = cached.hit;
                    cached.value
                })
            }
            _ => {
                debug!("Calling {} without cache", ctx.action);
                invoke(&*client, &ctx.action, &ctx.params, &ctx.options).await
            }
        };

        if !ctx.cache_hit {
            ctx.soap_request = client.last_request();
        }
        outcome
    }
}

/// Run one call and flatten the response into the value handed to callers.
///
/// A missing body is an error, so it never reaches the cache.
async fn invoke(
    client: &dyn SoapClient,
    action: &str,
    params: &Params,
    options: &RequestOptions,
) -> SoapResult<JsonValue> {
    let response = client.call(action, params, options).await?;
    if response.body.is_null() {
        return Err(SoapError::EmptyResponse(action.to_string()));
    }
    Ok(response.into_value())
}
