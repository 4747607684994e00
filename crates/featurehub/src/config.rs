// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Edge connection configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use featurehub_common_config::{load_env, require_secret_env, RequiredEnvError, SecretString};
use featurehub_common_http::RetryConfig;
use featurehub_core::encode_component;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::context::ClientContext;
use crate::edge::{
	EdgeServiceFactory, PollingEdgeServiceFactory, SharedEdgeService, StreamingEdgeServiceFactory,
};
use crate::error::{FeatureHubError, Result};
use crate::polling::PollingConfig;
use crate::repository::ClientFeatureRepository;
use crate::sse::SseConfig;

pub const EDGE_URL_VAR: &str = "FEATUREHUB_EDGE_URL";
pub const API_KEY_VAR: &str = "FEATUREHUB_API_KEY";
pub const POLL_INTERVAL_VAR: &str = "FEATUREHUB_POLL_INTERVAL";

/// Transport tuning.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Timeout for polling requests, and for waiting on a stream to connect.
	pub request_timeout: Duration,
	pub sse_config: SseConfig,
	pub polling: PollingConfig,
	/// Retry configuration for polling requests.
	pub retry_config: RetryConfig,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(5),
			sse_config: SseConfig::default(),
			polling: PollingConfig::default(),
			retry_config: RetryConfig::default(),
		}
	}
}

/// Where Edge lives, which environments to read, and how to connect.
///
/// Cloning is cheap; clones share the repository and the shared Edge service
/// used by client-evaluated contexts.
#[derive(Clone)]
pub struct EdgeFeatureHubConfig {
	edge_url: String,
	api_keys: Vec<SecretString>,
	client_evaluated: bool,
	client_config: ClientConfig,
	factory: Arc<dyn EdgeServiceFactory>,
	repository: Arc<ClientFeatureRepository>,
	shared_edge: Arc<Mutex<Option<SharedEdgeService>>>,
}

impl fmt::Debug for EdgeFeatureHubConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EdgeFeatureHubConfig")
			.field("edge_url", &self.edge_url)
			.field("api_keys", &self.api_keys)
			.field("client_evaluated", &self.client_evaluated)
			.field("client_config", &self.client_config)
			.finish_non_exhaustive()
	}
}

impl EdgeFeatureHubConfig {
	pub fn builder() -> EdgeFeatureHubConfigBuilder {
		EdgeFeatureHubConfigBuilder::new()
	}

	/// Streaming config for a single API key.
	pub fn new(edge_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
		Self::builder().edge_url(edge_url).api_key(api_key).build()
	}

	/// Reads `FEATUREHUB_EDGE_URL` and `FEATUREHUB_API_KEY`, each of which may
	/// instead name a file through its `_FILE` variant. Setting
	/// `FEATUREHUB_POLL_INTERVAL` (seconds) selects polling.
	pub fn from_env() -> Result<Self> {
		let edge_url = load_env(EDGE_URL_VAR)?.ok_or_else(|| RequiredEnvError::Missing {
			var: EDGE_URL_VAR.to_string(),
			file_var: format!("{EDGE_URL_VAR}_FILE"),
		})?;
		let api_key = require_secret_env(API_KEY_VAR)?;

		let mut builder = Self::builder()
			.edge_url(edge_url)
			.api_key(api_key.expose().as_str());

		if let Some(interval) = load_env(POLL_INTERVAL_VAR)? {
			let secs: u64 =
				interval
					.trim()
					.parse()
					.map_err(|_| FeatureHubError::InvalidConfigValue {
						var: POLL_INTERVAL_VAR.to_string(),
						value: interval.clone(),
					})?;
			builder = builder.polling(Duration::from_secs(secs));
		}

		builder.build()
	}

	pub fn edge_url(&self) -> &str {
		&self.edge_url
	}

	pub fn api_keys(&self) -> &[SecretString] {
		&self.api_keys
	}

	/// True when the API keys carry the full strategy list for local evaluation.
	pub fn client_evaluated(&self) -> bool {
		self.client_evaluated
	}

	pub fn client_config(&self) -> &ClientConfig {
		&self.client_config
	}

	pub fn repository(&self) -> Arc<ClientFeatureRepository> {
		Arc::clone(&self.repository)
	}

	/// Streaming URL for the first API key.
	pub fn url(&self) -> String {
		format!("{}/features/{}", self.edge_url, self.api_keys[0].expose())
	}

	/// Polling URL covering every API key.
	pub fn polling_url(&self) -> String {
		let keys = self
			.api_keys
			.iter()
			.map(|key| format!("sdkUrl={}", encode_component(key.expose())))
			.collect::<Vec<_>>()
			.join("&");
		format!("{}/features?{}", self.edge_url, keys)
	}

	/// Creates a new Edge service through the configured factory.
	pub fn edge_service(&self) -> Result<SharedEdgeService> {
		self.factory.create(self)
	}

	/// The single Edge service shared by client-evaluated contexts.
	pub fn shared_edge_service(&self) -> Result<SharedEdgeService> {
		let mut shared = self.shared_edge.lock();
		if let Some(edge) = shared.as_ref() {
			return Ok(Arc::clone(edge));
		}

		let edge = self.edge_service()?;
		*shared = Some(Arc::clone(&edge));
		Ok(edge)
	}

	pub fn new_context(&self) -> ClientContext {
		ClientContext::new(self.clone())
	}

	/// Creates a context and waits for its first connection.
	pub async fn init(&self) -> Result<ClientContext> {
		let mut context = self.new_context();
		context.build().await?;
		Ok(context)
	}

	/// Closes the shared Edge service. Contexts close their own.
	pub async fn close(&self) {
		let edge = self.shared_edge.lock().take();
		if let Some(edge) = edge {
			edge.close().await;
		}
	}
}

pub struct EdgeFeatureHubConfigBuilder {
	edge_url: Option<String>,
	api_keys: Vec<String>,
	config: ClientConfig,
	factory: Option<Arc<dyn EdgeServiceFactory>>,
	repository: Option<Arc<ClientFeatureRepository>>,
}

impl Default for EdgeFeatureHubConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl EdgeFeatureHubConfigBuilder {
	pub fn new() -> Self {
		Self {
			edge_url: None,
			api_keys: Vec::new(),
			config: ClientConfig::default(),
			factory: None,
			repository: None,
		}
	}

	/// Example: `https://edge.example.com`
	pub fn edge_url(mut self, url: impl Into<String>) -> Self {
		self.edge_url = Some(url.into());
		self
	}

	/// Adds an API key. Keys containing `*` are client-evaluated.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_keys.push(key.into());
		self
	}

	pub fn api_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.api_keys.extend(keys.into_iter().map(Into::into));
		self
	}

	pub fn client_config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	pub fn sse_config(mut self, config: SseConfig) -> Self {
		self.config.sse_config = config;
		self
	}

	pub fn retry_config(mut self, config: RetryConfig) -> Self {
		self.config.retry_config = config;
		self
	}

	/// Selects the polling transport.
	pub fn polling(mut self, interval: Duration) -> Self {
		self.config.polling.interval = interval;
		self.factory = Some(Arc::new(PollingEdgeServiceFactory));
		self
	}

	pub fn edge_service_factory<F: EdgeServiceFactory + 'static>(mut self, factory: F) -> Self {
		self.factory = Some(Arc::new(factory));
		self
	}

	/// Shares an existing repository instead of creating one.
	pub fn repository(mut self, repository: Arc<ClientFeatureRepository>) -> Self {
		self.repository = Some(repository);
		self
	}

	pub fn build(self) -> Result<EdgeFeatureHubConfig> {
		let edge_url = normalize_edge_url(self.edge_url.as_deref().unwrap_or_default())?;

		if self.api_keys.is_empty() || self.api_keys.iter().any(|k| k.trim().is_empty()) {
			return Err(FeatureHubError::InvalidApiKey);
		}

		let client_evaluated = self.api_keys[0].contains('*');
		if self
			.api_keys
			.iter()
			.any(|k| k.contains('*') != client_evaluated)
		{
			return Err(FeatureHubError::MixedApiKeys);
		}

		info!(
			edge_url = %edge_url,
			keys = self.api_keys.len(),
			client_evaluated,
			"configured FeatureHub Edge"
		);

		Ok(EdgeFeatureHubConfig {
			edge_url,
			api_keys: self.api_keys.into_iter().map(SecretString::new).collect(),
			client_evaluated,
			client_config: self.config,
			factory: self
				.factory
				.unwrap_or_else(|| Arc::new(StreamingEdgeServiceFactory)),
			repository: self
				.repository
				.unwrap_or_else(|| Arc::new(ClientFeatureRepository::new())),
			shared_edge: Arc::new(Mutex::new(None)),
		})
	}
}

/// Trims trailing slashes and a trailing `/features` path.
fn normalize_edge_url(url: &str) -> Result<String> {
	let trimmed = url.trim();
	if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
		return Err(FeatureHubError::InvalidEdgeUrl(url.to_string()));
	}

	let mut normalized = trimmed.trim_end_matches('/');
	if let Some(stripped) = normalized.strip_suffix("/features") {
		normalized = stripped.trim_end_matches('/');
	}

	if normalized.ends_with(':') || normalized.ends_with("//") {
		return Err(FeatureHubError::InvalidEdgeUrl(url.to_string()));
	}

	debug!(edge_url = normalized, "normalized Edge URL");
	Ok(normalized.to_string())
}
