// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the FeatureHub SDK.

use featurehub_common_config::{EnvError, RequiredEnvError};
use featurehub_common_http::RetryableError;
use thiserror::Error;

/// Result type alias for the FeatureHub SDK.
pub type Result<T> = std::result::Result<T, FeatureHubError>;

#[derive(Error, Debug)]
pub enum FeatureHubError {
	/// API key is missing or empty.
	#[error("Invalid or missing API key")]
	InvalidApiKey,

	/// Client-evaluated and server-evaluated API keys cannot be mixed.
	#[error("API keys must all be client-evaluated or all server-evaluated")]
	MixedApiKeys,

	/// Edge URL is missing or not http(s).
	#[error("Invalid or missing Edge URL: {0}")]
	InvalidEdgeUrl(String),

	/// Failed to connect to Edge.
	#[error("Failed to connect to Edge: {0}")]
	ConnectionFailed(#[source] reqwest::Error),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[source] reqwest::Error),

	/// Failed to parse an Edge response or event.
	#[error("Failed to parse Edge response: {0}")]
	ParseFailed(String),

	/// Edge returned an error response.
	#[error("Edge returned an error: {status} - {message}")]
	ServerError { status: u16, message: String },

	/// SSE stream error.
	#[error("SSE stream error: {0}")]
	SseStreamError(String),

	/// Edge answered a poll with no environments, meaning the API key is unknown.
	#[error("Edge returned no environments for the API key")]
	NoEnvironments,

	/// The context or Edge service has been closed.
	#[error("Client has been closed")]
	ClientClosed,

	/// Reading configuration from the environment failed.
	#[error("Failed to load configuration: {0}")]
	Config(#[from] EnvError),

	/// A required configuration variable is missing.
	#[error(transparent)]
	MissingConfig(#[from] RequiredEnvError),

	/// A configuration value could not be interpreted.
	#[error("Invalid value for {var}: {value}")]
	InvalidConfigValue { var: String, value: String },
}

impl FeatureHubError {
	/// Returns true if this error is retryable.
	pub fn is_retryable(&self) -> bool {
		match self {
			FeatureHubError::ConnectionFailed(_) | FeatureHubError::SseStreamError(_) => true,
			FeatureHubError::RequestFailed(e) => e.is_retryable(),
			FeatureHubError::ServerError { status, .. } => {
				matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
			}
			_ => false,
		}
	}
}

impl RetryableError for FeatureHubError {
	fn is_retryable(&self) -> bool {
		FeatureHubError::is_retryable(self)
	}
}

impl From<featurehub_core::CoreError> for FeatureHubError {
	fn from(err: featurehub_core::CoreError) -> Self {
		FeatureHubError::ParseFailed(err.to_string())
	}
}
