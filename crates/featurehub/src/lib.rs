// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! FeatureHub client SDK.
//!
//! Connects to a FeatureHub Edge server, keeps a local repository of feature
//! values up to date, and evaluates them for per-user contexts.
//!
//! # Architecture
//!
//! - [`EdgeFeatureHubConfig`] describes where Edge lives and which API keys to use
//! - An [`EdgeService`] (SSE streaming by default, or polling) feeds events into
//!   the [`ClientFeatureRepository`]
//! - The repository keeps one [`FeatureStateHolder`] per key, applying only
//!   newer states, and tracks [`Readyness`]
//! - A [`ClientContext`] carries user attributes; values are resolved either by
//!   Edge (server-evaluated keys) or locally (client-evaluated keys, marked by `*`)
//!
//! # Example
//!
//! ```ignore
//! use featurehub::EdgeFeatureHubConfig;
//!
//! #[tokio::main]
//! async fn main() -> featurehub::Result<()> {
//!     let config = EdgeFeatureHubConfig::new(
//!         "https://edge.example.com",
//!         "default/82afd7ae-e7de-4567-817b-dd684315adf7/SHxmTA83AJupii4TsIciWvhaQYBIq2*JxIwxKUo",
//!     )?;
//!
//!     let mut context = config.new_context();
//!     context.user_key("fred").country("new_zealand");
//!     context.build().await?;
//!
//!     if context.is_enabled("new_checkout") {
//!         println!("new checkout enabled");
//!     }
//!
//!     context.close().await;
//!     config.close().await;
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod baggage;
pub mod config;
pub mod context;
pub mod edge;
pub mod error;
pub mod holder;
pub mod interceptor;
pub mod polling;
pub mod repository;
pub mod sse;

pub use analytics::{
	AnalyticsCollector, AnalyticsEvent, FeatureSnapshot, NoOpAnalyticsCollector,
	SharedAnalyticsCollector,
};
pub use baggage::{encode_baggage, parse_baggage, BaggageInterceptor, BAGGAGE_HEADER};
pub use config::{ClientConfig, EdgeFeatureHubConfig, EdgeFeatureHubConfigBuilder};
pub use context::{ClientContext, ContextMode};
pub use edge::{
	EdgeService, EdgeServiceFactory, PollingEdgeServiceFactory, SharedEdgeService,
	StreamingEdgeServiceFactory,
};
pub use error::{FeatureHubError, Result};
pub use holder::{FeatureListener, FeatureStateHolder, ListenerId};
pub use interceptor::{
	EnvironmentInterceptor, FeatureValueInterceptor, InterceptorValueMatch, SharedInterceptor,
};
pub use polling::{PollingConfig, PollingEdgeService};
pub use repository::{ClientFeatureRepository, NewStateListener, Readyness, ReadynessListener};
pub use sse::{SseConfig, StreamingEdgeService, CONTEXT_HEADER};

pub use featurehub_common_http::RetryConfig;
pub use featurehub_core::{
	Applied, ApplyFeature, ContextAttributes, EdgeEvent, FeatureState, FeatureValue,
	FeatureValueType, RolloutStrategy, RolloutStrategyAttribute,
	RolloutStrategyAttributeConditional, RolloutStrategyFieldType, StrategyAttributeDeviceName,
	StrategyAttributePlatformName,
};
