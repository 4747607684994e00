// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The transport seam between contexts and Edge.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EdgeFeatureHubConfig;
use crate::error::Result;
use crate::polling::PollingEdgeService;
use crate::sse::StreamingEdgeService;

/// A connection that feeds Edge events into a repository.
#[async_trait]
pub trait EdgeService: Send + Sync {
	/// Starts delivering updates. Calling it again while running is a no-op.
	async fn poll(&self) -> Result<()>;

	/// Re-subscribes under a new context header.
	async fn context_change(&self, header: &str) -> Result<()>;

	/// Stops delivering updates. Idempotent; a closed service never reconnects.
	async fn close(&self);

	/// Whether a context must discard this service when its header changes.
	fn requires_replacement_on_header_change(&self) -> bool;

	fn client_evaluated(&self) -> bool;
}

pub type SharedEdgeService = Arc<dyn EdgeService>;

/// Creates the Edge service for a config.
pub trait EdgeServiceFactory: Send + Sync {
	fn create(&self, config: &EdgeFeatureHubConfig) -> Result<SharedEdgeService>;
}

impl<F> EdgeServiceFactory for F
where
	F: Fn(&EdgeFeatureHubConfig) -> Result<SharedEdgeService> + Send + Sync,
{
	fn create(&self, config: &EdgeFeatureHubConfig) -> Result<SharedEdgeService> {
		self(config)
	}
}

/// Server-sent events; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingEdgeServiceFactory;

impl EdgeServiceFactory for StreamingEdgeServiceFactory {
	fn create(&self, config: &EdgeFeatureHubConfig) -> Result<SharedEdgeService> {
		Ok(Arc::new(StreamingEdgeService::new(config)))
	}
}

/// Periodic polling at the configured interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollingEdgeServiceFactory;

impl EdgeServiceFactory for PollingEdgeServiceFactory {
	fn create(&self, config: &EdgeFeatureHubConfig) -> Result<SharedEdgeService> {
		Ok(Arc::new(PollingEdgeService::new(config)?))
	}
}
