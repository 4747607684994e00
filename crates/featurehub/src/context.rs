// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-user evaluation contexts.
//!
//! A context collects attributes such as the user key, country or platform.
//! With a server-evaluated API key, [`ClientContext::build`] sends those
//! attributes to Edge as the `x-featurehub` header and Edge returns values
//! already resolved for them. With a client-evaluated key, Edge delivers every
//! rollout strategy once and the context resolves values locally.
//!
//! ```ignore
//! let config = EdgeFeatureHubConfig::new("https://edge.example.com", "default/env/key")?;
//! let mut context = config.new_context();
//! context.user_key("fred").country("new_zealand");
//! context.build().await?;
//!
//! if context.is_enabled("new_checkout") {
//!     // ...
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use featurehub_core::context::{COUNTRY, DEVICE, PLATFORM, SESSION_KEY, USER_KEY, VERSION};
use featurehub_core::{ContextAttributes, StrategyAttributeDeviceName, StrategyAttributePlatformName};
use tracing::{debug, warn};

use crate::config::EdgeFeatureHubConfig;
use crate::edge::SharedEdgeService;
use crate::error::{FeatureHubError, Result};
use crate::holder::FeatureStateHolder;
use crate::repository::{ClientFeatureRepository, Readyness};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
	/// Edge resolves values for the context header.
	ServerEvaluated,
	/// Values are resolved locally from the full strategy list.
	ClientEvaluated,
}

pub struct ClientContext {
	config: EdgeFeatureHubConfig,
	repository: Arc<ClientFeatureRepository>,
	attributes: ContextAttributes,
	mode: ContextMode,
	/// Only server-evaluated contexts own an Edge service.
	edge: Option<SharedEdgeService>,
	current_header: Option<String>,
	closed: bool,
}

impl fmt::Debug for ClientContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientContext")
			.field("mode", &self.mode)
			.field("attributes", &self.attributes)
			.field("current_header", &self.current_header)
			.field("closed", &self.closed)
			.finish_non_exhaustive()
	}
}

impl ClientContext {
	pub fn new(config: EdgeFeatureHubConfig) -> Self {
		let mode = if config.client_evaluated() {
			ContextMode::ClientEvaluated
		} else {
			ContextMode::ServerEvaluated
		};
		Self {
			repository: config.repository(),
			config,
			attributes: ContextAttributes::new(),
			mode,
			edge: None,
			current_header: None,
			closed: false,
		}
	}

	pub fn mode(&self) -> ContextMode {
		self.mode
	}

	pub fn user_key(&mut self, key: impl Into<String>) -> &mut Self {
		self.attributes.set_attr(USER_KEY, key);
		self
	}

	pub fn session_key(&mut self, key: impl Into<String>) -> &mut Self {
		self.attributes.set_attr(SESSION_KEY, key);
		self
	}

	pub fn country(&mut self, country: impl Into<String>) -> &mut Self {
		self.attributes.set_attr(COUNTRY, country);
		self
	}

	pub fn device(&mut self, device: StrategyAttributeDeviceName) -> &mut Self {
		self.attributes.set_attr(DEVICE, device.as_str());
		self
	}

	pub fn platform(&mut self, platform: StrategyAttributePlatformName) -> &mut Self {
		self.attributes.set_attr(PLATFORM, platform.as_str());
		self
	}

	pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
		self.attributes.set_attr(VERSION, version);
		self
	}

	pub fn attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.attributes.set_attr(name, value);
		self
	}

	pub fn attrs<I, S>(&mut self, name: impl Into<String>, values: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.attributes.set_attrs(name, values);
		self
	}

	pub fn clear(&mut self) -> &mut Self {
		self.attributes.clear();
		self
	}

	pub fn get_attr(&self, name: &str) -> Option<&str> {
		self.attributes.get_attr(name)
	}

	pub fn attributes(&self) -> &ContextAttributes {
		&self.attributes
	}

	/// Session key if set, otherwise user key.
	pub fn default_percentage_key(&self) -> Option<&str> {
		self.attributes.default_percentage_key()
	}

	/// Applies the current attributes.
	///
	/// Server-evaluated: when the header changed, the repository drops back to
	/// `NotReady` and the Edge service re-subscribes, replacing the service if
	/// it cannot switch headers in place. Client-evaluated: makes sure the
	/// shared Edge service is running.
	pub async fn build(&mut self) -> Result<()> {
		if self.closed {
			return Err(FeatureHubError::ClientClosed);
		}

		match self.mode {
			ContextMode::ClientEvaluated => self.config.shared_edge_service()?.poll().await,
			ContextMode::ServerEvaluated => self.build_server_evaluated().await,
		}
	}

	async fn build_server_evaluated(&mut self) -> Result<()> {
		let header = self.attributes.header();

		if self.current_header.as_deref() != Some(header.as_str()) {
			debug!(header = %header, "context header changed");
			self.current_header = Some(header.clone());
			self.repository.not_ready();

			if let Some(edge) = self.edge.take() {
				if edge.requires_replacement_on_header_change() {
					edge.close().await;
				} else {
					self.edge = Some(edge);
				}
			}
		}

		let edge = match &self.edge {
			Some(edge) => Arc::clone(edge),
			None => {
				let edge = self.config.edge_service()?;
				self.edge = Some(Arc::clone(&edge));
				edge
			}
		};

		edge.context_change(&header).await.map_err(|e| {
			warn!(error = %e, "Edge context change failed");
			e
		})
	}

	pub fn repository(&self) -> Arc<ClientFeatureRepository> {
		Arc::clone(&self.repository)
	}

	pub fn readyness(&self) -> Readyness {
		self.repository.readyness()
	}

	/// The holder for `key`, evaluated for this context.
	pub fn feature(&self, key: &str) -> FeatureStateHolder {
		let holder = self.repository.feature(key);
		match self.mode {
			ContextMode::ClientEvaluated => holder.with_context(self.attributes.clone()),
			ContextMode::ServerEvaluated => holder,
		}
	}

	pub fn get_flag(&self, key: &str) -> Option<bool> {
		self.feature(key).get_flag()
	}

	pub fn get_boolean(&self, key: &str) -> Option<bool> {
		self.feature(key).get_boolean()
	}

	pub fn get_string(&self, key: &str) -> Option<String> {
		self.feature(key).get_string()
	}

	pub fn get_number(&self, key: &str) -> Option<f64> {
		self.feature(key).get_number()
	}

	pub fn get_raw_json(&self, key: &str) -> Option<String> {
		self.feature(key).get_raw_json()
	}

	pub fn get_json(&self, key: &str) -> Option<serde_json::Value> {
		self.feature(key).get_json()
	}

	pub fn is_set(&self, key: &str) -> bool {
		self.feature(key).is_set()
	}

	pub fn is_enabled(&self, key: &str) -> bool {
		self.feature(key).is_enabled()
	}

	pub fn exists(&self, key: &str) -> bool {
		self.feature(key).exists()
	}

	pub async fn log_analytics_event(&self, action: &str, other: HashMap<String, String>) {
		let context = match self.mode {
			ContextMode::ClientEvaluated => Some(&self.attributes),
			ContextMode::ServerEvaluated => None,
		};
		self.repository
			.log_analytics_event(action, other, context)
			.await;
	}

	/// Closes this context's Edge service. The shared client-evaluated service
	/// stays open until [`EdgeFeatureHubConfig::close`].
	pub async fn close(&mut self) {
		if self.closed {
			return;
		}
		self.closed = true;
		if let Some(edge) = self.edge.take() {
			edge.close().await;
		}
		debug!("context closed");
	}
}
