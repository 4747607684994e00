// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics integration.
//!
//! The host application calls
//! [`ClientFeatureRepository::log_analytics_event`](crate::ClientFeatureRepository::log_analytics_event)
//! with an action name (for example `"checkout"`). The repository snapshots
//! every feature that currently has a value and hands the snapshot to each
//! registered [`AnalyticsCollector`].
//!
//! # Example
//!
//! ```ignore
//! use featurehub::{AnalyticsCollector, AnalyticsEvent};
//! use async_trait::async_trait;
//!
//! struct StdoutCollector;
//!
//! #[async_trait]
//! impl AnalyticsCollector for StdoutCollector {
//!     async fn log_event(&self, event: &AnalyticsEvent) {
//!         println!("{}", event.to_event_properties());
//!     }
//! }
//!
//! repository.add_analytics_collector(Arc::new(StdoutCollector));
//! repository.log_analytics_event("checkout", HashMap::new(), None).await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use featurehub_core::{FeatureValue, FeatureValueType};
use serde::{Deserialize, Serialize};

/// The value of one feature at the time an event was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
	pub key: String,
	pub id: String,
	pub version: u64,
	pub value_type: FeatureValueType,
	/// Rendered value; JSON features carry their raw text.
	pub value: String,
}

impl FeatureSnapshot {
	pub fn new(
		key: impl Into<String>,
		id: impl Into<String>,
		version: u64,
		value: &FeatureValue,
	) -> Self {
		Self {
			key: key.into(),
			id: id.into(),
			version,
			value_type: value.value_type(),
			value: match value {
				FeatureValue::Boolean(true) => "on".to_string(),
				FeatureValue::Boolean(false) => "off".to_string(),
				other => other.to_string(),
			},
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
	pub action: String,
	/// Free-form properties supplied by the caller.
	pub other: HashMap<String, String>,
	pub features: Vec<FeatureSnapshot>,
	pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
	pub fn new(
		action: impl Into<String>,
		other: HashMap<String, String>,
		features: Vec<FeatureSnapshot>,
	) -> Self {
		Self {
			action: action.into(),
			other,
			features,
			timestamp: Utc::now(),
		}
	}

	/// Flattens the event into a JSON object of properties.
	///
	/// Each feature becomes `feature.<key>`; caller properties are copied as
	/// is, without overwriting the action or features.
	pub fn to_event_properties(&self) -> serde_json::Value {
		let mut props = serde_json::Map::new();
		for (k, v) in &self.other {
			props.insert(k.clone(), serde_json::Value::String(v.clone()));
		}
		for feature in &self.features {
			props.insert(
				format!("feature.{}", feature.key),
				serde_json::Value::String(feature.value.clone()),
			);
		}
		props.insert("action".to_string(), serde_json::Value::String(self.action.clone()));
		props.insert(
			"timestamp".to_string(),
			serde_json::Value::String(self.timestamp.to_rfc3339()),
		);
		serde_json::Value::Object(props)
	}
}

/// Receives analytics events from the repository.
///
/// Collectors are awaited one after another on the caller's task. Keep them
/// fast; queue expensive work such as HTTP export.
#[async_trait]
pub trait AnalyticsCollector: Send + Sync + 'static {
	async fn log_event(&self, event: &AnalyticsEvent);
}

pub type SharedAnalyticsCollector = Arc<dyn AnalyticsCollector>;

/// A collector that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAnalyticsCollector;

#[async_trait]
impl AnalyticsCollector for NoOpAnalyticsCollector {
	async fn log_event(&self, _event: &AnalyticsEvent) {}
}
