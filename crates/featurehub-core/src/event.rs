// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Update events pushed by Edge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::feature::FeatureState;

/// Named channel an Edge event arrives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SseResultState {
	Ack,
	Bye,
	Failure,
	Features,
	Feature,
	DeleteFeature,
	Config,
}

impl SseResultState {
	pub fn as_str(&self) -> &'static str {
		match self {
			SseResultState::Ack => "ack",
			SseResultState::Bye => "bye",
			SseResultState::Failure => "failure",
			SseResultState::Features => "features",
			SseResultState::Feature => "feature",
			SseResultState::DeleteFeature => "delete_feature",
			SseResultState::Config => "config",
		}
	}
}

impl fmt::Display for SseResultState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SseResultState {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"ack" => Ok(SseResultState::Ack),
			"bye" => Ok(SseResultState::Bye),
			"failure" => Ok(SseResultState::Failure),
			"features" => Ok(SseResultState::Features),
			"feature" => Ok(SseResultState::Feature),
			"delete_feature" => Ok(SseResultState::DeleteFeature),
			"config" => Ok(SseResultState::Config),
			other => Err(CoreError::UnknownEventKind(other.to_string())),
		}
	}
}

/// Identity of a deleted feature. Edge may or may not include the version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedFeature {
	#[serde(default)]
	pub id: String,
	pub key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
}

/// A decoded event, ready to hand to the repository.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeEvent {
	Features(Vec<FeatureState>),
	Feature(FeatureState),
	DeleteFeature(DeletedFeature),
	Failure,
	Bye,
	Ack,
	/// Edge configuration hints. Carried through but not acted on.
	Config(serde_json::Value),
}

impl EdgeEvent {
	/// Decodes the payload of an event of the named kind.
	///
	/// `failure`, `bye` and `ack` ignore their payload.
	pub fn decode(kind: &str, data: &str) -> Result<Self> {
		let state: SseResultState = kind.parse()?;
		Self::decode_state(state, data)
	}

	pub fn decode_state(state: SseResultState, data: &str) -> Result<Self> {
		let malformed = |source| CoreError::MalformedPayload {
			kind: state.as_str().to_string(),
			source,
		};

		Ok(match state {
			SseResultState::Ack => EdgeEvent::Ack,
			SseResultState::Bye => EdgeEvent::Bye,
			SseResultState::Failure => EdgeEvent::Failure,
			SseResultState::Features => {
				let items: Vec<serde_json::Value> = serde_json::from_str(data).map_err(malformed)?;
				EdgeEvent::Features(decode_features(items))
			}
			SseResultState::Feature => {
				EdgeEvent::Feature(serde_json::from_str(data).map_err(malformed)?)
			}
			SseResultState::DeleteFeature => {
				EdgeEvent::DeleteFeature(serde_json::from_str(data).map_err(malformed)?)
			}
			SseResultState::Config => {
				EdgeEvent::Config(serde_json::from_str(data).map_err(malformed)?)
			}
		})
	}

	pub fn kind(&self) -> SseResultState {
		match self {
			EdgeEvent::Features(_) => SseResultState::Features,
			EdgeEvent::Feature(_) => SseResultState::Feature,
			EdgeEvent::DeleteFeature(_) => SseResultState::DeleteFeature,
			EdgeEvent::Failure => SseResultState::Failure,
			EdgeEvent::Bye => SseResultState::Bye,
			EdgeEvent::Ack => SseResultState::Ack,
			EdgeEvent::Config(_) => SseResultState::Config,
		}
	}
}

/// Decodes a batch one feature at a time. Entries that do not decode are
/// logged and dropped so the rest of the batch still lands.
pub fn decode_features(items: Vec<serde_json::Value>) -> Vec<FeatureState> {
	items
		.into_iter()
		.filter_map(|item| {
			let key = item
				.get("key")
				.and_then(serde_json::Value::as_str)
				.map(str::to_string);
			match serde_json::from_value::<FeatureState>(item) {
				Ok(feature) => Some(feature),
				Err(e) => {
					warn!(
						key = key.as_deref().unwrap_or("<none>"),
						error = %e,
						"skipping undecodable feature"
					);
					None
				}
			}
		})
		.collect()
}

fn lenient_features<'de, D>(deserializer: D) -> std::result::Result<Vec<FeatureState>, D::Error>
where
	D: Deserializer<'de>,
{
	let items = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
	Ok(decode_features(items.unwrap_or_default()))
}

/// One environment in a polling response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
	pub id: String,
	#[serde(default, deserialize_with = "lenient_features")]
	pub features: Vec<FeatureState>,
}
