// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature state as delivered by Edge.
//!
//! A [`FeatureState`] is the unit of every update: the full `features` batch is
//! a list of them and a single `feature` event carries one. The payload value is
//! decoded into a typed [`FeatureValue`] once, at the edge of the system, so the
//! rest of the SDK never inspects raw JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::strategy::RolloutStrategy;

/// Declared type of a feature's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureValueType {
	Boolean,
	String,
	Number,
	Json,
}

impl FeatureValueType {
	pub fn as_str(&self) -> &'static str {
		match self {
			FeatureValueType::Boolean => "BOOLEAN",
			FeatureValueType::String => "STRING",
			FeatureValueType::Number => "NUMBER",
			FeatureValueType::Json => "JSON",
		}
	}
}

impl fmt::Display for FeatureValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A typed feature value. JSON features keep their raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
	Boolean(bool),
	String(String),
	Number(f64),
	Json(String),
}

impl FeatureValue {
	pub fn value_type(&self) -> FeatureValueType {
		match self {
			FeatureValue::Boolean(_) => FeatureValueType::Boolean,
			FeatureValue::String(_) => FeatureValueType::String,
			FeatureValue::Number(_) => FeatureValueType::Number,
			FeatureValue::Json(_) => FeatureValueType::Json,
		}
	}

	/// Decodes a wire value for a feature of `value_type`.
	///
	/// `null` yields `Ok(None)`. Scalars are accepted leniently (a number sent as
	/// a string, a JSON document sent as an object) since servers differ. The
	/// error carries the type the value failed to decode as.
	pub fn from_json(
		value_type: FeatureValueType,
		value: &serde_json::Value,
	) -> Result<Option<Self>, FeatureValueType> {
		use serde_json::Value;

		let mismatch = || value_type;

		let decoded = match (value_type, value) {
			(_, Value::Null) => return Ok(None),
			(FeatureValueType::Boolean, Value::Bool(b)) => FeatureValue::Boolean(*b),
			(FeatureValueType::Boolean, Value::String(s)) => match s.as_str() {
				"true" => FeatureValue::Boolean(true),
				"false" => FeatureValue::Boolean(false),
				_ => return Err(mismatch()),
			},
			(FeatureValueType::Number, Value::Number(n)) => {
				FeatureValue::Number(n.as_f64().ok_or_else(mismatch)?)
			}
			(FeatureValueType::Number, Value::String(s)) => {
				FeatureValue::Number(s.trim().parse::<f64>().map_err(|_| mismatch())?)
			}
			(FeatureValueType::String, Value::String(s)) => FeatureValue::String(s.clone()),
			(FeatureValueType::String, Value::Number(n)) => FeatureValue::String(n.to_string()),
			(FeatureValueType::String, Value::Bool(b)) => FeatureValue::String(b.to_string()),
			(FeatureValueType::Json, Value::String(s)) => FeatureValue::Json(s.clone()),
			(FeatureValueType::Json, other) => FeatureValue::Json(other.to_string()),
			_ => return Err(mismatch()),
		};

		Ok(Some(decoded))
	}

	/// Converts an override supplied as text (interceptors, baggage) into a
	/// value of `value_type`.
	///
	/// Booleans compare against the literal `"true"`. Numbers parse as an
	/// integer unless the text contains `.`.
	pub fn coerce(value_type: FeatureValueType, raw: &str) -> Option<Self> {
		match value_type {
			FeatureValueType::Boolean => Some(FeatureValue::Boolean(raw == "true")),
			FeatureValueType::String => Some(FeatureValue::String(raw.to_string())),
			FeatureValueType::Json => Some(FeatureValue::Json(raw.to_string())),
			FeatureValueType::Number => {
				let raw = raw.trim();
				if raw.contains('.') {
					raw.parse::<f64>().ok().map(FeatureValue::Number)
				} else {
					raw.parse::<i64>().ok().map(|n| FeatureValue::Number(n as f64))
				}
			}
		}
	}

	pub fn to_json(&self) -> serde_json::Value {
		match self {
			FeatureValue::Boolean(b) => serde_json::Value::Bool(*b),
			FeatureValue::String(s) | FeatureValue::Json(s) => serde_json::Value::String(s.clone()),
			FeatureValue::Number(n) => serde_json::Number::from_f64(*n)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			FeatureValue::Boolean(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			FeatureValue::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			FeatureValue::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_raw_json(&self) -> Option<&str> {
		match self {
			FeatureValue::Json(s) => Some(s),
			_ => None,
		}
	}
}

impl fmt::Display for FeatureValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FeatureValue::Boolean(b) => write!(f, "{b}"),
			FeatureValue::String(s) | FeatureValue::Json(s) => f.write_str(s),
			FeatureValue::Number(n) => write!(f, "{n}"),
		}
	}
}

/// The latest known state of one feature in one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireFeatureState", into = "WireFeatureState")]
pub struct FeatureState {
	/// Stable feature-value id, used for percentage bucketing.
	pub id: String,
	pub key: String,
	pub version: u64,
	pub value_type: FeatureValueType,
	pub value: Option<FeatureValue>,
	/// A locked value is authoritative: no strategy or interceptor overrides it.
	pub locked: bool,
	pub strategies: Vec<RolloutStrategy>,
	pub environment_id: Option<String>,
}

impl FeatureState {
	pub fn new(id: impl Into<String>, key: impl Into<String>, value_type: FeatureValueType) -> Self {
		Self {
			id: id.into(),
			key: key.into(),
			version: 0,
			value_type,
			value: None,
			locked: false,
			strategies: Vec::new(),
			environment_id: None,
		}
	}

	pub fn with_version(mut self, version: u64) -> Self {
		self.version = version;
		self
	}

	pub fn with_value(mut self, value: FeatureValue) -> Self {
		self.value = Some(value);
		self
	}

	pub fn with_locked(mut self, locked: bool) -> Self {
		self.locked = locked;
		self
	}

	pub fn with_strategies(mut self, strategies: Vec<RolloutStrategy>) -> Self {
		self.strategies = strategies;
		self
	}

	/// The stored value, only if it has the requested type.
	pub fn value_of_type(&self, value_type: FeatureValueType) -> Option<&FeatureValue> {
		self.value.as_ref().filter(|v| v.value_type() == value_type)
	}

	/// Whether `incoming` should replace `self`.
	///
	/// Newer versions always win. An equal version wins only when it carries a
	/// different value, which tolerates servers that change a value without
	/// bumping the version while still dropping duplicates and stale messages.
	pub fn is_superseded_by(&self, incoming: &FeatureState) -> bool {
		incoming.version > self.version
			|| (incoming.version == self.version && incoming.value != self.value)
	}
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFeatureState {
	id: String,
	key: String,
	#[serde(default)]
	version: Option<u64>,
	#[serde(rename = "type", default)]
	value_type: Option<FeatureValueType>,
	#[serde(default)]
	value: serde_json::Value,
	#[serde(rename = "l", default)]
	locked: Option<bool>,
	#[serde(default)]
	strategies: Option<Vec<RolloutStrategy>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	environment_id: Option<String>,
}

impl TryFrom<WireFeatureState> for FeatureState {
	type Error = CoreError;

	fn try_from(wire: WireFeatureState) -> Result<Self, Self::Error> {
		let value_type = wire
			.value_type
			.ok_or_else(|| CoreError::MissingType { key: wire.key.clone() })?;

		let value = FeatureValue::from_json(value_type, &wire.value).map_err(|expected| {
			CoreError::ValueTypeMismatch {
				key: wire.key.clone(),
				value_type: expected.to_string(),
			}
		})?;

		Ok(Self {
			id: wire.id,
			key: wire.key,
			version: wire.version.unwrap_or(0),
			value_type,
			value,
			locked: wire.locked.unwrap_or(false),
			strategies: wire.strategies.unwrap_or_default(),
			environment_id: wire.environment_id,
		})
	}
}

impl From<FeatureState> for WireFeatureState {
	fn from(state: FeatureState) -> Self {
		Self {
			id: state.id,
			key: state.key,
			version: Some(state.version),
			value_type: Some(state.value_type),
			value: state
				.value
				.as_ref()
				.map(FeatureValue::to_json)
				.unwrap_or(serde_json::Value::Null),
			locked: Some(state.locked),
			strategies: Some(state.strategies),
			environment_id: state.environment_id,
		}
	}
}
