// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Deserializer, Serialize};

/// Comparison applied between a context attribute and a strategy's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutStrategyAttributeConditional {
	Equals,
	EndsWith,
	StartsWith,
	Greater,
	GreaterEquals,
	Less,
	LessEquals,
	NotEquals,
	Includes,
	Excludes,
	Regex,
	/// A conditional this SDK does not know. Never matches.
	#[serde(other)]
	Unknown,
}

/// How the supplied attribute and the strategy values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutStrategyFieldType {
	String,
	SemanticVersion,
	Number,
	Date,
	Datetime,
	Boolean,
	IpAddress,
	/// A field type this SDK does not know. Never matches.
	#[serde(other)]
	Unknown,
}

/// One predicate of a rollout strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutStrategyAttribute {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub conditional: RolloutStrategyAttributeConditional,
	pub field_name: String,
	/// `None` when the server sent no values at all.
	#[serde(default)]
	pub values: Option<Vec<serde_json::Value>>,
	#[serde(rename = "type")]
	pub field_type: RolloutStrategyFieldType,
}

impl RolloutStrategyAttribute {
	pub fn new(
		field_name: impl Into<String>,
		conditional: RolloutStrategyAttributeConditional,
		field_type: RolloutStrategyFieldType,
		values: Vec<serde_json::Value>,
	) -> Self {
		Self {
			id: None,
			conditional,
			field_name: field_name.into(),
			values: Some(values),
			field_type,
		}
	}

	/// Non-null values rendered as text, in order.
	pub fn string_values(&self) -> Vec<String> {
		self.values
			.iter()
			.flatten()
			.filter_map(value_as_string)
			.collect()
	}
}

/// Text form of a strategy value the way matchers compare it.
pub fn value_as_string(value: &serde_json::Value) -> Option<String> {
	match value {
		serde_json::Value::Null => None,
		serde_json::Value::String(s) => Some(s.clone()),
		serde_json::Value::Bool(b) => Some(b.to_string()),
		serde_json::Value::Number(n) => Some(n.to_string()),
		other => Some(other.to_string()),
	}
}

/// A rule that overrides a feature's value for matching contexts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutStrategy {
	#[serde(default, deserialize_with = "null_as_default")]
	pub id: String,
	#[serde(default)]
	pub value: Option<serde_json::Value>,
	/// Fixed point, out of 1,000,000. Zero means the strategy has no percentage.
	#[serde(default, deserialize_with = "null_as_default")]
	pub percentage: u32,
	#[serde(default, deserialize_with = "null_as_default")]
	pub percentage_attributes: Vec<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub attributes: Vec<RolloutStrategyAttribute>,
}

impl RolloutStrategy {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Self::default()
		}
	}

	pub fn with_value(mut self, value: serde_json::Value) -> Self {
		self.value = Some(value);
		self
	}

	pub fn with_percentage(mut self, percentage: u32) -> Self {
		self.percentage = percentage;
		self
	}

	pub fn with_percentage_attributes(mut self, names: Vec<String>) -> Self {
		self.percentage_attributes = names;
		self
	}

	pub fn with_attribute(mut self, attribute: RolloutStrategyAttribute) -> Self {
		self.attributes.push(attribute);
		self
	}

	pub fn has_attributes(&self) -> bool {
		!self.attributes.is_empty()
	}
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
