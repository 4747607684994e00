// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Propagation of feature values through the W3C `baggage` header.
//!
//! The current values travel as a single `fhub` baggage member whose value is
//! the URL-encoded list `key=urlencoded(value),key2=...`. A downstream
//! service decodes it and installs a [`BaggageInterceptor`] for the request so
//! it sees the same flag values as the caller.

use std::collections::HashMap;

use featurehub_core::{encode_component, FeatureState, FeatureValueType};

use crate::interceptor::{FeatureValueInterceptor, InterceptorValueMatch};

pub const BAGGAGE_HEADER: &str = "baggage";
const FHUB_MEMBER: &str = "fhub";

fn decode_component(value: &str) -> String {
	urlencoding::decode(value)
		.map(|decoded| decoded.into_owned())
		.unwrap_or_else(|_| value.to_string())
}

/// Builds a `baggage` header carrying `features`.
///
/// Any `fhub` member already present in `existing` is replaced; other members
/// are preserved in order. Returns `None` when there is nothing to send.
pub fn encode_baggage<I, K, V>(existing: Option<&str>, features: I) -> Option<String>
where
	I: IntoIterator<Item = (K, Option<V>)>,
	K: AsRef<str>,
	V: AsRef<str>,
{
	let entries: Vec<String> = features
		.into_iter()
		.map(|(key, value)| {
			let value = value.map(|v| encode_component(v.as_ref())).unwrap_or_default();
			format!("{}={}", key.as_ref(), value)
		})
		.collect();

	let mut members: Vec<String> = existing
		.into_iter()
		.flat_map(|header| header.split(','))
		.map(str::trim)
		.filter(|member| !member.is_empty() && !is_fhub_member(member))
		.map(str::to_string)
		.collect();

	if !entries.is_empty() {
		members.push(format!("{FHUB_MEMBER}={}", encode_component(&entries.join(","))));
	}

	if members.is_empty() {
		None
	} else {
		Some(members.join(","))
	}
}

fn is_fhub_member(member: &str) -> bool {
	member
		.split_once('=')
		.is_some_and(|(name, _)| name.trim() == FHUB_MEMBER)
}

/// Extracts feature overrides from a `baggage` header.
///
/// A key without a value decodes to `None`, meaning the caller had no value.
pub fn parse_baggage(header: &str) -> HashMap<String, Option<String>> {
	let mut overrides = HashMap::new();

	for member in header.split(',').map(str::trim) {
		let Some((name, value)) = member.split_once('=') else {
			continue;
		};
		if name.trim() != FHUB_MEMBER {
			continue;
		}

		for feature in decode_component(value).split(',') {
			let parts: Vec<&str> = feature.split('=').collect();
			match parts.as_slice() {
				[key] if !key.is_empty() => {
					overrides.insert(key.to_string(), None);
				}
				[key, value] if !key.is_empty() => {
					let value = (!value.is_empty()).then(|| decode_component(value));
					overrides.insert(key.to_string(), value);
				}
				_ => {}
			}
		}
	}

	overrides
}

/// Serves values decoded from an inbound `baggage` header.
///
/// JSON features are never overridden, and only features the repository
/// knows about are.
#[derive(Debug, Clone, Default)]
pub struct BaggageInterceptor {
	values: HashMap<String, Option<String>>,
}

impl BaggageInterceptor {
	pub fn new(values: HashMap<String, Option<String>>) -> Self {
		Self { values }
	}

	pub fn from_header(header: &str) -> Self {
		Self::new(parse_baggage(header))
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn values(&self) -> &HashMap<String, Option<String>> {
		&self.values
	}
}

impl FeatureValueInterceptor for BaggageInterceptor {
	fn matched(&self, key: &str, feature: Option<&FeatureState>) -> Option<InterceptorValueMatch> {
		let feature = feature?;
		if feature.value_type == FeatureValueType::Json {
			return None;
		}

		self.values.get(key).map(|value| InterceptorValueMatch {
			value: value.clone(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Vec<(&'static str, Option<&'static str>)> {
		vec![
			("FEATURE_STRING", Some("blah*&=blah")),
			("FEATURE_NUMBER", Some("17")),
			("FEATURE_BOOLEAN", Some("true")),
			("UNDEF", None),
		]
	}

	#[test]
	fn encodes_features_after_existing_members() {
		let header = encode_baggage(Some("current-baggage"), sample());
		assert_eq!(
			header.as_deref(),
			Some("current-baggage,fhub=FEATURE_STRING%3Dblah*%2526%253Dblah%2CFEATURE_NUMBER%3D17%2CFEATURE_BOOLEAN%3Dtrue%2CUNDEF%3D")
		);
	}

	#[test]
	fn replaces_existing_fhub_member() {
		let header = encode_baggage(
			Some("a=1, fhub=OLD%3D1"),
			[("NEW", Some("2"))],
		);
		assert_eq!(header.as_deref(), Some("a=1,fhub=NEW%3D2"));
	}

	#[test]
	fn values_encode_like_the_context_header() {
		let header = encode_baggage(None, [("NOTE", Some("it's (ok)!"))]).unwrap();
		let value = featurehub_core::ContextAttributes::new()
			.with_attr("n", "it's (ok)!")
			.header();

		assert_eq!(value, "n=it's%20(ok)!");
		assert_eq!(header, "fhub=NOTE%3Dit's%2520(ok)!");
	}

	#[test]
	fn nothing_to_send() {
		let empty: Vec<(&str, Option<&str>)> = Vec::new();
		assert_eq!(encode_baggage(None, empty.clone()), None);
		assert_eq!(encode_baggage(Some("sausage"), empty).as_deref(), Some("sausage"));
	}

	#[test]
	fn parses_what_it_encodes() {
		let header = encode_baggage(Some("current-baggage"), sample()).unwrap();
		let parsed = parse_baggage(&header);

		assert_eq!(parsed.get("FEATURE_STRING"), Some(&Some("blah*&=blah".to_string())));
		assert_eq!(parsed.get("FEATURE_NUMBER"), Some(&Some("17".to_string())));
		assert_eq!(parsed.get("UNDEF"), Some(&None));
		assert_eq!(parsed.len(), 4);
	}

	#[test]
	fn ignores_other_members() {
		assert!(parse_baggage("userId=alice,isProduction=false").is_empty());
	}

	#[test]
	fn interceptor_skips_json_and_unknown_features() {
		let interceptor = BaggageInterceptor::from_header("fhub=CONFIG%3Dx%2CFLAG%3Dtrue");

		let json = FeatureState::new("1", "CONFIG", FeatureValueType::Json);
		let flag = FeatureState::new("2", "FLAG", FeatureValueType::Boolean);

		assert_eq!(interceptor.matched("CONFIG", Some(&json)), None);
		assert_eq!(interceptor.matched("FLAG", None), None);
		assert_eq!(
			interceptor.matched("FLAG", Some(&flag)),
			Some(InterceptorValueMatch::new("true"))
		);
	}
}
