// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rollout strategy evaluation.
//!
//! Strategies are tried in order and the first match wins:
//!
//! 1. A strategy with a percentage is considered when a bucketing key can be
//!    built. Its key is the `$`-joined values of its percentage attributes, or
//!    the context's default key (session, then user). The bucket from
//!    [`PercentageCalculator`] must not exceed the strategy's percentage plus
//!    the percentages of earlier percentage-only strategies for the same key.
//!    If the strategy also has attributes, they must all match.
//! 2. A strategy without a percentage matches when all its attributes match.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::context::ContextAttributes;
use crate::matcher::{format_datetime, MatcherRegistry, MatcherRepository};
use crate::percentage::{Murmur3PercentageCalculator, PercentageCalculator};
use crate::strategy::{
	RolloutStrategy, RolloutStrategyAttribute, RolloutStrategyAttributeConditional,
	RolloutStrategyFieldType,
};

/// Placeholder for a missing percentage attribute in a bucketing key.
const NO_ATTRIBUTE: &str = "<none>";

/// Outcome of [`ApplyFeature::apply`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Applied {
	pub matched: bool,
	pub value: Option<serde_json::Value>,
}

impl Applied {
	pub fn matched(value: Option<serde_json::Value>) -> Self {
		Self {
			matched: true,
			value,
		}
	}

	pub fn unmatched() -> Self {
		Self::default()
	}
}

#[derive(Clone)]
pub struct ApplyFeature {
	percentage_calculator: Arc<dyn PercentageCalculator>,
	matcher_repository: Arc<dyn MatcherRepository>,
}

impl Default for ApplyFeature {
	fn default() -> Self {
		Self::new(
			Arc::new(Murmur3PercentageCalculator),
			Arc::new(MatcherRegistry),
		)
	}
}

impl std::fmt::Debug for ApplyFeature {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ApplyFeature").finish_non_exhaustive()
	}
}

impl ApplyFeature {
	pub fn new(
		percentage_calculator: Arc<dyn PercentageCalculator>,
		matcher_repository: Arc<dyn MatcherRepository>,
	) -> Self {
		Self {
			percentage_calculator,
			matcher_repository,
		}
	}

	pub fn with_percentage_calculator(calculator: Arc<dyn PercentageCalculator>) -> Self {
		Self::new(calculator, Arc::new(MatcherRegistry))
	}

	pub fn apply(
		&self,
		strategies: &[RolloutStrategy],
		feature_key: &str,
		feature_value_id: &str,
		context: Option<&ContextAttributes>,
	) -> Applied {
		let Some(context) = context else {
			return Applied::unmatched();
		};
		if strategies.is_empty() {
			return Applied::unmatched();
		}

		let default_key = context.default_percentage_key();
		let mut base_percentage: HashMap<String, u32> = HashMap::new();
		let mut bucket: Option<(String, u32)> = None;

		for strategy in strategies {
			if strategy.percentage != 0
				&& (default_key.is_some() || !strategy.percentage_attributes.is_empty())
			{
				let key = percentage_key(context, &strategy.percentage_attributes);

				let percentage = match &bucket {
					Some((cached_key, value)) if *cached_key == key => *value,
					_ => {
						let value = self
							.percentage_calculator
							.determine_client_percentage(&key, feature_value_id);
						bucket = Some((key.clone(), value));
						value
					}
				};

				let base = base_percentage.entry(key).or_insert(0);
				let threshold = if strategy.has_attributes() {
					strategy.percentage
				} else {
					base.saturating_add(strategy.percentage)
				};

				if percentage <= threshold
					&& (!strategy.has_attributes() || self.match_attributes(context, strategy))
				{
					tracing::trace!(feature_key, strategy_id = %strategy.id, "percentage strategy matched");
					return Applied::matched(strategy.value.clone());
				}

				if !strategy.has_attributes() {
					*base = base.saturating_add(strategy.percentage);
				}
			}

			if strategy.percentage == 0
				&& strategy.has_attributes()
				&& self.match_attributes(context, strategy)
			{
				tracing::trace!(feature_key, strategy_id = %strategy.id, "attribute strategy matched");
				return Applied::matched(strategy.value.clone());
			}
		}

		Applied::unmatched()
	}

	fn match_attributes(&self, context: &ContextAttributes, strategy: &RolloutStrategy) -> bool {
		strategy
			.attributes
			.iter()
			.all(|attr| self.match_attribute(context, attr))
	}

	fn match_attribute(&self, context: &ContextAttributes, attr: &RolloutStrategyAttribute) -> bool {
		let supplied = context
			.get_attr(&attr.field_name)
			.map(str::to_string)
			.or_else(|| implicit_now(attr));

		match (&attr.values, supplied) {
			(None, None) => attr.conditional == RolloutStrategyAttributeConditional::Equals,
			(None, Some(_)) | (Some(_), None) => false,
			(Some(_), Some(supplied)) => self
				.matcher_repository
				.find_matcher(attr)
				.matches(&supplied, attr),
		}
	}
}

/// Attributes named `now` default to the current date or time.
fn implicit_now(attr: &RolloutStrategyAttribute) -> Option<String> {
	if !attr.field_name.eq_ignore_ascii_case("now") {
		return None;
	}

	let now = Utc::now();
	match attr.field_type {
		RolloutStrategyFieldType::Date => Some(now.format("%Y-%m-%d").to_string()),
		RolloutStrategyFieldType::Datetime => Some(format_datetime(&now)),
		_ => None,
	}
}

fn percentage_key(context: &ContextAttributes, percentage_attributes: &[String]) -> String {
	if percentage_attributes.is_empty() {
		return context
			.default_percentage_key()
			.unwrap_or(NO_ATTRIBUTE)
			.to_string();
	}

	percentage_attributes
		.iter()
		.map(|name| context.get_attr(name).unwrap_or(NO_ATTRIBUTE))
		.collect::<Vec<_>>()
		.join("$")
}


#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	proptest! {
		#[test]
		fn apply_is_deterministic(user in "[a-z0-9]{1,20}", pct in 0u32..=1_000_000) {
			let strategies = vec![RolloutStrategy::new("s").with_percentage(pct).with_value(json!(true))];
			let ctx = ContextAttributes::new().with_user_key(user);
			let apply = ApplyFeature::default();

			let first = apply.apply(&strategies, "f", "fv", Some(&ctx));
			let second = apply.apply(&strategies, "f", "fv", Some(&ctx));
			prop_assert_eq!(first, second);
		}

		#[test]
		fn full_percentage_always_matches(user in "[a-z0-9]{1,20}") {
			let strategies = vec![RolloutStrategy::new("s").with_percentage(MAX).with_value(json!(1))];
			let ctx = ContextAttributes::new().with_user_key(user);
			prop_assert!(ApplyFeature::default().apply(&strategies, "f", "fv", Some(&ctx)).matched);
		}
	}

	const MAX: u32 = crate::percentage::MAX_PERCENTAGE;
}
