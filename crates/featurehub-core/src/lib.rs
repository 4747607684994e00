// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types and evaluation for the FeatureHub client SDK.
//!
//! This crate has no I/O. It provides:
//! - The wire model Edge delivers (features, rollout strategies, events)
//! - Context attributes and the canonical context header
//! - Deterministic murmur3 percentage bucketing
//! - Attribute matchers for every strategy field type
//! - [`ApplyFeature`], which picks the first matching rollout strategy
//!
//! # Example
//!
//! ```
//! use featurehub_core::{ApplyFeature, ContextAttributes, RolloutStrategy};
//! use serde_json::json;
//!
//! let strategies = vec![RolloutStrategy::new("everyone").with_percentage(1_000_000).with_value(json!(true))];
//! let ctx = ContextAttributes::new().with_user_key("fred");
//!
//! let applied = ApplyFeature::default().apply(&strategies, "new_ui", "fv-1", Some(&ctx));
//! assert!(applied.matched);
//! assert_eq!(applied.value, Some(json!(true)));
//! ```

pub mod apply;
pub mod context;
pub mod error;
pub mod event;
pub mod feature;
pub mod matcher;
pub mod percentage;
pub mod strategy;

pub use apply::{Applied, ApplyFeature};
pub use context::{
	encode_component, ContextAttributes, StrategyAttributeDeviceName, StrategyAttributePlatformName,
};
pub use error::{CoreError, Result};
pub use event::{decode_features, DeletedFeature, EdgeEvent, Environment, SseResultState};
pub use feature::{FeatureState, FeatureValue, FeatureValueType};
pub use matcher::{MatcherRegistry, MatcherRepository, StrategyMatcher};
pub use percentage::{Murmur3PercentageCalculator, PercentageCalculator, MAX_PERCENTAGE};
pub use strategy::{
	RolloutStrategy, RolloutStrategyAttribute, RolloutStrategyAttributeConditional,
	RolloutStrategyFieldType,
};

#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	fn boolean_state(version: u64, value: bool) -> FeatureState {
		FeatureState::new("1", "flag", FeatureValueType::Boolean)
			.with_version(version)
			.with_value(FeatureValue::Boolean(value))
	}

	proptest! {
		#[test]
		fn accepted_versions_never_decrease(updates in prop::collection::vec((0u64..20, any::<bool>()), 1..40)) {
			let mut stored: Option<FeatureState> = None;
			let mut last_version = 0u64;

			for (version, value) in updates {
				let incoming = boolean_state(version, value);
				let accept = stored.as_ref().map_or(true, |s| s.is_superseded_by(&incoming));
				if accept {
					if stored.is_some() {
						prop_assert!(version >= last_version);
					}
					last_version = version;
					stored = Some(incoming);
				}
			}
		}

		#[test]
		fn identical_update_is_never_accepted(version in 0u64..1000, value in any::<bool>()) {
			let stored = boolean_state(version, value);
			prop_assert!(!stored.is_superseded_by(&stored.clone()));
		}

		#[test]
		fn header_is_order_independent(pairs in prop::collection::btree_map("[a-z]{1,8}", "[a-zA-Z0-9 ,@]{0,12}", 0..8)) {
			let forward = pairs.iter().fold(ContextAttributes::new(), |ctx, (k, v)| ctx.with_attr(k.clone(), v.clone()));
			let backward = pairs.iter().rev().fold(ContextAttributes::new(), |ctx, (k, v)| ctx.with_attr(k.clone(), v.clone()));
			prop_assert_eq!(forward.header(), backward.header());
		}
	}
}
