// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Value interceptors.
//!
//! An interceptor can replace the value of any unlocked feature. Interceptors
//! are consulted in registration order and the first one that returns a value
//! wins. Overrides are text and are coerced into the type being read.

use std::sync::Arc;

use featurehub_common_config::load_env;
use featurehub_core::FeatureState;
use tracing::warn;

/// Environment variable that enables [`EnvironmentInterceptor`].
pub const OVERRIDE_FEATURES_VAR: &str = "FEATUREHUB_OVERRIDE_FEATURES";

/// A textual override for a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorValueMatch {
	pub value: Option<String>,
}

impl InterceptorValueMatch {
	pub fn new(value: impl Into<String>) -> Self {
		Self {
			value: Some(value.into()),
		}
	}
}

pub trait FeatureValueInterceptor: Send + Sync {
	/// Returns an override for `key`. `feature` is the current state, if any.
	fn matched(&self, key: &str, feature: Option<&FeatureState>) -> Option<InterceptorValueMatch>;
}

pub type SharedInterceptor = Arc<dyn FeatureValueInterceptor>;

impl<F> FeatureValueInterceptor for F
where
	F: Fn(&str, Option<&FeatureState>) -> Option<InterceptorValueMatch> + Send + Sync,
{
	fn matched(&self, key: &str, feature: Option<&FeatureState>) -> Option<InterceptorValueMatch> {
		self(key, feature)
	}
}

/// Overrides features from `FEATUREHUB_<KEY>` environment variables.
///
/// Only active while `FEATUREHUB_OVERRIDE_FEATURES` is set, so a stray
/// variable cannot flip flags in production. The key is upper-cased and every
/// character that is not ASCII alphanumeric becomes `_`. Each variable may
/// also be supplied through its `_FILE` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentInterceptor;

impl EnvironmentInterceptor {
	pub fn new() -> Self {
		Self
	}

	pub fn variable_name(key: &str) -> String {
		let mapped: String = key
			.chars()
			.map(|c| {
				if c.is_ascii_alphanumeric() {
					c.to_ascii_uppercase()
				} else {
					'_'
				}
			})
			.collect();
		format!("FEATUREHUB_{mapped}")
	}
}

impl FeatureValueInterceptor for EnvironmentInterceptor {
	fn matched(&self, key: &str, _feature: Option<&FeatureState>) -> Option<InterceptorValueMatch> {
		read_setting(OVERRIDE_FEATURES_VAR)?;
		read_setting(&Self::variable_name(key)).map(InterceptorValueMatch::new)
	}
}

/// An unreadable setting counts as unset.
fn read_setting(var: &str) -> Option<String> {
	load_env(var).unwrap_or_else(|e| {
		warn!(var, error = %e, "ignoring unreadable override");
		None
	})
}
