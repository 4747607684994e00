// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-feature state holders.
//!
//! A [`FeatureStateHolder`] is a cheap handle. Every handle for a key shares
//! the same stored state and listener list; a handle may additionally carry a
//! context, which makes its getters evaluate rollout strategies.
//!
//! Getters resolve a value in this order:
//!
//! 1. A type mismatch between the stored feature and the getter yields `None`.
//! 2. A locked feature returns its stored value.
//! 3. The first value interceptor with an override wins.
//! 4. With a context, the first matching rollout strategy wins.
//! 5. Otherwise the stored value.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use featurehub_core::{
	Applied, ApplyFeature, ContextAttributes, FeatureState, FeatureValue, FeatureValueType,
	RolloutStrategy,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::interceptor::SharedInterceptor;

pub type FeatureListener = Arc<dyn Fn(&FeatureStateHolder) + Send + Sync>;

/// Handle returned when registering a listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Runs a host callback, containing any panic so remaining callbacks still run.
pub(crate) fn guarded<F: FnOnce()>(what: &'static str, f: F) {
	if catch_unwind(AssertUnwindSafe(f)).is_err() {
		warn!(listener = what, "listener panicked; continuing with remaining listeners");
	}
}

/// Evaluation collaborators shared by the repository and all of its holders.
pub(crate) struct EvaluationServices {
	interceptors: RwLock<Vec<SharedInterceptor>>,
	apply: ApplyFeature,
}

impl EvaluationServices {
	pub(crate) fn new(apply: ApplyFeature) -> Self {
		Self {
			interceptors: RwLock::new(Vec::new()),
			apply,
		}
	}

	pub(crate) fn add_interceptor(&self, interceptor: SharedInterceptor) {
		self.interceptors.write().push(interceptor);
	}

	/// First override offered for `key`.
	pub(crate) fn intercept(&self, key: &str, feature: Option<&FeatureState>) -> Option<String> {
		let interceptors = self.interceptors.read().clone();
		interceptors
			.iter()
			.find_map(|interceptor| interceptor.matched(key, feature).and_then(|m| m.value))
	}

	pub(crate) fn apply(
		&self,
		strategies: &[RolloutStrategy],
		key: &str,
		feature_value_id: &str,
		context: Option<&ContextAttributes>,
	) -> Applied {
		self.apply.apply(strategies, key, feature_value_id, context)
	}
}

enum Slot {
	Empty,
	Present(Arc<FeatureState>),
	Deleted { version: u64 },
}

impl Slot {
	/// Version/value rule. A deletion counts as a null value at its version.
	fn accepts(&self, incoming: &FeatureState) -> bool {
		match self {
			Slot::Empty => true,
			Slot::Present(stored) => stored.is_superseded_by(incoming),
			Slot::Deleted { version } => {
				incoming.version > *version
					|| (incoming.version == *version && incoming.value.is_some())
			}
		}
	}

	fn state(&self) -> Option<&Arc<FeatureState>> {
		match self {
			Slot::Present(state) => Some(state),
			_ => None,
		}
	}
}

struct RegisteredListener {
	id: ListenerId,
	listener: FeatureListener,
	context: Option<Arc<ContextAttributes>>,
}

struct HolderShared {
	slot: RwLock<Slot>,
	listeners: RwLock<Vec<RegisteredListener>>,
	next_listener_id: AtomicU64,
}

#[derive(Clone)]
pub struct FeatureStateHolder {
	key: Arc<str>,
	shared: Arc<HolderShared>,
	services: Arc<EvaluationServices>,
	context: Option<Arc<ContextAttributes>>,
}

impl fmt::Debug for FeatureStateHolder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FeatureStateHolder")
			.field("key", &self.key)
			.field("state", &self.feature_state())
			.field("context", &self.context)
			.finish()
	}
}

impl FeatureStateHolder {
	pub(crate) fn new(key: &str, services: Arc<EvaluationServices>) -> Self {
		Self {
			key: Arc::from(key),
			shared: Arc::new(HolderShared {
				slot: RwLock::new(Slot::Empty),
				listeners: RwLock::new(Vec::new()),
				next_listener_id: AtomicU64::new(0),
			}),
			services,
			context: None,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// A snapshot of the stored state. Never partially updated.
	pub fn feature_state(&self) -> Option<Arc<FeatureState>> {
		self.shared.slot.read().state().cloned()
	}

	/// True once Edge has sent this feature and it has not been deleted.
	pub fn exists(&self) -> bool {
		self.feature_state().is_some()
	}

	/// Whether the stored base value is present. Ignores context and interceptors.
	pub fn is_set(&self) -> bool {
		self.feature_state().is_some_and(|s| s.value.is_some())
	}

	pub fn is_locked(&self) -> bool {
		self.feature_state().is_some_and(|s| s.locked)
	}

	pub fn version(&self) -> Option<u64> {
		self.feature_state().map(|s| s.version)
	}

	pub fn value_type(&self) -> Option<FeatureValueType> {
		self.feature_state().map(|s| s.value_type)
	}

	pub fn id(&self) -> Option<String> {
		self.feature_state().map(|s| s.id.clone())
	}

	pub fn context(&self) -> Option<&ContextAttributes> {
		self.context.as_deref()
	}

	/// A handle on the same feature that evaluates against `context`.
	pub fn with_context(&self, context: impl Into<Arc<ContextAttributes>>) -> Self {
		Self {
			context: Some(context.into()),
			..self.clone()
		}
	}

	pub fn get_boolean(&self) -> Option<bool> {
		self.resolve(FeatureValueType::Boolean)
			.and_then(|v| v.as_bool())
	}

	pub fn get_flag(&self) -> Option<bool> {
		self.get_boolean()
	}

	pub fn is_enabled(&self) -> bool {
		self.get_boolean() == Some(true)
	}

	pub fn get_string(&self) -> Option<String> {
		self.resolve(FeatureValueType::String)
			.and_then(|v| v.as_str().map(str::to_string))
	}

	pub fn get_number(&self) -> Option<f64> {
		self.resolve(FeatureValueType::Number)
			.and_then(|v| v.as_f64())
	}

	pub fn get_raw_json(&self) -> Option<String> {
		self.resolve(FeatureValueType::Json)
			.and_then(|v| v.as_raw_json().map(str::to_string))
	}

	pub fn get_json(&self) -> Option<serde_json::Value> {
		let raw = self.get_raw_json()?;
		match serde_json::from_str(&raw) {
			Ok(value) => Some(value),
			Err(e) => {
				debug!(key = %self.key, error = %e, "feature value is not valid JSON");
				None
			}
		}
	}

	/// The resolved value of the feature's declared type.
	pub fn value(&self) -> Option<FeatureValue> {
		let value_type = self.value_type()?;
		self.resolve(value_type)
	}

	fn resolve(&self, value_type: FeatureValueType) -> Option<FeatureValue> {
		let state = self.feature_state();

		if let Some(state) = &state {
			if state.value_type != value_type {
				return None;
			}
			if state.locked {
				return state.value.clone();
			}
		}

		if let Some(raw) = self.services.intercept(&self.key, state.as_deref()) {
			if let Some(value) = FeatureValue::coerce(value_type, &raw) {
				return Some(value);
			}
			debug!(key = %self.key, value_type = %value_type, "interceptor value does not coerce");
		}

		let state = state?;

		if let Some(context) = &self.context {
			let applied = self
				.services
				.apply(&state.strategies, &self.key, &state.id, Some(context));
			if applied.matched {
				return applied
					.value
					.as_ref()
					.and_then(|v| FeatureValue::from_json(value_type, v).ok().flatten());
			}
		}

		state.value.clone()
	}

	/// Registers a listener fired when the lock flag or value changes.
	///
	/// A listener registered through a context handle receives a handle with
	/// that context.
	pub fn add_listener<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&FeatureStateHolder) + Send + Sync + 'static,
	{
		let id = ListenerId(self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed));
		self.shared.listeners.write().push(RegisteredListener {
			id,
			listener: Arc::new(listener),
			context: self.context.clone(),
		});
		id
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		let mut listeners = self.shared.listeners.write();
		let before = listeners.len();
		listeners.retain(|l| l.id != id);
		listeners.len() != before
	}

	pub(crate) fn would_accept(&self, incoming: &FeatureState) -> bool {
		self.shared.slot.read().accepts(incoming)
	}

	/// Stores `incoming` if it supersedes the current state. Returns whether it
	/// was stored.
	pub(crate) fn set_feature_state(&self, incoming: FeatureState) -> bool {
		let changed = {
			let mut slot = self.shared.slot.write();
			if !slot.accepts(&incoming) {
				debug!(
					key = %self.key,
					version = incoming.version,
					"dropping stale feature update"
				);
				return false;
			}

			let changed = match slot.state() {
				Some(stored) => stored.locked != incoming.locked || stored.value != incoming.value,
				None => incoming.locked || incoming.value.is_some(),
			};
			*slot = Slot::Present(Arc::new(incoming));
			changed
		};

		if changed {
			self.trigger_listeners();
		}
		true
	}

	/// Removes the feature. `version` defaults to the stored version.
	pub(crate) fn delete(&self, version: Option<u64>) -> bool {
		let changed = {
			let mut slot = self.shared.slot.write();
			let Some(stored) = slot.state() else {
				return false;
			};

			let version = version.unwrap_or(stored.version);
			let accepted =
				version > stored.version || (version == stored.version && stored.value.is_some());
			if !accepted {
				debug!(key = %self.key, version, "dropping stale delete");
				return false;
			}

			let changed = stored.value.is_some() || stored.locked;
			*slot = Slot::Deleted { version };
			changed
		};

		if changed {
			self.trigger_listeners();
		}
		true
	}

	fn trigger_listeners(&self) {
		let listeners: Vec<(FeatureListener, Option<Arc<ContextAttributes>>)> = self
			.shared
			.listeners
			.read()
			.iter()
			.map(|l| (Arc::clone(&l.listener), l.context.clone()))
			.collect();

		for (listener, context) in listeners {
			let holder = Self {
				context,
				..self.clone()
			};
			guarded("feature", || listener(&holder));
		}
	}
}
