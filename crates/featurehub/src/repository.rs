// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The client-side feature repository.
//!
//! The repository is the single sink for Edge events. It owns one
//! [`FeatureStateHolder`] per feature key and tracks readiness:
//!
//! ```text
//! NotReady --features--> Ready --failure--> Failed --features--> Ready
//!     ^                    |
//!     +---- not_ready() ---+
//! ```
//!
//! In catch-and-release mode, updates after the initial batch are buffered
//! until [`ClientFeatureRepository::release`] is called, so a host can choose
//! when flag flips become visible.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use featurehub_core::{
	Applied, ApplyFeature, ContextAttributes, DeletedFeature, EdgeEvent, FeatureState,
	RolloutStrategy,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsCollector, AnalyticsEvent, FeatureSnapshot, SharedAnalyticsCollector};
use crate::holder::{guarded, EvaluationServices, FeatureStateHolder};
use crate::interceptor::FeatureValueInterceptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Readyness {
	NotReady,
	Ready,
	Failed,
}

impl fmt::Display for Readyness {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Readyness::NotReady => "NotReady",
			Readyness::Ready => "Ready",
			Readyness::Failed => "Failed",
		})
	}
}

pub type ReadynessListener = Arc<dyn Fn(Readyness) + Send + Sync>;
pub type NewStateListener = Arc<dyn Fn(&ClientFeatureRepository) + Send + Sync>;

#[derive(Debug, Clone)]
enum PendingUpdate {
	Upsert(FeatureState),
	Delete(DeletedFeature),
}

impl PendingUpdate {
	fn id(&self) -> &str {
		let (id, key) = match self {
			PendingUpdate::Upsert(state) => (&state.id, &state.key),
			PendingUpdate::Delete(deleted) => (&deleted.id, &deleted.key),
		};
		if id.is_empty() {
			key
		} else {
			id
		}
	}

	fn version(&self) -> Option<u64> {
		match self {
			PendingUpdate::Upsert(state) => Some(state.version),
			PendingUpdate::Delete(deleted) => deleted.version,
		}
	}
}

struct RepositoryState {
	readyness: Readyness,
	has_received_initial_state: bool,
	catch_and_release: bool,
	/// Buffered updates in arrival order, at most one per feature id.
	pending: Vec<PendingUpdate>,
}

pub struct ClientFeatureRepository {
	features: RwLock<HashMap<String, FeatureStateHolder>>,
	services: Arc<EvaluationServices>,
	state: Mutex<RepositoryState>,
	readyness_listeners: RwLock<Vec<ReadynessListener>>,
	new_state_listeners: RwLock<Vec<NewStateListener>>,
	analytics_collectors: RwLock<Vec<SharedAnalyticsCollector>>,
}

impl fmt::Debug for ClientFeatureRepository {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let features = self.features.read().len();
		let state = self.state.lock();
		f.debug_struct("ClientFeatureRepository")
			.field("features", &features)
			.field("readyness", &state.readyness)
			.field("catch_and_release", &state.catch_and_release)
			.field("pending", &state.pending.len())
			.finish()
	}
}

impl Default for ClientFeatureRepository {
	fn default() -> Self {
		Self::new()
	}
}

impl ClientFeatureRepository {
	pub fn new() -> Self {
		Self::with_apply_feature(ApplyFeature::default())
	}

	/// Uses a custom strategy evaluator, e.g. with a stubbed percentage calculator.
	pub fn with_apply_feature(apply: ApplyFeature) -> Self {
		Self {
			features: RwLock::new(HashMap::new()),
			services: Arc::new(EvaluationServices::new(apply)),
			state: Mutex::new(RepositoryState {
				readyness: Readyness::NotReady,
				has_received_initial_state: false,
				catch_and_release: false,
				pending: Vec::new(),
			}),
			readyness_listeners: RwLock::new(Vec::new()),
			new_state_listeners: RwLock::new(Vec::new()),
			analytics_collectors: RwLock::new(Vec::new()),
		}
	}

	pub fn readyness(&self) -> Readyness {
		self.state.lock().readyness
	}

	pub fn is_ready(&self) -> bool {
		self.readyness() == Readyness::Ready
	}

	/// Decodes and applies a raw Edge event. Malformed events are logged and dropped.
	pub fn notify_raw(&self, kind: &str, data: &str) {
		match EdgeEvent::decode(kind, data) {
			Ok(event) => self.notify(event),
			Err(e) => warn!(kind, error = %e, "dropping malformed Edge event"),
		}
	}

	pub fn notify(&self, event: EdgeEvent) {
		debug!(kind = %event.kind(), "processing Edge event");

		match event {
			EdgeEvent::Ack | EdgeEvent::Config(_) => {}
			EdgeEvent::Bye => {
				debug!("Edge said bye; readiness unchanged until reconnect");
			}
			EdgeEvent::Failure => self.set_readyness(Readyness::Failed),
			EdgeEvent::Feature(feature) => {
				if self.catch_and_release_mode() {
					self.catch_updates(vec![PendingUpdate::Upsert(feature)]);
				} else if self.feature_update(feature) {
					self.trigger_new_state_available();
				}
			}
			EdgeEvent::Features(features) => self.features_batch(features),
			EdgeEvent::DeleteFeature(deleted) => {
				if self.catch_and_release_mode() {
					self.catch_updates(vec![PendingUpdate::Delete(deleted)]);
				} else {
					self.delete_feature(deleted);
				}
			}
		}
	}

	fn features_batch(&self, features: Vec<FeatureState>) {
		let catching = {
			let state = self.state.lock();
			state.has_received_initial_state && state.catch_and_release
		};

		if catching {
			self.catch_updates(features.into_iter().map(PendingUpdate::Upsert).collect());
			return;
		}

		let count = features.len();
		let mut updated = false;
		for feature in features {
			updated |= self.feature_update(feature);
		}

		let first = {
			let mut state = self.state.lock();
			let first = !state.has_received_initial_state;
			state.has_received_initial_state = true;
			first
		};

		if first {
			info!(features = count, "received initial feature state");
		}
		self.set_readyness(Readyness::Ready);

		if !first && updated {
			self.trigger_new_state_available();
		}
	}

	fn feature_update(&self, feature: FeatureState) -> bool {
		if feature.key.is_empty() {
			warn!(id = %feature.id, "ignoring feature without a key");
			return false;
		}

		self.feature(&feature.key).set_feature_state(feature)
	}

	fn delete_feature(&self, deleted: DeletedFeature) -> bool {
		let holder = self.features.read().get(&deleted.key).cloned();
		match holder {
			Some(holder) => holder.delete(deleted.version),
			None => {
				debug!(key = %deleted.key, "ignoring delete of unknown feature");
				false
			}
		}
	}

	/// Buffers updates that would change state. Notifies once if any were kept.
	fn catch_updates(&self, updates: Vec<PendingUpdate>) {
		let mut caught = false;

		{
			let features = self.features.read();
			let mut state = self.state.lock();

			for update in updates {
				let relevant = match &update {
					PendingUpdate::Upsert(feature) => features
						.get(&feature.key)
						.map_or(true, |holder| holder.would_accept(feature)),
					PendingUpdate::Delete(deleted) => features
						.get(&deleted.key)
						.is_some_and(FeatureStateHolder::exists),
				};
				if !relevant {
					continue;
				}

				match state.pending.iter().position(|p| p.id() == update.id()) {
					Some(index) => {
						let newer = match (state.pending[index].version(), update.version()) {
							(Some(buffered), Some(incoming)) => incoming >= buffered,
							_ => true,
						};
						if newer {
							state.pending[index] = update;
							caught = true;
						}
					}
					None => {
						state.pending.push(update);
						caught = true;
					}
				}
			}
		}

		if caught {
			debug!("buffered feature updates for release");
			self.trigger_new_state_available();
		}
	}

	fn trigger_new_state_available(&self) {
		{
			let state = self.state.lock();
			if !state.has_received_initial_state
				|| (state.catch_and_release && state.pending.is_empty())
			{
				return;
			}
		}

		let listeners = self.new_state_listeners.read().clone();
		for listener in listeners {
			guarded("new_state", || listener(self));
		}
	}

	fn set_readyness(&self, readyness: Readyness) {
		{
			let mut state = self.state.lock();
			if state.readyness == readyness {
				return;
			}
			state.readyness = readyness;
		}

		info!(readyness = %readyness, "repository readiness changed");
		self.broadcast_readyness(readyness);
	}

	fn broadcast_readyness(&self, readyness: Readyness) {
		let listeners = self.readyness_listeners.read().clone();
		for listener in listeners {
			guarded("readyness", || listener(readyness));
		}
	}

	/// Forces `NotReady` and notifies readiness listeners, whatever the current state.
	pub fn not_ready(&self) {
		self.state.lock().readyness = Readyness::NotReady;
		self.broadcast_readyness(Readyness::NotReady);
	}

	pub fn catch_and_release_mode(&self) -> bool {
		self.state.lock().catch_and_release
	}

	/// Turning the mode off releases anything buffered first.
	pub fn set_catch_and_release_mode(&self, enabled: bool) {
		let was_enabled = self.catch_and_release_mode();
		if was_enabled && !enabled {
			self.release();
		}
		self.state.lock().catch_and_release = enabled;
	}

	/// Applies every buffered update through the normal version rules.
	pub fn release(&self) {
		loop {
			let pending = std::mem::take(&mut self.state.lock().pending);
			if pending.is_empty() {
				break;
			}

			debug!(updates = pending.len(), "releasing buffered feature updates");
			for update in pending {
				match update {
					PendingUpdate::Upsert(feature) => {
						self.feature_update(feature);
					}
					PendingUpdate::Delete(deleted) => {
						self.delete_feature(deleted);
					}
				}
			}
		}
	}

	/// Registers a listener and immediately calls it with the current state.
	pub fn add_readyness_listener<F>(&self, listener: F)
	where
		F: Fn(Readyness) + Send + Sync + 'static,
	{
		let listener: ReadynessListener = Arc::new(listener);
		self.readyness_listeners.write().push(Arc::clone(&listener));
		let current = self.readyness();
		guarded("readyness", || listener(current));
	}

	/// Registers a listener for new state arriving after the initial batch.
	///
	/// Called immediately if updates are already waiting to be released.
	pub fn add_post_load_new_state_listener<F>(&self, listener: F)
	where
		F: Fn(&ClientFeatureRepository) + Send + Sync + 'static,
	{
		let listener: NewStateListener = Arc::new(listener);
		self.new_state_listeners.write().push(Arc::clone(&listener));
		if !self.state.lock().pending.is_empty() {
			guarded("new_state", || listener(self));
		}
	}

	pub fn add_value_interceptor<I>(&self, interceptor: I)
	where
		I: FeatureValueInterceptor + 'static,
	{
		self.services.add_interceptor(Arc::new(interceptor));
	}

	pub fn add_analytics_collector<C: AnalyticsCollector>(&self, collector: C) {
		self.analytics_collectors.write().push(Arc::new(collector));
	}

	/// The holder for `key`, created empty if Edge has not sent it yet so
	/// listeners can be attached early.
	pub fn feature(&self, key: &str) -> FeatureStateHolder {
		if let Some(holder) = self.features.read().get(key) {
			return holder.clone();
		}

		self.features
			.write()
			.entry(key.to_string())
			.or_insert_with(|| FeatureStateHolder::new(key, Arc::clone(&self.services)))
			.clone()
	}

	/// The holder for `key` only if the feature currently exists.
	pub fn has_feature(&self, key: &str) -> Option<FeatureStateHolder> {
		self.features
			.read()
			.get(key)
			.filter(|holder| holder.exists())
			.cloned()
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

	pub fn apply(
		&self,
		strategies: &[RolloutStrategy],
		key: &str,
		feature_value_id: &str,
		context: Option<&ContextAttributes>,
	) -> Applied {
		self.services.apply(strategies, key, feature_value_id, context)
	}

	/// Current values of every existing feature as text, for baggage propagation.
	///
	/// Interceptors apply; contexts do not.
	pub fn simple_features(&self) -> BTreeMap<String, Option<String>> {
		self.holders()
			.into_iter()
			.filter(FeatureStateHolder::exists)
			.map(|holder| {
				let value = holder.value().map(|v| v.to_string());
				(holder.key().to_string(), value)
			})
			.collect()
	}

	/// Snapshots every feature with a value and hands it to each collector.
	pub async fn log_analytics_event(
		&self,
		action: &str,
		other: HashMap<String, String>,
		context: Option<&ContextAttributes>,
	) {
		let context = context.map(|c| Arc::new(c.clone()));
		let mut features: Vec<FeatureSnapshot> = self
			.holders()
			.into_iter()
			.filter(FeatureStateHolder::is_set)
			.filter_map(|holder| {
				let holder = match &context {
					Some(ctx) => holder.with_context(Arc::clone(ctx)),
					None => holder,
				};
				let state = holder.feature_state()?;
				let value = holder.value()?;
				Some(FeatureSnapshot::new(holder.key(), &state.id, state.version, &value))
			})
			.collect();
		features.sort_by(|a, b| a.key.cmp(&b.key));

		let event = AnalyticsEvent::new(action, other, features);
		let collectors = self.analytics_collectors.read().clone();
		debug!(action, collectors = collectors.len(), "logging analytics event");

		for collector in collectors {
			collector.log_event(&event).await;
		}
	}

	fn holders(&self) -> Vec<FeatureStateHolder> {
		self.features.read().values().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use featurehub_core::{FeatureValue, FeatureValueType, MatcherRegistry, PercentageCalculator};
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn banana(version: u64, value: bool) -> FeatureState {
		FeatureState::new("1", "banana", FeatureValueType::Boolean)
			.with_version(version)
			.with_value(FeatureValue::Boolean(value))
	}

	fn ready_repo() -> ClientFeatureRepository {
		let repo = ClientFeatureRepository::new();
		repo.notify(EdgeEvent::Features(vec![banana(1, true)]));
		repo
	}

	fn readyness_log(repo: &ClientFeatureRepository) -> Arc<Mutex<Vec<Readyness>>> {
		let log = Arc::new(Mutex::new(Vec::new()));
		let l = Arc::clone(&log);
		repo.add_readyness_listener(move |r| l.lock().push(r));
		log
	}

	fn new_state_counter(repo: &ClientFeatureRepository) -> Arc<AtomicUsize> {
		let count = Arc::new(AtomicUsize::new(0));
		let c = Arc::clone(&count);
		repo.add_post_load_new_state_listener(move |_| {
			c.fetch_add(1, Ordering::SeqCst);
		});
		count
	}

	#[test]
	fn feature_update_after_initial_batch() {
		let repo = ready_repo();
		assert_eq!(repo.get_boolean("banana"), Some(true));

		let fired = Arc::new(AtomicUsize::new(0));
		let f = Arc::clone(&fired);
		repo.feature("banana").add_listener(move |_| {
			f.fetch_add(1, Ordering::SeqCst);
		});

		repo.notify_raw(
			"feature",
			r#"{"id":"1","key":"banana","version":2,"type":"BOOLEAN","value":false}"#,
		);

		assert_eq!(repo.get_boolean("banana"), Some(false));
		assert_eq!(fired.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn delete_unsets_feature() {
		let repo = ready_repo();
		repo.notify_raw("delete_feature", r#"{"id":"1","key":"banana"}"#);

		assert!(!repo.is_set("banana"));
		assert_eq!(repo.get_boolean("banana"), None);
		assert!(repo.has_feature("banana").is_none());
	}

	#[test]
	fn delete_of_unknown_feature_is_ignored() {
		let repo = ready_repo();
		repo.notify(EdgeEvent::DeleteFeature(DeletedFeature {
			id: "9".into(),
			key: "ghost".into(),
			version: None,
		}));
		assert!(repo.has_feature("ghost").is_none());
		assert!(repo.is_set("banana"));
	}

	#[test]
	fn readiness_transitions() {
		let repo = ClientFeatureRepository::new();
		let log = readyness_log(&repo);
		assert_eq!(repo.readyness(), Readyness::NotReady);

		repo.notify(EdgeEvent::Features(vec![banana(1, true)]));
		assert_eq!(repo.readyness(), Readyness::Ready);

		repo.notify(EdgeEvent::Failure);
		assert_eq!(repo.readyness(), Readyness::Failed);

		repo.notify(EdgeEvent::Features(vec![banana(1, true)]));
		assert_eq!(repo.readyness(), Readyness::Ready);

		repo.not_ready();
		assert_eq!(repo.readyness(), Readyness::NotReady);

		assert_eq!(
			*log.lock(),
			vec![
				Readyness::NotReady,
				Readyness::Ready,
				Readyness::Failed,
				Readyness::Ready,
				Readyness::NotReady,
			]
		);
	}

	#[test]
	fn bye_and_ack_leave_readiness_alone() {
		let repo = ready_repo();
		let log = readyness_log(&repo);

		repo.notify(EdgeEvent::Bye);
		repo.notify(EdgeEvent::Ack);

		assert_eq!(repo.readyness(), Readyness::Ready);
		assert_eq!(*log.lock(), vec![Readyness::Ready]);
	}

	#[test]
	fn not_ready_always_notifies() {
		let repo = ClientFeatureRepository::new();
		let log = readyness_log(&repo);

		repo.not_ready();
		repo.not_ready();

		assert_eq!(log.lock().len(), 3);
	}

	#[test]
	fn late_readiness_listener_gets_replay() {
		let repo = ready_repo();
		let log = readyness_log(&repo);
		assert_eq!(*log.lock(), vec![Readyness::Ready]);
	}

	#[test]
	fn malformed_events_are_dropped() {
		let repo = ready_repo();
		repo.notify_raw("feature", "{broken");
		repo.notify_raw("mystery", "{}");

		assert_eq!(repo.get_boolean("banana"), Some(true));
		assert_eq!(repo.readyness(), Readyness::Ready);
	}

	#[test]
	fn new_state_fires_for_updates_after_initial_batch() {
		let repo = ClientFeatureRepository::new();
		let count = new_state_counter(&repo);

		repo.notify(EdgeEvent::Features(vec![banana(1, true)]));
		assert_eq!(count.load(Ordering::SeqCst), 0);

		repo.notify(EdgeEvent::Feature(banana(2, false)));
		assert_eq!(count.load(Ordering::SeqCst), 1);

		repo.notify(EdgeEvent::Feature(banana(2, false)));
		assert_eq!(count.load(Ordering::SeqCst), 1);

		repo.notify(EdgeEvent::Features(vec![banana(3, true)]));
		assert_eq!(count.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn catch_and_release_buffers_until_release() {
		let repo = ready_repo();
		let count = new_state_counter(&repo);
		repo.set_catch_and_release_mode(true);

		repo.notify(EdgeEvent::Feature(banana(2, false)));
		repo.notify(EdgeEvent::Feature(banana(3, true)));
		repo.notify(EdgeEvent::Feature(banana(4, false)));

		assert_eq!(repo.get_boolean("banana"), Some(true));
		assert_eq!(count.load(Ordering::SeqCst), 3);

		repo.release();
		assert_eq!(repo.get_boolean("banana"), Some(false));
		assert_eq!(repo.feature("banana").version(), Some(4));
	}

	#[test]
	fn catch_and_release_batch_notifies_once() {
		let repo = ready_repo();
		let count = new_state_counter(&repo);
		repo.set_catch_and_release_mode(true);

		let apple = FeatureState::new("2", "apple", FeatureValueType::String)
			.with_version(1)
			.with_value(FeatureValue::String("green".into()));
		repo.notify(EdgeEvent::Features(vec![banana(2, false), apple]));

		assert_eq!(count.load(Ordering::SeqCst), 1);
		assert_eq!(repo.get_string("apple"), None);

		repo.release();
		assert_eq!(repo.get_string("apple").as_deref(), Some("green"));
	}

	#[test]
	fn buffered_older_version_does_not_replace_newer() {
		let repo = ready_repo();
		repo.set_catch_and_release_mode(true);

		repo.notify(EdgeEvent::Feature(banana(5, false)));
		repo.notify(EdgeEvent::Feature(banana(3, true)));
		repo.release();

		assert_eq!(repo.feature("banana").version(), Some(5));
		assert_eq!(repo.get_boolean("banana"), Some(false));
	}

	#[test]
	fn stale_updates_are_not_buffered() {
		let repo = ready_repo();
		let count = new_state_counter(&repo);
		repo.set_catch_and_release_mode(true);

		repo.notify(EdgeEvent::Feature(banana(1, true)));
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn deletes_are_buffered_too() {
		let repo = ready_repo();
		repo.set_catch_and_release_mode(true);

		repo.notify(EdgeEvent::DeleteFeature(DeletedFeature {
			id: "1".into(),
			key: "banana".into(),
			version: None,
		}));
		assert!(repo.is_set("banana"));

		repo.release();
		assert!(!repo.is_set("banana"));
	}

	#[test]
	fn disabling_catch_and_release_releases() {
		let repo = ready_repo();
		repo.set_catch_and_release_mode(true);
		repo.notify(EdgeEvent::Feature(banana(2, false)));

		repo.set_catch_and_release_mode(false);
		assert!(!repo.catch_and_release_mode());
		assert_eq!(repo.get_boolean("banana"), Some(false));
	}

	#[test]
	fn disabling_with_empty_buffer_is_a_no_op() {
		let repo = ready_repo();
		let count = new_state_counter(&repo);

		repo.set_catch_and_release_mode(true);
		repo.set_catch_and_release_mode(false);

		assert_eq!(count.load(Ordering::SeqCst), 0);
		assert_eq!(repo.get_boolean("banana"), Some(true));
	}

	#[test]
	fn initial_batch_is_applied_even_when_catching() {
		let repo = ClientFeatureRepository::new();
		repo.set_catch_and_release_mode(true);
		repo.notify(EdgeEvent::Features(vec![banana(1, true)]));

		assert_eq!(repo.get_boolean("banana"), Some(true));
		assert!(repo.is_ready());
	}

	#[test]
	fn post_load_listener_fires_immediately_when_buffer_waiting() {
		let repo = ready_repo();
		repo.set_catch_and_release_mode(true);
		repo.notify(EdgeEvent::Feature(banana(2, false)));

		let count = new_state_counter(&repo);
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn panicking_readiness_listener_does_not_block_others() {
		let repo = ClientFeatureRepository::new();
		repo.add_readyness_listener(|r| {
			if r == Readyness::Ready {
				panic!("host failure");
			}
		});
		let log = readyness_log(&repo);

		repo.notify(EdgeEvent::Features(vec![banana(1, true)]));
		assert_eq!(*log.lock(), vec![Readyness::NotReady, Readyness::Ready]);
	}

	#[test]
	fn locked_feature_ignores_interceptor() {
		let repo = ClientFeatureRepository::new();
		repo.add_value_interceptor(|key: &str, _: Option<&FeatureState>| {
			(key == "banana").then(|| crate::InterceptorValueMatch::new("false"))
		});

		repo.notify(EdgeEvent::Features(vec![banana(1, true).with_locked(true)]));
		assert_eq!(repo.get_boolean("banana"), Some(true));

		repo.notify(EdgeEvent::Feature(banana(2, true)));
		assert_eq!(repo.get_boolean("banana"), Some(false));
	}

	#[test]
	fn simple_features_renders_values() {
		let repo = ClientFeatureRepository::new();
		repo.notify(EdgeEvent::Features(vec![
			banana(1, true),
			FeatureState::new("2", "limit", FeatureValueType::Number)
				.with_version(1)
				.with_value(FeatureValue::Number(17.0)),
			FeatureState::new("3", "colour", FeatureValueType::String).with_version(1),
		]));

		let simple = repo.simple_features();
		assert_eq!(simple.get("banana"), Some(&Some("true".to_string())));
		assert_eq!(simple.get("limit"), Some(&Some("17".to_string())));
		assert_eq!(simple.get("colour"), Some(&None));
	}

	struct FixedBucket(u32);

	impl PercentageCalculator for FixedBucket {
		fn determine_client_percentage(&self, _: &str, _: &str) -> u32 {
			self.0
		}
	}

	#[test]
	fn stubbed_calculator_drives_percentage_strategy() {
		let strategies = vec![RolloutStrategy::new("s").with_percentage(20).with_value(json!(true))];
		let ctx = ContextAttributes::new().with_user_key("userkey");

		let repo = ClientFeatureRepository::with_apply_feature(ApplyFeature::new(
			Arc::new(FixedBucket(15)),
			Arc::new(MatcherRegistry),
		));
		assert!(repo.apply(&strategies, "f", "id", Some(&ctx)).matched);

		let repo = ClientFeatureRepository::with_apply_feature(ApplyFeature::new(
			Arc::new(FixedBucket(21)),
			Arc::new(MatcherRegistry),
		));
		assert!(!repo.apply(&strategies, "f", "id", Some(&ctx)).matched);
	}

	#[derive(Default)]
	struct RecordingCollector {
		events: Mutex<Vec<AnalyticsEvent>>,
	}

	#[async_trait]
	impl AnalyticsCollector for Arc<RecordingCollector> {
		async fn log_event(&self, event: &AnalyticsEvent) {
			self.events.lock().push(event.clone());
		}
	}

	#[tokio::test]
	async fn analytics_snapshot_uses_context() {
		let repo = ClientFeatureRepository::with_apply_feature(ApplyFeature::new(
			Arc::new(FixedBucket(0)),
			Arc::new(MatcherRegistry),
		));
		let collector = Arc::new(RecordingCollector::default());
		repo.add_analytics_collector(Arc::clone(&collector));

		repo.notify(EdgeEvent::Features(vec![
			banana(1, false).with_strategies(vec![RolloutStrategy::new("s")
				.with_percentage(10)
				.with_value(json!(true))]),
			FeatureState::new("2", "unset", FeatureValueType::String).with_version(1),
		]));

		let mut other = HashMap::new();
		other.insert("cid".to_string(), "c1".to_string());
		let ctx = ContextAttributes::new().with_user_key("u");
		repo.log_analytics_event("checkout", other, Some(&ctx)).await;
		repo.log_analytics_event("view", HashMap::new(), None).await;

		let events = collector.events.lock();
		assert_eq!(events.len(), 2);
		assert_eq!(events[0].action, "checkout");
		assert_eq!(events[0].other.get("cid").map(String::as_str), Some("c1"));
		assert_eq!(events[0].features.len(), 1);
		assert_eq!(events[0].features[0].value, "on");
		assert_eq!(events[1].features[0].value, "off");
	}
}
