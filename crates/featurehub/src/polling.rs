// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Polling Edge connection.
//!
//! Fetches `GET {edge}/features?sdkUrl=...` on an interval. The response's
//! `etag` is sent back as `if-none-match`, so an unchanged environment costs a
//! `304`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use featurehub_common_http::{new_client_with_timeout, retry, RetryConfig};
use featurehub_core::{EdgeEvent, Environment};
use parking_lot::Mutex;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::EdgeFeatureHubConfig;
use crate::edge::EdgeService;
use crate::error::{FeatureHubError, Result};
use crate::repository::ClientFeatureRepository;
use crate::sse::CONTEXT_HEADER;

#[derive(Debug, Clone)]
pub struct PollingConfig {
	/// Time between polls. Zero disables the loop, so every `poll()` fetches.
	pub interval: Duration,
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(180),
		}
	}
}

#[derive(Debug)]
struct PollInner {
	repository: Arc<ClientFeatureRepository>,
	url: String,
	http: Client,
	retry_config: RetryConfig,
	interval: Duration,
	header: Mutex<Option<String>>,
	etag: Mutex<Option<String>>,
	/// Set once Edge reports the key as unknown, or on close.
	stopped: AtomicBool,
	/// Set once a fetch for the current context has landed.
	has_data: AtomicBool,
}

#[derive(Debug, Default)]
struct PollTask {
	handle: Option<JoinHandle<()>>,
	shutdown_tx: Option<mpsc::Sender<()>>,
}

/// Edge service that polls for the full feature list.
#[derive(Debug)]
pub struct PollingEdgeService {
	inner: Arc<PollInner>,
	client_evaluated: bool,
	task: tokio::sync::Mutex<PollTask>,
}

impl PollingEdgeService {
	pub fn new(config: &EdgeFeatureHubConfig) -> Result<Self> {
		let client_config = config.client_config();
		let http = new_client_with_timeout(client_config.request_timeout)
			.map_err(FeatureHubError::RequestFailed)?;

		Ok(Self {
			inner: Arc::new(PollInner {
				repository: config.repository(),
				url: config.polling_url(),
				http,
				retry_config: client_config.retry_config.clone(),
				interval: client_config.polling.interval,
				header: Mutex::new(None),
				etag: Mutex::new(None),
				stopped: AtomicBool::new(false),
				has_data: AtomicBool::new(false),
			}),
			client_evaluated: config.client_evaluated(),
			task: tokio::sync::Mutex::new(PollTask::default()),
		})
	}

	async fn is_running(&self) -> bool {
		self.task.lock().await.is_running()
	}

	/// Starts the interval loop unless it is already running or disabled.
	async fn ensure_running(&self) {
		if self.inner.interval.is_zero() {
			return;
		}

		let mut task = self.task.lock().await;
		if task.is_running() {
			return;
		}

		let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
		let inner = Arc::clone(&self.inner);
		task.handle = Some(tokio::spawn(async move {
			run_poll_loop(inner, shutdown_rx).await;
		}));
		task.shutdown_tx = Some(shutdown_tx);
	}

	/// Fetches now and keeps the loop alive whatever the outcome, unless Edge
	/// has stopped polling for good.
	async fn fetch_and_schedule(&self) -> Result<()> {
		let result = self.inner.fetch().await;
		if !self.inner.stopped.load(Ordering::SeqCst) {
			self.ensure_running().await;
		}
		result
	}
}

impl PollTask {
	fn is_running(&self) -> bool {
		self.handle
			.as_ref()
			.map(|handle| !handle.is_finished())
			.unwrap_or(false)
	}
}

#[async_trait]
impl EdgeService for PollingEdgeService {
	async fn poll(&self) -> Result<()> {
		if self.inner.stopped.load(Ordering::SeqCst) {
			return Err(FeatureHubError::ClientClosed);
		}

		if self.inner.has_data.load(Ordering::SeqCst) && self.is_running().await {
			return Ok(());
		}

		self.fetch_and_schedule().await
	}

	async fn context_change(&self, header: &str) -> Result<()> {
		if self.client_evaluated {
			return self.poll().await;
		}

		let changed = {
			let mut current = self.inner.header.lock();
			let changed = current.as_deref() != Some(header);
			if changed {
				*current = Some(header.to_string());
				*self.inner.etag.lock() = None;
				self.inner.has_data.store(false, Ordering::SeqCst);
			}
			changed
		};

		if !changed {
			return self.poll().await;
		}
		if self.inner.stopped.load(Ordering::SeqCst) {
			return Err(FeatureHubError::ClientClosed);
		}
		self.fetch_and_schedule().await
	}

	async fn close(&self) {
		self.inner.stopped.store(true, Ordering::SeqCst);
		let mut task = self.task.lock().await;
		if let Some(tx) = task.shutdown_tx.take() {
			let _ = tx.send(()).await;
		}
		if let Some(handle) = task.handle.take() {
			handle.abort();
			let _ = handle.await;
		}
	}

	fn requires_replacement_on_header_change(&self) -> bool {
		false
	}

	fn client_evaluated(&self) -> bool {
		self.client_evaluated
	}
}

impl Drop for PollingEdgeService {
	fn drop(&mut self) {
		if let Some(handle) = self.task.get_mut().handle.take() {
			handle.abort();
		}
	}
}

enum Fetched {
	NotModified,
	Changed {
		etag: Option<String>,
		environments: Vec<Environment>,
	},
}

impl PollInner {
	#[instrument(skip(self), fields(url = %self.url))]
	async fn fetch(&self) -> Result<()> {
		let header = self.header.lock().clone();
		let etag = self.etag.lock().clone();

		let fetched = {
			let header = &header;
			let etag = &etag;
			retry(&self.retry_config, || async move {
				self.fetch_once(header.as_deref(), etag.as_deref()).await
			})
			.await?
		};

		let (etag, environments) = match fetched {
			Fetched::NotModified => {
				debug!("features unchanged");
				if *self.header.lock() == header {
					self.has_data.store(true, Ordering::SeqCst);
				}
				return Ok(());
			}
			Fetched::Changed { etag, environments } => (etag, environments),
		};

		if *self.header.lock() != header {
			debug!("discarding poll for a superseded context");
			return Ok(());
		}
		*self.etag.lock() = etag;

		if environments.is_empty() {
			warn!("Edge returned no environments; stopping polling");
			self.stopped.store(true, Ordering::SeqCst);
			self.repository.notify(EdgeEvent::Failure);
			return Err(FeatureHubError::NoEnvironments);
		}

		let features = environments
			.into_iter()
			.flat_map(|environment| {
				let id = environment.id;
				environment.features.into_iter().map(move |mut feature| {
					feature.environment_id = Some(id.clone());
					feature
				})
			})
			.collect::<Vec<_>>();

		debug!(features = features.len(), "received features");
		self.repository.notify(EdgeEvent::Features(features));
		self.has_data.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn fetch_once(&self, header: Option<&str>, etag: Option<&str>) -> Result<Fetched> {
		let mut request = self.http.get(&self.url);
		if let Some(header) = header {
			request = request.header(CONTEXT_HEADER, header);
		}
		if let Some(etag) = etag {
			request = request.header(IF_NONE_MATCH, etag);
		}

		let response = request.send().await.map_err(FeatureHubError::RequestFailed)?;
		let status = response.status();

		if status == StatusCode::NOT_MODIFIED {
			return Ok(Fetched::NotModified);
		}

		if !status.is_success() {
			return Err(FeatureHubError::ServerError {
				status: status.as_u16(),
				message: response.text().await.unwrap_or_default(),
			});
		}

		let etag = response
			.headers()
			.get(ETAG)
			.and_then(|value| value.to_str().ok())
			.map(str::to_string);

		let environments: Vec<Environment> = response
			.json()
			.await
			.map_err(|e| FeatureHubError::ParseFailed(e.to_string()))?;

		Ok(Fetched::Changed { etag, environments })
	}
}

async fn run_poll_loop(inner: Arc<PollInner>, mut shutdown_rx: mpsc::Receiver<()>) {
	info!(interval_secs = inner.interval.as_secs(), "polling Edge for features");

	loop {
		tokio::select! {
			_ = tokio::time::sleep(inner.interval) => {}
			_ = shutdown_rx.recv() => {
				info!("polling stopped");
				break;
			}
		}

		if inner.stopped.load(Ordering::SeqCst) {
			break;
		}

		match inner.fetch().await {
			Ok(()) => {}
			Err(FeatureHubError::NoEnvironments) => break,
			Err(e) => warn!(error = %e, "poll failed; will retry at next interval"),
		}
	}
}
