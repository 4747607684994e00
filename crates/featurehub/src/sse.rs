// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Streaming Edge connection over server-sent events.
//!
//! Edge pushes `features`, `feature`, `delete_feature`, `failure`, `ack`,
//! `bye` and `config` events. Each event's name selects the payload shape and
//! the decoded event goes straight to the repository. The connection is
//! re-established with exponential backoff whenever it drops.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::{Event, Eventsource};
use featurehub_core::{CoreError, EdgeEvent};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EdgeFeatureHubConfig;
use crate::edge::EdgeService;
use crate::error::{FeatureHubError, Result};
use crate::repository::ClientFeatureRepository;

/// Header carrying the context for server-evaluated keys.
pub const CONTEXT_HEADER: &str = "x-featurehub";

/// Configuration for SSE connection behavior.
#[derive(Debug, Clone)]
pub struct SseConfig {
	/// Base delay for reconnection attempts.
	pub reconnect_base_delay: Duration,
	/// Maximum delay for reconnection attempts.
	pub reconnect_max_delay: Duration,
	/// Maximum number of consecutive failed attempts (0 = unlimited).
	pub max_reconnect_attempts: u32,
	/// Whether to use exponential backoff for reconnection.
	pub use_exponential_backoff: bool,
}

impl Default for SseConfig {
	fn default() -> Self {
		Self {
			reconnect_base_delay: Duration::from_secs(1),
			reconnect_max_delay: Duration::from_secs(30),
			max_reconnect_attempts: 0, // Unlimited
			use_exponential_backoff: true,
		}
	}
}

impl SseConfig {
	fn delay_for(&self, consecutive_failures: u32) -> Duration {
		if !self.use_exponential_backoff {
			return self.reconnect_base_delay;
		}
		let factor = 2u64.saturating_pow(consecutive_failures.min(10));
		let delay_ms = (self.reconnect_base_delay.as_millis() as u64).saturating_mul(factor);
		Duration::from_millis(delay_ms.min(self.reconnect_max_delay.as_millis() as u64))
	}
}

/// State shared with the background task.
#[derive(Debug)]
struct StreamShared {
	repository: Arc<ClientFeatureRepository>,
	url: String,
	config: SseConfig,
	/// Bumped on every restart; events from older connections are dropped.
	generation: AtomicU64,
	connected: AtomicBool,
	reconnect_attempts: AtomicU64,
	events_received: AtomicU64,
}

impl StreamShared {
	fn is_current(&self, generation: u64) -> bool {
		self.generation.load(Ordering::SeqCst) == generation
	}
}

#[derive(Debug, Default)]
struct Connection {
	header: Option<String>,
	task_handle: Option<JoinHandle<()>>,
	shutdown_tx: Option<mpsc::Sender<()>>,
}

impl Connection {
	fn is_running(&self) -> bool {
		self.task_handle
			.as_ref()
			.map(|handle| !handle.is_finished())
			.unwrap_or(false)
	}
}

type FirstConnect = oneshot::Sender<std::result::Result<(), String>>;

/// Edge service that keeps an SSE stream open.
#[derive(Debug)]
pub struct StreamingEdgeService {
	shared: Arc<StreamShared>,
	client_evaluated: bool,
	connect_timeout: Duration,
	connection: Mutex<Connection>,
	closed: AtomicBool,
}

impl StreamingEdgeService {
	pub fn new(config: &EdgeFeatureHubConfig) -> Self {
		Self {
			shared: Arc::new(StreamShared {
				repository: config.repository(),
				url: config.url(),
				config: config.client_config().sse_config.clone(),
				generation: AtomicU64::new(0),
				connected: AtomicBool::new(false),
				reconnect_attempts: AtomicU64::new(0),
				events_received: AtomicU64::new(0),
			}),
			client_evaluated: config.client_evaluated(),
			connect_timeout: config.client_config().request_timeout,
			connection: Mutex::new(Connection::default()),
			closed: AtomicBool::new(false),
		}
	}

	/// Returns true if the SSE connection is currently active.
	pub fn is_connected(&self) -> bool {
		self.shared.connected.load(Ordering::SeqCst)
	}

	/// Returns the number of reconnection attempts since the service was created.
	pub fn reconnect_attempts(&self) -> u64 {
		self.shared.reconnect_attempts.load(Ordering::SeqCst)
	}

	/// Returns the number of events received since the service was created.
	pub fn events_received(&self) -> u64 {
		self.shared.events_received.load(Ordering::SeqCst)
	}

	/// Stops any running stream and starts a new one under `header`.
	async fn restart(
		&self,
		connection: &mut Connection,
		header: Option<String>,
	) -> oneshot::Receiver<std::result::Result<(), String>> {
		stop_connection(connection, &self.shared).await;

		let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
		let (first_tx, first_rx) = oneshot::channel();

		let shared = Arc::clone(&self.shared);
		let task_header = header.clone();
		let handle = tokio::spawn(async move {
			run_sse_loop(shared, task_header, generation, shutdown_rx, first_tx).await;
		});

		connection.header = header;
		connection.shutdown_tx = Some(shutdown_tx);
		connection.task_handle = Some(handle);
		first_rx
	}

	/// Waits for the first connection attempt, at most `connect_timeout`.
	///
	/// A slow Edge is not an error: the stream keeps trying in the background.
	async fn await_first_connect(
		&self,
		first_rx: oneshot::Receiver<std::result::Result<(), String>>,
	) -> Result<()> {
		match tokio::time::timeout(self.connect_timeout, first_rx).await {
			Ok(Ok(Ok(()))) => Ok(()),
			Ok(Ok(Err(message))) => Err(FeatureHubError::SseStreamError(message)),
			Ok(Err(_)) => Ok(()),
			Err(_) => {
				debug!(
					timeout_ms = self.connect_timeout.as_millis(),
					"SSE stream not yet connected; continuing in background"
				);
				Ok(())
			}
		}
	}
}

#[async_trait]
impl EdgeService for StreamingEdgeService {
	async fn poll(&self) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(FeatureHubError::ClientClosed);
		}

		let first_rx = {
			let mut connection = self.connection.lock().await;
			if connection.is_running() {
				return Ok(());
			}
			let header = connection.header.clone();
			self.restart(&mut connection, header).await
		};

		self.await_first_connect(first_rx).await
	}

	async fn context_change(&self, header: &str) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(FeatureHubError::ClientClosed);
		}

		let first_rx = {
			let mut connection = self.connection.lock().await;
			if connection.is_running() && connection.header.as_deref() == Some(header) {
				return Ok(());
			}
			debug!("context changed; reconnecting SSE stream");
			self.restart(&mut connection, Some(header.to_string()))
				.await
		};

		self.await_first_connect(first_rx).await
	}

	async fn close(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		let mut connection = self.connection.lock().await;
		stop_connection(&mut connection, &self.shared).await;
		info!("SSE Edge service closed");
	}

	fn requires_replacement_on_header_change(&self) -> bool {
		true
	}

	fn client_evaluated(&self) -> bool {
		self.client_evaluated
	}
}

impl Drop for StreamingEdgeService {
	fn drop(&mut self) {
		if let Some(handle) = self.connection.get_mut().task_handle.take() {
			handle.abort();
		}
	}
}

async fn stop_connection(connection: &mut Connection, shared: &StreamShared) {
	// Invalidate first so anything still in flight is ignored.
	shared.generation.fetch_add(1, Ordering::SeqCst);
	if let Some(tx) = connection.shutdown_tx.take() {
		let _ = tx.send(()).await;
	}
	if let Some(handle) = connection.task_handle.take() {
		handle.abort();
		let _ = handle.await;
	}
	shared.connected.store(false, Ordering::SeqCst);
}

/// Runs the SSE connection loop with reconnection logic.
async fn run_sse_loop(
	shared: Arc<StreamShared>,
	header: Option<String>,
	generation: u64,
	mut shutdown_rx: mpsc::Receiver<()>,
	first_tx: FirstConnect,
) {
	let mut consecutive_failures: u32 = 0;
	let mut first_tx = Some(first_tx);

	loop {
		if shutdown_rx.try_recv().is_ok() || !shared.is_current(generation) {
			info!("SSE connection received shutdown signal");
			break;
		}

		info!(url = %shared.url, "Connecting to SSE stream");

		match connect_and_process(&shared, header.as_deref(), generation, &mut first_tx).await {
			Ok(()) => {
				debug!("SSE stream ended normally");
				consecutive_failures = 0;
			}
			Err(e) => {
				error!(error = %e, "SSE connection error");
				consecutive_failures += 1;

				if shared.is_current(generation) && !shared.repository.is_ready() {
					shared.repository.notify(EdgeEvent::Failure);
				}

				if let Some(tx) = first_tx.take() {
					let _ = tx.send(Err(e.to_string()));
				}

				if !e.is_retryable() {
					error!(error = %e, "Edge rejected the stream; not reconnecting");
					break;
				}
			}
		}

		shared.connected.store(false, Ordering::SeqCst);

		if shared.config.max_reconnect_attempts > 0
			&& consecutive_failures >= shared.config.max_reconnect_attempts
		{
			error!(
				attempts = consecutive_failures,
				"Max reconnection attempts reached, stopping SSE"
			);
			break;
		}

		let delay = shared.config.delay_for(consecutive_failures);
		shared.reconnect_attempts.fetch_add(1, Ordering::SeqCst);
		warn!(
			delay_ms = delay.as_millis(),
			attempts = consecutive_failures,
			"Reconnecting to SSE stream"
		);

		tokio::select! {
			_ = tokio::time::sleep(delay) => {}
			_ = shutdown_rx.recv() => {
				info!("SSE connection received shutdown signal during reconnect wait");
				break;
			}
		}
	}

	shared.connected.store(false, Ordering::SeqCst);
}

/// Connects to the SSE stream and processes events until disconnection.
async fn connect_and_process(
	shared: &StreamShared,
	header: Option<&str>,
	generation: u64,
	first_tx: &mut Option<FirstConnect>,
) -> Result<()> {
	let client = featurehub_common_http::builder()
		.build()
		.map_err(FeatureHubError::ConnectionFailed)?;

	let mut request = client
		.get(&shared.url)
		.header("Accept", "text/event-stream")
		.header("Cache-Control", "no-cache");
	if let Some(header) = header {
		request = request.header(CONTEXT_HEADER, header);
	}

	let response = request.send().await.map_err(FeatureHubError::ConnectionFailed)?;

	if !response.status().is_success() {
		return Err(FeatureHubError::ServerError {
			status: response.status().as_u16(),
			message: response.text().await.unwrap_or_default(),
		});
	}

	shared.connected.store(true, Ordering::SeqCst);
	if let Some(tx) = first_tx.take() {
		let _ = tx.send(Ok(()));
	}
	info!("SSE connection established");

	let mut event_stream = response.bytes_stream().eventsource();

	while let Some(event_result) = event_stream.next().await {
		match event_result {
			Ok(event) => {
				shared.events_received.fetch_add(1, Ordering::SeqCst);
				if let Err(e) = process_event(event, shared, generation) {
					warn!(error = %e, "Failed to process SSE event");
				}
			}
			Err(e) => {
				return Err(FeatureHubError::SseStreamError(e.to_string()));
			}
		}
	}

	Ok(())
}

/// Decodes a single SSE event and hands it to the repository.
fn process_event(event: Event, shared: &StreamShared, generation: u64) -> Result<()> {
	if !shared.is_current(generation) {
		debug!(event = %event.event, "dropping event from a superseded stream");
		return Ok(());
	}

	let edge_event = match EdgeEvent::decode(&event.event, &event.data) {
		Ok(edge_event) => edge_event,
		Err(CoreError::UnknownEventKind(kind)) => {
			debug!(kind = %kind, "ignoring unknown SSE event");
			return Ok(());
		}
		Err(e) => {
			warn!(event = %event.event, error = %e, "Failed to parse SSE event");
			return Err(e.into());
		}
	};

	debug!(event_type = %edge_event.kind(), "Processing SSE event");
	shared.repository.notify(edge_event);
	Ok(())
}
