// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests against a mock Edge server.
//!
//! Covers:
//! - Client-evaluated polling with local strategy evaluation
//! - Server-evaluated streaming with the context header
//! - Readiness listeners across the whole lifecycle
//! - Baggage propagation of the current feature values

use std::sync::Arc;
use std::time::Duration;

use featurehub::{
	encode_baggage, BaggageInterceptor, ClientFeatureRepository, EdgeFeatureHubConfig,
	Readyness, RetryConfig, SseConfig, CONTEXT_HEADER,
};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

fn client_evaluated_environment() -> serde_json::Value {
	json!([{
		"id": "env-1",
		"features": [
			{
				"id": "f1",
				"key": "new_checkout",
				"version": 3,
				"type": "BOOLEAN",
				"value": false,
				"strategies": [{
					"id": "nz",
					"value": true,
					"attributes": [{
						"fieldName": "country",
						"conditional": "EQUALS",
						"type": "STRING",
						"values": ["new_zealand"]
					}]
				}]
			},
			{"id": "f2", "key": "banner", "version": 1, "type": "STRING", "value": "hello"}
		]
	}])
}

async fn wait_for(repository: &ClientFeatureRepository, readyness: Readyness) {
	for _ in 0..100 {
		if repository.readyness() == readyness {
			return;
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	panic!("repository never became {readyness}");
}

/// Polling a client-evaluated key, then resolving per context.
#[tokio::test]
async fn test_client_evaluated_polling() {
	init_tracing();
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/features"))
		.and(query_param("sdkUrl", "default/env/key*secret"))
		.respond_with(ResponseTemplate::new(200).set_body_json(client_evaluated_environment()))
		.mount(&server)
		.await;

	let config = EdgeFeatureHubConfig::builder()
		.edge_url(format!("{}/features/", server.uri()))
		.api_key("default/env/key*secret")
		.polling(Duration::ZERO)
		.retry_config(RetryConfig::no_retry())
		.build()
		.unwrap();

	let transitions = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&transitions);
	config
		.repository()
		.add_readyness_listener(move |readyness| sink.lock().push(readyness));

	let mut kiwi = config.new_context();
	kiwi.country("new_zealand").user_key("fred");
	kiwi.build().await.unwrap();

	let mut aussie = config.new_context();
	aussie.country("australia");
	aussie.build().await.unwrap();

	assert!(kiwi.is_enabled("new_checkout"));
	assert!(!aussie.is_enabled("new_checkout"));
	assert_eq!(kiwi.get_string("banner").as_deref(), Some("hello"));
	assert_eq!(
		transitions.lock().as_slice(),
		[Readyness::NotReady, Readyness::Ready]
	);

	kiwi.close().await;
	aussie.close().await;
	config.close().await;
}

/// Streaming a server-evaluated key with the context header.
#[tokio::test]
async fn test_server_evaluated_streaming() {
	init_tracing();
	let server = MockServer::start().await;
	let features = json!([
		{"id": "f1", "key": "new_checkout", "version": 1, "type": "BOOLEAN", "value": true}
	]);
	Mock::given(method("GET"))
		.and(path("/features/default/env/key"))
		.and(header(CONTEXT_HEADER, "country=new_zealand,userkey=fred"))
		.respond_with(
			ResponseTemplate::new(200)
				.insert_header("content-type", "text/event-stream")
				.set_body_string(format!("event: features\ndata: {features}\n\n")),
		)
		.mount(&server)
		.await;

	let config = EdgeFeatureHubConfig::builder()
		.edge_url(server.uri())
		.api_key("default/env/key")
		.sse_config(SseConfig {
			reconnect_base_delay: Duration::from_millis(10),
			..SseConfig::default()
		})
		.build()
		.unwrap();

	let mut context = config.new_context();
	context.user_key("fred").country("new_zealand");
	context.build().await.unwrap();

	wait_for(&config.repository(), Readyness::Ready).await;
	assert!(context.is_enabled("new_checkout"));

	context.close().await;
}

/// Values read by one service travel to the next as baggage.
#[tokio::test]
async fn test_baggage_round_trip() {
	init_tracing();
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200).set_body_json(client_evaluated_environment()))
		.mount(&server)
		.await;

	let config = EdgeFeatureHubConfig::builder()
		.edge_url(server.uri())
		.api_key("default/env/key*secret")
		.polling(Duration::ZERO)
		.build()
		.unwrap();
	config.init().await.unwrap();

	let upstream = config.repository();
	let baggage = encode_baggage(Some("trace=abc"), upstream.simple_features()).unwrap();
	assert!(baggage.starts_with("trace=abc,fhub="));

	let downstream = ClientFeatureRepository::new();
	downstream.notify_raw(
		"features",
		r#"[{"id":"f2","key":"banner","version":1,"type":"STRING","value":"downstream"}]"#,
	);
	downstream.add_value_interceptor(BaggageInterceptor::from_header(&baggage));

	assert_eq!(downstream.get_string("banner").as_deref(), Some("hello"));
	config.close().await;
}
