// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
	#[error("malformed {kind} payload: {source}")]
	MalformedPayload {
		kind: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("unknown event kind: {0}")]
	UnknownEventKind(String),

	#[error("feature {key} has no type")]
	MissingType { key: String },

	#[error("value for feature {key} is not a valid {value_type}")]
	ValueTypeMismatch { key: String, value_type: String },
}
