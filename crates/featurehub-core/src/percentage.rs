// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deterministic percentage bucketing.
//!
//! Every FeatureHub SDK and the server must place a given context in the same
//! bucket, so the formula below is fixed: murmur3 x86_32 with seed 0 over
//! `percentage_key + feature_value_id`, scaled from `[0, 2^32)` to
//! `[0, 1_000_000)` and floored.

use std::io::Cursor;

use murmur3::murmur3_32;

/// Upper bound (exclusive) of a bucket and the scale of strategy percentages.
pub const MAX_PERCENTAGE: u32 = 1_000_000;

pub trait PercentageCalculator: Send + Sync {
	/// Returns a bucket in `[0, MAX_PERCENTAGE)`.
	fn determine_client_percentage(&self, percentage_key: &str, feature_value_id: &str) -> u32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Murmur3PercentageCalculator;

impl PercentageCalculator for Murmur3PercentageCalculator {
	fn determine_client_percentage(&self, percentage_key: &str, feature_value_id: &str) -> u32 {
		let input = format!("{percentage_key}{feature_value_id}");
		bucket_for_hash(hash(&input))
	}
}

fn hash(input: &str) -> u32 {
	// Reading from an in-memory cursor cannot fail.
	murmur3_32(&mut Cursor::new(input.as_bytes()), 0).unwrap_or(0)
}

fn bucket_for_hash(hash: u32) -> u32 {
	((hash as f64) / 4_294_967_296.0 * MAX_PERCENTAGE as f64).floor() as u32
}
