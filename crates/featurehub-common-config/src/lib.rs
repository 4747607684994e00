// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration primitives shared by the FeatureHub SDK crates.
//!
//! - [`Secret`] keeps API keys out of logs and zeroes them on drop.
//! - [`load_env`] / [`load_secret_env`] read settings using the `VAR` / `VAR_FILE`
//!   convention used by Docker and Kubernetes secret mounts.

pub mod env;
mod secret;

pub use env::{load_env, load_secret_env, require_secret_env, EnvError, RequiredEnvError};
pub use secret::{Secret, SecretString, REDACTED};
