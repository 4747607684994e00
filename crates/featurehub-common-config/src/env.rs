// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable loading with `*_FILE` indirection.
//!
//! `FEATUREHUB_API_KEY_FILE=/run/secrets/fh_key` takes precedence over
//! `FEATUREHUB_API_KEY=...`, so keys can be mounted as files instead of being
//! placed in the process environment.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;
use tracing::debug;

use crate::secret::SecretString;

#[derive(Debug, Error)]
pub enum EnvError {
	#[error("failed to read {var} file at {path}: {source}")]
	Io {
		var: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("file path in {var} is empty")]
	EmptyPath { var: String },
}

#[derive(Debug, Error)]
pub enum RequiredEnvError {
	#[error("required setting not found: set either {var} or {file_var}")]
	Missing { var: String, file_var: String },

	#[error(transparent)]
	Load(#[from] EnvError),
}

/// Reads `var`, preferring the file named by `{var}_FILE` when it is set.
///
/// A single trailing newline is stripped from file contents. Returns
/// `Ok(None)` when neither variable is present.
pub fn load_env(var: &str) -> Result<Option<String>, EnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(EnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path_str);
		let content = fs::read_to_string(&path).map_err(|source| EnvError::Io {
			var: file_var.clone(),
			path: path.clone(),
			source,
		})?;
		debug!(var = %file_var, path = %path.display(), "loaded setting from file");

		let value = content.strip_suffix('\n').unwrap_or(&content);
		let value = value.strip_suffix('\r').unwrap_or(value);
		return Ok(Some(value.to_string()));
	}

	Ok(env::var(var).ok())
}

/// As [`load_env`], wrapping the value so it cannot be logged by accident.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, EnvError> {
	Ok(load_env(var)?.map(SecretString::new))
}

pub fn require_secret_env(var: &str) -> Result<SecretString, RequiredEnvError> {
	load_secret_env(var)?.ok_or_else(|| RequiredEnvError::Missing {
		var: var.to_string(),
		file_var: format!("{var}_FILE"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn missing_variable_is_none() {
		assert!(load_env("FH_TEST_ENV_NEVER_SET").unwrap().is_none());
	}

	#[test]
	fn direct_value_is_used() {
		env::set_var("FH_TEST_ENV_DIRECT", "http://localhost:8903");
		let value = load_env("FH_TEST_ENV_DIRECT").unwrap();
		assert_eq!(value.as_deref(), Some("http://localhost:8903"));
		env::remove_var("FH_TEST_ENV_DIRECT");
	}

	#[test]
	fn file_takes_precedence_and_trailing_newline_is_stripped() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "default/abc/secret").unwrap();

		env::set_var("FH_TEST_ENV_PRECEDENCE", "from-env");
		env::set_var("FH_TEST_ENV_PRECEDENCE_FILE", file.path());

		let secret = load_secret_env("FH_TEST_ENV_PRECEDENCE").unwrap().unwrap();
		assert_eq!(secret.expose(), "default/abc/secret");

		env::remove_var("FH_TEST_ENV_PRECEDENCE");
		env::remove_var("FH_TEST_ENV_PRECEDENCE_FILE");
	}

	#[test]
	fn empty_file_path_is_an_error() {
		env::set_var("FH_TEST_ENV_EMPTY_FILE", "");
		let err = load_env("FH_TEST_ENV_EMPTY").unwrap_err();
		assert!(matches!(err, EnvError::EmptyPath { .. }));
		env::remove_var("FH_TEST_ENV_EMPTY_FILE");
	}

	#[test]
	fn unreadable_file_is_an_error() {
		env::set_var("FH_TEST_ENV_MISSING_FILE", "/nonexistent/featurehub/key");
		let err = load_env("FH_TEST_ENV_MISSING").unwrap_err();
		assert!(matches!(err, EnvError::Io { .. }));
		env::remove_var("FH_TEST_ENV_MISSING_FILE");
	}

	#[test]
	fn required_secret_reports_both_names() {
		let err = require_secret_env("FH_TEST_ENV_REQUIRED").unwrap_err();
		let message = err.to_string();
		assert!(message.contains("FH_TEST_ENV_REQUIRED"));
		assert!(message.contains("FH_TEST_ENV_REQUIRED_FILE"));
	}
}
