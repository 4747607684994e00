// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context attributes used for strategy matching and server-side evaluation.
//!
//! # Example
//!
//! ```
//! use featurehub_core::{ContextAttributes, StrategyAttributeDeviceName};
//!
//! let ctx = ContextAttributes::new()
//!     .with_user_key("fred@example.com")
//!     .with_country("new_zealand")
//!     .with_device(StrategyAttributeDeviceName::Mobile)
//!     .with_attrs("groups", ["beta", "staff"]);
//!
//! assert_eq!(ctx.default_percentage_key(), Some("fred@example.com"));
//! assert_eq!(
//!     ctx.header(),
//!     "country=new_zealand,device=mobile,groups=beta%2Cstaff,userkey=fred%40example.com"
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const USER_KEY: &str = "userkey";
pub const SESSION_KEY: &str = "session";
pub const COUNTRY: &str = "country";
pub const DEVICE: &str = "device";
pub const PLATFORM: &str = "platform";
pub const VERSION: &str = "version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyAttributeDeviceName {
	Browser,
	Mobile,
	Desktop,
	Server,
	Watch,
	Embedded,
}

impl StrategyAttributeDeviceName {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Browser => "browser",
			Self::Mobile => "mobile",
			Self::Desktop => "desktop",
			Self::Server => "server",
			Self::Watch => "watch",
			Self::Embedded => "embedded",
		}
	}
}

impl fmt::Display for StrategyAttributeDeviceName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyAttributePlatformName {
	Linux,
	Windows,
	Macos,
	Android,
	Ios,
}

impl StrategyAttributePlatformName {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Linux => "linux",
			Self::Windows => "windows",
			Self::Macos => "macos",
			Self::Android => "android",
			Self::Ios => "ios",
		}
	}
}

impl fmt::Display for StrategyAttributePlatformName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Attribute name to ordered values. Names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextAttributes {
	attributes: BTreeMap<String, Vec<String>>,
}

impl ContextAttributes {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_user_key(mut self, key: impl Into<String>) -> Self {
		self.set_attr(USER_KEY, key);
		self
	}

	pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
		self.set_attr(SESSION_KEY, key);
		self
	}

	/// Countries use the lowercase snake-case names Edge expects, e.g. `new_zealand`.
	pub fn with_country(mut self, country: impl Into<String>) -> Self {
		self.set_attr(COUNTRY, country);
		self
	}

	pub fn with_device(mut self, device: StrategyAttributeDeviceName) -> Self {
		self.set_attr(DEVICE, device.as_str());
		self
	}

	pub fn with_platform(mut self, platform: StrategyAttributePlatformName) -> Self {
		self.set_attr(PLATFORM, platform.as_str());
		self
	}

	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.set_attr(VERSION, version);
		self
	}

	pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.set_attr(name, value);
		self
	}

	pub fn with_attrs<I, S>(mut self, name: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.set_attrs(name, values);
		self
	}

	/// Replaces any existing values for `name` with a single value.
	pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.attributes.insert(name.into(), vec![value.into()]);
	}

	pub fn set_attrs<I, S>(&mut self, name: impl Into<String>, values: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.attributes
			.insert(name.into(), values.into_iter().map(Into::into).collect());
	}

	pub fn remove(&mut self, name: &str) {
		self.attributes.remove(name);
	}

	pub fn clear(&mut self) {
		self.attributes.clear();
	}

	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}

	/// First value of `name`, if any.
	pub fn get_attr(&self, name: &str) -> Option<&str> {
		self.attributes
			.get(name)
			.and_then(|values| values.first())
			.map(String::as_str)
	}

	pub fn get_attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
		self.get_attr(name).unwrap_or(default)
	}

	pub fn get_attrs(&self, name: &str) -> Option<&[String]> {
		self.attributes.get(name).map(Vec::as_slice)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.attributes
			.iter()
			.map(|(k, v)| (k.as_str(), v.as_slice()))
	}

	/// Session key if set, otherwise user key.
	pub fn default_percentage_key(&self) -> Option<&str> {
		self.get_attr(SESSION_KEY).or_else(|| self.get_attr(USER_KEY))
	}

	/// Canonical header sent to Edge for server-evaluated contexts.
	///
	/// Names are sorted; each entry is `name=` followed by the comma-joined
	/// values, encoded with [`encode_component`]; entries are joined with `,`.
	/// Equal attribute sets always produce byte-identical headers.
	pub fn header(&self) -> String {
		self.attributes
			.iter()
			.map(|(name, values)| format!("{}={}", name, encode_component(&values.join(","))))
			.collect::<Vec<_>>()
			.join(",")
	}
}

/// Percent-encodes like a browser `encodeURIComponent`: unreserved characters
/// and `!*'()` pass through, everything else is escaped as UTF-8 bytes.
///
/// Every string sent to Edge or carried in baggage goes through this.
pub fn encode_component(value: &str) -> String {
	urlencoding::encode(value)
		.replace("%21", "!")
		.replace("%2A", "*")
		.replace("%27", "'")
		.replace("%28", "(")
		.replace("%29", ")")
}
