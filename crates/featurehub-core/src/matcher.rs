// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-type attribute matchers.
//!
//! Each matcher answers whether a supplied context value satisfies one
//! [`RolloutStrategyAttribute`]. Anything that fails to parse is a non-match;
//! matchers never error.

use std::cmp::Ordering;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use ipnet::IpNet;
use regex::Regex;
use semver::Version;
use tracing::debug;

use crate::strategy::{
	RolloutStrategyAttribute, RolloutStrategyAttributeConditional as Cond, RolloutStrategyFieldType,
};

pub trait StrategyMatcher: Send + Sync {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool;
}

pub trait MatcherRepository: Send + Sync {
	fn find_matcher(&self, attr: &RolloutStrategyAttribute) -> &dyn StrategyMatcher;
}

/// The standard matcher for every field type.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatcherRegistry;

impl MatcherRepository for MatcherRegistry {
	fn find_matcher(&self, attr: &RolloutStrategyAttribute) -> &dyn StrategyMatcher {
		match attr.field_type {
			RolloutStrategyFieldType::String => &StringMatcher,
			RolloutStrategyFieldType::SemanticVersion => &SemanticVersionMatcher,
			RolloutStrategyFieldType::Number => &NumberMatcher,
			RolloutStrategyFieldType::Date => &DateMatcher,
			RolloutStrategyFieldType::Datetime => &DateTimeMatcher,
			RolloutStrategyFieldType::Boolean => &BooleanMatcher,
			RolloutStrategyFieldType::IpAddress => &IpNetworkMatcher,
			RolloutStrategyFieldType::Unknown => &FallthroughMatcher,
		}
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FallthroughMatcher;

impl StrategyMatcher for FallthroughMatcher {
	fn matches(&self, _supplied_value: &str, _attr: &RolloutStrategyAttribute) -> bool {
		false
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanMatcher;

impl StrategyMatcher for BooleanMatcher {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool {
		let Some(expected) = attr.string_values().into_iter().next() else {
			return false;
		};
		let supplied = supplied_value == "true";
		let expected = expected == "true";

		match attr.conditional {
			Cond::Equals => supplied == expected,
			Cond::NotEquals => supplied != expected,
			_ => false,
		}
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StringMatcher;

impl StrategyMatcher for StringMatcher {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool {
		match_text(supplied_value, &attr.string_values(), attr.conditional)
	}
}

/// Case-sensitive text comparison shared by the string-like matchers.
fn match_text(supplied: &str, values: &[String], conditional: Cond) -> bool {
	let any = |f: &dyn Fn(&str) -> bool| values.iter().any(|v| f(v));

	match conditional {
		Cond::Equals => any(&|v| v == supplied),
		Cond::NotEquals => !any(&|v| v == supplied),
		Cond::EndsWith => any(&|v| supplied.ends_with(v)),
		Cond::StartsWith => any(&|v| supplied.starts_with(v)),
		Cond::Greater => any(&|v| supplied > v),
		Cond::GreaterEquals => any(&|v| supplied >= v),
		Cond::Less => any(&|v| supplied < v),
		Cond::LessEquals => any(&|v| supplied <= v),
		Cond::Includes => any(&|v| supplied.contains(v)),
		Cond::Excludes => !any(&|v| supplied.contains(v)),
		Cond::Regex => any(&|v| regex_matches(v, supplied)),
		Cond::Unknown => false,
	}
}

fn regex_matches(pattern: &str, supplied: &str) -> bool {
	match Regex::new(pattern) {
		Ok(re) => re.is_match(supplied),
		Err(e) => {
			debug!(pattern, error = %e, "ignoring invalid strategy regex");
			false
		}
	}
}

/// Calendar dates compared on their ISO-8601 form, which orders correctly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateMatcher;

impl StrategyMatcher for DateMatcher {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool {
		let Some(supplied) = parse_date(supplied_value) else {
			return false;
		};
		let supplied = supplied.format("%Y-%m-%d").to_string();
		let values: Vec<String> = attr
			.string_values()
			.into_iter()
			.map(|v| match parse_date(&v) {
				Some(date) => date.format("%Y-%m-%d").to_string(),
				None => v,
			})
			.collect();

		match_text(&supplied, &values, temporal_conditional(attr.conditional))
	}
}

/// Timestamps normalized to UTC second precision with a `Z` suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeMatcher;

impl StrategyMatcher for DateTimeMatcher {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool {
		let Some(supplied) = parse_datetime(supplied_value) else {
			return false;
		};
		let supplied = format_datetime(&supplied);
		let values: Vec<String> = attr
			.string_values()
			.into_iter()
			.map(|v| match parse_datetime(&v) {
				Some(dt) => format_datetime(&dt),
				None => v,
			})
			.collect();

		match_text(&supplied, &values, temporal_conditional(attr.conditional))
	}
}

/// Dates have no substring semantics: inclusion is equality.
fn temporal_conditional(conditional: Cond) -> Cond {
	match conditional {
		Cond::Includes => Cond::Equals,
		Cond::Excludes => Cond::NotEquals,
		other => other,
	}
}

fn parse_date(value: &str) -> Option<NaiveDate> {
	let value = value.trim();
	NaiveDate::parse_from_str(value, "%Y-%m-%d")
		.ok()
		.or_else(|| parse_datetime(value).map(|dt| dt.date_naive()))
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
	let value = value.trim();
	if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
		return Some(dt.with_timezone(&Utc));
	}
	if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
		return Some(naive.and_utc());
	}
	NaiveDate::parse_from_str(value, "%Y-%m-%d")
		.ok()
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.map(|naive| naive.and_utc())
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
	dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NumberMatcher;

impl StrategyMatcher for NumberMatcher {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool {
		let values = attr.string_values();

		// Text conditionals work on the raw forms.
		match attr.conditional {
			Cond::EndsWith | Cond::StartsWith | Cond::Includes | Cond::Excludes | Cond::Regex => {
				return match_text(supplied_value, &values, attr.conditional);
			}
			_ => {}
		}

		let Some(supplied) = Number::parse(supplied_value) else {
			return false;
		};
		let candidates: Vec<Number> = values.iter().filter_map(|v| supplied.read_like(v)).collect();
		let any = |f: &dyn Fn(Option<Ordering>) -> bool| {
			candidates.iter().any(|v| f(supplied.partial_cmp(v)))
		};

		match attr.conditional {
			Cond::Equals => any(&|o| o == Some(Ordering::Equal)),
			Cond::NotEquals => !any(&|o| o == Some(Ordering::Equal)),
			Cond::Greater => any(&|o| o == Some(Ordering::Greater)),
			Cond::GreaterEquals => any(&|o| matches!(o, Some(Ordering::Greater | Ordering::Equal))),
			Cond::Less => any(&|o| o == Some(Ordering::Less)),
			Cond::LessEquals => any(&|o| matches!(o, Some(Ordering::Less | Ordering::Equal))),
			_ => false,
		}
	}
}

/// The supplied value picks the arithmetic: integers compare exactly as
/// `i64`, anything written with a `.` compares as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Number {
	Int(i64),
	Float(f64),
}

impl Number {
	fn parse(value: &str) -> Option<Self> {
		let value = value.trim();
		if value.contains('.') {
			value.parse().ok().map(Number::Float)
		} else {
			value.parse().ok().map(Number::Int)
		}
	}

	/// Reads a candidate in the same mode as `self`. In integer mode a
	/// fractional candidate is truncated toward zero.
	fn read_like(&self, value: &str) -> Option<Self> {
		let value = value.trim();
		match self {
			Number::Float(_) => value.parse().ok().map(Number::Float),
			Number::Int(_) => value
				.parse::<i64>()
				.ok()
				.or_else(|| {
					value
						.parse::<f64>()
						.ok()
						.filter(|f| f.is_finite())
						.map(|f| f.trunc() as i64)
				})
				.map(Number::Int),
		}
	}
}

/// Major.minor.patch ordering. Text conditionals are not defined for versions
/// and never match.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticVersionMatcher;

impl StrategyMatcher for SemanticVersionMatcher {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool {
		let Some(supplied) = parse_version(supplied_value) else {
			return false;
		};
		let candidates: Vec<Version> = attr
			.string_values()
			.iter()
			.filter_map(|v| parse_version(v))
			.collect();
		let any = |f: &dyn Fn(Ordering) -> bool| candidates.iter().any(|v| f(supplied.cmp_precedence(v)));

		match attr.conditional {
			Cond::Equals | Cond::Includes => any(&|o| o == Ordering::Equal),
			Cond::NotEquals | Cond::Excludes => !any(&|o| o == Ordering::Equal),
			Cond::Greater => any(&|o| o == Ordering::Greater),
			Cond::GreaterEquals => any(&|o| o != Ordering::Less),
			Cond::Less => any(&|o| o == Ordering::Less),
			Cond::LessEquals => any(&|o| o != Ordering::Greater),
			Cond::StartsWith | Cond::EndsWith | Cond::Regex | Cond::Unknown => false,
		}
	}
}

/// Parses `1`, `1.2` and `v1.2.3` as well as strict semver.
fn parse_version(value: &str) -> Option<Version> {
	let value = value.trim();
	let value = value.strip_prefix('v').unwrap_or(value);
	if let Ok(version) = Version::parse(value) {
		return Some(version);
	}

	let (core, rest) = match value.find(|c| c == '-' || c == '+') {
		Some(idx) => value.split_at(idx),
		None => (value, ""),
	};
	let padded = match core.split('.').count() {
		1 => format!("{core}.0.0{rest}"),
		2 => format!("{core}.0{rest}"),
		_ => return None,
	};
	Version::parse(&padded).ok()
}

/// Addresses and CIDR blocks.
///
/// A bare address is treated as a single-host network, so bare-in-bare is an
/// exact match, bare-in-CIDR is containment and CIDR-in-CIDR is set equality.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpNetworkMatcher;

impl StrategyMatcher for IpNetworkMatcher {
	fn matches(&self, supplied_value: &str, attr: &RolloutStrategyAttribute) -> bool {
		let Some(supplied) = parse_ip(supplied_value) else {
			return false;
		};
		let found = attr
			.string_values()
			.iter()
			.filter_map(|v| parse_ip(v))
			.any(|candidate| ip_matches(&candidate, &supplied));

		match attr.conditional {
			Cond::Equals | Cond::Includes => found,
			Cond::NotEquals | Cond::Excludes => !found,
			_ => false,
		}
	}
}

enum IpValue {
	Address(IpAddr),
	Network(IpNet),
}

fn parse_ip(value: &str) -> Option<IpValue> {
	let value = value.trim();
	if value.contains('/') {
		IpNet::from_str(value).ok().map(|net| IpValue::Network(net.trunc()))
	} else {
		IpAddr::from_str(value).ok().map(IpValue::Address)
	}
}

fn ip_matches(candidate: &IpValue, supplied: &IpValue) -> bool {
	match (candidate, supplied) {
		(IpValue::Address(c), IpValue::Address(s)) => c == s,
		(IpValue::Network(c), IpValue::Address(s)) => c.contains(s),
		(IpValue::Network(c), IpValue::Network(s)) => c == s,
		(IpValue::Address(c), IpValue::Network(s)) => {
			s.prefix_len() == s.max_prefix_len() && s.addr() == *c
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::{json, Value};

	fn attr(field_type: RolloutStrategyFieldType, conditional: Cond, values: Vec<Value>) -> RolloutStrategyAttribute {
		RolloutStrategyAttribute::new("field", conditional, field_type, values)
	}

	fn check(field_type: RolloutStrategyFieldType, conditional: Cond, values: Vec<Value>, supplied: &str) -> bool {
		let attr = attr(field_type, conditional, values);
		MatcherRegistry.find_matcher(&attr).matches(supplied, &attr)
	}

	mod string {
		use super::*;
		const T: RolloutStrategyFieldType = RolloutStrategyFieldType::String;

		#[test]
		fn equality_is_case_sensitive_membership() {
			assert!(check(T, Cond::Equals, vec![json!("nz"), json!("au")], "au"));
			assert!(!check(T, Cond::Equals, vec![json!("nz")], "NZ"));
			assert!(check(T, Cond::NotEquals, vec![json!("nz")], "NZ"));
			assert!(!check(T, Cond::NotEquals, vec![json!("nz"), json!("au")], "au"));
		}

		#[test]
		fn affixes_and_substrings() {
			assert!(check(T, Cond::StartsWith, vec![json!("fr")], "fred"));
			assert!(check(T, Cond::EndsWith, vec![json!("x"), json!("ed")], "fred"));
			assert!(check(T, Cond::Includes, vec![json!("re")], "fred"));
			assert!(!check(T, Cond::Excludes, vec![json!("re")], "fred"));
			assert!(check(T, Cond::Excludes, vec![json!("zz")], "fred"));
		}

		#[test]
		fn ordering_is_lexicographic() {
			assert!(check(T, Cond::Greater, vec![json!("abc")], "abd"));
			assert!(check(T, Cond::GreaterEquals, vec![json!("abc")], "abc"));
			assert!(check(T, Cond::Less, vec![json!("b")], "a"));
			assert!(!check(T, Cond::LessEquals, vec![json!("a")], "b"));
		}

		#[test]
		fn regex_finds_pattern_anywhere() {
			assert!(check(T, Cond::Regex, vec![json!("^fr.d$")], "fred"));
			assert!(check(T, Cond::Regex, vec![json!("[0-9]+")], "build-42"));
			assert!(!check(T, Cond::Regex, vec![json!("(unclosed")], "(unclosed"));
		}
	}

	mod number {
		use super::*;
		const T: RolloutStrategyFieldType = RolloutStrategyFieldType::Number;

		#[test]
		fn integer_and_float_comparisons() {
			assert!(check(T, Cond::Equals, vec![json!(5)], "5"));
			assert!(check(T, Cond::Equals, vec![json!(2.5)], "2.5"));
			assert!(check(T, Cond::Greater, vec![json!(10)], "11"));
			assert!(!check(T, Cond::Greater, vec![json!(10)], "10"));
			assert!(check(T, Cond::GreaterEquals, vec![json!(10)], "10"));
			assert!(check(T, Cond::Less, vec![json!(1.5)], "1.25"));
			assert!(check(T, Cond::LessEquals, vec![json!("3")], "3"));
			assert!(check(T, Cond::NotEquals, vec![json!(5), json!(6)], "7"));
			assert!(!check(T, Cond::NotEquals, vec![json!(5), json!(6)], "6"));
		}

		#[test]
		fn integers_compare_exactly() {
			let big = 9_007_199_254_740_992i64;
			assert!(!check(T, Cond::Equals, vec![json!(big)], "9007199254740993"));
			assert!(check(T, Cond::Greater, vec![json!(big)], "9007199254740993"));
		}

		#[test]
		fn supplied_value_picks_integer_or_float_mode() {
			// Integer mode truncates fractional candidates.
			assert!(check(T, Cond::Equals, vec![json!(10.7)], "10"));
			assert!(!check(T, Cond::Greater, vec![json!(10.7)], "10"));
			// Float mode keeps the fraction.
			assert!(!check(T, Cond::Equals, vec![json!(10.7)], "10.0"));
			assert!(check(T, Cond::Less, vec![json!(10.7)], "10.0"));
			assert!(check(T, Cond::Equals, vec![json!(10)], "10.0"));
		}

		#[test]
		fn unparseable_supplied_value_never_matches() {
			assert!(!check(T, Cond::Equals, vec![json!(5)], "five"));
			assert!(!check(T, Cond::NotEquals, vec![json!(5)], "five"));
			assert!(!check(T, Cond::Equals, vec![json!(5)], "5x"));
		}

		#[test]
		fn text_conditionals_use_raw_strings() {
			assert!(check(T, Cond::Includes, vec![json!(23)], "1234"));
			assert!(check(T, Cond::Excludes, vec![json!(9)], "1234"));
			assert!(check(T, Cond::StartsWith, vec![json!(12)], "1234"));
			assert!(check(T, Cond::EndsWith, vec![json!(34)], "1234"));
		}
	}

	mod boolean {
		use super::*;
		const T: RolloutStrategyFieldType = RolloutStrategyFieldType::Boolean;

		#[test]
		fn equality_against_literal_true() {
			assert!(check(T, Cond::Equals, vec![json!(true)], "true"));
			assert!(check(T, Cond::Equals, vec![json!("false")], "false"));
			assert!(check(T, Cond::Equals, vec![json!(false)], "anything"));
			assert!(!check(T, Cond::Equals, vec![json!(true)], "TRUE"));
			assert!(check(T, Cond::NotEquals, vec![json!(true)], "false"));
		}

		#[test]
		fn other_conditionals_never_match() {
			assert!(!check(T, Cond::Includes, vec![json!(true)], "true"));
			assert!(!check(T, Cond::Equals, vec![], "true"));
		}
	}

	mod date {
		use super::*;
		const D: RolloutStrategyFieldType = RolloutStrategyFieldType::Date;
		const DT: RolloutStrategyFieldType = RolloutStrategyFieldType::Datetime;

		#[test]
		fn dates_compare_as_calendar_days() {
			assert!(check(D, Cond::Equals, vec![json!("2024-03-01")], "2024-03-01"));
			assert!(check(D, Cond::Equals, vec![json!("2024-03-01")], "2024-03-01T23:10:00Z"));
			assert!(check(D, Cond::Includes, vec![json!("2024-03-01"), json!("2024-03-02")], "2024-03-02"));
			assert!(check(D, Cond::Greater, vec![json!("2024-02-29")], "2024-03-01"));
			assert!(check(D, Cond::LessEquals, vec![json!("2024-03-01")], "2024-03-01"));
			assert!(!check(D, Cond::Less, vec![json!("2024-03-01")], "2024-03-01"));
			assert!(check(D, Cond::NotEquals, vec![json!("2024-03-01")], "2024-03-02"));
		}

		#[test]
		fn text_conditionals_use_iso_form() {
			assert!(check(D, Cond::StartsWith, vec![json!("2024-")], "2024-07-04"));
			assert!(check(D, Cond::EndsWith, vec![json!("-04")], "2024-07-04"));
			assert!(check(D, Cond::Regex, vec![json!("^2024-0[1-7]")], "2024-07-04"));
		}

		#[test]
		fn unparseable_date_never_matches() {
			assert!(!check(D, Cond::Equals, vec![json!("2024-03-01")], "yesterday"));
			assert!(!check(D, Cond::NotEquals, vec![json!("2024-03-01")], "yesterday"));
		}

		#[test]
		fn datetimes_normalize_to_utc_seconds() {
			assert!(check(DT, Cond::Equals, vec![json!("2024-03-01T10:00:00Z")], "2024-03-01T12:00:00+02:00"));
			assert!(check(DT, Cond::Equals, vec![json!("2024-03-01T10:00:00Z")], "2024-03-01T10:00:00.456Z"));
			assert!(check(DT, Cond::Greater, vec![json!("2024-03-01T10:00:00Z")], "2024-03-01T10:00:01Z"));
			assert!(check(DT, Cond::Less, vec![json!("2024-03-01T10:00:00Z")], "2024-02-01T10:00:00"));
		}
	}

	mod semver {
		use super::*;
		const T: RolloutStrategyFieldType = RolloutStrategyFieldType::SemanticVersion;

		#[test]
		fn ordering_follows_semver() {
			assert!(check(T, Cond::Equals, vec![json!("1.2.3")], "1.2.3"));
			assert!(check(T, Cond::Includes, vec![json!("1.0.0"), json!("1.2.3")], "1.2.3"));
			assert!(check(T, Cond::Greater, vec![json!("1.9.0")], "1.10.0"));
			assert!(check(T, Cond::GreaterEquals, vec![json!("2.0.0")], "2.0.0"));
			assert!(check(T, Cond::Less, vec![json!("2.0.0")], "2.0.0-beta.1"));
			assert!(check(T, Cond::LessEquals, vec![json!("1.2")], "1.2.0"));
		}

		#[test]
		fn not_equals_is_negated_equality() {
			assert!(check(T, Cond::NotEquals, vec![json!("1.0.0")], "1.0.1"));
			assert!(!check(T, Cond::NotEquals, vec![json!("1.0.0"), json!("1.0.1")], "1.0.1"));
			assert!(!check(T, Cond::Excludes, vec![json!("1.0.1")], "1.0.1"));
		}

		#[test]
		fn text_conditionals_are_unsupported() {
			assert!(!check(T, Cond::StartsWith, vec![json!("1")], "1.2.3"));
			assert!(!check(T, Cond::EndsWith, vec![json!("3")], "1.2.3"));
			assert!(!check(T, Cond::Regex, vec![json!(".*")], "1.2.3"));
		}

		#[test]
		fn lenient_version_forms() {
			assert_eq!(parse_version("1"), Version::parse("1.0.0").ok());
			assert_eq!(parse_version("v2.1"), Version::parse("2.1.0").ok());
			assert_eq!(parse_version("2.1-rc.1"), Version::parse("2.1.0-rc.1").ok());
			assert_eq!(parse_version("not.a.version"), None);
		}
	}

	mod ip {
		use super::*;
		const T: RolloutStrategyFieldType = RolloutStrategyFieldType::IpAddress;

		#[test]
		fn address_in_cidr() {
			assert!(check(T, Cond::Equals, vec![json!("192.168.0.0/16")], "192.168.86.72"));
			assert!(!check(T, Cond::Equals, vec![json!("192.168.0.0/16")], "172.168.86.72"));
			assert!(check(T, Cond::NotEquals, vec![json!("192.168.0.0/16")], "172.168.86.72"));
			assert!(check(T, Cond::Excludes, vec![json!("10.0.0.0/8")], "192.168.86.72"));
		}

		#[test]
		fn bare_addresses_match_exactly() {
			assert!(check(T, Cond::Includes, vec![json!("10.0.0.1"), json!("10.0.0.2")], "10.0.0.2"));
			assert!(!check(T, Cond::Equals, vec![json!("10.0.0.1")], "10.0.0.3"));
			assert!(check(T, Cond::Equals, vec![json!("::1")], "::1"));
		}

		#[test]
		fn cidr_against_cidr_is_set_equality() {
			assert!(check(T, Cond::Equals, vec![json!("192.168.0.0/16")], "192.168.1.0/16"));
			assert!(!check(T, Cond::Equals, vec![json!("192.168.0.0/16")], "192.168.1.0/24"));
		}

		#[test]
		fn garbage_never_matches() {
			assert!(!check(T, Cond::Equals, vec![json!("192.168.0.0/16")], "not-an-ip"));
			assert!(!check(T, Cond::NotEquals, vec![json!("192.168.0.0/16")], "not-an-ip"));
			assert!(!check(T, Cond::Greater, vec![json!("10.0.0.1")], "10.0.0.2"));
		}
	}

	#[test]
	fn unknown_field_type_falls_through() {
		assert!(!check(RolloutStrategyFieldType::Unknown, Cond::Equals, vec![json!("x")], "x"));
	}
}
