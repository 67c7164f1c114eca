//! Condition matching primitives.
//!
//! This module evaluates one string predicate: does `value` satisfy
//! `pattern` under a given [`MatchMode`]? Everything above it (rule
//! walking, combinators, tag-pair matching) is built from this single
//! function.
//!
//! ## Semantics
//!
//! - Matching is case-sensitive. Case normalization is the *caller's*
//!   responsibility and call sites are intentionally inconsistent about
//!   applying it (the host-parameter resolver lowercases hostnames, the
//!   action evaluator does not). Do not unify that here.
//! - `InList` splits the pattern on `,` and trims each entry, so
//!   `"a, b ,c"` contains `"b"`.
//! - `Regex` is prefix-anchored (`^(?:pattern)`), not full-string. Existing
//!   rule bases may rely on the prefix behavior, so it is preserved exactly.
//! - `Ignore` always matches and `negate` has no effect on it; `negate`
//!   inverts the result of every other mode.
//!
//! ## Design notes
//!
//! Patterns arrive as data, so regexes cannot be compiled into statics the
//! way a built-in rule table would. Instead a process-wide cache maps
//! pattern text to its compiled automaton: the first evaluation of a rule
//! pays the compile, every later host gets a cheap clone (compiled regexes
//! are internally reference-counted). The `regex` crate matches in linear
//! time without backtracking, which keeps worst-case latency bounded even
//! for hostile patterns.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{EngineError, Result};
use crate::model::MatchMode;

static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Compile `pattern` as a prefix-anchored regex, consulting the cache.
fn compiled(pattern: &str) -> Result<Regex> {
    let mut cache = PATTERN_CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(&format!("^(?:{pattern})"))
        .map_err(|err| EngineError::Configuration(format!("invalid regex '{pattern}': {err}")))?;
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

/// Validate a pattern for `mode` without evaluating it.
///
/// Used by `RuleSet::compile` to surface malformed regexes before any host
/// is resolved. Non-regex modes accept every pattern.
pub(crate) fn precheck(pattern: &str, mode: MatchMode) -> Result<()> {
    if mode == MatchMode::Regex {
        compiled(pattern)?;
    }
    Ok(())
}

/// Evaluate one predicate: does `value` satisfy `pattern` under `mode`?
///
/// `negate` inverts the result for every mode except [`MatchMode::Ignore`],
/// which matches unconditionally.
pub(crate) fn matches_value(value: &str, pattern: &str, mode: MatchMode, negate: bool) -> Result<bool> {
    let hit = match mode {
        MatchMode::Ignore => return Ok(true),
        MatchMode::Equal => value == pattern,
        MatchMode::Contains => value.contains(pattern),
        MatchMode::InList => pattern.split(',').any(|entry| entry.trim() == value),
        MatchMode::Startswith => value.starts_with(pattern),
        MatchMode::Endswith => value.ends_with(pattern),
        MatchMode::Regex => compiled(pattern)?.is_match(value),
    };
    Ok(hit != negate)
}
