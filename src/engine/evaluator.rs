//! Ordered rule walking.
//!
//! Given the compiled action rules (already enabled-filtered and sorted by
//! `RuleSet::compile`) and one host, this module decides which rules *hit*.
//! Outcome accumulation over the hits happens in `outcome.rs`; this module
//! only answers "does this rule apply to this host?" and "where does the
//! walk stop?".
//!
//! ## Combinators
//!
//! - `Any`: at least one condition matches.
//! - `All`: no condition fails. An empty condition list therefore hits.
//! - `Anyway`: always hits, conditions are not consulted.
//!
//! Hostname conditions test the hostname; tag conditions test existence of
//! any (name, value) label pair where both the name-match and the
//! value-match succeed.
//!
//! ## last_match
//!
//! A hit rule with `last_match` set halts the walk entirely: lower-
//! precedence rules are not consulted, even if that leaves pool or ignore
//! outcomes unresolved. The walk records this in the trace so verbose
//! callers can see *why* later rules never ran.

use tracing::debug;

use crate::error::Result;
use crate::model::{Combinator, Condition, HostContext, Rule};

use super::matcher::matches_value;

/// One entry of a walk trace: which rule was consulted and what happened.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    pub rule: String,
    pub hit: bool,
    /// True when this rule hit with `last_match` set and stopped the walk.
    pub terminated: bool,
}

/// Result of walking the rule list for one host.
#[derive(Debug)]
pub(crate) struct Walk<'a> {
    /// Hit rules, in evaluation order.
    pub hits: Vec<&'a Rule>,
    pub traces: Vec<RuleTrace>,
}

/// Evaluate a single condition against a host.
fn condition_matches(cond: &Condition, host: &HostContext) -> Result<bool> {
    match cond {
        Condition::Hostname { pattern, mode, negate } => {
            matches_value(&host.hostname, pattern, *mode, *negate)
        }
        Condition::Tag { name, name_mode, name_negate, value, value_mode, value_negate } => {
            for (label, label_value) in &host.labels {
                if matches_value(label, name, *name_mode, *name_negate)?
                    && matches_value(label_value, value, *value_mode, *value_negate)?
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Apply a rule's combinator over its conditions.
pub(crate) fn rule_hits(rule: &Rule, host: &HostContext) -> Result<bool> {
    match rule.combinator {
        Combinator::Anyway => Ok(true),
        Combinator::Any => {
            for cond in &rule.conditions {
                if condition_matches(cond, host)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Combinator::All => {
            // No condition can fail; zero conditions hit by definition.
            for cond in &rule.conditions {
                if !condition_matches(cond, host)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

/// Walk the ordered rule list for `host`, collecting hit rules until the
/// list ends or a hit rule with `last_match` stops the walk.
pub(crate) fn walk<'a>(rules: &'a [Rule], host: &HostContext) -> Result<Walk<'a>> {
    let mut hits = Vec::new();
    let mut traces = Vec::new();

    for rule in rules {
        let hit = rule_hits(rule, host)?;
        let terminated = hit && rule.last_match;
        if hit {
            debug!(rule = %rule.name, host = %host.hostname, last_match = rule.last_match, "rule hit");
            hits.push(rule);
        }
        traces.push(RuleTrace { rule: rule.name.clone(), hit, terminated });
        if terminated {
            break;
        }
    }

    Ok(Walk { hits, traces })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Combinator, MatchMode, Outcome};

    fn rule(name: &str, combinator: Combinator, conditions: Vec<Condition>) -> Rule {
        Rule {
            id: String::new(),
            name: name.to_string(),
            enabled: true,
            sort_key: 0,
            combinator,
            conditions,
            outcomes: vec![Outcome::Ignore],
            last_match: false,
        }
    }

    fn hostname_cond(pattern: &str, mode: MatchMode) -> Condition {
        Condition::Hostname { pattern: pattern.to_string(), mode, negate: false }
    }

    fn tag_cond(name: &str, value: &str) -> Condition {
        Condition::Tag {
            name: name.to_string(),
            name_mode: MatchMode::Equal,
            name_negate: false,
            value: value.to_string(),
            value_mode: MatchMode::Equal,
            value_negate: false,
        }
    }

    fn host() -> HostContext {
        HostContext::new("web01").with_label("env", "prod").with_label("role", "frontend")
    }

    #[test]
    fn all_with_zero_conditions_always_hits() {
        let r = rule("empty-all", Combinator::All, vec![]);
        assert!(rule_hits(&r, &host()).unwrap());
    }

    #[test]
    fn all_requires_every_condition() {
        let r = rule(
            "both",
            Combinator::All,
            vec![hostname_cond("web", MatchMode::Startswith), tag_cond("env", "prod")],
        );
        assert!(rule_hits(&r, &host()).unwrap());

        let r = rule(
            "one-fails",
            Combinator::All,
            vec![hostname_cond("web", MatchMode::Startswith), tag_cond("env", "staging")],
        );
        assert!(!rule_hits(&r, &host()).unwrap());
    }

    #[test]
    fn any_needs_a_single_match() {
        let r = rule(
            "either",
            Combinator::Any,
            vec![hostname_cond("db", MatchMode::Startswith), tag_cond("role", "frontend")],
        );
        assert!(rule_hits(&r, &host()).unwrap());

        let r = rule("neither", Combinator::Any, vec![hostname_cond("db", MatchMode::Startswith)]);
        assert!(!rule_hits(&r, &host()).unwrap());
    }

    #[test]
    fn anyway_ignores_conditions() {
        let r = rule("fallback", Combinator::Anyway, vec![tag_cond("nope", "nope")]);
        assert!(rule_hits(&r, &host()).unwrap());
    }

    #[test]
    fn tag_condition_needs_both_sides_on_one_pair() {
        // "env" exists and "frontend" exists, but never on the same pair.
        let r = rule("split-pair", Combinator::All, vec![tag_cond("env", "frontend")]);
        assert!(!rule_hits(&r, &host()).unwrap());
    }

    #[test]
    fn last_match_stops_the_walk() {
        let mut r1 = rule("first", Combinator::Anyway, vec![]);
        r1.last_match = false;
        let mut r2 = rule("stopper", Combinator::Anyway, vec![]);
        r2.last_match = true;
        let r3 = rule("unreached", Combinator::Anyway, vec![]);

        let rules = vec![r1, r2, r3];
        let walk = walk(&rules, &host()).unwrap();

        let names: Vec<&str> = walk.hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "stopper"]);
        assert_eq!(walk.traces.len(), 2);
        assert!(walk.traces[1].terminated);
    }

    #[test]
    fn miss_with_last_match_does_not_stop() {
        let mut r1 = rule("miss", Combinator::Any, vec![hostname_cond("db", MatchMode::Startswith)]);
        r1.last_match = true;
        let r2 = rule("still-runs", Combinator::Anyway, vec![]);

        let rules = vec![r1, r2];
        let walk = walk(&rules, &host()).unwrap();
        let names: Vec<&str> = walk.hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["still-runs"]);
        assert!(!walk.traces[0].terminated);
    }
}
