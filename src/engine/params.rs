//! Host parameter resolution (import/export).
//!
//! A deliberately different resolver from `outcome.rs`: host-parameter
//! rules have **cumulative-merge** semantics. Every enabled rule for the
//! requested target whose hostname condition matches contributes, in sort
//! order — there is no first-match or `last_match` cut-off. Each matching
//! rule dict-merges its `custom_labels` into the running result (later
//! match wins on key collision) and overwrites the scalar `ignore_host`.
//!
//! This divergence from the action resolver is intentional and load-
//! bearing for existing rule bases; do not unify the two.
//!
//! One more call-site quirk preserved on purpose: this resolver lowercases
//! the hostname before matching, the action evaluator does not. The
//! matcher itself stays case-sensitive either way.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::model::{HostParamRule, ParamTarget};
use crate::{Verdict, VerdictValue};

use super::matcher::matches_value;

/// Merged host parameters for one target direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostParams {
    pub custom_labels: BTreeMap<String, String>,
    pub ignore_host: bool,
}

impl HostParams {
    /// Flatten into a verdict fragment for exporters. This is the one
    /// place dict-valued verdict entries come from.
    pub fn to_verdict(&self) -> Verdict {
        let mut verdict = Verdict::new();
        if !self.custom_labels.is_empty() {
            verdict.insert("custom_labels".to_string(), VerdictValue::Map(self.custom_labels.clone()));
        }
        if self.ignore_host {
            verdict.insert("ignore_host".to_string(), VerdictValue::Bool(true));
        }
        verdict
    }
}

/// Merge every matching rule for `target` over `hostname`, in sort order.
pub(crate) fn resolve_params(
    rules: &[HostParamRule],
    hostname: &str,
    target: ParamTarget,
) -> Result<HostParams> {
    let hostname = hostname.to_lowercase();
    let mut params = HostParams::default();

    for rule in rules {
        if rule.target != target {
            continue;
        }
        if !matches_value(&hostname, &rule.pattern, rule.mode, rule.negate)? {
            continue;
        }
        debug!(rule = %rule.name, host = %hostname, target = ?target, "host parameter rule merged");
        for (key, value) in &rule.custom_labels {
            params.custom_labels.insert(key.clone(), value.clone());
        }
        params.ignore_host = rule.ignore_host;
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchMode;

    fn rule(
        name: &str,
        target: ParamTarget,
        pattern: &str,
        labels: &[(&str, &str)],
        ignore_host: bool,
    ) -> HostParamRule {
        HostParamRule {
            id: String::new(),
            name: name.to_string(),
            enabled: true,
            sort_key: 0,
            target,
            pattern: pattern.to_string(),
            mode: MatchMode::Startswith,
            negate: false,
            custom_labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ignore_host,
        }
    }

    #[test]
    fn every_matching_rule_merges_with_later_wins() {
        let rules = vec![
            rule("base", ParamTarget::Import, "web", &[("env", "prod")], false),
            rule("override", ParamTarget::Import, "web", &[("env", "staging"), ("region", "eu")], false),
        ];

        let params = resolve_params(&rules, "web1", ParamTarget::Import).unwrap();
        assert_eq!(params.custom_labels.get("env").map(String::as_str), Some("staging"));
        assert_eq!(params.custom_labels.get("region").map(String::as_str), Some("eu"));
    }

    #[test]
    fn no_cut_off_unlike_the_action_resolver() {
        // Three matching rules all contribute; with first/last-match
        // semantics only one would.
        let rules = vec![
            rule("r1", ParamTarget::Import, "web", &[("a", "1")], false),
            rule("r2", ParamTarget::Import, "web", &[("b", "2")], false),
            rule("r3", ParamTarget::Import, "web", &[("c", "3")], false),
        ];
        let params = resolve_params(&rules, "web1", ParamTarget::Import).unwrap();
        assert_eq!(params.custom_labels.len(), 3);
    }

    #[test]
    fn scalars_are_overwritten_by_each_later_match() {
        let rules = vec![
            rule("sets", ParamTarget::Import, "web", &[], true),
            rule("clears", ParamTarget::Import, "web", &[], false),
        ];
        let params = resolve_params(&rules, "web1", ParamTarget::Import).unwrap();
        assert!(!params.ignore_host);
    }

    #[test]
    fn target_scoping_filters_rules() {
        let rules = vec![
            rule("import-only", ParamTarget::Import, "web", &[("a", "1")], false),
            rule("export-only", ParamTarget::Export, "web", &[("b", "2")], false),
        ];
        let params = resolve_params(&rules, "web1", ParamTarget::Export).unwrap();
        assert!(params.custom_labels.contains_key("b"));
        assert!(!params.custom_labels.contains_key("a"));
    }

    #[test]
    fn params_flatten_into_a_verdict_fragment() {
        let rules = vec![rule("labels", ParamTarget::Export, "web", &[("env", "prod")], true)];
        let params = resolve_params(&rules, "web1", ParamTarget::Export).unwrap();

        let verdict = params.to_verdict();
        assert_eq!(verdict.get("ignore_host"), Some(&VerdictValue::Bool(true)));
        match verdict.get("custom_labels") {
            Some(VerdictValue::Map(map)) => assert_eq!(map.get("env").map(String::as_str), Some("prod")),
            other => panic!("expected map entry, got {other:?}"),
        }
    }

    #[test]
    fn hostname_is_lowercased_before_matching() {
        let rules = vec![rule("lower", ParamTarget::Import, "web", &[("a", "1")], false)];
        let params = resolve_params(&rules, "WEB1", ParamTarget::Import).unwrap();
        assert!(params.custom_labels.contains_key("a"));
    }
}
