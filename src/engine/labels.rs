//! Label transform pipeline.
//!
//! An independent rule chain that normalizes a host's label map before (or
//! regardless of) action rule evaluation. It runs per (label, value) pair:
//! for each label, the **first** rule whose condition matches the label
//! name wins and no further label rule is consulted — unconditionally,
//! there is no `last_match` equivalent here.
//!
//! The winning rule either removes the pair or keeps it, optionally
//! transformed (see [`TransformFlags`]). Independently of keep/remove, the
//! `use_value_as_attribute` flag emits a side-channel entry
//! `attribute_<label> = value` built from the *original* pair.
//!
//! Labels matched by no rule pass through unchanged.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::model::{LabelRule, TransformFlags};

use super::matcher::matches_value;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Apply a winning rule's transform flags to one string.
fn transform(text: &str, flags: TransformFlags) -> String {
    let mut out = text.to_string();
    if flags.contains(TransformFlags::STRIP) {
        out = out.trim().to_string();
    }
    if flags.contains(TransformFlags::LOWER) {
        out = out.to_lowercase();
    }
    if flags.contains(TransformFlags::REPLACE) {
        out = WHITESPACE.replace_all(&out, "_").into_owned();
    }
    if flags.contains(TransformFlags::REPLACE_SLASH) {
        out = out.replace('/', "-");
    }
    if flags.contains(TransformFlags::REPLACE_HYPHEN) {
        out = out.replace('-', "_");
    }
    if flags.contains(TransformFlags::REPLACE_SPECIAL) {
        // Character substitutions plus the latin1-mojibake umlaut fix.
        out = out.replace('{', "(").replace('}', ")").replace('&', "").replace("Ã¼", "ue");
    }
    out
}

/// Run the label pipeline over `labels`.
///
/// Returns the filtered/transformed label map and the side-channel
/// attribute map. `rules` must already be ordered (see `RuleSet::compile`).
pub(crate) fn transform_labels(
    rules: &[LabelRule],
    labels: &BTreeMap<String, String>,
) -> Result<(BTreeMap<String, String>, BTreeMap<String, String>)> {
    let mut kept = BTreeMap::new();
    let mut attributes = BTreeMap::new();

    'labels: for (label, value) in labels {
        for rule in rules {
            if !matches_value(label, &rule.pattern, rule.mode, rule.negate)? {
                continue;
            }
            // First matching rule wins; nothing below it is consulted.
            let flags = rule.flags();
            if flags.contains(TransformFlags::VALUE_AS_ATTR) {
                attributes.insert(format!("attribute_{label}"), value.clone());
            }
            if !flags.contains(TransformFlags::REMOVE) {
                kept.insert(transform(label, flags), transform(value, flags));
            }
            continue 'labels;
        }
        // No rule matched: pass through unchanged.
        kept.insert(label.clone(), value.clone());
    }

    Ok((kept, attributes))
}
