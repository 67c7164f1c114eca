//! Rule data model.
//!
//! Everything in this module is plain data: rules are authored elsewhere
//! (an admin UI, a YAML import, a REST payload) and arrive here as ordered,
//! serde-deserialized records. The engine treats them as read-only for the
//! duration of a resolution pass.
//!
//! There are three independent rule families, each with its own evaluation
//! semantics (see `src/engine.rs`):
//!
//! - [`Rule`]: action rules deciding folder placement, variables and
//!   ignore flags for a host.
//! - [`LabelRule`]: per-label rewrite rules (keep / drop / transform).
//! - [`HostParamRule`]: import/export host-parameter rules with
//!   cumulative-merge semantics.
//!
//! [`RuleSet::compile`] turns raw rule lists into an ordered, validated set:
//! disabled rules are dropped, ordering is fixed (ascending sort key, ties
//! broken by declaration order), and regex patterns are compiled eagerly so
//! malformed rules surface before any host is resolved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::matcher;
use crate::error::Result;

fn default_true() -> bool {
    true
}

// --- Conditions ---------------------------------------------------------------

/// How a single pattern is tested against a value.
///
/// `Regex` is prefix-anchored: the pattern must match at the start of the
/// value, not necessarily the whole value. Existing rule bases rely on this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Equal,
    Contains,
    InList,
    Startswith,
    Endswith,
    Regex,
    /// Always matches; `negate` has no effect on it.
    Ignore,
}

/// A single predicate over a host.
///
/// Tag conditions carry two independent mode/negate pairs, one for the tag
/// name and one for its value, combined by AND: the condition holds for a
/// (name, value) pair when both sides match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Hostname {
        pattern: String,
        #[serde(default)]
        mode: MatchMode,
        #[serde(default)]
        negate: bool,
    },
    Tag {
        name: String,
        #[serde(default)]
        name_mode: MatchMode,
        #[serde(default)]
        name_negate: bool,
        #[serde(default)]
        value: String,
        #[serde(default)]
        value_mode: MatchMode,
        #[serde(default)]
        value_negate: bool,
    },
}

/// Per-rule combinator over its conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// Hit iff no condition fails. An empty condition list hits.
    #[default]
    All,
    /// Hit iff at least one condition matches.
    Any,
    /// Always hits, conditions are not consulted.
    Anyway,
}

// --- Action rules -------------------------------------------------------------

/// Effect applied when an action rule hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outcome {
    /// Append a fixed folder path segment.
    MoveFolder { folder: String },
    /// Append a folder allocated from the capacity-limited pool store.
    FolderPool,
    /// Append the value of the tag named by `tag`.
    ValueAsFolder { tag: String },
    /// Append the name of the tag whose value equals `value`.
    TagAsFolder { value: String },
    /// Terminal flag: exclude this object from the export target.
    Ignore,
    /// Terminal flag: exclude the host entirely.
    IgnoreHost,
    /// Assign a named variable. `"true"`/`"false"` coerce to booleans.
    Var {
        name: String,
        #[serde(default)]
        value: String,
    },
}

/// A declarative action rule: ordered conditions, a combinator, ordered
/// outcomes and a priority.
///
/// `last_match` halts evaluation of lower-precedence rules once this rule
/// hits, even if that leaves pool or ignore outcomes unresolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_key: i64,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
    #[serde(default)]
    pub last_match: bool,
}

// --- Label rules --------------------------------------------------------------

/// Transform applied by a winning label rule.
///
/// `Remove` drops the pair entirely; all other actions keep it, optionally
/// transformed. `UseValueAsAttribute` additionally emits a side-channel
/// `attribute_<label>` entry independent of whether the label is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelAction {
    Remove,
    Strip,
    Lower,
    Replace,
    ReplaceSlash,
    ReplaceHyphen,
    ReplaceSpecial,
    UseValueAsAttribute,
}

bitflags::bitflags! {
    /// Compiled form of a label rule's action list.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransformFlags: u16 {
        const REMOVE          = 1 << 0;
        const STRIP           = 1 << 1;
        const LOWER           = 1 << 2;
        const REPLACE         = 1 << 3;
        const REPLACE_SLASH   = 1 << 4;
        const REPLACE_HYPHEN  = 1 << 5;
        const REPLACE_SPECIAL = 1 << 6;
        const VALUE_AS_ATTR   = 1 << 7;
    }
}

/// A per-label rewrite rule. The condition tests the label *name*; the
/// first matching rule wins and no further label rule is consulted for
/// that label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_key: i64,
    pub pattern: String,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub actions: Vec<LabelAction>,
}

impl LabelRule {
    /// Fold the action list into a flag set.
    pub fn flags(&self) -> TransformFlags {
        let mut flags = TransformFlags::empty();
        for action in &self.actions {
            flags |= match action {
                LabelAction::Remove => TransformFlags::REMOVE,
                LabelAction::Strip => TransformFlags::STRIP,
                LabelAction::Lower => TransformFlags::LOWER,
                LabelAction::Replace => TransformFlags::REPLACE,
                LabelAction::ReplaceSlash => TransformFlags::REPLACE_SLASH,
                LabelAction::ReplaceHyphen => TransformFlags::REPLACE_HYPHEN,
                LabelAction::ReplaceSpecial => TransformFlags::REPLACE_SPECIAL,
                LabelAction::UseValueAsAttribute => TransformFlags::VALUE_AS_ATTR,
            };
        }
        flags
    }
}

// --- Host parameter rules -----------------------------------------------------

/// Which connector direction a host-parameter rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamTarget {
    Import,
    Export,
}

/// Import/export host-parameter rule.
///
/// Unlike action rules these have no first/last-match semantics: every
/// enabled, hostname-matching rule contributes, later matches winning on
/// key collisions. See `engine/params.rs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostParamRule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_key: i64,
    pub target: ParamTarget,
    pub pattern: String,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub custom_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub ignore_host: bool,
}

// --- Pools and hosts ----------------------------------------------------------

/// A named, capacity-bounded shared folder bucket.
///
/// Invariant: `0 <= seats_taken <= capacity`, maintained by the allocator
/// (`engine/pool.rs`). The store only persists what the allocator decides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderPool {
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub seats_taken: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl FolderPool {
    pub fn has_free_seat(&self) -> bool {
        self.seats_taken < self.capacity
    }
}

/// One host's identity and attribute set as seen by a resolution pass.
///
/// `locked_folder` is the persisted sticky pool assignment from earlier
/// passes, if any. The label map keys are unique by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostContext {
    pub hostname: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub locked_folder: Option<String>,
}

impl HostContext {
    pub fn new(hostname: impl Into<String>) -> Self {
        HostContext { hostname: hostname.into(), labels: BTreeMap::new(), locked_folder: None }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }
}

// --- Rule sets ----------------------------------------------------------------

/// Raw rule lists as loaded from storage or a JSON file, prior to
/// compilation. This is the CLI input shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBook {
    #[serde(default)]
    pub actions: Vec<Rule>,
    #[serde(default)]
    pub labels: Vec<LabelRule>,
    #[serde(default)]
    pub params: Vec<HostParamRule>,
}

/// An ordered, validated, immutable rule set.
///
/// Construction fixes the evaluation order once; resolution functions take
/// a `&RuleSet` and keep no hidden per-instance state.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    actions: Vec<Rule>,
    labels: Vec<LabelRule>,
    params: Vec<HostParamRule>,
}

impl RuleSet {
    /// Compile raw rule lists into an ordered set.
    ///
    /// Drops disabled rules, sorts each family by ascending `sort_key`
    /// (stable, so ties keep declaration order) and eagerly compiles every
    /// regex pattern. A malformed pattern fails the whole compile with
    /// [`crate::EngineError::Configuration`].
    pub fn compile(book: RuleBook) -> Result<Self> {
        let RuleBook { mut actions, mut labels, mut params } = book;

        actions.retain(|r| r.enabled);
        actions.sort_by_key(|r| r.sort_key);
        labels.retain(|r| r.enabled);
        labels.sort_by_key(|r| r.sort_key);
        params.retain(|r| r.enabled);
        params.sort_by_key(|r| r.sort_key);

        for rule in &actions {
            for cond in &rule.conditions {
                match cond {
                    Condition::Hostname { pattern, mode, .. } => {
                        matcher::precheck(pattern, *mode)?;
                    }
                    Condition::Tag { name, name_mode, value, value_mode, .. } => {
                        matcher::precheck(name, *name_mode)?;
                        matcher::precheck(value, *value_mode)?;
                    }
                }
            }
        }
        for rule in &labels {
            matcher::precheck(&rule.pattern, rule.mode)?;
        }
        for rule in &params {
            matcher::precheck(&rule.pattern, rule.mode)?;
        }

        Ok(RuleSet { actions, labels, params })
    }

    pub fn actions(&self) -> &[Rule] {
        &self.actions
    }

    pub fn labels(&self) -> &[LabelRule] {
        &self.labels
    }

    pub fn params(&self) -> &[HostParamRule] {
        &self.params
    }
}
