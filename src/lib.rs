//! hostsort: a declarative rule-evaluation engine for host placement.
//!
//! Given a host's identity (hostname) and attribute set (tag/value labels),
//! the engine decides where to place the host (folder assignment, including
//! a capacity-limited shared-pool allocator), which labels to keep,
//! transform or drop, and which extra variables and flags to emit for
//! downstream exporters.
//!
//! The crate is the rule core only: rule storage, connectors, UI and REST
//! exposure are external collaborators. They hand the engine an ordered
//! rule list, a [`HostContext`] and a pool inventory; the engine hands back
//! a [`Verdict`] plus pool/lock state mutations routed through the store
//! seams in [`store`].

mod api;
mod engine;
mod error;
mod model;
mod store;

pub use api::{
    Context, Resolution, ResolutionVerbose, ResolveDetails, resolve_host, resolve_host_params,
    resolve_host_verbose, transform_labels,
};
pub use engine::{HostParams, PoolAllocator, ResolveMetrics, RuleTrace};
pub use error::{EngineError, Result};
pub use model::{
    Combinator, Condition, FolderPool, HostContext, HostParamRule, LabelAction, LabelRule,
    MatchMode, Outcome, ParamTarget, Rule, RuleBook, RuleSet, TransformFlags,
};
pub use store::{HostStore, MemoryHostStore, MemoryPoolStore, PoolStore};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// --- Verdict ------------------------------------------------------------------

/// One value in a [`Verdict`]: exporters consume strings, booleans and
/// string maps, nothing richer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerdictValue {
    Bool(bool),
    Str(String),
    Map(BTreeMap<String, String>),
}

/// The merged outcome map for one host after a resolution pass.
///
/// Well-known keys: `move_folder` (accumulated folder path, omitted when
/// empty), `ignore` and `ignore_host` (terminal flags). Every other key is
/// a rule-assigned variable.
pub type Verdict = BTreeMap<String, VerdictValue>;
