//! Outcome folding.
//!
//! Takes the hit rules from a walk (`evaluator.rs`) and folds their
//! outcomes, in rule order, into a single [`Verdict`] for the host:
//!
//! ```text
//! hits ──▶ per-outcome fold ──┬─ terminal flags   (first rule wins)
//!                             ├─ var assignments  (later rules overwrite)
//!                             └─ folder segments  (append, never replace)
//!                                     └─ folder_pool ──▶ allocator (pool.rs)
//! ```
//!
//! Folder-path outcomes accumulate: every segment is normalized and
//! appended to one growing path string. If the accumulated path is still
//! empty after all hit rules, the `move_folder` key is omitted entirely.
//!
//! All fold state is scoped to one host's pass. The only cross-host state
//! is the pool allocator's seat counters, reached exclusively through the
//! acquire/sticky/release contract at the end of this module's fold.

use tracing::debug;

use crate::error::Result;
use crate::model::{HostContext, Outcome, Rule};
use crate::{Verdict, VerdictValue};

use super::pool::{PoolAllocator, normalize_folder};

pub(crate) const KEY_MOVE_FOLDER: &str = "move_folder";
pub(crate) const KEY_IGNORE: &str = "ignore";
pub(crate) const KEY_IGNORE_HOST: &str = "ignore_host";

/// Result of folding one host's hit rules.
#[derive(Debug)]
pub(crate) struct FoldOutput {
    pub verdict: Verdict,
    /// The host's locked-folder state after this pass.
    pub locked_folder: Option<String>,
    /// Whether `locked_folder` differs from the persisted state and must be
    /// written back through the host store.
    pub lock_changed: bool,
}

/// Coerce a var value: `"true"`/`"false"` (case-insensitive) become
/// booleans, everything else stays a string.
fn coerce_var(value: &str) -> VerdictValue {
    if value.eq_ignore_ascii_case("true") {
        VerdictValue::Bool(true)
    } else if value.eq_ignore_ascii_case("false") {
        VerdictValue::Bool(false)
    } else {
        VerdictValue::Str(value.to_string())
    }
}

/// Fold the ordered hit rules into one verdict, consulting the allocator
/// for `folder_pool` outcomes.
pub(crate) fn resolve_outcomes(
    hits: &[&Rule],
    host: &HostContext,
    allocator: &PoolAllocator,
) -> Result<FoldOutput> {
    let mut verdict = Verdict::new();
    let mut folder = String::new();
    let mut pooled_folder: Option<String> = None;
    let mut pool_requested = false;

    for rule in hits {
        for outcome in &rule.outcomes {
            match outcome {
                Outcome::Ignore => {
                    // Terminal flag: the first rule to set it wins.
                    verdict.entry(KEY_IGNORE.to_string()).or_insert(VerdictValue::Bool(true));
                }
                Outcome::IgnoreHost => {
                    verdict.entry(KEY_IGNORE_HOST.to_string()).or_insert(VerdictValue::Bool(true));
                }
                Outcome::Var { name, value } => {
                    verdict.insert(name.clone(), coerce_var(value));
                }
                Outcome::MoveFolder { folder: segment } => {
                    if !segment.trim_matches('/').is_empty() {
                        folder.push_str(&normalize_folder(segment));
                    }
                }
                Outcome::ValueAsFolder { tag } => {
                    if let Some(value) = host.labels.get(tag) {
                        if !value.is_empty() {
                            folder.push_str(&normalize_folder(value));
                        }
                    }
                }
                Outcome::TagAsFolder { value } => {
                    if let Some((name, _)) = host.labels.iter().find(|(_, v)| *v == value) {
                        folder.push_str(&normalize_folder(name));
                    }
                }
                Outcome::FolderPool => {
                    if pool_requested {
                        // A host holds at most one pool folder per pass.
                        continue;
                    }
                    pool_requested = true;
                    let assigned = match &host.locked_folder {
                        // Sticky reuse: the persisted assignment stays and
                        // no new seat is consumed.
                        Some(locked) => {
                            debug!(host = %host.hostname, folder = %locked, "sticky pool folder reused");
                            locked.clone()
                        }
                        None => allocator.acquire(&host.hostname)?,
                    };
                    folder.push_str(&assigned);
                    pooled_folder = Some(assigned);
                }
            }
        }
    }

    let (locked_folder, lock_changed) = match (pool_requested, &host.locked_folder) {
        // Fresh acquire or sticky reuse; changed only when fresh.
        (true, previous) => {
            let changed = previous.as_deref() != pooled_folder.as_deref();
            (pooled_folder, changed)
        }
        // No pool outcome matched but a lock exists: give the seat back,
        // exactly once per pass.
        (false, Some(locked)) => {
            allocator.release(&host.hostname, locked);
            (None, true)
        }
        (false, None) => (None, false),
    };

    if !folder.is_empty() {
        verdict.insert(KEY_MOVE_FOLDER.to_string(), VerdictValue::Str(folder));
    }

    Ok(FoldOutput { verdict, locked_folder, lock_changed })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{Combinator, FolderPool};
    use crate::store::{MemoryPoolStore, PoolStore};

    fn rule(name: &str, outcomes: Vec<Outcome>) -> Rule {
        Rule {
            id: String::new(),
            name: name.to_string(),
            enabled: true,
            sort_key: 0,
            combinator: Combinator::Anyway,
            conditions: Vec::new(),
            outcomes,
            last_match: false,
        }
    }

    fn allocator(pools: Vec<FolderPool>) -> (Arc<MemoryPoolStore>, PoolAllocator) {
        let store = Arc::new(MemoryPoolStore::new(pools));
        let alloc = PoolAllocator::new(store.clone());
        (store, alloc)
    }

    fn pool(name: &str, capacity: u32, seats_taken: u32) -> FolderPool {
        FolderPool { name: name.to_string(), capacity, seats_taken, enabled: true }
    }

    #[test]
    fn folder_segments_accumulate() {
        let host = HostContext::new("web01").with_label("env", "Web");
        let hits = [
            rule("base", vec![Outcome::MoveFolder { folder: "/Prod/".to_string() }]),
            rule("by-env", vec![Outcome::ValueAsFolder { tag: "env".to_string() }]),
        ];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (_, alloc) = allocator(vec![]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(out.verdict.get(KEY_MOVE_FOLDER), Some(&VerdictValue::Str("/prod/web".to_string())));
    }

    #[test]
    fn empty_folder_key_is_omitted() {
        let host = HostContext::new("web01");
        let hits = [rule("vars-only", vec![Outcome::Var { name: "x".to_string(), value: "1".to_string() }])];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (_, alloc) = allocator(vec![]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert!(!out.verdict.contains_key(KEY_MOVE_FOLDER));
        assert_eq!(out.verdict.get("x"), Some(&VerdictValue::Str("1".to_string())));
    }

    #[test]
    fn var_values_coerce_booleans_and_overwrite() {
        let host = HostContext::new("web01");
        let hits = [
            rule("first", vec![Outcome::Var { name: "monitored".to_string(), value: "TRUE".to_string() }]),
            rule("second", vec![Outcome::Var { name: "monitored".to_string(), value: "False".to_string() }]),
            rule("third", vec![Outcome::Var { name: "zone".to_string(), value: "dmz".to_string() }]),
        ];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (_, alloc) = allocator(vec![]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(out.verdict.get("monitored"), Some(&VerdictValue::Bool(false)));
        assert_eq!(out.verdict.get("zone"), Some(&VerdictValue::Str("dmz".to_string())));
    }

    #[test]
    fn terminal_flags_are_first_wins_while_others_accumulate() {
        let host = HostContext::new("web01");
        let hits = [
            rule("ignorer", vec![Outcome::Ignore]),
            rule("later", vec![Outcome::Ignore, Outcome::Var { name: "x".to_string(), value: "1".to_string() }]),
        ];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (_, alloc) = allocator(vec![]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(out.verdict.get(KEY_IGNORE), Some(&VerdictValue::Bool(true)));
        assert_eq!(out.verdict.get("x"), Some(&VerdictValue::Str("1".to_string())));
    }

    #[test]
    fn tag_as_folder_appends_the_matching_tag_name() {
        let host = HostContext::new("web01").with_label("Datacenter", "fra2");
        let hits = [rule("dc", vec![Outcome::TagAsFolder { value: "fra2".to_string() }])];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (_, alloc) = allocator(vec![]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(out.verdict.get(KEY_MOVE_FOLDER), Some(&VerdictValue::Str("/datacenter".to_string())));
    }

    #[test]
    fn fresh_pool_assignment_takes_a_seat_and_locks() {
        let host = HostContext::new("web01");
        let hits = [rule("pooled", vec![Outcome::FolderPool])];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (store, alloc) = allocator(vec![pool("pool_a", 2, 0)]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(out.locked_folder.as_deref(), Some("/pool_a"));
        assert!(out.lock_changed);
        assert_eq!(store.get("pool_a").unwrap().seats_taken, 1);
        assert_eq!(out.verdict.get(KEY_MOVE_FOLDER), Some(&VerdictValue::Str("/pool_a".to_string())));
    }

    #[test]
    fn sticky_reuse_consumes_no_seat() {
        let mut host = HostContext::new("web01");
        host.locked_folder = Some("/pool_b".to_string());
        let hits = [rule("pooled", vec![Outcome::FolderPool])];
        let refs: Vec<&Rule> = hits.iter().collect();
        // pool_a has a free seat and sorts first, but the lock wins.
        let (store, alloc) = allocator(vec![pool("pool_a", 2, 0), pool("pool_b", 2, 2)]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(out.locked_folder.as_deref(), Some("/pool_b"));
        assert!(!out.lock_changed);
        assert_eq!(store.get("pool_a").unwrap().seats_taken, 0);
        assert_eq!(store.get("pool_b").unwrap().seats_taken, 2);
        assert_eq!(out.verdict.get(KEY_MOVE_FOLDER), Some(&VerdictValue::Str("/pool_b".to_string())));
    }

    #[test]
    fn stale_lock_is_released_when_no_pool_outcome_hits() {
        let mut host = HostContext::new("web01");
        host.locked_folder = Some("/pool_a".to_string());
        let hits = [rule("plain", vec![Outcome::MoveFolder { folder: "/static".to_string() }])];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (store, alloc) = allocator(vec![pool("pool_a", 2, 1)]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(out.locked_folder, None);
        assert!(out.lock_changed);
        assert_eq!(store.get("pool_a").unwrap().seats_taken, 0);
    }

    #[test]
    fn exhausted_pools_fail_the_host() {
        let host = HostContext::new("web01");
        let hits = [rule("pooled", vec![Outcome::FolderPool])];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (store, alloc) = allocator(vec![pool("pool_a", 2, 2)]);

        let err = resolve_outcomes(&refs, &host, &alloc).unwrap_err();
        assert!(matches!(err, crate::EngineError::PoolExhausted { .. }));
        assert_eq!(store.get("pool_a").unwrap().seats_taken, 2);
    }

    #[test]
    fn second_folder_pool_outcome_is_a_noop() {
        let host = HostContext::new("web01");
        let hits = [rule("pooled", vec![Outcome::FolderPool, Outcome::FolderPool])];
        let refs: Vec<&Rule> = hits.iter().collect();
        let (store, alloc) = allocator(vec![pool("pool_a", 2, 0)]);

        let out = resolve_outcomes(&refs, &host, &alloc).unwrap();
        assert_eq!(store.get("pool_a").unwrap().seats_taken, 1);
        assert_eq!(out.verdict.get(KEY_MOVE_FOLDER), Some(&VerdictValue::Str("/pool_a".to_string())));
    }
}
