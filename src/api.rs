use std::collections::BTreeMap;
use std::time::Instant;

use crate::engine;
use crate::engine::{HostParams, PoolAllocator, ResolveMetrics, RuleTrace};
use crate::error::Result;
use crate::model::{HostContext, ParamTarget, RuleSet};
use crate::store::HostStore;
use crate::Verdict;

/// Resolution context: the collaborators one pass is allowed to touch.
///
/// The allocator is mandatory (folder-pool outcomes need it); the host
/// store is optional — when present, locked-folder changes are persisted
/// through it, otherwise the caller reads the new state off the
/// [`Resolution`] and persists it however it likes.
pub struct Context<'a> {
    pub allocator: &'a PoolAllocator,
    pub hosts: Option<&'a dyn HostStore>,
}

/// Result of one host's resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub hostname: String,
    /// The merged outcome map consumed by exporters.
    pub verdict: Verdict,
    /// Labels after the transform pipeline.
    pub labels: BTreeMap<String, String>,
    /// Side-channel `attribute_<label>` entries from the label pipeline.
    pub attributes: BTreeMap<String, String>,
    /// The host's locked-folder state after this pass.
    pub locked_folder: Option<String>,
}

/// Extra details returned by [`resolve_host_verbose`].
///
/// Intentionally compact: per-rule traces and stage timings, not a dump of
/// internal state.
#[derive(Debug, Clone)]
pub struct ResolveDetails {
    /// One entry per consulted action rule, in evaluation order. The walk
    /// stops early after a `last_match` hit, so this can be shorter than
    /// the rule list.
    pub traces: Vec<RuleTrace>,
    pub metrics: ResolveMetrics,
}

/// Result from [`resolve_host_verbose`].
#[derive(Debug, Clone)]
pub struct ResolutionVerbose {
    pub resolution: Resolution,
    pub details: ResolveDetails,
}

/// Resolve one host against a compiled rule set.
///
/// Runs the label pipeline, walks the action rules over the transformed
/// labels, folds the hit rules' outcomes into a verdict and settles pool
/// state (acquire / sticky reuse / release) through `ctx.allocator`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use hostsort::{Context, HostContext, MemoryPoolStore, PoolAllocator, RuleBook, RuleSet, resolve_host};
///
/// let rules = RuleSet::compile(RuleBook::default()).unwrap();
/// let allocator = PoolAllocator::new(Arc::new(MemoryPoolStore::default()));
/// let host = HostContext::new("web01");
/// let resolution = resolve_host(&host, &rules, &Context { allocator: &allocator, hosts: None }).unwrap();
/// assert!(resolution.verdict.is_empty());
/// ```
pub fn resolve_host(host: &HostContext, rules: &RuleSet, ctx: &Context<'_>) -> Result<Resolution> {
    resolve_host_verbose(host, rules, ctx).map(|verbose| verbose.resolution)
}

/// Resolve one host and return per-rule traces plus stage timings.
///
/// Useful for rule debugging and batch profiling; the happy path is
/// identical to [`resolve_host`].
pub fn resolve_host_verbose(
    host: &HostContext,
    rules: &RuleSet,
    ctx: &Context<'_>,
) -> Result<ResolutionVerbose> {
    let total_start = Instant::now();
    let mut metrics = ResolveMetrics::default();

    let labels_start = Instant::now();
    let (labels, attributes) = engine::transform_labels(rules.labels(), &host.labels)?;
    metrics.labels = labels_start.elapsed();

    // Action rules see the *transformed* labels, not the raw ones.
    let effective = HostContext {
        hostname: host.hostname.clone(),
        labels: labels.clone(),
        locked_folder: host.locked_folder.clone(),
    };

    let evaluate_start = Instant::now();
    let walk = engine::walk(rules.actions(), &effective)?;
    metrics.evaluate = evaluate_start.elapsed();

    let outcomes_start = Instant::now();
    let fold = engine::resolve_outcomes(&walk.hits, &effective, ctx.allocator)?;
    metrics.outcomes = outcomes_start.elapsed();

    if fold.lock_changed {
        if let Some(hosts) = ctx.hosts {
            hosts.save_lock(&host.hostname, fold.locked_folder.clone());
        }
    }

    metrics.total = total_start.elapsed();

    Ok(ResolutionVerbose {
        resolution: Resolution {
            hostname: host.hostname.clone(),
            verdict: fold.verdict,
            labels,
            attributes,
            locked_folder: fold.locked_folder,
        },
        details: ResolveDetails { traces: walk.traces, metrics },
    })
}

/// Run only the label transform pipeline.
///
/// Exposed for connectors that rewrite labels without a full placement
/// pass. Returns (transformed labels, side-channel attributes).
pub fn transform_labels(
    rules: &RuleSet,
    labels: &BTreeMap<String, String>,
) -> Result<(BTreeMap<String, String>, BTreeMap<String, String>)> {
    engine::transform_labels(rules.labels(), labels)
}

/// Resolve import/export host parameters for `hostname`.
///
/// Cumulative-merge semantics: see `engine/params.rs`.
pub fn resolve_host_params(rules: &RuleSet, hostname: &str, target: ParamTarget) -> Result<HostParams> {
    engine::resolve_params(rules.params(), hostname, target)
}
