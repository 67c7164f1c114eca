//! Rule evaluation engine.
//!
//! This module is the front door for the engine internals, split into
//! focused submodules under `src/engine/` while keeping paths stable (for
//! example `crate::engine::PoolAllocator`).
//!
//! ## How the parts work together
//!
//! Resolving one host is a pipeline:
//!
//! ```text
//! rule lists ────▶ RuleSet::compile          (model.rs: order + validate)
//!                        │
//! host labels ── transform_labels ───────────▶ (labels.rs: rewrite chain)
//!                        │
//! hostname + labels ── walk ─────────────────▶ (evaluator.rs: hit rules)
//!                        │
//!                 resolve_outcomes ──────────▶ (outcome.rs: fold verdict)
//!                        │        └─ folder_pool ─▶ PoolAllocator (pool.rs)
//!                        ▼
//!                     Verdict
//! ```
//!
//! Host-parameter rules take a separate path (`params.rs`) with cumulative
//! merge semantics instead of the fold above.
//!
//! ## Responsibilities by module
//!
//! - `matcher.rs`: one string predicate, all match modes, regex cache.
//! - `evaluator.rs`: ordered rule walk, combinators, `last_match` stop.
//! - `labels.rs`: per-label rewrite chain with a side-channel attribute map.
//! - `outcome.rs`: folds hit rules into one verdict.
//! - `pool.rs`: stateful, capacity-limited folder pool allocator.
//! - `params.rs`: cumulative-merge import/export parameter resolver.
//! - `metrics.rs`: opt-in timing data for runs.
//!
//! ## Debugging
//!
//! The engine logs rule hits and pool decisions at `debug` level via
//! `tracing`; the CLI installs a subscriber honoring `RUST_LOG`.

#[path = "engine/evaluator.rs"]
mod evaluator;
#[path = "engine/labels.rs"]
mod labels;
#[path = "engine/matcher.rs"]
pub(crate) mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/outcome.rs"]
mod outcome;
#[path = "engine/params.rs"]
mod params;
#[path = "engine/pool.rs"]
mod pool;

pub use evaluator::RuleTrace;
pub use metrics::ResolveMetrics;
pub use params::HostParams;
pub use pool::PoolAllocator;

pub(crate) use evaluator::walk;
pub(crate) use labels::transform_labels;
pub(crate) use outcome::resolve_outcomes;
pub(crate) use params::resolve_params;
