//! Engine error types.
//!
//! The engine has exactly two failure modes, both fatal for the host being
//! resolved:
//!
//! - [`EngineError::Configuration`]: a malformed rule (invalid regex,
//!   unknown outcome or condition kind). Raised at rule-set compile time or
//!   at evaluation time, never silently skipped.
//! - [`EngineError::PoolExhausted`]: a host required pool placement and no
//!   enabled pool had a free seat. Raised with no partial seat mutation
//!   left behind.
//!
//! A no-match pass is *not* an error; it yields an empty (or partially
//! filled) verdict. The engine performs no retries or recovery — batch
//! callers decide whether to skip the host or abort the run.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no free seat in any enabled folder pool for host '{hostname}'")]
    PoolExhausted { hostname: String },
}
