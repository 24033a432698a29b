//! Error taxonomy shared by the core's port traits and their adapters — a
//! sum of cases, not a DB-specific hierarchy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VentifactError {
    /// Network/connection timeout, deadlock, or serialization-failure retry
    /// exhaustion. The operation may be retried as a whole by the caller.
    #[error("transient database error: {0}")]
    TransientDb(#[source] anyhow::Error),

    /// FK or uniqueness conflict not expected by the protocol — indicates an
    /// invariant bug, not a normal race (those are absorbed by `ON CONFLICT
    /// DO NOTHING`).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored `result_spec` has a length not of the form `1 + 8k`.
    #[error("corrupt result_spec payload for run {0}: length {1}")]
    CorruptPayload(String, usize),

    /// A prior run's stored `members` disagrees with what C6 expects under
    /// the shared `blueprint_id`. Cannot happen if invariants hold.
    #[error("member list mismatch for blueprint {0}")]
    MemberMismatch(i64),

    /// Caller cancelled; the in-flight transaction was rolled back.
    #[error("operation cancelled")]
    Cancelled,

    /// Malformed input to `insert_test_run`, rejected before opening a
    /// transaction.
    #[error("invalid input: {0}")]
    ExternalInput(String),

    /// Anything else, wrapped from `sqlx`/`anyhow` at the adapter boundary.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VentifactError>;
