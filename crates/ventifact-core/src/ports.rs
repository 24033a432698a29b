//! Storage port traits — implemented by `ventifact-postgres`.
//! Core logic depends only on these traits, never on sqlx directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Transactionally insert a run, deduplicating blueprints.
#[async_trait]
pub trait IngestStore: Send + Sync {
    /// Idempotent: calling this twice with the same `run.id` leaves the
    /// database in the same state as calling it once (Testable Property 4).
    async fn insert_test_run(&self, run: NewTestRun) -> Result<()>;
}

/// Delete expired runs and collect orphaned blueprints.
#[async_trait]
pub trait RetentionStore: Send + Sync {
    /// Deletes every `TestRun` (and cascaded `TestFlake`) with
    /// `timestamp < cutoff`, then garbage-collects any `TestRunBlueprint`/
    /// `TestBlueprint` left with no referencing row. Returns the number of
    /// `TestRun` rows deleted. Idempotent (Testable Property 5).
    async fn purge_runs_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Deletes `Pr` rows with `merged_at < cutoff`. Shares retention
    /// semantics with `purge_runs_before` but has no dedup graph to cascade.
    async fn purge_prs_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Windowed per-`(blueprint, commit)` diff of result specs.
#[async_trait]
pub trait FlakeStore: Send + Sync {
    /// Scans reruns with `timestamp > watermark`, diffs each against the
    /// immediately-previous run in its `(blueprint_id, commit_id)`
    /// partition, and inserts one `TestFlake` per member whose outcome
    /// flipped, attributed to the failing-side run. Returns the count of
    /// newly inserted flakes. Idempotent under the `(source, ext_id,
    /// test_id)` composite key (Testable Property 6).
    async fn mark_flakes_since(&self, watermark: DateTime<Utc>) -> Result<u64>;
}

/// Consumer read operations used by the (out-of-scope) dashboard, specified
/// here because the core owns their contract.
#[async_trait]
pub trait ReadModel: Send + Sync {
    async fn fetch_recent_test_runs(
        &self,
        count: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RecentTestRun>>;

    async fn fetch_recent_test_flakes(
        &self,
        count: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RecentTestFlake>>;

    async fn stream_prs_by_merged_at_asc(&self) -> Result<Vec<Pr>>;

    async fn count_pr_statuses_by_date(&self) -> Result<Vec<PrStatusBucket>>;
}
