//! C5: Retention / GC — delete expired runs, collect orphaned blueprints.
//!
//! Open question resolution (documented in DESIGN.md): rather than
//! escalating the whole transaction to serializable isolation, candidate
//! `TestRunBlueprint` rows are locked with `SELECT ... FOR UPDATE` at
//! collection time and re-checked for new referencing `TestRun`s
//! immediately before the final delete.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use sqlx::PgPool;

use ventifact_core::ports::RetentionStore;
use ventifact_core::Result;

use crate::retry::{with_retry, SqlxResultExt};

pub struct PgRetentionStore {
    pool: PgPool,
}

impl PgRetentionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RetentionStore for PgRetentionStore {
    async fn purge_runs_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        with_retry(|| purge_runs_before_once(&self.pool, cutoff)).await
    }

    async fn purge_prs_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        with_retry(|| purge_prs_before_once(&self.pool, cutoff)).await
    }
}

struct Candidate {
    id: i64,
    members: Vec<i64>,
}

async fn purge_runs_before_once(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64> {
    let mut tx = pool.begin().await.ve()?;

    // Step 1: candidate TestRunBlueprints — every referencing TestRun has
    // timestamp < cutoff. Locked now, re-checked before step 6.
    let candidate_rows: Vec<(i64, Vec<i64>)> = sqlx::query_as(
        r#"
        SELECT trb.id, trb.test_blueprint_ids
        FROM test_run_blueprints trb
        WHERE EXISTS (SELECT 1 FROM test_runs tr WHERE tr.blueprint_id = trb.id)
          AND NOT EXISTS (
              SELECT 1 FROM test_runs tr
              WHERE tr.blueprint_id = trb.id AND tr.timestamp >= $1
          )
        FOR UPDATE OF trb
        "#,
    )
    .bind(cutoff)
    .fetch_all(&mut *tx)
    .await
    .ve()?;

    let candidates: Vec<Candidate> = candidate_rows
        .into_iter()
        .map(|(id, members)| Candidate { id, members })
        .collect();
    let candidate_ids: HashSet<i64> = candidates.iter().map(|c| c.id).collect();

    // Step 2: cascade-delete flakes referencing expiring runs.
    sqlx::query(
        r#"
        DELETE FROM test_flakes
        USING test_runs
        WHERE test_flakes.test_run_source = test_runs.source
          AND test_flakes.test_run_ext_id = test_runs.ext_id
          AND test_runs.timestamp < $1
        "#,
    )
    .bind(cutoff)
    .execute(&mut *tx)
    .await
    .ve()?;

    // Step 3: delete expired runs.
    let deleted = sqlx::query(r#"DELETE FROM test_runs WHERE timestamp < $1"#)
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .ve()?
        .rows_affected();

    // Step 4: S = union of candidate members, minus members still claimed by
    // a surviving TestRunBlueprint. Streamed with early exit once S is empty.
    let mut surviving_members: HashSet<i64> =
        candidates.iter().flat_map(|c| c.members.iter().copied()).collect();

    if !surviving_members.is_empty() {
        let mut rows = sqlx::query_as::<_, (i64, Vec<i64>)>(
            r#"SELECT id, test_blueprint_ids FROM test_run_blueprints"#,
        )
        .fetch(&mut *tx);

        while let Some((id, members)) = rows.try_next().await.ve()? {
            if candidate_ids.contains(&id) {
                continue;
            }
            for m in members {
                surviving_members.remove(&m);
            }
            if surviving_members.is_empty() {
                break;
            }
        }
    }

    // Step 5: delete orphaned TestBlueprint rows.
    if !surviving_members.is_empty() {
        let ids: Vec<i64> = surviving_members.into_iter().collect();
        sqlx::query(r#"DELETE FROM test_blueprints WHERE id = ANY($1)"#)
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .ve()?;
    }

    // Step 6: re-check each candidate for a concurrently-inserted run, then
    // delete the TestRunBlueprint rows that are still orphaned.
    let mut still_orphaned = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let still_referenced: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM test_runs WHERE blueprint_id = $1)"#,
        )
        .bind(candidate.id)
        .fetch_one(&mut *tx)
        .await
        .ve()?;
        if !still_referenced {
            still_orphaned.push(candidate.id);
        }
    }
    if !still_orphaned.is_empty() {
        sqlx::query(r#"DELETE FROM test_run_blueprints WHERE id = ANY($1)"#)
            .bind(&still_orphaned)
            .execute(&mut *tx)
            .await
            .ve()?;
    }

    tx.commit().await.ve()?;

    tracing::info!(
        %cutoff,
        deleted_runs = deleted,
        orphaned_run_blueprints = still_orphaned.len(),
        "retention pass complete"
    );

    Ok(deleted)
}

async fn purge_prs_before_once(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64> {
    let mut tx = pool.begin().await.ve()?;
    let deleted = sqlx::query(r#"DELETE FROM prs WHERE merged_at < $1"#)
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .ve()?
        .rows_affected();
    tx.commit().await.ve()?;

    tracing::info!(%cutoff, deleted_prs = deleted, "pr retention pass complete");

    Ok(deleted)
}
