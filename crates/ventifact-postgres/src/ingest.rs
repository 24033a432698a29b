//! C4: Ingest Protocol — transactionally insert a run, deduplicating
//! blueprints.

use async_trait::async_trait;
use sqlx::PgPool;

use ventifact_core::ports::IngestStore;
use ventifact_core::{digest, result_spec, NewTestRun, Result, VentifactError};

use crate::retry::{with_retry, SqlxResultExt};

pub struct PgIngestStore {
    pool: PgPool,
}

impl PgIngestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn validate(run: &NewTestRun) -> Result<()> {
    if run.results.is_empty() {
        return Err(VentifactError::ExternalInput(
            "results must not be empty".into(),
        ));
    }
    if run.id.ext_id <= 0 {
        return Err(VentifactError::ExternalInput(format!(
            "ext_id must be positive, got {}",
            run.id.ext_id
        )));
    }
    if run.id.ext_id > i32::MAX as i64 {
        return Err(VentifactError::ExternalInput(format!(
            "ext_id {} overflows the test_runs.ext_id INTEGER column",
            run.id.ext_id
        )));
    }
    if run.commit_id.is_empty() {
        return Err(VentifactError::ExternalInput(
            "commit_id must not be empty".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl IngestStore for PgIngestStore {
    async fn insert_test_run(&self, run: NewTestRun) -> Result<()> {
        validate(&run)?;

        with_retry(|| insert_test_run_once(&self.pool, &run)).await
    }
}

async fn insert_test_run_once(pool: &PgPool, run: &NewTestRun) -> Result<()> {
    // Step 1: TestBlueprint {id, title} in input order.
    let blueprints: Vec<(i64, &str)> = run
        .results
        .iter()
        .map(|r| (digest::test_blueprint_id(&r.title), r.title.as_str()))
        .collect();

    // Step 2: member ids (input order, duplicates preserved) and the
    // content-addressed run-blueprint id over the sorted set.
    let member_ids: Vec<i64> = blueprints.iter().map(|(id, _)| *id).collect();
    let run_blueprint_id = digest::test_run_blueprint_id(&member_ids);
    let sorted_members = digest::sort_members(&member_ids);

    let mut tx = pool.begin().await.ve()?;

    // Step 3: upsert TestBlueprint rows.
    let (ids, titles): (Vec<i64>, Vec<&str>) = blueprints.into_iter().unzip();
    sqlx::query(
        r#"
        INSERT INTO test_blueprints (id, title)
        SELECT * FROM UNNEST($1::bigint[], $2::text[])
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&ids)
    .bind(&titles as &[&str])
    .execute(&mut *tx)
    .await
    .ve()?;

    // Step 4: upsert TestRunBlueprint, members stored sorted.
    sqlx::query(
        r#"
        INSERT INTO test_run_blueprints (id, test_blueprint_ids)
        VALUES ($1, $2)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(run_blueprint_id)
    .bind(&sorted_members)
    .execute(&mut *tx)
    .await
    .ve()?;

    // Step 5: encode result_spec.
    let result_pairs: Vec<(i64, bool)> = member_ids
        .iter()
        .zip(run.results.iter())
        .map(|(id, r)| (*id, r.passed))
        .collect();
    let result_spec = result_spec::encode(&result_pairs);

    // Step 6: insert TestRun, idempotent on (source, ext_id).
    sqlx::query(
        r#"
        INSERT INTO test_runs (source, ext_id, blueprint_id, timestamp, branch, commit_id, result_spec)
        VALUES ($1::ci_source, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source, ext_id) DO NOTHING
        "#,
    )
    .bind(run.id.source.as_str())
    .bind(run.id.ext_id as i32)
    .bind(run_blueprint_id)
    .bind(run.timestamp)
    .bind(&run.branch)
    .bind(&run.commit_id)
    .bind(&result_spec)
    .execute(&mut *tx)
    .await
    .ve()?;

    tx.commit().await.ve()?;

    tracing::info!(
        source = run.id.source.as_str(),
        ext_id = run.id.ext_id,
        blueprint_id = run_blueprint_id,
        member_count = sorted_members.len(),
        "ingested test run"
    );

    Ok(())
}
