use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ventifact_core::ports::{IngestStore, RetentionStore};
use ventifact_core::{CiSource, NewTestRun, TestResult, TestRunId};
use ventifact_postgres::{PgIngestStore, PgRetentionStore};

mod common;
use common::init_test_tracing;

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn run(ext_id: i64, timestamp: DateTime<Utc>, results: Vec<TestResult>) -> NewTestRun {
    NewTestRun {
        id: TestRunId {
            source: CiSource::Circleci,
            ext_id,
        },
        results,
        timestamp,
        branch: Some("main".into()),
        commit_id: vec![0x01, ext_id as u8],
    }
}

fn result(title: &str, passed: bool) -> TestResult {
    TestResult {
        title: title.into(),
        passed,
    }
}

#[sqlx::test]
async fn expired_run_is_deleted_and_orphaned_blueprint_gced(pool: PgPool) -> anyhow::Result<()> {
    init_test_tracing();
    let ingest = PgIngestStore::new(pool.clone());
    let retention = PgRetentionStore::new(pool.clone());

    let old_ts = ts(1_000_000_000);
    ingest
        .insert_test_run(run(1, old_ts, vec![result("only", true)]))
        .await?;

    let cutoff = ts(1_000_000_100);
    let deleted = retention.purge_runs_before(cutoff).await?;
    assert_eq!(deleted, 1);

    let run_count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM test_runs"#)
        .fetch_one(&pool)
        .await?;
    assert_eq!(run_count, 0);

    let blueprint_count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM test_blueprints"#)
        .fetch_one(&pool)
        .await?;
    assert_eq!(blueprint_count, 0, "blueprint with no remaining referencing run must be GCed");
    Ok(())
}

#[sqlx::test]
async fn blueprint_still_used_by_a_live_run_survives(pool: PgPool) -> anyhow::Result<()> {
    init_test_tracing();
    let ingest = PgIngestStore::new(pool.clone());
    let retention = PgRetentionStore::new(pool.clone());

    let old_ts = ts(1_000_000_000);
    let fresh_ts = ts(2_000_000_000);

    // Both runs share the same test-set shape, so one surviving run keeps
    // the blueprint alive even after the older run expires.
    ingest
        .insert_test_run(run(10, old_ts, vec![result("shared", true)]))
        .await?;
    ingest
        .insert_test_run(run(11, fresh_ts, vec![result("shared", true)]))
        .await?;

    let cutoff = ts(1_500_000_000);
    let deleted = retention.purge_runs_before(cutoff).await?;
    assert_eq!(deleted, 1);

    let blueprint_count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM test_blueprints"#)
        .fetch_one(&pool)
        .await?;
    assert_eq!(blueprint_count, 1, "blueprint referenced by the surviving run must not be GCed");

    let run_blueprint_count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM test_run_blueprints"#)
        .fetch_one(&pool)
        .await?;
    assert_eq!(run_blueprint_count, 1);
    Ok(())
}

#[sqlx::test]
async fn purge_runs_before_is_idempotent(pool: PgPool) -> anyhow::Result<()> {
    init_test_tracing();
    let ingest = PgIngestStore::new(pool.clone());
    let retention = PgRetentionStore::new(pool.clone());

    ingest
        .insert_test_run(run(20, ts(1_000_000_000), vec![result("a", true)]))
        .await?;

    let cutoff = ts(1_000_000_100);
    let first = retention.purge_runs_before(cutoff).await?;
    let second = retention.purge_runs_before(cutoff).await?;
    assert_eq!(first, 1);
    assert_eq!(second, 0);
    Ok(())
}

#[sqlx::test]
async fn purge_prs_before_deletes_only_expired_rows(pool: PgPool) -> anyhow::Result<()> {
    init_test_tracing();
    let retention = PgRetentionStore::new(pool.clone());

    sqlx::query(
        r#"INSERT INTO prs (number, merged_at, status) VALUES (1, $1, 'success'), (2, $2, 'success')"#,
    )
    .bind(ts(1_000_000_000))
    .bind(ts(3_000_000_000))
    .execute(&pool)
    .await?;

    let deleted = retention.purge_prs_before(ts(2_000_000_000)).await?;
    assert_eq!(deleted, 1);

    let remaining: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM prs"#)
        .fetch_one(&pool)
        .await?;
    assert_eq!(remaining, 1);
    Ok(())
}
