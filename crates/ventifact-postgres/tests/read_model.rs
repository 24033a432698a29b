use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ventifact_core::ports::{IngestStore, ReadModel};
use ventifact_core::{CiSource, NewTestRun, PrStatus, TestResult, TestRunId};
use ventifact_postgres::{PgIngestStore, PgReadModel};

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
        commit_id: vec![0x10, ext_id as u8],
    }
}

fn result(title: &str, passed: bool) -> TestResult {
    TestResult {
        title: title.into(),
        passed,
    }
}

#[sqlx::test]
async fn fetch_recent_test_runs_orders_newest_first(pool: PgPool) -> anyhow::Result<()> {
    init_test_tracing();
    let ingest = PgIngestStore::new(pool.clone());
    let read_model = PgReadModel::new(pool.clone());

    ingest
        .insert_test_run(run(1, ts(1_700_000_000), vec![result("a", true)]))
        .await?;
    ingest
        .insert_test_run(run(2, ts(1_700_000_100), vec![result("a", false)]))
        .await?;

    let recent = read_model.fetch_recent_test_runs(10, None).await?;
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id.ext_id, 2);
    assert!(!recent[0].succeeded);
    assert_eq!(recent[1].id.ext_id, 1);
    assert!(recent[1].succeeded);
    Ok(())
}

#[sqlx::test]
async fn fetch_recent_test_runs_respects_since_cursor(pool: PgPool) -> anyhow::Result<()> {
    init_test_tracing();
    let ingest = PgIngestStore::new(pool.clone());
    let read_model = PgReadModel::new(pool.clone());

    ingest
        .insert_test_run(run(1, ts(1_700_000_000), vec![result("a", true)]))
        .await?;
    ingest
        .insert_test_run(run(2, ts(1_700_000_100), vec![result("a", true)]))
        .await?;

    let recent = read_model
        .fetch_recent_test_runs(10, Some(ts(1_700_000_050)))
        .await?;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id.ext_id, 2);
    Ok(())
}

#[sqlx::test]
async fn count_pr_statuses_by_date_buckets_per_day(pool: PgPool) -> anyhow::Result<()> {
    init_test_tracing();
    let read_model = PgReadModel::new(pool.clone());

    sqlx::query(
        r#"INSERT INTO prs (number, merged_at, status) VALUES
           (1, '2026-01-01T10:00:00Z', 'success'),
           (2, '2026-01-01T12:00:00Z', 'success'),
           (3, '2026-01-02T09:00:00Z', 'failure')"#,
    )
    .execute(&pool)
    .await?;

    let buckets = read_model.count_pr_statuses_by_date().await?;
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].status, PrStatus::Success);
    assert_eq!(buckets[0].count, 2);
    assert_eq!(buckets[1].status, PrStatus::Failure);
    assert_eq!(buckets[1].count, 1);
    Ok(())
}
