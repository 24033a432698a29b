//! Consumer read operations: recent runs, recent flakes, and the PR ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ventifact_core::ports::ReadModel;
use ventifact_core::{
    PrStatusBucket, RecentTestFlake, RecentTestRun, Result, TestRunId, VentifactError,
};

use crate::retry::SqlxResultExt;
use crate::sqlx_types::{parse_ci_source, parse_pr_status};

pub struct PgReadModel {
    pool: PgPool,
}

impl PgReadModel {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unrecognized(e: String) -> VentifactError {
    VentifactError::ConstraintViolation(e)
}

#[derive(sqlx::FromRow)]
struct RecentRunRow {
    source: String,
    ext_id: i32,
    timestamp: DateTime<Utc>,
    commit_id: Vec<u8>,
    result_spec: Option<Vec<u8>>,
}

#[derive(sqlx::FromRow)]
struct RecentFlakeRow {
    source: String,
    ext_id: i32,
    title: String,
    timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PrRow {
    number: i64,
    merged_at: DateTime<Utc>,
    status: String,
}

#[derive(sqlx::FromRow)]
struct StatusBucketRow {
    date: chrono::NaiveDate,
    status: String,
    count: i64,
}

#[async_trait]
impl ReadModel for PgReadModel {
    async fn fetch_recent_test_runs(
        &self,
        count: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RecentTestRun>> {
        let rows: Vec<RecentRunRow> = sqlx::query_as(
            r#"
            SELECT source::text AS source, ext_id, timestamp, commit_id, result_spec
            FROM test_runs
            WHERE $1::timestamptz IS NULL OR timestamp > $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(count)
        .fetch_all(&self.pool)
        .await
        .ve()?;

        rows.into_iter()
            .map(|r| {
                let source = parse_ci_source(&r.source).map_err(unrecognized)?;
                Ok(RecentTestRun {
                    id: TestRunId {
                        source,
                        ext_id: r.ext_id as i64,
                    },
                    timestamp: r.timestamp,
                    commit_id: r.commit_id,
                    succeeded: r.result_spec.is_none(),
                })
            })
            .collect()
    }

    async fn fetch_recent_test_flakes(
        &self,
        count: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RecentTestFlake>> {
        let rows: Vec<RecentFlakeRow> = sqlx::query_as(
            r#"
            SELECT tr.source::text AS source, tr.ext_id, tb.title, tr.timestamp
            FROM test_flakes tf
            JOIN test_runs tr
                ON tr.source = tf.test_run_source AND tr.ext_id = tf.test_run_ext_id
            JOIN test_blueprints tb ON tb.id = tf.test_blueprint_id
            WHERE $1::timestamptz IS NULL OR tr.timestamp > $1
            ORDER BY tr.timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(count)
        .fetch_all(&self.pool)
        .await
        .ve()?;

        rows.into_iter()
            .map(|r| {
                let source = parse_ci_source(&r.source).map_err(unrecognized)?;
                Ok(RecentTestFlake {
                    test_run_id: TestRunId {
                        source,
                        ext_id: r.ext_id as i64,
                    },
                    test_title: r.title,
                    timestamp: r.timestamp,
                })
            })
            .collect()
    }

    async fn stream_prs_by_merged_at_asc(&self) -> Result<Vec<ventifact_core::Pr>> {
        let rows: Vec<PrRow> = sqlx::query_as(
            r#"SELECT number, merged_at, status::text AS status FROM prs ORDER BY merged_at ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .ve()?;

        rows.into_iter()
            .map(|r| {
                let status = parse_pr_status(&r.status).map_err(unrecognized)?;
                Ok(ventifact_core::Pr {
                    number: r.number,
                    merged_at: r.merged_at,
                    status,
                })
            })
            .collect()
    }

    async fn count_pr_statuses_by_date(&self) -> Result<Vec<PrStatusBucket>> {
        let rows: Vec<StatusBucketRow> = sqlx::query_as(
            r#"
            SELECT (merged_at AT TIME ZONE 'UTC')::date AS date, status::text AS status, COUNT(*) AS count
            FROM prs
            GROUP BY (merged_at AT TIME ZONE 'UTC')::date, status
            ORDER BY (merged_at AT TIME ZONE 'UTC')::date ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .ve()?;

        rows.into_iter()
            .map(|r| {
                let status = parse_pr_status(&r.status).map_err(unrecognized)?;
                Ok(PrStatusBucket {
                    date: r.date,
                    status,
                    count: r.count,
                })
            })
            .collect()
    }
}
