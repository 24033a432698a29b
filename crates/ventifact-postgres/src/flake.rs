//! C6: Flake Detector — windowed per-`(blueprint, commit)` diff of result
//! specs.
//!
//! Tie-break for equal timestamps within a partition is `ext_id` ascending
//! (see DESIGN.md).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ventifact_core::ports::FlakeStore;
use ventifact_core::{result_spec, Result, VentifactError};

use crate::retry::{with_retry, SqlxResultExt};

pub struct PgFlakeStore {
    pool: PgPool,
}

impl PgFlakeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlakeStore for PgFlakeStore {
    async fn mark_flakes_since(&self, watermark: DateTime<Utc>) -> Result<u64> {
        with_retry(|| mark_flakes_since_once(&self.pool, watermark)).await
    }
}

#[derive(sqlx::FromRow)]
struct RerunRow {
    source: String,
    ext_id: i32,
    blueprint_id: i64,
    result_spec: Option<Vec<u8>>,
    prev_source: String,
    prev_ext_id: i32,
    prev_result_spec: Option<Vec<u8>>,
}

async fn mark_flakes_since_once(
    pool: &PgPool,
    watermark: DateTime<Utc>,
) -> Result<u64> {
    let mut tx = pool.begin().await.ve()?;

    // Reruns whose result_spec differs from the immediately-previous run in
    // their (blueprint_id, commit_id) partition, ordered by timestamp then
    // ext_id. `IS DISTINCT FROM` is NULL-safe: equal absences are equal,
    // present-vs-absent differ, otherwise byte-compared.
    let rows: Vec<RerunRow> = sqlx::query_as(
        r#"
        WITH ranked AS (
            SELECT
                source::text AS source, ext_id, blueprint_id, commit_id, timestamp, result_spec,
                ROW_NUMBER() OVER w AS rn,
                LAG(source::text) OVER w AS prev_source,
                LAG(ext_id) OVER w AS prev_ext_id,
                LAG(result_spec) OVER w AS prev_result_spec
            FROM test_runs
            WINDOW w AS (PARTITION BY blueprint_id, commit_id ORDER BY timestamp ASC, ext_id ASC)
        )
        SELECT source, ext_id, blueprint_id, result_spec, prev_source, prev_ext_id, prev_result_spec
        FROM ranked
        WHERE rn > 1
          AND timestamp > $1
          AND result_spec IS DISTINCT FROM prev_result_spec
        "#,
    )
    .bind(watermark)
    .fetch_all(&mut *tx)
    .await
    .ve()?;

    let mut members_cache: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut new_flakes: Vec<(String, i32, i64)> = Vec::new();

    for row in &rows {
        let members = match members_cache.get(&row.blueprint_id) {
            Some(m) => m.clone(),
            None => {
                let members: Option<Vec<i64>> = sqlx::query_scalar(
                    r#"SELECT test_blueprint_ids FROM test_run_blueprints WHERE id = $1"#,
                )
                .bind(row.blueprint_id)
                .fetch_optional(&mut *tx)
                .await
                .ve()?;
                let members = members.ok_or(VentifactError::MemberMismatch(row.blueprint_id))?;
                members_cache.insert(row.blueprint_id, members.clone());
                members
            }
        };

        let prev_label = format!("{}/{}", row.prev_source, row.prev_ext_id);
        let cur_label = format!("{}/{}", row.source, row.ext_id);
        let prev_outcomes = result_spec::decode(row.prev_result_spec.as_deref(), &members, &prev_label)?;
        let cur_outcomes = result_spec::decode(row.result_spec.as_deref(), &members, &cur_label)?;

        for ((member_id, prev_passed), cur_passed) in
            members.iter().zip(prev_outcomes).zip(cur_outcomes)
        {
            if prev_passed == cur_passed {
                continue;
            }
            // Attribute the flake to the failing-side run.
            let (failing_source, failing_ext_id) = if cur_passed {
                (row.prev_source.clone(), row.prev_ext_id)
            } else {
                (row.source.clone(), row.ext_id)
            };
            new_flakes.push((failing_source, failing_ext_id, *member_id));
        }
    }

    let inserted = if new_flakes.is_empty() {
        0
    } else {
        let sources: Vec<&str> = new_flakes.iter().map(|(s, _, _)| s.as_str()).collect();
        let ext_ids: Vec<i32> = new_flakes.iter().map(|(_, e, _)| *e).collect();
        let test_ids: Vec<i64> = new_flakes.iter().map(|(_, _, t)| *t).collect();

        let rows = sqlx::query(
            r#"
            INSERT INTO test_flakes (test_run_source, test_run_ext_id, test_blueprint_id)
            SELECT * FROM UNNEST($1::ci_source[], $2::integer[], $3::bigint[])
            ON CONFLICT (test_run_source, test_run_ext_id, test_blueprint_id) DO NOTHING
            "#,
        )
        .bind(&sources as &[&str])
        .bind(&ext_ids)
        .bind(&test_ids)
        .execute(&mut *tx)
        .await
        .ve()?;
        rows.rows_affected()
    };

    tx.commit().await.ve()?;

    tracing::info!(%watermark, reruns = rows.len(), new_flakes = inserted, "flake detection pass complete");

    Ok(inserted)
}
