//! Postgres wire-format converters for the core's enums.
//!
//! The core enums (`CiSource`, `PrStatus`) have no `sqlx::Type` derive —
//! Postgres stores them as native `ENUM` types, so rows are decoded via
//! `String`/`&str` columns and converted here. This keeps `ventifact-core`
//! free of a Postgres dependency, the same separation `sem_os_postgres`
//! draws around its own registry enums.

use ventifact_core::{CiSource, PrStatus};

pub fn parse_ci_source(s: &str) -> Result<CiSource, String> {
    CiSource::from_str_opt(s).ok_or_else(|| format!("unrecognized ci_source: {s}"))
}

pub fn parse_pr_status(s: &str) -> Result<PrStatus, String> {
    PrStatus::from_str_opt(s).ok_or_else(|| format!("unrecognized pr_status: {s}"))
}
