//! Environment-variable configuration loader. CI/VCS credential loaders are
//! out of scope here; only the shape this core reads is modeled, mirroring
//! `sem_os_server::main`'s `std::env::var(...).expect(...)` convention.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Configuration consumed directly by the core.
#[derive(Debug, Clone)]
pub struct VentifactConfig {
    pub database_url: String,
    pub merged_pr_lifetime: Duration,
    pub test_run_lifetime: Duration,
    pub max_connections: u32,
}

impl VentifactConfig {
    /// Reads `DATABASE_URL`, `MERGED_PR_LIFETIME`, `TEST_RUN_LIFETIME` (the
    /// latter two as ISO-8601 durations). Panics with a message
    /// naming the missing variable, matching the teacher's `main.rs` style
    /// of failing fast at process startup rather than deferring to first use.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let merged_pr_lifetime = std::env::var("MERGED_PR_LIFETIME")
            .ok()
            .and_then(|v| parse_iso8601_duration(&v))
            .unwrap_or_else(|| Duration::from_secs(60 * 60 * 24 * 30 * 6)); // 6 months
        let test_run_lifetime = std::env::var("TEST_RUN_LIFETIME")
            .ok()
            .and_then(|v| parse_iso8601_duration(&v))
            .unwrap_or_else(|| Duration::from_secs(60 * 60 * 24 * 30 * 3)); // 3 months
        let max_connections = std::env::var("VENTIFACT_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7);

        Self {
            database_url,
            merged_pr_lifetime,
            test_run_lifetime,
            max_connections,
        }
    }

    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
    }
}

/// Minimal ISO-8601 duration parser covering the subset this core emits
/// internally (`PnYnMnDTnHnMnS`, date-only or time-only components). Not a
/// full calendar-aware parser: months/years are approximated as fixed
/// day-counts, which is adequate for a retention cutoff computed once per
/// maintenance pass rather than compounded across many periods.
fn parse_iso8601_duration(s: &str) -> Option<Duration> {
    let s = s.strip_prefix('P')?;
    let (date_part, time_part) = match s.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (s, None),
    };

    let mut seconds: f64 = 0.0;
    seconds += parse_components(date_part, &[('Y', 365.25 * 86400.0), ('M', 30.436875 * 86400.0), ('D', 86400.0)])?;
    if let Some(time_part) = time_part {
        seconds += parse_components(time_part, &[('H', 3600.0), ('M', 60.0), ('S', 1.0)])?;
    }

    Some(Duration::from_secs_f64(seconds))
}

fn parse_components(mut s: &str, units: &[(char, f64)]) -> Option<f64> {
    let mut total = 0.0;
    for &(marker, scale) in units {
        if let Some(idx) = s.find(marker) {
            let value: f64 = s[..idx].parse().ok()?;
            total += value * scale;
            s = &s[idx + 1..];
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pure_day_duration() {
        assert_eq!(parse_iso8601_duration("P30D"), Some(Duration::from_secs(30 * 86400)));
    }

    #[test]
    fn parses_combined_date_and_time() {
        let d = parse_iso8601_duration("P1DT2H").unwrap();
        assert_eq!(d.as_secs(), 86400 + 2 * 3600);
    }

    #[test]
    fn rejects_missing_p_prefix() {
        assert_eq!(parse_iso8601_duration("30D"), None);
    }
}
