//! Bounded retry for transient Postgres errors.
//!
//! No external backoff crate — manual `tokio::time::sleep` with doubling
//! delay, the same shape the rest of this workspace's sqlx adapters use for
//! ad-hoc retries.

use std::time::Duration;

use ventifact_core::VentifactError;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_millis(50);

/// Postgres SQLSTATE codes worth retrying: serialization_failure and
/// deadlock_detected.
fn is_retryable(err: &VentifactError) -> bool {
    let VentifactError::Internal(source) = err else {
        return false;
    };
    let Some(db_err) = source.downcast_ref::<sqlx::Error>() else {
        return false;
    };
    matches!(
        db_err.as_database_error().and_then(|e| e.code()),
        Some(code) if code == "40001" || code == "40P01"
    )
}

/// Run `op` up to `MAX_ATTEMPTS` times, doubling the delay between attempts,
/// retrying only on SQLSTATE 40001/40P01. Exhaustion re-surfaces the last
/// error as `VentifactError::TransientDb`; anything non-retryable (including
/// `MemberMismatch`/`CorruptPayload`/etc.) surfaces immediately.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, VentifactError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, VentifactError>>,
{
    let mut delay = INITIAL_DELAY;

    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) && attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying transient database error");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) if is_retryable(&err) => {
                let VentifactError::Internal(source) = err else {
                    unreachable!("is_retryable only matches the Internal variant")
                };
                return Err(VentifactError::TransientDb(source));
            }
            Err(err) => return Err(err),
        }
    }

    unreachable!("loop always returns within MAX_ATTEMPTS iterations")
}

/// Wrap a raw `sqlx::Error` as `VentifactError::Internal`, the boundary
/// conversion every adapter function performs before bubbling an error up
/// through the core's port traits.
pub fn internal(err: sqlx::Error) -> VentifactError {
    VentifactError::Internal(err.into())
}

/// Shorthand for `.map_err(internal)` at `sqlx` call sites.
pub trait SqlxResultExt<T> {
    fn ve(self) -> Result<T, VentifactError>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn ve(self) -> Result<T, VentifactError> {
        self.map_err(internal)
    }
}
