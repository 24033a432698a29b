//! ventifact-postgres — PostgreSQL implementations of ventifact-core's port
//! traits.
//!
//! Cancellation is handled structurally rather than through an explicit
//! token: every mutating operation holds its `sqlx::Transaction` as a local
//! value across its `.await` points, so a caller that drops the in-flight
//! future (e.g. a `tokio::select!` branch losing a race, or a timeout) drops
//! the transaction before `commit()` runs, and `sqlx` issues the `ROLLBACK`
//! and returns the connection to the pool on drop. No operation holds a
//! connection outside of a transaction scope, so this is sufficient to
//! satisfy the "no orphaned connection on cancellation" requirement without
//! threading a cancellation token through every port trait.

pub mod config;
pub mod flake;
pub mod ingest;
pub mod read_model;
pub mod retention;
pub mod retry;
pub mod sqlx_types;

pub use config::VentifactConfig;
pub use flake::PgFlakeStore;
pub use ingest::PgIngestStore;
pub use read_model::PgReadModel;
pub use retention::PgRetentionStore;

use sqlx::PgPool;

/// Convenience struct that constructs all Postgres adapters from a single pool.
pub struct PgStores {
    pub ingest: PgIngestStore,
    pub retention: PgRetentionStore,
    pub flakes: PgFlakeStore,
    pub read_model: PgReadModel,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ingest: PgIngestStore::new(pool.clone()),
            retention: PgRetentionStore::new(pool.clone()),
            flakes: PgFlakeStore::new(pool.clone()),
            read_model: PgReadModel::new(pool),
        }
    }
}
