//! Storage error types.

use snowfinch_id::{HostId, SensorId, SiteId};
use thiserror::Error;

/// Sensor store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}. Run from repo root or services/web.")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// The site does not exist.
    #[error("site not found: {0}")]
    SiteNotFound(SiteId),

    /// The sensor does not exist within the given site.
    #[error("sensor not found: {0}")]
    SensorNotFound(SensorId),

    /// A host plan referenced a host the sensor does not own.
    #[error("host {host_id} does not belong to sensor {sensor_id}")]
    HostNotFound {
        sensor_id: SensorId,
        host_id: HostId,
    },

    /// Another sensor of the same site already uses the name.
    #[error("sensor name '{0}' is already taken")]
    NameTaken(String),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The in-memory store lock was poisoned by a panicking writer.
    #[error("sensor store lock poisoned")]
    Poisoned,
}
