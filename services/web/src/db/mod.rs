//! Sensor storage.
//!
//! This module provides:
//! - The [`SensorStore`] trait the HTTP layer talks to
//! - A Postgres implementation on a SQLx pool
//! - An in-memory implementation for tests and local runs
//!
//! Every write that touches hosts commits together with the sensor's own
//! fields, or not at all.

mod error;
mod memory;
mod postgres;

pub use error::DbError;
pub use memory::MemorySensorStore;
pub use postgres::PgSensorStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snowfinch_id::{SensorId, SiteId};
use snowfinch_model::SensorType;
use snowfinch_reconcile::{HostPlan, StoredHost};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/snowfinch".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/snowfinch".to_string());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        Self {
            database_url,
            max_connections,
            min_connections,
            ..Default::default()
        }
    }
}

/// Postgres connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    /// Run pending migrations from the first migrations directory found.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/web/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Get a sensor store handle.
    pub fn sensor_store(&self) -> PgSensorStore {
        PgSensorStore::new(self.pool.clone())
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    pub id: SiteId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// How a sensor matches traffic, with the fields each variant needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Query { key: String, value: String },
    Referrer,
}

impl Matcher {
    pub fn sensor_type(&self) -> SensorType {
        match self {
            Matcher::Query { .. } => SensorType::Query,
            Matcher::Referrer => SensorType::Referrer,
        }
    }

    /// Column values for `uri_query_key` and `uri_query_value`.
    pub fn query_columns(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Matcher::Query { key, value } => (Some(key.as_str()), Some(value.as_str())),
            Matcher::Referrer => (None, None),
        }
    }
}

/// Validated sensor fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorFields {
    pub name: String,
    pub matcher: Matcher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    pub id: SensorId,
    pub site_id: SiteId,
    pub name: String,
    pub matcher: Matcher,
    /// Hosts in insertion order; empty for query sensors.
    pub hosts: Vec<StoredHost>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SensorRecord {
    pub fn sensor_type(&self) -> SensorType {
        self.matcher.sensor_type()
    }
}

/// A sensor as shown in the site's sensor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSummary {
    pub id: SensorId,
    pub name: String,
    pub sensor_type: SensorType,
}

// =============================================================================
// Store
// =============================================================================

/// Persistence for sites, sensors and their referrer hosts.
///
/// Sensor lookups are always scoped by site: a sensor id paired with the
/// wrong site behaves as if it did not exist.
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Check that the store can serve requests.
    async fn health_check(&self) -> Result<(), DbError>;

    async fn insert_site(&self, name: &str) -> Result<SiteRecord, DbError>;

    async fn list_sites(&self) -> Result<Vec<SiteRecord>, DbError>;

    async fn find_site(&self, site_id: SiteId) -> Result<Option<SiteRecord>, DbError>;

    /// Sensors of a site in creation order.
    async fn list_sensors(&self, site_id: SiteId) -> Result<Vec<SensorSummary>, DbError>;

    async fn find_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
    ) -> Result<Option<SensorRecord>, DbError>;

    /// Insert a sensor and its initial hosts in one transaction.
    async fn create_sensor(
        &self,
        site_id: SiteId,
        fields: SensorFields,
        hosts: &[String],
    ) -> Result<SensorRecord, DbError>;

    /// Write new sensor fields and apply a host plan in one transaction.
    ///
    /// Fails with [`DbError::HostNotFound`] if the plan names a host the
    /// sensor does not own; nothing is written in that case.
    async fn update_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
        fields: SensorFields,
        plan: &HostPlan,
    ) -> Result<SensorRecord, DbError>;

    /// Delete a sensor and its hosts. Returns the deleted sensor.
    async fn delete_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
    ) -> Result<Option<SensorRecord>, DbError>;
}
