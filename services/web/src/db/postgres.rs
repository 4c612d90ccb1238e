//! Postgres sensor store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snowfinch_id::{HostId, SensorId, SiteId};
use snowfinch_model::SensorType;
use snowfinch_reconcile::{HostPlan, StoredHost};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};

use super::{
    DbError, Matcher, SensorFields, SensorRecord, SensorStore, SensorSummary, SiteRecord,
};

const UNIQUE_VIOLATION: &str = "23505";

/// Sensor store on a Postgres pool.
#[derive(Clone)]
pub struct PgSensorStore {
    pool: PgPool,
}

impl PgSensorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_hosts(&self, sensor_id: SensorId) -> Result<Vec<StoredHost>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT host_id, host
            FROM sensor_hosts
            WHERE sensor_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(sensor_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        rows.iter()
            .map(|row| {
                let host_id: String = row.try_get("host_id").map_err(DbError::Query)?;
                let host: String = row.try_get("host").map_err(DbError::Query)?;
                let id = host_id
                    .parse::<HostId>()
                    .map_err(|e| DbError::Corrupt(format!("sensor_hosts.host_id: {e}")))?;
                Ok(StoredHost::new(id, host))
            })
            .collect()
    }
}

/// Maps write failures, turning the `(site_id, name)` unique violation into
/// [`DbError::NameTaken`].
fn write_error(name: &str) -> impl FnOnce(sqlx::Error) -> DbError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return DbError::NameTaken(name.to_string());
            }
        }
        DbError::Query(e)
    }
}

async fn insert_hosts(
    tx: &mut Transaction<'_, Postgres>,
    sensor_id: SensorId,
    hosts: &[String],
) -> Result<(), DbError> {
    for host in hosts {
        sqlx::query("INSERT INTO sensor_hosts (host_id, sensor_id, host) VALUES ($1, $2, $3)")
            .bind(HostId::new().to_string())
            .bind(sensor_id.to_string())
            .bind(host)
            .execute(&mut **tx)
            .await
            .map_err(DbError::Query)?;
    }
    Ok(())
}

#[async_trait]
impl SensorStore for PgSensorStore {
    async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    async fn insert_site(&self, name: &str) -> Result<SiteRecord, DbError> {
        let site_id = SiteId::new();
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            INSERT INTO sites (site_id, name)
            VALUES ($1, $2)
            RETURNING site_id, name, created_at
            "#,
        )
        .bind(site_id.to_string())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.try_into()
    }

    async fn list_sites(&self) -> Result<Vec<SiteRecord>, DbError> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT site_id, name, created_at FROM sites ORDER BY created_at ASC, site_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        rows.into_iter().map(SiteRecord::try_from).collect()
    }

    async fn find_site(&self, site_id: SiteId) -> Result<Option<SiteRecord>, DbError> {
        let row = sqlx::query_as::<_, SiteRow>(
            "SELECT site_id, name, created_at FROM sites WHERE site_id = $1",
        )
        .bind(site_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.map(SiteRecord::try_from).transpose()
    }

    async fn list_sensors(&self, site_id: SiteId) -> Result<Vec<SensorSummary>, DbError> {
        let rows = sqlx::query_as::<_, SensorRow>(
            r#"
            SELECT sensor_id, site_id, name, sensor_type, uri_query_key, uri_query_value,
                   created_at, updated_at
            FROM sensors
            WHERE site_id = $1
            ORDER BY created_at ASC, sensor_id ASC
            "#,
        )
        .bind(site_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        rows.into_iter()
            .map(|row| {
                let record = row.into_record(Vec::new())?;
                Ok(SensorSummary {
                    id: record.id,
                    sensor_type: record.sensor_type(),
                    name: record.name,
                })
            })
            .collect()
    }

    async fn find_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
    ) -> Result<Option<SensorRecord>, DbError> {
        let row = sqlx::query_as::<_, SensorRow>(
            r#"
            SELECT sensor_id, site_id, name, sensor_type, uri_query_key, uri_query_value,
                   created_at, updated_at
            FROM sensors
            WHERE sensor_id = $1 AND site_id = $2
            "#,
        )
        .bind(sensor_id.to_string())
        .bind(site_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let hosts = self.load_hosts(sensor_id).await?;
        row.into_record(hosts).map(Some)
    }

    async fn create_sensor(
        &self,
        site_id: SiteId,
        fields: SensorFields,
        hosts: &[String],
    ) -> Result<SensorRecord, DbError> {
        let sensor_id = SensorId::new();
        let (key, value) = fields.matcher.query_columns();

        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let site_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM sites WHERE site_id = $1)")
                .bind(site_id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(DbError::Query)?;
        if !site_exists {
            return Err(DbError::SiteNotFound(site_id));
        }

        sqlx::query(
            r#"
            INSERT INTO sensors (sensor_id, site_id, name, sensor_type, uri_query_key, uri_query_value)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(sensor_id.to_string())
        .bind(site_id.to_string())
        .bind(&fields.name)
        .bind(fields.matcher.sensor_type().as_str())
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(write_error(&fields.name))?;

        insert_hosts(&mut tx, sensor_id, hosts).await?;

        tx.commit().await.map_err(DbError::Query)?;

        self.find_sensor(site_id, sensor_id)
            .await?
            .ok_or(DbError::SensorNotFound(sensor_id))
    }

    async fn update_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
        fields: SensorFields,
        plan: &HostPlan,
    ) -> Result<SensorRecord, DbError> {
        let (key, value) = fields.matcher.query_columns();

        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let updated = sqlx::query(
            r#"
            UPDATE sensors
            SET name = $3, sensor_type = $4, uri_query_key = $5, uri_query_value = $6,
                updated_at = now()
            WHERE sensor_id = $1 AND site_id = $2
            "#,
        )
        .bind(sensor_id.to_string())
        .bind(site_id.to_string())
        .bind(&fields.name)
        .bind(fields.matcher.sensor_type().as_str())
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(write_error(&fields.name))?;

        if updated.rows_affected() == 0 {
            return Err(DbError::SensorNotFound(sensor_id));
        }

        for host_id in &plan.delete {
            let deleted =
                sqlx::query("DELETE FROM sensor_hosts WHERE sensor_id = $1 AND host_id = $2")
                    .bind(sensor_id.to_string())
                    .bind(host_id.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::Query)?;
            if deleted.rows_affected() == 0 {
                return Err(DbError::HostNotFound {
                    sensor_id,
                    host_id: *host_id,
                });
            }
        }

        for update in &plan.update {
            let changed =
                sqlx::query("UPDATE sensor_hosts SET host = $3 WHERE sensor_id = $1 AND host_id = $2")
                    .bind(sensor_id.to_string())
                    .bind(update.id.to_string())
                    .bind(&update.host)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::Query)?;
            if changed.rows_affected() == 0 {
                return Err(DbError::HostNotFound {
                    sensor_id,
                    host_id: update.id,
                });
            }
        }

        insert_hosts(&mut tx, sensor_id, &plan.create).await?;

        tx.commit().await.map_err(DbError::Query)?;

        self.find_sensor(site_id, sensor_id)
            .await?
            .ok_or(DbError::SensorNotFound(sensor_id))
    }

    async fn delete_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
    ) -> Result<Option<SensorRecord>, DbError> {
        let Some(sensor) = self.find_sensor(site_id, sensor_id).await? else {
            return Ok(None);
        };

        // Hosts go with the sensor via ON DELETE CASCADE.
        let deleted = sqlx::query("DELETE FROM sensors WHERE sensor_id = $1 AND site_id = $2")
            .bind(sensor_id.to_string())
            .bind(site_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok((deleted.rows_affected() > 0).then_some(sensor))
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

struct SiteRow {
    site_id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for SiteRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            site_id: row.try_get("site_id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<SiteRow> for SiteRecord {
    type Error = DbError;

    fn try_from(row: SiteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row
                .site_id
                .parse()
                .map_err(|e| DbError::Corrupt(format!("sites.site_id: {e}")))?,
            name: row.name,
            created_at: row.created_at,
        })
    }
}

struct SensorRow {
    sensor_id: String,
    site_id: String,
    name: String,
    sensor_type: String,
    uri_query_key: Option<String>,
    uri_query_value: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for SensorRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            sensor_id: row.try_get("sensor_id")?,
            site_id: row.try_get("site_id")?,
            name: row.try_get("name")?,
            sensor_type: row.try_get("sensor_type")?,
            uri_query_key: row.try_get("uri_query_key")?,
            uri_query_value: row.try_get("uri_query_value")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl SensorRow {
    fn into_record(self, hosts: Vec<StoredHost>) -> Result<SensorRecord, DbError> {
        let sensor_type: SensorType = self
            .sensor_type
            .parse()
            .map_err(|e| DbError::Corrupt(format!("sensors.sensor_type: {e}")))?;

        let matcher = match sensor_type {
            SensorType::Query => Matcher::Query {
                key: self.uri_query_key.unwrap_or_default(),
                value: self.uri_query_value.unwrap_or_default(),
            },
            SensorType::Referrer => Matcher::Referrer,
        };

        Ok(SensorRecord {
            id: self
                .sensor_id
                .parse()
                .map_err(|e| DbError::Corrupt(format!("sensors.sensor_id: {e}")))?,
            site_id: self
                .site_id
                .parse()
                .map_err(|e| DbError::Corrupt(format!("sensors.site_id: {e}")))?,
            name: self.name,
            matcher,
            hosts,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
