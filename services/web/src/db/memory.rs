//! In-memory sensor store for tests and local runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use snowfinch_id::{HostId, SensorId, SiteId};
use snowfinch_reconcile::{HostPlan, StoredHost};

use super::{DbError, SensorFields, SensorRecord, SensorStore, SensorSummary, SiteRecord};

#[derive(Debug, Default)]
struct MemoryState {
    sites: Vec<SiteRecord>,
    /// Creation order doubles as list order.
    sensors: Vec<SensorRecord>,
}

impl MemoryState {
    fn name_taken(&self, site_id: SiteId, name: &str, except: Option<SensorId>) -> bool {
        self.sensors
            .iter()
            .any(|s| s.site_id == site_id && s.name == name && Some(s.id) != except)
    }

    fn position(&self, site_id: SiteId, sensor_id: SensorId) -> Option<usize> {
        self.sensors
            .iter()
            .position(|s| s.site_id == site_id && s.id == sensor_id)
    }
}

/// Sensor store backed by a mutex-protected vector.
///
/// Each write holds the lock from validation to write-back, and replaces the
/// sensor record only once the whole host plan has been applied.
#[derive(Debug, Default, Clone)]
pub struct MemorySensorStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DbError> {
        self.state.lock().map_err(|_| DbError::Poisoned)
    }
}

fn verify_plan(sensor: &SensorRecord, plan: &HostPlan) -> Result<(), DbError> {
    let referenced = plan
        .delete
        .iter()
        .chain(plan.update.iter().map(|u| &u.id));
    for host_id in referenced {
        if !sensor.hosts.iter().any(|h| h.id == *host_id) {
            return Err(DbError::HostNotFound {
                sensor_id: sensor.id,
                host_id: *host_id,
            });
        }
    }
    Ok(())
}

#[async_trait]
impl SensorStore for MemorySensorStore {
    async fn health_check(&self) -> Result<(), DbError> {
        self.lock().map(|_| ())
    }

    async fn insert_site(&self, name: &str) -> Result<SiteRecord, DbError> {
        let site = SiteRecord {
            id: SiteId::new(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.lock()?.sites.push(site.clone());
        Ok(site)
    }

    async fn list_sites(&self) -> Result<Vec<SiteRecord>, DbError> {
        Ok(self.lock()?.sites.clone())
    }

    async fn find_site(&self, site_id: SiteId) -> Result<Option<SiteRecord>, DbError> {
        Ok(self.lock()?.sites.iter().find(|s| s.id == site_id).cloned())
    }

    async fn list_sensors(&self, site_id: SiteId) -> Result<Vec<SensorSummary>, DbError> {
        Ok(self
            .lock()?
            .sensors
            .iter()
            .filter(|s| s.site_id == site_id)
            .map(|s| SensorSummary {
                id: s.id,
                name: s.name.clone(),
                sensor_type: s.sensor_type(),
            })
            .collect())
    }

    async fn find_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
    ) -> Result<Option<SensorRecord>, DbError> {
        let state = self.lock()?;
        Ok(state
            .position(site_id, sensor_id)
            .map(|i| state.sensors[i].clone()))
    }

    async fn create_sensor(
        &self,
        site_id: SiteId,
        fields: SensorFields,
        hosts: &[String],
    ) -> Result<SensorRecord, DbError> {
        let mut state = self.lock()?;
        if !state.sites.iter().any(|s| s.id == site_id) {
            return Err(DbError::SiteNotFound(site_id));
        }
        if state.name_taken(site_id, &fields.name, None) {
            return Err(DbError::NameTaken(fields.name));
        }

        let now = Utc::now();
        let sensor = SensorRecord {
            id: SensorId::new(),
            site_id,
            name: fields.name,
            matcher: fields.matcher,
            hosts: hosts
                .iter()
                .map(|host| StoredHost::new(HostId::new(), host.clone()))
                .collect(),
            created_at: now,
            updated_at: now,
        };
        state.sensors.push(sensor.clone());
        Ok(sensor)
    }

    async fn update_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
        fields: SensorFields,
        plan: &HostPlan,
    ) -> Result<SensorRecord, DbError> {
        let mut state = self.lock()?;
        let index = state
            .position(site_id, sensor_id)
            .ok_or(DbError::SensorNotFound(sensor_id))?;
        if state.name_taken(site_id, &fields.name, Some(sensor_id)) {
            return Err(DbError::NameTaken(fields.name));
        }

        let current = &state.sensors[index];
        verify_plan(current, plan)?;

        let updated = SensorRecord {
            name: fields.name,
            matcher: fields.matcher,
            hosts: plan.apply(&current.hosts, HostId::new),
            updated_at: Utc::now(),
            ..current.clone()
        };
        state.sensors[index] = updated.clone();
        Ok(updated)
    }

    async fn delete_sensor(
        &self,
        site_id: SiteId,
        sensor_id: SensorId,
    ) -> Result<Option<SensorRecord>, DbError> {
        let mut state = self.lock()?;
        Ok(state
            .position(site_id, sensor_id)
            .map(|i| state.sensors.remove(i)))
    }
}
