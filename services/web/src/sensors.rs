//! Saving sensors from submitted forms.
//!
//! Validation, host reconciliation and the store write happen here so the
//! HTTP handlers only translate outcomes into pages and redirects.

use snowfinch_forms::decode_rows;
use snowfinch_id::{SensorId, SiteId};
use snowfinch_model::{
    validate_name, validate_query_fields, FieldError, SensorType, ValidationErrors,
};
use snowfinch_reconcile::{plan_submission, to_validation_errors, HostPlan, StoredHost, SubmittedRow};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{DbError, Matcher, SensorFields, SensorRecord, SensorStore};

/// The sensor form as submitted (or as pre-filled for editing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorForm {
    /// Raw `type` field; validated on save.
    pub sensor_type: String,
    pub name: String,
    pub uri_query_key: String,
    pub uri_query_value: String,
    pub hosts: Vec<SubmittedRow>,
    /// `hosts[...]` field names that could not be read.
    pub unreadable_host_fields: Vec<String>,
}

impl SensorForm {
    /// Reads a decoded `application/x-www-form-urlencoded` body.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "type" => form.sensor_type = value.clone(),
                "name" => form.name = value.clone(),
                "uri_query_key" => form.uri_query_key = value.clone(),
                "uri_query_value" => form.uri_query_value = value.clone(),
                _ => {}
            }
        }
        match decode_rows(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
            Ok(rows) => form.hosts = rows,
            Err(err) => {
                form.hosts = err.rows;
                form.unreadable_host_fields = err.fields;
            }
        }
        form
    }

    /// Pre-fills the edit form from a stored sensor.
    pub fn from_record(sensor: &SensorRecord) -> Self {
        let (key, value) = sensor.matcher.query_columns();
        Self {
            sensor_type: sensor.sensor_type().as_str().to_string(),
            name: sensor.name.clone(),
            uri_query_key: key.unwrap_or_default().to_string(),
            uri_query_value: value.unwrap_or_default().to_string(),
            hosts: sensor
                .hosts
                .iter()
                .map(|h| SubmittedRow::existing(h.id, h.host.clone(), false))
                .collect(),
            unreadable_host_fields: Vec::new(),
        }
    }

    /// The sub-form to show; unknown types fall back to query.
    pub fn active_type(&self) -> SensorType {
        self.sensor_type.parse().unwrap_or_default()
    }

    /// Validates the form against the sensor's current hosts.
    ///
    /// Switching a sensor to `query` plans the removal of all its hosts.
    fn validate(&self, current: &[StoredHost]) -> Result<(SensorFields, HostPlan), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = validate_name(&self.name, &mut errors);

        let Ok(sensor_type) = self.sensor_type.parse::<SensorType>() else {
            errors.push(FieldError::new("type", "Type is not included in the list"));
            return Err(errors);
        };

        let (matcher, plan) = match sensor_type {
            SensorType::Query => {
                let (key, value) =
                    validate_query_fields(&self.uri_query_key, &self.uri_query_value, &mut errors);
                (Matcher::Query { key, value }, HostPlan::delete_all(current))
            }
            SensorType::Referrer => {
                errors.extend(self.unreadable_host_fields.iter().map(|field| {
                    FieldError::new(field.clone(), "Referrer host field is invalid")
                }));
                match plan_submission(current, &self.hosts) {
                    Ok(plan) => (Matcher::Referrer, plan),
                    Err(row_errors) => {
                        errors.extend(to_validation_errors(&row_errors));
                        (Matcher::Referrer, HostPlan::default())
                    }
                }
            }
        };

        errors.into_result()?;
        Ok((SensorFields { name, matcher }, plan))
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    /// The form has problems the user can fix.
    #[error("sensor form is invalid")]
    Invalid(ValidationErrors),

    #[error("sensor not found")]
    NotFound,

    #[error(transparent)]
    Store(DbError),
}

impl From<DbError> for SaveError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NameTaken(_) => SaveError::Invalid(
                FieldError::new("name", "Name has already been taken").into(),
            ),
            // The host set changed between reading and writing.
            DbError::HostNotFound { .. } => SaveError::Invalid(
                FieldError::new("hosts", "Referrer host is not part of this sensor").into(),
            ),
            DbError::SensorNotFound(_) | DbError::SiteNotFound(_) => SaveError::NotFound,
            other => SaveError::Store(other),
        }
    }
}

/// Creates a sensor from the new-sensor form.
pub async fn create_sensor(
    store: &dyn SensorStore,
    site_id: SiteId,
    form: &SensorForm,
) -> Result<SensorRecord, SaveError> {
    let (fields, plan) = form.validate(&[]).map_err(|errors| {
        warn!(site_id = %site_id, errors = errors.len(), "Rejected new sensor");
        SaveError::Invalid(errors)
    })?;

    let sensor = store.create_sensor(site_id, fields, &plan.create).await?;

    info!(
        site_id = %site_id,
        sensor_id = %sensor.id,
        sensor_type = %sensor.sensor_type(),
        hosts = sensor.hosts.len(),
        "Sensor created"
    );
    Ok(sensor)
}

/// Saves the edit form, reconciling hosts against what is stored now.
pub async fn update_sensor(
    store: &dyn SensorStore,
    site_id: SiteId,
    sensor_id: SensorId,
    form: &SensorForm,
) -> Result<SensorRecord, SaveError> {
    let current = store
        .find_sensor(site_id, sensor_id)
        .await?
        .ok_or(SaveError::NotFound)?;

    let (fields, plan) = form.validate(&current.hosts).map_err(|errors| {
        warn!(sensor_id = %sensor_id, errors = errors.len(), "Rejected sensor update");
        SaveError::Invalid(errors)
    })?;

    let sensor = store
        .update_sensor(site_id, sensor_id, fields, &plan)
        .await?;

    info!(
        site_id = %site_id,
        sensor_id = %sensor_id,
        hosts_created = plan.create.len(),
        hosts_updated = plan.update.len(),
        hosts_deleted = plan.delete.len(),
        "Sensor updated"
    );
    Ok(sensor)
}

/// Removes a sensor and its hosts.
pub async fn remove_sensor(
    store: &dyn SensorStore,
    site_id: SiteId,
    sensor_id: SensorId,
) -> Result<SensorRecord, SaveError> {
    let sensor = store
        .delete_sensor(site_id, sensor_id)
        .await?
        .ok_or(SaveError::NotFound)?;

    info!(site_id = %site_id, sensor_id = %sensor_id, "Sensor removed");
    Ok(sensor)
}
