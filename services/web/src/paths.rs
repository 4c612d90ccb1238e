//! URLs of the site and sensor pages.

use snowfinch_id::{SensorId, SiteId};

pub fn sites() -> String {
    "/sites".to_string()
}

pub fn site(site_id: SiteId) -> String {
    format!("/sites/{site_id}")
}

pub fn sensors(site_id: SiteId) -> String {
    format!("/sites/{site_id}/sensors")
}

pub fn new_sensor(site_id: SiteId) -> String {
    format!("/sites/{site_id}/sensors/new")
}

pub fn sensor(site_id: SiteId, sensor_id: SensorId) -> String {
    format!("/sites/{site_id}/sensors/{sensor_id}")
}

pub fn edit_sensor(site_id: SiteId, sensor_id: SensorId) -> String {
    format!("/sites/{site_id}/sensors/{sensor_id}/edit")
}

pub fn remove_sensor(site_id: SiteId, sensor_id: SensorId) -> String {
    format!("/sites/{site_id}/sensors/{sensor_id}/remove")
}

pub const SENSOR_FORM_SCRIPT: &str = "/assets/sensor_form.js";
