//! Sensor model shared across the Snowfinch crates.
//!
//! A sensor matches traffic either by URI query parameter (`query`) or by the
//! referrer host (`referrer`). Exactly one field group is meaningful for a
//! given sensor; [`SensorType`] decides which.

mod sensor_type;
mod validation;

pub use sensor_type::{SensorType, UnknownSensorType};
pub use validation::{
    validate_name, validate_query_fields, FieldError, ValidationErrors, MAX_HOST_LEN,
    MAX_NAME_LEN,
};
