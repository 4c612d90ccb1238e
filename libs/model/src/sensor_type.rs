use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a sensor matches traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    /// Match on `uri_query_key=uri_query_value`.
    #[default]
    Query,
    /// Match on the referrer host.
    Referrer,
}

/// The submitted type is neither `query` nor `referrer`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sensor type '{0}'")]
pub struct UnknownSensorType(pub String);

impl SensorType {
    pub const ALL: [SensorType; 2] = [SensorType::Query, SensorType::Referrer];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Query => "query",
            SensorType::Referrer => "referrer",
        }
    }

    /// Human label used on toggles and the detail page.
    pub fn label(&self) -> &'static str {
        match self {
            SensorType::Query => "Query based",
            SensorType::Referrer => "Referrer based",
        }
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SensorType {
    type Err = UnknownSensorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(SensorType::Query),
            "referrer" => Ok(SensorType::Referrer),
            other => Err(UnknownSensorType(other.to_string())),
        }
    }
}
