//! Typed ID definitions.

use crate::define_id;

define_id!(
    /// A site that owns sensors.
    SiteId,
    "site"
);

define_id!(
    /// A query or referrer based sensor.
    SensorId,
    "sns"
);

define_id!(
    /// A referrer host belonging to a referrer based sensor.
    HostId,
    "hst"
);

define_id!(
    /// Correlates log lines for one HTTP request.
    RequestId,
    "req"
);
