//! State of the sensor form as the browser sees it.
//!
//! [`HostFieldList`] is the list of referrer host rows the user adds,
//! fills in and removes before pressing "Save". [`FormToggle`] decides which
//! of the two sub-forms is shown. [`encode_rows`] and [`decode_rows`] move
//! host rows in and out of `hosts[N][...]` form fields.
//!
//! The page script in the web service performs the same operations on the
//! DOM; the server uses these types to render rows and to rebuild the form
//! after a failed submission.

mod encoding;
mod host_fields;
mod toggle;

pub use encoding::{decode_rows, encode_rows, field_name, RowDecodeError, RowField};
pub use host_fields::{FormError, HostField, HostFieldList, Removal, RowKey};
pub use toggle::{ActiveForm, FormToggle};
