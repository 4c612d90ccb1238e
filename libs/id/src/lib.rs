//! # snowfinch-id
//!
//! Typed identifiers for the records Snowfinch stores and links to.
//!
//! Every ID renders as `{prefix}_{ulid}`:
//!
//! - `site_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `sns_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//! - `hst_01HV4Z4NYPLTRS0JTUA8XDME5F`
//!
//! The prefix keeps a host id from being accepted where a sensor id is
//! expected, which matters because ids arrive from URL paths and hidden
//! form fields.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
