//! Snowfinch web
//!
//! Server-rendered pages for managing the sensors of a site. Sensors match
//! visits either by a URI query parameter or by the referring host, and the
//! referrer hosts are edited as a nested, repeatable form.

pub mod config;
pub mod db;
pub mod http;
pub mod paths;
pub mod sensors;
pub mod state;
pub mod views;
