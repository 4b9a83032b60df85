//! Housing price prediction web service
//!
//! Serves the thirteen-field prediction form, a JSON prediction API, and
//! the health and metrics endpoints.

pub mod api;
pub mod config;
pub mod page;
