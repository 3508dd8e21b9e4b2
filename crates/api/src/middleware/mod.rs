//! Request extractors enforcing access rules.
//!
//! - [`admin::AdminAuth`] -- Requires the admin bearer key.

pub mod admin;
