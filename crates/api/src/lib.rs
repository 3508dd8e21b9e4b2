//! HTTP service for golf-cart inspections.
//!
//! Admins create inspections and manage default diagram marks; guests open
//! their inspection link, annotate the cart diagram, sign and submit.
//! Completion renders the signed PDF, stores it and hands notifications to
//! the background dispatcher.

pub mod annotation;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
