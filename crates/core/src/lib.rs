//! Domain types and rules for golf-cart condition inspections.
//!
//! Everything in this crate is pure: no I/O, no async. The database,
//! report, event and API crates build on these types.

pub mod diagram;
pub mod error;
pub mod history;
pub mod inspection;
pub mod property;
pub mod signature;
pub mod types;
