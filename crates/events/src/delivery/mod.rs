//! Outbound delivery channels.

pub mod airtable;
pub mod email;
