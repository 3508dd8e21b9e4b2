//! Inspection events and outbound notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`InspectionEvent`]: what happened to an inspection, with the data
//!   notifications need.
//! - [`templates`]: the HTML emails sent to guests and administrators.
//! - [`delivery`]: external channels (email providers, Airtable).
//! - [`NotificationDispatcher`]: background task turning events into
//!   emails and record syncs.

pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_support;

pub use bus::{EventBus, InspectionEvent, InspectionSnapshot};
pub use delivery::airtable::{AirtableClient, AirtableConfig, AirtableError, AirtableRecord};
pub use delivery::email::{
    Attachment, EmailConfig, EmailDelivery, EmailError, EmailMessage, EmailProvider,
};
pub use dispatcher::{NotificationConfig, NotificationDispatcher};
