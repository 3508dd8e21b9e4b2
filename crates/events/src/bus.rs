//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`InspectionEvent`]s. It is
//! shared via `Arc<EventBus>` between the HTTP handlers that publish and
//! the notification dispatcher that consumes.

use std::sync::Arc;

use cartcheck_core::diagram::{count_by_kind, DamageSummary};
use cartcheck_core::inspection::InspectionStatus;
use cartcheck_core::types::{InspectionId, Timestamp};
use cartcheck_db::models::inspection::Inspection;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// InspectionSnapshot
// ---------------------------------------------------------------------------

/// The fields of an inspection that notifications are rendered from.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionSnapshot {
    pub id: InspectionId,
    pub form_id: String,
    pub status: InspectionStatus,
    pub guest_name: String,
    pub guest_email: String,
    pub property: String,
    pub cart_type: String,
    pub cart_number: String,
    pub inspection_date: NaiveDate,
    pub observations: String,
    pub damage: DamageSummary,
}

impl InspectionSnapshot {
    /// Capture an inspection row.
    ///
    /// An unreadable status or diagram degrades to `pending` and an empty
    /// damage summary rather than failing the notification.
    pub fn from_row(row: &Inspection) -> Self {
        let damage = row
            .diagram()
            .map(|d| count_by_kind(&d.points))
            .unwrap_or_default();
        Self {
            id: row.id,
            form_id: row.form_id.clone(),
            status: row.status().unwrap_or(InspectionStatus::Pending),
            guest_name: row.guest_name.clone(),
            guest_email: row.guest_email.clone(),
            property: row.property.clone(),
            cart_type: row.cart_type.clone(),
            cart_number: row.cart_number.clone(),
            inspection_date: row.inspection_date,
            observations: row.observations.clone(),
            damage,
        }
    }
}

// ---------------------------------------------------------------------------
// InspectionEvent
// ---------------------------------------------------------------------------

/// Something that happened to an inspection.
#[derive(Debug, Clone)]
pub enum InspectionEvent {
    /// An administrator created the inspection; the guest must be invited.
    Created {
        inspection: InspectionSnapshot,
        /// Guest link to the form.
        form_link: String,
        timestamp: Timestamp,
    },
    /// The guest signed and submitted.
    Completed {
        inspection: InspectionSnapshot,
        /// Public URL of the stored PDF, when the upload succeeded.
        pdf_url: Option<String>,
        /// Email-sized rendition of the PDF.
        pdf_attachment: Option<Arc<Vec<u8>>>,
        timestamp: Timestamp,
    },
}

impl InspectionEvent {
    pub fn created(inspection: InspectionSnapshot, form_link: impl Into<String>) -> Self {
        Self::Created {
            inspection,
            form_link: form_link.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn completed(
        inspection: InspectionSnapshot,
        pdf_url: Option<String>,
        pdf_attachment: Option<Vec<u8>>,
    ) -> Self {
        Self::Completed {
            inspection,
            pdf_url,
            pdf_attachment: pdf_attachment.map(Arc::new),
            timestamp: Utc::now(),
        }
    }

    /// Dot-separated event name, e.g. `"inspection.created"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "inspection.created",
            Self::Completed { .. } => "inspection.completed",
        }
    }

    pub fn inspection(&self) -> &InspectionSnapshot {
        match self {
            Self::Created { inspection, .. } | Self::Completed { inspection, .. } => inspection,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<InspectionEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is dropped.
    pub fn publish(&self, event: InspectionEvent) {
        let event_type = event.event_type();
        if self.sender.send(event).is_err() {
            tracing::debug!(event_type, "No subscribers for event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InspectionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
