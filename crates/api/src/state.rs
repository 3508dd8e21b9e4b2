use std::sync::Arc;

use cartcheck_events::{EmailDelivery, EventBus, NotificationConfig};

use crate::annotation::{AnnotationSessions, DiagramMarkCache};
use crate::config::ServerConfig;
use crate::storage::StorageBackend;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cartcheck_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Publishes inspection events to the notification dispatcher.
    pub event_bus: Arc<EventBus>,
    /// Bucketed object storage for PDFs and diagram images.
    pub storage: Arc<dyn StorageBackend>,
    /// Undo/redo histories of inspections being annotated.
    pub sessions: Arc<AnnotationSessions>,
    pub mark_cache: Arc<DiagramMarkCache>,
    /// Used directly by the email proxy endpoint.
    pub email: Arc<EmailDelivery>,
    pub notifications: Arc<NotificationConfig>,
}
