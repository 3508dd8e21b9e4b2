//! Inspection model and DTOs.

use cartcheck_core::diagram::{DiagramData, Point};
use cartcheck_core::error::CoreError;
use cartcheck_core::inspection::InspectionStatus;
use cartcheck_core::types::{InspectionId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `inspections` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Inspection {
    pub id: InspectionId,
    pub form_id: String,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub inspection_date: NaiveDate,
    pub property: String,
    pub cart_type: String,
    pub cart_number: String,
    pub observations: String,
    pub diagram_data: serde_json::Value,
    pub signature_data: Option<String>,
    pub status: String,
    pub pdf_path: Option<String>,
    pub pdf_url: Option<String>,
    pub airtable_record_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Inspection {
    pub fn status(&self) -> Result<InspectionStatus, CoreError> {
        self.status.parse()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status(), Ok(InspectionStatus::Completed))
    }

    /// Decode the stored diagram payload.
    pub fn diagram(&self) -> Result<DiagramData, CoreError> {
        DiagramData::from_json(&self.diagram_data)
    }
}

/// Admin request body for creating an inspection.
///
/// Cart type and number default to the catalog entry of `property`.
#[derive(Debug, Deserialize)]
pub struct CreateInspection {
    pub guest_name: String,
    pub guest_email: String,
    #[serde(default)]
    pub guest_phone: String,
    pub inspection_date: Option<NaiveDate>,
    pub property: String,
    pub cart_type: Option<String>,
    pub cart_number: Option<String>,
    pub observations: Option<String>,
    /// Initial diagram markers; the property's default marks when absent.
    pub diagram_points: Option<Vec<Point>>,
}

/// Fully resolved values inserted into `inspections`.
#[derive(Debug, Clone)]
pub struct NewInspection {
    pub form_id: String,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub inspection_date: NaiveDate,
    pub property: String,
    pub cart_type: String,
    pub cart_number: String,
    pub observations: String,
    pub diagram_data: DiagramData,
}

/// Guest request body for signing and submitting an inspection.
#[derive(Debug, Deserialize)]
pub struct CompleteInspection {
    pub observations: Option<String>,
    /// Signature pad export as an image data URL.
    pub signature_data: Option<String>,
    /// Final markers; the current annotation state when absent.
    pub diagram_points: Option<Vec<Point>>,
}

/// Values written when an inspection is completed.
#[derive(Debug, Clone)]
pub struct CompletionUpdate {
    pub observations: String,
    pub diagram_data: DiagramData,
    pub signature_data: String,
}

/// Query filters for listing inspections.
#[derive(Debug, Default, Deserialize)]
pub struct InspectionListFilters {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
