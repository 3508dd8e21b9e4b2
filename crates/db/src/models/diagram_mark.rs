//! Default diagram marks, stored per diagram independently of inspections.

use cartcheck_core::diagram::Point;
use cartcheck_core::error::CoreError;
use cartcheck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `diagram_marks` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DiagramMark {
    pub id: DbId,
    /// Diagram filename without extension.
    pub diagram_name: String,
    pub points: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DiagramMark {
    /// Decode the stored points.
    pub fn parsed_points(&self) -> Result<Vec<Point>, CoreError> {
        if self.points.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(self.points.clone()).map_err(|e| {
            CoreError::Internal(format!(
                "diagram_marks row {} holds malformed points: {e}",
                self.id
            ))
        })
    }
}

/// DTO for replacing the default marks of a diagram.
#[derive(Debug, Deserialize)]
pub struct UpsertDiagramMarks {
    pub points: Vec<Point>,
}
