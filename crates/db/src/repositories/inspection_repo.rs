//! Repository for the `inspections` table.

use cartcheck_core::diagram::DiagramData;
use cartcheck_core::types::InspectionId;
use sqlx::PgPool;

use crate::models::inspection::{CompletionUpdate, Inspection, InspectionListFilters, NewInspection};
use crate::{clamp_limit, clamp_offset};

/// Column list for inspections queries.
const COLUMNS: &str = "id, form_id, guest_name, guest_email, guest_phone, inspection_date, \
    property, cart_type, cart_number, observations, diagram_data, signature_data, status, \
    pdf_path, pdf_url, airtable_record_id, created_at, updated_at, completed_at";

/// Provides CRUD operations for inspections.
pub struct InspectionRepo;

impl InspectionRepo {
    /// Insert a new `pending` inspection, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewInspection) -> Result<Inspection, sqlx::Error> {
        let query = format!(
            "INSERT INTO inspections
                (form_id, guest_name, guest_email, guest_phone, inspection_date, property,
                 cart_type, cart_number, observations, diagram_data, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(&input.form_id)
            .bind(&input.guest_name)
            .bind(&input.guest_email)
            .bind(&input.guest_phone)
            .bind(input.inspection_date)
            .bind(&input.property)
            .bind(&input.cart_type)
            .bind(&input.cart_number)
            .bind(&input.observations)
            .bind(input.diagram_data.to_json())
            .fetch_one(pool)
            .await
    }

    /// Find an inspection by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: InspectionId,
    ) -> Result<Option<Inspection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inspections WHERE id = $1");
        sqlx::query_as::<_, Inspection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List inspections, newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        filters: &InspectionListFilters,
    ) -> Result<Vec<Inspection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM inspections
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(filters.status.as_deref())
            .bind(clamp_limit(filters.limit))
            .bind(clamp_offset(filters.offset))
            .fetch_all(pool)
            .await
    }

    /// Replace the diagram of a pending inspection.
    ///
    /// Returns `None` if the inspection does not exist or is completed.
    pub async fn update_diagram(
        pool: &PgPool,
        id: InspectionId,
        diagram: &DiagramData,
    ) -> Result<Option<Inspection>, sqlx::Error> {
        let query = format!(
            "UPDATE inspections SET diagram_data = $1
             WHERE id = $2 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(diagram.to_json())
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a pending inspection as completed with the guest's submission.
    ///
    /// The `status = 'pending'` guard makes concurrent submissions race
    /// safely: only the first one gets a row back.
    pub async fn complete(
        pool: &PgPool,
        id: InspectionId,
        update: &CompletionUpdate,
    ) -> Result<Option<Inspection>, sqlx::Error> {
        let query = format!(
            "UPDATE inspections SET
                observations = $1,
                diagram_data = $2,
                signature_data = $3,
                status = 'completed',
                completed_at = now()
             WHERE id = $4 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(&update.observations)
            .bind(update.diagram_data.to_json())
            .bind(&update.signature_data)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record where the signed PDF was stored.
    pub async fn set_pdf(
        pool: &PgPool,
        id: InspectionId,
        pdf_path: &str,
        pdf_url: &str,
    ) -> Result<Option<Inspection>, sqlx::Error> {
        let query = format!(
            "UPDATE inspections SET pdf_path = $1, pdf_url = $2
             WHERE id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(pdf_path)
            .bind(pdf_url)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Store the external record id. Returns true if a row was updated.
    pub async fn set_airtable_record(
        pool: &PgPool,
        id: InspectionId,
        record_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE inspections SET airtable_record_id = $1 WHERE id = $2")
            .bind(record_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
