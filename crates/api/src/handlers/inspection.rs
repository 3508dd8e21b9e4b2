//! Handlers for the inspection lifecycle.
//!
//! An administrator creates a `pending` inspection and the guest receives a
//! link to it. The guest loads it by id, annotates the diagram, then signs
//! and submits. Submission renders the PDF, stores it, and hands the
//! notifications to the event bus.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use cartcheck_core::diagram::{validate_points, DiagramData};
use cartcheck_core::error::CoreError;
use cartcheck_core::inspection::{
    download_file_name, ensure_transition, generate_form_id, pdf_object_key,
    validate_completion, validate_new_inspection, InspectionStatus,
};
use cartcheck_core::property::{self, Property};
use cartcheck_core::signature::decode_data_url;
use cartcheck_core::types::InspectionId;
use cartcheck_db::models::inspection::{
    CompleteInspection, CompletionUpdate, CreateInspection, Inspection, InspectionListFilters,
    NewInspection,
};
use cartcheck_db::repositories::InspectionRepo;
use cartcheck_events::{InspectionEvent, InspectionSnapshot};
use cartcheck_report::composer::REPORT_TITLE;
use cartcheck_report::{compose, compose_bundle, InspectionReport, PdfBundle, ReportVariant};
use chrono::Utc;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::find_inspection;
use crate::middleware::admin::AdminAuth;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::Bucket;

/// Attempts at finding an unused form id before giving up.
const FORM_ID_ATTEMPTS: usize = 5;

/* --------------------------------------------------------------------------
   Response types
   -------------------------------------------------------------------------- */

/// An inspection plus the derived fields clients route on.
#[derive(Debug, Serialize)]
pub struct InspectionView {
    #[serde(flatten)]
    pub inspection: Inspection,
    /// `true` once signed; the guest view shows the thank-you page instead.
    pub completed: bool,
    pub form_link: String,
}

impl InspectionView {
    fn new(inspection: Inspection, state: &AppState) -> Self {
        Self {
            completed: inspection.is_completed(),
            form_link: state.config.form_link(inspection.id),
            inspection,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompletedInspection {
    pub inspection: InspectionView,
    /// Public URL of the stored PDF; absent when the upload failed.
    pub pdf_url: Option<String>,
    pub download_name: String,
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// POST /inspections
///
/// Create a pending inspection and invite the guest.
pub async fn create_inspection(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Json(input): Json<CreateInspection>,
) -> AppResult<impl IntoResponse> {
    let property = validate_new_inspection(&input.guest_name, &input.guest_email, &input.property)?;
    let inspection_date = input.inspection_date.ok_or_else(|| {
        AppError::Core(CoreError::Validation("inspection_date is required".into()))
    })?;

    let points = match input.diagram_points {
        Some(points) => points,
        None => {
            state
                .mark_cache
                .get(&state.pool, property.diagram_name())
                .await?
        }
    };
    validate_points(&points)?;
    let base_points = points.len();

    let mut new = NewInspection {
        form_id: String::new(),
        guest_name: input.guest_name.trim().to_string(),
        guest_email: input.guest_email.trim().to_string(),
        guest_phone: input.guest_phone.trim().to_string(),
        inspection_date,
        property: property.name.to_string(),
        cart_type: non_blank(input.cart_type)
            .unwrap_or_else(|| property.resolved_cart_type().to_string()),
        cart_number: non_blank(input.cart_number)
            .unwrap_or_else(|| property.cart_number.to_string()),
        observations: input.observations.unwrap_or_default(),
        diagram_data: DiagramData::new(points, Some(property.diagram_name().to_string()))
            .with_base_points(base_points),
    };

    let inspection = insert_with_unique_form_id(&state, &mut new).await?;

    tracing::info!(
        inspection_id = %inspection.id,
        form_id = %inspection.form_id,
        property = %inspection.property,
        points = new.diagram_data.points.len(),
        "Inspection created"
    );

    let view = InspectionView::new(inspection, &state);
    state.event_bus.publish(InspectionEvent::created(
        InspectionSnapshot::from_row(&view.inspection),
        view.form_link.clone(),
    ));

    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// GET /inspections
pub async fn list_inspections(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Query(filters): Query<InspectionListFilters>,
) -> AppResult<impl IntoResponse> {
    if let Some(status) = filters.status.as_deref() {
        status.parse::<InspectionStatus>()?;
    }
    let rows = InspectionRepo::list(&state.pool, &filters).await?;
    let data: Vec<InspectionView> = rows
        .into_iter()
        .map(|row| InspectionView::new(row, &state))
        .collect();
    Ok(Json(DataResponse { data }))
}

/// GET /inspections/{id}
///
/// Guest view load. Completed inspections are still returned, flagged
/// `completed`.
pub async fn get_inspection(
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
) -> AppResult<impl IntoResponse> {
    let inspection = find_inspection(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: InspectionView::new(inspection, &state),
    }))
}

/// POST /inspections/{id}/complete
///
/// Sign and submit. The diagram defaults to the current annotation state.
pub async fn complete_inspection(
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
    Json(input): Json<CompleteInspection>,
) -> AppResult<impl IntoResponse> {
    let existing = find_inspection(&state.pool, id).await?;
    ensure_transition(existing.status()?, InspectionStatus::Completed)?;

    validate_completion(input.signature_data.as_deref())?;
    let signature_data = input.signature_data.unwrap_or_default();
    let signature = decode_data_url(&signature_data)?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Please provide your signature before submitting".into(),
            ))
        })?;

    let stored = existing.diagram()?;
    // Annotation writes for this inspection wait until the completion is
    // stored.
    let session = state.sessions.lock(id, &stored).await;
    let points = match input.diagram_points {
        Some(points) => points,
        None => session.current().to_vec(),
    };
    validate_points(&points)?;
    let diagram = DiagramData::new(points, stored.diagram_type.clone());
    let observations = input.observations.unwrap_or(existing.observations.clone());

    // Render before persisting so an unreadable signature leaves the
    // inspection pending.
    let catalog = property::find_by_name(&existing.property);
    let background = load_background(&state, catalog).await;
    let mut report = report_for(&existing, &diagram, background, Some(signature.bytes));
    report.observations = observations.clone();
    report.completed_at = Some(Utc::now());
    let bundle = render_bundle(report).await?;

    let update = CompletionUpdate {
        observations,
        diagram_data: diagram,
        signature_data,
    };
    let completed = InspectionRepo::complete(&state.pool, id, &update)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Inspection has already been completed".into(),
            ))
        })?;
    drop(session);
    state.sessions.remove(id).await;

    tracing::info!(
        inspection_id = %completed.id,
        form_id = %completed.form_id,
        points = update.diagram_data.points.len(),
        pdf_bytes = bundle.download.len(),
        email_pdf_bytes = bundle.email.len(),
        "Inspection completed"
    );

    let (completed, pdf_url) = store_pdf(&state, completed, bundle.download).await;

    state.event_bus.publish(InspectionEvent::completed(
        InspectionSnapshot::from_row(&completed),
        pdf_url.clone(),
        Some(bundle.email),
    ));

    let download_name = download_file_name(&completed.property);
    Ok(Json(DataResponse {
        data: CompletedInspection {
            inspection: InspectionView::new(completed, &state),
            pdf_url,
            download_name,
        },
    }))
}

/// GET /inspections/{id}/pdf
///
/// The download variant of a completed inspection's PDF. Served from
/// storage, or re-rendered when the stored copy is missing.
pub async fn download_pdf(
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
) -> AppResult<impl IntoResponse> {
    let inspection = find_inspection(&state.pool, id).await?;
    if !inspection.is_completed() {
        return Err(AppError::Core(CoreError::Conflict(
            "Inspection has not been signed yet".into(),
        )));
    }

    let stored = match inspection.pdf_path.as_deref() {
        Some(path) => state.storage.get(Bucket::Pdfs, path).await.unwrap_or_else(|e| {
            tracing::warn!(inspection_id = %id, error = %e, "Stored PDF unavailable, re-rendering");
            None
        }),
        None => None,
    };

    let bytes = match stored {
        Some(bytes) => bytes,
        None => {
            let diagram = inspection.diagram()?;
            let signature = inspection
                .signature_data
                .as_deref()
                .map(decode_data_url)
                .transpose()?
                .flatten()
                .map(|image| image.bytes);
            let background =
                load_background(&state, property::find_by_name(&inspection.property)).await;
            let report = report_for(&inspection, &diagram, background, signature);
            tokio::task::spawn_blocking(move || compose(&report, ReportVariant::Download))
                .await
                .map_err(|e| AppError::InternalError(format!("PDF task failed: {e}")))??
        }
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_file_name(&inspection.property)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/* --------------------------------------------------------------------------
   Helpers
   -------------------------------------------------------------------------- */

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Insert, drawing a fresh form id whenever the random one is taken.
async fn insert_with_unique_form_id(
    state: &AppState,
    new: &mut NewInspection,
) -> AppResult<Inspection> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        new.form_id = generate_form_id(&new.guest_name);
        match InspectionRepo::create(&state.pool, new).await {
            Ok(row) => return Ok(row),
            Err(sqlx::Error::Database(e))
                if e.constraint() == Some("uq_inspections_form_id") && attempt < FORM_ID_ATTEMPTS =>
            {
                tracing::debug!(form_id = %new.form_id, attempt, "Form id collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Fetch the diagram image of a catalog property. Missing images are
/// logged and left out of the report.
async fn load_background(state: &AppState, property: Option<&Property>) -> Option<Vec<u8>> {
    let property = property?;
    match state.storage.get(Bucket::Diagrams, property.diagram_file).await {
        Ok(Some(bytes)) => Some(bytes),
        Ok(None) => {
            tracing::warn!(diagram = property.diagram_file, "Diagram image not found in storage");
            None
        }
        Err(e) => {
            tracing::warn!(diagram = property.diagram_file, error = %e, "Failed to load diagram image");
            None
        }
    }
}

fn report_for(
    inspection: &Inspection,
    diagram: &DiagramData,
    diagram_background: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
) -> InspectionReport {
    InspectionReport {
        title: REPORT_TITLE.to_string(),
        form_id: inspection.form_id.clone(),
        guest_name: inspection.guest_name.clone(),
        guest_email: inspection.guest_email.clone(),
        guest_phone: inspection.guest_phone.clone(),
        property: inspection.property.clone(),
        cart_type: inspection.cart_type.clone(),
        cart_number: inspection.cart_number.clone(),
        inspection_date: inspection.inspection_date,
        completed_at: inspection.completed_at,
        observations: inspection.observations.clone(),
        points: diagram.points.clone(),
        diagram_background,
        signature,
    }
}

async fn render_bundle(report: InspectionReport) -> AppResult<PdfBundle> {
    Ok(tokio::task::spawn_blocking(move || compose_bundle(&report))
        .await
        .map_err(|e| AppError::InternalError(format!("PDF task failed: {e}")))??)
}

/// Upload the PDF and record its location. A failed upload leaves the
/// inspection completed without a PDF link.
async fn store_pdf(
    state: &AppState,
    inspection: Inspection,
    pdf: Vec<u8>,
) -> (Inspection, Option<String>) {
    let key = pdf_object_key(&inspection.form_id, inspection.inspection_date);
    if let Err(e) = state
        .storage
        .put(Bucket::Pdfs, &key, "application/pdf", pdf)
        .await
    {
        tracing::error!(inspection_id = %inspection.id, key = %key, error = %e, "Failed to upload PDF");
        return (inspection, None);
    }

    let url = state.storage.public_url(Bucket::Pdfs, &key);
    match InspectionRepo::set_pdf(&state.pool, inspection.id, &key, &url).await {
        Ok(Some(updated)) => (updated, Some(url)),
        Ok(None) => (inspection, Some(url)),
        Err(e) => {
            tracing::error!(inspection_id = %inspection.id, error = %e, "Failed to record PDF location");
            (inspection, Some(url))
        }
    }
}
