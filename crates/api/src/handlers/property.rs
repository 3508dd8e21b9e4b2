//! Handlers for the static property catalog.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use cartcheck_core::diagram::Point;
use cartcheck_core::error::CoreError;
use cartcheck_core::property::{self, Property, PROPERTIES};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::{Bucket, StorageBackend};

/// A catalog entry as returned to clients.
#[derive(Debug, Serialize)]
pub struct PropertyView {
    pub id: &'static str,
    pub name: &'static str,
    pub cart_number: &'static str,
    pub cart_type: &'static str,
    pub diagram_file: &'static str,
    pub diagram_name: &'static str,
    pub diagram_url: String,
}

impl PropertyView {
    fn new(property: &Property, storage: &dyn StorageBackend) -> Self {
        Self {
            id: property.id,
            name: property.name,
            cart_number: property.cart_number,
            cart_type: property.resolved_cart_type(),
            diagram_file: property.diagram_file,
            diagram_name: property.diagram_name(),
            diagram_url: storage.public_url(Bucket::Diagrams, property.diagram_file),
        }
    }
}

/// Diagram image and default marks of a property's cart.
#[derive(Debug, Serialize)]
pub struct PropertyDiagram {
    pub diagram_name: &'static str,
    pub diagram_url: String,
    pub points: Vec<Point>,
}

fn find_property(id: &str) -> AppResult<&'static Property> {
    property::find_by_id(id).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Property",
            id: id.to_string(),
        })
    })
}

/// GET /properties
pub async fn list_properties(State(state): State<AppState>) -> impl IntoResponse {
    let data: Vec<PropertyView> = PROPERTIES
        .iter()
        .map(|p| PropertyView::new(p, state.storage.as_ref()))
        .collect();
    Json(DataResponse { data })
}

/// GET /properties/{id}
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let property = find_property(&id)?;
    Ok(Json(DataResponse {
        data: PropertyView::new(property, state.storage.as_ref()),
    }))
}

/// GET /properties/{id}/diagram
///
/// The diagram a new inspection of this property starts from.
pub async fn get_property_diagram(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let property = find_property(&id)?;
    let points = state
        .mark_cache
        .get(&state.pool, property.diagram_name())
        .await?;
    Ok(Json(DataResponse {
        data: PropertyDiagram {
            diagram_name: property.diagram_name(),
            diagram_url: state.storage.public_url(Bucket::Diagrams, property.diagram_file),
            points,
        },
    }))
}
