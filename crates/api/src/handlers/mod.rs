pub mod annotation;
pub mod diagram_mark;
pub mod email;
pub mod files;
pub mod inspection;
pub mod property;

use cartcheck_core::error::CoreError;
use cartcheck_core::types::InspectionId;
use cartcheck_db::models::inspection::Inspection;
use cartcheck_db::repositories::InspectionRepo;
use cartcheck_db::DbPool;

use crate::error::{AppError, AppResult};

/// Load an inspection or fail with 404.
pub async fn find_inspection(pool: &DbPool, id: InspectionId) -> AppResult<Inspection> {
    InspectionRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::inspection_not_found(id)))
}
