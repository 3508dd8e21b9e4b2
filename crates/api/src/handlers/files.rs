//! Serves objects of the local storage backend.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use cartcheck_core::error::CoreError;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{Bucket, StorageError};

/// GET /files/{bucket}/{*key}
///
/// Only answers when storage is local; Supabase objects are public at
/// their own URLs.
pub async fn get_file(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "File",
            id: format!("{bucket}/{key}"),
        })
    };
    if state.storage.name() != "local" {
        return Err(not_found());
    }
    let bucket_id = Bucket::parse(&bucket).ok_or_else(not_found)?;
    let bytes = match state.storage.get(bucket_id, &key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) | Err(StorageError::InvalidKey(_)) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    Ok(([(header::CONTENT_TYPE, content_type(&key))], bytes))
}

fn content_type(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type("a_2025_04_09.pdf"), "application/pdf");
        assert_eq!(content_type("rental_150.JPG"), "image/jpeg");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }
}
