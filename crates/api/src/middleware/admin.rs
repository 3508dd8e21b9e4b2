//! Admin bearer-key extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use cartcheck_core::error::CoreError;
use sha2::{Digest, Sha256};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carries the admin key in its `Authorization`
/// header.
///
/// When `ADMIN_API_KEY` is not configured every request is accepted, which
/// keeps local development and the single-operator setup working.
///
/// ```ignore
/// async fn list(_admin: AdminAuth, State(state): State<AppState>) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorize(&parts.headers, &state.config)
    }
}

/// Check `headers` for the admin key, for handlers that only need admin
/// rights for some inputs.
pub fn authorize(headers: &HeaderMap, config: &ServerConfig) -> Result<AdminAuth, AppError> {
    let Some(expected) = config.admin_api_key.as_deref() else {
        return Ok(AdminAuth);
    };

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })?;

    if !keys_match(token, expected) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Admin key required".into(),
        )));
    }
    Ok(AdminAuth)
}

/// Compare fixed-length digests so the comparison does not depend on where
/// the strings first differ.
fn keys_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn keys_match_only_when_equal() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3cret", "s3cre"));
        assert!(!keys_match("", "s3cret"));
    }

    #[test]
    fn authorize_checks_bearer_key_when_configured() {
        let mut config = ServerConfig::from_lookup(|_| None).unwrap();
        let mut headers = HeaderMap::new();
        assert!(authorize(&headers, &config).is_ok());

        config.admin_api_key = Some("s3cret".into());
        assert_matches!(
            authorize(&headers, &config),
            Err(AppError::Core(CoreError::Unauthorized(_)))
        );

        headers.insert("authorization", "Bearer wrong".parse().unwrap());
        assert_matches!(
            authorize(&headers, &config),
            Err(AppError::Core(CoreError::Forbidden(_)))
        );

        headers.insert("authorization", "Bearer s3cret".parse().unwrap());
        assert!(authorize(&headers, &config).is_ok());
    }
}
