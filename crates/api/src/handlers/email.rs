//! Email proxy for clients that compose notifications themselves.
//!
//! `POST /send-email` renders one of the standard templates from the
//! request fields and sends it through the configured provider.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cartcheck_core::error::CoreError;
use cartcheck_core::signature::has_image_data_url_prefix;
use cartcheck_events::templates::{self, RenderedEmail, TemplateData};
use cartcheck_events::{Attachment, EmailMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::admin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Which template a proxy request renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    /// Invitation with the form link, to the guest.
    GuestForm,
    /// Completion notice. Goes to admins with `isAdmin`, otherwise to the
    /// guest.
    CompletedForm,
    /// New-form alert, to admins only.
    AdminAlert,
}

impl EmailKind {
    fn resolve(kind: Option<&str>, admin_alert: bool) -> AppResult<Self> {
        if admin_alert {
            return Ok(Self::AdminAlert);
        }
        match kind.unwrap_or("guest-form") {
            "guest-form" => Ok(Self::GuestForm),
            "completed-form" => Ok(Self::CompletedForm),
            "admin-alert" => Ok(Self::AdminAlert),
            other => Err(AppError::BadRequest(format!("Unknown email type '{other}'"))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub guest_name: String,
    #[serde(default)]
    pub guest_email: String,
    #[serde(default)]
    pub property: String,
    pub inspection_date: Option<String>,
    pub form_link: Option<String>,
    pub form_id: Option<String>,
    pub reply_to: Option<String>,
    pub subject: Option<String>,
    pub cart_type: Option<String>,
    pub cart_number: Option<String>,
    pub observations: Option<String>,
    pub pdf_url: Option<String>,
    /// Signed PDF, raw base64 or a `data:application/pdf;base64,` URL.
    pub pdf_base64: Option<String>,
    pub diagram_base64: Option<String>,
    /// Loosely typed so malformed points can be reported, not rejected by
    /// the JSON extractor.
    pub diagram_points: Option<Vec<Value>>,
    #[serde(default)]
    pub admin_alert: bool,
    #[serde(default)]
    pub is_admin: bool,
    /// Replaces the configured admin recipients. Requires the admin key.
    pub admin_emails: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub message: &'static str,
    pub id: Option<String>,
    pub recipients: Vec<String>,
}

/// POST /send-email
pub async fn send_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SendEmailRequest>,
) -> AppResult<impl IntoResponse> {
    validate_request(&input)?;
    if input.admin_emails.as_ref().is_some_and(|list| !list.is_empty()) {
        admin::authorize(&headers, &state.config)?;
    }
    let kind = EmailKind::resolve(input.kind.as_deref(), input.admin_alert)?;

    let admins = |configured: &[String]| -> Vec<String> {
        input
            .admin_emails
            .clone()
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| configured.to_vec())
    };
    let data = template_data(&input);
    let (rendered, recipients) = match kind {
        EmailKind::GuestForm => (templates::form_created(&data), vec![input.guest_email.clone()]),
        EmailKind::CompletedForm if input.is_admin => (
            templates::admin_completion_copy(&data),
            admins(&state.notifications.completed_admins),
        ),
        EmailKind::CompletedForm => (
            templates::completion_confirmation(&data),
            vec![input.guest_email.clone()],
        ),
        EmailKind::AdminAlert => (
            templates::admin_form_created_alert(&data),
            admins(&state.notifications.created_admins),
        ),
    };
    if recipients.is_empty() {
        return Err(AppError::BadRequest("No admin recipients configured".into()));
    }

    let message = build_message(&state, &input, rendered, recipients.clone())?;
    let id = state.email.send(&message).await?;

    tracing::info!(
        kind = ?kind,
        recipients = ?recipients,
        property = %input.property,
        "Proxy email sent"
    );

    Ok(Json(DataResponse {
        data: SendEmailResponse {
            message: "Email sent",
            id,
            recipients,
        },
    }))
}

/* --------------------------------------------------------------------------
   Helpers
   -------------------------------------------------------------------------- */

fn validate_request(input: &SendEmailRequest) -> AppResult<()> {
    let missing: Vec<&str> = [
        ("guestName", input.guest_name.as_str()),
        ("guestEmail", input.guest_email.as_str()),
        ("property", input.property.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    if let Some(points) = &input.diagram_points {
        let invalid = points.iter().filter(|p| !is_valid_point(p)).count();
        if invalid > 0 {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Invalid diagram points: {invalid} of {} have no numeric x/y",
                points.len()
            ))));
        }
    }

    if let Some(diagram) = input.diagram_base64.as_deref() {
        if !has_image_data_url_prefix(diagram) {
            return Err(AppError::Core(CoreError::Validation(
                "Invalid diagram base64 format".into(),
            )));
        }
    }
    Ok(())
}

fn is_valid_point(point: &Value) -> bool {
    let coord = |key: &str| point.get(key).and_then(Value::as_f64).is_some_and(f64::is_finite);
    coord("x") && coord("y")
}

fn template_data(input: &SendEmailRequest) -> TemplateData {
    TemplateData {
        guest_name: input.guest_name.clone(),
        guest_email: input.guest_email.clone(),
        property: input.property.clone(),
        inspection_date: input.inspection_date.clone().unwrap_or_default(),
        form_id: input.form_id.clone(),
        form_link: input.form_link.clone(),
        cart_type: input.cart_type.clone(),
        cart_number: input.cart_number.clone(),
        observations: input.observations.clone(),
        pdf_url: input.pdf_url.clone(),
        damage: None,
    }
}

fn build_message(
    state: &AppState,
    input: &SendEmailRequest,
    rendered: RenderedEmail,
    recipients: Vec<String>,
) -> AppResult<EmailMessage> {
    let subject = input
        .subject
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(rendered.subject);
    let mut message = state.email.message(recipients, subject, rendered.html);
    if let Some(reply_to) = input.reply_to.clone().filter(|r| !r.trim().is_empty()) {
        message = message.with_reply_to(Some(reply_to));
    }

    if let Some(pdf) = input.pdf_base64.as_deref().filter(|p| !p.trim().is_empty()) {
        let payload = pdf.split_once("base64,").map_or(pdf, |(_, data)| data);
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| AppError::BadRequest(format!("Invalid pdfBase64: {e}")))?;
        let name = input.form_id.as_deref().unwrap_or("form");
        message = message.with_attachment(Attachment::pdf(format!("inspection_{name}.pdf"), bytes));
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn request() -> SendEmailRequest {
        SendEmailRequest {
            guest_name: "Ana Rivera".into(),
            guest_email: "ana@example.com".into(),
            property: "Rental #150".into(),
            ..Default::default()
        }
    }

    #[test]
    fn kind_defaults_to_guest_form() {
        assert_eq!(EmailKind::resolve(None, false).unwrap(), EmailKind::GuestForm);
        assert_eq!(
            EmailKind::resolve(Some("guest-form"), true).unwrap(),
            EmailKind::AdminAlert
        );
        assert_matches!(EmailKind::resolve(Some("x"), false), Err(AppError::BadRequest(_)));
    }

    #[test]
    fn missing_fields_are_listed() {
        let mut input = request();
        input.guest_email.clear();
        input.property = " ".into();
        let err = validate_request(&input).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: Missing required fields: guestEmail, property"
        );
    }

    #[test]
    fn points_need_numeric_coordinates() {
        let mut input = request();
        input.diagram_points = Some(vec![
            json!({ "x": 10, "y": 20.5, "color": "red" }),
            json!({ "x": "10", "y": 20 }),
            json!(null),
        ]);
        let err = validate_request(&input).unwrap_err();
        assert!(err.to_string().contains("2 of 3"));
    }

    #[test]
    fn diagram_must_be_image_data_url() {
        let mut input = request();
        input.diagram_base64 = Some("data:text/plain;base64,aGk=".into());
        assert!(validate_request(&input).is_err());

        input.diagram_base64 = Some("data:image/png;base64,aGk=".into());
        assert!(validate_request(&input).is_ok());
    }
}
