//! Inspection lifecycle, field validation and naming rules.

use std::str::FromStr;

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::CoreError;
use crate::property;

/// Prefix of every human-facing form id.
pub const FORM_ID_PREFIX: &str = "LUXEINSP";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of an inspection. The only transition is
/// `pending -> completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Pending,
    Completed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// Label used by the external record store.
    pub fn record_label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Signed",
        }
    }
}

impl FromStr for InspectionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(CoreError::Validation(format!(
                "Invalid inspection status '{s}'. Must be one of: pending, completed"
            ))),
        }
    }
}

/// Check that moving from `from` to `to` is allowed.
pub fn ensure_transition(from: InspectionStatus, to: InspectionStatus) -> Result<(), CoreError> {
    match (from, to) {
        (InspectionStatus::Pending, InspectionStatus::Completed) => Ok(()),
        (InspectionStatus::Completed, InspectionStatus::Completed) => Err(CoreError::Conflict(
            "Inspection has already been completed".to_string(),
        )),
        (from, to) => Err(CoreError::Conflict(format!(
            "Cannot move inspection from {} to {}",
            from.as_str(),
            to.as_str()
        ))),
    }
}

/// Reject edits to anything that is no longer pending.
pub fn ensure_editable(status: InspectionStatus) -> Result<(), CoreError> {
    match status {
        InspectionStatus::Pending => Ok(()),
        InspectionStatus::Completed => Err(CoreError::Conflict(
            "Inspection has already been completed and can no longer be edited".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the admin-supplied fields of a new inspection.
///
/// Returns the catalog entry for `property_name`.
pub fn validate_new_inspection(
    guest_name: &str,
    guest_email: &str,
    property_name: &str,
) -> Result<&'static property::Property, CoreError> {
    if guest_name.trim().is_empty() {
        return Err(CoreError::Validation("guest_name is required".to_string()));
    }
    if guest_email.trim().is_empty() {
        return Err(CoreError::Validation("guest_email is required".to_string()));
    }
    if !guest_email.trim().validate_email() {
        return Err(CoreError::Validation(format!(
            "guest_email '{guest_email}' is not a valid email address"
        )));
    }
    property::find_by_name(property_name).ok_or_else(|| {
        CoreError::Validation(format!("Unknown property '{property_name}'"))
    })
}

/// A guest submission must carry a signature.
pub fn validate_completion(signature_data: Option<&str>) -> Result<(), CoreError> {
    match signature_data {
        Some(sig) if !sig.trim().is_empty() => Ok(()),
        _ => Err(CoreError::Validation(
            "Please provide your signature before submitting".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Uppercase initials of every whitespace-separated word.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Format a form id from a guest name and a four-digit number.
pub fn format_form_id(guest_name: &str, number: u16) -> String {
    format!("{FORM_ID_PREFIX}-{}-{number:04}", initials(guest_name))
}

/// Generate `LUXEINSP-<INITIALS>-<NNNN>` with a random number in 1000..=9999.
pub fn generate_form_id(guest_name: &str) -> String {
    let number = rand::rng().random_range(1000..=9999);
    format_form_id(guest_name, number)
}

/// Lowercase and join whitespace-separated words with `sep`.
pub fn slugify_with(value: &str, sep: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(sep)
}

/// Lowercase and join whitespace-separated words with `-`.
pub fn slugify(value: &str) -> String {
    slugify_with(value, "-")
}

/// Object key of the signed PDF inside the `pdfs` bucket.
pub fn pdf_object_key(form_id: &str, inspection_date: NaiveDate) -> String {
    format!(
        "{}_{}.pdf",
        slugify_with(form_id, "_"),
        inspection_date.format("%Y_%m_%d")
    )
}

/// File name offered to the guest when downloading the PDF.
pub fn download_file_name(property_name: &str) -> String {
    format!("inspection-form-{}.pdf", slugify(property_name))
}
