//! Airtable record sync.
//!
//! Each signed inspection is mirrored as one row of an Airtable table,
//! keyed by the `Form Id` field. [`AirtableClient::sync_inspection`]
//! finds or creates the row; [`AirtableClient::update_pdf_link`] marks it
//! signed and points it at the stored PDF.

use std::time::Duration;

use reqwest::Url;
use serde_json::{json, Value};

use crate::templates::is_http_url;

pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Status value written once the PDF link is attached.
pub const SIGNED_STATUS: &str = "Signed";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AirtableError {
    #[error("Missing Airtable environment variables: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("Invalid Airtable API URL: {0}")]
    InvalidApiUrl(String),

    #[error("Airtable record has empty fields: {}", .0.join(", "))]
    EmptyFields(Vec<&'static str>),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Airtable returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableConfig {
    pub base_id: String,
    pub table_name: String,
    pub api_key: String,
    pub api_url: String,
}

impl AirtableConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable              | Required | Default                        |
    /// |-----------------------|----------|--------------------------------|
    /// | `AIRTABLE_BASE_ID`    | yes      | none                           |
    /// | `AIRTABLE_TABLE_NAME` | yes      | none                           |
    /// | `AIRTABLE_API_KEY`    | yes      | none                           |
    /// | `AIRTABLE_API_URL`    | no       | `https://api.airtable.com/v0`  |
    ///
    /// The error names every missing variable.
    pub fn from_env() -> Result<Self, AirtableError> {
        Self::from_lookup(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AirtableError> {
        let base_id = var("AIRTABLE_BASE_ID");
        let table_name = var("AIRTABLE_TABLE_NAME");
        let api_key = var("AIRTABLE_API_KEY");

        match (base_id, table_name, api_key) {
            (Some(base_id), Some(table_name), Some(api_key)) => Ok(Self {
                base_id,
                table_name,
                api_key,
                api_url: var("AIRTABLE_API_URL")
                    .unwrap_or_else(|| DEFAULT_AIRTABLE_API_URL.to_string()),
            }),
            (base_id, table_name, api_key) => {
                let missing = [
                    ("AIRTABLE_BASE_ID", base_id.is_none()),
                    ("AIRTABLE_TABLE_NAME", table_name.is_none()),
                    ("AIRTABLE_API_KEY", api_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(AirtableError::MissingConfig(missing))
            }
        }
    }

    /// `{api_url}/{base_id}/{table_name}` with path segments encoded.
    pub fn table_url(&self) -> Result<Url, AirtableError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| AirtableError::InvalidApiUrl(format!("{}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| AirtableError::InvalidApiUrl(self.api_url.clone()))?
            .pop_if_empty()
            .push(&self.base_id)
            .push(&self.table_name);
        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// The inspection fields mirrored to Airtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableRecord {
    pub form_id: String,
    pub inspection_status: String,
    pub guest_name: String,
    pub property: String,
    /// `YYYY-MM-DD`.
    pub inspection_date: String,
}

impl AirtableRecord {
    fn fields(&self, pdf_link: &str) -> Result<Value, AirtableError> {
        let pairs = [
            ("Form Id", self.form_id.as_str()),
            ("Inspection Status", self.inspection_status.as_str()),
            ("Guest Name", self.guest_name.as_str()),
            ("Property", self.property.as_str()),
            ("Inspection Date", self.inspection_date.as_str()),
            ("PDF Link", pdf_link),
        ];
        let empty: Vec<&'static str> = pairs
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !empty.is_empty() {
            return Err(AirtableError::EmptyFields(empty));
        }

        let fields: serde_json::Map<String, Value> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        Ok(Value::Object(fields))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AirtableClient {
    config: AirtableConfig,
    client: reqwest::Client,
}

impl AirtableClient {
    pub fn new(config: AirtableConfig) -> Result<Self, AirtableError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AirtableConfig {
        &self.config
    }

    /// Find or create the row for `record`, returning its Airtable id.
    ///
    /// Returns `Ok(None)` without touching the API when there is no PDF
    /// link or the link is not an absolute URL: only signed inspections are
    /// mirrored.
    pub async fn sync_inspection(
        &self,
        record: &AirtableRecord,
        pdf_link: Option<&str>,
    ) -> Result<Option<String>, AirtableError> {
        let Some(pdf_link) = pdf_link.filter(|l| !l.trim().is_empty()) else {
            tracing::info!(form_id = %record.form_id, "No signed PDF yet, skipping Airtable sync");
            return Ok(None);
        };
        if !is_http_url(pdf_link) {
            tracing::warn!(form_id = %record.form_id, pdf_link, "PDF link is not a valid URL, skipping Airtable sync");
            return Ok(None);
        }

        let fields = record.fields(pdf_link)?;

        if let Some(existing) = self.find_by_form_id(&record.form_id).await? {
            tracing::info!(form_id = %record.form_id, record_id = %existing, "Airtable record already exists");
            return Ok(Some(existing));
        }

        let response = self
            .client
            .post(self.config.table_url()?)
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let body = read_body(response).await?;

        let record_id = body
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AirtableError::Api {
                status: 200,
                message: "response did not include a record id".to_string(),
            })?;
        tracing::info!(form_id = %record.form_id, record_id = %record_id, "Airtable record created");
        Ok(Some(record_id))
    }

    /// Look up the id of the row whose `Form Id` equals `form_id`.
    pub async fn find_by_form_id(&self, form_id: &str) -> Result<Option<String>, AirtableError> {
        let formula = format!("{{Form Id}}='{}'", form_id.replace('\'', "\\'"));
        let response = self
            .client
            .get(self.config.table_url()?)
            .bearer_auth(&self.config.api_key)
            .query(&[("filterByFormula", formula)])
            .send()
            .await?;
        let body = read_body(response).await?;

        Ok(body
            .get("records")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Attach the PDF link to a row and mark it signed.
    ///
    /// Returns `false` when the URL is invalid, the request fails, the API
    /// reports an error, or the returned status is not `Signed`.
    pub async fn update_pdf_link(&self, record_id: &str, pdf_url: &str) -> bool {
        if !is_http_url(pdf_url) {
            tracing::warn!(record_id, pdf_url, "PDF URL is not valid, not updating Airtable");
            return false;
        }

        match self.patch_pdf_link(record_id, pdf_url).await {
            Ok(body) => {
                let status = body
                    .get("fields")
                    .and_then(|f| f.get("Inspection Status"))
                    .and_then(Value::as_str);
                match status {
                    Some(status) if status != SIGNED_STATUS => {
                        tracing::error!(record_id, status, "Airtable status was not updated to Signed");
                        false
                    }
                    _ => {
                        tracing::info!(record_id, "Airtable record marked as signed");
                        true
                    }
                }
            }
            Err(e) => {
                tracing::error!(record_id, error = %e, "Failed to update Airtable PDF link");
                false
            }
        }
    }

    async fn patch_pdf_link(&self, record_id: &str, pdf_url: &str) -> Result<Value, AirtableError> {
        let mut url = self.config.table_url()?;
        url.path_segments_mut()
            .map_err(|()| AirtableError::InvalidApiUrl(self.config.api_url.clone()))?
            .push(record_id);

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "fields": {
                    "PDF Link": pdf_url,
                    "Inspection Status": SIGNED_STATUS,
                },
                "typecast": true,
            }))
            .send()
            .await?;
        read_body(response).await
    }
}

/// Decode a JSON response, turning HTTP and API-level errors into
/// [`AirtableError::Api`].
async fn read_body(response: reqwest::Response) -> Result<Value, AirtableError> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    let api_error = body.get("error").filter(|e| !e.is_null()).or_else(|| body.get("message"));
    if !status.is_success() || api_error.is_some() {
        let message = api_error
            .map(|e| match e {
                Value::String(s) => s.clone(),
                other => other
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            })
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(AirtableError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, Log};
    use assert_matches::assert_matches;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::routing::{any, patch};
    use axum::{Json, Router};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn record() -> AirtableRecord {
        AirtableRecord {
            form_id: "LUXEINSP-AR-1234".to_string(),
            inspection_status: "Signed".to_string(),
            guest_name: "Ana Rivera".to_string(),
            property: "Rental #150".to_string(),
            inspection_date: "2025-04-09".to_string(),
        }
    }

    /// Fake Airtable table. `existing` is returned by searches; PATCH
    /// responses report `patched_status`.
    async fn fake_airtable(existing: Option<&'static str>, patched_status: &'static str) -> (AirtableClient, Log) {
        let log = test_support::new_log();
        let table = any(
            move |State(log): State<Log>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
                test_support::record(&log, &method, &uri, &headers, &body);
                if method == Method::GET {
                    let records: Vec<Value> = existing.iter().map(|id| json!({ "id": id })).collect();
                    return (StatusCode::OK, Json(json!({ "records": records })));
                }
                (StatusCode::OK, Json(json!({ "id": "recNEW", "fields": {} })))
            },
        );
        let row = patch(
            move |State(log): State<Log>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
                test_support::record(&log, &method, &uri, &headers, &body);
                Json(json!({ "id": "recNEW", "fields": { "Inspection Status": patched_status } }))
            },
        );
        let app = Router::new()
            .route("/v0/appBASE/Inspections", table)
            .route("/v0/appBASE/Inspections/{record_id}", row)
            .with_state(log.clone());
        let base = test_support::spawn(app).await;

        let client = AirtableClient::new(AirtableConfig {
            base_id: "appBASE".to_string(),
            table_name: "Inspections".to_string(),
            api_key: "key_test".to_string(),
            api_url: format!("{base}/v0"),
        })
        .unwrap();
        (client, log)
    }

    #[test]
    fn missing_config_names_every_variable() {
        let err = AirtableConfig::from_lookup(lookup(&[("AIRTABLE_TABLE_NAME", "T")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing Airtable environment variables: AIRTABLE_BASE_ID, AIRTABLE_API_KEY"
        );
    }

    #[test]
    fn config_defaults_api_url_and_encodes_table() {
        let cfg = AirtableConfig::from_lookup(lookup(&[
            ("AIRTABLE_BASE_ID", "appX"),
            ("AIRTABLE_TABLE_NAME", "Golf Carts"),
            ("AIRTABLE_API_KEY", "k"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_url, DEFAULT_AIRTABLE_API_URL);
        assert_eq!(
            cfg.table_url().unwrap().as_str(),
            "https://api.airtable.com/v0/appX/Golf%20Carts"
        );
    }

    #[test]
    fn empty_fields_are_reported() {
        let mut r = record();
        r.guest_name.clear();
        assert_matches!(
            r.fields("https://x.example/a.pdf"),
            Err(AirtableError::EmptyFields(names)) if names == vec!["Guest Name"]
        );
    }

    #[tokio::test]
    async fn sync_without_valid_link_is_a_no_op() {
        let (client, log) = fake_airtable(None, "Signed").await;
        assert_eq!(client.sync_inspection(&record(), None).await.unwrap(), None);
        assert_eq!(client.sync_inspection(&record(), Some("pdfs/a.pdf")).await.unwrap(), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_creates_record_when_absent() {
        let (client, log) = fake_airtable(None, "Signed").await;
        let id = client
            .sync_inspection(&record(), Some("https://files.example.com/a.pdf"))
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("recNEW"));

        let calls = log.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "GET");
        assert!(calls[0].uri.contains("filterByFormula="));
        assert_eq!(calls[1].method, "POST");
        assert_eq!(calls[1].authorization.as_deref(), Some("Bearer key_test"));
        let fields = &calls[1].body["fields"];
        assert_eq!(fields["Form Id"], "LUXEINSP-AR-1234");
        assert_eq!(fields["PDF Link"], "https://files.example.com/a.pdf");
        assert_eq!(fields["Inspection Date"], "2025-04-09");
    }

    #[tokio::test]
    async fn sync_returns_existing_record() {
        let (client, log) = fake_airtable(Some("recOLD"), "Signed").await;
        let id = client
            .sync_inspection(&record(), Some("https://files.example.com/a.pdf"))
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("recOLD"));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_pdf_link_patches_with_typecast() {
        let (client, log) = fake_airtable(None, "Signed").await;
        assert!(client.update_pdf_link("recNEW", "https://files.example.com/a.pdf").await);

        let calls = log.lock().unwrap();
        assert_eq!(calls[0].method, "PATCH");
        assert!(calls[0].uri.ends_with("/recNEW"));
        assert_eq!(calls[0].body["typecast"], true);
        assert_eq!(calls[0].body["fields"]["Inspection Status"], "Signed");
    }

    #[tokio::test]
    async fn update_pdf_link_reports_failures() {
        let (client, _log) = fake_airtable(None, "Pending").await;
        assert!(!client.update_pdf_link("recNEW", "https://files.example.com/a.pdf").await);
        assert!(!client.update_pdf_link("recNEW", "not a url").await);
    }
}
