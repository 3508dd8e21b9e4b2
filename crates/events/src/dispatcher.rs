//! Notification dispatcher.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and turns each [`InspectionEvent`] into outbound emails and, for
//! completed inspections, an Airtable record. Failures are logged with the
//! inspection id and never propagated back to the request that published
//! the event.

use std::sync::Arc;

use cartcheck_db::repositories::InspectionRepo;
use cartcheck_db::DbPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::{InspectionEvent, InspectionSnapshot};
use crate::delivery::airtable::{AirtableClient, AirtableRecord};
use crate::delivery::email::{parse_recipients, Attachment, EmailDelivery, EmailMessage};
use crate::templates::{self, TemplateData};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Administrator recipient lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Alerted when an inspection is created.
    pub created_admins: Vec<String>,
    /// Sent the signed PDF when an inspection is completed.
    pub completed_admins: Vec<String>,
}

impl NotificationConfig {
    /// Load recipient lists from environment variables.
    ///
    /// | Variable                      | Default |
    /// |-------------------------------|---------|
    /// | `ADMIN_EMAILS_FORM_CREATED`   | empty   |
    /// | `ADMIN_EMAILS_FORM_COMPLETED` | empty   |
    ///
    /// Both are comma separated.
    pub fn from_env() -> Self {
        let list = |name: &str| {
            std::env::var(name)
                .map(|v| parse_recipients(&v))
                .unwrap_or_default()
        };
        Self {
            created_admins: list("ADMIN_EMAILS_FORM_CREATED"),
            completed_admins: list("ADMIN_EMAILS_FORM_COMPLETED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Background service delivering inspection notifications.
pub struct NotificationDispatcher {
    pool: DbPool,
    email: Arc<EmailDelivery>,
    airtable: Option<Arc<AirtableClient>>,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    pub fn new(
        pool: DbPool,
        email: Arc<EmailDelivery>,
        airtable: Option<Arc<AirtableClient>>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            pool,
            email,
            airtable,
            config,
        }
    }

    /// Run the dispatch loop until `cancel` fires or the bus is dropped.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<InspectionEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!(
            provider = self.email.config().provider.name(),
            airtable = self.airtable.is_some(),
            "Notification dispatcher started"
        );
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Notification dispatcher cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.handle(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Notification dispatcher lagged, some notifications were not sent"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, notification dispatcher shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Deliver every notification for one event.
    pub async fn handle(&self, event: &InspectionEvent) {
        match event {
            InspectionEvent::Created {
                inspection,
                form_link,
                ..
            } => self.on_created(inspection, form_link).await,
            InspectionEvent::Completed {
                inspection,
                pdf_url,
                pdf_attachment,
                ..
            } => {
                self.on_completed(
                    inspection,
                    pdf_url.as_deref(),
                    pdf_attachment.as_ref().map(|a| a.as_slice()),
                )
                .await
            }
        }
    }

    async fn on_created(&self, inspection: &InspectionSnapshot, form_link: &str) {
        let guest = guest_invitation(&self.email, inspection, form_link);
        let admin = admin_created_alert(&self.email, inspection, &self.config.created_admins);

        let (guest_result, ()) = futures::join!(self.email.send(&guest), async {
            if let Some(admin) = &admin {
                self.send_logged(admin, inspection, "admin_alert").await;
            }
        });
        match guest_result {
            Ok(_) => tracing::info!(
                inspection_id = %inspection.id,
                form_id = %inspection.form_id,
                "Guest invitation sent"
            ),
            Err(e) => tracing::error!(
                inspection_id = %inspection.id,
                error = %e,
                "Failed to send guest invitation"
            ),
        }
    }

    async fn on_completed(
        &self,
        inspection: &InspectionSnapshot,
        pdf_url: Option<&str>,
        pdf_attachment: Option<&[u8]>,
    ) {
        let guest = guest_confirmation(&self.email, inspection);
        let admin = admin_signed_notice(
            &self.email,
            inspection,
            pdf_url,
            pdf_attachment,
            &self.config.completed_admins,
        );

        futures::join!(
            self.send_logged(&guest, inspection, "guest_confirmation"),
            async {
                if let Some(admin) = &admin {
                    self.send_logged(admin, inspection, "admin_signed").await;
                }
            },
            self.sync_airtable(inspection, pdf_url),
        );
    }

    async fn send_logged(&self, message: &EmailMessage, inspection: &InspectionSnapshot, kind: &str) {
        if let Err(e) = self.email.send(message).await {
            tracing::error!(
                inspection_id = %inspection.id,
                kind,
                error = %e,
                "Failed to send notification email"
            );
        }
    }

    /// Create or find the Airtable row, remember its id and attach the PDF.
    async fn sync_airtable(&self, inspection: &InspectionSnapshot, pdf_url: Option<&str>) {
        let Some(airtable) = &self.airtable else {
            return;
        };

        let record = airtable_record(inspection);
        let record_id = match airtable.sync_inspection(&record, pdf_url).await {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(
                    inspection_id = %inspection.id,
                    form_id = %inspection.form_id,
                    error = %e,
                    "Airtable sync failed"
                );
                return;
            }
        };

        if let Err(e) = InspectionRepo::set_airtable_record(&self.pool, inspection.id, &record_id).await {
            tracing::error!(
                inspection_id = %inspection.id,
                record_id = %record_id,
                error = %e,
                "Failed to store Airtable record id"
            );
        }

        if let Some(pdf_url) = pdf_url {
            if !airtable.update_pdf_link(&record_id, pdf_url).await {
                tracing::warn!(
                    inspection_id = %inspection.id,
                    record_id = %record_id,
                    "Airtable record was not marked as signed"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

/// Template values for an inspection snapshot.
pub fn template_data(inspection: &InspectionSnapshot) -> TemplateData {
    TemplateData {
        guest_name: inspection.guest_name.clone(),
        guest_email: inspection.guest_email.clone(),
        property: inspection.property.clone(),
        inspection_date: inspection.inspection_date.format("%Y-%m-%d").to_string(),
        form_id: Some(inspection.form_id.clone()),
        form_link: None,
        cart_type: Some(inspection.cart_type.clone()),
        cart_number: Some(inspection.cart_number.clone()),
        observations: Some(inspection.observations.clone()),
        pdf_url: None,
        damage: Some(inspection.damage),
    }
}

/// File name of the emailed PDF.
pub fn attachment_name(form_id: &str) -> String {
    format!("inspection_{form_id}.pdf")
}

fn guest_invitation(email: &EmailDelivery, inspection: &InspectionSnapshot, form_link: &str) -> EmailMessage {
    let data = TemplateData {
        form_link: Some(form_link.to_string()),
        ..template_data(inspection)
    };
    let rendered = templates::form_created(&data);
    email.message(vec![inspection.guest_email.clone()], rendered.subject, rendered.html)
}

fn admin_created_alert(
    email: &EmailDelivery,
    inspection: &InspectionSnapshot,
    admins: &[String],
) -> Option<EmailMessage> {
    if admins.is_empty() {
        return None;
    }
    let rendered = templates::admin_form_created_alert(&template_data(inspection));
    Some(email.message(admins.to_vec(), rendered.subject, rendered.html))
}

fn guest_confirmation(email: &EmailDelivery, inspection: &InspectionSnapshot) -> EmailMessage {
    let rendered = templates::completion_confirmation(&template_data(inspection));
    email.message(vec![inspection.guest_email.clone()], rendered.subject, rendered.html)
}

fn admin_signed_notice(
    email: &EmailDelivery,
    inspection: &InspectionSnapshot,
    pdf_url: Option<&str>,
    pdf_attachment: Option<&[u8]>,
    admins: &[String],
) -> Option<EmailMessage> {
    if admins.is_empty() {
        return None;
    }
    let data = TemplateData {
        pdf_url: pdf_url.map(str::to_string),
        ..template_data(inspection)
    };
    let rendered = templates::form_signed_admin(&data);
    let mut message = email.message(admins.to_vec(), rendered.subject, rendered.html);
    if let Some(pdf) = pdf_attachment {
        message = message.with_attachment(Attachment::pdf(
            attachment_name(&inspection.form_id),
            pdf.to_vec(),
        ));
    }
    Some(message)
}

fn airtable_record(inspection: &InspectionSnapshot) -> AirtableRecord {
    AirtableRecord {
        form_id: inspection.form_id.clone(),
        inspection_status: inspection.status.record_label().to_string(),
        guest_name: inspection.guest_name.clone(),
        property: inspection.property.clone(),
        inspection_date: inspection.inspection_date.format("%Y-%m-%d").to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::tests::snapshot;
    use crate::bus::EventBus;
    use crate::delivery::email::{EmailConfig, EmailProvider, DEFAULT_FROM_ADDRESS};
    use crate::test_support::{fake_resend, Log};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    fn lazy_pool() -> DbPool {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://cartcheck@127.0.0.1:1/unused")
            .unwrap()
    }

    async fn dispatcher(admins: NotificationConfig) -> (NotificationDispatcher, Log) {
        let (url, log) = fake_resend(0).await;
        let email = EmailDelivery::new(EmailConfig {
            provider: EmailProvider::Resend {
                api_url: url,
                api_key: "re_test".to_string(),
            },
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            reply_to: None,
        })
        .unwrap()
        .with_retry_delays(Vec::new());
        (
            NotificationDispatcher::new(lazy_pool(), Arc::new(email), None, admins),
            log,
        )
    }

    fn admins() -> NotificationConfig {
        NotificationConfig {
            created_admins: vec!["ops@example.com".to_string(), "desk@example.com".to_string()],
            completed_admins: vec!["owner@example.com".to_string()],
        }
    }

    #[test]
    fn template_data_formats_date_and_damage() {
        let data = template_data(&snapshot());
        assert_eq!(data.inspection_date, "2025-04-09");
        assert_eq!(data.damage.unwrap().total(), 3);
        assert_eq!(data.form_id.as_deref(), Some("LUXEINSP-AR-1234"));
    }

    #[test]
    fn airtable_record_uses_signed_label() {
        let record = airtable_record(&snapshot());
        assert_eq!(record.inspection_status, "Signed");
        assert_eq!(record.inspection_date, "2025-04-09");
    }

    #[test]
    fn admin_notice_skipped_without_recipients() {
        let email = EmailDelivery::new(EmailConfig::log_only()).unwrap();
        assert!(admin_signed_notice(&email, &snapshot(), None, None, &[]).is_none());
        assert!(admin_created_alert(&email, &snapshot(), &[]).is_none());
    }

    #[test]
    fn admin_notice_attaches_pdf() {
        let email = EmailDelivery::new(EmailConfig::log_only()).unwrap();
        let message = admin_signed_notice(
            &email,
            &snapshot(),
            Some("https://files.example.com/a.pdf"),
            Some(b"%PDF-1.4"),
            &["owner@example.com".to_string()],
        )
        .unwrap();
        assert_eq!(message.subject, "Inspection Form Signed - Rental #150");
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].filename, "inspection_LUXEINSP-AR-1234.pdf");
        assert!(message.html.contains("https://files.example.com/a.pdf"));
    }

    #[tokio::test]
    async fn created_event_emails_guest_and_admins() {
        let (dispatcher, log) = dispatcher(admins()).await;
        dispatcher
            .handle(&InspectionEvent::created(snapshot(), "https://app.example.com/inspection/x"))
            .await;

        let calls = log.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let guest = calls
            .iter()
            .find(|c| c.body["to"][0] == "ana@example.com")
            .expect("guest email");
        assert_eq!(guest.body["subject"], "Golf Cart Inspection Form for Rental #150");
        assert!(guest.body["html"]
            .as_str()
            .unwrap()
            .contains("https://app.example.com/inspection/x"));

        let admin = calls
            .iter()
            .find(|c| c.body["to"].as_array().unwrap().len() == 2)
            .expect("admin alert");
        assert_eq!(admin.body["subject"], "Alert: New form has been created for Rental #150");
    }

    #[tokio::test]
    async fn completed_event_sends_pdf_to_admins() {
        let (dispatcher, log) = dispatcher(admins()).await;
        dispatcher
            .handle(&InspectionEvent::completed(
                snapshot(),
                Some("https://files.example.com/a.pdf".to_string()),
                Some(b"%PDF-1.4".to_vec()),
            ))
            .await;

        let calls = log.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let admin = calls
            .iter()
            .find(|c| c.body["to"][0] == "owner@example.com")
            .expect("admin email");
        let attachment = &admin.body["attachments"][0];
        assert_eq!(attachment["filename"], "inspection_LUXEINSP-AR-1234.pdf");
        assert_eq!(attachment["content"], STANDARD.encode(b"%PDF-1.4"));

        let guest = calls
            .iter()
            .find(|c| c.body["to"][0] == "ana@example.com")
            .expect("guest email");
        assert_eq!(guest.body["subject"], "Golf Cart Inspection Completed for Rental #150");
        assert!(guest.body.get("attachments").is_none());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (dispatcher, _log) = dispatcher(NotificationConfig::default()).await;
        let bus = EventBus::default();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(dispatcher.run(bus.subscribe(), cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher stopped")
            .unwrap();
    }

    #[tokio::test]
    async fn run_stops_when_bus_dropped() {
        let (dispatcher, log) = dispatcher(NotificationConfig::default()).await;
        let bus = EventBus::default();
        let handle = tokio::spawn(dispatcher.run(bus.subscribe(), CancellationToken::new()));

        bus.publish(InspectionEvent::created(snapshot(), "https://app.example.com/inspection/x"));
        drop(bus);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("dispatcher stopped")
            .unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
