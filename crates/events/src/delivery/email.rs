//! Email delivery.
//!
//! [`EmailDelivery`] sends an [`EmailMessage`] through one of three
//! providers, chosen by [`EmailConfig::from_env`]:
//!
//! - `resend`: JSON POST to the Resend HTTP API, retried with fixed delays.
//! - `smtp`: the `lettre` async SMTP transport (STARTTLS).
//! - `log`: no network; the message is logged. Used in development and
//!   tests.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

/// Retry delays for the Resend provider.
const RETRY_DELAYS_SECS: [u64; 2] = [1, 2];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender when `EMAIL_FROM` is not set.
pub const DEFAULT_FROM_ADDRESS: &str = "Luxe Properties <noreply@luxepropertiespr.com>";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The HTTP request to the provider failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("Email provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Email has no recipients")]
    NoRecipients,

    #[error("Email configuration error: {0}")]
    Config(String),
}

impl EmailError {
    /// Whether another attempt could succeed.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A file attached to an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/pdf".to_string(),
            content,
        }
    }
}

/// A provider-independent HTML email.
///
/// All recipients go into a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    pub fn new(
        from: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to,
            subject: subject.into(),
            html: html.into(),
            reply_to: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_reply_to(mut self, reply_to: Option<String>) -> Self {
        self.reply_to = reply_to;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Split a comma-separated recipient list, dropping blanks.
pub fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Which backend delivers email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailProvider {
    Resend {
        api_url: String,
        api_key: String,
    },
    Smtp {
        host: String,
        port: u16,
        user: Option<String>,
        password: Option<String>,
    },
    Log,
}

impl EmailProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resend { .. } => "resend",
            Self::Smtp { .. } => "smtp",
            Self::Log => "log",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    /// RFC 5322 "From" address, display name allowed.
    pub from_address: String,
    /// Default "Reply-To" for outgoing mail.
    pub reply_to: Option<String>,
}

impl EmailConfig {
    /// A config that only logs messages.
    pub fn log_only() -> Self {
        Self {
            provider: EmailProvider::Log,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            reply_to: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Without `EMAIL_PROVIDER` the provider is `resend` when
    /// `RESEND_API_KEY` is set, `smtp` when `SMTP_HOST` is set, and `log`
    /// otherwise.
    ///
    /// | Variable         | Required         | Default                          |
    /// |------------------|------------------|----------------------------------|
    /// | `EMAIL_PROVIDER` | no               | inferred                         |
    /// | `EMAIL_FROM`     | no               | `Luxe Properties <noreply@...>`  |
    /// | `EMAIL_REPLY_TO` | no               | none                             |
    /// | `RESEND_API_KEY` | for `resend`     | none                             |
    /// | `RESEND_API_URL` | no               | `https://api.resend.com/emails`  |
    /// | `SMTP_HOST`      | for `smtp`       | none                             |
    /// | `SMTP_PORT`      | no               | `587`                            |
    /// | `SMTP_USER`      | no               | none                             |
    /// | `SMTP_PASSWORD`  | no               | none                             |
    pub fn from_env() -> Result<Self, EmailError> {
        Self::from_lookup(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, EmailError> {
        let provider_name = var("EMAIL_PROVIDER").map(|p| p.trim().to_ascii_lowercase());
        let provider_name = provider_name.unwrap_or_else(|| {
            if var("RESEND_API_KEY").is_some() {
                "resend".to_string()
            } else if var("SMTP_HOST").is_some() {
                "smtp".to_string()
            } else {
                "log".to_string()
            }
        });

        let provider = match provider_name.as_str() {
            "resend" => EmailProvider::Resend {
                api_url: var("RESEND_API_URL")
                    .unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),
                api_key: var("RESEND_API_KEY").ok_or_else(|| {
                    EmailError::Config("RESEND_API_KEY must be set for the resend provider".into())
                })?,
            },
            "smtp" => EmailProvider::Smtp {
                host: var("SMTP_HOST").ok_or_else(|| {
                    EmailError::Config("SMTP_HOST must be set for the smtp provider".into())
                })?,
                port: var("SMTP_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_SMTP_PORT),
                user: var("SMTP_USER"),
                password: var("SMTP_PASSWORD"),
            },
            "log" => EmailProvider::Log,
            other => {
                return Err(EmailError::Config(format!(
                    "Unknown EMAIL_PROVIDER '{other}'. Must be one of: resend, smtp, log"
                )))
            }
        };

        Ok(Self {
            provider,
            from_address: var("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            reply_to: var("EMAIL_REPLY_TO"),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
}

/// Sends [`EmailMessage`]s through the configured provider.
pub struct EmailDelivery {
    config: EmailConfig,
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            config,
            client,
            retry_delays: RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        })
    }

    /// Override the delays between Resend attempts.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }

    /// Start a message from the configured sender and reply-to.
    pub fn message(
        &self,
        to: Vec<String>,
        subject: impl Into<String>,
        html: impl Into<String>,
    ) -> EmailMessage {
        EmailMessage::new(self.config.from_address.clone(), to, subject, html)
            .with_reply_to(self.config.reply_to.clone())
    }

    /// Send a message. Returns the provider's message id when it reports one.
    pub async fn send(&self, message: &EmailMessage) -> Result<Option<String>, EmailError> {
        if message.to.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let result = match &self.config.provider {
            EmailProvider::Resend { api_url, api_key } => {
                self.send_resend(api_url, api_key, message).await
            }
            EmailProvider::Smtp {
                host,
                port,
                user,
                password,
            } => send_smtp(host, *port, user.as_deref(), password.as_deref(), message)
                .await
                .map(|()| None),
            EmailProvider::Log => {
                tracing::info!(
                    to = ?message.to,
                    subject = %message.subject,
                    html_len = message.html.len(),
                    attachments = message.attachments.len(),
                    "Email (log provider, not sent)",
                );
                Ok(None)
            }
        };

        if result.is_ok() {
            tracing::info!(
                provider = self.config.provider.name(),
                to = ?message.to,
                subject = %message.subject,
                "Email sent",
            );
        }
        result
    }

    /// POST to Resend, retrying network errors, 429 and 5xx responses.
    async fn send_resend(
        &self,
        api_url: &str,
        api_key: &str,
        message: &EmailMessage,
    ) -> Result<Option<String>, EmailError> {
        let payload = ResendPayload {
            from: &message.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
            reply_to: message.reply_to.as_deref(),
            attachments: message
                .attachments
                .iter()
                .map(|a| ResendAttachment {
                    filename: &a.filename,
                    content: STANDARD.encode(&a.content),
                })
                .collect(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_resend(api_url, api_key, &payload).await {
                Ok(id) => return Ok(id),
                Err(e) if e.is_retryable() && attempt <= self.retry_delays.len() => {
                    tracing::warn!(
                        attempt,
                        subject = %message.subject,
                        error = %e,
                        "Email delivery attempt failed, retrying",
                    );
                    tokio::time::sleep(self.retry_delays[attempt - 1]).await;
                }
                Err(e) => {
                    tracing::error!(
                        attempt,
                        subject = %message.subject,
                        error = %e,
                        "Email delivery failed",
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn try_resend(
        &self,
        api_url: &str,
        api_key: &str,
        payload: &ResendPayload<'_>,
    ) -> Result<Option<String>, EmailError> {
        let response = self
            .client
            .post(api_url)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        Ok(body.get("id").and_then(|v| v.as_str()).map(str::to_string))
    }
}

async fn send_smtp(
    host: &str,
    port: u16,
    user: Option<&str>,
    password: Option<&str>,
    message: &EmailMessage,
) -> Result<(), EmailError> {
    use lettre::message::header::ContentType;
    use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    let mut builder = Message::builder()
        .from(message.from.parse::<Mailbox>()?)
        .subject(message.subject.clone());
    for to in &message.to {
        builder = builder.to(to.parse::<Mailbox>()?);
    }
    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(reply_to.parse::<Mailbox>()?);
    }

    let email = if message.attachments.is_empty() {
        builder
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
    } else {
        let mut parts = MultiPart::mixed().singlepart(SinglePart::html(message.html.clone()));
        for attachment in &message.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| EmailError::Build(e.to_string()))?;
            parts = parts.singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(parts)
    }
    .map_err(|e| EmailError::Build(e.to_string()))?;

    let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port);
    if let (Some(user), Some(pass)) = (user, password) {
        transport = transport.credentials(Credentials::new(user.to_string(), pass.to_string()));
    }
    transport.build().send(email).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
