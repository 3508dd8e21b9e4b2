//! HTML email templates.
//!
//! Every interpolated value is HTML-escaped. Links are only rendered as
//! buttons when they are absolute `http(s)` URLs.

use cartcheck_core::diagram::{DamageSummary, PALETTE};

/// Name shown in greetings and signatures.
pub const BRAND_NAME: &str = "Luxe Properties";

const LOGO_URL: &str = "https://luxepropertiespr.com/wp-content/uploads/2024/09/LOGO.png";

/// Subject and body of a rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Values available to the templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub guest_name: String,
    pub guest_email: String,
    pub property: String,
    pub inspection_date: String,
    pub form_id: Option<String>,
    pub form_link: Option<String>,
    pub cart_type: Option<String>,
    pub cart_number: Option<String>,
    pub observations: Option<String>,
    pub pdf_url: Option<String>,
    pub damage: Option<DamageSummary>,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Invitation sent to the guest when an inspection is created.
pub fn form_created(data: &TemplateData) -> RenderedEmail {
    let property = escape_html(&data.property);
    let link = data.form_link.as_deref().filter(|l| is_http_url(l));

    let button = match link {
        Some(link) => button(link, "#4CAF50", "Review and Sign Form"),
        None => "<span style=\"color: #e53e3e;\">No valid inspection form link available. \
                 Please contact support.</span>"
            .to_string(),
    };
    let fallback = match link {
        Some(link) => format!(
            "<p style=\"margin-bottom: 10px;\">If the button above doesn't work, copy and paste this link into your browser:</p>\
             <p style=\"margin-bottom: 20px; word-break: break-all; color: #4a5568;\">{}</p>",
            escape_html(link)
        ),
        None => String::new(),
    };

    RenderedEmail {
        subject: format!("Golf Cart Inspection Form for {}", data.property),
        html: wrap(&format!(
            "{logo}\
             <h2 style=\"color: #2c5282; margin-bottom: 20px;\">Golf Cart Inspection Form</h2>\
             <p style=\"margin-bottom: 15px;\">Dear {guest},</p>\
             <p style=\"margin-bottom: 20px;\">An inspection form has been created for the golf cart at {property}. \
             Please complete this form at your earliest convenience.</p>\
             <p style=\"margin-bottom: 20px;\">For a better experience in mobile devices, please rotate your device to landscape mode.</p>\
             <div style=\"margin: 30px 0; text-align: center;\">{button}</div>\
             {fallback}\
             {details}\
             <p style=\"color: #666; margin-bottom: 20px;\">If you have any questions, please reply to this email.</p>\
             {closing}",
            logo = logo(),
            guest = escape_html(&data.guest_name),
            details = detail_box(&[
                ("Property", data.property.as_str()),
                ("Inspection Date", data.inspection_date.as_str()),
            ]),
            closing = closing(true),
        )),
    }
}

/// Alert sent to administrators when an inspection is created.
pub fn admin_form_created_alert(data: &TemplateData) -> RenderedEmail {
    RenderedEmail {
        subject: format!("Alert: New form has been created for {}", data.property),
        html: format!(
            "<div style=\"font-family: Arial, sans-serif; padding: 20px;\">\
             <h3>New inspection form created</h3>\
             <p>A new inspection form has been created for the property <strong>{}</strong>.</p>\
             <p><strong>Guest Name:</strong> {}</p>\
             <p><strong>Guest Email:</strong> {}</p>\
             <p><strong>Inspection Date:</strong> {}</p>\
             </div>",
            escape_html(&data.property),
            or_na(&data.guest_name),
            or_na(&data.guest_email),
            or_na(&data.inspection_date),
        ),
    }
}

/// Notice to administrators that a guest signed, with the PDF link.
///
/// The PDF itself travels as an attachment added by the caller.
pub fn form_signed_admin(data: &TemplateData) -> RenderedEmail {
    let observations = data
        .observations
        .as_deref()
        .filter(|o| !o.trim().is_empty())
        .unwrap_or("No observations provided");
    let damage = data.damage.map(|d| damage_line(&d));
    let mut rows = vec![
        ("Guest Name", or_na_raw(&data.guest_name)),
        ("Guest Email", or_na_raw(&data.guest_email)),
        ("Inspection Date", or_na_raw(&data.inspection_date)),
        ("Property", data.property.as_str()),
        ("Cart Type", data.cart_type.as_deref().unwrap_or("N/A")),
        ("Cart Number", data.cart_number.as_deref().unwrap_or("N/A")),
        ("Observations", observations),
    ];
    if let Some(damage) = damage.as_deref() {
        rows.push(("Damage Markers", damage));
    }

    let link = data.pdf_url.as_deref().filter(|l| is_http_url(l));
    let button = match link {
        Some(link) => button(link, "#3182ce", "Download Signed PDF"),
        None => "<span style=\"color: #e53e3e;\">No valid PDF link available. Please contact support.</span>"
            .to_string(),
    };

    RenderedEmail {
        subject: format!("Inspection Form Signed - {}", data.property),
        html: wrap(&format!(
            "<h2 style=\"color: #2c5282; margin-bottom: 20px;\">Inspection Form Signed</h2>\
             <p>The guest <strong>{guest}</strong> ({email}) has signed and completed the inspection form for \
             <strong>{property}</strong>.</p>\
             {details}\
             <div style=\"margin: 30px 0; text-align: center;\">{button}</div>\
             <p style=\"margin-top: 20px;\">The signed PDF is also attached to this email.</p>\
             {closing}",
            guest = escape_html(&data.guest_name),
            email = escape_html(&data.guest_email),
            property = escape_html(&data.property),
            details = detail_box(&rows),
            closing = closing(false),
        )),
    }
}

/// Confirmation sent to the guest after submitting. Carries no PDF link.
pub fn completion_confirmation(data: &TemplateData) -> RenderedEmail {
    RenderedEmail {
        subject: format!("Golf Cart Inspection Completed for {}", data.property),
        html: wrap(&format!(
            "{logo}\
             <h2 style=\"color: #2c5282; margin-bottom: 20px;\">Inspection Completed</h2>\
             <p style=\"margin-bottom: 15px;\">Dear {guest},</p>\
             <p style=\"margin-bottom: 20px;\">Thank you for completing the inspection form for the golf cart at {property}. \
             Your submission has been received.</p>\
             {details}\
             <p style=\"margin-top: 20px;\">Thank you for your collaboration.</p>\
             {closing}",
            logo = logo(),
            guest = escape_html(&data.guest_name),
            property = escape_html(&data.property),
            details = detail_box(&[
                ("Property", data.property.as_str()),
                ("Inspection Date", data.inspection_date.as_str()),
            ]),
            closing = closing(true),
        )),
    }
}

/// Administrator copy of the completion notice, with the PDF link.
pub fn admin_completion_copy(data: &TemplateData) -> RenderedEmail {
    let link_block = match data.pdf_url.as_deref().filter(|l| is_http_url(l)) {
        Some(link) => format!(
            "<div style=\"margin: 30px 0; text-align: center;\">{}</div>\
             <p style=\"margin-top: 20px;\">If the button doesn't work, copy this link: {}</p>",
            button(link, "#3182ce", "View Signed PDF"),
            escape_html(link)
        ),
        None => "<p style=\"color: #e53e3e;\">No PDF link available for this inspection.</p>".to_string(),
    };

    RenderedEmail {
        subject: format!(
            "Admin Copy: Golf Cart Inspection Completed for {}",
            data.property
        ),
        html: wrap(&format!(
            "{logo}\
             <h2 style=\"color: #2c5282; margin-bottom: 20px;\">Inspection Completed</h2>\
             <p>The guest <strong>{guest}</strong> has completed the inspection form for <strong>{property}</strong>.</p>\
             {details}\
             {link_block}\
             {closing}",
            logo = logo(),
            guest = escape_html(&data.guest_name),
            property = escape_html(&data.property),
            details = detail_box(&[
                ("Property", data.property.as_str()),
                ("Inspection Date", data.inspection_date.as_str()),
            ]),
            closing = closing(false),
        )),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Escape the five HTML special characters.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `true` for absolute `http://` or `https://` URLs with a host.
pub fn is_http_url(value: &str) -> bool {
    reqwest::Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

/// One-line damage summary, e.g. `Scratches: 2, Missing parts: 0, ...`.
pub fn damage_line(summary: &DamageSummary) -> String {
    let mut parts: Vec<String> = PALETTE
        .iter()
        .map(|kind| format!("{}: {}", kind.label(), summary.count(*kind)))
        .collect();
    if summary.other > 0 {
        parts.push(format!("Other: {}", summary.other));
    }
    parts.join(", ")
}

fn or_na_raw(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

fn or_na(value: &str) -> String {
    escape_html(or_na_raw(value))
}

fn wrap(inner: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;\">{inner}</div>"
    )
}

fn logo() -> String {
    format!(
        "<img src=\"{LOGO_URL}\" alt=\"{BRAND_NAME} Logo\" style=\"max-width: 200px; margin-bottom: 20px;\">"
    )
}

fn button(href: &str, color: &str, label: &str) -> String {
    format!(
        "<a href=\"{}\" style=\"background-color: {color}; color: white; padding: 15px 30px; \
         text-decoration: none; border-radius: 5px; display: inline-block; font-weight: bold; \
         font-size: 16px;\">{label}</a>",
        escape_html(href)
    )
}

fn detail_box(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                "<p style=\"margin-bottom: 10px;\"><strong>{label}:</strong> {}</p>",
                escape_html(value)
            )
        })
        .collect();
    format!(
        "<div style=\"margin: 20px 0; padding: 15px; background-color: #f7fafc; border-radius: 5px;\">{body}</div>"
    )
}

fn closing(greeting: bool) -> String {
    let sign_off = if greeting {
        format!("Best regards,<br>{BRAND_NAME}")
    } else {
        BRAND_NAME.to_string()
    };
    format!("<hr style=\"border: 1px solid #eee; margin: 20px 0;\"><p style=\"color: #666;\">{sign_off}</p>")
}
