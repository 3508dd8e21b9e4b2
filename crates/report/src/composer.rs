//! Layout of the inspection report.
//!
//! The report is a top-down flow on A4 pages: header band, guest and
//! property details, the annotated diagram with its legend, observations
//! and the guest signature. A footer with page numbers is stamped on every
//! page once the flow is complete.

use cartcheck_core::diagram::{count_by_kind, Point, CANVAS_HEIGHT, CANVAS_WIDTH, PALETTE};
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ReportError;
use crate::pdf::{text_width, Font, ImageId, Page, PdfDocument, PdfImage, Rgb, A4_HEIGHT, A4_WIDTH};
use crate::raster::{self, RasterOptions};

pub const REPORT_TITLE: &str = "Golf Cart Inspection Form";

/// JPEG quality of images in the email variant.
pub const EMAIL_JPEG_QUALITY: u8 = 70;

/// Widest diagram background kept in the email variant, in pixels.
pub const EMAIL_BACKGROUND_MAX_WIDTH: u32 = 1200;

/// Widest signature kept in the email variant, in pixels.
pub const EMAIL_SIGNATURE_MAX_WIDTH: u32 = 400;

const MARGIN: f64 = 40.0;
const CONTENT_WIDTH: f64 = A4_WIDTH - 2.0 * MARGIN;
const HEADER_HEIGHT: f64 = 70.0;
const FOOTER_HEIGHT: f64 = 30.0;
const LABEL_WIDTH: f64 = 110.0;
const BODY_SIZE: f64 = 10.0;
const LINE_HEIGHT: f64 = 14.0;
const SIGNATURE_BOX: (f64, f64) = (240.0, 100.0);

const NAVY: Rgb = Rgb(0.12, 0.23, 0.39);
const MUTED: Rgb = Rgb(0.4, 0.4, 0.4);
const RULE: Rgb = Rgb(0.8, 0.8, 0.8);

/// Everything printed on an inspection report.
#[derive(Debug, Clone)]
pub struct InspectionReport {
    pub title: String,
    pub form_id: String,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub property: String,
    pub cart_type: String,
    pub cart_number: String,
    pub inspection_date: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
    pub observations: String,
    pub points: Vec<Point>,
    /// Encoded diagram image (JPEG, PNG or GIF).
    pub diagram_background: Option<Vec<u8>>,
    /// Encoded signature image.
    pub signature: Option<Vec<u8>>,
}

/// The two renditions of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportVariant {
    /// Full-quality images, uncompressed page content.
    Download,
    /// Recompressed images and content, sized for attachments.
    Email,
}

impl ReportVariant {
    fn compress_content(self) -> bool {
        matches!(self, Self::Email)
    }

    fn background_options(self) -> RasterOptions {
        match self {
            Self::Download => RasterOptions::default(),
            Self::Email => RasterOptions {
                max_width: Some(EMAIL_BACKGROUND_MAX_WIDTH),
                jpeg_quality: Some(EMAIL_JPEG_QUALITY),
            },
        }
    }

    fn signature_options(self) -> RasterOptions {
        match self {
            Self::Download => RasterOptions::default(),
            Self::Email => RasterOptions {
                max_width: Some(EMAIL_SIGNATURE_MAX_WIDTH),
                jpeg_quality: Some(EMAIL_JPEG_QUALITY),
            },
        }
    }
}

/// Both variants of one report.
#[derive(Debug, Clone)]
pub struct PdfBundle {
    pub download: Vec<u8>,
    pub email: Vec<u8>,
}

/// Render both report variants.
pub fn compose_bundle(report: &InspectionReport) -> Result<PdfBundle, ReportError> {
    Ok(PdfBundle {
        download: compose(report, ReportVariant::Download)?,
        email: compose(report, ReportVariant::Email)?,
    })
}

/// Render one report variant.
///
/// An unreadable diagram background is left out with a warning; an
/// unreadable signature fails the render.
pub fn compose(report: &InspectionReport, variant: ReportVariant) -> Result<Vec<u8>, ReportError> {
    let mut doc = PdfDocument::new(variant.compress_content());

    let background = match report.diagram_background.as_deref() {
        Some(bytes) => match raster::prepare(bytes, variant.background_options()) {
            Ok(image) => Some(doc.add_image(image)),
            Err(e) => {
                tracing::warn!(
                    form_id = %report.form_id,
                    error = %e,
                    "Leaving unreadable diagram background out of report",
                );
                None
            }
        },
        None => None,
    };

    let signature = match report.signature.as_deref() {
        Some(bytes) => {
            let image = raster::prepare(bytes, variant.signature_options())?;
            Some(Placed::register(&mut doc, image))
        }
        None => None,
    };

    let mut layout = Layout::new(doc);
    layout.header(report);
    layout.section("Guest Information");
    layout.field("Name", &report.guest_name);
    layout.field("Email", &report.guest_email);
    layout.field("Phone", &report.guest_phone);
    layout.field(
        "Inspection Date",
        &report.inspection_date.format("%B %-d, %Y").to_string(),
    );

    layout.section("Property Information");
    layout.field("Property", &report.property);
    layout.field("Cart Type", &report.cart_type);
    layout.field("Cart Number", &report.cart_number);

    layout.diagram(&report.points, background);
    layout.legend(&report.points);
    layout.observations(&report.observations);
    layout.signature(report, signature);

    let bytes = layout.finish(report)?;
    tracing::debug!(
        form_id = %report.form_id,
        ?variant,
        size_bytes = bytes.len(),
        "Report rendered",
    );
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// A registered image together with its pixel size.
#[derive(Debug, Clone, Copy)]
struct Placed {
    id: ImageId,
    width: f64,
    height: f64,
}

impl Placed {
    fn register(doc: &mut PdfDocument, image: PdfImage) -> Self {
        let (width, height) = (f64::from(image.width), f64::from(image.height));
        Self {
            id: doc.add_image(image),
            width,
            height,
        }
    }
}

/// Flow cursor over the document. `y` is measured from the top of the page.
struct Layout {
    doc: PdfDocument,
    page: Page,
    y: f64,
}

impl Layout {
    fn new(doc: PdfDocument) -> Self {
        Self {
            doc,
            page: Page::new(),
            y: MARGIN,
        }
    }

    /// PDF baseline for a distance from the top of the page.
    fn at(top: f64) -> f64 {
        A4_HEIGHT - top
    }

    fn ensure_space(&mut self, height: f64) {
        if self.y + height > A4_HEIGHT - MARGIN - FOOTER_HEIGHT {
            let full = std::mem::take(&mut self.page);
            self.doc.add_page(full);
            self.y = MARGIN;
        }
    }

    fn header(&mut self, report: &InspectionReport) {
        self.page.fill_rect(0.0, A4_HEIGHT - HEADER_HEIGHT, A4_WIDTH, HEADER_HEIGHT, NAVY);
        self.page
            .text(Font::Bold, 20.0, MARGIN, Self::at(36.0), Rgb::WHITE, &report.title);
        self.page.text(
            Font::Regular,
            BODY_SIZE,
            MARGIN,
            Self::at(56.0),
            Rgb::WHITE,
            &format!("Form ID: {}", report.form_id),
        );
        self.y = HEADER_HEIGHT + 20.0;
    }

    fn section(&mut self, title: &str) {
        self.ensure_space(40.0);
        self.y += 8.0;
        self.page
            .text(Font::Bold, 13.0, MARGIN, Self::at(self.y + 13.0), NAVY, title);
        self.y += 18.0;
        let rule = Self::at(self.y);
        self.page
            .line(MARGIN, rule, MARGIN + CONTENT_WIDTH, rule, RULE, 0.75);
        self.y += 8.0;
    }

    fn field(&mut self, label: &str, value: &str) {
        let lines = wrap_text(value, Font::Regular, BODY_SIZE, CONTENT_WIDTH - LABEL_WIDTH);
        for (i, line) in lines.iter().enumerate() {
            self.ensure_space(LINE_HEIGHT);
            let baseline = Self::at(self.y + BODY_SIZE);
            if i == 0 {
                self.page
                    .text(Font::Bold, BODY_SIZE, MARGIN, baseline, Rgb::BLACK, label);
            }
            self.page.text(
                Font::Regular,
                BODY_SIZE,
                MARGIN + LABEL_WIDTH,
                baseline,
                Rgb::BLACK,
                line,
            );
            self.y += LINE_HEIGHT + 2.0;
        }
    }

    fn diagram(&mut self, points: &[Point], background: Option<ImageId>) {
        let box_h = CONTENT_WIDTH * CANVAS_HEIGHT / CANVAS_WIDTH;
        self.ensure_space(box_h + 50.0);
        self.section("Cart Diagram");

        let scale = CONTENT_WIDTH / CANVAS_WIDTH;
        let bottom = Self::at(self.y + box_h);
        if let Some(id) = background {
            self.page.image(id, MARGIN, bottom, CONTENT_WIDTH, box_h);
        }
        for point in points {
            let color = Rgb::parse_css(&point.color).unwrap_or(Rgb::BLACK);
            self.page.fill_circle(
                MARGIN + point.x * scale,
                Self::at(self.y + point.y * scale),
                point.size / 2.0 * scale,
                color,
            );
        }
        self.page
            .stroke_rect(MARGIN, bottom, CONTENT_WIDTH, box_h, RULE, 1.0);
        self.y += box_h + 10.0;
    }

    fn legend(&mut self, points: &[Point]) {
        self.ensure_space(LINE_HEIGHT + 6.0);
        let summary = count_by_kind(points);
        let baseline = Self::at(self.y + BODY_SIZE);
        let mut x = MARGIN;

        let mut entries: Vec<(Rgb, String)> = PALETTE
            .iter()
            .map(|kind| {
                (
                    Rgb::parse_css(kind.color()).unwrap_or(Rgb::BLACK),
                    format!("{}: {}", kind.label(), summary.count(*kind)),
                )
            })
            .collect();
        if summary.other > 0 {
            entries.push((MUTED, format!("Other: {}", summary.other)));
        }

        for (color, label) in entries {
            self.page.fill_circle(x + 5.0, baseline + 3.5, 5.0, color);
            self.page
                .text(Font::Regular, BODY_SIZE, x + 14.0, baseline, Rgb::BLACK, &label);
            x += 14.0 + text_width(Font::Regular, BODY_SIZE, &label) + 24.0;
        }
        self.y += LINE_HEIGHT + 6.0;
    }

    fn observations(&mut self, observations: &str) {
        self.section("Observations");
        let text = observations.trim();
        if text.is_empty() {
            self.ensure_space(LINE_HEIGHT);
            self.page.text(
                Font::Regular,
                BODY_SIZE,
                MARGIN,
                Self::at(self.y + BODY_SIZE),
                MUTED,
                "No observations recorded.",
            );
            self.y += LINE_HEIGHT;
            return;
        }
        for line in wrap_text(text, Font::Regular, BODY_SIZE, CONTENT_WIDTH) {
            self.ensure_space(LINE_HEIGHT);
            self.page.text(
                Font::Regular,
                BODY_SIZE,
                MARGIN,
                Self::at(self.y + BODY_SIZE),
                Rgb::BLACK,
                &line,
            );
            self.y += LINE_HEIGHT;
        }
    }

    fn signature(&mut self, report: &InspectionReport, signature: Option<Placed>) {
        let (box_w, box_h) = SIGNATURE_BOX;
        self.ensure_space(box_h + 90.0);
        self.section("Guest Signature");

        match signature {
            Some(placed) => {
                let fit = (box_w / placed.width).min(box_h / placed.height);
                let (w, h) = (placed.width * fit, placed.height * fit);
                self.page
                    .image(placed.id, MARGIN, Self::at(self.y + box_h), w, h);
            }
            None => self.page.text(
                Font::Regular,
                BODY_SIZE,
                MARGIN,
                Self::at(self.y + box_h / 2.0),
                MUTED,
                "Not signed",
            ),
        }
        self.y += box_h + 4.0;
        let rule = Self::at(self.y);
        self.page.line(MARGIN, rule, MARGIN + box_w, rule, Rgb::BLACK, 0.75);
        self.y += 4.0;

        self.page.text(
            Font::Regular,
            BODY_SIZE,
            MARGIN,
            Self::at(self.y + BODY_SIZE),
            Rgb::BLACK,
            &format!("Signed by {}", report.guest_name),
        );
        self.y += LINE_HEIGHT;
        if let Some(at) = report.completed_at {
            self.page.text(
                Font::Regular,
                BODY_SIZE,
                MARGIN,
                Self::at(self.y + BODY_SIZE),
                MUTED,
                &format!("Signed on {}", at.format("%B %-d, %Y %H:%M UTC")),
            );
            self.y += LINE_HEIGHT;
        }
    }

    fn finish(mut self, report: &InspectionReport) -> Result<Vec<u8>, ReportError> {
        let last = std::mem::take(&mut self.page);
        self.doc.add_page(last);

        let total = self.doc.page_count();
        let left = format!("{} - {}", report.title, report.form_id);
        for (i, page) in self.doc.pages_mut().iter_mut().enumerate() {
            let numbering = format!("Page {} of {total}", i + 1);
            let right = A4_WIDTH - MARGIN - text_width(Font::Regular, 8.0, &numbering);
            page.line(MARGIN, 34.0, A4_WIDTH - MARGIN, 34.0, RULE, 0.5);
            page.text(Font::Regular, 8.0, MARGIN, 22.0, MUTED, &left);
            page.text(Font::Regular, 8.0, right, 22.0, MUTED, &numbering);
        }
        self.doc.to_bytes()
    }
}

/// Greedy word wrap using Helvetica metrics.
///
/// Explicit newlines start new lines; words wider than `max_width` are
/// broken between characters. Always yields at least one line.
pub fn wrap_text(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(font, size, &candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            for ch in word.chars() {
                current.push(ch);
                if text_width(font, size, &current) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
