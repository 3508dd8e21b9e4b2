//! Minimal PDF 1.4 writer.
//!
//! Covers the drawing vocabulary of the inspection report: text in the two
//! standard Helvetica faces, filled and stroked shapes, and raster images.
//! Objects are numbered in the order they are written and indexed by a
//! classic cross-reference table.
//!
//! All page coordinates are PDF user space: points, origin bottom-left.

use std::io::Write as _;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::ReportError;

/// A4 portrait page width in points.
pub const A4_WIDTH: f64 = 595.28;

/// A4 portrait page height in points.
pub const A4_HEIGHT: f64 = 841.89;

/// Bézier control-point factor for approximating a quarter circle.
const KAPPA: f64 = 0.552_284_75;

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
        }
    }
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Approximate rendered width of `text` in points.
///
/// Bold glyphs are taken as 5% wider than regular ones; characters outside
/// ASCII use the width of `n`.
pub fn text_width(font: Font, size: f64, text: &str) -> f64 {
    let units: u32 = text
        .chars()
        .map(|ch| match ch as u32 {
            code @ 32..=126 => u32::from(HELVETICA_WIDTHS[(code - 32) as usize]),
            _ => 556,
        })
        .sum();
    let scale = match font {
        Font::Regular => 1.0,
        Font::Bold => 1.05,
    };
    f64::from(units) * size / 1000.0 * scale
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        )
    }

    /// Parse `#rgb`, `#rrggbb` or one of a handful of CSS color names.
    pub fn parse_css(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let rgb = match value.to_ascii_lowercase().as_str() {
            "black" => (0, 0, 0),
            "white" => (255, 255, 255),
            "red" => (255, 0, 0),
            "green" => (0, 128, 0),
            "lime" => (0, 255, 0),
            "blue" => (0, 0, 255),
            "yellow" => (255, 255, 0),
            "orange" => (255, 165, 0),
            "purple" => (128, 0, 128),
            "gray" | "grey" => (128, 128, 128),
            _ => return None,
        };
        Some(Self::from_u8(rgb.0, rgb.1, rgb.2))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self::from_u8(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let mut it = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
                Some(Self::from_u8(it.next()??, it.next()??, it.next()??))
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// A complete JPEG file, embedded as-is.
    Jpeg,
    /// Uncompressed 8-bit samples, row-major.
    Raw,
}

/// A raster image ready to embed as an image XObject.
#[derive(Debug, Clone)]
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    pub grayscale: bool,
    pub encoding: ImageEncoding,
    pub data: Vec<u8>,
}

impl PdfImage {
    fn color_space(&self) -> &'static str {
        if self.grayscale {
            "/DeviceGray"
        } else {
            "/DeviceRGB"
        }
    }
}

/// Handle of an image registered with a [`PdfDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(usize);

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// One page's content stream and the images it references.
#[derive(Debug, Default)]
pub struct Page {
    ops: String,
    images: Vec<ImageId>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb) {
        self.push(&format!(
            "q {} rg {} {} {} {} re f Q\n",
            rgb(color),
            num(x),
            num(y),
            num(w),
            num(h)
        ));
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb, line_width: f64) {
        self.push(&format!(
            "q {} RG {} w {} {} {} {} re S Q\n",
            rgb(color),
            num(line_width),
            num(x),
            num(y),
            num(w),
            num(h)
        ));
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Rgb, line_width: f64) {
        self.push(&format!(
            "q {} RG {} w {} {} m {} {} l S Q\n",
            rgb(color),
            num(line_width),
            num(x1),
            num(y1),
            num(x2),
            num(y2)
        ));
    }

    /// Filled circle built from four cubic Bézier arcs.
    pub fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, color: Rgb) {
        let k = r * KAPPA;
        self.push(&format!(
            "q {} rg {} {} m {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c f Q\n",
            rgb(color),
            num(cx + r), num(cy),
            num(cx + r), num(cy + k), num(cx + k), num(cy + r), num(cx), num(cy + r),
            num(cx - k), num(cy + r), num(cx - r), num(cy + k), num(cx - r), num(cy),
            num(cx - r), num(cy - k), num(cx - k), num(cy - r), num(cx), num(cy - r),
            num(cx + k), num(cy - r), num(cx + r), num(cy - k), num(cx + r), num(cy),
        ));
    }

    /// Single line of text with its baseline starting at `(x, y)`.
    pub fn text(&mut self, font: Font, size: f64, x: f64, y: f64, color: Rgb, text: &str) {
        self.push(&format!(
            "q {} rg BT /{} {} Tf {} {} Td ({}) Tj ET Q\n",
            rgb(color),
            font.resource_name(),
            num(size),
            num(x),
            num(y),
            escape_text(text)
        ));
    }

    /// Draw a registered image into the box with lower-left corner `(x, y)`.
    pub fn image(&mut self, id: ImageId, x: f64, y: f64, w: f64, h: f64) {
        if !self.images.contains(&id) {
            self.images.push(id);
        }
        self.push(&format!(
            "q {} 0 0 {} {} {} cm /Im{} Do Q\n",
            num(w),
            num(h),
            num(x),
            num(y),
            id.0
        ));
    }

    pub fn content(&self) -> &str {
        &self.ops
    }

    fn push(&mut self, op: &str) {
        self.ops.push_str(op);
    }
}

fn num(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "-0" => "0".to_string(),
        _ => s.to_string(),
    }
}

fn rgb(color: Rgb) -> String {
    format!("{} {} {}", num(color.0), num(color.1), num(color.2))
}

/// Escape a string for a PDF literal string in WinAnsi encoding.
///
/// Latin-1 characters are written as octal escapes; anything beyond is
/// replaced with `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{a0}'..='\u{ff}' => out.push_str(&format!("\\{:03o}", ch as u32)),
            _ => out.push('?'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// An in-memory PDF assembled from pages and shared images.
#[derive(Debug)]
pub struct PdfDocument {
    images: Vec<PdfImage>,
    pages: Vec<Page>,
    compress_content: bool,
}

impl PdfDocument {
    /// `compress_content` Flate-compresses page content streams. Raw image
    /// samples are always compressed.
    pub fn new(compress_content: bool) -> Self {
        Self {
            images: Vec::new(),
            pages: Vec::new(),
            compress_content,
        }
    }

    pub fn add_image(&mut self, image: PdfImage) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    /// Serialise the document.
    ///
    /// Object layout: 1 catalog, 2 page tree, 3-4 fonts, then one object
    /// per image, then a page object and its content stream per page.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReportError> {
        let mut w = ObjectWriter::new();

        let image_base = 5;
        let page_base = image_base + self.images.len();
        let kids: Vec<String> = (0..self.pages.len())
            .map(|i| format!("{} 0 R", page_base + 2 * i))
            .collect();

        w.object("<< /Type /Catalog /Pages 2 0 R >>");
        w.object(&format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            self.pages.len()
        ));
        for font in [Font::Regular, Font::Bold] {
            w.object(&format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            ));
        }

        for image in &self.images {
            let (filter, data) = match image.encoding {
                ImageEncoding::Jpeg => ("/DCTDecode", image.data.clone()),
                ImageEncoding::Raw => ("/FlateDecode", deflate(&image.data)?),
            };
            w.stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8 /Filter {}",
                    image.width,
                    image.height,
                    image.color_space(),
                    filter
                ),
                &data,
            );
        }

        for (i, page) in self.pages.iter().enumerate() {
            let content_id = page_base + 2 * i + 1;
            let xobjects: Vec<String> = page
                .images
                .iter()
                .map(|id| format!("/Im{} {} 0 R", id.0, image_base + id.0))
                .collect();
            w.object(&format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> /XObject << {} >> >> \
                 /Contents {content_id} 0 R >>",
                num(A4_WIDTH),
                num(A4_HEIGHT),
                xobjects.join(" ")
            ));

            if self.compress_content {
                w.stream("/Filter /FlateDecode", &deflate(page.ops.as_bytes())?);
            } else {
                w.stream("", page.ops.as_bytes());
            }
        }

        Ok(w.finish())
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ReportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Appends numbered objects and records their byte offsets.
struct ObjectWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.out.len());
        let id = self.offsets.len();
        self.out.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
    }

    fn object(&mut self, body: &str) {
        self.begin();
        self.out.extend_from_slice(body.as_bytes());
        self.out.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dict_entries: &str, data: &[u8]) {
        self.begin();
        let sep = if dict_entries.is_empty() { "" } else { " " };
        self.out.extend_from_slice(
            format!("<< {dict_entries}{sep}/Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.out.len();
        let count = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {count}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {count} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        ));
        self.out.extend_from_slice(xref.as_bytes());
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn startxref(bytes: &[u8]) -> usize {
        let text = as_text(bytes);
        let tail = text.rsplit("startxref\n").next().unwrap();
        tail.lines().next().unwrap().parse().unwrap()
    }

    #[test]
    fn writes_header_trailer_and_valid_xref_offset() {
        let mut doc = PdfDocument::new(false);
        let mut page = Page::new();
        page.text(Font::Bold, 12.0, 40.0, 800.0, Rgb::BLACK, "Hello");
        doc.add_page(page);
        let bytes = doc.to_bytes().unwrap();

        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        let offset = startxref(&bytes);
        assert!(bytes[offset..].starts_with(b"xref\n0 7\n"));
        assert!(as_text(&bytes).contains("/F2 12 Tf 40 800 Td (Hello) Tj"));
    }

    #[test]
    fn xref_entries_point_at_objects() {
        let mut doc = PdfDocument::new(false);
        doc.add_page(Page::new());
        doc.add_page(Page::new());
        let bytes = doc.to_bytes().unwrap();
        let offset = startxref(&bytes);

        let entries: Vec<usize> = as_text(&bytes[offset..])
            .lines()
            .skip(3)
            .take_while(|l| !l.starts_with("trailer"))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 8);
        for (i, off) in entries.iter().enumerate() {
            assert!(bytes[*off..].starts_with(format!("{} 0 obj", i + 1).as_bytes()));
        }
        assert!(as_text(&bytes).contains("/Count 2"));
    }

    #[test]
    fn compressed_content_hides_operators() {
        let mut doc = PdfDocument::new(true);
        let mut page = Page::new();
        page.text(Font::Regular, 10.0, 0.0, 0.0, Rgb::BLACK, "Observations");
        doc.add_page(page);
        let text = as_text(&doc.to_bytes().unwrap());
        assert!(text.contains("/Filter /FlateDecode"));
        assert!(!text.contains("(Observations) Tj"));
    }

    #[test]
    fn images_are_registered_per_page() {
        let mut doc = PdfDocument::new(false);
        let id = doc.add_image(PdfImage {
            width: 1,
            height: 1,
            grayscale: false,
            encoding: ImageEncoding::Raw,
            data: vec![255, 0, 0],
        });
        let mut page = Page::new();
        page.image(id, 10.0, 10.0, 100.0, 50.0);
        page.image(id, 10.0, 70.0, 100.0, 50.0);
        doc.add_page(page);
        let text = as_text(&doc.to_bytes().unwrap());
        assert!(text.contains("/XObject << /Im0 5 0 R >>"));
        assert!(text.contains("/Subtype /Image /Width 1 /Height 1 /ColorSpace /DeviceRGB"));
        assert_eq!(text.matches("/Im0 Do").count(), 2);
    }

    #[test]
    fn circle_is_four_bezier_arcs() {
        let mut page = Page::new();
        page.fill_circle(100.0, 100.0, 6.0, Rgb::BLACK);
        assert_eq!(page.content().matches(" c ").count(), 4);
        assert!(page.content().contains("106 100 m"));
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(escape_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_text("Señor"), "Se\\361or");
        assert_eq!(escape_text("line\nbreak"), "line break");
        assert_eq!(escape_text("✓"), "?");
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(1.257), "1.26");
    }

    #[test]
    fn parses_css_colors() {
        assert_eq!(Rgb::parse_css("red"), Some(Rgb(1.0, 0.0, 0.0)));
        assert_eq!(Rgb::parse_css("#00FF7F"), Some(Rgb::from_u8(0, 255, 127)));
        assert_eq!(Rgb::parse_css("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::parse_css("#12345"), None);
        assert_eq!(Rgb::parse_css("chartreuse"), None);
    }

    #[test]
    fn text_width_scales_with_size() {
        let w10 = text_width(Font::Regular, 10.0, "Hello");
        let w20 = text_width(Font::Regular, 20.0, "Hello");
        assert!((w20 - 2.0 * w10).abs() < 1e-9);
        assert!(text_width(Font::Bold, 10.0, "Hello") > w10);
        assert_eq!(text_width(Font::Regular, 10.0, ""), 0.0);
    }
}
