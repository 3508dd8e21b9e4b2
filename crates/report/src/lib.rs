//! PDF rendering of completed inspections.
//!
//! [`composer`] lays out the inspection report; [`pdf`] is the small PDF
//! writer it draws with; [`raster`] prepares diagram and signature images
//! for embedding.

pub mod composer;
pub mod error;
pub mod pdf;
pub mod raster;

pub use composer::{compose, compose_bundle, InspectionReport, PdfBundle, ReportVariant};
pub use error::ReportError;
