#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Stream compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),
}
