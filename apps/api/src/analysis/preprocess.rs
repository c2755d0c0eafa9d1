//! Document Preprocessor: normalizes an uploaded certificate into something the model can read.
//!
//! Images are downscaled to fit 1024×1024, re-encoded as JPEG and base64-encoded.
//! PDFs are reduced to their plain text. Nothing touches the disk.

use std::io::Cursor;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::llm_client::InlineMedia;

pub const MAX_IMAGE_EDGE: u32 = 1024;
const JPEG_QUALITY: u8 = 85;
pub const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("Failed to extract text from PDF: {0}")]
    PdfParse(String),

    #[error("PDF contains no extractable text")]
    PdfEmpty,

    #[error("Preprocessing task failed: {0}")]
    Task(String),
}

/// The declared media kind of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// Maps an upload MIME type onto a kind. Only JPEG, PNG and PDF are accepted.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/png" => Some(DocumentKind::Image),
            "application/pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(DocumentKind::Image),
            "pdf" => Ok(DocumentKind::Pdf),
            other => Err(format!("Invalid file type: {other}")),
        }
    }
}

/// An uploaded file, consumed once by the preprocessor.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Bytes,
    pub kind: DocumentKind,
    pub mime_type: String,
    /// Lowercase extension without the dot, e.g. `png`.
    pub extension: String,
}

impl RawDocument {
    /// Classifies an upload by its declared MIME type.
    pub fn from_upload(bytes: Bytes, mime_type: &str) -> Result<Self, String> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        let kind = DocumentKind::from_mime(&mime_type).ok_or_else(|| {
            format!("Invalid file type: {mime_type}. Only JPEG, PNG and PDF files are allowed.")
        })?;
        let extension = match mime_type.as_str() {
            "image/png" => "png",
            "application/pdf" => "pdf",
            _ => "jpg",
        };
        Ok(Self {
            bytes,
            kind,
            extension: extension.to_string(),
            mime_type,
        })
    }
}

/// What the analyzer sends to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedContent {
    Text(String),
    InlineMedia(InlineMedia),
}

/// Normalizes `buffer` according to its declared kind. CPU-bound; call off the executor.
pub fn prepare(buffer: &[u8], kind: DocumentKind) -> Result<PreparedContent, PreprocessError> {
    match kind {
        DocumentKind::Image => prepare_image(buffer).map(PreparedContent::InlineMedia),
        DocumentKind::Pdf => extract_pdf_text(buffer).map(PreparedContent::Text),
    }
}

fn prepare_image(buffer: &[u8]) -> Result<InlineMedia, PreprocessError> {
    let mut image = image::load_from_memory(buffer).map_err(PreprocessError::ImageDecode)?;

    let (width, height) = image.dimensions();
    if width > MAX_IMAGE_EDGE || height > MAX_IMAGE_EDGE {
        // resize() keeps the aspect ratio and fits inside the bounds
        image = image.resize(MAX_IMAGE_EDGE, MAX_IMAGE_EDGE, FilterType::Lanczos3);
    }

    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(PreprocessError::ImageEncode)?;
    let encoded = buffer.into_inner();

    debug!(
        "Image prepared: {}x{} -> {}x{}, {} bytes",
        width,
        height,
        rgb.width(),
        rgb.height(),
        encoded.len()
    );

    Ok(InlineMedia {
        data: BASE64_STANDARD.encode(&encoded),
        mime_type: JPEG_MIME.to_string(),
    })
}

fn extract_pdf_text(buffer: &[u8]) -> Result<String, PreprocessError> {
    // pdf_extract can panic on malformed PDFs
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(buffer));

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(PreprocessError::PdfParse(e.to_string())),
        Err(_) => {
            return Err(PreprocessError::PdfParse(
                "parser panicked on malformed PDF".to_string(),
            ))
        }
    };

    if text.trim().is_empty() {
        return Err(PreprocessError::PdfEmpty);
    }

    debug!("PDF text extracted: {} chars", text.len());
    Ok(text)
}
