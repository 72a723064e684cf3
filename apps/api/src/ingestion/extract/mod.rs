//! Extraction engines, one per supported document family.
//!
//! Engines never fail on sparse text: a document that parses but yields fewer
//! than [`MIN_USABLE_CHARS`] characters comes back with `Confidence::Low`.
//! The only failure is a document whose family can't be identified.

pub mod doc;
pub mod docx;
pub mod pdf;
pub mod text;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::ingestion::format::{detect_format, leading_bytes_hex, DocumentFormat};

pub const MIN_USABLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Normal,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub confidence: Confidence,
}

impl ExtractedText {
    pub fn new(text: String) -> Self {
        let confidence = if text.chars().count() < MIN_USABLE_CHARS {
            Confidence::Low
        } else {
            Confidence::Normal
        };
        Self { text, confidence }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format (leading bytes: {0})")]
    UnsupportedFormat(String),
}

/// Detects the document family and runs the matching engine.
pub fn extract_document(bytes: &[u8]) -> Result<(DocumentFormat, ExtractedText), ExtractionError> {
    let format = detect_format(bytes);
    let extracted = match format {
        DocumentFormat::Pdf => pdf::extract(bytes),
        DocumentFormat::Docx => docx::extract(bytes),
        DocumentFormat::Doc => doc::extract(bytes),
        DocumentFormat::Unsupported => {
            return Err(ExtractionError::UnsupportedFormat(leading_bytes_hex(bytes)))
        }
    };

    if extracted.confidence == Confidence::Low {
        warn!(
            "Low-confidence {} extraction: only {} characters recovered",
            format.label(),
            extracted.text.chars().count()
        );
    } else {
        info!(
            "Extracted {} characters from {} document",
            extracted.text.chars().count(),
            format.label()
        );
    }

    Ok((format, extracted))
}
