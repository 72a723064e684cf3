//! Magic-byte classification of stored CV documents.

use serde::{Deserialize, Serialize};

pub const PDF_SIGNATURE: &[u8] = b"%PDF";
pub const ZIP_SIGNATURE: &[u8] = b"PK";
/// Compound File Binary header used by Word 97-2003 documents.
pub const CFB_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Older `.doc` headers still seen in the wild: pre-release OLE2, Word 2.0
/// and Word for DOS 3-5.
pub const LEGACY_DOC_ALT_SIGNATURES: &[&[u8]] = &[
    &[0x0E, 0x11, 0xFC, 0x0D, 0xD0, 0xCF, 0x11, 0x0E],
    &[0xDB, 0xA5, 0x2D, 0x00],
    &[0x31, 0xBE, 0x00, 0x00],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
    Unsupported,
}

impl DocumentFormat {
    /// Label embedded in the analysis prompt.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Doc => "DOC",
            DocumentFormat::Unsupported => "UNKNOWN",
        }
    }
}

pub fn is_legacy_doc_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(CFB_SIGNATURE)
        || LEGACY_DOC_ALT_SIGNATURES
            .iter()
            .any(|sig| bytes.starts_with(sig))
}

/// Classifies a document by its leading bytes. Nothing past the header is inspected.
pub fn detect_format(bytes: &[u8]) -> DocumentFormat {
    if bytes.starts_with(PDF_SIGNATURE) {
        DocumentFormat::Pdf
    } else if bytes.starts_with(ZIP_SIGNATURE) {
        DocumentFormat::Docx
    } else if is_legacy_doc_signature(bytes) {
        DocumentFormat::Doc
    } else {
        DocumentFormat::Unsupported
    }
}

/// Hex rendering of the first bytes, for error messages.
pub fn leading_bytes_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(8)
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
