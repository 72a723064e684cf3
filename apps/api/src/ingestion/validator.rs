//! File Validator: local, pre-upload checks on a CV file.
//!
//! Runs before anything is stored: allow-listed type, size bounds, magic bytes,
//! and PDF encryption markers. Passing here does not promise extractable text.

use thiserror::Error;

use crate::ingestion::format::{is_legacy_doc_signature, PDF_SIGNATURE, ZIP_SIGNATURE};

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const MIN_FILE_BYTES: usize = 1024;

/// Markers that show up in the trailer/dictionaries of encrypted PDFs.
const PDF_ENCRYPTION_MARKERS: &[&[u8]] = &[b"/Encrypt", b"/U ", b"/O "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Pdf,
    Docx,
    Doc,
}

impl DeclaredType {
    /// Resolves the declared type from the MIME type, falling back to the file extension.
    pub fn resolve(content_type: Option<&str>, file_name: &str) -> Option<Self> {
        let from_mime = content_type.and_then(|ct| {
            match ct.split(';').next().unwrap_or_default().trim() {
                "application/pdf" => Some(DeclaredType::Pdf),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                    Some(DeclaredType::Docx)
                }
                "application/msword" => Some(DeclaredType::Doc),
                _ => None,
            }
        });

        from_mime.or_else(|| {
            let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
            match ext.as_str() {
                "pdf" => Some(DeclaredType::Pdf),
                "docx" => Some(DeclaredType::Docx),
                "doc" => Some(DeclaredType::Doc),
                _ => None,
            }
        })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DeclaredType::Pdf => "pdf",
            DeclaredType::Docx => "docx",
            DeclaredType::Doc => "doc",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DeclaredType::Pdf => "application/pdf",
            DeclaredType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DeclaredType::Doc => "application/msword",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported file type '{0}'; allowed types are pdf, doc and docx")]
    UnsupportedType(String),

    #[error("file is too large ({0} bytes); the maximum is 10 MB")]
    TooLarge(usize),

    #[error("file is too small ({0} bytes); the minimum is 1 KB")]
    TooSmall(usize),

    #[error("corrupted or invalid PDF")]
    CorruptedPdf,

    #[error("PDF is password-protected; remove the password and upload again")]
    PasswordProtected,

    #[error("corrupted or invalid DOCX")]
    CorruptedDocx,

    #[error("corrupted or invalid DOC")]
    CorruptedDoc,
}

/// A file as received from the client, before anything is persisted.
#[derive(Debug, Clone, Copy)]
pub struct IncomingFile<'a> {
    pub file_name: &'a str,
    pub content_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

/// Validates an incoming file and returns its declared type.
pub fn validate(file: &IncomingFile<'_>) -> Result<DeclaredType, ValidationError> {
    let declared = DeclaredType::resolve(file.content_type, file.file_name).ok_or_else(|| {
        ValidationError::UnsupportedType(
            file.content_type
                .map(str::to_string)
                .unwrap_or_else(|| file.file_name.to_string()),
        )
    })?;

    let size = file.bytes.len();
    if size > MAX_FILE_BYTES {
        return Err(ValidationError::TooLarge(size));
    }
    if size < MIN_FILE_BYTES {
        return Err(ValidationError::TooSmall(size));
    }

    match declared {
        DeclaredType::Pdf => {
            if !file.bytes.starts_with(PDF_SIGNATURE) {
                return Err(ValidationError::CorruptedPdf);
            }
            if PDF_ENCRYPTION_MARKERS
                .iter()
                .any(|marker| contains(file.bytes, marker))
            {
                return Err(ValidationError::PasswordProtected);
            }
        }
        DeclaredType::Docx => {
            if !file.bytes.starts_with(ZIP_SIGNATURE) {
                return Err(ValidationError::CorruptedDocx);
            }
        }
        DeclaredType::Doc => {
            if !is_legacy_doc_signature(file.bytes) {
                return Err(ValidationError::CorruptedDoc);
            }
        }
    }

    Ok(declared)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
