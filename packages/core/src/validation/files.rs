//! Client-side checks applied before a document is uploaded.

use thiserror::Error;

use crate::catalog::DocumentType;

pub const MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileValidationError {
    #[error("File is empty")]
    Empty,

    #[error("File size must be less than 5MB")]
    TooLarge { size: u64 },

    #[error("Invalid file format. Accepted formats: {}", formats_label(.accepted))]
    UnsupportedFormat { accepted: &'static [&'static str] },
}

/// Uppercased, comma-separated list such as `.PDF, .DOC, .DOCX`.
pub fn formats_label(accepted: &[&str]) -> String {
    accepted
        .iter()
        .map(|format| format.to_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lowercased extension including the leading dot.
fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

pub fn validate_upload(
    doc_type: DocumentType,
    file_name: &str,
    size: u64,
) -> Result<(), FileValidationError> {
    if size == 0 {
        return Err(FileValidationError::Empty);
    }
    if size > MAX_FILE_SIZE_BYTES {
        return Err(FileValidationError::TooLarge { size });
    }

    let accepted = doc_type.spec().accepted_formats;
    match extension(file_name) {
        Some(ext) if accepted.contains(&ext.as_str()) => Ok(()),
        _ => Err(FileValidationError::UnsupportedFormat { accepted }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_small_pdf_cv() {
        assert_eq!(validate_upload(DocumentType::Cv, "resume.pdf", 12), Ok(()));
        assert_eq!(validate_upload(DocumentType::Cv, "RESUME.DOCX", 12), Ok(()));
    }

    #[test]
    fn rejects_oversized_files() {
        let err = validate_upload(DocumentType::Cv, "large.pdf", 6 * 1024 * 1024).unwrap_err();
        assert!(err.to_string().contains("5MB"));
    }

    #[test]
    fn exactly_five_megabytes_is_allowed() {
        assert!(validate_upload(DocumentType::Passport, "scan.png", MAX_FILE_SIZE_BYTES).is_ok());
    }

    #[test]
    fn rejects_wrong_format_with_accepted_list() {
        let err = validate_upload(DocumentType::Cv, "photo.png", 100).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file format. Accepted formats: .PDF, .DOC, .DOCX"
        );
    }

    #[test]
    fn photo_must_be_an_image() {
        assert!(validate_upload(DocumentType::Photo, "me.jpeg", 100).is_ok());
        assert!(validate_upload(DocumentType::Photo, "me.pdf", 100).is_err());
    }

    #[test]
    fn files_without_extension_are_rejected() {
        assert!(validate_upload(DocumentType::Ktp, "scan", 100).is_err());
        assert!(validate_upload(DocumentType::Ktp, ".pdf", 100).is_err());
    }

    #[test]
    fn empty_files_are_rejected() {
        assert_eq!(
            validate_upload(DocumentType::Cv, "resume.pdf", 0),
            Err(FileValidationError::Empty)
        );
    }
}
