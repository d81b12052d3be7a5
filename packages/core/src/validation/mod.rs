//! Form and file validation.

pub mod files;
pub mod form;
pub mod rules;

pub use files::{validate_upload, FileValidationError, MAX_FILE_SIZE_BYTES};
pub use form::{validate_field, validate_form, FormData, FormRules, FormValidation, FormValidator};
pub use rules::{email, max_length, min_length, password, required, Rule};
