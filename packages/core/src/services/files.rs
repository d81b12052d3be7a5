use std::sync::Arc;

use chrono::Utc;

use crate::catalog::DocumentType;
use crate::error::{ErrorCode, ServiceError};
use crate::remote::{FileUpload, RemoteBackend, ID_UNIQUE};
use crate::validation::validate_upload;

pub const PREVIEW_SIZE: u32 = 300;

#[derive(Clone)]
pub struct FileService {
    backend: Arc<dyn RemoteBackend>,
    bucket_id: String,
}

impl FileService {
    pub fn new(backend: Arc<dyn RemoteBackend>, bucket_id: impl Into<String>) -> Self {
        Self {
            backend,
            bucket_id: bucket_id.into(),
        }
    }

    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    /// Validate and store `file` as a `doc_type` document of `user_id`.
    /// Returns the stored file id.
    pub async fn upload_file(
        &self,
        mut file: FileUpload,
        user_id: &str,
        doc_type: DocumentType,
    ) -> Result<String, ServiceError> {
        if let Err(err) = validate_upload(doc_type, &file.name, file.size()) {
            tracing::debug!("Rejected {} upload {}: {}", doc_type, file.name, err);
            return Err(ServiceError {
                code: Some(ErrorCode::Status(400)),
                message: err.to_string(),
                kind: Some("file_validation".into()),
            });
        }

        file.name = stored_name(user_id, doc_type, &file.name);
        let stored = self
            .backend
            .create_file(&self.bucket_id, ID_UNIQUE, file)
            .await
            .map_err(|err| {
                ServiceError::from_remote(err, &format!("Failed to upload {} file", doc_type))
            })?;

        tracing::info!("Uploaded {} as {} ({} bytes)", doc_type, stored.id, stored.size);
        Ok(stored.id)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
        self.backend
            .delete_file(&self.bucket_id, file_id)
            .await
            .map_err(ServiceError::with_fallback("Failed to delete file"))?;
        tracing::info!("Deleted file {}", file_id);
        Ok(())
    }

    /// Thumbnail URL, or an empty string if it cannot be built.
    pub fn file_preview_url(&self, file_id: &str) -> String {
        self.backend
            .file_preview_url(&self.bucket_id, file_id, PREVIEW_SIZE, PREVIEW_SIZE)
            .unwrap_or_else(|err| {
                tracing::error!("Failed to build preview URL for {}: {}", file_id, err);
                String::new()
            })
    }

    /// Download URL, or an empty string if it cannot be built.
    pub fn file_download_url(&self, file_id: &str) -> String {
        self.backend
            .file_download_url(&self.bucket_id, file_id)
            .unwrap_or_else(|err| {
                tracing::error!("Failed to build download URL for {}: {}", file_id, err);
                String::new()
            })
    }
}

/// `{userId}_{docType}_{millis}_{originalName}`
fn stored_name(user_id: &str, doc_type: DocumentType, original: &str) -> String {
    format!(
        "{}_{}_{}_{}",
        user_id,
        doc_type.as_str(),
        Utc::now().timestamp_millis(),
        original
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::InMemoryBackend;

    async fn signed_in() -> (Arc<InMemoryBackend>, FileService) {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_account("budi@elkkana.id", "password1", "Budi");
        backend
            .create_session("budi@elkkana.id", "password1")
            .await
            .unwrap();
        let service = FileService::new(backend.clone(), "documents");
        (backend, service)
    }

    #[tokio::test]
    async fn upload_stores_valid_file() {
        let (backend, service) = signed_in().await;

        let id = service
            .upload_file(FileUpload::new("cv.pdf", vec![1, 2, 3]), "user-1", DocumentType::Cv)
            .await
            .unwrap();

        assert!(id.starts_with("file-"));
        assert_eq!(backend.file_count(), 1);
    }

    #[tokio::test]
    async fn invalid_file_never_reaches_backend() {
        let (backend, service) = signed_in().await;
        let calls = backend.call_count();

        let err = service
            .upload_file(FileUpload::new("cv.exe", vec![1]), "user-1", DocumentType::Cv)
            .await
            .unwrap_err();

        assert_eq!(
            err.message,
            "Invalid file format. Accepted formats: .PDF, .DOC, .DOCX"
        );
        assert_eq!(err.kind.as_deref(), Some("file_validation"));
        assert_eq!(backend.call_count(), calls);
    }

    #[tokio::test]
    async fn upload_failure_uses_document_fallback() {
        let (backend, service) = signed_in().await;
        backend.fail_next("create_file", RemoteError::Unknown(String::new()));

        let err = service
            .upload_file(FileUpload::new("photo.png", vec![1]), "user-1", DocumentType::Photo)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Failed to upload photo file");
    }

    #[tokio::test]
    async fn delete_missing_file_reports_not_found() {
        let (_, service) = signed_in().await;

        let err = service.delete_file("file-404").await.unwrap_err();
        assert_eq!(err.code, Some(ErrorCode::Status(404)));
    }

    #[test]
    fn stored_name_embeds_owner_and_type() {
        let name = stored_name("user-1", DocumentType::SeamanBook, "book.pdf");
        assert!(name.starts_with("user-1_seamanBook_"));
        assert!(name.ends_with("_book.pdf"));
    }

    #[test]
    fn preview_urls_use_fixed_size() {
        let service = FileService::new(Arc::new(InMemoryBackend::new()), "documents");
        assert_eq!(
            service.file_preview_url("file-1"),
            "memory://storage/buckets/documents/files/file-1/preview?width=300&height=300"
        );
        assert!(service.file_download_url("file-1").ends_with("/download"));
    }
}
