//! Remote account/document/file capability.
//!
//! [`RemoteBackend`] is the only seam between the portal and the hosted
//! backend. [`appwrite::AppwriteClient`] talks to the real service over
//! HTTP; [`memory::InMemoryBackend`] keeps everything in process.

pub mod appwrite;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::RemoteError;

pub use appwrite::AppwriteClient;
pub use memory::InMemoryBackend;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Asks the backend to generate the id.
pub const ID_UNIQUE: &str = "unique()";

/// Session scope meaning "the session making the request".
pub const CURRENT_SESSION: &str = "current";

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn create_account(
        &self,
        id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity>;

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<Session>;

    async fn get_current_identity(&self) -> RemoteResult<Identity>;

    async fn delete_session(&self, scope: &str) -> RemoteResult<()>;

    async fn create_recovery(&self, email: &str, redirect_url: &str) -> RemoteResult<()>;

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        data: &Map<String, Value>,
    ) -> RemoteResult<Document>;

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        filters: &[Query],
    ) -> RemoteResult<DocumentList>;

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        data: &Map<String, Value>,
    ) -> RemoteResult<Document>;

    async fn create_file(&self, bucket_id: &str, id: &str, file: FileUpload) -> RemoteResult<StoredFile>;

    async fn delete_file(&self, bucket_id: &str, id: &str) -> RemoteResult<()>;

    /// Built locally; performs no I/O.
    fn file_preview_url(&self, bucket_id: &str, id: &str, width: u32, height: u32) -> RemoteResult<String>;

    /// Built locally; performs no I/O.
    fn file_download_url(&self, bucket_id: &str, id: &str) -> RemoteResult<String>;
}

/// Authenticated account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "emailVerification", default)]
    pub email_verification: bool,
    #[serde(rename = "$createdAt", default)]
    pub created_at: String,
    #[serde(rename = "$updatedAt", default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub expire: String,
}

/// A stored document: system id plus its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Document {
    /// Deserialize the full document (including `$id`) into `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> RemoteResult<T> {
        let mut fields = self.data;
        fields.insert("$id".into(), Value::String(self.id));
        serde_json::from_value(Value::Object(fields)).map_err(|err| RemoteError::Parse(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "bucketId", default)]
    pub bucket_id: String,
    pub name: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

/// File contents to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Document list filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal { attribute: String, values: Vec<Value> },
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Equal {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    /// JSON encoding used in `queries[]` parameters.
    pub fn encode(&self) -> String {
        match self {
            Query::Equal { attribute, values } => json!({
                "method": "equal",
                "attribute": attribute,
                "values": values,
            })
            .to_string(),
        }
    }

    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        match self {
            Query::Equal { attribute, values } => data
                .get(attribute)
                .map_or(false, |actual| values.contains(actual)),
        }
    }
}
