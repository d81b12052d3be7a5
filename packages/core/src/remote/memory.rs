//! In-process backend with the same failure semantics as the hosted one.
//!
//! Used by tests and offline demos. Every trait call increments
//! [`InMemoryBackend::call_count`]; a failure for the next call of a given
//! operation can be injected with [`InMemoryBackend::fail_next`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use super::{
    Document, DocumentList, FileUpload, Identity, Query, RemoteBackend, RemoteResult, Session,
    StoredFile, ID_UNIQUE,
};
use crate::error::RemoteError;

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
}

#[derive(Debug, Default)]
struct BackendState {
    accounts: Vec<Account>,
    /// User id of the active session.
    session_user: Option<String>,
    documents: HashMap<(String, String), Vec<Document>>,
    files: HashMap<(String, String), StoredFile>,
    recoveries: Vec<(String, String)>,
    failures: HashMap<&'static str, RemoteError>,
    next_id: u64,
}

impl BackendState {
    fn resolve_id(&mut self, requested: &str, prefix: &str) -> String {
        if requested == ID_UNIQUE {
            self.next_id += 1;
            format!("{}-{}", prefix, self.next_id)
        } else {
            requested.to_string()
        }
    }

    fn current_identity(&self) -> RemoteResult<Identity> {
        self.session_user
            .as_ref()
            .and_then(|user_id| self.accounts.iter().find(|a| &a.identity.id == user_id))
            .map(|account| account.identity.clone())
            .ok_or_else(unauthorized)
    }
}

fn unauthorized() -> RemoteError {
    RemoteError::api(
        401,
        "general_unauthorized_scope",
        "User (role: guests) missing scope (account)",
    )
}

fn not_found(kind: &str, message: &str) -> RemoteError {
    RemoteError::api(404, kind, message)
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self, operation: &'static str) -> RemoteResult<MutexGuard<'_, BackendState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.failures.remove(operation) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    /// Make the next call of `operation` (a trait method name) fail with `err`.
    pub fn fail_next(&self, operation: &'static str, err: RemoteError) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failures
            .insert(operation, err);
    }

    /// Total number of trait calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Register an account directly, without a session.
    pub fn seed_account(&self, email: &str, password: &str, name: &str) -> Identity {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let id = state.resolve_id(ID_UNIQUE, "user");
        let identity = new_identity(id, email, name);
        state.accounts.push(Account {
            identity: identity.clone(),
            password: password.to_string(),
        });
        identity
    }

    pub fn has_session(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .session_user
            .is_some()
    }

    pub fn documents(&self, database_id: &str, collection_id: &str) -> Vec<Document> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .documents
            .get(&(database_id.to_string(), collection_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn file_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .len()
    }

    /// `(email, redirect_url)` pairs of requested password recoveries.
    pub fn recoveries(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recoveries
            .clone()
    }
}

fn new_identity(id: String, email: &str, name: &str) -> Identity {
    let now = Utc::now().to_rfc3339();
    Identity {
        id,
        name: name.to_string(),
        email: email.to_string(),
        email_verification: false,
        created_at: now.clone(),
        updated_at: now,
    }
}

#[async_trait]
impl RemoteBackend for InMemoryBackend {
    async fn create_account(
        &self,
        id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity> {
        let mut state = self.begin("create_account")?;
        if state.accounts.iter().any(|a| a.identity.email == email) {
            return Err(RemoteError::api(
                409,
                "user_already_exists",
                "A user with the same id, email, or phone already exists in this project.",
            ));
        }

        let id = state.resolve_id(id, "user");
        let identity = new_identity(id, email, name);
        state.accounts.push(Account {
            identity: identity.clone(),
            password: password.to_string(),
        });
        Ok(identity)
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<Session> {
        let mut state = self.begin("create_session")?;
        let user_id = state
            .accounts
            .iter()
            .find(|a| a.identity.email == email && a.password == password)
            .map(|a| a.identity.id.clone())
            .ok_or_else(|| {
                RemoteError::api(
                    401,
                    "user_invalid_credentials",
                    "Invalid credentials. Please check the email and password.",
                )
            })?;

        state.session_user = Some(user_id.clone());
        let id = state.resolve_id(ID_UNIQUE, "session");
        Ok(Session {
            id,
            user_id,
            expire: String::new(),
        })
    }

    async fn get_current_identity(&self) -> RemoteResult<Identity> {
        self.begin("get_current_identity")?.current_identity()
    }

    async fn delete_session(&self, _scope: &str) -> RemoteResult<()> {
        let mut state = self.begin("delete_session")?;
        state.current_identity()?;
        state.session_user = None;
        Ok(())
    }

    async fn create_recovery(&self, email: &str, redirect_url: &str) -> RemoteResult<()> {
        let mut state = self.begin("create_recovery")?;
        if !state.accounts.iter().any(|a| a.identity.email == email) {
            return Err(not_found("user_not_found", "User with the requested ID could not be found."));
        }
        state
            .recoveries
            .push((email.to_string(), redirect_url.to_string()));
        Ok(())
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        data: &Map<String, Value>,
    ) -> RemoteResult<Document> {
        let mut state = self.begin("create_document")?;
        state.current_identity()?;

        let id = state.resolve_id(id, "doc");
        let document = Document {
            id,
            data: data.clone(),
        };
        state
            .documents
            .entry((database_id.to_string(), collection_id.to_string()))
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        filters: &[Query],
    ) -> RemoteResult<DocumentList> {
        let state = self.begin("list_documents")?;
        state.current_identity()?;

        let documents: Vec<Document> = state
            .documents
            .get(&(database_id.to_string(), collection_id.to_string()))
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filters.iter().all(|filter| filter.matches(&doc.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(DocumentList {
            total: documents.len() as u64,
            documents,
        })
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        data: &Map<String, Value>,
    ) -> RemoteResult<Document> {
        let mut state = self.begin("update_document")?;
        state.current_identity()?;

        let document = state
            .documents
            .get_mut(&(database_id.to_string(), collection_id.to_string()))
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| {
                not_found(
                    "document_not_found",
                    "Document with the requested ID could not be found.",
                )
            })?;

        for (key, value) in data {
            document.data.insert(key.clone(), value.clone());
        }
        Ok(document.clone())
    }

    async fn create_file(&self, bucket_id: &str, id: &str, file: FileUpload) -> RemoteResult<StoredFile> {
        let mut state = self.begin("create_file")?;
        state.current_identity()?;

        let id = state.resolve_id(id, "file");
        let stored = StoredFile {
            id: id.clone(),
            bucket_id: bucket_id.to_string(),
            size: file.size(),
            name: file.name,
            mime_type: file.mime_type.unwrap_or_default(),
        };
        state
            .files
            .insert((bucket_id.to_string(), id), stored.clone());
        Ok(stored)
    }

    async fn delete_file(&self, bucket_id: &str, id: &str) -> RemoteResult<()> {
        let mut state = self.begin("delete_file")?;
        state.current_identity()?;

        state
            .files
            .remove(&(bucket_id.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| {
                not_found(
                    "storage_file_not_found",
                    "The requested file could not be found.",
                )
            })
    }

    fn file_preview_url(&self, bucket_id: &str, id: &str, width: u32, height: u32) -> RemoteResult<String> {
        Ok(format!(
            "memory://storage/buckets/{}/files/{}/preview?width={}&height={}",
            bucket_id, id, width, height
        ))
    }

    fn file_download_url(&self, bucket_id: &str, id: &str) -> RemoteResult<String> {
        Ok(format!(
            "memory://storage/buckets/{}/files/{}/download",
            bucket_id, id
        ))
    }
}
