use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{
    Document, DocumentList, FileUpload, Identity, Query, RemoteBackend, RemoteResult, Session,
    StoredFile,
};
use crate::config::Config;
use crate::error::RemoteError;
use crate::handler::USER_AGENT;
use crate::metrics::PortalMetrics;
use crate::session::{SessionStorage, COOKIE_FALLBACK_KEY};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

/// Retry policy for idempotent reads.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff with up to 50% random jitter.
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << attempt.min(10));
        let jitter = if base == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=base / 2)
        };
        Duration::from_millis(exp + jitter)
    }
}

#[derive(Clone)]
pub struct AppwriteClient {
    endpoint: String,
    project_id: String,
    http: Client,
    session: Arc<dyn SessionStorage>,
    retry: RetryPolicy,
    metrics: Option<Arc<PortalMetrics>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl AppwriteClient {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        session: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            http: Client::new(),
            session,
            retry: RetryPolicy::default(),
            metrics: None,
        }
    }

    pub fn from_config(config: &Config, session: Arc<dyn SessionStorage>) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(config.api_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| RemoteError::Unknown(err.to_string()))?;

        Ok(Self {
            http,
            retry: RetryPolicy {
                attempts: config.retry_attempts,
                ..RetryPolicy::default()
            },
            ..Self::new(config.endpoint.clone(), config.project_id.clone(), session)
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PortalMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.endpoint, path))
            .header(PROJECT_HEADER, &self.project_id);

        match self.session.get(COOKIE_FALLBACK_KEY) {
            Some(secret) => builder.header(FALLBACK_COOKIES_HEADER, secret),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> RemoteResult<Response> {
        let result = self.send_inner(builder).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_request(operation, result.is_ok());
        }
        if let Err(err) = &result {
            tracing::debug!("{} failed: {}", operation, err);
        }
        result
    }

    async fn send_inner(&self, builder: RequestBuilder) -> RemoteResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|err| RemoteError::Network(err.to_string()))?;

        if let Some(secret) = response
            .headers()
            .get(FALLBACK_COOKIES_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            if let Err(err) = self.session.set(COOKIE_FALLBACK_KEY, secret) {
                tracing::warn!("Failed to persist session: {}", err);
            }
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (message, kind) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => (parsed.message, parsed.kind),
            Err(_) => (format!("Backend returned HTTP {}", status), None),
        };

        Err(RemoteError::Api {
            status: status.as_u16(),
            kind,
            message,
        })
    }

    async fn execute<T: DeserializeOwned>(&self, operation: &str, builder: RequestBuilder) -> RemoteResult<T> {
        self.send(operation, builder)
            .await?
            .json::<T>()
            .await
            .map_err(|err| RemoteError::Parse(err.to_string()))
    }

    async fn execute_empty(&self, operation: &str, builder: RequestBuilder) -> RemoteResult<()> {
        self.send(operation, builder).await.map(|_| ())
    }

    /// Send a read that is safe to repeat, retrying transient failures.
    async fn execute_idempotent<T, F>(&self, operation: &str, make_request: F) -> RemoteResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.execute(operation, make_request()).await {
                Err(err) if err.is_transient() && attempt < self.retry.attempts => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        "{} failed ({}), retrying in {}ms",
                        operation,
                        err,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn file_url(&self, bucket_id: &str, id: &str, action: &str) -> RemoteResult<Url> {
        let raw = format!(
            "{}/storage/buckets/{}/files/{}/{}",
            self.endpoint, bucket_id, id, action
        );
        let mut url = Url::parse(&raw).map_err(|err| RemoteError::Unknown(format!("Invalid file URL {}: {}", raw, err)))?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        Ok(url)
    }
}

#[async_trait]
impl RemoteBackend for AppwriteClient {
    async fn create_account(
        &self,
        id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity> {
        let body = json!({
            "userId": id,
            "email": email,
            "password": password,
            "name": name,
        });
        self.execute("create_account", self.request(Method::POST, "/account").json(&body))
            .await
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<Session> {
        let body = json!({ "email": email, "password": password });
        self.execute(
            "create_session",
            self.request(Method::POST, "/account/sessions/email").json(&body),
        )
        .await
    }

    async fn get_current_identity(&self) -> RemoteResult<Identity> {
        self.execute_idempotent("get_current_identity", || {
            self.request(Method::GET, "/account")
        })
        .await
    }

    async fn delete_session(&self, scope: &str) -> RemoteResult<()> {
        let path = format!("/account/sessions/{}", scope);
        self.execute_empty("delete_session", self.request(Method::DELETE, &path))
            .await?;

        if let Err(err) = self.session.remove(COOKIE_FALLBACK_KEY) {
            tracing::warn!("Failed to forget session secret: {}", err);
        }
        Ok(())
    }

    async fn create_recovery(&self, email: &str, redirect_url: &str) -> RemoteResult<()> {
        let body = json!({ "email": email, "url": redirect_url });
        self.execute_empty(
            "create_recovery",
            self.request(Method::POST, "/account/recovery").json(&body),
        )
        .await
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        data: &Map<String, Value>,
    ) -> RemoteResult<Document> {
        let path = format!(
            "/databases/{}/collections/{}/documents",
            database_id, collection_id
        );
        let body = json!({ "documentId": id, "data": data });
        self.execute("create_document", self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        filters: &[Query],
    ) -> RemoteResult<DocumentList> {
        let path = format!(
            "/databases/{}/collections/{}/documents",
            database_id, collection_id
        );
        let queries: Vec<(&str, String)> = filters
            .iter()
            .map(|filter| ("queries[]", filter.encode()))
            .collect();

        self.execute_idempotent("list_documents", || {
            self.request(Method::GET, &path).query(&queries)
        })
        .await
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        data: &Map<String, Value>,
    ) -> RemoteResult<Document> {
        let path = format!(
            "/databases/{}/collections/{}/documents/{}",
            database_id, collection_id, id
        );
        let body = json!({ "data": data });
        self.execute("update_document", self.request(Method::PATCH, &path).json(&body))
            .await
    }

    async fn create_file(&self, bucket_id: &str, id: &str, file: FileUpload) -> RemoteResult<StoredFile> {
        let path = format!("/storage/buckets/{}/files", bucket_id);

        let mut part = Part::bytes(file.bytes).file_name(file.name);
        if let Some(mime) = &file.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|err| RemoteError::Unknown(format!("Invalid MIME type {}: {}", mime, err)))?;
        }
        let form = Form::new().text("fileId", id.to_string()).part("file", part);

        self.execute("create_file", self.request(Method::POST, &path).multipart(form))
            .await
    }

    async fn delete_file(&self, bucket_id: &str, id: &str) -> RemoteResult<()> {
        let path = format!("/storage/buckets/{}/files/{}", bucket_id, id);
        self.execute_empty("delete_file", self.request(Method::DELETE, &path))
            .await
    }

    fn file_preview_url(&self, bucket_id: &str, id: &str, width: u32, height: u32) -> RemoteResult<String> {
        let mut url = self.file_url(bucket_id, id, "preview")?;
        url.query_pairs_mut()
            .append_pair("width", &width.to_string())
            .append_pair("height", &height.to_string());
        Ok(url.to_string())
    }

    fn file_download_url(&self, bucket_id: &str, id: &str) -> RemoteResult<String> {
        Ok(self.file_url(bucket_id, id, "download")?.to_string())
    }
}
