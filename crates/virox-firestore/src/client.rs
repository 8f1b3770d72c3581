//! Firestore REST API client.
//!
//! Production-grade client with:
//! - Service account tokens (cached) or Firebase API key auth
//! - Emulator support for local development and tests
//! - HTTP client tuning (pooling, timeouts)
//! - Observability (tracing spans, metrics)

use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::CustomServiceAccount;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::FirestoreConfig;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_query_documents, record_request};
use crate::token_cache::TokenCache;
use crate::types::{
    CommitRequest, CommitResponse, Document, RunQueryRequest, RunQueryResponse, StructuredQuery,
    Write,
};

/// Response body characters kept in parse errors.
const BODY_PREFIX_CHARS: usize = 200;

/// How requests are authorised.
enum Credentials {
    /// OAuth token from `GOOGLE_APPLICATION_CREDENTIALS`.
    ServiceAccount(Arc<TokenCache>),
    /// Firebase web API key, subject to security rules.
    ApiKey(String),
    /// Local emulator; accepts any bearer.
    Emulator,
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    credentials: Arc<Credentials>,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let credentials = Self::resolve_credentials(&config)?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("virox-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = config.documents_url();
        info!(project_id = %config.project_id, "Firestore client ready");

        Ok(Self {
            http,
            config,
            base_url,
            credentials: Arc::new(credentials),
        })
    }

    fn resolve_credentials(config: &FirestoreConfig) -> FirestoreResult<Credentials> {
        if let Some(host) = &config.emulator_host {
            debug!("Using Firestore emulator at {}", host);
            return Ok(Credentials::Emulator);
        }

        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;
        if let Some(sa) = service_account {
            return Ok(Credentials::ServiceAccount(Arc::new(TokenCache::new(
                Arc::new(sa),
            ))));
        }

        match &config.api_key {
            Some(key) if !key.is_empty() => Ok(Credentials::ApiKey(key.clone())),
            _ => Err(FirestoreError::auth_error(
                "No Firestore credentials: set GOOGLE_APPLICATION_CREDENTIALS or FIREBASE_API_KEY",
            )),
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Build document path.
    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Build the full resource name used inside writes.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Get a document.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self.send(Method::GET, &url, None::<&()>).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Run a structured query against the root documents tree.
    pub async fn run_query(
        &self,
        collection: &str,
        query: StructuredQuery,
    ) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", collection, None, async {
            let response = self.send(Method::POST, &url, Some(&request)).await?;
            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    // runQuery returns a JSON array, one element per result
                    let results: Vec<serde_json::Value> =
                        serde_json::from_str(&body).map_err(|e| {
                            FirestoreError::InvalidResponse(format!(
                                "Failed to parse runQuery response: {} (body prefix: {})",
                                e,
                                body_prefix(&body)
                            ))
                        })?;

                    // One unreadable result must not hide the rest of the query.
                    let docs: Vec<Document> = results
                        .into_iter()
                        .filter_map(|result| {
                            match serde_json::from_value::<RunQueryResponse>(result) {
                                Ok(r) => r.document,
                                Err(e) => {
                                    warn!(collection, "Skipping unreadable query result: {}", e);
                                    None
                                }
                            }
                        })
                        .collect();
                    record_query_documents(collection, docs.len());
                    Ok(docs)
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Apply writes atomically.
    pub async fn commit(&self, collection: &str, writes: Vec<Write>) -> FirestoreResult<CommitResponse> {
        if writes.is_empty() {
            return Err(FirestoreError::request_failed("Commit requires at least one write"));
        }

        let url = format!("{}:commit", self.base_url);
        let request = CommitRequest { writes };

        self.execute_request("commit", collection, None, async {
            let response = self.send(Method::POST, &url, Some(&request)).await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn authorize<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> FirestoreResult<RequestBuilder> {
        let mut request = self.http.request(method, url);
        request = match self.credentials.as_ref() {
            Credentials::ServiceAccount(cache) => request.bearer_auth(cache.get_token().await?),
            Credentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            Credentials::Emulator => request.bearer_auth("owner"),
        };
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request)
    }

    /// Send a request, refreshing an expired service account token once.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> FirestoreResult<Response> {
        let response = self.authorize(method.clone(), url, body).await?.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        match self.credentials.as_ref() {
            Credentials::ServiceAccount(cache) if Self::is_access_token_expired(&text) => {
                cache.invalidate().await;
                Ok(self.authorize(method, url, body).await?.send().await?)
            }
            _ => Err(FirestoreError::from_http_status(
                StatusCode::UNAUTHORIZED.as_u16(),
                format!("{} failed: {}", url, text),
            )),
        }
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = match doc_id {
            Some(id) => info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id),
            None => info_span!("firestore_request", operation = %operation, collection = %collection),
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// First characters of a response body, for error messages.
pub(crate) fn body_prefix(body: &str) -> String {
    body.chars().take(BODY_PREFIX_CHARS).collect()
}
