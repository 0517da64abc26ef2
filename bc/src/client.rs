//! Resilient board client
//!
//! Every typed operation funnels through `send_with_retry`, which applies
//! two retry policies sharing one attempt counter: server-dictated delays
//! for 429, exponential backoff for 5xx and connectivity failures. 401
//! invalidates the cached credential and retries once per attempt with the
//! flat initial delay; other 4xx fail immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::auth::CredentialProvider;
use crate::config::RetryConfig;
use crate::error::ClientError;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::types::{ListResponse, QueryResponse, Relation, WorkItem, relations};

/// Hard server-side cap on ids per batch request.
pub const MAX_BATCH: usize = 200;

/// Retry-After fallback when the header is absent or unparseable.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const API_VERSION: &str = "7.1";

/// Typed surface the workflow stages depend on. `BoardClient` is the
/// production implementation; tests substitute scripted fakes.
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn get_item(&self, id: i64) -> Result<WorkItem, ClientError>;

    /// Fetch many items by id. Empty input short-circuits with zero network
    /// calls; oversized lists split into `MAX_BATCH`-sized chunks fetched
    /// concurrently and concatenated in chunk order.
    async fn get_items_batch(&self, ids: &[i64]) -> Result<Vec<WorkItem>, ClientError>;

    async fn create_item(&self, item_type: &str, fields: &HashMap<String, Value>) -> Result<WorkItem, ClientError>;

    async fn update_item(&self, id: i64, fields: &HashMap<String, Value>) -> Result<WorkItem, ClientError>;

    /// Structured query returning hydrated items (ids resolved through the
    /// batch endpoint).
    async fn run_query(&self, query: &str) -> Result<Vec<WorkItem>, ClientError>;

    async fn get_children(&self, id: i64) -> Result<Vec<WorkItem>, ClientError>;

    /// First parent match, or `None`. Parent cardinality is at most one by
    /// convention.
    async fn get_parent(&self, id: i64) -> Result<Option<WorkItem>, ClientError>;

    async fn get_related(&self, id: i64) -> Result<Vec<WorkItem>, ClientError>;

    /// Attach `child_id` under `parent_id` in the item hierarchy.
    async fn add_child_link(&self, parent_id: i64, child_id: i64) -> Result<(), ClientError>;
}

pub struct BoardClient {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryConfig,
    organization_url: String,
    project: String,
}

impl BoardClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
        retry: RetryConfig,
        organization_url: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            credentials,
            retry,
            organization_url: organization_url.into().trim_end_matches('/').to_string(),
            project: project.into(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}/_apis/{}?api-version={}",
            self.organization_url, self.project, path, API_VERSION
        )
    }

    /// URL of an item for use in relation payloads.
    fn item_url(&self, id: i64) -> String {
        format!("{}/_apis/wit/workItems/{}", self.organization_url, id)
    }

    /// Shared retry wrapper. 2xx returns immediately; everything else
    /// follows the per-status policy until `max_retries` is spent.
    async fn send_with_retry(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut attempt: u32 = 0;
        loop {
            // Header is re-read every attempt so a 401-invalidated cache
            // picks up a fresh token on the retry.
            let auth = self.credentials.get_auth_header().await?;
            let mut outbound = request.clone();
            outbound.auth = Some(auth);

            match self.transport.send(outbound).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => match response.status {
                    429 => {
                        let retry_after = parse_retry_after(response.retry_after.as_deref());
                        if attempt < self.retry.max_retries {
                            warn!(
                                attempt,
                                retry_after_secs = retry_after.as_secs(),
                                "send_with_retry: rate limited, honoring server delay"
                            );
                            tokio::time::sleep(retry_after).await;
                        } else {
                            return Err(ClientError::RateLimited { retry_after });
                        }
                    }
                    401 => {
                        debug!(attempt, "send_with_retry: auth rejected, invalidating cached credential");
                        self.credentials.invalidate().await;
                        if attempt < self.retry.max_retries {
                            tokio::time::sleep(self.retry.initial_delay()).await;
                        } else {
                            // Exhausted auth failures degrade to the generic
                            // API failure path.
                            return Err(ClientError::Api {
                                status: 401,
                                body: response.body,
                            });
                        }
                    }
                    500..=599 => {
                        if attempt < self.retry.max_retries {
                            let delay = self.retry.backoff_delay(attempt);
                            warn!(
                                attempt,
                                status = response.status,
                                delay_ms = delay.as_millis() as u64,
                                "send_with_retry: server error, backing off"
                            );
                            tokio::time::sleep(delay).await;
                        } else {
                            return Err(ClientError::Api {
                                status: response.status,
                                body: response.body,
                            });
                        }
                    }
                    status => {
                        return Err(ClientError::Api {
                            status,
                            body: response.body,
                        });
                    }
                },
                Err(e) => {
                    if attempt < self.retry.max_retries {
                        let delay = self.retry.backoff_delay(attempt);
                        warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "send_with_retry: network error, backing off");
                        tokio::time::sleep(delay).await;
                    } else {
                        return Err(ClientError::Network(e.to_string()));
                    }
                }
            }
            attempt += 1;
        }
    }

    async fn get_item_expanded(&self, id: i64) -> Result<WorkItem, ClientError> {
        let url = format!("{}&$expand=relations", self.api_url(&format!("wit/workitems/{id}")));
        self.send_with_retry(ApiRequest::get(url)).await?.json()
    }

    async fn related_by_kind(&self, id: i64, kind: &str) -> Result<Vec<WorkItem>, ClientError> {
        let item = self.get_item_expanded(id).await?;
        let ids = relation_target_ids(item.relations.as_deref().unwrap_or(&[]), kind);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_items_batch(&ids).await
    }
}

#[async_trait]
impl BoardApi for BoardClient {
    async fn get_item(&self, id: i64) -> Result<WorkItem, ClientError> {
        debug!(%id, "get_item: called");
        let url = self.api_url(&format!("wit/workitems/{id}"));
        self.send_with_retry(ApiRequest::get(url)).await?.json()
    }

    async fn get_items_batch(&self, ids: &[i64]) -> Result<Vec<WorkItem>, ClientError> {
        debug!(count = ids.len(), "get_items_batch: called");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_futures = ids.chunks(MAX_BATCH).map(|chunk| {
            let request = ApiRequest::post(self.api_url("wit/workitemsbatch"), json!({ "ids": chunk }));
            async move {
                self.send_with_retry(request)
                    .await?
                    .json::<ListResponse<WorkItem>>()
            }
        });

        let results = join_all(chunk_futures).await;
        let mut items = Vec::with_capacity(ids.len());
        for result in results {
            items.extend(result?.value);
        }
        Ok(items)
    }

    async fn create_item(&self, item_type: &str, fields: &HashMap<String, Value>) -> Result<WorkItem, ClientError> {
        debug!(%item_type, field_count = fields.len(), "create_item: called");
        let patch: Vec<Value> = fields
            .iter()
            .map(|(name, value)| {
                json!({
                    "op": "add",
                    "path": format!("/fields/{name}"),
                    "value": value,
                })
            })
            .collect();
        let type_segment = encode_path_segment(item_type);
        let url = self.api_url(&format!("wit/workitems/${type_segment}"));
        self.send_with_retry(ApiRequest::post_patch(url, Value::Array(patch)))
            .await?
            .json()
    }

    async fn update_item(&self, id: i64, fields: &HashMap<String, Value>) -> Result<WorkItem, ClientError> {
        debug!(%id, field_count = fields.len(), "update_item: called");
        if fields.is_empty() {
            return Err(ClientError::InvalidRequest("no fields to update".to_string()));
        }
        let patch: Vec<Value> = fields
            .iter()
            .map(|(name, value)| {
                json!({
                    "op": "add",
                    "path": format!("/fields/{name}"),
                    "value": value,
                })
            })
            .collect();
        let url = self.api_url(&format!("wit/workitems/{id}"));
        self.send_with_retry(ApiRequest::patch(url, Value::Array(patch)))
            .await?
            .json()
    }

    async fn run_query(&self, query: &str) -> Result<Vec<WorkItem>, ClientError> {
        debug!(query_len = query.len(), "run_query: called");
        let url = self.api_url("wit/wiql");
        let response: QueryResponse = self
            .send_with_retry(ApiRequest::post(url, json!({ "query": query })))
            .await?
            .json()?;
        let ids: Vec<i64> = response.work_items.iter().map(|r| r.id).collect();
        self.get_items_batch(&ids).await
    }

    async fn get_children(&self, id: i64) -> Result<Vec<WorkItem>, ClientError> {
        debug!(%id, "get_children: called");
        self.related_by_kind(id, relations::CHILD).await
    }

    async fn get_parent(&self, id: i64) -> Result<Option<WorkItem>, ClientError> {
        debug!(%id, "get_parent: called");
        let item = self.get_item_expanded(id).await?;
        let ids = relation_target_ids(item.relations.as_deref().unwrap_or(&[]), relations::PARENT);
        match ids.first() {
            Some(parent_id) => Ok(Some(self.get_item(*parent_id).await?)),
            None => Ok(None),
        }
    }

    async fn get_related(&self, id: i64) -> Result<Vec<WorkItem>, ClientError> {
        debug!(%id, "get_related: called");
        self.related_by_kind(id, relations::RELATED).await
    }

    async fn add_child_link(&self, parent_id: i64, child_id: i64) -> Result<(), ClientError> {
        debug!(%parent_id, %child_id, "add_child_link: called");
        let patch = json!([{
            "op": "add",
            "path": "/relations/-",
            "value": {
                "rel": relations::CHILD,
                "url": self.item_url(child_id),
            }
        }]);
        let url = self.api_url(&format!("wit/workitems/{parent_id}"));
        self.send_with_retry(ApiRequest::patch(url, patch)).await?;
        Ok(())
    }
}

/// Extract target ids for one relation kind; unparseable urls are dropped.
fn relation_target_ids(relations: &[Relation], kind: &str) -> Vec<i64> {
    relations
        .iter()
        .filter(|r| r.rel == kind)
        .filter_map(|r| trailing_id(&r.url))
        .collect()
}

/// Trailing numeric path segment of a relation URL.
fn trailing_id(url: &str) -> Option<i64> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

/// Percent-encode a value for use as a single URL path segment. Everything
/// outside the RFC 3986 unreserved set is encoded, byte by byte.
fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push_str(&format!("%{other:02X}"));
            }
        }
    }
    encoded
}

fn parse_retry_after(header: Option<&str>) -> Duration {
    let secs = header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{RequestBody, TransportError};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pops one scripted step per call; `Err` steps simulate connectivity
    /// failures. Panics if called more times than scripted.
    struct ScriptedTransport {
        steps: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Result<ApiResponse, TransportError>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted transport exhausted")
        }
    }

    /// Answers batch requests by echoing one item per requested id.
    struct BatchEcho {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for BatchEcho {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some(RequestBody::Json(body)) = &request.body else {
                panic!("expected a JSON batch body");
            };
            let ids = body["ids"].as_array().expect("ids array");
            assert!(ids.len() <= MAX_BATCH, "chunk exceeded the batch cap");
            let items: Vec<Value> = ids.iter().map(|id| json!({"id": id, "fields": {}})).collect();
            Ok(ApiResponse {
                status: 200,
                retry_after: None,
                body: json!({"count": items.len(), "value": items}).to_string(),
            })
        }
    }

    struct CountingCredentials {
        invalidations: AtomicUsize,
    }

    #[async_trait]
    impl CredentialProvider for CountingCredentials {
        async fn get_auth_header(&self) -> Result<String, ClientError> {
            Ok("Bearer test".to_string())
        }

        async fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    fn client_with(transport: Arc<dyn Transport>) -> (BoardClient, Arc<CountingCredentials>) {
        let credentials = Arc::new(CountingCredentials {
            invalidations: AtomicUsize::new(0),
        });
        let client = BoardClient::new(
            transport,
            credentials.clone(),
            fast_retry(),
            "https://board.test/acme",
            "web",
        );
        (client, credentials)
    }

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            retry_after: None,
            body: body.to_string(),
        }
    }

    fn item_body(id: i64) -> String {
        json!({"id": id, "fields": {"System.Title": format!("Item {id}")}}).to_string()
    }

    #[tokio::test]
    async fn test_success_returns_immediately() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(200, &item_body(1)))]));
        let (client, _) = client_with(transport.clone());

        let item = client.get_item(1).await.unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_503_then_200_takes_two_calls() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(503, "unavailable")),
            Ok(response(200, &item_body(1))),
        ]));
        let (client, _) = client_with(transport.clone());

        let item = client.get_item(1).await.unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_persistent_429_exhausts_into_rate_limit_error() {
        let rate_limited = ApiResponse {
            status: 429,
            retry_after: Some("0".to_string()),
            body: "slow down".to_string(),
        };
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(rate_limited.clone()),
            Ok(rate_limited.clone()),
            Ok(rate_limited.clone()),
            Ok(rate_limited),
        ]));
        let (client, _) = client_with(transport.clone());

        let result = client.get_item(1).await;
        // max_retries + 1 total calls before giving up.
        assert_eq!(transport.call_count(), 4);
        match result {
            Err(ClientError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Duration::from_secs(0));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_retry_after_defaults_to_sixty_seconds() {
        assert_eq!(parse_retry_after(None), Duration::from_secs(60));
        assert_eq!(parse_retry_after(Some("garbage")), Duration::from_secs(60));
        assert_eq!(parse_retry_after(Some("2")), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_401_invalidates_credentials_once_before_retry() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(401, "expired")),
            Ok(response(200, &item_body(9))),
        ]));
        let (client, credentials) = client_with(transport.clone());

        let item = client.get_item(9).await.unwrap();
        assert_eq!(item.id, 9);
        assert_eq!(transport.call_count(), 2);
        assert_eq!(credentials.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_401_degrades_to_api_error() {
        let steps = (0..4).map(|_| Ok(response(401, "expired"))).collect();
        let transport = Arc::new(ScriptedTransport::new(steps));
        let (client, credentials) = client_with(transport.clone());

        let result = client.get_item(9).await;
        assert_eq!(transport.call_count(), 4);
        assert_eq!(credentials.invalidations.load(Ordering::SeqCst), 4);
        assert!(matches!(result, Err(ClientError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_non_retryable_4xx_fails_immediately() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(404, "missing"))]));
        let (client, _) = client_with(transport.clone());

        let result = client.get_item(1).await;
        assert_eq!(transport.call_count(), 1);
        assert!(matches!(result, Err(ClientError::Api { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_network_failures_exhaust_into_network_error() {
        let steps = (0..4)
            .map(|_| Err(TransportError("connection refused".to_string())))
            .collect();
        let transport = Arc::new(ScriptedTransport::new(steps));
        let (client, _) = client_with(transport.clone());

        let result = client.get_item(1).await;
        assert_eq!(transport.call_count(), 4);
        assert!(matches!(result, Err(ClientError::Network(_))));
    }

    #[tokio::test]
    async fn test_batch_fetch_empty_input_makes_no_calls() {
        let transport = Arc::new(BatchEcho {
            calls: AtomicUsize::new(0),
        });
        let (client, _) = client_with(transport.clone());

        let items = client.get_items_batch(&[]).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_fetch_250_ids_splits_into_two_chunks() {
        let transport = Arc::new(BatchEcho {
            calls: AtomicUsize::new(0),
        });
        let (client, _) = client_with(transport.clone());

        let ids: Vec<i64> = (1..=250).collect();
        let items = client.get_items_batch(&ids).await.unwrap();
        assert_eq!(items.len(), 250);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        // Chunk order is preserved in the concatenated result.
        assert_eq!(items.first().unwrap().id, 1);
        assert_eq!(items.last().unwrap().id, 250);
    }

    #[tokio::test]
    async fn test_update_item_rejects_empty_field_map() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let (client, _) = client_with(transport.clone());

        let result = client.update_item(1, &HashMap::new()).await;
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_children_filters_relations_and_hydrates() {
        let expanded = json!({
            "id": 1,
            "fields": {},
            "relations": [
                {"rel": "System.LinkTypes.Hierarchy-Forward", "url": "https://board.test/_apis/wit/workItems/11"},
                {"rel": "System.LinkTypes.Related", "url": "https://board.test/_apis/wit/workItems/99"},
                {"rel": "System.LinkTypes.Hierarchy-Forward", "url": "https://board.test/_apis/wit/workItems/not-a-number"},
                {"rel": "System.LinkTypes.Hierarchy-Forward", "url": "https://board.test/_apis/wit/workItems/12"}
            ]
        })
        .to_string();
        let batch = json!({"count": 2, "value": [
            {"id": 11, "fields": {"System.Title": "Child A"}},
            {"id": 12, "fields": {"System.Title": "Child B"}}
        ]})
        .to_string();
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, &expanded)),
            Ok(response(200, &batch)),
        ]));
        let (client, _) = client_with(transport.clone());

        let children = client.get_children(1).await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_get_children_without_relations_is_empty_not_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(
            200,
            &json!({"id": 1, "fields": {}}).to_string(),
        ))]));
        let (client, _) = client_with(transport.clone());

        let children = client.get_children(1).await.unwrap();
        assert!(children.is_empty());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_get_parent_returns_first_match_or_none() {
        let expanded = json!({
            "id": 5,
            "fields": {},
            "relations": [
                {"rel": "System.LinkTypes.Hierarchy-Reverse", "url": "https://board.test/_apis/wit/workItems/3"}
            ]
        })
        .to_string();
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, &expanded)),
            Ok(response(200, &item_body(3))),
        ]));
        let (client, _) = client_with(transport);
        let parent = client.get_parent(5).await.unwrap();
        assert_eq!(parent.unwrap().id, 3);

        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(
            200,
            &json!({"id": 5, "fields": {}}).to_string(),
        ))]));
        let (client, _) = client_with(transport);
        assert!(client.get_parent(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_query_with_no_matches_skips_batch_fetch() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(
            200,
            &json!({"workItems": []}).to_string(),
        ))]));
        let (client, _) = client_with(transport.clone());

        let items = client.run_query("SELECT [System.Id] FROM WorkItems").await.unwrap();
        assert!(items.is_empty());
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_trailing_id_extraction() {
        assert_eq!(trailing_id("https://board.test/_apis/wit/workItems/123"), Some(123));
        assert_eq!(trailing_id("https://board.test/_apis/wit/workItems/123/"), Some(123));
        assert_eq!(trailing_id("https://board.test/_apis/wit/workItems/abc"), None);
    }

    #[test]
    fn test_encode_path_segment_covers_reserved_characters() {
        assert_eq!(encode_path_segment("User Story"), "User%20Story");
        assert_eq!(encode_path_segment("Q&A/Review?"), "Q%26A%2FReview%3F");
        assert_eq!(encode_path_segment("plain-type_1.x~"), "plain-type_1.x~");
    }

    /// Records the URL of every request and answers with a canned item.
    struct UrlCapture {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for UrlCapture {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.urls.lock().unwrap().push(request.url.clone());
            Ok(ApiResponse {
                status: 200,
                retry_after: None,
                body: json!({"id": 1, "fields": {}}).to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_create_item_encodes_type_in_url() {
        let transport = Arc::new(UrlCapture {
            urls: Mutex::new(Vec::new()),
        });
        let client = BoardClient::new(
            transport.clone(),
            Arc::new(CountingCredentials {
                invalidations: AtomicUsize::new(0),
            }),
            fast_retry(),
            "https://board.test/acme",
            "web",
        );

        client
            .create_item("Q&A Item", &HashMap::from([("System.Title".to_string(), json!("t"))]))
            .await
            .unwrap();

        let urls = transport.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("wit/workitems/$Q%26A%20Item?"), "{}", urls[0]);
    }
}
