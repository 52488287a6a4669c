//! HTTP client wrapper for the question answering API.

use crate::client::types::{
    ApiError, ApiResult, CollectionInfo, HealthStatus, QueryRequest, QueryResponse,
    ReadinessStatus, SearchRequest, SearchResults,
};
use reqwest::{Client, Method, Response, StatusCode, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

pub(crate) const UPLOAD_ENDPOINT: &str = "documents/upload";
const COLLECTION_INFO_ENDPOINT: &str = "documents/info";
const COLLECTION_ENDPOINT: &str = "documents/collection";
const QUERY_ENDPOINT: &str = "query";
pub(crate) const QUERY_STREAM_ENDPOINT: &str = "query/stream";
const SEARCH_ENDPOINT: &str = "query/search";
const HEALTH_ENDPOINT: &str = "health";
const READINESS_ENDPOINT: &str = "health/ready";

/// Method and optional JSON body of a generic [`ApiClient::request`] call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<Value>,
}

impl RequestOptions {
    /// Body-less `GET`.
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }

    /// `POST` with a JSON body.
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
        }
    }

    /// Body-less `DELETE`.
    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            body: None,
        }
    }
}

/// Lightweight HTTP client for the question answering endpoints.
///
/// Every call resolves to an [`ApiResult`]; transport failures, error statuses and malformed
/// bodies all come back as [`ApiError`] values rather than panics.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
}

impl ApiClient {
    /// Construct a client rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("ragdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = normalize_base_url(base_url).map_err(ApiError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            timeout_secs = timeout.as_secs(),
            "Initialized API client"
        );

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Base URL every endpoint path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and decode the response according to its content type.
    ///
    /// JSON bodies are decoded into `T`; any other body is offered to `T` as a JSON string.
    pub async fn request<T>(&self, endpoint: &str, options: RequestOptions) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let method = options.method.clone();
        let mut builder = self.builder(options.method, endpoint).timeout(self.timeout);
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|error| {
            tracing::warn!(%method, endpoint, %error, "Request failed before a response arrived");
            ApiError::from(error)
        })?;
        tracing::debug!(%method, endpoint, status = %response.status(), "Received response");
        read_response(response).await
    }

    /// Ask a question and wait for the complete answer.
    pub async fn query(
        &self,
        question: &str,
        include_sources: bool,
        enable_evaluation: bool,
    ) -> ApiResult<QueryResponse> {
        let body = QueryRequest {
            question: question.to_string(),
            include_sources,
            enable_evaluation,
        };
        self.request(QUERY_ENDPOINT, RequestOptions::post(serde_json::to_value(body)?)).await
    }

    /// Retrieve matching passages without generating an answer.
    pub async fn search_documents(&self, question: &str) -> ApiResult<SearchResults> {
        let body = serde_json::to_value(SearchRequest { question })?;
        self.request(SEARCH_ENDPOINT, RequestOptions::post(body)).await
    }

    /// Fetch statistics about the document collection.
    pub async fn get_collection_info(&self) -> ApiResult<CollectionInfo> {
        self.request(COLLECTION_INFO_ENDPOINT, RequestOptions::get()).await
    }

    /// Drop every indexed document.
    pub async fn delete_collection(&self) -> ApiResult<Value> {
        self.request(COLLECTION_ENDPOINT, RequestOptions::delete()).await
    }

    /// Basic liveness probe.
    pub async fn health_check(&self) -> ApiResult<HealthStatus> {
        self.request(HEALTH_ENDPOINT, RequestOptions::get()).await
    }

    /// Readiness probe covering the vector store.
    pub async fn readiness_check(&self) -> ApiResult<ReadinessStatus> {
        self.request(READINESS_ENDPOINT, RequestOptions::get()).await
    }

    pub(crate) fn builder(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format_endpoint(&self.base_url, endpoint))
    }
}

/// Decode a response, turning non-success statuses into [`ApiError::Status`].
pub(crate) async fn read_response<T>(response: Response) -> ApiResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let is_json = is_json_response(&response);
    let text = response.text().await?;

    if !status.is_success() {
        let message = if is_json {
            extract_error_message(&text).unwrap_or_else(|| status_fallback(status))
        } else {
            status_fallback(status)
        };
        tracing::warn!(status = %status, message = %message, "API returned an error status");
        return Err(ApiError::Status { status, message });
    }

    let value = if is_json {
        serde_json::from_str::<Value>(&text)?
    } else {
        Value::String(text)
    };
    Ok(serde_json::from_value(value)?)
}

fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// First non-empty of `error`, `message`, `detail` in a JSON error body.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| match object.get(*key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.is_empty() => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        })
}

/// `HTTP <status>: <reason>` message used when the body carries no usable error field.
pub(crate) fn status_fallback(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url.trim()).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string().trim_end_matches('/').to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{DELETE, GET, POST},
        MockServer,
    };
    use serde_json::json;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.base_url(), Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url("http://localhost:8000/api/v1/").expect("url"),
            "http://localhost:8000/api/v1"
        );
        assert_eq!(
            format_endpoint("http://localhost:8000/api/v1", "/query"),
            "http://localhost:8000/api/v1/query"
        );
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn error_fields_are_checked_in_order() {
        assert_eq!(
            extract_error_message(r#"{"message":"second","detail":"third"}"#).as_deref(),
            Some("second")
        );
        assert_eq!(
            extract_error_message(r#"{"detail":[{"msg":"field required"}]}"#).as_deref(),
            Some(r#"[{"msg":"field required"}]"#)
        );
        assert_eq!(
            extract_error_message(r#"{"error":"","detail":"third"}"#).as_deref(),
            Some("third")
        );
        assert!(extract_error_message(r#"{"status":"bad"}"#).is_none());
        assert!(extract_error_message("plain text").is_none());
    }

    #[tokio::test]
    async fn query_posts_expected_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/query").json_body(json!({
                    "question": "What is X?",
                    "include_sources": true,
                    "enable_evaluation": false
                }));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "answer": "Y",
                        "sources": [
                            { "content": "s1", "score": 0.9 },
                            { "content": "s2", "score": 0.7 }
                        ]
                    }));
            })
            .await;

        let response = client_for(&server)
            .query("What is X?", true, false)
            .await
            .expect("query");

        mock.assert_async().await;
        assert_eq!(response.answer, "Y");
        assert_eq!(response.sources.map(|s| s.len()), Some(2));
        assert!(response.evaluation.is_none());
    }

    #[tokio::test]
    async fn error_field_becomes_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/documents/info");
                then.status(404)
                    .header("content-type", "application/json")
                    .json_body(json!({ "error": "X" }));
            })
            .await;

        let error = client_for(&server)
            .get_collection_info()
            .await
            .expect_err("should fail");
        assert_eq!(error.to_string(), "X");
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn missing_error_field_falls_back_to_status_line() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/documents/collection");
                then.status(500)
                    .header("content-type", "text/html")
                    .body("<h1>boom</h1>");
            })
            .await;

        let error = client_for(&server)
            .delete_collection()
            .await
            .expect_err("should fail");
        assert_eq!(error.to_string(), "HTTP 500: Internal Server Error");
    }

    #[tokio::test]
    async fn json_body_without_known_fields_falls_back_too() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(503)
                    .header("content-type", "application/json")
                    .json_body(json!({ "status": "down" }));
            })
            .await;

        let error = client_for(&server)
            .health_check()
            .await
            .expect_err("should fail");
        assert_eq!(error.to_string(), "HTTP 503: Service Unavailable");
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health/ready");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("{not json");
            })
            .await;

        let error = client_for(&server)
            .readiness_check()
            .await
            .expect_err("should fail");
        assert!(matches!(error, ApiError::Parse(_)));
    }

    #[tokio::test]
    async fn text_bodies_are_delivered_as_strings() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200)
                    .header("content-type", "text/plain")
                    .body("ok");
            })
            .await;

        let value: Value = client_for(&server)
            .request("health", RequestOptions::get())
            .await
            .expect("text body");
        assert_eq!(value, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let client =
            ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).expect("client");
        let error = client.health_check().await.expect_err("should fail");
        assert!(matches!(error, ApiError::Network(_)));
        assert!(error.to_string().starts_with("Network error"));
    }

    #[tokio::test]
    async fn search_sends_question_only() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/search")
                    .json_body(json!({ "question": "rust" }));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "results": [{ "page_content": "Rust book", "score": 0.5 }]
                    }));
            })
            .await;

        let results = client_for(&server)
            .search_documents("rust")
            .await
            .expect("search");
        mock.assert_async().await;
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.results[0].content, "Rust book");
    }
}
