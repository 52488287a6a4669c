//! Wire types and error definitions shared by the API client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Outcome of every API client call: exactly one of a value or an error.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned while talking to the question answering API.
///
/// The `Display` text of each variant is the human-readable message surfaced to users.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
    /// Transport failed before a complete response was received.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Server answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status returned by the server.
        status: StatusCode,
        /// Message extracted from the error body, or the `HTTP <status>` fallback.
        message: String,
    },
    /// Response body could not be decoded into the expected shape.
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
    /// Upload was cancelled through its abort signal.
    #[error("Upload cancelled")]
    Aborted,
}

impl ApiError {
    /// HTTP status attached to the failure, when the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Serializable `{data, error}` pair mirroring an [`ApiResult`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Envelope<T> {
    /// Successful payload, present iff `error` is absent.
    pub data: Option<T>,
    /// Error message, present iff `data` is absent.
    pub error: Option<String>,
}

impl<T> From<ApiResult<T>> for Envelope<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                data: None,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Body sent to the `/query` and `/query/stream` endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueryRequest {
    /// User question.
    pub question: String,
    /// Ask the server to return the retrieved sources.
    pub include_sources: bool,
    /// Ask the server to score the answer.
    pub enable_evaluation: bool,
}

impl QueryRequest {
    /// Request shape used by the streaming endpoint, which never delivers sources or scores.
    pub fn streaming(question: &str) -> Self {
        Self {
            question: question.to_string(),
            include_sources: false,
            enable_evaluation: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub(crate) question: &'a str,
}

/// Response of the upload endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UploadResponse {
    /// Name the server stored the document under.
    pub filename: String,
    /// Any further counters or messages reported by the server.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Statistics about the document collection.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CollectionInfo {
    /// Name of the vector collection.
    pub collection_name: String,
    /// Number of indexed documents (points).
    pub total_documents: u64,
    /// Collection status reported by the vector store.
    pub status: String,
}

/// Retrieved passage backing an answer or returned by a search.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Source {
    /// Passage text.
    #[serde(default, alias = "text", alias = "page_content")]
    pub content: String,
    /// Similarity score, when the server reports one.
    #[serde(default)]
    pub score: Option<f64>,
    /// Free-form metadata such as the originating file.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Source {
    /// Originating document name, when the metadata carries one.
    pub fn origin(&self) -> Option<&str> {
        ["source", "filename", "file_name"]
            .iter()
            .find_map(|key| self.metadata.get(*key).and_then(Value::as_str))
    }
}

/// Answer returned by the non-streaming query endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QueryResponse {
    /// Generated answer text.
    pub answer: String,
    /// Supporting passages, when requested.
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    /// Named evaluation metrics, when requested.
    #[serde(default)]
    pub evaluation: Option<Map<String, Value>>,
}

/// Hits returned by the search-only endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SearchResults {
    /// Matching passages ordered by relevance.
    #[serde(default, alias = "sources", alias = "documents")]
    pub results: Vec<Source>,
}

/// Liveness report of the API.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HealthStatus {
    /// Overall status string.
    pub status: String,
    /// Server version.
    #[serde(default)]
    pub version: Option<String>,
    /// Server-side timestamp of the report.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Readiness report of the API and its vector store.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReadinessStatus {
    /// `ready` when the service can answer questions.
    pub status: String,
    /// Whether the vector store is reachable.
    #[serde(default)]
    pub qdrant_connected: bool,
    /// Collection summary, when available.
    #[serde(default)]
    pub collection_info: Option<ReadinessCollection>,
    /// Server-side timestamp of the report.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ReadinessStatus {
    /// Ready to serve with its vector store connected.
    pub fn is_fully_ready(&self) -> bool {
        self.status == "ready" && self.qdrant_connected
    }
}

/// Collection summary embedded in a readiness report.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReadinessCollection {
    /// Collection name.
    pub name: String,
    /// Number of stored points.
    #[serde(default)]
    pub points_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_holds_exactly_one_side() {
        let ok: Envelope<u32> = Ok(7).into();
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());

        let err: Envelope<u32> = Err(ApiError::Aborted).into();
        assert!(err.data.is_none());
        assert_eq!(err.error.as_deref(), Some("Upload cancelled"));
    }

    #[test]
    fn status_error_displays_message_only() {
        let error = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            message: "Question is required".into(),
        };
        assert_eq!(error.to_string(), "Question is required");
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn source_accepts_text_alias_and_reports_origin() {
        let source: Source = serde_json::from_value(json!({
            "text": "Rust is a language",
            "metadata": { "filename": "rust.pdf", "page": 3 }
        }))
        .expect("source");
        assert_eq!(source.content, "Rust is a language");
        assert_eq!(source.origin(), Some("rust.pdf"));
        assert!(source.score.is_none());
    }

    #[test]
    fn readiness_requires_ready_and_connected() {
        let ready: ReadinessStatus = serde_json::from_value(json!({
            "status": "ready",
            "qdrant_connected": true
        }))
        .expect("readiness");
        assert!(ready.is_fully_ready());

        let disconnected: ReadinessStatus =
            serde_json::from_value(json!({ "status": "ready" })).expect("readiness");
        assert!(!disconnected.is_fully_ready());
    }

    #[test]
    fn upload_response_keeps_extra_fields() {
        let response: UploadResponse = serde_json::from_value(json!({
            "filename": "notes.md",
            "chunks_created": 12
        }))
        .expect("upload response");
        assert_eq!(response.filename, "notes.md");
        assert_eq!(response.details.get("chunks_created"), Some(&json!(12)));
    }
}
