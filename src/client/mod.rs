//! HTTP client for the question answering API.

pub mod http;
/// Streaming answers read chunk by chunk.
pub mod stream;
pub mod types;
pub mod upload;

pub use http::{ApiClient, RequestOptions};
pub use types::{
    ApiError, ApiResult, CollectionInfo, Envelope, HealthStatus, QueryRequest, QueryResponse,
    ReadinessCollection, ReadinessStatus, SearchResults, Source, UploadResponse,
};
pub use upload::{AbortHandle, AbortSignal, UploadFile, abort_pair};
