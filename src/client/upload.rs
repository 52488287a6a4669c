//! Multipart document upload with progress reporting and cancellation.

use crate::client::http::{ApiClient, UPLOAD_ENDPOINT, read_response};
use crate::client::types::{ApiError, ApiResult, UploadResponse};
use async_stream::stream;
use bytes::Bytes;
use reqwest::{
    Body,
    multipart::{Form, Part},
};
use std::path::Path;
use tokio::sync::{mpsc, watch};

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Document loaded in memory and ready to be sent to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the multipart part.
    pub mime_type: String,
    /// Raw contents.
    pub bytes: Bytes,
}

impl UploadFile {
    /// Build an upload from in-memory contents, deriving the MIME type from the extension.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self::new(file_name, bytes))
    }

    /// Size of the document in bytes.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the document has no contents.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-case extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Trigger side of an upload cancellation pair.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    sender: watch::Sender<bool>,
}

/// Receiving side of an upload cancellation pair, passed to the upload call.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

/// Create a linked abort handle and signal.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (sender, receiver) = watch::channel(false);
    (AbortHandle { sender }, AbortSignal { receiver })
}

impl AbortHandle {
    /// Request cancellation of the linked upload.
    pub fn abort(&self) {
        self.sender.send_replace(true);
    }
}

impl AbortSignal {
    /// Resolve once the linked handle has aborted. Never resolves if the handle is dropped
    /// without aborting.
    async fn aborted(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl ApiClient {
    /// Upload a document, reporting progress percentages through `on_progress`.
    pub async fn upload_document<F>(
        &self,
        file: &UploadFile,
        on_progress: F,
    ) -> ApiResult<UploadResponse>
    where
        F: FnMut(f64),
    {
        let (_handle, signal) = abort_pair();
        self.upload_document_with_abort(file, on_progress, signal).await
    }

    /// Upload a document that can be cancelled through `signal`.
    ///
    /// The body is streamed in chunks; `on_progress` runs on the calling task each time the
    /// transport pulls a chunk, with `loaded / total * 100`. Nothing is reported for an empty
    /// file.
    pub async fn upload_document_with_abort<F>(
        &self,
        file: &UploadFile,
        mut on_progress: F,
        mut signal: AbortSignal,
    ) -> ApiResult<UploadResponse>
    where
        F: FnMut(f64),
    {
        let total = file.len();
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<f64>();
        let contents = file.bytes.clone();
        let chunks = stream! {
            let mut loaded: u64 = 0;
            for start in (0..contents.len()).step_by(UPLOAD_CHUNK_SIZE) {
                let end = (start + UPLOAD_CHUNK_SIZE).min(contents.len());
                loaded += (end - start) as u64;
                if total > 0 {
                    let _ = progress_tx.send(loaded as f64 / total as f64 * 100.0);
                }
                yield Ok::<Bytes, std::io::Error>(contents.slice(start..end));
            }
        };

        let part = Part::stream_with_length(Body::wrap_stream(chunks), total)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("file", part);

        tracing::info!(file = %file.file_name, bytes = total, "Uploading document");
        let send = self
            .builder(reqwest::Method::POST, UPLOAD_ENDPOINT)
            .timeout(self.timeout)
            .multipart(form)
            .send();
        tokio::pin!(send);

        let response = loop {
            tokio::select! {
                biased;
                Some(percent) = progress_rx.recv() => on_progress(percent),
                _ = signal.aborted() => {
                    tracing::info!(file = %file.file_name, "Upload aborted");
                    return Err(ApiError::Aborted);
                }
                result = &mut send => break result,
            }
        };
        while let Ok(percent) = progress_rx.try_recv() {
            on_progress(percent);
        }

        let response = response.map_err(|error| {
            tracing::warn!(
                file = %file.file_name,
                %error,
                "Upload failed before a response arrived"
            );
            ApiError::from(error)
        })?;
        read_response(response).await
    }
}
