//! Streaming answers read incrementally from the `/query/stream` endpoint.

use crate::client::http::{ApiClient, QUERY_STREAM_ENDPOINT, status_fallback};
use crate::client::types::{ApiError, ApiResult, QueryRequest};
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::{StreamExt, pin_mut};
use reqwest::{Method, Response};

impl ApiClient {
    /// Stream the answer to `question` as decoded text fragments.
    ///
    /// The sequence is lazy and finite: the request is only sent once it is polled, and it ends
    /// when the server closes the body. A non-success status yields a single error carrying the
    /// response body text.
    pub fn query_stream_chunks<'a>(
        &'a self,
        question: &'a str,
    ) -> impl Stream<Item = ApiResult<String>> + 'a {
        try_stream! {
            let response = self
                .builder(Method::POST, QUERY_STREAM_ENDPOINT)
                .json(&QueryRequest::streaming(question))
                .send()
                .await?;

            let response = ensure_stream_ok(response).await?;

            let mut decoder = Utf8Decoder::default();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let text = decoder.decode(&chunk?);
                if !text.is_empty() {
                    yield text;
                }
            }
            let tail = decoder.finish();
            if !tail.is_empty() {
                yield tail;
            }
        }
    }

    /// Stream the answer to `question`, invoking `on_chunk` per fragment and returning the full
    /// text once the server closes the stream.
    pub async fn query_stream<F>(&self, question: &str, mut on_chunk: F) -> ApiResult<String>
    where
        F: FnMut(&str),
    {
        let chunks = self.query_stream_chunks(question);
        pin_mut!(chunks);
        let mut answer = String::new();
        let mut fragments = 0usize;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.inspect_err(|error| {
                tracing::warn!(fragments, %error, "Streaming query interrupted");
            })?;
            on_chunk(&chunk);
            answer.push_str(&chunk);
            fragments += 1;
        }
        tracing::debug!(fragments, chars = answer.chars().count(), "Streaming query finished");
        Ok(answer)
    }
}

/// Reject a non-success stream response with its body text as the message.
async fn ensure_stream_ok(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status_fallback(status)
    } else {
        body
    };
    tracing::warn!(status = %status, "Streaming query rejected");
    Err(ApiError::Status { status, message })
}

/// Incremental UTF-8 decoder that carries incomplete multi-byte sequences between chunks.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of `pending + chunk` as possible; invalid bytes become U+FFFD.
    pub(crate) fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut output = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    output.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(error) => {
                    let (valid, after) = rest.split_at(error.valid_up_to());
                    output.push_str(&String::from_utf8_lossy(valid));
                    match error.error_len() {
                        Some(invalid) => {
                            output.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        output
    }

    /// Flush whatever is left once the stream has ended.
    pub(crate) fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}
