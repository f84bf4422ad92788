//! Streaming and one-shot search, and job cancellation.
//!
//! A streaming search answers with `application/x-ndjson`:
//! ```text
//! {"text":"Ownership is","mainNode":{"elementId":"4:9f:12","title":"Ownership"}}
//! {"text":" a set of rules"}
//! {"end":true}
//! ```
//! The body is handed back unparsed as a [`ByteStream`]; decoding belongs to
//! `graphlens-stream`.

use std::future::Future;

use futures::{Stream, StreamExt};
use graphlens_stream::{StreamRecord, record_stream};
use graphlens_types::{
    ByteStream, GraphQuery, GraphRecord, LibId, QueryBackend, QueryResult, ReturnMethod,
    SearchRequest, TransportError,
};
use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::de::IgnoredAny;

use crate::client::KnowledgeClient;
use crate::error::{map_http_status, map_reqwest_error};

/// Search endpoint, streaming and sync.
const SEARCH_PATH: &str = "/api/graph/search";

/// Media type of a streamed search body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Header marking a request whose response must not be treated as an envelope.
pub const STREAMING_RESPONSE_HEADER: &str = "x-streaming-response";

impl KnowledgeClient {
    /// Start a streaming search and return the raw body.
    ///
    /// The request is always sent with `returnMethod: "stream"`. A
    /// non-success status or an empty body fails here, before any record is
    /// read. The stream is never timed out.
    pub async fn open_search(&self, request: SearchRequest) -> Result<ByteStream, TransportError> {
        let request = SearchRequest {
            return_method: ReturnMethod::Stream,
            ..request
        };

        tracing::debug!(
            lib_id = %request.lib_id,
            search_type = ?request.search_type,
            "opening streaming search"
        );

        let response = self
            .request(Method::POST, SEARCH_PATH)
            .header(ACCEPT, NDJSON_CONTENT_TYPE)
            .header(STREAMING_RESPONSE_HEADER, "true")
            .json(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, None))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| map_reqwest_error(e, None))?;
            return Err(map_http_status(status, &body));
        }
        if response.content_length() == Some(0) {
            return Err(TransportError::MissingBody);
        }

        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| map_reqwest_error(e, None))),
        );
        Ok(body)
    }

    /// Start a streaming search and decode its body into records.
    ///
    /// The record stream stops after the end sentinel or a transport error.
    pub async fn search_records(
        &self,
        request: SearchRequest,
    ) -> Result<impl Stream<Item = Result<StreamRecord, TransportError>> + Send + 'static, TransportError>
    {
        let body = self.open_search(request).await?;
        Ok(record_stream(body))
    }

    /// Run a search and wait for the whole answer.
    ///
    /// The request is always sent with `returnMethod: "sync"`.
    pub async fn search_once(&self, request: SearchRequest) -> Result<QueryResult, TransportError> {
        let request = SearchRequest {
            return_method: ReturnMethod::Sync,
            ..request
        };
        tracing::debug!(lib_id = %request.lib_id, "sending sync search");
        self.send(self.request(Method::POST, SEARCH_PATH).json(&request))
            .await
    }

    /// Ask the backend to cancel the running job of a library.
    ///
    /// An absent or zero id is a no-op: no request is sent and `Ok(false)`
    /// is returned. `Ok(true)` means the backend accepted the cancellation.
    pub async fn cancel_generation(&self, lib_id: Option<LibId>) -> Result<bool, TransportError> {
        let Some(lib_id) = lib_id.filter(|id| id.is_set()) else {
            tracing::debug!("cancel skipped: no library id");
            return Ok(false);
        };
        tracing::debug!(%lib_id, "requesting job cancellation");
        let _: IgnoredAny = self
            .send(self.request(Method::POST, &format!("/api/graph/cancel/{lib_id}")))
            .await?;
        Ok(true)
    }
}

impl QueryBackend for KnowledgeClient {
    fn search_stream(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send {
        self.open_search(request)
    }

    fn search(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<QueryResult, TransportError>> + Send {
        self.search_once(request)
    }

    fn cancel(&self, lib_id: LibId) -> impl Future<Output = Result<(), TransportError>> + Send {
        async move {
            self.cancel_generation(Some(lib_id)).await?;
            Ok(())
        }
    }

    fn query_graph(
        &self,
        lib_id: LibId,
        query: GraphQuery,
    ) -> impl Future<Output = Result<GraphRecord, TransportError>> + Send {
        async move { self.graph(lib_id, &query).await }
    }
}
