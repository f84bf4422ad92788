//! ScriptedBackend — a QueryBackend that replays queued responses.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use futures::StreamExt;

use crate::backend::{ByteStream, QueryBackend};
use crate::error::TransportError;
use crate::graph::{GraphQuery, GraphRecord};
use crate::id::LibId;
use crate::query::{QueryResult, SearchRequest};

type Chunk = Result<Bytes, TransportError>;

enum ScriptedStream {
    Body { chunks: Vec<Chunk>, hold_open: bool },
    Refused(TransportError),
}

#[derive(Default)]
struct Script {
    streams: VecDeque<ScriptedStream>,
    searches: VecDeque<Result<QueryResult, TransportError>>,
    cancels: VecDeque<Result<(), TransportError>>,
    graph: GraphRecord,
    search_requests: Vec<SearchRequest>,
    cancel_calls: Vec<LibId>,
}

/// Backend that answers from queues filled by the test.
///
/// Unscripted streams and searches fail with [`TransportError::MissingBody`];
/// unscripted cancels succeed.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a stream body delivered as the given chunks, then closed.
    pub fn push_stream<I, C>(&self, chunks: I) -> &Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        let chunks = chunks.into_iter().map(|c| Ok(c.into())).collect();
        self.script().streams.push_back(ScriptedStream::Body {
            chunks,
            hold_open: false,
        });
        self
    }

    /// Queue a stream body that stays open after its chunks, like a job the
    /// server is still working on.
    pub fn push_open_stream<I, C>(&self, chunks: I) -> &Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        let chunks = chunks.into_iter().map(|c| Ok(c.into())).collect();
        self.script().streams.push_back(ScriptedStream::Body {
            chunks,
            hold_open: true,
        });
        self
    }

    /// Queue a stream body with explicit per-chunk results.
    pub fn push_stream_results(&self, chunks: Vec<Chunk>) -> &Self {
        self.script().streams.push_back(ScriptedStream::Body {
            chunks,
            hold_open: false,
        });
        self
    }

    /// Queue a stream the server refuses before any body is sent.
    pub fn push_stream_error(&self, err: TransportError) -> &Self {
        self.script().streams.push_back(ScriptedStream::Refused(err));
        self
    }

    /// Queue the answer to the next non-streaming search.
    pub fn push_search(&self, result: Result<QueryResult, TransportError>) -> &Self {
        self.script().searches.push_back(result);
        self
    }

    /// Queue the answer to the next cancel request.
    pub fn push_cancel(&self, result: Result<(), TransportError>) -> &Self {
        self.script().cancels.push_back(result);
        self
    }

    /// Set the graph returned by every graph query.
    pub fn set_graph(&self, graph: GraphRecord) -> &Self {
        self.script().graph = graph;
        self
    }

    /// Every search request received so far, streaming or not.
    pub fn search_requests(&self) -> Vec<SearchRequest> {
        self.script().search_requests.clone()
    }

    /// Library ids of every cancel request received so far.
    pub fn cancel_calls(&self) -> Vec<LibId> {
        self.script().cancel_calls.clone()
    }
}

impl QueryBackend for ScriptedBackend {
    fn search_stream(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send {
        let next = {
            let mut script = self.script();
            script.search_requests.push(request);
            script.streams.pop_front()
        };
        async move {
            match next {
                Some(ScriptedStream::Body { chunks, hold_open }) => {
                    let body = futures::stream::iter(chunks);
                    let stream: ByteStream = if hold_open {
                        Box::pin(body.chain(futures::stream::pending()))
                    } else {
                        Box::pin(body)
                    };
                    Ok(stream)
                }
                Some(ScriptedStream::Refused(err)) => Err(err),
                None => Err(TransportError::MissingBody),
            }
        }
    }

    fn search(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<QueryResult, TransportError>> + Send {
        let next = {
            let mut script = self.script();
            script.search_requests.push(request);
            script.searches.pop_front()
        };
        async move { next.unwrap_or(Err(TransportError::MissingBody)) }
    }

    fn cancel(&self, lib_id: LibId) -> impl Future<Output = Result<(), TransportError>> + Send {
        let next = {
            let mut script = self.script();
            script.cancel_calls.push(lib_id);
            script.cancels.pop_front()
        };
        async move { next.unwrap_or(Ok(())) }
    }

    fn query_graph(
        &self,
        _lib_id: LibId,
        _query: GraphQuery,
    ) -> impl Future<Output = Result<GraphRecord, TransportError>> + Send {
        let graph = self.script().graph.clone();
        async move { Ok(graph) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unscripted_stream_is_refused() {
        let backend = ScriptedBackend::new();
        let request: SearchRequest = serde_json::from_value(serde_json::json!({
            "text": "q", "libId": 1, "searchScopes": [], "searchType": "vector",
            "messageCount": 1, "isSummary": false, "summaryType": "stuff",
            "onlyTitle": false, "returnMethod": "stream", "limit": 5, "offset": 0
        }))
        .unwrap();
        let result = backend.search_stream(request).await;
        assert!(matches!(result, Err(TransportError::MissingBody)));
        assert_eq!(backend.search_requests().len(), 1);
    }

    #[tokio::test]
    async fn scripted_chunks_replay_in_order() {
        let backend = ScriptedBackend::new();
        backend.push_stream(["a", "b"]);
        let request: SearchRequest = serde_json::from_value(serde_json::json!({
            "text": "q", "libId": 1, "searchScopes": [], "searchType": "vector",
            "messageCount": 1, "isSummary": false, "summaryType": "stuff",
            "onlyTitle": false, "returnMethod": "stream", "limit": 5, "offset": 0
        }))
        .unwrap();
        let stream = backend.search_stream(request).await.unwrap();
        let chunks: Vec<Bytes> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec![Bytes::from("a"), Bytes::from("b")]);
    }

    #[tokio::test]
    async fn unscripted_cancel_succeeds_and_is_recorded() {
        let backend = ScriptedBackend::new();
        backend.cancel(LibId::new(4)).await.unwrap();
        assert_eq!(backend.cancel_calls(), vec![LibId::new(4)]);
    }
}
