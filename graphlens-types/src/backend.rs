//! The backend seam the session orchestrator is written against.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::error::TransportError;
use crate::graph::{GraphQuery, GraphRecord};
use crate::id::LibId;
use crate::query::{QueryResult, SearchRequest};

/// Raw response body of a streaming search, chunked however the network
/// delivered it. Consume with `StreamExt::next()`.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Operations the session needs from the knowledge-graph backend.
///
/// Implemented over HTTP by `graphlens-client`; the `test-utils` feature
/// provides a scripted in-memory implementation.
///
/// # Example
///
/// ```ignore
/// use graphlens_types::*;
/// use std::future::Future;
///
/// struct Offline;
/// impl QueryBackend for Offline {
///     fn search_stream(&self, request: SearchRequest)
///         -> impl Future<Output = Result<ByteStream, TransportError>> + Send
///     {
///         async { Err(TransportError::MissingBody) }
///     }
///     // ...
/// }
/// ```
pub trait QueryBackend: Send + Sync {
    /// Start a streaming search and return its body once the server has
    /// accepted the request. Status and missing-body failures surface here,
    /// before any record is read.
    fn search_stream(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send;

    /// Run a search and wait for the complete result.
    fn search(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<QueryResult, TransportError>> + Send;

    /// Ask the server to cancel the long-running job of a library.
    fn cancel(&self, lib_id: LibId) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Fetch the graph of a library.
    fn query_graph(
        &self,
        lib_id: LibId,
        query: GraphQuery,
    ) -> impl Future<Output = Result<GraphRecord, TransportError>> + Send;
}
