#![deny(missing_docs)]
//! HTTP client for the graphlens knowledge-graph backend.
//!
//! [`KnowledgeClient`] implements [`QueryBackend`](graphlens_types::QueryBackend)
//! for the session orchestrator and exposes the backend's CRUD endpoints as
//! thin async methods. Every request carries the bearer token (when set) and
//! an `accept-language` header; non-streaming responses are unwrapped from
//! the backend's `{code, msg, data}` envelope.
//!
//! Streaming searches bypass the envelope. They are sent with
//! `Accept: application/x-ndjson` and `X-Streaming-Response: true`, and the
//! body is returned as a raw byte stream for `graphlens-stream` to decode.

mod client;
mod envelope;
mod error;
mod graph;
mod knowledge;
mod search;
pub mod types;

pub use client::KnowledgeClient;
pub use search::{NDJSON_CONTENT_TYPE, STREAMING_RESPONSE_HEADER};
pub use types::{
    AnalyzeRequest, GenerateRequest, GeneratedNodes, NodeCreated, NodeDraft, RelationshipDraft,
    TermKind, WebPageDraft,
};
