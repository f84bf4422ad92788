#![deny(missing_docs)]
//! # graphlens-types — shared vocabulary for the graphlens client
//!
//! Records exchanged with the knowledge-graph backend, the error taxonomy
//! used across the workspace, and the [`QueryBackend`] trait the session
//! orchestrator drives.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`id`] | Typed identifiers ([`ElementId`], [`LibId`], [`SubjectId`]) |
//! | [`graph`] | Nodes, relationships, terms, documents, webpages |
//! | [`query`] | [`QueryResult`] and the search request body |
//! | [`knowledge`] | Knowledge libraries, subjects, the model catalog |
//! | [`error`] | [`TransportError`], [`StreamFailure`], [`SessionError`] |
//! | [`backend`] | [`QueryBackend`] and the [`ByteStream`] alias |

pub mod backend;
pub mod error;
pub mod graph;
pub mod id;
pub mod knowledge;
pub mod query;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use backend::{ByteStream, QueryBackend};
pub use error::{SessionError, StreamFailure, TransportError};
pub use graph::{
    DocumentPageRecord, DocumentRecord, GraphElement, GraphOverview, GraphQuery, GraphRecord,
    NodeRecord, OverviewRecord, RelationshipRecord, TermRecord, WebPageRecord, upsert_by_id,
};
pub use id::{ElementId, LibId, SubjectId};
pub use knowledge::{KnowledgeLib, KnowledgeSubject, LibFilter, LlmCatalog};
pub use query::{QueryResult, ReturnMethod, SearchRequest, SearchScope, SearchType, SummaryType};
