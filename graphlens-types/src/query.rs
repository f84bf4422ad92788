//! Search request body and the structured answer it produces.

use serde::{Deserialize, Serialize};

use crate::graph::{DocumentRecord, NodeRecord, TermRecord, WebPageRecord, upsert_by_id};
use crate::id::{ElementId, LibId, SubjectId};

/// Where the backend looks for matches. Order expresses priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Generated question nodes.
    Question,
    /// Document and webpage pages.
    Page,
    /// Whole documents.
    Document,
    /// Whole webpages.
    Webpage,
    /// Plain knowledge nodes.
    Node,
}

impl SearchScope {
    /// Every scope, in the backend's default priority order.
    pub const ALL: [SearchScope; 5] = [
        SearchScope::Question,
        SearchScope::Page,
        SearchScope::Document,
        SearchScope::Webpage,
        SearchScope::Node,
    ];
}

/// Retrieval strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Keyword index only.
    Fulltext,
    /// Embedding similarity only.
    #[default]
    Vector,
    /// Both, fused.
    Hybrid,
}

/// How matched passages are summarized into an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    /// Stuff every passage into one prompt.
    #[default]
    Stuff,
    /// Refine the answer passage by passage.
    Refine,
    /// Summarize passages independently, then combine.
    MapReduce,
}

/// Whether the backend answers in one response or as an NDJSON stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMethod {
    /// One enveloped JSON response.
    #[default]
    Sync,
    /// Newline-delimited JSON records.
    Stream,
}

/// Body of `POST /api/graph/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// The user's question.
    pub text: String,
    /// Recent user messages, oldest first, ending with `text`.
    #[serde(default)]
    pub messages: Vec<String>,
    /// Library to search.
    pub lib_id: LibId,
    /// Subject to search, or the whole library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    /// Scopes in priority order.
    pub search_scopes: Vec<SearchScope>,
    /// Retrieval strategy.
    pub search_type: SearchType,
    /// How many recent messages the backend should consider.
    pub message_count: u32,
    /// Whether to summarize matches into an answer.
    pub is_summary: bool,
    /// Summarization strategy.
    pub summary_type: SummaryType,
    /// Only match node titles.
    pub only_title: bool,
    /// Sync or streamed response.
    pub return_method: ReturnMethod,
    /// LLM used for summarization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_name: Option<String>,
    /// Result window size.
    pub limit: u32,
    /// Result window start.
    pub offset: u32,
    /// Search from a prompt node instead of free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_element_id: Option<ElementId>,
    /// Search around a related node instead of free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_node_element_id: Option<ElementId>,
}

/// Structured answer to a search.
///
/// A streamed search delivers this in fragments; [`QueryResult::merge`]
/// folds each fragment into the running total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Answer text. Streamed fragments carry consecutive pieces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Best matching node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_node: Option<NodeRecord>,
    /// Entities of the main node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<TermRecord>,
    /// Keywords of the main node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<TermRecord>,
    /// Tags of the main node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TermRecord>,
    /// Follow-up prompt nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompts: Vec<NodeRecord>,
    /// Matched webpage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webpage: Option<WebPageRecord>,
    /// Matched document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRecord>,
    /// Neighbours of the main node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_nodes: Vec<NodeRecord>,
}

impl QueryResult {
    /// Fold a streamed fragment into this result.
    ///
    /// Text is appended, single-valued fields are replaced when the fragment
    /// carries them, and list fields are upserted by element id.
    pub fn merge(&mut self, fragment: QueryResult) {
        if let Some(text) = fragment.text {
            self.text.get_or_insert_with(String::new).push_str(&text);
        }
        if fragment.main_node.is_some() {
            self.main_node = fragment.main_node;
        }
        for term in fragment.entities {
            upsert_by_id(&mut self.entities, term);
        }
        for term in fragment.keywords {
            upsert_by_id(&mut self.keywords, term);
        }
        for term in fragment.tags {
            upsert_by_id(&mut self.tags, term);
        }
        for node in fragment.prompts {
            upsert_by_id(&mut self.prompts, node);
        }
        if fragment.webpage.is_some() {
            self.webpage = fragment.webpage;
        }
        if fragment.document.is_some() {
            self.document = fragment.document;
        }
        for node in fragment.related_nodes {
            upsert_by_id(&mut self.related_nodes, node);
        }
    }

    /// Whether nothing has been accumulated yet.
    pub fn is_empty(&self) -> bool {
        *self == QueryResult::default()
    }
}
