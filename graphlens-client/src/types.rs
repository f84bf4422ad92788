//! Request and response bodies of the CRUD endpoints.

use graphlens_types::{ElementId, LibId, NodeRecord, RelationshipRecord, SubjectId};
use serde::{Deserialize, Serialize};

/// Body for creating or editing a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDraft {
    /// Owning library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_id: Option<LibId>,
    /// Owning subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    /// Node the new node hangs under; the backend links the two.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_element_id: Option<ElementId>,
    /// Node being edited; `None` when creating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<ElementId>,
    /// Node text.
    pub content: String,
    /// Model used to embed the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Chunk size for embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_each_chunk: Option<u32>,
}

/// Body for creating or editing a relationship.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDraft {
    /// Owning library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_id: Option<LibId>,
    /// Owning subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    /// Relationship being edited; `None` when creating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<ElementId>,
    /// Start node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_element_id: Option<ElementId>,
    /// End node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_element_id: Option<ElementId>,
    /// Relationship label.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    /// Relationship text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Model used to embed the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Chunk size for embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_each_chunk: Option<u32>,
}

/// Result of adding a node: the node and the link to its parent, if any.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeCreated {
    /// The new node.
    pub node: NodeRecord,
    /// Link from the parent node.
    #[serde(default)]
    pub relationship: Option<RelationshipRecord>,
}

/// Nodes the backend generated around an element, with the links it drew.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneratedNodes {
    /// New question or prompt nodes.
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Links from the source element to each new node.
    #[serde(default)]
    pub relationships: Vec<RelationshipRecord>,
}

/// Parameters of the generate family of endpoints: graph generation,
/// answers, questions, prompts, and node/document/webpage analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Target library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_id: Option<LibId>,
    /// Target subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    /// Target node, document or webpage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<ElementId>,
    /// Depth limit for graph generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    /// LLM that does the generating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_name: Option<String>,
    /// Model used to embed generated content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Chunk size for embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_each_chunk: Option<u32>,
}

impl GenerateRequest {
    /// Parameters targeting one element of a library.
    #[must_use]
    pub fn for_element(lib_id: LibId, subject_id: SubjectId, element_id: ElementId) -> Self {
        Self {
            lib_id: Some(lib_id),
            subject_id: Some(subject_id),
            element_id: Some(element_id),
            ..Default::default()
        }
    }

    /// Set the LLM.
    #[must_use]
    pub fn llm(mut self, name: impl Into<String>) -> Self {
        self.llm_name = Some(name.into());
        self
    }
}

/// Parameters of a whole-library analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Library to analyze.
    pub lib_id: LibId,
    /// Subjects to restrict the analysis to; empty means all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_ids: Vec<SubjectId>,
    /// LLM that does the analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_name: Option<String>,
    /// Model used to embed extracted content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Chunk size for embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_each_chunk: Option<u32>,
}

/// Body for attaching a webpage to a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPageDraft {
    /// Owning library.
    pub lib_id: LibId,
    /// Owning subject.
    pub subject_id: SubjectId,
    /// Node the webpage is attached to.
    pub element_id: ElementId,
    /// Page address.
    pub url: String,
}

/// Which term list of a node an unlink targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// Entities.
    Entity,
    /// Keywords.
    Keyword,
    /// Tags.
    Tag,
}

impl TermKind {
    pub(crate) fn path_segment(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Keyword => "keyword",
            Self::Tag => "tag",
        }
    }
}
