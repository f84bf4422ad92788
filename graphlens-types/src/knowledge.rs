//! Knowledge libraries, their subjects, and the model catalog.

use serde::{Deserialize, Serialize};

use crate::id::{LibId, SubjectId};

/// A knowledge library: the unit a graph is generated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeLib {
    /// Server-assigned id; `None` before creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LibId>,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description.
    #[serde(default)]
    pub content: String,
    /// Generation status (`GENERATING`, `ANALYZING`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Last update timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl KnowledgeLib {
    /// Whether the backend is currently running a generate or analyze job.
    pub fn is_busy(&self) -> bool {
        matches!(self.status.as_deref(), Some("GENERATING") | Some("ANALYZING"))
    }
}

/// A subject inside a knowledge library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSubject {
    /// Server-assigned id; `None` before creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SubjectId>,
    /// Display name.
    pub name: String,
    /// Owning library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_lib_id: Option<LibId>,
    /// Creation timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Last update timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

/// Filter for listing knowledge libraries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibFilter {
    /// Title keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Status filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Time filter, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// LLM and embedding model names the backend can use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmCatalog {
    /// Chat/completion models.
    #[serde(default)]
    pub llms: Vec<String>,
    /// Embedding models.
    #[serde(default)]
    pub embeddings: Vec<String>,
}
