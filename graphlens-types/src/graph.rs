//! Graph records as the backend serializes them.
//!
//! Every record is keyed by its [`ElementId`]. Fields the backend may omit
//! (filtered projections, partial stream fragments) are optional, and
//! embedding vectors are never deserialized. Merging an update into an
//! existing record goes through [`GraphElement::absorb`]: present fields
//! overwrite, absent fields keep their previous value.

use serde::{Deserialize, Serialize};

use crate::id::{ElementId, LibId, SubjectId};

/// A record that lives in the graph under a unique element id.
pub trait GraphElement {
    /// The identifier this record is keyed by.
    fn element_id(&self) -> &ElementId;

    /// Merge a newer version of the same element into `self`.
    fn absorb(&mut self, update: Self);
}

/// Insert `item` into `list`, or absorb it into the entry with the same id.
///
/// Returns `true` when the item was new.
pub fn upsert_by_id<T: GraphElement>(list: &mut Vec<T>, item: T) -> bool {
    match list
        .iter_mut()
        .find(|existing| existing.element_id() == item.element_id())
    {
        Some(existing) => {
            existing.absorb(item);
            false
        }
        None => {
            list.push(item);
            true
        }
    }
}

fn overwrite<T>(slot: &mut Option<T>, update: Option<T>) {
    if update.is_some() {
        *slot = update;
    }
}

fn upsert_all<T: GraphElement>(list: &mut Vec<T>, updates: Vec<T>) {
    for item in updates {
        upsert_by_id(list, item);
    }
}

/// An entity, keyword, or tag attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermRecord {
    /// Element id of the term node.
    pub element_id: ElementId,
    /// The term text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl TermRecord {
    /// A term with the given id and text.
    pub fn new(element_id: impl Into<ElementId>, content: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            content: Some(content.into()),
        }
    }
}

impl GraphElement for TermRecord {
    fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    fn absorb(&mut self, update: Self) {
        overwrite(&mut self.content, update.content);
    }
}

/// One page (chunk) of an analyzed document or webpage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPageRecord {
    /// Element id of the page.
    pub element_id: ElementId,
    /// Source file or URL the page was cut from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Section title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Section subtitle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Row within the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    /// Page number within the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GraphElement for DocumentPageRecord {
    fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    fn absorb(&mut self, update: Self) {
        overwrite(&mut self.source, update.source);
        overwrite(&mut self.title, update.title);
        overwrite(&mut self.subtitle, update.subtitle);
        overwrite(&mut self.row, update.row);
        overwrite(&mut self.page, update.page);
        overwrite(&mut self.content, update.content);
    }
}

/// An uploaded document attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Element id of the document.
    pub element_id: ElementId,
    /// Stored file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Extracted title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extracted text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Upload timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    /// Pages produced by analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<DocumentPageRecord>,
}

impl GraphElement for DocumentRecord {
    fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    fn absorb(&mut self, update: Self) {
        overwrite(&mut self.name, update.name);
        overwrite(&mut self.title, update.title);
        overwrite(&mut self.content, update.content);
        overwrite(&mut self.saved_at, update.saved_at);
        upsert_all(&mut self.pages, update.pages);
    }
}

/// A web page attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPageRecord {
    /// Element id of the webpage.
    pub element_id: ElementId,
    /// Page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extracted text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Pages produced by analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<DocumentPageRecord>,
}

impl GraphElement for WebPageRecord {
    fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    fn absorb(&mut self, update: Self) {
        overwrite(&mut self.url, update.url);
        overwrite(&mut self.title, update.title);
        overwrite(&mut self.content, update.content);
        upsert_all(&mut self.pages, update.pages);
    }
}

/// A knowledge node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Element id of the node.
    pub element_id: ElementId,
    /// Internal numeric id, when the backend exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Graph labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Owning library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib_id: Option<LibId>,
    /// Owning subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    /// Short title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Node kind (`question`, `answer`, `prompt`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Extracted entities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<TermRecord>,
    /// Extracted keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<TermRecord>,
    /// Assigned tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TermRecord>,
    /// Attached documents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<DocumentRecord>,
    /// Attached webpages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webpages: Vec<WebPageRecord>,
    /// Creation timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl NodeRecord {
    /// A bare node carrying only its id and content.
    pub fn new(element_id: impl Into<ElementId>, content: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            id: None,
            labels: Vec::new(),
            lib_id: None,
            subject_id: None,
            title: None,
            content: Some(content.into()),
            node_type: None,
            entities: Vec::new(),
            keywords: Vec::new(),
            tags: Vec::new(),
            documents: Vec::new(),
            webpages: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl GraphElement for NodeRecord {
    fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    fn absorb(&mut self, update: Self) {
        overwrite(&mut self.id, update.id);
        if !update.labels.is_empty() {
            self.labels = update.labels;
        }
        overwrite(&mut self.lib_id, update.lib_id);
        overwrite(&mut self.subject_id, update.subject_id);
        overwrite(&mut self.title, update.title);
        overwrite(&mut self.content, update.content);
        overwrite(&mut self.node_type, update.node_type);
        upsert_all(&mut self.entities, update.entities);
        upsert_all(&mut self.keywords, update.keywords);
        upsert_all(&mut self.tags, update.tags);
        upsert_all(&mut self.documents, update.documents);
        upsert_all(&mut self.webpages, update.webpages);
        overwrite(&mut self.created_at, update.created_at);
        overwrite(&mut self.updated_at, update.updated_at);
    }
}

/// A directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRecord {
    /// Element id of the relationship.
    pub element_id: ElementId,
    /// Internal numeric id, when the backend exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Start node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_element_id: Option<ElementId>,
    /// End node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_element_id: Option<ElementId>,
    /// Relationship type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    /// Owning library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib_id: Option<LibId>,
    /// Owning subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    /// Description text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Creation timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl GraphElement for RelationshipRecord {
    fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    fn absorb(&mut self, update: Self) {
        overwrite(&mut self.id, update.id);
        overwrite(&mut self.source_element_id, update.source_element_id);
        overwrite(&mut self.target_element_id, update.target_element_id);
        overwrite(&mut self.rel_type, update.rel_type);
        overwrite(&mut self.lib_id, update.lib_id);
        overwrite(&mut self.subject_id, update.subject_id);
        overwrite(&mut self.content, update.content);
        overwrite(&mut self.created_at, update.created_at);
        overwrite(&mut self.updated_at, update.updated_at);
    }
}

/// Count of nodes or links of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewRecord {
    /// Node label or relationship type.
    #[serde(rename = "type")]
    pub record_type: String,
    /// How many elements carry it.
    pub count: u64,
}

/// Per-type counts for a library's graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphOverview {
    /// Node counts by label.
    #[serde(default)]
    pub nodes: Vec<OverviewRecord>,
    /// Relationship counts by type.
    #[serde(default)]
    pub links: Vec<OverviewRecord>,
}

/// A graph query response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    /// Matched nodes.
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Relationships between matched nodes.
    #[serde(default)]
    pub links: Vec<RelationshipRecord>,
    /// Optional per-type counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<GraphOverview>,
}

/// Filter for graph and overview queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQuery {
    /// Restrict to these subjects. Empty means all subjects of the library.
    #[serde(default)]
    pub subject_ids: Vec<SubjectId>,
    /// Node type filter.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Full-text filter on node content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Anchor the query at this parent node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_element_id: Option<ElementId>,
    /// Anchor the query at this child node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_element_id: Option<ElementId>,
    /// Relationship type filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_deserializes_camel_case_and_ignores_vectors() {
        let node: NodeRecord = serde_json::from_value(serde_json::json!({
            "elementId": "n1",
            "libId": 4,
            "type": "question",
            "content": "What is NDJSON?",
            "contentVector": [0.1, 0.2],
        }))
        .unwrap();
        assert_eq!(node.element_id.as_str(), "n1");
        assert_eq!(node.lib_id, Some(LibId::new(4)));
        assert_eq!(node.node_type.as_deref(), Some("question"));
    }

    #[test]
    fn absorb_keeps_fields_the_update_omits() {
        let mut node = NodeRecord::new("n1", "old");
        node.title = Some("Title".into());
        node.labels = vec!["Question".into()];

        let mut update = NodeRecord::new("n1", "new");
        update.content = Some("new".into());
        node.absorb(update);

        assert_eq!(node.content.as_deref(), Some("new"));
        assert_eq!(node.title.as_deref(), Some("Title"));
        assert_eq!(node.labels, vec!["Question".to_string()]);
    }

    #[test]
    fn upsert_by_id_never_duplicates() {
        let mut terms = vec![TermRecord::new("t1", "rust")];
        assert!(!upsert_by_id(&mut terms, TermRecord::new("t1", "Rust")));
        assert!(upsert_by_id(&mut terms, TermRecord::new("t2", "ndjson")));
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].content.as_deref(), Some("Rust"));
    }

    #[test]
    fn node_absorb_upserts_nested_terms() {
        let mut node = NodeRecord::new("n1", "c");
        node.keywords = vec![TermRecord::new("k1", "graph")];
        let mut update = NodeRecord::new("n1", "c");
        update.keywords = vec![TermRecord::new("k1", "Graph"), TermRecord::new("k2", "stream")];
        node.absorb(update);
        assert_eq!(node.keywords.len(), 2);
        assert_eq!(node.keywords[0].content.as_deref(), Some("Graph"));
    }

    #[test]
    fn relationship_type_uses_wire_name() {
        let rel: RelationshipRecord = serde_json::from_value(serde_json::json!({
            "elementId": "r1",
            "sourceElementId": "n1",
            "targetElementId": "n2",
            "type": "HAS_CHILD",
        }))
        .unwrap();
        assert_eq!(rel.rel_type.as_deref(), Some("HAS_CHILD"));
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "HAS_CHILD");
        assert!(json.get("content").is_none());
    }
}
