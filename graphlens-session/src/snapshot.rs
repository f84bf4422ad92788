//! The session's projection of the knowledge graph.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use graphlens_types::{
    DocumentRecord, ElementId, GraphElement, GraphRecord, NodeRecord, QueryResult,
    RelationshipRecord, WebPageRecord,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Payload keys holding nodes, single or as arrays.
const NODE_KEYS: [&str; 5] = ["nodes", "node", "mainNode", "relatedNodes", "prompts"];
/// Payload keys holding relationships.
const RELATIONSHIP_KEYS: [&str; 3] = ["links", "relationships", "relationship"];
/// Payload keys holding documents.
const DOCUMENT_KEYS: [&str; 2] = ["documents", "document"];
/// Payload keys holding webpages.
const WEBPAGE_KEYS: [&str; 2] = ["webpages", "webpage"];

/// How many elements a merge inserted and how many it updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Elements whose id was new.
    pub inserted: usize,
    /// Elements merged into an existing entry.
    pub updated: usize,
}

impl MergeStats {
    /// Total elements touched.
    #[must_use]
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }

    /// Whether the merge changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::ops::AddAssign for MergeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.updated += rhs.updated;
    }
}

/// Nodes, relationships, documents and webpages keyed by element id.
///
/// An element id appears at most once per kind. Merging a known id folds the
/// present attributes into the existing record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    nodes: BTreeMap<ElementId, NodeRecord>,
    relationships: BTreeMap<ElementId, RelationshipRecord>,
    documents: BTreeMap<ElementId, DocumentRecord>,
    webpages: BTreeMap<ElementId, WebPageRecord>,
}

impl GraphSnapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All nodes.
    pub fn nodes(&self) -> &BTreeMap<ElementId, NodeRecord> {
        &self.nodes
    }

    /// All relationships.
    pub fn relationships(&self) -> &BTreeMap<ElementId, RelationshipRecord> {
        &self.relationships
    }

    /// All documents.
    pub fn documents(&self) -> &BTreeMap<ElementId, DocumentRecord> {
        &self.documents
    }

    /// All webpages.
    pub fn webpages(&self) -> &BTreeMap<ElementId, WebPageRecord> {
        &self.webpages
    }

    /// Look up a node.
    pub fn node(&self, id: &ElementId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    /// Look up a relationship.
    pub fn relationship(&self, id: &ElementId) -> Option<&RelationshipRecord> {
        self.relationships.get(id)
    }

    /// Whether the snapshot holds no elements at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.relationships.is_empty()
            && self.documents.is_empty()
            && self.webpages.is_empty()
    }

    /// Drop every element.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.relationships.clear();
        self.documents.clear();
        self.webpages.clear();
    }

    /// Merge a payload describing graph changes.
    ///
    /// Recognized keys: `nodes`, `node`, `mainNode`, `relatedNodes`,
    /// `prompts`, `links`, `relationships`, `relationship`, `documents`,
    /// `document`, `webpages`, `webpage`. Each may hold one record or an
    /// array. Records that fail to decode are skipped with a warning;
    /// non-object payloads change nothing.
    pub fn merge_delta(&mut self, payload: &Value) -> MergeStats {
        let mut stats = MergeStats::default();
        let Some(fields) = payload.as_object() else {
            return stats;
        };
        for key in NODE_KEYS {
            if let Some(value) = fields.get(key) {
                stats += upsert_all(&mut self.nodes, decode_each(key, value));
            }
        }
        for key in RELATIONSHIP_KEYS {
            if let Some(value) = fields.get(key) {
                stats += upsert_all(&mut self.relationships, decode_each(key, value));
            }
        }
        for key in DOCUMENT_KEYS {
            if let Some(value) = fields.get(key) {
                stats += upsert_all(&mut self.documents, decode_each(key, value));
            }
        }
        for key in WEBPAGE_KEYS {
            if let Some(value) = fields.get(key) {
                stats += upsert_all(&mut self.webpages, decode_each(key, value));
            }
        }
        stats
    }

    /// Merge a graph query response.
    pub fn merge_graph(&mut self, graph: GraphRecord) -> MergeStats {
        let mut stats = upsert_all(&mut self.nodes, graph.nodes);
        stats += upsert_all(&mut self.relationships, graph.links);
        stats
    }

    /// Merge the graph elements a complete search result refers to.
    pub fn merge_result(&mut self, result: &QueryResult) -> MergeStats {
        let nodes = result
            .main_node
            .iter()
            .chain(&result.related_nodes)
            .chain(&result.prompts)
            .cloned();
        let mut stats = upsert_all(&mut self.nodes, nodes);
        stats += upsert_all(&mut self.documents, result.document.clone());
        stats += upsert_all(&mut self.webpages, result.webpage.clone());
        stats
    }
}

fn upsert_all<T: GraphElement>(
    map: &mut BTreeMap<ElementId, T>,
    items: impl IntoIterator<Item = T>,
) -> MergeStats {
    let mut stats = MergeStats::default();
    for item in items {
        match map.entry(item.element_id().clone()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().absorb(item);
                stats.updated += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(item);
                stats.inserted += 1;
            }
        }
    }
    stats
}

fn decode_each<T: DeserializeOwned>(key: &str, value: &Value) -> Vec<T> {
    let items = match value {
        Value::Null => return Vec::new(),
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    items
        .iter()
        .filter(|item| !item.is_null())
        .filter_map(|item| match T::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(key, error = %e, "skipping malformed graph element");
                None
            }
        })
        .collect()
}
