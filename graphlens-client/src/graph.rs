//! Graph endpoints: queries, nodes, relationships, attachments, generation.

use graphlens_types::{
    DocumentRecord, ElementId, GraphOverview, GraphQuery, GraphRecord, LibId, NodeRecord,
    RelationshipRecord, TransportError, WebPageRecord,
};
use reqwest::Method;
use serde::de::IgnoredAny;

use crate::client::KnowledgeClient;
use crate::types::{
    AnalyzeRequest, GenerateRequest, GeneratedNodes, NodeCreated, NodeDraft, RelationshipDraft,
    TermKind, WebPageDraft,
};

impl KnowledgeClient {
    /// Fetch the nodes and links of a library matching `query`.
    pub async fn graph(&self, lib_id: LibId, query: &GraphQuery) -> Result<GraphRecord, TransportError> {
        tracing::debug!(%lib_id, "querying graph");
        self.send(
            self.request(Method::POST, &format!("/api/graph/query/{lib_id}"))
                .json(query),
        )
        .await
    }

    /// Count nodes and links of a library by type.
    pub async fn graph_overview(
        &self,
        lib_id: LibId,
        query: &GraphQuery,
    ) -> Result<GraphOverview, TransportError> {
        self.send(
            self.request(Method::POST, &format!("/api/graph/overview/{lib_id}"))
                .json(query),
        )
        .await
    }

    /// Start generating the graph of a library subject in the background.
    ///
    /// The job can be stopped with
    /// [`cancel_generation`](KnowledgeClient::cancel_generation).
    pub async fn generate_graph(&self, request: &GenerateRequest) -> Result<(), TransportError> {
        tracing::debug!(lib_id = ?request.lib_id, "starting graph generation");
        let _: IgnoredAny = self
            .send(self.request(Method::POST, "/api/graph/generate").json(request))
            .await?;
        Ok(())
    }

    /// Start analyzing a whole library in the background.
    pub async fn analyze_graph(&self, request: &AnalyzeRequest) -> Result<(), TransportError> {
        tracing::debug!(lib_id = %request.lib_id, "starting graph analysis");
        let _: IgnoredAny = self
            .send(self.request(Method::POST, "/api/graph/analyze").json(request))
            .await?;
        Ok(())
    }

    /// Fetch one node with its terms and attachments.
    pub async fn node(&self, element_id: &ElementId) -> Result<NodeRecord, TransportError> {
        self.send(self.request(Method::GET, &format!("/api/graph/node/{element_id}")))
            .await
    }

    /// Add a node, linked under `draft.parent_element_id` when set.
    pub async fn add_node(&self, draft: &NodeDraft) -> Result<NodeCreated, TransportError> {
        self.send(self.request(Method::POST, "/api/graph/node").json(draft))
            .await
    }

    /// Replace the content of a node.
    pub async fn update_node(&self, draft: &NodeDraft) -> Result<NodeRecord, TransportError> {
        self.send(self.request(Method::PUT, "/api/graph/node").json(draft))
            .await
    }

    /// Delete a node and its relationships.
    pub async fn delete_node(&self, element_id: &ElementId) -> Result<(), TransportError> {
        self.delete(&format!("/api/graph/node/{element_id}")).await
    }

    /// Re-extract the terms of a node.
    pub async fn analyze_node(&self, request: &GenerateRequest) -> Result<Option<NodeRecord>, TransportError> {
        self.send(self.request(Method::POST, "/api/graph/node/analyze").json(request))
            .await
    }

    /// Fetch one relationship.
    pub async fn relationship(&self, element_id: &ElementId) -> Result<RelationshipRecord, TransportError> {
        self.send(self.request(Method::GET, &format!("/api/graph/relationship/{element_id}")))
            .await
    }

    /// Link two nodes.
    pub async fn add_relationship(
        &self,
        draft: &RelationshipDraft,
    ) -> Result<RelationshipRecord, TransportError> {
        self.send(self.request(Method::POST, "/api/graph/relationship").json(draft))
            .await
    }

    /// Replace the content of a relationship.
    pub async fn update_relationship(
        &self,
        draft: &RelationshipDraft,
    ) -> Result<RelationshipRecord, TransportError> {
        self.send(
            self.request(Method::PUT, "/api/graph/relationship/info")
                .json(draft),
        )
        .await
    }

    /// Delete a relationship.
    pub async fn delete_relationship(&self, element_id: &ElementId) -> Result<(), TransportError> {
        self.delete(&format!("/api/graph/relationship/{element_id}"))
            .await
    }

    /// Detach an entity, keyword or tag from a node.
    pub async fn unlink_term(
        &self,
        kind: TermKind,
        term_id: &ElementId,
        node_id: &ElementId,
    ) -> Result<(), TransportError> {
        self.delete(&format!(
            "/api/graph/node/{}/{term_id}/{node_id}",
            kind.path_segment()
        ))
        .await
    }

    /// Attach a webpage to a node.
    pub async fn add_webpage(&self, draft: &WebPageDraft) -> Result<WebPageRecord, TransportError> {
        self.send(self.request(Method::POST, "/api/graph/node/webpage").json(draft))
            .await
    }

    /// Fetch a webpage with its analyzed pages.
    pub async fn webpage(&self, element_id: &ElementId) -> Result<WebPageRecord, TransportError> {
        self.send(self.request(Method::GET, &format!("/api/graph/node/webpage/{element_id}")))
            .await
    }

    /// Split a webpage into pages and extract their terms.
    pub async fn analyze_webpage(&self, request: &GenerateRequest) -> Result<WebPageRecord, TransportError> {
        self.send(
            self.request(Method::POST, "/api/graph/node/webpage/analyze")
                .json(request),
        )
        .await
    }

    /// Detach a webpage from its node.
    pub async fn delete_webpage(&self, element_id: &ElementId) -> Result<(), TransportError> {
        self.delete(&format!("/api/graph/node/webpage/{element_id}"))
            .await
    }

    /// Fetch a document with its pages.
    pub async fn document(&self, element_id: &ElementId) -> Result<DocumentRecord, TransportError> {
        self.send(self.request(
            Method::GET,
            &format!("/api/graph/node/document/detail/{element_id}"),
        ))
        .await
    }

    /// Split a document into pages and extract their terms.
    pub async fn analyze_document(&self, request: &GenerateRequest) -> Result<DocumentRecord, TransportError> {
        self.send(
            self.request(Method::POST, "/api/graph/node/document/analyze")
                .json(request),
        )
        .await
    }

    /// Detach a document from its node.
    pub async fn delete_document(&self, element_id: &ElementId) -> Result<(), TransportError> {
        self.delete(&format!("/api/graph/node/document/{element_id}"))
            .await
    }

    /// Generate an answer node for a question node.
    pub async fn generate_answer(&self, request: &GenerateRequest) -> Result<NodeCreated, TransportError> {
        self.send(
            self.request(Method::POST, "/api/graph/generate/answer")
                .json(request),
        )
        .await
    }

    /// Generate follow-up question nodes around a node.
    pub async fn generate_questions(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedNodes, TransportError> {
        self.send(
            self.request(Method::POST, "/api/graph/generate/questions")
                .json(request),
        )
        .await
    }

    /// Generate prompt nodes around a node.
    pub async fn generate_prompts(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedNodes, TransportError> {
        self.send(
            self.request(Method::POST, "/api/graph/generate/prompts")
                .json(request),
        )
        .await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), TransportError> {
        tracing::debug!(path, "deleting");
        let _: IgnoredAny = self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}
