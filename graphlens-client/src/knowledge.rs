//! Knowledge library, subject, and model catalog endpoints.

use graphlens_types::{KnowledgeLib, KnowledgeSubject, LibFilter, LibId, LlmCatalog, SubjectId, TransportError};
use reqwest::Method;

use crate::client::KnowledgeClient;

impl KnowledgeClient {
    /// List the caller's libraries.
    pub async fn find_libs(&self, filter: &LibFilter) -> Result<Vec<KnowledgeLib>, TransportError> {
        self.send(self.request(Method::POST, "/api/knowledge/lib/find").json(filter))
            .await
    }

    /// Search published libraries.
    pub async fn search_libs(&self, filter: &LibFilter) -> Result<Vec<KnowledgeLib>, TransportError> {
        self.send(self.request(Method::POST, "/api/knowledge/lib/search").json(filter))
            .await
    }

    /// Fetch one library.
    pub async fn lib(&self, lib_id: LibId) -> Result<KnowledgeLib, TransportError> {
        self.send(self.request(Method::GET, &format!("/api/knowledge/lib/{lib_id}")))
            .await
    }

    /// Create a library.
    pub async fn create_lib(&self, lib: &KnowledgeLib) -> Result<KnowledgeLib, TransportError> {
        self.send(self.request(Method::POST, "/api/knowledge/lib").json(lib))
            .await
    }

    /// Update a library's title, description or status.
    pub async fn update_lib(&self, lib: &KnowledgeLib) -> Result<KnowledgeLib, TransportError> {
        self.send(self.request(Method::PUT, "/api/knowledge/lib").json(lib))
            .await
    }

    /// Delete a library and its graph.
    pub async fn delete_lib(&self, lib_id: LibId) -> Result<(), TransportError> {
        self.delete(&format!("/api/knowledge/lib/{lib_id}")).await
    }

    /// Toggle whether a library is published.
    pub async fn toggle_publish(&self, lib_id: LibId) -> Result<KnowledgeLib, TransportError> {
        self.send(self.request(
            Method::GET,
            &format!("/api/knowledge/lib/publish/{lib_id}"),
        ))
        .await
    }

    /// List the subjects of a library.
    pub async fn subjects(&self, lib_id: LibId) -> Result<Vec<KnowledgeSubject>, TransportError> {
        self.send(self.request(
            Method::GET,
            &format!("/api/knowledge/subject/find/{lib_id}"),
        ))
        .await
    }

    /// Fetch one subject.
    pub async fn subject(&self, subject_id: SubjectId) -> Result<KnowledgeSubject, TransportError> {
        self.send(self.request(
            Method::GET,
            &format!("/api/knowledge/subject/{subject_id}"),
        ))
        .await
    }

    /// Create a subject.
    pub async fn create_subject(
        &self,
        subject: &KnowledgeSubject,
    ) -> Result<KnowledgeSubject, TransportError> {
        self.send(self.request(Method::POST, "/api/knowledge/subject").json(subject))
            .await
    }

    /// Rename a subject.
    pub async fn update_subject(
        &self,
        subject: &KnowledgeSubject,
    ) -> Result<KnowledgeSubject, TransportError> {
        self.send(self.request(Method::PUT, "/api/knowledge/subject").json(subject))
            .await
    }

    /// Delete a subject.
    pub async fn delete_subject(&self, subject_id: SubjectId) -> Result<(), TransportError> {
        self.delete(&format!("/api/knowledge/subject/{subject_id}"))
            .await
    }

    /// List the LLM and embedding models the backend can use.
    pub async fn all_models(&self) -> Result<LlmCatalog, TransportError> {
        self.send(self.request(Method::GET, "/api/llm/all")).await
    }
}
