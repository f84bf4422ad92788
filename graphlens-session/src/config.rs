//! Session-wide search defaults and per-query search scope.

use graphlens_types::{
    ElementId, LibId, ReturnMethod, SearchRequest, SearchScope, SearchType, SubjectId,
    SummaryType,
};
use serde::{Deserialize, Serialize};

/// Search settings that apply to every query of a session.
///
/// Deserializes from partial JSON; missing fields take their defaults.
///
/// ```
/// use graphlens_session::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(r#"{"messageCount": 5}"#).unwrap();
/// assert_eq!(config.message_count, 5);
/// assert!(config.is_summary);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// How many recent user messages accompany each query.
    pub message_count: u32,
    /// Whether the backend summarizes matches into an answer.
    pub is_summary: bool,
    /// Summarization strategy.
    pub summary_type: SummaryType,
    /// Retrieval strategy.
    pub search_type: SearchType,
    /// Scopes in priority order.
    pub search_scopes: Vec<SearchScope>,
    /// Only match node titles.
    pub only_title: bool,
    /// LLM for summarization; `None` lets the backend choose.
    pub llm_name: Option<String>,
    /// Result window size.
    pub limit: u32,
    /// Result window start.
    pub offset: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            message_count: 3,
            is_summary: true,
            summary_type: SummaryType::Stuff,
            search_type: SearchType::Vector,
            search_scopes: SearchScope::ALL.to_vec(),
            only_title: false,
            llm_name: Some("wizardlm2".into()),
            limit: 5,
            offset: 0,
        }
    }
}

impl SessionConfig {
    /// Build the search body for `text`, applying `search`'s overrides.
    pub(crate) fn build_request(
        &self,
        text: String,
        messages: Vec<String>,
        lib_id: LibId,
        search: &SearchConfig,
        return_method: ReturnMethod,
    ) -> SearchRequest {
        SearchRequest {
            text,
            messages,
            lib_id,
            subject_id: search.subject_id.filter(|id| id.is_set()),
            search_scopes: search
                .search_scopes
                .clone()
                .unwrap_or_else(|| self.search_scopes.clone()),
            search_type: search.search_type.unwrap_or(self.search_type),
            message_count: self.message_count,
            is_summary: search.is_summary.unwrap_or(self.is_summary),
            summary_type: search.summary_type.unwrap_or(self.summary_type),
            only_title: search.only_title.unwrap_or(self.only_title),
            return_method,
            llm_name: search.llm_name.clone().or_else(|| self.llm_name.clone()),
            limit: search.limit.unwrap_or(self.limit),
            offset: search.offset.unwrap_or(self.offset),
            prompt_element_id: search.prompt_element_id.clone(),
            related_node_element_id: search.related_node_element_id.clone(),
        }
    }
}

/// What one query searches, plus overrides of the session defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    /// Library to search. Required.
    pub lib_id: Option<LibId>,
    /// Subject to search; `None` searches the whole library.
    pub subject_id: Option<SubjectId>,
    /// Override of [`SessionConfig::search_scopes`].
    pub search_scopes: Option<Vec<SearchScope>>,
    /// Override of [`SessionConfig::search_type`].
    pub search_type: Option<SearchType>,
    /// Override of [`SessionConfig::is_summary`].
    pub is_summary: Option<bool>,
    /// Override of [`SessionConfig::summary_type`].
    pub summary_type: Option<SummaryType>,
    /// Override of [`SessionConfig::only_title`].
    pub only_title: Option<bool>,
    /// Override of [`SessionConfig::llm_name`].
    pub llm_name: Option<String>,
    /// Override of [`SessionConfig::limit`].
    pub limit: Option<u32>,
    /// Override of [`SessionConfig::offset`].
    pub offset: Option<u32>,
    /// Search from this prompt node.
    pub prompt_element_id: Option<ElementId>,
    /// Search around this related node.
    pub related_node_element_id: Option<ElementId>,
}

impl SearchConfig {
    /// Search a whole library with the session defaults.
    #[must_use]
    pub fn library(lib_id: LibId) -> Self {
        Self {
            lib_id: Some(lib_id),
            ..Default::default()
        }
    }

    /// Narrow the search to one subject.
    #[must_use]
    pub fn subject(mut self, subject_id: SubjectId) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    /// Override the scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = SearchScope>) -> Self {
        self.search_scopes = Some(scopes.into_iter().collect());
        self
    }

    /// Override the retrieval strategy.
    #[must_use]
    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = Some(search_type);
        self
    }

    /// Override the LLM.
    #[must_use]
    pub fn llm(mut self, name: impl Into<String>) -> Self {
        self.llm_name = Some(name.into());
        self
    }

    /// The library to search, if one is set.
    pub(crate) fn library_id(&self) -> Option<LibId> {
        self.lib_id.filter(|id| id.is_set())
    }
}
