//! Conversation history entries.

use chrono::{DateTime, Utc};
use graphlens_types::QueryResult;
use serde::{Deserialize, Serialize};

use crate::job::JobHandle;

/// Who wrote a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person asking.
    User,
    /// The backend's answer.
    Assistant,
}

/// One turn of the conversation.
///
/// Assistant entries grow while their job runs. The structured result is
/// attached once when the job finishes, and the entry is frozen from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    /// Position-independent id, unique within the session.
    pub id: u64,
    /// Author.
    pub role: MessageRole,
    /// Literal text.
    pub content: String,
    /// When the entry was created.
    pub time: DateTime<Utc>,
    /// Structured answer, attached when the job finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_result: Option<QueryResult>,
    /// Job this entry belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobHandle>,
    /// Whether the entry accepts no further changes.
    #[serde(default)]
    pub frozen: bool,
}

impl MessageEntry {
    pub(crate) fn user(id: u64, content: impl Into<String>, job: Option<JobHandle>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content: content.into(),
            time: Utc::now(),
            query_result: None,
            job,
            frozen: true,
        }
    }

    pub(crate) fn assistant(id: u64, job: JobHandle) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: String::new(),
            time: Utc::now(),
            query_result: None,
            job: Some(job),
            frozen: false,
        }
    }

    /// Append streamed answer text. Ignored once frozen.
    pub(crate) fn extend(&mut self, text: &str) {
        if !self.frozen {
            self.content.push_str(text);
        }
    }

    /// Attach the final result and freeze. Only the first call has effect.
    pub(crate) fn finalize(&mut self, result: QueryResult) {
        if self.frozen {
            return;
        }
        self.query_result = Some(result);
        self.frozen = true;
    }
}
