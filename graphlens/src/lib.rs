#![deny(missing_docs)]
//! # graphlens — umbrella crate
//!
//! One import surface for the graphlens workspace. The shared vocabulary is
//! always available; the decoder, the HTTP client and the session
//! orchestrator sit behind feature flags, plus a `prelude` for the common
//! path of asking questions against a live backend.
//!
//! | Feature | Crate |
//! |---------|-------|
//! | always | [`types`] |
//! | `stream` | `graphlens-stream` |
//! | `client` (default) | `graphlens-client` |
//! | `session` (default) | `graphlens-session` |

pub use graphlens_types as types;

#[cfg(feature = "client")]
pub use graphlens_client as client;
#[cfg(feature = "session")]
pub use graphlens_session as session;
#[cfg(feature = "stream")]
pub use graphlens_stream as stream;

/// Happy-path imports for running query sessions.
pub mod prelude {
    pub use graphlens_types::{
        ElementId, GraphQuery, LibId, QueryBackend, QueryResult, SearchScope, SearchType,
        SessionError, SubjectId, SummaryType, TransportError,
    };

    #[cfg(feature = "stream")]
    pub use graphlens_stream::{DispatchOutcome, FrameDecoder, StreamHandler, StreamRecord};

    #[cfg(feature = "client")]
    pub use graphlens_client::KnowledgeClient;

    #[cfg(feature = "session")]
    pub use graphlens_session::{
        JobHandle, JobState, MessageRole, QuerySession, SearchConfig, SessionConfig,
        SessionEvent, StepOutcome,
    };
}
