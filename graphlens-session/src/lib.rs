#![deny(missing_docs)]
//! Query session orchestration for graphlens.
//!
//! A [`QuerySession`] turns natural-language questions into streamed search
//! jobs against any [`QueryBackend`](graphlens_types::QueryBackend). It
//! keeps the conversation history, tracks each [`QueryJob`] through
//! `Running → Completed | Cancelled | Failed`, and folds every streamed
//! fragment into both the job's [`QueryResult`](graphlens_types::QueryResult)
//! and the session's [`GraphSnapshot`].
//!
//! Only one job runs at a time. Reading is pull-based: call
//! [`QuerySession::step`] per chunk or [`QuerySession::drive`] to the end,
//! and [`QuerySession::drain_events`] for what to show the user.

mod config;
mod job;
mod message;
mod session;
mod snapshot;

pub use config::{SearchConfig, SessionConfig};
pub use job::{JobHandle, JobState, QueryJob};
pub use message::{MessageEntry, MessageRole};
pub use session::{QuerySession, SessionEvent, StepOutcome};
pub use snapshot::{GraphSnapshot, MergeStats};
