//! The query session: one conversation against one backend.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use graphlens_stream::{RecordDispatcher, StreamHandler};
use graphlens_types::{
    ByteStream, GraphQuery, LibId, QueryBackend, QueryResult, ReturnMethod, SearchRequest,
    SessionError, StreamFailure,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::{SearchConfig, SessionConfig};
use crate::job::{JobHandle, JobState, QueryJob};
use crate::message::{MessageEntry, MessageRole};
use crate::snapshot::{GraphSnapshot, MergeStats};

/// Something the user should be told about.
///
/// Collected in order and handed out by [`QuerySession::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A query job started.
    JobStarted {
        /// The new job.
        handle: JobHandle,
        /// Library it searches.
        lib_id: LibId,
    },
    /// A job's stream reached its end.
    JobCompleted {
        /// The job.
        handle: JobHandle,
    },
    /// A job failed.
    JobFailed {
        /// The job.
        handle: JobHandle,
        /// What went wrong.
        error: String,
    },
    /// The server confirmed a cancellation.
    JobCancelled {
        /// The job.
        handle: JobHandle,
    },
    /// The server refused a cancellation; the job is still running.
    CancelFailed {
        /// The job.
        handle: JobHandle,
        /// Why the cancel request failed.
        error: String,
    },
    /// The graph snapshot changed.
    GraphUpdated(MergeStats),
}

/// Result of reading one chunk of the running job's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The chunk was processed and the stream is still open.
    Continue,
    /// The stream is done and the session has let go of it.
    Finished {
        /// The job the stream belonged to.
        handle: JobHandle,
        /// The job's state once the stream was done.
        state: JobState,
    },
}

/// The stream of the job currently being read.
struct ActiveStream {
    handle: JobHandle,
    body: ByteStream,
    dispatcher: RecordDispatcher,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<MessageEntry>,
    jobs: Vec<QueryJob>,
    snapshot: GraphSnapshot,
    events: VecDeque<SessionEvent>,
    next_message_id: u64,
    next_job_id: u64,
}

impl SessionState {
    fn job(&self, handle: JobHandle) -> Option<&QueryJob> {
        self.jobs.iter().find(|job| job.handle == handle)
    }

    fn job_mut(&mut self, handle: JobHandle) -> Option<&mut QueryJob> {
        self.jobs.iter_mut().find(|job| job.handle == handle)
    }

    fn running_job(&self) -> Option<&QueryJob> {
        self.jobs.iter().rev().find(|job| job.is_running())
    }

    fn push_message(&mut self, build: impl FnOnce(u64) -> MessageEntry) -> u64 {
        self.next_message_id += 1;
        let id = self.next_message_id;
        self.messages.push(build(id));
        id
    }

    /// Text of the last `count` user entries, oldest first.
    fn recent_user_messages(&self, count: u32) -> Vec<String> {
        let mut recent: Vec<String> = self
            .messages
            .iter()
            .rev()
            .filter(|entry| entry.role == MessageRole::User)
            .take(count as usize)
            .map(|entry| entry.content.clone())
            .collect();
        recent.reverse();
        recent
    }

    fn start_job(&mut self, lib_id: LibId) -> JobHandle {
        self.next_job_id += 1;
        let handle = JobHandle(self.next_job_id);
        let mut job = QueryJob::new(handle, lib_id);
        job.transition(JobState::Running);
        self.jobs.push(job);
        self.events
            .push_back(SessionEvent::JobStarted { handle, lib_id });
        handle
    }

    /// The assistant entry of `handle`, created on first use.
    fn answer_entry(&mut self, handle: JobHandle) -> Option<&mut MessageEntry> {
        let id = match self.job(handle)?.entry_id {
            Some(id) => id,
            None => {
                let id = self.push_message(|id| MessageEntry::assistant(id, handle));
                if let Some(job) = self.job_mut(handle) {
                    job.entry_id = Some(id);
                }
                id
            }
        };
        self.messages.iter_mut().find(|entry| entry.id == id)
    }

    /// Attach the job's result to its entry and freeze the entry.
    fn settle(&mut self, handle: JobHandle) {
        let Some(result) = self.job(handle).map(|job| job.result.clone()) else {
            return;
        };
        if let Some(entry) = self.answer_entry(handle) {
            entry.finalize(result);
        }
    }

    fn complete_job(&mut self, handle: JobHandle) {
        let Some(job) = self.job_mut(handle) else {
            return;
        };
        if job.transition(JobState::Completed) {
            tracing::info!(job = %handle, "query job completed");
            self.settle(handle);
            self.events.push_back(SessionEvent::JobCompleted { handle });
        }
    }

    fn fail_job(&mut self, handle: JobHandle, error: String) {
        let Some(job) = self.job_mut(handle) else {
            return;
        };
        if !job.is_running() {
            tracing::debug!(job = %handle, %error, "error after job finished");
            return;
        }
        job.fail(error.clone());
        self.settle(handle);
        self.events
            .push_back(SessionEvent::JobFailed { handle, error });
    }

    fn merge_delta(&mut self, payload: &Value) -> MergeStats {
        let stats = self.snapshot.merge_delta(payload);
        if !stats.is_empty() {
            self.events.push_back(SessionEvent::GraphUpdated(stats));
        }
        stats
    }
}

/// Applies one job's stream records to the session state.
struct JobSink<'a> {
    state: &'a mut SessionState,
    handle: JobHandle,
}

impl StreamHandler for JobSink<'_> {
    fn on_data(&mut self, payload: Value) {
        self.state.merge_delta(&payload);
        let fragment = match QueryResult::deserialize(&payload) {
            Ok(fragment) => fragment,
            Err(e) => {
                tracing::warn!(job = %self.handle, error = %e, "payload is not a query result fragment");
                return;
            }
        };
        let Some(job) = self.state.job_mut(self.handle) else {
            return;
        };
        if !job.is_running() {
            tracing::debug!(job = %self.handle, state = %job.state, "payload after job finished");
            return;
        }
        let text = fragment.text.clone();
        job.result.merge(fragment);
        if let Some(entry) = self.state.answer_entry(self.handle) {
            if let Some(text) = text {
                entry.extend(&text);
            }
        }
    }

    fn on_end(&mut self) {
        self.state.complete_job(self.handle);
    }

    fn on_error(&mut self, failure: StreamFailure) {
        let error = match failure {
            StreamFailure::Sentinel(msg) => msg,
            StreamFailure::Transport(e) => e.to_string(),
        };
        self.state.fail_job(self.handle, error);
    }
}

/// One conversation with the knowledge-graph backend.
///
/// Owns the message history, every query job, the stream of the running
/// job, and the graph snapshot those jobs feed. At most one job runs at a
/// time. All progress happens inside `&mut self` calls: [`step`] reads one
/// chunk, [`cancel_job`] waits for the server's answer, and nothing changes
/// in between.
///
/// [`step`]: QuerySession::step
/// [`cancel_job`]: QuerySession::cancel_job
///
/// # Example
///
/// ```ignore
/// let mut session = QuerySession::new(client);
/// let handle = session.submit_query("what is a graph", &SearchConfig::library(lib)).await?;
/// let state = session.drive().await?;
/// for event in session.drain_events() { /* notify */ }
/// ```
pub struct QuerySession<B: QueryBackend> {
    id: Uuid,
    created_at: DateTime<Utc>,
    backend: B,
    config: SessionConfig,
    state: SessionState,
    active: Option<ActiveStream>,
}

impl<B: QueryBackend> QuerySession<B> {
    /// A session with default settings.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, SessionConfig::default())
    }

    /// A session with the given settings.
    #[must_use]
    pub fn with_config(backend: B, config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            backend,
            config,
            state: SessionState::default(),
            active: None,
        }
    }

    /// Unique id of this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The backend this session talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Change settings. Applies to queries submitted afterwards.
    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    /// The conversation so far, oldest first.
    pub fn messages(&self) -> &[MessageEntry] {
        &self.state.messages
    }

    /// Every job of the session, oldest first.
    pub fn jobs(&self) -> &[QueryJob] {
        &self.state.jobs
    }

    /// Look up a job.
    pub fn job(&self, handle: JobHandle) -> Option<&QueryJob> {
        self.state.job(handle)
    }

    /// The running job, if any.
    pub fn active_job(&self) -> Option<&QueryJob> {
        self.state.running_job()
    }

    /// Whether a job stream is still being read.
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// The graph elements seen so far.
    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.state.snapshot
    }

    /// Take every pending event, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.state.events.drain(..).collect()
    }

    /// Start a streaming query.
    ///
    /// The user entry is appended before the request is sent. If the
    /// backend refuses the request the job fails, a
    /// [`SessionEvent::JobFailed`] is queued, and the handle is still
    /// returned. Read the stream with [`step`](Self::step) or
    /// [`drive`](Self::drive).
    ///
    /// # Errors
    ///
    /// [`SessionError::JobRunning`] while another job runs,
    /// [`SessionError::EmptyQuery`] for blank text, and
    /// [`SessionError::MissingLibrary`] when `search` names no library.
    /// None of these change the session.
    pub async fn submit_query(
        &mut self,
        text: &str,
        search: &SearchConfig,
    ) -> Result<JobHandle, SessionError> {
        let (handle, request) = self.begin(text, search, ReturnMethod::Stream)?;
        if let Some(stale) = self.active.take() {
            tracing::debug!(job = %stale.handle, "dropping stream of finished job");
        }
        tracing::debug!(job = %handle, lib_id = %request.lib_id, "opening search stream");
        match self.backend.search_stream(request).await {
            Ok(body) => {
                self.active = Some(ActiveStream {
                    handle,
                    body,
                    dispatcher: RecordDispatcher::new(),
                });
            }
            Err(e) => {
                tracing::warn!(job = %handle, error = %e, "search stream refused");
                self.state.fail_job(handle, e.to_string());
            }
        }
        Ok(handle)
    }

    /// Read one chunk of the running job's stream and apply its records.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveJob`] when no stream is open.
    pub async fn step(&mut self) -> Result<StepOutcome, SessionError> {
        let Some(active) = self.active.as_mut() else {
            return Err(SessionError::NoActiveJob);
        };
        let handle = active.handle;
        let chunk = active.body.next().await;
        let mut sink = JobSink {
            state: &mut self.state,
            handle,
        };
        let open = match chunk {
            Some(Ok(bytes)) => active.dispatcher.dispatch_chunk(&bytes, &mut sink),
            Some(Err(e)) => {
                active.dispatcher.fail(e, &mut sink);
                false
            }
            None => {
                active.dispatcher.close(&mut sink);
                false
            }
        };
        if open {
            return Ok(StepOutcome::Continue);
        }
        self.active = None;
        let state = self
            .state
            .job(handle)
            .map_or(JobState::Failed, |job| job.state);
        tracing::debug!(job = %handle, %state, "search stream finished");
        Ok(StepOutcome::Finished { handle, state })
    }

    /// Read the running job's stream until it is done.
    ///
    /// Returns the job's final state. A stream the server keeps open never
    /// returns; cancel it from elsewhere or wrap this in a timeout.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveJob`] when no stream is open.
    pub async fn drive(&mut self) -> Result<JobState, SessionError> {
        loop {
            if let StepOutcome::Finished { state, .. } = self.step().await? {
                return Ok(state);
            }
        }
    }

    /// Ask the server to cancel the running job of `lib_id`.
    ///
    /// Returns `Ok(false)` without a request when `lib_id` is absent or zero
    /// or no job of that library is running. On success the job becomes
    /// `Cancelled` and its stream is dropped.
    ///
    /// # Errors
    ///
    /// [`SessionError::CancelFailed`] when the server refuses; the job keeps
    /// running and its stream stays open.
    pub async fn cancel_job(&mut self, lib_id: Option<LibId>) -> Result<bool, SessionError> {
        let Some(lib_id) = lib_id.filter(|id| id.is_set()) else {
            return Ok(false);
        };
        let Some(handle) = self
            .state
            .running_job()
            .filter(|job| job.lib_id == lib_id)
            .map(|job| job.handle)
        else {
            tracing::debug!(%lib_id, "no running job to cancel");
            return Ok(false);
        };
        tracing::debug!(job = %handle, %lib_id, "requesting cancellation");
        if let Err(source) = self.backend.cancel(lib_id).await {
            tracing::warn!(job = %handle, error = %source, "cancel request failed");
            self.state.events.push_back(SessionEvent::CancelFailed {
                handle,
                error: source.to_string(),
            });
            return Err(SessionError::CancelFailed { lib_id, source });
        }
        if let Some(job) = self.state.job_mut(handle) {
            job.transition(JobState::Cancelled);
        }
        self.state.settle(handle);
        if self.active.as_ref().is_some_and(|a| a.handle == handle) {
            self.active = None;
        }
        tracing::info!(job = %handle, "query job cancelled");
        self.state
            .events
            .push_back(SessionEvent::JobCancelled { handle });
        Ok(true)
    }

    /// Run a search and wait for the whole answer.
    ///
    /// Follows the same rules as [`submit_query`](Self::submit_query): the
    /// user entry is appended first and only one job may run. The answer
    /// entry is written in one go.
    ///
    /// # Errors
    ///
    /// The validation errors of `submit_query`, and
    /// [`SessionError::Transport`] when the request fails; the job is then
    /// `Failed`.
    pub async fn query_sync(
        &mut self,
        text: &str,
        search: &SearchConfig,
    ) -> Result<QueryResult, SessionError> {
        let (handle, request) = self.begin(text, search, ReturnMethod::Sync)?;
        tracing::debug!(job = %handle, lib_id = %request.lib_id, "running search");
        let result = match self.backend.search(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(job = %handle, error = %e, "search failed");
                self.state.fail_job(handle, e.to_string());
                return Err(e.into());
            }
        };
        let stats = self.state.snapshot.merge_result(&result);
        if !stats.is_empty() {
            self.state.events.push_back(SessionEvent::GraphUpdated(stats));
        }
        if let Some(job) = self.state.job_mut(handle) {
            job.result = result.clone();
        }
        if let Some(entry) = self.state.answer_entry(handle) {
            if let Some(text) = &result.text {
                entry.extend(text);
            }
        }
        self.state.complete_job(handle);
        Ok(result)
    }

    /// Replace the snapshot with the graph of a library.
    ///
    /// # Errors
    ///
    /// [`SessionError::Transport`] when the query fails; the snapshot is
    /// left as it was.
    pub async fn load_graph(
        &mut self,
        lib_id: LibId,
        query: GraphQuery,
    ) -> Result<MergeStats, SessionError> {
        let graph = self.backend.query_graph(lib_id, query).await?;
        self.state.snapshot.clear();
        let stats = self.state.snapshot.merge_graph(graph);
        tracing::debug!(%lib_id, inserted = stats.inserted, "graph loaded");
        self.state
            .events
            .push_back(SessionEvent::GraphUpdated(stats));
        Ok(stats)
    }

    /// Merge a payload of graph changes into the snapshot.
    ///
    /// See [`GraphSnapshot::merge_delta`] for the accepted shapes.
    pub fn merge_graph_delta(&mut self, payload: &Value) -> MergeStats {
        self.state.merge_delta(payload)
    }

    /// Validate a submission, record the user entry and start its job.
    fn begin(
        &mut self,
        text: &str,
        search: &SearchConfig,
        return_method: ReturnMethod,
    ) -> Result<(JobHandle, SearchRequest), SessionError> {
        if let Some(job) = self.state.running_job() {
            return Err(SessionError::JobRunning { lib_id: job.lib_id });
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyQuery);
        }
        let lib_id = search.library_id().ok_or(SessionError::MissingLibrary)?;

        let handle = self.state.start_job(lib_id);
        self.state
            .push_message(|id| MessageEntry::user(id, text, Some(handle)));
        let messages = self
            .state
            .recent_user_messages(self.config.message_count);
        let request =
            self.config
                .build_request(text.to_owned(), messages, lib_id, search, return_method);
        Ok((handle, request))
    }
}

impl<B: QueryBackend> std::fmt::Debug for QuerySession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySession")
            .field("id", &self.id)
            .field("messages", &self.state.messages.len())
            .field("jobs", &self.state.jobs.len())
            .field("streaming", &self.active.is_some())
            .finish_non_exhaustive()
    }
}
