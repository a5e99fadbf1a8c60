//! Stream sessions: one per submitted query.
//!
//! A [`StreamSession`] owns the handle of the assistant message it writes to
//! and a [`SessionGuard`] generation token. Before every transcript mutation
//! the session checks that it is still the current generation and that its
//! message is still the open one, so a superseded stream can never write into
//! a newer message. Superseded sessions drop their late events.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::{AbortHandle, AbortRegistration, Abortable};
use futures_util::{pin_mut, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::stream::{EventDecoder, StreamEvent};
use crate::transcript::{Transcript, STREAM_FAILED_MESSAGE};

pub const MAX_QUERY_LENGTH: usize = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Streaming,
    Completed,
    Failed,
    /// Superseded by a newer submission or aborted.
    Cancelled,
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamPhase::Completed | StreamPhase::Failed | StreamPhase::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Generation token shared between a controller and the sessions it issued.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl SessionGuard {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

/// Per-request answer state; the carry buffer lives in the decoder.
#[derive(Debug, Default)]
struct StreamState {
    accumulated: String,
    terminated: bool,
}

impl StreamState {
    /// Apply one event to the target message. Returns `Flow::Stop` on termination.
    fn apply(&mut self, event: StreamEvent, transcript: &mut Transcript) -> Flow {
        match event {
            StreamEvent::Token { text } => {
                self.accumulated.push_str(&text);
                transcript.apply_token(&text);
                Flow::Continue
            }
            StreamEvent::FinalAnswer { answer, citations } => {
                debug!(citations = citations.len(), "final frame received");
                self.accumulated.clone_from(&answer);
                transcript.apply_final(answer, citations);
                Flow::Continue
            }
            StreamEvent::Termination => {
                self.terminated = true;
                transcript.close_stream();
                Flow::Stop
            }
        }
    }
}

pub struct StreamSession {
    guard: SessionGuard,
    target: String,
    decoder: EventDecoder,
    state: StreamState,
    phase: StreamPhase,
    abort_handle: AbortHandle,
    abort_registration: Option<AbortRegistration>,
}

impl StreamSession {
    fn new(guard: SessionGuard, target: String) -> Self {
        let (abort_handle, registration) = AbortHandle::new_pair();
        Self {
            guard,
            target,
            decoder: EventDecoder::new(),
            state: StreamState::default(),
            phase: StreamPhase::Idle,
            abort_handle,
            abort_registration: Some(registration),
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Id of the assistant message this session writes to.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn generation(&self) -> u64 {
        self.guard.generation()
    }

    pub fn answer(&self) -> &str {
        &self.state.accumulated
    }

    pub fn terminated(&self) -> bool {
        self.state.terminated
    }

    /// Handle that releases this session's read loop in [`pump`].
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    fn is_live(&self, transcript: &Transcript) -> bool {
        self.guard.is_current() && transcript.open_message_id() == Some(self.target.as_str())
    }

    /// Move to `Cancelled` if this session no longer owns the open message.
    fn check_live(&mut self, transcript: &Transcript) -> bool {
        if self.is_live(transcript) {
            return true;
        }
        if !self.phase.is_terminal() {
            debug!(generation = self.guard.generation(), "stale session, dropping events");
            self.decoder.finish();
            self.phase = StreamPhase::Cancelled;
        }
        false
    }

    /// Process one transport chunk. Every event it completes is applied
    /// synchronously, in order, before this returns.
    pub fn feed(&mut self, chunk: &[u8], transcript: &mut Transcript) -> Flow {
        if self.phase.is_terminal() || !self.check_live(transcript) {
            return Flow::Stop;
        }
        self.phase = StreamPhase::Streaming;

        let mut flow = Flow::Continue;
        let mut stale = false;
        for event in self.decoder.push(chunk) {
            if !(self.guard.is_current()
                && transcript.open_message_id() == Some(self.target.as_str()))
            {
                stale = true;
                break;
            }
            flow = self.state.apply(event, transcript);
            if flow == Flow::Stop {
                break;
            }
        }

        if stale {
            self.check_live(transcript);
            return Flow::Stop;
        }
        if flow == Flow::Stop {
            let dropped = self.decoder.finish();
            debug!(dropped, "termination marker received");
            self.phase = StreamPhase::Completed;
        }
        flow
    }

    /// The transport closed without a termination marker.
    pub fn finish(&mut self, transcript: &mut Transcript) {
        if self.phase.is_terminal() || !self.check_live(transcript) {
            return;
        }
        let dropped = self.decoder.finish();
        if dropped > 0 {
            debug!(dropped, "stream closed mid-line");
        }
        transcript.close_stream();
        self.phase = StreamPhase::Completed;
    }

    /// The transport failed. The open message shows a single error instead of
    /// the partial answer.
    pub fn fail(&mut self, error: &str, transcript: &mut Transcript) {
        if self.phase.is_terminal() || !self.check_live(transcript) {
            return;
        }
        warn!(generation = self.guard.generation(), "answer stream failed: {error}");
        self.decoder.finish();
        transcript.fail_stream(STREAM_FAILED_MESSAGE);
        self.phase = StreamPhase::Failed;
    }
}

/// Shared, mutable access to the transcript a session writes into.
pub trait TranscriptSink {
    fn update(&self, f: impl FnOnce(&mut Transcript));
}

impl TranscriptSink for RefCell<Transcript> {
    fn update(&self, f: impl FnOnce(&mut Transcript)) {
        f(&mut self.borrow_mut());
    }
}

impl TranscriptSink for Mutex<Transcript> {
    fn update(&self, f: impl FnOnce(&mut Transcript)) {
        let mut guard = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }
}

impl<T: TranscriptSink + ?Sized> TranscriptSink for Rc<T> {
    fn update(&self, f: impl FnOnce(&mut Transcript)) {
        (**self).update(f);
    }
}

impl<T: TranscriptSink + ?Sized> TranscriptSink for Arc<T> {
    fn update(&self, f: impl FnOnce(&mut Transcript)) {
        (**self).update(f);
    }
}

/// How a pumped session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    pub phase: StreamPhase,
    pub message_id: String,
    pub answer: String,
}

/// Drive `session` from `chunks` until termination, transport close,
/// transport error or cancellation.
///
/// Suspends once per chunk read; everything else runs synchronously.
pub async fn pump<S, B, E, K>(mut session: StreamSession, chunks: S, sink: &K) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    K: TranscriptSink + ?Sized,
{
    if let Some(registration) = session.abort_registration.take() {
        let chunks = Abortable::new(chunks, registration);
        pin_mut!(chunks);

        while let Some(item) = chunks.next().await {
            match item {
                Ok(bytes) => {
                    let mut flow = Flow::Continue;
                    sink.update(|t| flow = session.feed(bytes.as_ref(), t));
                    if flow == Flow::Stop {
                        break;
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    sink.update(|t| session.fail(&message, t));
                    break;
                }
            }
        }
    }

    if !session.phase.is_terminal() {
        if session.abort_handle.is_aborted() {
            session.decoder.finish();
            session.phase = StreamPhase::Cancelled;
        } else {
            sink.update(|t| session.finish(t));
        }
    }

    info!(
        generation = session.generation(),
        phase = ?session.phase,
        answer_len = session.answer().len(),
        "answer stream ended"
    );
    StreamOutcome {
        phase: session.phase,
        message_id: session.target.clone(),
        answer: std::mem::take(&mut session.state.accumulated),
    }
}

/// Owns the "one open assistant message" policy: a new submission cancels the
/// stream that is still running and closes its message before opening another.
#[derive(Debug, Default)]
pub struct ChatController {
    current: Arc<AtomicU64>,
    active: Option<AbortHandle>,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_query(query: &str) -> Result<&str, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::EmptyField { field_name: "query".to_string() });
        }
        if query.len() > MAX_QUERY_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "query".to_string(),
                max_length: MAX_QUERY_LENGTH,
                actual_length: query.len(),
            });
        }
        Ok(query)
    }

    /// Record the user's turn and open the assistant message the returned
    /// session will stream into.
    pub fn submit(
        &mut self,
        transcript: &mut Transcript,
        query: &str,
    ) -> Result<StreamSession, AppError> {
        let query = Self::validate_query(query)?;
        self.cancel_active(transcript);

        transcript.append_user_message(query);
        let target = transcript.open_assistant_message();
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = SessionGuard { generation, current: Arc::clone(&self.current) };

        let session = StreamSession::new(guard, target);
        self.active = Some(session.abort_handle());
        debug!(generation, "stream session opened");
        Ok(session)
    }

    /// Release the running stream, if any, and close its message.
    pub fn cancel_active(&mut self, transcript: &mut Transcript) {
        if let Some(handle) = self.active.take() {
            self.current.fetch_add(1, Ordering::SeqCst);
            handle.abort();
            if transcript.close_stream() {
                info!("previous answer stream cancelled");
            }
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}
