use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::AbortController;

use rag_chat::models::{ChatMessage, Citation};
use rag_chat::session::{pump, ChatController, StreamPhase, TranscriptSink};
use rag_chat::transcript::Transcript;

use crate::api;

/// Lets a stream session write straight into the transcript signal; every
/// mutation notifies the views subscribed to it.
#[derive(Clone, Copy)]
pub struct SignalSink(pub RwSignal<Transcript>);

impl TranscriptSink for SignalSink {
    fn update(&self, f: impl FnOnce(&mut Transcript)) {
        self.0.update(f);
    }
}

/// Shared application state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct AppState {
    pub transcript: RwSignal<Transcript>,
    pub error: RwSignal<Option<String>>,
    /// Citation shown in the preview modal.
    pub preview: RwSignal<Option<Citation>>,
    controller: StoredValue<ChatController>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let state = Self {
            transcript: RwSignal::new(Transcript::new()),
            error: RwSignal::new(None),
            preview: RwSignal::new(None),
            controller: StoredValue::new(ChatController::new()),
        };
        provide_context(state);
        state
    }

    pub fn is_streaming(&self) -> bool {
        self.transcript.with(|t| t.is_streaming())
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.with(|t| t.messages().to_vec())
    }

    /// Submit a query and stream its answer into the transcript. A stream that
    /// is still running is cancelled first; its late frames are dropped.
    pub fn send_message(&self, text: String) {
        let transcript = self.transcript;
        let mut submitted = None;
        self.controller.update_value(|controller| {
            transcript.update(|t| submitted = Some(controller.submit(t, &text)));
        });

        let mut session = match submitted {
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                self.error.set(Some(e.to_string()));
                return;
            }
            None => return,
        };
        self.error.set(None);

        let sink = SignalSink(transcript);
        spawn_local(async move {
            let abort = AbortController::new().ok();
            let signal = abort.as_ref().map(|a| a.signal());

            match api::open_chat_stream(&text, signal.as_ref()).await {
                Ok(chunks) => {
                    let outcome = pump(session, chunks, &sink).await;
                    if outcome.phase == StreamPhase::Cancelled {
                        // release the connection the superseded stream still holds
                        if let Some(abort) = abort {
                            abort.abort();
                        }
                    }
                }
                Err(e) => {
                    log::error!("Failed to open answer stream: {e}");
                    sink.update(|t| session.fail(&e, t));
                }
            }
        });
    }

    pub fn open_preview(&self, citation: Citation) {
        self.preview.set(Some(citation));
    }

    pub fn close_preview(&self) {
        self.preview.set(None);
    }
}
