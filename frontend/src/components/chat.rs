use leptos::ev;
use leptos::prelude::*;

use rag_chat::models::{ChatMessage, MessageRole, MessageStatus};

use crate::components::sources::SourcesList;
use crate::state::AppState;

/// Main chat area with the transcript and the input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <section class="chat-area">
            <h1 class="chat-header">"Knowledge Chatbot"</h1>

            // Error banner
            {move || {
                state.error.get().map(|err| {
                    view! {
                        <div class="error-banner">{err}</div>
                    }
                })
            }}

            // Messages; re-rendered on every transcript mutation
            <div class="messages-container">
                {move || {
                    let msgs = state.messages();
                    if msgs.is_empty() {
                        view! {
                            <div class="empty-state">"Ask about your documents"</div>
                        }.into_any()
                    } else {
                        msgs.into_iter()
                            .map(|message| view! { <MessageBubble message=message /> })
                            .collect_view()
                            .into_any()
                    }
                }}
            </div>

            <ChatInput />
        </section>
    }
}

/// A single chat message bubble, with its sources once the final frame arrived.
#[component]
fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let css_class = match (message.role, message.status) {
        (MessageRole::User, _) => "message user",
        (MessageRole::Assistant, MessageStatus::Failed) => "message assistant failed",
        (MessageRole::Assistant, _) => "message assistant",
    };
    let thinking = message.is_open() && message.content.is_empty();
    let content = if thinking { "Thinking…".to_string() } else { message.content };
    let citations = message.citations;

    view! {
        <div class=css_class>
            <div class="role-label">{message.role.label()}</div>
            <div class:streaming-cursor=message.status == MessageStatus::Open>{content}</div>
            {(!citations.is_empty()).then(|| view! { <SourcesList citations=citations /> })}
        </div>
    }
}

/// Chat input with textarea and ask button. Asking while an answer is still
/// streaming replaces that answer's stream.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let send = move || {
        let text = input.get().trim().to_string();
        if text.is_empty() {
            return;
        }
        set_input.set(String::new());
        state.send_message(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Ask about your documents… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || input.get().trim().is_empty()
                >
                    {move || if state.is_streaming() { "Thinking…" } else { "Ask" }}
                </button>
            </div>
        </div>
    }
}
