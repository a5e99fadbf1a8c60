mod api;
mod components;
mod pdf;
mod state;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::chat::ChatArea;
use components::viewer::{PdfPreviewModal, ViewerPage};
use rag_chat::deeplink::VIEWER_PATH;
use state::AppState;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    let path = window().location().pathname().unwrap_or_default();
    if path == VIEWER_PATH {
        return view! { <ViewerPage /> }.into_any();
    }

    view! {
        <main class="app-container">
            <ChatArea />
            {move || {
                state.preview.get().map(|citation| {
                    view! {
                        <PdfPreviewModal citation=citation on_close=move |_| state.close_preview() />
                    }
                })
            }}
        </main>
    }
    .into_any()
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
