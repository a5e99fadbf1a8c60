use leptos::prelude::*;

use rag_chat::deeplink::CitationLink;
use rag_chat::models::Citation;

use crate::state::AppState;

/// Collapsible list of the sources cited by an answer.
#[component]
pub fn SourcesList(citations: Vec<Citation>) -> impl IntoView {
    let state = expect_context::<AppState>();
    let (open, set_open) = signal(false);

    let items = citations
        .into_iter()
        .map(|citation| {
            let href = CitationLink::from_citation(&citation).viewer_url();
            let meta = match citation.score {
                Some(score) => format!("Page {} • score {score:.2}", citation.page),
                None => format!("Page {}", citation.page),
            };
            let title = citation.doc_title.clone();
            let snippet = citation.snippet.clone();

            view! {
                <li class="source-item">
                    <div class="source-text">
                        <div class="source-title">{title}</div>
                        <div class="source-meta">{meta}</div>
                        <div class="source-snippet">{snippet}</div>
                    </div>
                    <div class="source-actions">
                        <a href=href target="_blank" rel="noreferrer">"Open in new tab"</a>
                        <button on:click=move |_| state.open_preview(citation.clone())>
                            "Preview here"
                        </button>
                    </div>
                </li>
            }
        })
        .collect_view();

    view! {
        <div class="sources">
            <button class="sources-toggle" on:click=move |_| set_open.update(|o| *o = !*o)>
                {move || if open.get() { "Hide sources ↑" } else { "Show sources ↓" }}
            </button>
            <ul class="source-list" style:display=move || if open.get() { "block" } else { "none" }>
                {items}
            </ul>
        </div>
    }
}
