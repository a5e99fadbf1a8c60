use leptos::html::Canvas;
use leptos::prelude::*;
use leptos::task::spawn_local;

use rag_chat::deeplink::CitationLink;
use rag_chat::models::Citation;
use rag_chat::preview::{open_preview, PreviewState, DEFAULT_RENDER_SCALE};

use crate::pdf::PdfJsRasterizer;

/// Modal showing the cited page with the answer's region highlighted.
#[component]
pub fn PdfPreviewModal(citation: Citation, #[prop(into)] on_close: Callback<()>) -> impl IntoView {
    let canvas_ref = NodeRef::<Canvas>::new();
    let preview = RwSignal::new(PreviewState::Loading);

    let to_render = citation.clone();
    Effect::new(move |_| {
        let Some(canvas) = canvas_ref.get() else {
            return;
        };
        let citation = to_render.clone();
        spawn_local(async move {
            let rasterizer = PdfJsRasterizer { canvas };
            let state = open_preview(&rasterizer, &citation, DEFAULT_RENDER_SCALE).await.into();
            // the modal may have been closed meanwhile
            let _ = preview.try_set(state);
        });
    });

    // hidden unless this render produced a drawable box
    let overlay_style = move || match preview.get() {
        PreviewState::Ready(p) => match p.overlay {
            Some(rect) => format!("display:block;{}", rect.to_css()),
            None => "display:none;".to_string(),
        },
        _ => "display:none;".to_string(),
    };

    view! {
        <div class="modal-backdrop">
            <div class="modal">
                <button class="modal-close" on:click=move |_| on_close.run(())>"Close"</button>
                <div class="modal-header">
                    <div class="modal-title">{citation.doc_title.clone()}</div>
                    <div class="modal-meta">{format!("Page {}", citation.page)}</div>
                </div>
                <div class="modal-body">
                    {move || match preview.get() {
                        PreviewState::Loading => Some(view! {
                            <div class="page-status">"Loading page…"</div>
                        }.into_any()),
                        PreviewState::Failed(err) => Some(view! {
                            <div class="page-status error">{err}</div>
                        }.into_any()),
                        PreviewState::Ready(_) => None,
                    }}
                    <div class="page-frame">
                        <canvas node_ref=canvas_ref class="page-canvas" />
                        <div class="highlight-overlay" style=overlay_style aria-hidden="true" />
                    </div>
                </div>
            </div>
        </div>
    }
}

/// Standalone `/viewer?pdf_url=..&page=..` page opened from "Open in new tab".
#[component]
pub fn ViewerPage() -> impl IntoView {
    let search = window().location().search().unwrap_or_default();
    let open = RwSignal::new(true);

    match CitationLink::parse_query(&search) {
        Ok(link) => {
            let citation = link.into_citation();
            view! {
                <Show
                    when=move || open.get()
                    fallback=|| view! { <div class="page-status">"Closed"</div> }
                >
                    <PdfPreviewModal citation=citation.clone() on_close=move |_| open.set(false) />
                </Show>
            }
            .into_any()
        }
        Err(e) => {
            log::warn!("Bad viewer link {search}: {e}");
            view! { <div class="error-banner">{e.to_string()}</div> }.into_any()
        }
    }
}
