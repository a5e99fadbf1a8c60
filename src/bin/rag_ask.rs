//! Terminal client: stream one answer and list its sources.

use std::cell::RefCell;
use std::io::Write;

use clap::Parser;
use tracing::warn;

use rag_chat::config::AppConfig;
use rag_chat::deeplink::CitationLink;
use rag_chat::models::MessageStatus;
use rag_chat::service::backend_client::BackendClient;
use rag_chat::session::{ChatController, StreamPhase, TranscriptSink};
use rag_chat::transcript::Transcript;

#[derive(Parser, Debug)]
#[command(name = "rag_ask", about = "Ask the document-grounded assistant a question")]
struct Args {
    /// Backend root URL (defaults to RAG_BACKEND_URL or http://127.0.0.1:8000)
    #[arg(long)]
    backend: Option<String>,

    /// Skip the sources listing
    #[arg(long)]
    no_sources: bool,

    /// The question
    #[arg(required = true)]
    question: Vec<String>,
}

/// Renders the assistant message to `out` as the transcript changes. After
/// the first write error nothing more is rendered; the stream still completes.
struct TerminalSink<W: Write> {
    transcript: RefCell<Transcript>,
    shown: RefCell<String>,
    out: RefCell<Option<W>>,
}

impl<W: Write> TerminalSink<W> {
    fn new(out: W) -> Self {
        Self {
            transcript: RefCell::new(Transcript::new()),
            shown: RefCell::new(String::new()),
            out: RefCell::new(Some(out)),
        }
    }

    fn is_broken(&self) -> bool {
        self.out.borrow().is_none()
    }

    fn render(&self, content: &str) {
        let mut slot = self.out.borrow_mut();
        let Some(out) = slot.as_mut() else {
            return;
        };
        let mut shown = self.shown.borrow_mut();
        let written = match content.strip_prefix(shown.as_str()) {
            Some(delta) => out.write_all(delta.as_bytes()),
            // final frame superseded the streamed tokens
            None => write!(out, "\n\n{content}"),
        }
        .and_then(|()| out.flush());

        match written {
            Ok(()) => content.clone_into(&mut shown),
            Err(e) => {
                warn!("stopped rendering the answer: {e}");
                *slot = None;
            }
        }
    }
}

impl<W: Write> TranscriptSink for TerminalSink<W> {
    fn update(&self, f: impl FnOnce(&mut Transcript)) {
        let mut transcript = self.transcript.borrow_mut();
        f(&mut transcript);
        if let Some(msg) = transcript.last_assistant() {
            if msg.status != MessageStatus::Failed {
                self.render(&msg.content);
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_chat=warn".into()),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;
    let backend = BackendClient::new(args.backend.as_deref().unwrap_or(&config.backend_url));

    let sink = TerminalSink::new(std::io::stdout().lock());
    let mut controller = ChatController::new();
    let outcome = backend.ask(&mut controller, &sink, &args.question.join(" ")).await?;
    if sink.is_broken() {
        anyhow::bail!("stdout closed while the answer was streaming");
    }
    println!();

    if outcome.phase == StreamPhase::Failed {
        anyhow::bail!("the answer stream broke off; partial output above is incomplete");
    }
    if args.no_sources {
        return Ok(());
    }

    let transcript = sink.transcript.borrow();
    let citations = transcript
        .get(&outcome.message_id)
        .map(|m| m.citations.as_slice())
        .unwrap_or_default();
    if !citations.is_empty() {
        println!("\nSources:");
    }
    for (i, c) in citations.iter().enumerate() {
        let score = c.score.map(|s| format!(" • score {s:.2}")).unwrap_or_default();
        println!("  [{}] {} (page {}){score}", i + 1, c.doc_title, c.page);
        if !c.snippet.is_empty() {
            println!("      {}", c.snippet);
        }
        let link = CitationLink::from_citation(c);
        println!("      {}{}", config.public_origin(), link.viewer_url());
    }
    Ok(())
}
