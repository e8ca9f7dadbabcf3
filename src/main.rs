mod cli;
mod config;
mod document;
mod embeddings;
mod llm;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, EXAMPLE_PROMPT};
use crate::config::Settings;
use crate::document::PdfLoader;
use crate::embeddings::GeminiEmbeddings;
use crate::llm::{CompletionError, LlmClient, RagContext};
use crate::ui::Console;

const EXHAUSTED_MESSAGE: &str = "Maximum number of attempts reached. Please try again later.";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load()?;
    let console = Console::new();

    match cli.command {
        Some(Commands::Complete { prompt }) => {
            let client = LlmClient::from_settings(&settings)?;
            complete(&console, &client, &prompt).await?;
        }
        Some(Commands::Ask { prompt }) => {
            let client = LlmClient::from_settings(&settings)?;
            let text = client.complete_once(&prompt).await?;
            console.completion(&text);
        }
        Some(Commands::Rag { pdf, query, top_k }) => {
            let client = LlmClient::from_settings(&settings)?;
            rag(&console, &settings, &client, Path::new(&pdf), &query, top_k).await?;
        }
        Some(Commands::Config) => {
            console.show_config(&settings);
        }
        None => {
            let client = LlmClient::from_settings(&settings)?;
            complete(&console, &client, EXAMPLE_PROMPT).await?;
        }
    }

    Ok(())
}

/// Print the completion, or the fixed notice when rate limiting outlasted
/// every attempt. Any other failure propagates.
async fn complete(console: &Console, client: &LlmClient, prompt: &str) -> Result<()> {
    tracing::debug!(
        "Requesting completion from {} (up to {} attempts)",
        client.model(),
        client.retry_policy().max_attempts
    );

    match client.get_completion(prompt).await {
        Ok(text) => console.completion(&text),
        Err(CompletionError::RetryExhausted { attempts, .. }) => {
            tracing::debug!("Retry budget of {} attempts used up", attempts);
            console.notice(EXHAUSTED_MESSAGE);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn rag(
    console: &Console,
    settings: &Settings,
    client: &LlmClient,
    pdf: &Path,
    query: &str,
    top_k: Option<usize>,
) -> Result<()> {
    console.info("Start reading..");
    let pages = PdfLoader::load(pdf)?;
    if pages.is_empty() {
        anyhow::bail!("No extractable text found in {}", pdf.display());
    }

    console.info("Start embedding..");
    let api_key = settings.get_api_key().unwrap_or_default();
    let embeddings = GeminiEmbeddings::new(
        api_key,
        settings.request_timeout_secs.map(Duration::from_secs),
    )?
    .with_model(&settings.embedding_model, 768)
    .with_base_url(settings.base_url());

    let mut config = settings.rag.config();
    if let Some(k) = top_k {
        config.top_k = k.max(1);
    }

    let mut context = RagContext::new(Arc::new(embeddings), config);
    context
        .add_documents(pages)
        .await
        .context("Failed to embed PDF pages")?;
    if context.document_count() == 0 {
        anyhow::bail!("No pages of {} could be indexed", pdf.display());
    }
    tracing::info!("{} pages indexed", context.document_count());

    match context.answer(client, query).await {
        Ok(answer) => console.rag_answer(&answer),
        Err(e) if llm::is_retry_exhausted(&e) => console.notice(EXHAUSTED_MESSAGE),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "promptly=debug" } else { "promptly=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
