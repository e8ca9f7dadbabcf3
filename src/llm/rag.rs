// ============================================
// PROMPTLY - Retrieval-Augmented Answers
// ============================================

use anyhow::Result;
use std::sync::Arc;

use super::client::LlmClient;
use super::error::CompletionError;
use crate::document::Document;
use crate::embeddings::{EmbeddingProvider, EmbeddingStore, SearchResult, StoredEmbedding};

/// Configuration for retrieval and prompt stuffing
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Number of pages handed to the model
    pub top_k: usize,
    /// Upper bound on the stuffed context, in characters
    pub max_context_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            max_context_chars: 12_000,
        }
    }
}

/// Answer plus the pages it was grounded on, best match first
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Document>,
}

/// Indexes documents and answers questions from the closest matches
pub struct RagContext {
    provider: Arc<dyn EmbeddingProvider>,
    store: EmbeddingStore,
    config: RagConfig,
}

impl RagContext {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RagConfig) -> Self {
        let dimension = provider.dimension();
        Self {
            provider,
            store: EmbeddingStore::new(dimension),
            config,
        }
    }

    /// Embed and index documents; returns how many were stored
    pub async fn add_documents(&mut self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let total = documents.len();
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;

        // The configured dimension is only a hint; the first batch decides.
        if let Some(first) = embeddings.first() {
            if first.is_empty() {
                anyhow::bail!("{} returned an empty embedding", self.provider.model_name());
            }
            if self.store.is_empty() && first.len() != self.store.dimension() {
                tracing::debug!(
                    "{} returns {}-d vectors, not {}",
                    self.provider.model_name(),
                    first.len(),
                    self.store.dimension()
                );
                self.store = EmbeddingStore::new(first.len());
            }
        }

        let mut added = 0;
        for (doc, embedding) in documents.into_iter().zip(embeddings) {
            let stored = StoredEmbedding {
                id: doc.id,
                text: doc.content,
                embedding,
                metadata: doc.metadata,
            };
            if self.store.add(stored) {
                added += 1;
            }
        }

        if added == 0 {
            anyhow::bail!(
                "None of {} documents could be indexed with {}",
                total,
                self.provider.model_name()
            );
        }

        tracing::info!(
            "Indexed {} documents with {}",
            added,
            self.provider.model_name()
        );
        Ok(added)
    }

    /// Retrieve the `top_k` documents closest to `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        if self.store.is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = self.provider.embed(query).await?;
        let results = self.store.search(&query_embedding, self.config.top_k);

        for r in &results {
            tracing::debug!("Retrieved {} (score {:.3})", r.id, r.score);
        }

        Ok(results.into_iter().map(into_document).collect())
    }

    /// Concatenate retrieved pages into one context block, stopping at
    /// `max_context_chars`.
    pub fn build_context(&self, docs: &[Document]) -> String {
        let mut context = String::new();

        for doc in docs {
            let remaining = self.config.max_context_chars.saturating_sub(context.len());
            if remaining == 0 {
                break;
            }

            let entry = format!("{}\n\n", doc.content);
            if entry.len() <= remaining {
                context.push_str(&entry);
            } else {
                let truncated: String = doc
                    .content
                    .chars()
                    .scan(0, |used, c| {
                        *used += c.len_utf8();
                        (*used <= remaining).then_some(c)
                    })
                    .collect();
                context.push_str(&truncated);
                break;
            }
        }

        context.trim_end().to_string()
    }

    /// Build the question-answering prompt around the retrieved context
    pub fn build_prompt(&self, question: &str, docs: &[Document]) -> String {
        format!(
            "Use the following pieces of context to answer the question at the end. \
             If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
             {}\n\nQuestion: {}\nHelpful Answer:",
            self.build_context(docs),
            question
        )
    }

    /// Retrieve context for `question` and ask the model
    pub async fn answer(&self, client: &LlmClient, question: &str) -> Result<RagAnswer> {
        let sources = self.retrieve(question).await?;
        let prompt = self.build_prompt(question, &sources);

        let answer = client
            .get_completion(&prompt)
            .await
            .map_err(anyhow::Error::new)?;

        Ok(RagAnswer {
            question: question.to_string(),
            answer,
            sources,
        })
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }
}

fn into_document(result: SearchResult) -> Document {
    Document {
        id: result.id,
        content: result.text,
        metadata: result.metadata,
    }
}

/// True when a RAG failure bottomed out in retry exhaustion
pub fn is_retry_exhausted(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CompletionError>()
        .is_some_and(CompletionError::is_retry_exhausted)
}
