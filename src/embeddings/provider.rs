// ============================================
// PROMPTLY - Embedding Providers
// ============================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Embedding;
use crate::llm::DEFAULT_BASE_URL;

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of documents for indexing
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single search query
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .context("No embedding returned")
    }

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Gemini embeddings via `batchEmbedContents`
pub struct GeminiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
}

/// Upstream cap on requests per batch call.
const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
    task_type: TaskType,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbeddings {
    pub fn new(api_key: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            api_key,
            model: "models/embedding-001".to_string(),
            dimension: 768,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str, dimension: usize) -> Self {
        self.model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        self.dimension = dimension;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn build_request<'a>(&'a self, texts: &'a [String], task_type: TaskType) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &self.model,
                    content: EmbedContent {
                        parts: vec![EmbedPart { text }],
                    },
                    task_type,
                })
                .collect(),
        }
    }

    async fn embed_with_task(&self, texts: &[String], task_type: TaskType) -> Result<Vec<Embedding>> {
        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);
        let mut embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(MAX_BATCH) {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&self.build_request(chunk, task_type))
                .send()
                .await
                .context("Failed to send embedding request")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Embedding API error ({}): {}", status, body);
            }

            let result: BatchEmbedResponse = response
                .json()
                .await
                .context("Failed to parse embedding response")?;

            if result.embeddings.len() != chunk.len() {
                anyhow::bail!(
                    "Embedding API returned {} vectors for {} inputs",
                    result.embeddings.len(),
                    chunk.len()
                );
            }

            embeddings.extend(result.embeddings.into_iter().map(|e| e.values));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.embed_with_task(texts, TaskType::RetrievalDocument).await
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_with_task(&[text.to_string()], TaskType::RetrievalQuery)
            .await?
            .into_iter()
            .next()
            .context("No embedding returned")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Hashed bag-of-words embeddings, for tests.
#[cfg(test)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

#[cfg(test)]
impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
            vector[bucket as usize % self.dimension] += 1.0;
        }
        vector
    }
}

#[cfg(test)]
#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}
