// ============================================
// PROMPTLY - In-Memory Embedding Store
// ============================================

use std::collections::HashMap;

use super::{cosine_similarity, Embedding};

/// Stored embedding with metadata
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub id: String,
    pub text: String,
    pub embedding: Embedding,
    pub metadata: HashMap<String, String>,
}

/// Search result with similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub metadata: HashMap<String, String>,
}

/// Brute-force cosine search over embeddings held in memory. Nothing is
/// written to disk; the store lives as long as one run.
pub struct EmbeddingStore {
    embeddings: Vec<StoredEmbedding>,
    dimension: usize,
    id_index: HashMap<String, usize>,
}

impl EmbeddingStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            embeddings: Vec::new(),
            dimension,
            id_index: HashMap::new(),
        }
    }

    /// Add an embedding; an existing id is replaced in place.
    ///
    /// Returns false when the vector has the wrong dimension.
    pub fn add(&mut self, embedding: StoredEmbedding) -> bool {
        if embedding.embedding.len() != self.dimension {
            tracing::warn!(
                "Embedding dimension mismatch for {}: expected {}, got {}",
                embedding.id,
                self.dimension,
                embedding.embedding.len()
            );
            return false;
        }

        match self.id_index.get(&embedding.id) {
            Some(&idx) => self.embeddings[idx] = embedding,
            None => {
                self.id_index
                    .insert(embedding.id.clone(), self.embeddings.len());
                self.embeddings.push(embedding);
            }
        }
        true
    }

    /// Search for the `top_k` most similar embeddings, best first
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        if query_embedding.len() != self.dimension {
            tracing::warn!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimension,
                query_embedding.len()
            );
            return vec![];
        }

        let mut results: Vec<_> = self
            .embeddings
            .iter()
            .map(|emb| SearchResult {
                id: emb.id.clone(),
                text: emb.text.clone(),
                score: cosine_similarity(query_embedding, &emb.embedding),
                metadata: emb.metadata.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        results
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}
