//! In-memory vector store.
//!
//! Built once at startup from the loaded documents and read-only afterwards.
//! Retrieval is brute-force cosine similarity over every stored vector,
//! which is plenty for a hand-maintained document set.

use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{cosine_similarity, create_provider, EmbeddingProvider};
use crate::loader::load_all;
use crate::models::Document;

struct StoredVector {
    document: Document,
    vector: Vec<f32>,
}

/// A retrieved document together with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Immutable document index.
///
/// There is no insert after construction: [`VectorStore::index`] is the only
/// way to populate a store, so concurrent queries never observe a partial
/// build.
pub struct VectorStore {
    entries: Vec<StoredVector>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl VectorStore {
    /// Embed `documents` in batches of `batch_size` and build the index.
    pub async fn index(
        documents: Vec<Document>,
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let mut entries = Vec::with_capacity(documents.len());

        for batch in documents.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let vectors = provider.embed_texts(&texts).await?;
            if vectors.len() != batch.len() {
                bail!(
                    "Embedding provider returned {} vectors for {} documents",
                    vectors.len(),
                    batch.len()
                );
            }
            for (document, vector) in batch.iter().zip(vectors) {
                entries.push(StoredVector {
                    document: document.clone(),
                    vector,
                });
            }
        }

        tracing::info!(
            documents = entries.len(),
            model = provider.model_name(),
            "vector store indexed"
        );

        Ok(Self { entries, provider })
    }

    /// Load the configured document files and index them with the
    /// configured embedding provider.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let documents = load_all(&config.documents.paths)?;
        let provider: Arc<dyn EmbeddingProvider> = create_provider(&config.embedding)?.into();
        Self::index(documents, provider, config.embedding.batch_size).await
    }

    /// Return the `k` documents most similar to `text`, best first.
    ///
    /// Equal scores keep insertion order.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self.provider.embed_query(text).await?;
        Ok(self.query_vector(&query_vec, k))
    }

    /// Rank stored documents against an already-computed query vector.
    pub fn query_vector(&self, query_vec: &[f32], k: usize) -> Vec<ScoredDocument> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, sv)| (i, cosine_similarity(query_vec, &sv.vector)))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredDocument {
                document: self.entries[i].document.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter().map(|sv| &sv.document)
    }
}
