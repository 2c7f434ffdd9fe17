//! Content-addressed embedding cache shared between the index and query
//! paths. Grounded on spec's placement of the embedding cache on the
//! search facade as shared, mutex-guarded, process-lifetime state: the
//! same text always maps to the same vector, so entries are never
//! invalidated, and both `IndexManager` (batch document content) and
//! `QueryEngine` (single query strings) consult the one cache instance the
//! facade hands them.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use vaultrag_common::{collaborators::Embedder, error::AppError};

pub struct EmbeddingCache {
    embedder: std::sync::Arc<dyn Embedder>,
    entries: Mutex<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new(embedder: std::sync::Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Embeds every distinct string in `contents` not already cached, in a
    /// single batch call, then returns one vector per input (in order),
    /// cloning from the cache for repeats. Duplicate content across the
    /// whole batch is embedded once.
    pub fn embed_batch(&self, contents: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let to_embed: Vec<String> = {
            let cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            let mut requested = HashSet::new();
            contents
                .iter()
                .filter(|content| !cache.contains_key(*content) && requested.insert((*content).clone()))
                .cloned()
                .collect()
        };

        if !to_embed.is_empty() {
            let vectors = self.embedder.embed_batch(&to_embed)?;
            if vectors.len() != to_embed.len() {
                return Err(AppError::ExternalModuleError(format!(
                    "embedder returned {} vectors for {} inputs",
                    vectors.len(),
                    to_embed.len()
                )));
            }
            let mut cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            for (content, vector) in to_embed.into_iter().zip(vectors) {
                cache.insert(content, vector);
            }
        }

        let cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        contents
            .iter()
            .map(|content| {
                cache.get(content).cloned().ok_or_else(|| {
                    AppError::ExternalModuleError(format!("no cached embedding for content '{content}'"))
                })
            })
            .collect()
    }

    /// Embeds a single string, consulting/populating the same cache
    /// `embed_batch` uses.
    pub fn embed_one(&self, content: &str) -> Result<Vec<f32>, AppError> {
        let owned = content.to_string();
        self.embed_batch(std::slice::from_ref(&owned))
            .map(|mut v| v.remove(0))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultrag_common::collaborators::HashingEmbedder;

    #[test]
    fn duplicate_content_is_embedded_once() {
        let cache = EmbeddingCache::new(std::sync::Arc::new(HashingEmbedder::default()));
        let contents = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let vectors = cache.embed_batch(&contents).unwrap();
        assert_eq!(vectors[0], vectors[2]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn embed_one_reuses_batch_cache() {
        let cache = EmbeddingCache::new(std::sync::Arc::new(HashingEmbedder::default()));
        let from_batch = cache.embed_batch(&["shared".to_string()]).unwrap().remove(0);
        let from_single = cache.embed_one("shared").unwrap();
        assert_eq!(from_batch, from_single);
        assert_eq!(cache.len(), 1);
    }
}
