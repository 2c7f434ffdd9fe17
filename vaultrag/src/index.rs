//! Turns a batch of documents into stored chunks: split each, embed
//! distinct content once, insert everything under a single Store call.
//! Grounded on `original_source/src/uglyrag/_index.py`'s `build()`, with
//! the per-document skip/update and embedding-cache behavior this repo
//! adds on top of it.

use std::sync::Arc;

use tracing::warn;
use vaultrag_common::{
    chunk::{Chunk, NewChunk},
    collaborators::Splitter,
    error::AppError,
    vault::VaultName,
};
use vaultrag_store::Store;

use crate::embedding_cache::EmbeddingCache;

pub struct IndexManager {
    store: Arc<dyn Store>,
    splitter: Arc<dyn Splitter>,
    /// Shared with `QueryEngine` so content embedded while building is
    /// never re-embedded when later queried, and vice versa.
    embedding_cache: Arc<EmbeddingCache>,
}

impl IndexManager {
    pub fn new(store: Arc<dyn Store>, splitter: Arc<dyn Splitter>, embedding_cache: Arc<EmbeddingCache>) -> Self {
        Self {
            store,
            splitter,
            embedding_cache,
        }
    }

    /// Splits and inserts every document in `docs` as a single batch.
    ///
    /// `reset_db`, if set, wipes the Store before anything else runs.
    /// Within the batch: a doc with an empty `source` or empty `text` is
    /// skipped; a doc whose `source` already has chunks is skipped unless
    /// `update_existing` is set, in which case its existing chunks are
    /// deleted first; a doc whose splitter call fails is logged and
    /// skipped, the rest of the batch still proceeds. All surviving chunks
    /// are embedded (deduplicated by content) and inserted under one
    /// `Store.insert` call, followed by one `rebuild_fts`. An empty `docs`
    /// list is a silent no-op.
    pub async fn build(
        &self,
        vault: &VaultName,
        docs: Vec<(String, String)>,
        update_existing: bool,
        reset_db: bool,
    ) -> Result<Vec<Chunk>, AppError> {
        if reset_db {
            self.store.reset().await?;
            self.store.ensure_vault(vault).await?;
        }
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut new_chunks: Vec<NewChunk> = Vec::new();
        for (source, text) in docs {
            if source.is_empty() || text.is_empty() {
                continue;
            }

            if self.store.has_source(vault, &source).await? {
                if update_existing {
                    self.store.delete_source(vault, &source).await?;
                } else {
                    continue;
                }
            }

            let parts = match self.splitter.split(&text) {
                Ok(parts) => parts,
                Err(e) => {
                    warn!(source = %source, error = %e, "splitter failed, skipping document");
                    continue;
                }
            };

            for (part_id, content) in parts {
                new_chunks.push(NewChunk {
                    source: source.clone(),
                    part_id,
                    content,
                    embedding: Vec::new(),
                });
            }
        }

        if new_chunks.is_empty() {
            return Ok(Vec::new());
        }

        self.fill_embeddings(&mut new_chunks)?;

        let inserted = self.store.insert(vault, new_chunks).await?;
        self.store.rebuild_fts(vault).await?;
        Ok(inserted)
    }

    pub async fn remove_source(&self, vault: &VaultName, source: &str) -> Result<usize, AppError> {
        self.store.delete_source(vault, source).await
    }

    /// Embeds every distinct `content` not already cached, in a single
    /// batch call, then stamps the (possibly-repeated) vectors back onto
    /// `chunks`. Duplicate content across chunks is embedded once.
    fn fill_embeddings(&self, chunks: &mut [NewChunk]) -> Result<(), AppError> {
        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedding_cache.embed_batch(&contents)?;
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.embedding = vector;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;
    use vaultrag_common::chunk::ScoredId;
    use vaultrag_common::collaborators::{HashingEmbedder, ParagraphSplitter};

    #[derive(Default)]
    struct InMemoryStore {
        chunks: Mutex<StdHashMap<String, Vec<Chunk>>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl Store for InMemoryStore {
        async fn ensure_vault(&self, _vault: &VaultName) -> Result<(), AppError> {
            Ok(())
        }

        async fn insert(&self, _vault: &VaultName, new_chunks: Vec<NewChunk>) -> Result<Vec<Chunk>, AppError> {
            let mut id = self.next_id.lock().unwrap();
            let mut store = self.chunks.lock().unwrap();
            let mut inserted = Vec::new();
            for chunk in new_chunks {
                *id += 1;
                let c = Chunk {
                    id: *id,
                    source: chunk.source.clone(),
                    part_id: chunk.part_id,
                    content: chunk.content,
                    created_at: chrono::Utc::now(),
                };
                store.entry(chunk.source).or_default().push(c.clone());
                inserted.push(c);
            }
            Ok(inserted)
        }

        async fn has_source(&self, _vault: &VaultName, source: &str) -> Result<bool, AppError> {
            Ok(self.chunks.lock().unwrap().contains_key(source))
        }

        async fn delete_source(&self, _vault: &VaultName, source: &str) -> Result<usize, AppError> {
            Ok(self
                .chunks
                .lock()
                .unwrap()
                .remove(source)
                .map(|v| v.len())
                .unwrap_or(0))
        }

        async fn rebuild_fts(&self, _vault: &VaultName) -> Result<(), AppError> {
            Ok(())
        }

        async fn search_fts(&self, _: &VaultName, _: &[String], _: usize) -> Result<Vec<ScoredId>, AppError> {
            Ok(Vec::new())
        }

        async fn search_vec(&self, _: &VaultName, _: &[f32], _: usize) -> Result<Vec<ScoredId>, AppError> {
            Ok(Vec::new())
        }

        async fn reset(&self) -> Result<(), AppError> {
            self.chunks.lock().unwrap().clear();
            Ok(())
        }

        fn dims(&self) -> usize {
            8
        }
    }

    fn manager() -> IndexManager {
        IndexManager::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(ParagraphSplitter),
            Arc::new(EmbeddingCache::new(Arc::new(HashingEmbedder::new(8)))),
        )
    }

    #[tokio::test]
    async fn build_splits_and_inserts() {
        let manager = manager();
        let vault = VaultName::new("T").unwrap();
        let chunks = manager
            .build(&vault, vec![("doc-a".into(), "first\n\nsecond".into())], false, false)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].part_id, "0000");
    }

    #[tokio::test]
    async fn build_skips_duplicate_source_without_update_existing() {
        let manager = manager();
        let vault = VaultName::new("T").unwrap();
        manager
            .build(&vault, vec![("doc-a".into(), "first".into())], false, false)
            .await
            .unwrap();
        let chunks = manager
            .build(&vault, vec![("doc-a".into(), "again".into())], false, false)
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn build_replaces_source_when_update_existing() {
        let manager = manager();
        let vault = VaultName::new("T").unwrap();
        manager
            .build(&vault, vec![("s".into(), "one two three".into())], false, false)
            .await
            .unwrap();
        let chunks = manager
            .build(&vault, vec![("s".into(), "four five six".into())], true, false)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "four five six");
    }

    #[tokio::test]
    async fn build_skips_empty_source_or_text() {
        let manager = manager();
        let vault = VaultName::new("T").unwrap();
        let chunks = manager
            .build(
                &vault,
                vec![("".into(), "text".into()), ("source".into(), "".into())],
                false,
                false,
            )
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn build_on_empty_doc_list_is_a_noop() {
        let manager = manager();
        let vault = VaultName::new("T").unwrap();
        let chunks = manager.build(&vault, Vec::new(), false, false).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn duplicate_content_across_chunks_is_embedded_once() {
        let manager = manager();
        let vault = VaultName::new("T").unwrap();
        let chunks = manager
            .build(
                &vault,
                vec![
                    ("a".into(), "same".into()),
                    ("b".into(), "same".into()),
                ],
                false,
                false,
            )
            .await
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(manager.embedding_cache.len(), 1);
    }

    #[tokio::test]
    async fn remove_source_returns_removed_count() {
        let manager = manager();
        let vault = VaultName::new("T").unwrap();
        manager
            .build(&vault, vec![("doc-a".into(), "first\n\nsecond".into())], false, false)
            .await
            .unwrap();
        let removed = manager.remove_source(&vault, "doc-a").await.unwrap();
        assert_eq!(removed, 2);
    }
}
