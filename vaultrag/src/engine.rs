//! Public facade: resolves configuration into concrete collaborators and a
//! Store, then exposes `build`/`search`/`remove_source`/`reset`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use vaultrag_common::{
    chunk::Chunk,
    collaborators::{
        Embedder, HashingEmbedder, IdentityReranker, ParagraphSplitter, Reranker, Segmenter,
        Splitter, WhitespaceSegmenter,
    },
    config::VaultRagConfig,
    error::AppError,
    vault::VaultName,
};
use vaultrag_store::{registry, Store};

use crate::embedding_cache::EmbeddingCache;
use crate::index::IndexManager;
use crate::query::RrfConfig;
use crate::search::{QueryEngine, SearchHit};

fn resolve_segmenter(name: &str) -> Result<Arc<dyn Segmenter>, AppError> {
    match name {
        "whitespace" => Ok(Arc::new(WhitespaceSegmenter)),
        other => Err(AppError::UsageError(format!("unknown segmenter '{other}'"))),
    }
}

fn resolve_embedder(name: &str) -> Result<Arc<dyn Embedder>, AppError> {
    match name {
        "hashing" => Ok(Arc::new(HashingEmbedder::default())),
        other => Err(AppError::UsageError(format!("unknown embedder '{other}'"))),
    }
}

fn resolve_splitter(name: &str) -> Result<Arc<dyn Splitter>, AppError> {
    match name {
        "paragraph" => Ok(Arc::new(ParagraphSplitter)),
        other => Err(AppError::UsageError(format!("unknown splitter '{other}'"))),
    }
}

fn resolve_reranker(name: Option<&str>) -> Result<Option<Arc<dyn Reranker>>, AppError> {
    match name {
        None => Ok(None),
        Some("identity") => Ok(Some(Arc::new(IdentityReranker))),
        Some(other) => Err(AppError::UsageError(format!("unknown reranker '{other}'"))),
    }
}

/// Caches vault names the Store has already confirmed exist. Only
/// successful `ensure_vault` calls are cached; a transient failure is
/// retried on the next call instead of being remembered as "missing".
struct VaultCache {
    known: Mutex<HashSet<String>>,
}

impl VaultCache {
    fn new() -> Self {
        Self {
            known: Mutex::new(HashSet::new()),
        }
    }

    fn contains(&self, vault: &VaultName) -> bool {
        self.known.lock().unwrap_or_else(|e| e.into_inner()).contains(vault.as_str())
    }

    fn mark_known(&self, vault: &VaultName) {
        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(vault.as_str().to_string());
    }

    fn clear(&self) {
        self.known.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

pub struct Engine {
    store: Arc<dyn Store>,
    index: IndexManager,
    query: QueryEngine,
    vault_cache: VaultCache,
    default_vault: VaultName,
}

impl Engine {
    pub fn new(config: VaultRagConfig) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db_path = Path::new(&config.data_dir).join(&config.db_name);

        let segmenter = resolve_segmenter(&config.segmenter)?;
        let embedder = resolve_embedder(&config.embedder)?;
        let splitter = resolve_splitter(&config.splitter)?;
        let reranker = resolve_reranker(config.reranker.as_deref())?;

        let store = registry::open_store(config.db_type, db_path, segmenter.clone(), embedder.clone())?;

        // Shared so content embedded while building a vault is never
        // re-embedded when later queried, and vice versa.
        let embedding_cache = Arc::new(EmbeddingCache::new(embedder));

        let index = IndexManager::new(store.clone(), splitter, embedding_cache.clone());
        let query = QueryEngine::new(
            store.clone(),
            segmenter,
            embedding_cache,
            reranker,
            RrfConfig {
                k: config.k,
                weight_fts: config.weight_fts,
                weight_vec: config.weight_vec,
            },
        );
        let default_vault = VaultName::new(config.default_vault)?;

        Ok(Self {
            store,
            index,
            query,
            vault_cache: VaultCache::new(),
            default_vault,
        })
    }

    fn resolve_vault(&self, vault: Option<&str>) -> Result<VaultName, AppError> {
        match vault {
            Some(name) => VaultName::new(name),
            None => Ok(self.default_vault.clone()),
        }
    }

    async fn ensure_vault_cached(&self, vault: &VaultName) -> Result<(), AppError> {
        if self.vault_cache.contains(vault) {
            return Ok(());
        }
        self.store.ensure_vault(vault).await?;
        self.vault_cache.mark_known(vault);
        Ok(())
    }

    /// Indexes `docs` (`(source, text)` pairs) as a single batch. See
    /// `IndexManager::build` for the per-document skip/update/reset rules.
    ///
    /// `reset_db` destroys every vault before the batch runs, so the
    /// existence cache is dropped rather than consulted; `IndexManager`
    /// recreates the requested vault as part of the reset.
    pub async fn build(
        &self,
        vault: Option<&str>,
        docs: Vec<(String, String)>,
        update_existing: bool,
        reset_db: bool,
    ) -> Result<Vec<Chunk>, AppError> {
        let vault = self.resolve_vault(vault)?;
        if reset_db {
            self.vault_cache.clear();
        } else {
            self.ensure_vault_cached(&vault).await?;
        }
        let result = self.index.build(&vault, docs, update_existing, reset_db).await?;
        if reset_db {
            self.vault_cache.mark_known(&vault);
        }
        Ok(result)
    }

    pub async fn remove_source(&self, vault: Option<&str>, source: &str) -> Result<usize, AppError> {
        let vault = self.resolve_vault(vault)?;
        self.ensure_vault_cached(&vault).await?;
        self.index.remove_source(&vault, source).await
    }

    pub async fn search(
        &self,
        vault: Option<&str>,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        let vault = self.resolve_vault(vault)?;
        self.ensure_vault_cached(&vault).await?;
        self.query.search(&vault, query, top_n).await
    }

    /// Destroys all vaults and drops the vault-existence cache.
    pub async fn reset(&self) -> Result<(), AppError> {
        self.store.reset().await?;
        *self.vault_cache.known.lock().unwrap_or_else(|e| e.into_inner()) = HashSet::new();
        Ok(())
    }
}
