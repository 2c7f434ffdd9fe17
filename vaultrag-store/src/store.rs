use async_trait::async_trait;
use vaultrag_common::{
    chunk::{Chunk, NewChunk, ScoredId},
    error::AppError,
    vault::VaultName,
};

/// Persistent, crash-consistent storage for chunks and their two indices,
/// plus the primitive search operators.
///
/// Implementations own all on-disk state; callers never see SQL or engine
/// details. All methods run on the implementation's dedicated executor —
/// the trait is `async` only so callers can await alongside other work,
/// not because the work itself is non-blocking.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates the vault's three relations the first time it is seen.
    /// Idempotent. `VaultName` already guarantees the reserved-suffix
    /// invariant, so this never needs to reject on that basis.
    async fn ensure_vault(&self, vault: &VaultName) -> Result<(), AppError>;

    /// Appends chunks, maintaining both indices. All-or-nothing per call.
    async fn insert(&self, vault: &VaultName, chunks: Vec<NewChunk>) -> Result<Vec<Chunk>, AppError>;

    async fn has_source(&self, vault: &VaultName, source: &str) -> Result<bool, AppError>;

    /// Returns the number of chunks removed.
    async fn delete_source(&self, vault: &VaultName, source: &str) -> Result<usize, AppError>;

    /// Refreshes lexical index structures. A no-op for backends that
    /// maintain the index incrementally.
    async fn rebuild_fts(&self, vault: &VaultName) -> Result<(), AppError>;

    /// BM25 ranking, best match first, ties broken by ascending id.
    async fn search_fts(
        &self,
        vault: &VaultName,
        query_tokens: &[String],
        top_n: usize,
    ) -> Result<Vec<ScoredId>, AppError>;

    /// Euclidean (L2) distance ranking, closest first, ties broken by
    /// ascending id.
    async fn search_vec(
        &self,
        vault: &VaultName,
        query_vec: &[f32],
        top_n: usize,
    ) -> Result<Vec<ScoredId>, AppError>;

    /// Destroys all vaults.
    async fn reset(&self) -> Result<(), AppError>;

    /// The fixed embedding dimension this store's vector relations use.
    fn dims(&self) -> usize;
}
