use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chunk awaiting insertion: everything the caller supplies before the
/// Store assigns it an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    pub source: String,
    pub part_id: String,
    pub content: String,
    /// Precomputed by the caller so that identical content is embedded
    /// exactly once even when it recurs across chunks or documents within
    /// the same build; the Store never calls the embedder itself.
    pub embedding: Vec<f32>,
}

/// The unit of retrieval. `id` is store-assigned and monotone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub source: String,
    pub part_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A `(id, content)` pair as returned by the raw search operators. Kept
/// separate from `Chunk` because `search_fts`/`search_vec` never need to
/// round-trip `source`/`part_id`/`created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: i64,
    pub content: String,
}
