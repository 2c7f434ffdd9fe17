//! Dispatches lexical and vector search in parallel, fuses the results, and
//! optionally reranks the fused top-n. Grounded on
//! `original_source/src/uglyrag/_search.py`'s `SearchEngine.search`, which
//! runs both backends via `asyncio.gather` and degrades to whichever
//! succeeded if one raises.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use vaultrag_common::{
    collaborators::{Reranker, Segmenter},
    error::AppError,
    vault::VaultName,
};
use vaultrag_store::Store;

use crate::embedding_cache::EmbeddingCache;
use crate::query::{fuse, union, FusedResult, RrfConfig};

/// How many candidates to over-fetch from each backend before fusion,
/// relative to the number of results the caller asked for. RRF quality
/// degrades when the candidate lists are too short to separate close
/// scores, so we fetch more than we return.
const OVER_FETCH_FACTOR: usize = 4;
const MIN_FETCH: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub content: String,
    pub score: f32,
}

pub struct QueryEngine {
    store: Arc<dyn Store>,
    segmenter: Arc<dyn Segmenter>,
    /// Shared with `IndexManager` so a query string that matches content
    /// already embedded during a build never triggers a second embed call.
    embedding_cache: Arc<EmbeddingCache>,
    reranker: Option<Arc<dyn Reranker>>,
    rrf: RrfConfig,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn Store>,
        segmenter: Arc<dyn Segmenter>,
        embedding_cache: Arc<EmbeddingCache>,
        reranker: Option<Arc<dyn Reranker>>,
        rrf: RrfConfig,
    ) -> Self {
        Self {
            store,
            segmenter,
            embedding_cache,
            reranker,
            rrf,
        }
    }

    pub async fn search(
        &self,
        vault: &VaultName,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        let tokens = self.segmenter.segment(query);
        let query_vec = self.embedding_cache.embed_one(query)?;
        let fetch_n = (top_n * OVER_FETCH_FACTOR).max(MIN_FETCH);

        let (fts_result, vec_result) = tokio::join!(
            self.store.search_fts(vault, &tokens, fetch_n),
            self.store.search_vec(vault, &query_vec, fetch_n),
        );

        let fts = match fts_result {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(error = %e, "lexical search failed, degrading to vector-only results");
                None
            }
        };
        let vec = match vec_result {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(error = %e, "vector search failed, degrading to lexical-only results");
                None
            }
        };

        if fts.is_none() && vec.is_none() {
            return Err(AppError::BackendUnavailable(
                "both lexical and vector search failed".into(),
            ));
        }

        let fts = fts.unwrap_or_default();
        let vec = vec.unwrap_or_default();

        match &self.reranker {
            // A configured reranker scores the full union directly; RRF
            // fusion is skipped entirely rather than reranking its output.
            Some(reranker) => {
                let candidates = union(&fts, &vec);
                self.rerank(reranker.as_ref(), query, candidates, top_n)
            }
            None => {
                let fused: Vec<FusedResult> = fuse(&fts, &vec, &self.rrf).into_iter().take(top_n).collect();
                Ok(fused
                    .into_iter()
                    .map(|f| SearchHit {
                        id: f.id,
                        content: f.content,
                        score: f.score,
                    })
                    .collect())
            }
        }
    }

    fn rerank(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        candidates: Vec<vaultrag_common::chunk::ScoredId>,
        top_n: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        let texts: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let scores = reranker.rerank(query, &texts)?;
        if scores.len() != candidates.len() {
            return Err(AppError::ExternalModuleError(format!(
                "reranker returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        let mut rescored: Vec<SearchHit> = candidates
            .into_iter()
            .zip(scores)
            .map(|(c, score)| SearchHit {
                id: c.id,
                content: c.content,
                score,
            })
            .collect();
        rescored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        rescored.truncate(top_n);
        Ok(rescored)
    }
}
