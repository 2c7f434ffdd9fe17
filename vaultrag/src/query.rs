//! Reciprocal rank fusion over one lexical and one vector result list.
//!
//! Grounded on `original_source/src/uglyrag/_search.py`'s `SearchEngine`:
//! `rank_dict[id] += weight / (k + rank + 1)` per list, summed across
//! lists. That file's `combine()` keys fused content off whichever list it
//! sees last, so an id present only in the list processed first silently
//! loses its content if a later list never mentions it — a union built
//! from both lists up front avoids that.

use std::collections::HashMap;

use vaultrag_common::chunk::ScoredId;

#[derive(Debug, Clone, Copy)]
pub struct RrfConfig {
    pub k: f32,
    pub weight_fts: f32,
    pub weight_vec: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub id: i64,
    pub content: String,
    pub score: f32,
}

/// Builds the id-deduplicated union of two result lists, keeping whichever
/// content was seen first across `fts` then `vec`. Used directly (without
/// RRF scoring) when a reranker is configured, since reranking needs the
/// full candidate set rather than a pre-fused ranking.
pub fn union(fts: &[ScoredId], vec: &[ScoredId]) -> Vec<ScoredId> {
    let mut seen: HashMap<i64, usize> = HashMap::new();
    let mut out: Vec<ScoredId> = Vec::new();
    for item in fts.iter().chain(vec.iter()) {
        if !seen.contains_key(&item.id) {
            seen.insert(item.id, out.len());
            out.push(item.clone());
        }
    }
    out
}

/// Fuses `fts` and `vec` rankings. Descending by score; ties broken by
/// whichever id was seen first across `fts` then `vec`.
pub fn fuse(fts: &[ScoredId], vec: &[ScoredId], cfg: &RrfConfig) -> Vec<FusedResult> {
    let mut content_by_id: HashMap<i64, String> = HashMap::new();
    let mut first_seen_order: Vec<i64> = Vec::new();
    for item in fts.iter().chain(vec.iter()) {
        if !content_by_id.contains_key(&item.id) {
            content_by_id.insert(item.id, item.content.clone());
            first_seen_order.push(item.id);
        }
    }

    let mut scores: HashMap<i64, f32> = HashMap::new();
    for (rank, item) in fts.iter().enumerate() {
        *scores.entry(item.id).or_insert(0.0) += cfg.weight_fts / (cfg.k + rank as f32 + 1.0);
    }
    for (rank, item) in vec.iter().enumerate() {
        *scores.entry(item.id).or_insert(0.0) += cfg.weight_vec / (cfg.k + rank as f32 + 1.0);
    }

    let order_index: HashMap<i64, usize> = first_seen_order
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    let mut fused: Vec<(i64, f32)> = scores.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| order_index[&a.0].cmp(&order_index[&b.0]))
    });

    fused
        .into_iter()
        .map(|(id, score)| FusedResult {
            id,
            content: content_by_id.remove(&id).unwrap_or_default(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: i64, content: &str) -> ScoredId {
        ScoredId {
            id,
            content: content.to_string(),
        }
    }

    fn cfg() -> RrfConfig {
        RrfConfig {
            k: 60.0,
            weight_fts: 1.0,
            weight_vec: 1.0,
        }
    }

    #[test]
    fn id_present_only_in_one_list_keeps_its_content() {
        let fts = vec![scored(1, "alpha")];
        let vec = vec![scored(2, "beta")];
        let fused = fuse(&fts, &vec, &cfg());
        assert_eq!(fused.len(), 2);
        let alpha = fused.iter().find(|f| f.id == 1).unwrap();
        assert_eq!(alpha.content, "alpha");
        let beta = fused.iter().find(|f| f.id == 2).unwrap();
        assert_eq!(beta.content, "beta");
    }

    #[test]
    fn id_ranked_in_both_lists_outscores_single_list_hits() {
        let fts = vec![scored(1, "alpha"), scored(2, "beta")];
        let vec = vec![scored(2, "beta"), scored(1, "alpha")];
        let fused = fuse(&fts, &vec, &cfg());
        // both ids appear once at rank 0 and once at rank 1 across the two
        // lists, so their combined scores are equal; first-seen order (id 1
        // first, from the fts list) breaks the tie.
        assert_eq!(fused[0].id, 1);
        assert_eq!(fused[1].id, 2);
    }

    #[test]
    fn higher_combined_score_wins() {
        let fts = vec![scored(1, "alpha"), scored(2, "beta"), scored(3, "gamma")];
        let vec = vec![scored(2, "beta")];
        let fused = fuse(&fts, &vec, &cfg());
        // id 2 is top-ranked in vec and second in fts: highest combined score.
        assert_eq!(fused[0].id, 2);
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        assert!(fuse(&[], &[], &cfg()).is_empty());
    }

    #[test]
    fn union_dedupes_keeping_first_seen_content() {
        let fts = vec![scored(1, "alpha"), scored(2, "stale-beta")];
        let vec = vec![scored(2, "beta"), scored(3, "gamma")];
        let merged = union(&fts, &vec);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].content, "stale-beta");
    }

    #[test]
    fn three_way_overlap_ranks_doubly_listed_ids_first() {
        let fts = vec![scored(1, "x"), scored(2, "y"), scored(3, "z")];
        let vec = vec![scored(2, "y"), scored(3, "z"), scored(4, "w")];
        let fused = fuse(&fts, &vec, &cfg());
        let ids: Vec<i64> = fused.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);
    }

    #[test]
    fn weights_bias_the_fused_ranking() {
        let fts = vec![scored(1, "alpha")];
        let vec = vec![scored(2, "beta")];
        let cfg = RrfConfig {
            k: 60.0,
            weight_fts: 0.1,
            weight_vec: 5.0,
        };
        let fused = fuse(&fts, &vec, &cfg);
        assert_eq!(fused[0].id, 2);
    }
}
