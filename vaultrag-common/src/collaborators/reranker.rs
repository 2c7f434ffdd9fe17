use crate::error::AppError;

/// `rerank(query, candidates) -> [score]`: 1:1 with `candidates`, higher
/// score means more relevant.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, AppError>;
}

/// Default reranker: preserves input order, assigning strictly descending
/// scores. Mirrors `uglyrag`'s own default (`lambda _, y:
/// list(range(len(y), 0, -1))`) — a no-op reranker used when no real
/// cross-encoder is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityReranker;

impl Reranker for IdentityReranker {
    fn rerank(&self, _query: &str, candidates: &[String]) -> Result<Vec<f32>, AppError> {
        let n = candidates.len();
        Ok((0..n).map(|i| (n - i) as f32).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_input_order_via_descending_scores() {
        let candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let scores = IdentityReranker.rerank("q", &candidates).unwrap();
        assert_eq!(scores, vec![3.0, 2.0, 1.0]);
    }
}
