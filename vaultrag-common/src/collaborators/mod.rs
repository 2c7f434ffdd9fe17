//! Interfaces for the four external collaborators treated as out-of-scope
//! plug-ins: segmenter, embedder, reranker, splitter. Each trait ships one
//! deterministic default implementation so the workspace runs end-to-end
//! without a real model.

mod embedder;
mod reranker;
mod segmenter;
mod splitter;

pub use embedder::{Embedder, HashingEmbedder};
pub use reranker::{IdentityReranker, Reranker};
pub use segmenter::{Segmenter, WhitespaceSegmenter};
pub use splitter::{ParagraphSplitter, Splitter};
