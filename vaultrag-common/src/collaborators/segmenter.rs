/// `segment(text) -> [token]`: deterministic, stable across process
/// lifetime.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Default segmenter: lowercases and splits on runs of non-alphanumeric
/// characters. Good enough to exercise the lexical index without a real
/// word-segmentation model.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceSegmenter;

impl Segmenter for WhitespaceSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|tok| !tok.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
