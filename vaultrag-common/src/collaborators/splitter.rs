use crate::error::AppError;

/// `split(text) -> [(part_id, content)]`: `part_id` unique within one
/// `split` invocation, order preserved.
pub trait Splitter: Send + Sync {
    fn split(&self, text: &str) -> Result<Vec<(String, String)>, AppError>;
}

/// Default splitter: breaks on blank lines, assigning zero-padded sequential
/// part ids. Simple stand-in for a real text splitter, which is treated as
/// an external, swappable collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParagraphSplitter;

impl Splitter for ParagraphSplitter {
    fn split(&self, text: &str) -> Result<Vec<(String, String)>, AppError> {
        let parts: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            return Err(AppError::ExternalModuleError(
                "splitter produced no parts for non-empty input".into(),
            ));
        }

        Ok(parts
            .into_iter()
            .enumerate()
            .map(|(i, part)| (format!("{i:04}"), part.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines_with_unique_part_ids() {
        let parts = ParagraphSplitter.split("first\n\nsecond\n\nthird").unwrap();
        assert_eq!(
            parts,
            vec![
                ("0000".to_string(), "first".to_string()),
                ("0001".to_string(), "second".to_string()),
                ("0002".to_string(), "third".to_string()),
            ]
        );
    }

    #[test]
    fn preserves_order() {
        let parts = ParagraphSplitter.split("a\n\nb").unwrap();
        assert_eq!(parts[0].0, "0000");
        assert_eq!(parts[1].0, "0001");
    }
}
