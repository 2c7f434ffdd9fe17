use crate::error::AppError;
use std::fmt;

/// Reserved suffixes a vault name must never carry: they collide with the
/// lexical/vector relation names the Store derives from it.
const RESERVED_SUFFIXES: [&str; 2] = ["_fts", "_vec"];

/// A validated vault name. Construction is the only place the reserved-suffix
/// invariant is enforced, so every `Store` backend can trust a `VaultName` it
/// receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaultName(String);

impl VaultName {
    pub fn new(name: impl Into<String>) -> Result<Self, AppError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AppError::UsageError("vault name must not be empty".into()));
        }
        for suffix in RESERVED_SUFFIXES {
            if name.ends_with(suffix) {
                return Err(AppError::UsageError(format!(
                    "vault name '{name}' ends with reserved suffix '{suffix}'"
                )));
            }
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The default vault used when a caller doesn't name one.
    pub fn default_vault() -> Self {
        Self("Core".to_string())
    }
}

impl fmt::Display for VaultName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VaultName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_suffixes() {
        assert!(VaultName::new("notes_fts").is_err());
        assert!(VaultName::new("notes_vec").is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(VaultName::new("").is_err());
    }

    #[test]
    fn accepts_ordinary_name() {
        assert_eq!(VaultName::new("Core").unwrap().as_str(), "Core");
    }
}
