//! Picks a concrete `Store` backend from `DbType`. Replaces the dynamic
//! subclass discovery `original_source/src/uglyrag/_database/_database.py`
//! uses (`Database.__subclasses__()` keyed by class name) with a static
//! match, since Rust has no runtime class registry to walk.

use std::path::Path;
use std::sync::Arc;

use vaultrag_common::collaborators::{Embedder, Segmenter};
use vaultrag_common::config::DbType;
use vaultrag_common::error::AppError;

use crate::duckdb::DuckDbStore;
use crate::sqlite::SqliteStore;
use crate::store::Store;

pub fn open_store(
    db_type: DbType,
    db_path: impl AsRef<Path>,
    segmenter: Arc<dyn Segmenter>,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn Store>, AppError> {
    match db_type {
        DbType::Sqlite => {
            Ok(Arc::new(SqliteStore::open(db_path, segmenter, embedder)?) as Arc<dyn Store>)
        }
        DbType::Duckdb => {
            Ok(Arc::new(DuckDbStore::open(db_path, segmenter, embedder)?) as Arc<dyn Store>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultrag_common::collaborators::{HashingEmbedder, WhitespaceSegmenter};

    #[test]
    fn opens_sqlite_backend() {
        let store = open_store(
            DbType::Sqlite,
            ":memory:",
            Arc::new(WhitespaceSegmenter),
            Arc::new(HashingEmbedder::new(4)),
        )
        .unwrap();
        assert_eq!(store.dims(), 4);
    }
}
