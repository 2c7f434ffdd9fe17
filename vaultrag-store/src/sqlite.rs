//! Row-oriented Store backend: SQLite with an FTS5 virtual table for the
//! lexical index and a plain BLOB table scanned exactly for the vector
//! index, kept in sync by triggers that call a SQLite scalar function
//! registered at connection time — the same design as
//! `original_source/src/uglyrag/_database/_sqlite.py`, minus the
//! `sqlite_vec` extension (no maintained crates.io binding exists; exact
//! scan for vector ranking is an accepted tradeoff at the vault sizes this
//! backend targets, so an ordinary table plus in-process L2 distance is a
//! reasonable substitute). Unlike the original, only `segment` is
//! registered as a SQL function and wired into a trigger — embeddings
//! arrive precomputed on `NewChunk` (the caller already deduplicated and
//! batched them) and are inserted into `{vault}_vec` directly alongside the
//! base row, in the same transaction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection};
use tracing::debug;

use vaultrag_common::{
    chunk::{Chunk, NewChunk, ScoredId},
    collaborators::{Embedder, Segmenter},
    error::AppError,
    vault::VaultName,
};

use crate::executor::Executor;
use crate::store::Store;
use crate::vector::{deserialize_f32, l2_distance, serialize_f32};

pub struct SqliteStore {
    executor: Executor<Connection>,
    dims: usize,
}

impl SqliteStore {
    /// `embedder` is consulted only for its fixed output dimension; actual
    /// vectors arrive precomputed on each `NewChunk`.
    pub fn open(
        path: impl AsRef<Path>,
        segmenter: Arc<dyn Segmenter>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, AppError> {
        let dims = embedder.dims();
        let path: PathBuf = path.as_ref().to_path_buf();

        let executor = Executor::new(1, move || {
            let conn = open_connection(&path, segmenter.clone())?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS _vaultrag_vaults (name TEXT PRIMARY KEY, dims INTEGER NOT NULL);",
            )
            .map_err(|e| AppError::StoreSchemaError(e.to_string()))?;
            Ok(conn)
        })?;

        Ok(Self { executor, dims })
    }
}

fn open_connection(path: &Path, segmenter: Arc<dyn Segmenter>) -> Result<Connection, AppError> {
    let conn = Connection::open(path).map_err(|e| AppError::StoreIOError(e.to_string()))?;

    conn.create_scalar_function(
        "segment",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            let text: String = ctx.get(0)?;
            Ok(segmenter.segment(&text).join(" "))
        },
    )
    .map_err(|e| AppError::StoreSchemaError(e.to_string()))?;

    Ok(conn)
}

fn create_vault_schema(conn: &Connection, vault: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{vault}\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            part_id TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE (source, part_id)
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS \"{vault}_fts\" USING fts5(indexed_content);
        CREATE TABLE IF NOT EXISTS \"{vault}_vec\" (rowid INTEGER PRIMARY KEY, embedding BLOB NOT NULL);

        CREATE TRIGGER IF NOT EXISTS \"{vault}_ai\" AFTER INSERT ON \"{vault}\" BEGIN
            INSERT INTO \"{vault}_fts\"(rowid, indexed_content) VALUES (new.id, segment(new.content));
        END;
        CREATE TRIGGER IF NOT EXISTS \"{vault}_ad\" AFTER DELETE ON \"{vault}\" BEGIN
            DELETE FROM \"{vault}_fts\" WHERE rowid = old.id;
            DELETE FROM \"{vault}_vec\" WHERE rowid = old.id;
        END;"
    ))
}

#[async_trait]
impl Store for SqliteStore {
    async fn ensure_vault(&self, vault: &VaultName) -> Result<(), AppError> {
        let vault = vault.as_str().to_owned();
        let dims = self.dims;
        self.executor
            .submit(move |conn| {
                let existing: Option<i64> = conn
                    .query_row(
                        "SELECT dims FROM _vaultrag_vaults WHERE name = ?1",
                        params![vault],
                        |row| row.get(0),
                    )
                    .ok();

                match existing {
                    Some(existing_dims) if existing_dims as usize != dims => {
                        Err(AppError::StoreSchemaError(format!(
                            "vault '{vault}' was created with dimension {existing_dims}, current embedder uses {dims}"
                        )))
                    }
                    Some(_) => Ok(()),
                    None => {
                        create_vault_schema(conn, &vault)
                            .map_err(|e| AppError::StoreSchemaError(e.to_string()))?;
                        conn.execute(
                            "INSERT INTO _vaultrag_vaults (name, dims) VALUES (?1, ?2)",
                            params![vault, dims as i64],
                        )
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                        Ok(())
                    }
                }
            })
            .await
    }

    async fn insert(&self, vault: &VaultName, chunks: Vec<NewChunk>) -> Result<Vec<Chunk>, AppError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        for chunk in &chunks {
            if chunk.embedding.len() != self.dims {
                return Err(AppError::ExternalModuleError(format!(
                    "embedding for chunk of source '{}' has {} dims, expected {}",
                    chunk.source,
                    chunk.embedding.len(),
                    self.dims
                )));
            }
        }
        let vault = vault.as_str().to_owned();
        self.executor
            .submit(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                let mut inserted = Vec::with_capacity(chunks.len());
                {
                    let mut stmt = tx
                        .prepare(&format!(
                            "INSERT INTO \"{vault}\" (source, part_id, content) VALUES (?1, ?2, ?3) RETURNING id, created_at"
                        ))
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    let mut vec_stmt = tx
                        .prepare(&format!(
                            "INSERT INTO \"{vault}_vec\" (rowid, embedding) VALUES (?1, ?2)"
                        ))
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    for chunk in &chunks {
                        let (id, created_at): (i64, String) = stmt
                            .query_row(
                                params![chunk.source, chunk.part_id, chunk.content],
                                |row| Ok((row.get(0)?, row.get(1)?)),
                            )
                            .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                        vec_stmt
                            .execute(params![id, serialize_f32(&chunk.embedding)])
                            .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                        inserted.push(Chunk {
                            id,
                            source: chunk.source.clone(),
                            part_id: chunk.part_id.clone(),
                            content: chunk.content.clone(),
                            created_at: created_at
                                .parse()
                                .unwrap_or_else(|_| chrono::Utc::now()),
                        });
                    }
                }
                tx.commit().map_err(|e| AppError::StoreIOError(e.to_string()))?;
                Ok(inserted)
            })
            .await
    }

    async fn has_source(&self, vault: &VaultName, source: &str) -> Result<bool, AppError> {
        let vault = vault.as_str().to_owned();
        let source = source.to_owned();
        self.executor
            .submit_with_read_retry(move || {
                let vault = vault.clone();
                let source = source.clone();
                move |conn: &mut Connection| {
                    conn.query_row(
                        &format!("SELECT EXISTS(SELECT 1 FROM \"{vault}\" WHERE source = ?1)"),
                        params![source],
                        |row| row.get::<_, i64>(0),
                    )
                    .map(|exists| exists == 1)
                    .map_err(|e| AppError::StoreIOError(e.to_string()))
                }
            })
            .await
    }

    async fn delete_source(&self, vault: &VaultName, source: &str) -> Result<usize, AppError> {
        let vault = vault.as_str().to_owned();
        let source = source.to_owned();
        self.executor
            .submit(move |conn| {
                conn.execute(
                    &format!("DELETE FROM \"{vault}\" WHERE source = ?1"),
                    params![source],
                )
                .map_err(|e| AppError::StoreIOError(e.to_string()))
            })
            .await
    }

    async fn rebuild_fts(&self, _vault: &VaultName) -> Result<(), AppError> {
        // FTS5 is maintained incrementally by the insert/delete triggers.
        debug!("rebuild_fts is a no-op for the sqlite backend");
        Ok(())
    }

    async fn search_fts(
        &self,
        vault: &VaultName,
        query_tokens: &[String],
        top_n: usize,
    ) -> Result<Vec<ScoredId>, AppError> {
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let vault = vault.as_str().to_owned();
        let match_expr = query_tokens.join(" OR ");
        self.executor
            .submit_with_read_retry(move || {
                let vault = vault.clone();
                let match_expr = match_expr.clone();
                move |conn: &mut Connection| {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT v.id, v.content FROM \"{vault}_fts\" f
                             JOIN \"{vault}\" v ON f.rowid = v.id
                             WHERE f.indexed_content MATCH ?1
                             ORDER BY bm25(f) ASC, v.id ASC
                             LIMIT ?2"
                        ))
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    let rows = stmt
                        .query_map(params![match_expr, top_n as i64], |row| {
                            Ok(ScoredId {
                                id: row.get(0)?,
                                content: row.get(1)?,
                            })
                        })
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    rows.collect::<Result<Vec<_>, _>>()
                        .map_err(|e| AppError::StoreIOError(e.to_string()))
                }
            })
            .await
    }

    async fn search_vec(
        &self,
        vault: &VaultName,
        query_vec: &[f32],
        top_n: usize,
    ) -> Result<Vec<ScoredId>, AppError> {
        let vault = vault.as_str().to_owned();
        let query_vec = query_vec.to_vec();
        self.executor
            .submit_with_read_retry(move || {
                let vault = vault.clone();
                let query_vec = query_vec.clone();
                move |conn: &mut Connection| {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT v.id, v.content, vv.embedding FROM \"{vault}\" v
                             JOIN \"{vault}_vec\" vv ON v.id = vv.rowid"
                        ))
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    let rows = stmt
                        .query_map([], |row| {
                            let id: i64 = row.get(0)?;
                            let content: String = row.get(1)?;
                            let embedding: Vec<u8> = row.get(2)?;
                            Ok((id, content, embedding))
                        })
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;

                    let mut scored: Vec<(f32, i64, String)> = Vec::new();
                    for row in rows {
                        let (id, content, embedding) =
                            row.map_err(|e| AppError::StoreIOError(e.to_string()))?;
                        let vector = deserialize_f32(&embedding);
                        let distance = l2_distance(&query_vec, &vector);
                        scored.push((distance, id, content));
                    }
                    scored.sort_by(|a, b| {
                        a.0.partial_cmp(&b.0)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then_with(|| a.1.cmp(&b.1))
                    });
                    Ok(scored
                        .into_iter()
                        .take(top_n)
                        .map(|(_, id, content)| ScoredId { id, content })
                        .collect())
                }
            })
            .await
    }

    async fn reset(&self) -> Result<(), AppError> {
        self.executor
            .submit(move |conn| {
                let vaults: Vec<String> = {
                    let mut stmt = conn
                        .prepare("SELECT name FROM _vaultrag_vaults")
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    let rows = stmt
                        .query_map([], |row| row.get(0))
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    rows.collect::<Result<Vec<_>, _>>()
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?
                };

                for vault in vaults {
                    conn.execute_batch(&format!(
                        "DROP TRIGGER IF EXISTS \"{vault}_ai\";
                         DROP TRIGGER IF EXISTS \"{vault}_ad\";
                         DROP TABLE IF EXISTS \"{vault}_vec\";
                         DROP TABLE IF EXISTS \"{vault}_fts\";
                         DROP TABLE IF EXISTS \"{vault}\";"
                    ))
                    .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                }
                conn.execute("DELETE FROM _vaultrag_vaults", [])
                    .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                Ok(())
            })
            .await
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultrag_common::collaborators::{HashingEmbedder, WhitespaceSegmenter};

    fn test_store() -> SqliteStore {
        SqliteStore::open(
            ":memory:",
            Arc::new(WhitespaceSegmenter),
            Arc::new(HashingEmbedder::new(8)),
        )
        .expect("failed to open store")
    }

    fn new_chunk(source: &str, part_id: &str, content: &str) -> NewChunk {
        NewChunk {
            source: source.into(),
            part_id: part_id.into(),
            content: content.into(),
            embedding: HashingEmbedder::new(8).embed(content).unwrap(),
        }
    }

    #[tokio::test]
    async fn ensure_vault_is_idempotent() {
        let store = test_store();
        let vault = VaultName::new("notes").unwrap();
        store.ensure_vault(&vault).await.unwrap();
        store.ensure_vault(&vault).await.unwrap();
    }

    #[tokio::test]
    async fn insert_and_search_fts_roundtrip() {
        let store = test_store();
        let vault = VaultName::new("T").unwrap();
        store.ensure_vault(&vault).await.unwrap();

        store
            .insert(
                &vault,
                vec![new_chunk("a", "0", "the quick brown fox")],
            )
            .await
            .unwrap();

        let results = store
            .search_fts(&vault, &["fox".to_string()], 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "the quick brown fox");
    }

    #[tokio::test]
    async fn insert_and_search_vec_roundtrip() {
        let store = test_store();
        let vault = VaultName::new("T").unwrap();
        store.ensure_vault(&vault).await.unwrap();

        store
            .insert(
                &vault,
                vec![new_chunk("a", "0", "alpha")],
            )
            .await
            .unwrap();

        let embedder = HashingEmbedder::new(8);
        let query_vec = embedder.embed("alpha").unwrap();
        let results = store.search_vec(&vault, &query_vec, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "alpha");
    }

    #[tokio::test]
    async fn delete_source_removes_from_both_indices() {
        let store = test_store();
        let vault = VaultName::new("T").unwrap();
        store.ensure_vault(&vault).await.unwrap();
        store
            .insert(
                &vault,
                vec![new_chunk("a", "0", "lonely chunk")],
            )
            .await
            .unwrap();

        let removed = store.delete_source(&vault, "a").await.unwrap();
        assert_eq!(removed, 1);

        assert!(!store.has_source(&vault, "a").await.unwrap());
        let fts = store
            .search_fts(&vault, &["lonely".to_string()], 5)
            .await
            .unwrap();
        assert!(fts.is_empty());
        let embedder = HashingEmbedder::new(8);
        let query_vec = embedder.embed("lonely chunk").unwrap();
        let vec_results = store.search_vec(&vault, &query_vec, 5).await.unwrap();
        assert!(vec_results.is_empty());
    }

    #[tokio::test]
    async fn reserved_vault_name_rejected_at_construction() {
        assert!(VaultName::new("X_fts").is_err());
        assert!(VaultName::new("X_vec").is_err());
    }

    #[tokio::test]
    async fn reset_destroys_all_vaults() {
        let store = test_store();
        let vault = VaultName::new("T").unwrap();
        store.ensure_vault(&vault).await.unwrap();
        store
            .insert(
                &vault,
                vec![new_chunk("a", "0", "content")],
            )
            .await
            .unwrap();

        store.reset().await.unwrap();

        // vault is gone; ensure_vault must be able to recreate it cleanly
        store.ensure_vault(&vault).await.unwrap();
        assert!(!store.has_source(&vault, "a").await.unwrap());
    }
}
