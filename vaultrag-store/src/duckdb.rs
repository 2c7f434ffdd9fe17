//! Column-oriented Store backend: DuckDB with the `fts` extension for BM25
//! ranking and the `vss` extension's HNSW index for vector search. Modeled
//! on `original_source/src/uglyrag/_database/_duckdb.py`: DuckDB has no row
//! triggers, so the lexical index is rebuilt explicitly rather than
//! maintained incrementally, and `content_vec` is written directly from a
//! precomputed embedding on each `NewChunk` rather than computed in SQL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection};

use vaultrag_common::{
    chunk::{Chunk, NewChunk, ScoredId},
    collaborators::{Embedder, Segmenter},
    error::AppError,
    vault::VaultName,
};

use crate::executor::Executor;
use crate::store::Store;

pub struct DuckDbStore {
    executor: Executor<Connection>,
    dims: usize,
}

impl DuckDbStore {
    /// `segmenter` is accepted for API symmetry with `SqliteStore::open`,
    /// but DuckDB's `fts` extension tokenizes `content` itself — there's no
    /// row-level hook to call a custom segmenter through. `embedder` is
    /// consulted only for its fixed output dimension; actual vectors arrive
    /// precomputed on each `NewChunk`.
    pub fn open(
        path: impl AsRef<Path>,
        _segmenter: Arc<dyn Segmenter>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, AppError> {
        let dims = embedder.dims();
        let path: PathBuf = path.as_ref().to_path_buf();

        let executor = Executor::new(1, move || {
            let conn = open_connection(&path)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS _vaultrag_vaults (name VARCHAR PRIMARY KEY, dims BIGINT NOT NULL);",
            )
            .map_err(|e| AppError::StoreSchemaError(e.to_string()))?;
            Ok(conn)
        })?;

        Ok(Self { executor, dims })
    }
}

fn open_connection(path: &Path) -> Result<Connection, AppError> {
    let conn = Connection::open(path).map_err(|e| AppError::StoreIOError(e.to_string()))?;
    conn.execute_batch(
        "INSTALL fts; LOAD fts;
         INSTALL vss; LOAD vss;
         SET hnsw_enable_experimental_persistence = true;",
    )
    .map_err(|e| AppError::BackendUnavailable(e.to_string()))?;
    Ok(conn)
}

fn create_vault_schema(conn: &Connection, vault: &str, dims: usize) -> duckdb::Result<()> {
    conn.execute_batch(&format!(
        "CREATE SEQUENCE IF NOT EXISTS \"{vault}_id_seq\";
         CREATE TABLE IF NOT EXISTS \"{vault}\" (
             id BIGINT PRIMARY KEY DEFAULT nextval('{vault}_id_seq'),
             source VARCHAR NOT NULL,
             part_id VARCHAR NOT NULL,
             content VARCHAR NOT NULL,
             created_at TIMESTAMP NOT NULL DEFAULT now(),
             content_vec FLOAT[{dims}],
             UNIQUE (source, part_id)
         );
         CREATE INDEX IF NOT EXISTS \"{vault}_vec_idx\" ON \"{vault}\" USING HNSW (content_vec);"
    ))
}

#[async_trait]
impl Store for DuckDbStore {
    async fn ensure_vault(&self, vault: &VaultName) -> Result<(), AppError> {
        let vault_name = vault.as_str().to_owned();
        let dims = self.dims;
        self.executor
            .submit(move |conn| {
                let existing: Option<i64> = conn
                    .query_row(
                        "SELECT dims FROM _vaultrag_vaults WHERE name = ?1",
                        params![vault_name],
                        |row| row.get(0),
                    )
                    .ok();

                match existing {
                    Some(existing_dims) if existing_dims as usize != dims => {
                        Err(AppError::StoreSchemaError(format!(
                            "vault '{vault_name}' was created with dimension {existing_dims}, current embedder uses {dims}"
                        )))
                    }
                    Some(_) => Ok(()),
                    None => {
                        create_vault_schema(conn, &vault_name, dims)
                            .map_err(|e| AppError::StoreSchemaError(e.to_string()))?;
                        conn.execute(
                            "INSERT INTO _vaultrag_vaults (name, dims) VALUES (?1, ?2)",
                            params![vault_name, dims as i64],
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
        let vault_name = vault.as_str().to_owned();
        let dims = self.dims;

        let mut prepared = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            if chunk.embedding.len() != dims {
                return Err(AppError::ExternalModuleError(format!(
                    "embedding for chunk of source '{}' has {} dims, expected {dims}",
                    chunk.source,
                    chunk.embedding.len()
                )));
            }
            prepared.push((chunk.clone(), chunk.embedding.clone()));
        }

        self.executor
            .submit(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                let mut inserted = Vec::with_capacity(prepared.len());
                for (chunk, vector) in &prepared {
                    let literal = format!(
                        "[{}]",
                        vector
                            .iter()
                            .map(|f| f.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    );
                    let sql = format!(
                        "INSERT INTO \"{vault_name}\" (source, part_id, content, content_vec)
                         VALUES (?1, ?2, ?3, {literal}::FLOAT[{dims}])
                         RETURNING id, created_at"
                    );
                    let (id, created_at): (i64, String) = tx
                        .query_row(&sql, params![chunk.source, chunk.part_id, chunk.content], |row| {
                            Ok((row.get(0)?, row.get(1)?))
                        })
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    inserted.push(Chunk {
                        id,
                        source: chunk.source.clone(),
                        part_id: chunk.part_id.clone(),
                        content: chunk.content.clone(),
                        created_at: created_at.parse().unwrap_or_else(|_| chrono::Utc::now()),
                    });
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
                        |row| row.get::<_, bool>(0),
                    )
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

    async fn rebuild_fts(&self, vault: &VaultName) -> Result<(), AppError> {
        let vault = vault.as_str().to_owned();
        self.executor
            .submit(move |conn| {
                conn.execute_batch(&format!(
                    "PRAGMA create_fts_index('{vault}', 'id', 'content', overwrite=1);"
                ))
                .map_err(|e| AppError::StoreIOError(e.to_string()))
            })
            .await
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
        let vault_name = vault.as_str().to_owned();
        let query = query_tokens.join(" ");
        self.executor
            .submit_with_read_retry(move || {
                let vault_name = vault_name.clone();
                let query = query.clone();
                move |conn: &mut Connection| {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT id, content, score FROM (
                                SELECT *, fts_main_{vault_name}.match_bm25(id, ?1) AS score FROM \"{vault_name}\"
                             ) sq
                             WHERE score IS NOT NULL
                             ORDER BY score DESC, id ASC
                             LIMIT ?2"
                        ))
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    let rows = stmt
                        .query_map(params![query, top_n as i64], |row| {
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
        let vault_name = vault.as_str().to_owned();
        let dims = self.dims;
        let literal = format!(
            "[{}]",
            query_vec
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        self.executor
            .submit_with_read_retry(move || {
                let vault_name = vault_name.clone();
                let literal = literal.clone();
                move |conn: &mut Connection| {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT id, content, array_distance(content_vec, {literal}::FLOAT[{dims}]) AS distance
                             FROM \"{vault_name}\"
                             ORDER BY distance ASC, id ASC
                             LIMIT ?1"
                        ))
                        .map_err(|e| AppError::StoreIOError(e.to_string()))?;
                    let rows = stmt
                        .query_map(params![top_n as i64], |row| {
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
                        "DROP TABLE IF EXISTS \"{vault}\";
                         DROP SEQUENCE IF EXISTS \"{vault}_id_seq\";"
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

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore").field("dims", &self.dims).finish()
    }
}
