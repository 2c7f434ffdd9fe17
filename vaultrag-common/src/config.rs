use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::AppError;

/// The two interchangeable Store backends, selected through a static
/// registry rather than dynamic subclass discovery.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Sqlite,
    Duckdb,
}

impl DbType {
    pub fn default_db_name(self) -> &'static str {
        match self {
            DbType::Sqlite => "database.db",
            DbType::Duckdb => "database.ddb",
        }
    }
}

impl Default for DbType {
    fn default() -> Self {
        DbType::Sqlite
    }
}

fn default_db_type() -> DbType {
    DbType::default()
}

fn default_db_name() -> String {
    default_db_type().default_db_name().to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_weight() -> f32 {
    1.0
}

fn default_k() -> f32 {
    60.0
}

fn default_vault_name() -> String {
    "Core".to_string()
}

fn default_segmenter() -> String {
    "whitespace".to_string()
}

fn default_embedder() -> String {
    "hashing".to_string()
}

fn default_splitter() -> String {
    "paragraph".to_string()
}

/// Configuration keys the core reads, with conservative built-in defaults.
#[derive(Clone, Deserialize, Debug)]
pub struct VaultRagConfig {
    #[serde(default = "default_db_type")]
    pub db_type: DbType,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_weight")]
    pub weight_fts: f32,
    #[serde(default = "default_weight")]
    pub weight_vec: f32,
    #[serde(default = "default_k")]
    pub k: f32,
    #[serde(default = "default_vault_name")]
    pub default_vault: String,
    #[serde(default = "default_segmenter")]
    pub segmenter: String,
    #[serde(default = "default_embedder")]
    pub embedder: String,
    #[serde(default)]
    pub reranker: Option<String>,
    #[serde(default = "default_splitter")]
    pub splitter: String,
}

impl Default for VaultRagConfig {
    fn default() -> Self {
        Self {
            db_type: default_db_type(),
            db_name: default_db_name(),
            data_dir: default_data_dir(),
            weight_fts: default_weight(),
            weight_vec: default_weight(),
            k: default_k(),
            default_vault: default_vault_name(),
            segmenter: default_segmenter(),
            embedder: default_embedder(),
            reranker: None,
            splitter: default_splitter(),
        }
    }
}

/// Loads configuration from `config.toml` (if present) overlaid with
/// `VAULTRAG_*` environment variables, layering sources the same way
/// `common::utils::config::get_config` does.
pub fn get_config() -> Result<VaultRagConfig, AppError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::with_prefix("VAULTRAG").separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}
