//! Configuration management for hsn-agent
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HSN master table configuration
    #[serde(default)]
    pub hsn: HsnConfig,

    /// Retrieval configuration shared by all backends
    #[serde(default)]
    pub rag: RagConfig,

    /// Vertex AI RAG Engine backend
    #[serde(default)]
    pub vertex: VertexConfig,

    /// Qdrant backend
    #[serde(default)]
    pub qdrant: QdrantConfig,

    /// Embedding backend used by the Qdrant corpus store
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// HSN master table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsnConfig {
    /// Path loaded lazily on first validation or query
    #[serde(default = "default_hsn_master_path")]
    pub master_path: String,

    /// Minimum similarity (0.0 - 1.0) for fuzzy suggestions
    #[serde(default = "default_suggestion_cutoff")]
    pub suggestion_cutoff: f64,

    /// Maximum fuzzy suggestions per unknown code
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Maximum codes listed by a pattern search
    #[serde(default = "default_max_pattern_matches")]
    pub max_pattern_matches: usize,
}

/// Which corpus service to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Vertex,
    Qdrant,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "vertex" | "vertex-ai" | "vertexai" => Ok(Self::Vertex),
            "qdrant" | "local" => Ok(Self::Qdrant),
            _ => Err(Error::Config(format!(
                "Unsupported rag backend '{}'; use 'vertex' or 'qdrant'",
                value
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Backend name ("vertex" or "qdrant")
    #[serde(default = "default_rag_backend")]
    pub backend: String,

    /// Number of contexts returned by a retrieval query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Vector distance threshold (0.0 - 1.0); smaller is stricter
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,

    /// Chunk size used when importing documents
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Embedding requests per minute allowed during import (Vertex only)
    #[serde(default = "default_max_embedding_requests_per_min")]
    pub max_embedding_requests_per_min: u32,
}

impl RagConfig {
    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend.parse()
    }
}

/// Vertex AI RAG Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    #[serde(default = "default_vertex_project_id")]
    pub project_id: String,

    #[serde(default = "default_vertex_location")]
    pub location: String,

    /// Publisher model used to embed new corpora
    #[serde(default = "default_vertex_embedding_model")]
    pub embedding_model: String,

    /// Environment variable holding a bearer token
    #[serde(default = "default_vertex_access_token_env")]
    pub access_token_env: String,

    /// Override for the API root (defaults to the regional endpoint)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_operation_poll_interval_ms")]
    pub operation_poll_interval_ms: u64,

    #[serde(default = "default_operation_max_polls")]
    pub operation_max_polls: u32,
}

impl VertexConfig {
    /// `projects/{project}/locations/{location}`
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    /// API root including the version segment and a trailing slash
    pub fn api_root(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/v1/", endpoint.trim_end_matches('/')),
            None => format!("https://{}-aiplatform.googleapis.com/v1/", self.location),
        }
    }

    /// Get the access token from environment
    pub fn access_token(&self) -> Option<String> {
        if self.access_token_env.is_empty() {
            return None;
        }
        std::env::var(&self.access_token_env).ok()
    }
}

/// Qdrant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Environment variable name for Qdrant API key
    #[serde(default = "default_qdrant_api_key_env")]
    pub api_key_env: String,

    /// Prefix applied to collection names so corpora are distinguishable
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,
}

impl QdrantConfig {
    /// Get the Qdrant API key from environment
    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env).ok()
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// HTTP embedding backend URL
    #[serde(default = "default_embedding_backend_url")]
    pub backend_url: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for hsn-agent data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for HsnConfig {
    fn default() -> Self {
        Self {
            master_path: default_hsn_master_path(),
            suggestion_cutoff: default_suggestion_cutoff(),
            max_suggestions: default_max_suggestions(),
            max_pattern_matches: default_max_pattern_matches(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            backend: default_rag_backend(),
            top_k: default_top_k(),
            distance_threshold: default_distance_threshold(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_embedding_requests_per_min: default_max_embedding_requests_per_min(),
        }
    }
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project_id: default_vertex_project_id(),
            location: default_vertex_location(),
            embedding_model: default_vertex_embedding_model(),
            access_token_env: default_vertex_access_token_env(),
            endpoint: None,
            operation_poll_interval_ms: default_operation_poll_interval_ms(),
            operation_max_polls: default_operation_max_polls(),
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key_env: default_qdrant_api_key_env(),
            collection_prefix: default_collection_prefix(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend_url: default_embedding_backend_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

impl Config {
    /// Get the default base directory for hsn-agent (~/.hsn-agent)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hsn-agent")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Write a default config under `base_dir`
    pub fn init(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);
        config.save()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.rag.backend_kind()?;

        if !(0.0..=1.0).contains(&self.hsn.suggestion_cutoff) {
            return Err(Error::Config(
                "hsn.suggestion_cutoff must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.hsn.max_suggestions == 0 || self.hsn.max_pattern_matches == 0 {
            return Err(Error::Config(
                "hsn.max_suggestions and hsn.max_pattern_matches must be positive".to_string(),
            ));
        }

        if self.rag.top_k == 0 {
            return Err(Error::Config("rag.top_k must be positive".to_string()));
        }

        if !(0.0..=1.0).contains(&self.rag.distance_threshold) {
            return Err(Error::Config(
                "rag.distance_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(Error::Config(
                "rag.chunk_overlap must be < rag.chunk_size".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
