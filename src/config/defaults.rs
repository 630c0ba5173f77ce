//! Default values for configuration

/// Default location of the HSN master file, relative to the working directory
pub fn default_hsn_master_path() -> String {
    "data/master_hsn.csv".to_string()
}

/// Minimum similarity for a fuzzy code suggestion
pub fn default_suggestion_cutoff() -> f64 {
    0.5
}

/// Maximum number of fuzzy suggestions per unknown code
pub fn default_max_suggestions() -> usize {
    5
}

/// Maximum number of codes returned by a pattern search
pub fn default_max_pattern_matches() -> usize {
    5
}

/// Default corpus backend
pub fn default_rag_backend() -> String {
    "vertex".to_string()
}

/// Default number of retrieved contexts
pub fn default_top_k() -> usize {
    3
}

/// Default vector distance threshold for retrieval
pub fn default_distance_threshold() -> f64 {
    0.5
}

/// Default chunk size (tokens for Vertex, characters for Qdrant)
pub fn default_chunk_size() -> usize {
    512
}

/// Default chunk overlap
pub fn default_chunk_overlap() -> usize {
    100
}

/// Default embedding request budget for imports
pub fn default_max_embedding_requests_per_min() -> u32 {
    1000
}

/// Default Google Cloud project, from the environment when set
pub fn default_vertex_project_id() -> String {
    std::env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_default()
}

/// Default Google Cloud location
pub fn default_vertex_location() -> String {
    std::env::var("GOOGLE_CLOUD_LOCATION").unwrap_or_else(|_| "us-central1".to_string())
}

/// Default Vertex publisher embedding model
pub fn default_vertex_embedding_model() -> String {
    "publishers/google/models/text-embedding-005".to_string()
}

/// Default environment variable holding the OAuth access token
pub fn default_vertex_access_token_env() -> String {
    "GOOGLE_OAUTH_ACCESS_TOKEN".to_string()
}

/// Default delay between long-running operation polls
pub fn default_operation_poll_interval_ms() -> u64 {
    2000
}

/// Default maximum number of operation polls before giving up
pub fn default_operation_max_polls() -> u32 {
    150
}

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for Qdrant API key
pub fn default_qdrant_api_key_env() -> String {
    "".to_string()
}

/// Default prefix for corpus collections
pub fn default_collection_prefix() -> String {
    "hsn_corpus_".to_string()
}

/// Default embedding backend URL
pub fn default_embedding_backend_url() -> String {
    std::env::var("HSN_AGENT_EMBEDDING_BACKEND_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:7997".to_string())
}

/// Default embedding model (BAAI/bge-small-en-v1.5)
pub fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

/// Default embedding dimension
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}
