use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Default directory holding the persisted vector index.
pub const DEFAULT_INDEX_DIR: &str = "vectorstore";
/// Default directory holding uploaded PDF documents.
pub const DEFAULT_UPLOAD_DIR: &str = "dataset";
/// Default location of the external authentication service.
pub const DEFAULT_AUTH_SERVICE_URL: &str = "http://127.0.0.1:5000";
/// Default location of a local Ollama runtime.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Individually valid values that contradict each other.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Runtime configuration for the PDFGenius service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory containing the persisted index artifact.
    pub index_dir: PathBuf,
    /// Directory containing uploaded PDF documents.
    pub upload_dir: PathBuf,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Summarization backend.
    pub summarization_provider: SummarizationProvider,
    /// Model used for abstractive summaries when the Ollama provider is selected.
    pub summarization_model: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Number of chunks retrieved per query.
    pub retrieval_top_k: usize,
    /// Minimum cosine similarity for a chunk to count as relevant.
    pub retrieval_score_threshold: f32,
    /// Cap on the chunks assembled into the summarizer context.
    pub context_chunk_cap: usize,
    /// Lower bound on summary length, in words.
    pub summary_min_len: usize,
    /// Upper bound on summary length, in words.
    pub summary_max_len: usize,
    /// Wall-clock budget for a single summarizer call.
    pub summarization_timeout: Duration,
    /// Optional override for the automatic chunk size selection.
    pub text_splitter_chunk_size: Option<usize>,
    /// Optional token overlap between adjacent chunks.
    pub text_splitter_chunk_overlap: Option<usize>,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// Maximum number of documents kept in the library.
    pub max_document_count: usize,
    /// Base URL of the external authentication service.
    pub auth_service_url: String,
    /// Idle period after which a signed-in session ends.
    pub session_idle_timeout: Duration,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// In-process feature-hashing encoder; no external runtime required.
    Local,
    /// Local Ollama runtime.
    Ollama,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Deterministic in-process sentence selection.
    Extractive,
    /// Abstractive summaries generated by an Ollama model.
    Ollama,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            embedding_provider: EmbeddingProvider::Local,
            embedding_model: "all-minilm".into(),
            embedding_dimension: 384,
            summarization_provider: SummarizationProvider::Extractive,
            summarization_model: "llama3.2".into(),
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            retrieval_top_k: 3,
            retrieval_score_threshold: 0.0,
            context_chunk_cap: 3,
            summary_min_len: 60,
            summary_max_len: 180,
            summarization_timeout: Duration::from_secs(60),
            text_splitter_chunk_size: None,
            text_splitter_chunk_overlap: None,
            max_upload_bytes: 5 * 1024 * 1024,
            max_document_count: 3,
            auth_service_url: DEFAULT_AUTH_SERVICE_URL.into(),
            session_idle_timeout: Duration::from_secs(30 * 60),
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to documented defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            index_dir: load_env_optional("INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_dir),
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            embedding_provider: load_env_optional("EMBEDDING_PROVIDER")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(defaults.embedding_provider),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION")?
                .unwrap_or(defaults.embedding_dimension),
            summarization_provider: load_env_optional("SUMMARIZATION_PROVIDER")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(defaults.summarization_provider),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or(defaults.summarization_model),
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            retrieval_top_k: parse_env("RETRIEVAL_TOP_K")?.unwrap_or(defaults.retrieval_top_k),
            retrieval_score_threshold: parse_env("RETRIEVAL_SCORE_THRESHOLD")?
                .unwrap_or(defaults.retrieval_score_threshold),
            context_chunk_cap: parse_env("CONTEXT_CHUNK_CAP")?
                .unwrap_or(defaults.context_chunk_cap),
            summary_min_len: parse_env("SUMMARY_MIN_LEN")?.unwrap_or(defaults.summary_min_len),
            summary_max_len: parse_env("SUMMARY_MAX_LEN")?.unwrap_or(defaults.summary_max_len),
            summarization_timeout: parse_env::<u64>("SUMMARIZATION_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.summarization_timeout),
            text_splitter_chunk_size: parse_env("TEXT_SPLITTER_CHUNK_SIZE")?,
            text_splitter_chunk_overlap: parse_env("TEXT_SPLITTER_CHUNK_OVERLAP")?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes),
            max_document_count: parse_env("MAX_DOCUMENT_COUNT")?
                .unwrap_or(defaults.max_document_count),
            auth_service_url: load_env_optional("AUTH_SERVICE_URL")
                .unwrap_or(defaults.auth_service_url),
            session_idle_timeout: parse_env::<u64>("SESSION_IDLE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_timeout),
            server_port: parse_env("SERVER_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would make the answer pipeline unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }
        if !self.retrieval_score_threshold.is_finite()
            || !(-1.0..=1.0).contains(&self.retrieval_score_threshold)
        {
            return Err(ConfigError::InvalidValue(
                "RETRIEVAL_SCORE_THRESHOLD".into(),
            ));
        }
        if self.context_chunk_cap == 0 {
            return Err(ConfigError::InvalidValue("CONTEXT_CHUNK_CAP".into()));
        }
        if self.summary_max_len == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_MAX_LEN".into()));
        }
        if self.summary_min_len > self.summary_max_len {
            return Err(ConfigError::Inconsistent(format!(
                "SUMMARY_MIN_LEN ({}) exceeds SUMMARY_MAX_LEN ({})",
                self.summary_min_len, self.summary_max_len
            )));
        }
        if self.summarization_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SUMMARIZATION_TIMEOUT_SECS".into(),
            ));
        }
        if self.session_idle_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SESSION_IDLE_TIMEOUT_SECS".into(),
            ));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "extractive" | "none" => Ok(Self::Extractive),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        index_dir = %config.index_dir.display(),
        upload_dir = %config.upload_dir.display(),
        embedding_provider = ?config.embedding_provider,
        summarization_provider = ?config.summarization_provider,
        top_k = config.retrieval_top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
