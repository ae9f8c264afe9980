//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `GROUNDLINE_*` environment variables.
//! An unset or blank variable keeps the default. A malformed port or bind address is
//! an error; a malformed tuning knob is ignored.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::constants::{
    DEFAULT_EMBEDDING_DIM, DEFAULT_MIN_SIMILARITY, DEFAULT_TOP_K, DimConfig, MAX_TOP_K,
};
use crate::rerank::MmrConfig;
use crate::retrieval::{DEFAULT_COLLECTION_NAME, FusionConfig};
use crate::retry::RetryConfig;

/// Default Qdrant URL used when `GROUNDLINE_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";

const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

/// Per-request parameters used when a query omits its options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryDefaults {
    pub default_top_k: usize,
    pub default_min_similarity: f32,
    /// Largest `top_k` a request may ask for.
    pub max_top_k: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            default_min_similarity: DEFAULT_MIN_SIMILARITY,
            max_top_k: MAX_TOP_K,
        }
    }
}

/// Server and pipeline configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `GROUNDLINE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Collection holding the knowledge chunks. Default: `knowledge_chunks`.
    pub collection_name: String,

    /// Base URL of an OpenAI-compatible embeddings API. `None` selects the hash stub.
    pub embedding_url: Option<String>,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub embedding_dim: usize,

    pub generation_model: String,

    /// JSON-lines query log. `None` logs records through `tracing`.
    pub query_log_path: Option<PathBuf>,

    /// Answer with the deterministic mock generator instead of a remote model.
    pub mock_provider: bool,

    pub query: QueryDefaults,
    pub fusion: FusionConfig,
    pub mmr: MmrConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_url: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            query_log_path: None,
            mock_provider: false,
            query: QueryDefaults::default(),
            fusion: FusionConfig::default(),
            mmr: MmrConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    pub const ENV_PORT: &'static str = "GROUNDLINE_PORT";
    const ENV_BIND_ADDR: &'static str = "GROUNDLINE_BIND_ADDR";
    const ENV_QDRANT_URL: &'static str = "GROUNDLINE_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "GROUNDLINE_COLLECTION";
    const ENV_EMBEDDING_URL: &'static str = "GROUNDLINE_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "GROUNDLINE_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "GROUNDLINE_EMBEDDING_API_KEY";
    const ENV_EMBEDDING_DIM: &'static str = "GROUNDLINE_EMBEDDING_DIM";
    const ENV_GENERATION_MODEL: &'static str = "GROUNDLINE_GENERATION_MODEL";
    const ENV_QUERY_LOG: &'static str = "GROUNDLINE_QUERY_LOG";
    const ENV_MOCK_PROVIDER: &'static str = "GROUNDLINE_MOCK_PROVIDER";
    const ENV_DEFAULT_TOP_K: &'static str = "GROUNDLINE_DEFAULT_TOP_K";
    const ENV_DEFAULT_MIN_SIMILARITY: &'static str = "GROUNDLINE_DEFAULT_MIN_SIMILARITY";
    const ENV_MAX_TOP_K: &'static str = "GROUNDLINE_MAX_TOP_K";
    const ENV_VECTOR_WEIGHT: &'static str = "GROUNDLINE_VECTOR_WEIGHT";
    const ENV_LEXICAL_WEIGHT: &'static str = "GROUNDLINE_LEXICAL_WEIGHT";
    const ENV_MMR_LAMBDA: &'static str = "GROUNDLINE_MMR_LAMBDA";
    const ENV_CACHE_TTL_SECS: &'static str = "GROUNDLINE_CACHE_TTL_SECS";
    const ENV_CACHE_CAPACITY: &'static str = "GROUNDLINE_CACHE_CAPACITY";
    const ENV_RETRY_MAX_ATTEMPTS: &'static str = "GROUNDLINE_RETRY_MAX_ATTEMPTS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;

        let query = QueryDefaults {
            default_top_k: Self::parse_from_env(
                Self::ENV_DEFAULT_TOP_K,
                defaults.query.default_top_k,
            ),
            default_min_similarity: Self::parse_from_env(
                Self::ENV_DEFAULT_MIN_SIMILARITY,
                defaults.query.default_min_similarity,
            ),
            max_top_k: Self::parse_from_env(Self::ENV_MAX_TOP_K, defaults.query.max_top_k),
        };

        let fusion = FusionConfig {
            vector_weight: Self::parse_from_env(
                Self::ENV_VECTOR_WEIGHT,
                defaults.fusion.vector_weight,
            ),
            lexical_weight: Self::parse_from_env(
                Self::ENV_LEXICAL_WEIGHT,
                defaults.fusion.lexical_weight,
            ),
            ..defaults.fusion
        };

        let mmr = MmrConfig {
            lambda: Self::parse_from_env(Self::ENV_MMR_LAMBDA, defaults.mmr.lambda),
            ..defaults.mmr
        };

        let cache = CacheConfig {
            ttl: Duration::from_secs(Self::parse_from_env(
                Self::ENV_CACHE_TTL_SECS,
                defaults.cache.ttl.as_secs(),
            )),
            max_capacity: Self::parse_from_env(
                Self::ENV_CACHE_CAPACITY,
                defaults.cache.max_capacity,
            ),
        };

        let retry = RetryConfig {
            max_attempts: Self::parse_from_env(
                Self::ENV_RETRY_MAX_ATTEMPTS,
                defaults.retry.max_attempts,
            ),
            ..defaults.retry
        };

        Ok(Self {
            port,
            bind_addr,
            qdrant_url: Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            collection_name: Self::parse_string_from_env(
                Self::ENV_COLLECTION,
                defaults.collection_name,
            ),
            embedding_url: Self::optional_env(Self::ENV_EMBEDDING_URL),
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            embedding_api_key: Self::optional_env(Self::ENV_EMBEDDING_API_KEY),
            embedding_dim: Self::parse_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim),
            generation_model: Self::parse_string_from_env(
                Self::ENV_GENERATION_MODEL,
                defaults.generation_model,
            ),
            query_log_path: Self::optional_env(Self::ENV_QUERY_LOG).map(PathBuf::from),
            mock_provider: Self::parse_flag_from_env(Self::ENV_MOCK_PROVIDER),
            query,
            fusion,
            mmr,
            cache,
            retry,
        })
    }

    /// Checks ranges and cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        DimConfig::new(self.embedding_dim).validate()?;

        let (vector, lexical) = (self.fusion.vector_weight, self.fusion.lexical_weight);
        let in_unit = |w: f32| (0.0..=1.0).contains(&w);
        if !in_unit(vector)
            || !in_unit(lexical)
            || (vector + lexical - 1.0).abs() > WEIGHT_SUM_TOLERANCE
        {
            return Err(ConfigError::InvalidWeights { vector, lexical });
        }

        if !in_unit(self.fusion.min_similarity_floor) {
            return Err(ConfigError::OutOfRange {
                field: "fusion.min_similarity_floor",
                value: self.fusion.min_similarity_floor.to_string(),
                expected: "[0, 1]",
            });
        }
        let factor = self.fusion.relaxation_factor;
        if !(factor > 0.0 && factor < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "fusion.relaxation_factor",
                value: factor.to_string(),
                expected: "(0, 1)",
            });
        }

        if !in_unit(self.mmr.lambda) {
            return Err(ConfigError::OutOfRange {
                field: "mmr.lambda",
                value: self.mmr.lambda.to_string(),
                expected: "[0, 1]",
            });
        }

        if self.cache.ttl.is_zero() {
            return Err(ConfigError::Zero { field: "cache.ttl" });
        }

        self.retry.validate()?;

        if self.query.default_top_k == 0 {
            return Err(ConfigError::Zero {
                field: "query.default_top_k",
            });
        }
        if self.query.max_top_k == 0 {
            return Err(ConfigError::Zero {
                field: "query.max_top_k",
            });
        }
        if self.query.default_top_k > self.query.max_top_k {
            return Err(ConfigError::OutOfRange {
                field: "query.default_top_k",
                value: self.query.default_top_k.to_string(),
                expected: "<= query.max_top_k",
            });
        }
        if !in_unit(self.query.default_min_similarity) {
            return Err(ConfigError::OutOfRange {
                field: "query.default_min_similarity",
                value: self.query.default_min_similarity.to_string(),
                expected: "[0, 1]",
            });
        }

        if let Some(ref path) = self.query_log_path
            && path.is_dir()
        {
            return Err(ConfigError::NotAFile { path: path.clone() });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// `true` when no embeddings endpoint is configured.
    #[inline]
    pub fn uses_stub_embedder(&self) -> bool {
        self.embedding_url.is_none()
    }

    fn optional_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match Self::optional_env(Self::ENV_PORT) {
            Some(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            None => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match Self::optional_env(Self::ENV_BIND_ADDR) {
            Some(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            None => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::optional_env(var_name).unwrap_or(default)
    }

    fn parse_from_env<T: FromStr>(var_name: &str, default: T) -> T {
        Self::optional_env(var_name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_flag_from_env(var_name: &str) -> bool {
        Self::optional_env(var_name).is_some_and(|v| {
            matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        })
    }
}
