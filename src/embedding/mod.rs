//! Embedding providers and vector math.
//!
//! - [`HttpEmbeddingClient`] talks to an OpenAI-compatible `/embeddings` endpoint.
//! - [`HashEmbedder`] is the deterministic offline stub.

mod error;
/// OpenAI-compatible HTTP client.
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod provider;
/// Feature-hashing stub embedder.
pub mod stub;
pub mod vector;


pub use error::{EmbeddingError, is_retryable_status};
pub use http::HttpEmbeddingClient;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbedder, MockEmbeddingFailure};
pub use provider::EmbeddingProvider;
pub use stub::{HashEmbedder, STUB_MODEL_NAME};
pub use vector::{cosine_similarity, dot, l2_normalize, norm};
