//! Answer generation from retrieved context.

pub mod chat;
pub mod echo;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod provider;


pub use chat::{GenaiGenerator, render_prompt};
pub use echo::{ECHO_MODEL_NAME, EchoGenerator};
pub use error::GenerationError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MOCK_MODEL_NAME, MockGenerationFailure, MockGenerator};
pub use provider::{GenerationProvider, GenerationRequest, GenerationResponse};
