//! Generative-language collaborator.
//!
//! The gateway only needs "formatted prompt in, completion text out".
//! [`gemini::GeminiGenerator`] is the production implementation.

pub mod gemini;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;

pub use gemini::GeminiGenerator;
pub use prompt::format_test_case_prompt;

/// Produces a text completion for a fully formatted prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestCaseGenerator: Send + Sync {
    /// Return the completion text.
    ///
    /// Failures must surface as
    /// [`GatewayError::Generation`](crate::error::GatewayError::Generation).
    async fn generate(&self, prompt: &str) -> Result<String>;
}
