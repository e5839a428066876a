// src/providers/mod.rs

use crate::errors::Result;

pub mod gemini;

/// A common trait for generative text providers.
///
/// Note: We're not using async_trait here, so implementers must handle async directly.
pub trait LlmProvider: Send + Sync {
    /// Generates a response from the model based on a given prompt.
    ///
    /// # Arguments
    /// * `model` - The specific model to use for generation (e.g., "gemini-1.5-flash").
    /// * `prompt` - The input prompt to send to the model.
    ///
    /// # Returns
    /// A `Result` containing a tuple of the generated `String` and the latency in milliseconds (`u64`).
    fn generate(&self, model: &str, prompt: &str) -> impl std::future::Future<Output = Result<(String, u64)>> + Send;
}
