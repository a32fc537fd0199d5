//! Answer generation seam.
//!
//! The orchestrator hands a question and its ordered context passages to an
//! [`AnswerGenerator`]. Concrete chat-completion backends live in the app
//! crate; this module only owns the trait and the prompt template.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Passage;

/// Returned instead of a generated answer when retrieval finds nothing.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Produces an answer conditioned on context passages.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Generate an answer. `passages` are ordered closest first.
    async fn generate(&self, question: &str, passages: &[Passage]) -> Result<String>;
}

/// Render the single user message sent to a chat model.
pub fn build_prompt(question: &str, passages: &[Passage]) -> String {
    let context = passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are a helpful assistant. Use the following context to answer the question.\n\n\
         Context:\n{}\n\n\
         Question:\n{}\n\n\
         Answer:",
        context, question
    )
}
