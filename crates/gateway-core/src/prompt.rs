//! Prompt assembly.
//!
//! Combines the caller's query with optional retrieved context. Pure and
//! deterministic: the output depends only on the persona, the query and the
//! context.

use crate::types::{AugmentedPrompt, ContextResult, Query};

/// Instruction line placed in front of retrieved context
pub const DEFAULT_PERSONA: &str = "You are an AEM Expert. Use the following context from the WKND site to answer the question concisely. If the answer isn't in the context, say you don't know.";

/// Builds the prompt sent to the generation service
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

impl PromptAssembler {
    /// Create an assembler with a custom instruction line
    #[must_use]
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    /// Assemble the final prompt.
    ///
    /// With non-empty context the query is wrapped in the grounding template;
    /// otherwise the query is passed through unchanged.
    #[must_use]
    pub fn assemble(&self, query: &Query, context: &ContextResult) -> AugmentedPrompt {
        match context.text() {
            Some(text) if !text.is_empty() => AugmentedPrompt::augmented(format!(
                "{}\n\n Context: {} \n\n Question: {}",
                self.persona,
                text,
                query.as_str()
            )),
            _ => AugmentedPrompt::plain(query),
        }
    }
}
