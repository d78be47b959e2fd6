//! Request pipeline.
//!
//! One request flows through four stages in order:
//!
//! ```text
//! validate -> fetch_context -> assemble -> relay
//! ```
//!
//! Only `validate` and `relay` can fail. Context retrieval always yields a
//! [`ContextResult`], so an unavailable context service degrades the prompt
//! instead of failing the request.

use gateway_core::{AugmentedPrompt, ContextResult, GatewayResult, PromptAssembler, Query};
use gateway_providers::{ContextSource, GenerationSource, RelayStream};
use gateway_telemetry::{Metrics, Stage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Sequences context retrieval, prompt assembly and the generation relay
#[derive(Clone)]
pub struct Orchestrator {
    context: Arc<dyn ContextSource>,
    generation: Arc<dyn GenerationSource>,
    assembler: PromptAssembler,
    model: String,
    metrics: Metrics,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(
        context: Arc<dyn ContextSource>,
        generation: Arc<dyn GenerationSource>,
        assembler: PromptAssembler,
        model: impl Into<String>,
        metrics: Metrics,
    ) -> Self {
        Self {
            context,
            generation,
            assembler,
            model: model.into(),
            metrics,
        }
    }

    /// Run every stage up to the start of the relay.
    ///
    /// On success the returned stream yields the generation lines; the
    /// caller owns the rest of the request.
    #[instrument(skip_all)]
    pub async fn run(&self, raw_prompt: Option<&str>) -> GatewayResult<RelayStream> {
        let query = Self::validate(raw_prompt)?;
        let context = self.fetch_context(&query).await;
        let prompt = self.assemble(&query, &context);
        self.relay(&prompt).await
    }

    /// Trim and validate the caller's prompt
    pub fn validate(raw_prompt: Option<&str>) -> GatewayResult<Query> {
        let query = Query::parse(raw_prompt)?;
        debug!(query_chars = query.char_len(), "Prompt accepted");
        Ok(query)
    }

    /// Retrieve context for the query. Never fails.
    pub async fn fetch_context(&self, query: &Query) -> ContextResult {
        let start = Instant::now();
        let context = self.context.retrieve(query).await;
        self.metrics.observe_stage(Stage::Context, start.elapsed());
        self.metrics.record_context(&context);
        context
    }

    /// Build the prompt sent to the generation service
    #[must_use]
    pub fn assemble(&self, query: &Query, context: &ContextResult) -> AugmentedPrompt {
        let prompt = self.assembler.assemble(query, context);
        debug!(
            augmented = prompt.is_augmented(),
            prompt_chars = prompt.as_str().len(),
            "Prompt assembled"
        );
        prompt
    }

    /// Start the generation stream with the configured model
    pub async fn relay(&self, prompt: &AugmentedPrompt) -> GatewayResult<RelayStream> {
        let start = Instant::now();
        let stream = self.generation.generate_stream(prompt, &self.model).await;
        self.metrics.observe_stage(Stage::FirstByte, start.elapsed());
        stream
    }
}
