//! Model seam: one request in, one text reply out.
//!
//! Every stage talks to the model through [`GenerativeModel`]. The
//! production implementation, [`GeminiModel`], wraps an `edgequake-llm`
//! provider; tests substitute a recording fake so stage wiring (how many
//! requests, which images, which prompt text) can be checked offline.
//!
//! ## No retries
//!
//! A failed call is returned as [`ReportError::ModelCall`] naming the stage
//! and the run stops there. Nothing already produced is lost: earlier stage
//! outputs are never written to disk before the report is composed anyway.

use crate::config::{check_model_name, ReportConfig, API_KEY_ENV};
use crate::error::{PipelineWarning, ReportError};
use crate::output::Stage;
use crate::prompts::SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Sampling temperature for every stage. Financial figures must not drift.
pub const TEMPERATURE: f32 = 0.0;

/// One generation request.
#[derive(Clone)]
pub struct ModelRequest {
    pub stage: Stage,
    /// Instruction text, sent after the images.
    pub prompt: String,
    /// Page images in the order the model should see them.
    pub images: Vec<ImageData>,
}

impl fmt::Debug for ModelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRequest")
            .field("stage", &self.stage)
            .field("prompt_chars", &self.prompt.len())
            .field("images", &self.images.len())
            .finish()
    }
}

/// The model's reply text plus token accounting.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ModelReply {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A configured generative model.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Identifier the model was configured with.
    fn model_name(&self) -> &str;

    /// Send one request and wait for the complete reply.
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ReportError>;
}

/// What a stage hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct StageRun<T> {
    pub output: T,
    pub warning: Option<PipelineWarning>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Send `request` and log the accounting.
pub(crate) async fn timed_generate(
    model: &dyn GenerativeModel,
    request: ModelRequest,
) -> Result<(ModelReply, u64), ReportError> {
    let stage = request.stage;
    let start = Instant::now();
    info!("{}: sending request to {}", stage, model.model_name());
    debug!("{}: {:?}", stage, request);

    let reply = model.generate(request).await?;
    let duration_ms = start.elapsed().as_millis() as u64;

    debug!(
        "{}: {} input tokens, {} output tokens, {} chars in {}ms",
        stage,
        reply.input_tokens,
        reply.output_tokens,
        reply.text.len(),
        duration_ms
    );
    Ok((reply, duration_ms))
}

/// Gemini through the `edgequake-llm` provider factory.
pub struct GeminiModel {
    provider: Arc<dyn LLMProvider>,
    model_name: String,
    system_prompt: String,
    max_tokens: Option<usize>,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("model_name", &self.model_name)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl GeminiModel {
    /// Check the model name and API key, then build the provider.
    ///
    /// # Errors
    /// * [`ReportError::UnsupportedModel`]: name outside the Gemini family
    /// * [`ReportError::MissingApiKey`]: `GEMINI_API_KEY` unset or empty
    /// * [`ReportError::ModelInitialization`]: the factory rejected it
    pub fn connect(config: &ReportConfig) -> Result<Self, ReportError> {
        check_model_name(&config.model_name)?;

        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => {}
            _ => return Err(ReportError::MissingApiKey { var: API_KEY_ENV }),
        }

        let provider = ProviderFactory::create_llm_provider("gemini", &config.model_name)
            .map_err(|e| ReportError::ModelInitialization {
                model: config.model_name.clone(),
                detail: e.to_string(),
            })?;

        info!("initialized Gemini model: {}", config.model_name);
        Ok(Self::with_provider(provider, config))
    }

    /// Wrap an already-built provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &ReportConfig) -> Self {
        Self {
            provider,
            model_name: config.model_name.clone(),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| SYSTEM_PROMPT.to_string()),
            max_tokens: config.max_tokens,
        }
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(TEMPERATURE),
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ReportError> {
        let ModelRequest {
            stage,
            prompt,
            images,
        } = request;

        let user = if images.is_empty() {
            ChatMessage::user(&prompt)
        } else {
            ChatMessage::user_with_images(&prompt, images)
        };
        let messages = vec![ChatMessage::system(self.system_prompt.as_str()), user];
        let options = self.build_options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ReportError::ModelCall {
                stage,
                message: e.to_string(),
            })?;

        Ok(ModelReply {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}
