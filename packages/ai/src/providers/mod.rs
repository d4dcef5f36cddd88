//! LLM provider abstraction and implementations.
//!
//! Supports Google Gemini, Anthropic Claude, and `OpenAI` via a common trait.
//! A provider turns one multimodal prompt into one text answer; there is no
//! conversation state and no tool use.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use base64::Engine as _;

use crate::AiError;

/// One part of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// An inline image.
    Image {
        /// MIME type, e.g. `image/png`.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
}

impl ContentPart {
    /// Builds an image part from raw bytes, sniffing the media type.
    #[must_use]
    pub fn image(bytes: &[u8]) -> Self {
        Self::Image {
            media_type: sniff_media_type(bytes).to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Prompt parts, text first.
    pub parts: Vec<ContentPart>,
    /// Upper bound on answer length.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Concatenated text parts, for providers that need a single string.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Sends the prompt and returns the model's text answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the response carries no
    /// text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError>;
}

/// Guesses an image MIME type from its magic bytes. Unknown formats are
/// reported as JPEG.
#[must_use]
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `GEMINI_API_KEY` set -> Google Gemini
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 3. `OPENAI_API_KEY` set -> `OpenAI`
///
/// `AI_MODEL` overrides the provider's default model.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = std::env::var("AI_PROVIDER")
        .ok()
        .or_else(detect_provider)
        .ok_or_else(|| AiError::Config {
            message: "No AI credentials found. Set GEMINI_API_KEY, ANTHROPIC_API_KEY or \
                      OPENAI_API_KEY, or AI_PROVIDER explicitly."
                .to_string(),
        })?;
    let model = std::env::var("AI_MODEL").ok();

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = required_env("GEMINI_API_KEY")?;
            let model = model.unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
            log::info!("Using Gemini provider with model {model}");
            Ok(Box::new(gemini::GeminiProvider::new(api_key, model)))
        }
        "anthropic" | "claude" => {
            let api_key = required_env("ANTHROPIC_API_KEY")?;
            let model = model.unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string());
            log::info!("Using Anthropic provider with model {model}");
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        "openai" | "gpt" => {
            let base_url = std::env::var("AI_BASE_URL").ok();
            // Self-hosted OpenAI-compatible servers usually need no key.
            let api_key = match (std::env::var("OPENAI_API_KEY"), &base_url) {
                (Ok(key), _) => key,
                (Err(_), Some(_)) => String::new(),
                (Err(_), None) => required_env("OPENAI_API_KEY")?,
            };
            let model = model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            log::info!("Using OpenAI provider with model {model}");
            Ok(Box::new(openai::OpenAiProvider::new(api_key, model, base_url)))
        }
        other => Err(AiError::Config {
            message: format!(
                "Unknown AI provider: {other}. Use 'gemini', 'anthropic', or 'openai'."
            ),
        }),
    }
}

fn required_env(name: &str) -> Result<String, AiError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AiError::Config {
            message: format!("{name} environment variable not set"),
        })
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name that matches the arms in
/// [`create_provider_from_env`], or `None` when nothing is configured.
fn detect_provider() -> Option<String> {
    for (var, name) in [
        ("GEMINI_API_KEY", "gemini"),
        ("ANTHROPIC_API_KEY", "anthropic"),
        ("OPENAI_API_KEY", "openai"),
    ] {
        if std::env::var(var).is_ok_and(|value| !value.trim().is_empty()) {
            log::info!("Auto-detected AI provider: {name} ({var} found)");
            return Some(name.to_string());
        }
    }

    if std::env::var("AI_BASE_URL").is_ok() {
        log::info!("Auto-detected AI provider: openai-compatible (AI_BASE_URL found)");
        return Some("openai".to_string());
    }

    None
}

/// Truncates a provider error body for inclusion in an error message.
pub(crate) fn error_excerpt(body: &str) -> &str {
    const LIMIT: usize = 500;
    if body.len() <= LIMIT {
        return body;
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
