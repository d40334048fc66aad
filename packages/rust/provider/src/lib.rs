//! Gemini REST clients for plain and search-grounded generation.
//!
//! [`TextGenerator`] is the "prompt in, text out" seam used for titles,
//! articles, and rewrites. [`GroundedGenerator`] calls the same endpoint with
//! the Google Search tool enabled and returns a [`GroundingResponse`] whose
//! citation metadata has already been normalized; missing metadata becomes
//! empty collections, never an error.
//!
//! Neither client retries: one call in, one outbound request.

mod envelope;

use std::time::Duration;

use llmo_shared::{GeminiConfig, GroundingResponse, LlmoError, Result};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use envelope::{GenerateContentRequest, GenerateContentResponse, ListModelsResponse};

pub use envelope::ModelInfo;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("llmo/", env!("CARGO_PKG_VERSION"));

/// API version path segment.
const API_VERSION: &str = "v1beta";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Page size requested when listing models.
const MODELS_PAGE_SIZE: u32 = 1000;

/// Body excerpt length kept in log lines.
const LOG_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Sends a prompt to the completion endpoint and returns the raw text.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    /// Fails with `Provider` on transport/HTTP/timeout failure and
    /// `EmptyResponse` when the call succeeds without text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Sends a prompt with web search enabled and returns text plus citations.
#[allow(async_fn_in_trait)]
pub trait GroundedGenerator {
    /// Fails with `Provider` only on transport/HTTP failure.
    async fn generate_with_grounding(&self, prompt: &str) -> Result<GroundingResponse>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// HTTP client bound to one API key and a pair of models.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    timeout: Duration,
    base_url: Url,
    api_key: String,
    model: String,
    grounded_model: String,
}

impl GeminiClient {
    /// Build a client from the `[gemini]` config section and a resolved key.
    pub fn new(config: &GeminiConfig, api_key: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = build_client(timeout)?;
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            timeout,
            base_url,
            api_key: api_key.into(),
            model: qualify_model(&config.model),
            grounded_model: qualify_model(&config.grounded_model),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn grounded_model(&self) -> &str {
        &self.grounded_model
    }

    /// List models that support `generateContent`, following pagination.
    #[instrument(skip_all)]
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("models")?;
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .header(API_KEY_HEADER, &self.api_key)
                .query(&[("pageSize", MODELS_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let body = read_success_body(request.send().await, self.timeout).await?;
            let page: ListModelsResponse = decode(&body)?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(ModelInfo::supports_generate_content),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(count = models.len(), "listed generateContent models");
        Ok(models)
    }

    /// POST a `generateContent` request and decode the envelope.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(&format!("{model}:generateContent"))?;
        debug!(%url, "sending generateContent request");

        let result = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await;

        let body = read_success_body(result, self.timeout).await?;
        decode(&body)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{API_VERSION}/{path}"))
            .map_err(|e| LlmoError::config(format!("invalid endpoint for {path}: {e}")))
    }
}

impl TextGenerator for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.chars().count()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .generate_content(&self.model, &GenerateContentRequest::text(prompt))
            .await?;

        let text = response.text();
        if text.trim().is_empty() {
            warn!(finish_reason = ?response.finish_reason(), "model returned no text");
            return Err(LlmoError::EmptyResponse);
        }

        info!(chars = text.chars().count(), "generation complete");
        Ok(text)
    }
}

impl GroundedGenerator for GeminiClient {
    #[instrument(
        skip_all,
        fields(model = %self.grounded_model, prompt_chars = prompt.chars().count())
    )]
    async fn generate_with_grounding(&self, prompt: &str) -> Result<GroundingResponse> {
        let response = self
            .generate_content(&self.grounded_model, &GenerateContentRequest::grounded(prompt))
            .await?;

        let grounding = response.into_grounding();
        info!(
            queries = grounding.search_queries.len(),
            chunks = grounding.source_chunks.len(),
            supports = grounding.supports.len(),
            "grounded generation complete"
        );
        Ok(grounding)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with the request timeout applied.
fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| LlmoError::provider(format!("failed to build HTTP client: {e}")))
}

/// Accept `gemini-2.5-pro` as shorthand for `models/gemini-2.5-pro`.
fn qualify_model(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Turn a send result into the response body, mapping failures to `Provider`.
async fn read_success_body(
    result: std::result::Result<reqwest::Response, reqwest::Error>,
    timeout: Duration,
) -> Result<String> {
    let response = result.map_err(|e| transport_error(&e, timeout))?;
    let status = response.status();

    let body = response
        .text()
        .await
        .map_err(|e| LlmoError::provider(format!("failed to read response body: {e}")))?;

    if !status.is_success() {
        warn!(
            status = status.as_u16(),
            body = %excerpt(&body),
            "provider returned an error status"
        );
        return Err(LlmoError::http(status.as_u16(), body));
    }

    Ok(body)
}

fn transport_error(e: &reqwest::Error, timeout: Duration) -> LlmoError {
    if e.is_timeout() {
        let message = format!("request timed out after {}s", timeout.as_secs());
        warn!("{message}");
        LlmoError::provider(message)
    } else {
        warn!(error = %e, "provider request failed");
        LlmoError::provider(format!("request failed: {e}"))
    }
}

/// Decode a 2xx body. Non-JSON bodies are a provider fault, reported with the body.
fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| LlmoError::Provider {
        message: format!("malformed response envelope: {e}"),
        status: None,
        body: Some(body.to_string()),
    })
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_CHARS).collect()
}
