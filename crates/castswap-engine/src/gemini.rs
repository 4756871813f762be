use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use castswap_contracts::failures::{GenerationFailure, ENTITY_NOT_FOUND_SIGNATURE};
use castswap_contracts::images::GeneratedImage;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};

use crate::config::StudioConfig;
use crate::request::CompositeRequest;
use crate::response::{resolve_response, GenerateContentResponse};

pub type GenerationOutcome = Result<GeneratedImage, GenerationFailure>;

/// Turns one composite request into exactly one image or one classified
/// failure. No retries.
pub trait CompositeGenerator {
    fn name(&self) -> &str;
    fn generate(&self, request: &CompositeRequest, api_key: &str) -> GenerationOutcome;
}

pub struct GeminiImageClient {
    api_base: String,
    model: String,
    http: HttpClient,
}

impl GeminiImageClient {
    /// The HTTP client has no request timeout; the call waits for the
    /// service to answer.
    pub fn new(config: &StudioConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(None::<Duration>)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn post(&self, request: &CompositeRequest, api_key: &str) -> Result<GenerateContentResponse> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&request.payload())
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let body = response_body_or_error(response)?;
        serde_json::from_str(&body).context("Gemini returned invalid JSON payload")
    }
}

impl CompositeGenerator for GeminiImageClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &CompositeRequest, api_key: &str) -> GenerationOutcome {
        match self.post(request, api_key) {
            Ok(response) => resolve_response(&response).into_outcome(),
            Err(err) => Err(translate_transport_error(&err)),
        }
    }
}

/// Non-2xx answer from the service. Display shortens the body; the full
/// body stays available for classification.
#[derive(Debug)]
pub struct GeminiStatusError {
    pub code: u16,
    pub body: String,
}

impl fmt::Display for GeminiStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Gemini request failed ({}): {}",
            self.code,
            truncate_text(&self.body, 512)
        )
    }
}

impl std::error::Error for GeminiStatusError {}

/// Classifies a failed call. The entity-not-found signature anywhere in the
/// error chain or a status body means the API key was rejected. Only the
/// message shown to the user is shortened.
pub fn translate_transport_error(err: &anyhow::Error) -> GenerationFailure {
    if mentions_entity_not_found(err) {
        return GenerationFailure::auth_key_invalid();
    }
    GenerationFailure::from_transport_message(&error_chain_text(err, 1024))
}

fn mentions_entity_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.to_string().contains(ENTITY_NOT_FOUND_SIGNATURE)
            || cause
                .downcast_ref::<GeminiStatusError>()
                .map(|status| status.body.contains(ENTITY_NOT_FOUND_SIGNATURE))
                .unwrap_or(false)
    })
}

fn response_body_or_error(response: HttpResponse) -> Result<String> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .context("Gemini response body read failed")?;
    if !status.is_success() {
        return Err(GeminiStatusError { code, body }.into());
    }
    Ok(body)
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use castswap_contracts::failures::{FailureKind, AUTH_KEY_INVALID_MESSAGE, GENERIC_FALLBACK_MESSAGE};

    use super::{error_chain_text, translate_transport_error, GeminiImageClient, GeminiStatusError};
    use crate::config::StudioConfig;

    #[test]
    fn endpoint_prefixes_models_path_once() -> anyhow::Result<()> {
        let mut config = StudioConfig {
            api_base: "https://example.test/v1beta/".to_string(),
            ..StudioConfig::default()
        };
        let client = GeminiImageClient::new(&config)?;
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-3-pro-image-preview:generateContent"
        );

        config.model = "models/custom-image".to_string();
        let client = GeminiImageClient::new(&config)?;
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/custom-image:generateContent"
        );
        Ok(())
    }

    #[test]
    fn nested_entity_not_found_is_auth_failure() {
        let err = anyhow::anyhow!("Requested entity was not found.")
            .context("Gemini request failed (https://example.test)");
        let failure = translate_transport_error(&err);
        assert_eq!(failure.kind, FailureKind::AuthKeyInvalid);
        assert_eq!(failure.message, AUTH_KEY_INVALID_MESSAGE);
    }

    #[test]
    fn entity_not_found_deep_in_long_status_body_is_auth_failure() {
        let body = format!(
            r#"{{"error":{{"code":404,"details":"{}","message":"Requested entity was not found."}}}}"#,
            "d".repeat(600)
        );
        let err = anyhow::Error::new(GeminiStatusError { code: 404, body })
            .context("generation call failed");
        assert!(!err.to_string().contains("Requested entity"));
        let failure = translate_transport_error(&err);
        assert_eq!(failure.kind, FailureKind::AuthKeyInvalid);
    }

    #[test]
    fn entity_not_found_past_chain_limit_is_auth_failure() {
        let err = anyhow::anyhow!("Requested entity was not found.").context("x".repeat(2000));
        assert_eq!(
            translate_transport_error(&err).kind,
            FailureKind::AuthKeyInvalid
        );
    }

    #[test]
    fn status_error_display_shortens_body() {
        let err = GeminiStatusError {
            code: 500,
            body: "b".repeat(700),
        };
        let shown = err.to_string();
        assert!(shown.starts_with("Gemini request failed (500): "));
        assert!(shown.ends_with('…'));
        assert_eq!(shown.matches('b').count(), 512);
    }

    #[test]
    fn other_errors_keep_their_chain() {
        let err = anyhow::anyhow!("connection refused").context("Gemini request failed");
        let failure = translate_transport_error(&err);
        assert_eq!(failure.kind, FailureKind::Generic);
        assert_eq!(
            failure.message,
            "Gemini request failed | caused by: connection refused"
        );
    }

    #[test]
    fn blank_errors_use_fallback_message() {
        let failure = translate_transport_error(&anyhow::anyhow!("   "));
        assert_eq!(failure.message, GENERIC_FALLBACK_MESSAGE);
    }

    #[test]
    fn error_chain_text_skips_duplicates_and_truncates() {
        let err = anyhow::anyhow!("same").context("same").context("outer");
        assert_eq!(error_chain_text(&err, 400), "outer | caused by: same");
        let long = anyhow::anyhow!("x".repeat(50));
        assert_eq!(error_chain_text(&long, 10), format!("{}…", "x".repeat(10)));
    }
}
