use std::fmt;

use serde::{Deserialize, Serialize};

/// Substring the remote service uses when the selected API key (or the
/// project behind it) cannot be resolved.
pub const ENTITY_NOT_FOUND_SIGNATURE: &str = "Requested entity was not found";

pub const MISSING_POSTER_MESSAGE: &str = "Please upload a movie poster first.";
pub const MISSING_PERSON_MESSAGE: &str = "Please upload at least one photo of a person.";
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "Please select an API key before generating (use /key or set GEMINI_API_KEY).";
pub const SAFETY_MESSAGE: &str =
    "The request was blocked by safety filters. Try different poster or person images.";
pub const GENERATION_EMPTY_MESSAGE: &str =
    "The model returned no content. Please try again.";
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate an image. The model response contained no image.";
pub const AUTH_KEY_INVALID_MESSAGE: &str =
    "Your API key is invalid or has expired. Please select a valid API key and try again.";
pub const GENERIC_FALLBACK_MESSAGE: &str = "An unexpected error occurred while generating the image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    MissingPoster,
    MissingPerson,
    MissingCredential,
    Safety,
    GenerationEmpty,
    ModelTextFeedback,
    AuthKeyInvalid,
    GenerationFailed,
    Generic,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingPoster => "MISSING_POSTER",
            Self::MissingPerson => "MISSING_PERSON",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::Safety => "SAFETY",
            Self::GenerationEmpty => "GENERATION_EMPTY",
            Self::ModelTextFeedback => "MODEL_TEXT_FEEDBACK",
            Self::AuthKeyInvalid => "AUTH_KEY_INVALID",
            Self::GenerationFailed => "GENERATION_FAILED",
            Self::Generic => "GENERIC",
        }
    }

    pub fn is_precondition(self) -> bool {
        matches!(
            self,
            Self::MissingPoster | Self::MissingPerson | Self::MissingCredential
        )
    }
}

/// Classified, user-presentable failure of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_poster() -> Self {
        Self::new(FailureKind::MissingPoster, MISSING_POSTER_MESSAGE)
    }

    pub fn missing_person() -> Self {
        Self::new(FailureKind::MissingPerson, MISSING_PERSON_MESSAGE)
    }

    pub fn missing_credential() -> Self {
        Self::new(FailureKind::MissingCredential, MISSING_CREDENTIAL_MESSAGE)
    }

    pub fn safety() -> Self {
        Self::new(FailureKind::Safety, SAFETY_MESSAGE)
    }

    pub fn generation_empty() -> Self {
        Self::new(FailureKind::GenerationEmpty, GENERATION_EMPTY_MESSAGE)
    }

    pub fn generation_failed() -> Self {
        Self::new(FailureKind::GenerationFailed, GENERATION_FAILED_MESSAGE)
    }

    /// Text the model sent back instead of an image, surfaced verbatim.
    pub fn model_text_feedback(text: impl Into<String>) -> Self {
        Self::new(FailureKind::ModelTextFeedback, text)
    }

    pub fn auth_key_invalid() -> Self {
        Self::new(FailureKind::AuthKeyInvalid, AUTH_KEY_INVALID_MESSAGE)
    }

    /// Keeps `message` as given; only blank text falls back.
    pub fn generic(message: &str) -> Self {
        if message.trim().is_empty() {
            return Self::new(FailureKind::Generic, GENERIC_FALLBACK_MESSAGE);
        }
        Self::new(FailureKind::Generic, message)
    }

    /// Maps a transport or service error message onto the taxonomy. The
    /// entity-not-found signature always wins over the rest of the text.
    pub fn from_transport_message(message: &str) -> Self {
        if message.contains(ENTITY_NOT_FOUND_SIGNATURE) {
            return Self::auth_key_invalid();
        }
        Self::generic(message)
    }

    pub fn is_precondition(&self) -> bool {
        self.kind.is_precondition()
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GenerationFailure {}

#[cfg(test)]
mod tests {
    use super::{FailureKind, GenerationFailure, AUTH_KEY_INVALID_MESSAGE, GENERIC_FALLBACK_MESSAGE};

    #[test]
    fn entity_not_found_always_maps_to_auth_failure() {
        let failure = GenerationFailure::from_transport_message(
            "Gemini request failed (404): {\"error\":{\"code\":404,\"message\":\"Requested entity was not found.\",\"status\":\"SAFETY\"}}",
        );
        assert_eq!(failure.kind, FailureKind::AuthKeyInvalid);
        assert_eq!(failure.message, AUTH_KEY_INVALID_MESSAGE);
    }

    #[test]
    fn other_transport_messages_pass_through_verbatim() {
        let failure = GenerationFailure::from_transport_message("  connection reset by peer \n");
        assert_eq!(failure.kind, FailureKind::Generic);
        assert_eq!(failure.message, "  connection reset by peer \n");
    }

    #[test]
    fn blank_transport_message_uses_fallback() {
        let failure = GenerationFailure::from_transport_message("   ");
        assert_eq!(failure.kind, FailureKind::Generic);
        assert_eq!(failure.message, GENERIC_FALLBACK_MESSAGE);
    }

    #[test]
    fn precondition_kinds_are_flagged() {
        assert!(GenerationFailure::missing_poster().is_precondition());
        assert!(GenerationFailure::missing_person().is_precondition());
        assert!(GenerationFailure::missing_credential().is_precondition());
        assert!(!GenerationFailure::safety().is_precondition());
        assert!(!GenerationFailure::generic("boom").is_precondition());
    }

    #[test]
    fn text_feedback_is_kept_verbatim() {
        let failure = GenerationFailure::model_text_feedback("I can't edit faces of real people.");
        assert_eq!(failure.kind, FailureKind::ModelTextFeedback);
        assert_eq!(failure.to_string(), "I can't edit faces of real people.");
    }

    #[test]
    fn kinds_serialize_as_screaming_snake_case() {
        assert_eq!(FailureKind::AuthKeyInvalid.as_str(), "AUTH_KEY_INVALID");
        assert_eq!(
            serde_json::to_value(FailureKind::ModelTextFeedback).unwrap_or_default(),
            serde_json::json!("MODEL_TEXT_FEEDBACK")
        );
    }
}
