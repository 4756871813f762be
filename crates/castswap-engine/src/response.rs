use castswap_contracts::failures::GenerationFailure;
use castswap_contracts::images::GeneratedImage;
use serde::Deserialize;

pub const SAFETY_FINISH_REASON: &str = "SAFETY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(alias = "inline_data")]
    pub inline_data: Option<InlineData>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

/// What a generate-content response amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Image { data: String },
    SafetyBlocked,
    TextFeedback(String),
    Empty,
    NoUsableContent,
}

impl Resolution {
    pub fn into_outcome(self) -> Result<GeneratedImage, GenerationFailure> {
        match self {
            Self::Image { data } => Ok(GeneratedImage::from_base64_png(&data)),
            Self::SafetyBlocked => Err(GenerationFailure::safety()),
            Self::TextFeedback(text) => Err(GenerationFailure::model_text_feedback(text)),
            Self::Empty => Err(GenerationFailure::generation_empty()),
            Self::NoUsableContent => Err(GenerationFailure::generation_failed()),
        }
    }
}

/// Only the first candidate is considered. The first inline image wins, then
/// the first non-empty text part.
pub fn resolve_response(response: &GenerateContentResponse) -> Resolution {
    let candidate = response.candidates.first();
    let parts = candidate
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.as_deref())
        .filter(|parts| !parts.is_empty());

    let Some(parts) = parts else {
        let blocked = candidate
            .and_then(|candidate| candidate.finish_reason.as_deref())
            .map(|reason| reason == SAFETY_FINISH_REASON)
            .unwrap_or(false);
        return if blocked {
            Resolution::SafetyBlocked
        } else {
            Resolution::Empty
        };
    };

    if let Some(inline) = parts.iter().find_map(|part| part.inline_data.as_ref()) {
        return Resolution::Image {
            data: inline.data.clone(),
        };
    }

    if let Some(text) = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .find(|text| !text.is_empty())
    {
        return Resolution::TextFeedback(text.to_string());
    }

    Resolution::NoUsableContent
}
