use serde::Serialize;

use crate::failures::GenerationFailure;
use crate::images::{GeneratedImage, ImageId, UploadedImage};

pub const DEFAULT_MAX_PERSONS: usize = 5;

/// Snapshot of one studio session. Only [`reduce`] produces new values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub poster: Option<UploadedImage>,
    pub persons: Vec<UploadedImage>,
    pub is_processing: bool,
    pub result: Option<GeneratedImage>,
    pub error: Option<GenerationFailure>,
    pub api_key_selected: bool,
    pub max_persons: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PERSONS)
    }
}

impl AppState {
    pub fn new(max_persons: usize) -> Self {
        Self {
            poster: None,
            persons: Vec::new(),
            is_processing: false,
            result: None,
            error: None,
            api_key_selected: false,
            max_persons: max_persons.max(1),
        }
    }

    pub fn remaining_person_slots(&self) -> usize {
        self.max_persons.saturating_sub(self.persons.len())
    }

    pub fn person(&self, id: &ImageId) -> Option<&UploadedImage> {
        self.persons.iter().find(|person| &person.id == id)
    }

    /// First unmet precondition for a generation, checked poster, then
    /// person, then credential.
    pub fn unmet_precondition(&self) -> Option<GenerationFailure> {
        if self.poster.is_none() {
            return Some(GenerationFailure::missing_poster());
        }
        if self.persons.is_empty() {
            return Some(GenerationFailure::missing_person());
        }
        if !self.api_key_selected {
            return Some(GenerationFailure::missing_credential());
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    PosterSelected(UploadedImage),
    PosterCleared,
    PersonAdded(UploadedImage),
    PersonRemoved(ImageId),
    ApiKeySelected,
    ApiKeyInvalidated,
    GenerationStarted,
    GenerationSucceeded(GeneratedImage),
    GenerationFailed(GenerationFailure),
    ErrorDismissed,
    Reset,
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PosterSelected(_) => "poster_selected",
            Self::PosterCleared => "poster_cleared",
            Self::PersonAdded(_) => "person_added",
            Self::PersonRemoved(_) => "person_removed",
            Self::ApiKeySelected => "api_key_selected",
            Self::ApiKeyInvalidated => "api_key_invalidated",
            Self::GenerationStarted => "generation_started",
            Self::GenerationSucceeded(_) => "generation_succeeded",
            Self::GenerationFailed(_) => "generation_failed",
            Self::ErrorDismissed => "error_dismissed",
            Self::Reset => "reset",
        }
    }
}

/// Applies one action and returns the replacement state.
pub fn reduce(state: AppState, action: SessionAction) -> AppState {
    match action {
        SessionAction::PosterSelected(image) => AppState {
            poster: Some(image),
            ..state
        },
        SessionAction::PosterCleared => AppState {
            poster: None,
            ..state
        },
        SessionAction::PersonAdded(image) => {
            if state.persons.len() >= state.max_persons {
                return state;
            }
            let mut persons = state.persons;
            persons.push(image);
            AppState { persons, ..state }
        }
        SessionAction::PersonRemoved(id) => {
            let persons = state
                .persons
                .into_iter()
                .filter(|person| person.id != id)
                .collect();
            AppState { persons, ..state }
        }
        SessionAction::ApiKeySelected => AppState {
            api_key_selected: true,
            ..state
        },
        SessionAction::ApiKeyInvalidated => AppState {
            api_key_selected: false,
            ..state
        },
        SessionAction::GenerationStarted => {
            if state.is_processing {
                return state;
            }
            AppState {
                is_processing: true,
                result: None,
                error: None,
                ..state
            }
        }
        SessionAction::GenerationSucceeded(image) => AppState {
            is_processing: false,
            result: Some(image),
            error: None,
            ..state
        },
        SessionAction::GenerationFailed(failure) => AppState {
            is_processing: false,
            error: Some(failure),
            ..state
        },
        SessionAction::ErrorDismissed => AppState {
            error: None,
            ..state
        },
        SessionAction::Reset => AppState {
            api_key_selected: state.api_key_selected,
            ..AppState::new(state.max_persons)
        },
    }
}
