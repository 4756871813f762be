use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use castswap_contracts::events::{redact_inline_data, EventWriter};
use castswap_contracts::failures::{FailureKind, GenerationFailure};
use castswap_contracts::images::{ImageId, UploadedImage};
use castswap_contracts::session::{reduce, AppState, SessionAction};
use serde_json::{json, Map, Value};

use crate::credentials::CredentialProvider;
use crate::gemini::{CompositeGenerator, GenerationOutcome};
use crate::ingest::{ingest_selection, UploadMode};
use crate::request::CompositeRequest;

pub const DEFAULT_RESULT_FILE_NAME: &str = "castswap-result.png";

#[derive(Debug, Default)]
pub struct PersonUploadReport {
    pub added: Vec<UploadedImage>,
    pub failed: Vec<(PathBuf, String)>,
    /// Files dropped because the person list was already full.
    pub skipped: usize,
}

/// One interactive session: owns the state and is its only mutator.
///
/// Event log writes after startup never interrupt a state change; the
/// latest write failure is held until [`Studio::take_event_error`].
pub struct Studio<G, C> {
    state: AppState,
    generator: G,
    credentials: C,
    events: Option<EventWriter>,
    event_error: Option<anyhow::Error>,
}

impl<G, C> Studio<G, C>
where
    G: CompositeGenerator,
    C: CredentialProvider,
{
    pub fn new(
        generator: G,
        credentials: C,
        max_persons: usize,
        events: Option<EventWriter>,
    ) -> Result<Self> {
        let mut studio = Self {
            state: AppState::new(max_persons),
            generator,
            credentials,
            events,
            event_error: None,
        };
        studio.sync_api_key();
        studio.write_event(
            "session_started",
            json!({
                "generator": studio.generator.name(),
                "max_persons": studio.state.max_persons,
                "api_key_selected": studio.state.api_key_selected,
            }),
        )?;
        Ok(studio)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn credentials_mut(&mut self) -> &mut C {
        &mut self.credentials
    }

    pub fn take_event_error(&mut self) -> Option<anyhow::Error> {
        self.event_error.take()
    }

    pub fn dispatch(&mut self, action: SessionAction) {
        let current = mem::take(&mut self.state);
        self.state = reduce(current, action);
    }

    /// Re-reads the host's key selection into the cached flag.
    pub fn sync_api_key(&mut self) -> bool {
        let selected = self.credentials.has_selected_key();
        self.dispatch(if selected {
            SessionAction::ApiKeySelected
        } else {
            SessionAction::ApiKeyInvalidated
        });
        selected
    }

    pub fn select_api_key(&mut self) -> Result<bool> {
        self.credentials.open_select_key()?;
        Ok(self.sync_api_key())
    }

    pub fn upload_poster(&mut self, path: &Path) -> Result<UploadedImage> {
        let ingested = ingest_selection(&[path.to_path_buf()], UploadMode::Single)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no poster selected"))?;
        match ingested.image {
            Ok(image) => {
                self.dispatch(SessionAction::PosterSelected(image.clone()));
                self.emit_ingested("poster", &image);
                Ok(image)
            }
            Err(err) => {
                self.emit_ingest_failed("poster", &ingested.path, &err);
                Err(err)
            }
        }
    }

    /// Ingests up to the remaining person slots. Images join the list in
    /// the order their ingestion completes.
    pub fn upload_persons(&mut self, paths: &[PathBuf]) -> PersonUploadReport {
        let slots = self.state.remaining_person_slots();
        let mut report = PersonUploadReport {
            skipped: paths.len().saturating_sub(slots),
            ..PersonUploadReport::default()
        };
        for ingested in ingest_selection(paths, UploadMode::Multiple { max_files: slots }) {
            match ingested.image {
                Ok(image) => {
                    self.dispatch(SessionAction::PersonAdded(image.clone()));
                    self.emit_ingested("person", &image);
                    report.added.push(image);
                }
                Err(err) => {
                    self.emit_ingest_failed("person", &ingested.path, &err);
                    report.failed.push((ingested.path, format!("{err:#}")));
                }
            }
        }
        report
    }

    pub fn remove_person(&mut self, id: &ImageId) -> bool {
        if self.state.person(id).is_none() {
            return false;
        }
        self.dispatch(SessionAction::PersonRemoved(id.clone()));
        true
    }

    pub fn clear_poster(&mut self) {
        self.dispatch(SessionAction::PosterCleared);
    }

    pub fn dismiss_error(&mut self) {
        self.dispatch(SessionAction::ErrorDismissed);
    }

    pub fn reset(&mut self) {
        self.dispatch(SessionAction::Reset);
        self.emit("session_reset", json!({}));
    }

    /// Runs one generation. Precondition failures are recorded without
    /// calling the generator. An `AUTH_KEY_INVALID` outcome also clears the
    /// cached key selection.
    pub fn generate(&mut self) -> Result<GenerationOutcome> {
        if self.state.is_processing {
            bail!("a generation is already in progress");
        }

        let (request, api_key) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(failure) => {
                self.record_failure(&failure, true);
                return Ok(Err(failure));
            }
        };

        self.emit(
            "generation_started",
            json!({
                "generator": self.generator.name(),
                "aspect_ratio": request.aspect_ratio.as_str(),
                "image_size": request.image_size.as_str(),
                "persons": request.persons.len(),
                "payload": redact_inline_data(&request.payload()),
            }),
        );
        self.dispatch(SessionAction::GenerationStarted);

        let outcome = self.generator.generate(&request, &api_key);
        match &outcome {
            Ok(image) => {
                self.dispatch(SessionAction::GenerationSucceeded(image.clone()));
                self.emit(
                    "generation_succeeded",
                    json!({ "data_chars": image.base64_payload().len() }),
                );
            }
            Err(failure) => self.record_failure(failure, false),
        }
        Ok(outcome)
    }

    /// Writes the current result to `target`, or into it when `target` is
    /// a directory.
    pub fn download(&mut self, target: &Path) -> Result<PathBuf> {
        let Some(result) = self.state.result.as_ref() else {
            bail!("no generated image to download");
        };
        let bytes = BASE64
            .decode(result.base64_payload().as_bytes())
            .context("generated image base64 decode failed")?;
        let path = if target.is_dir() {
            target.join(DEFAULT_RESULT_FILE_NAME)
        } else {
            target.to_path_buf()
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
        self.emit(
            "result_saved",
            json!({
                "path": path.to_string_lossy(),
                "bytes": bytes.len(),
            }),
        );
        Ok(path)
    }

    fn prepare(&mut self) -> std::result::Result<(CompositeRequest, String), GenerationFailure> {
        if let Some(failure) = self.state.unmet_precondition() {
            return Err(failure);
        }
        let Some(api_key) = self.credentials.api_key() else {
            self.dispatch(SessionAction::ApiKeyInvalidated);
            return Err(GenerationFailure::missing_credential());
        };
        let poster = self
            .state
            .poster
            .clone()
            .ok_or_else(GenerationFailure::missing_poster)?;
        Ok((
            CompositeRequest::new(poster, self.state.persons.clone()),
            api_key,
        ))
    }

    fn record_failure(&mut self, failure: &GenerationFailure, precondition: bool) {
        if failure.kind == FailureKind::AuthKeyInvalid {
            self.dispatch(SessionAction::ApiKeyInvalidated);
        }
        self.dispatch(SessionAction::GenerationFailed(failure.clone()));
        self.emit(
            "generation_failed",
            json!({
                "kind": failure.kind.as_str(),
                "message": failure.message,
                "precondition": precondition,
            }),
        );
    }

    fn emit_ingested(&mut self, role: &str, image: &UploadedImage) {
        self.emit(
            "image_ingested",
            json!({
                "role": role,
                "image_id": image.id.as_str(),
                "file_name": image.file_name,
                "mime_type": image.mime_type,
                "width": image.width,
                "height": image.height,
            }),
        );
    }

    fn emit_ingest_failed(&mut self, role: &str, path: &Path, err: &anyhow::Error) {
        self.emit(
            "image_ingest_failed",
            json!({
                "role": role,
                "path": path.to_string_lossy(),
                "error": format!("{err:#}"),
            }),
        );
    }

    fn emit(&mut self, event_type: &str, payload: Value) {
        if let Err(err) = self.write_event(event_type, payload) {
            self.event_error = Some(err.context(format!("failed to log {event_type}")));
        }
    }

    fn write_event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(events) = &self.events {
            events.emit(event_type, map_object(payload))?;
        }
        Ok(())
    }
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
