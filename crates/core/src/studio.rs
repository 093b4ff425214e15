//! In-memory session state: uploaded photos, selection, prompt, status,
//! and the most recent result.
//!
//! [`Studio`] never talks to the network. A front end calls
//! [`Studio::begin_generation`] to obtain a [`GenerationTicket`], hands the
//! ticket's payload to the generation driver, and reports the outcome back
//! with [`Studio::complete_generation`] or [`Studio::fail_generation`].
//!
//! At most one generation is in flight. Outcomes for a ticket whose photo
//! was deselected in the meantime are discarded, but they still release the
//! in-flight slot.

use serde::Serialize;

use crate::error::CoreError;
use crate::photo::PhotoMemory;
use crate::prompt;
use crate::status::AppStatus;
use crate::types::PhotoId;

/// One produced video and the prompt that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedVideo {
    /// Playable locator, credential already attached.
    pub uri: String,
    pub prompt: String,
}

/// Everything the driver needs for one generation, captured at the moment
/// the user pressed "generate".
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    id: u64,
    photo_id: PhotoId,
    image_base64: String,
    mime_type: &'static str,
    prompt: String,
}

impl GenerationTicket {
    pub fn photo_id(&self) -> PhotoId {
        self.photo_id
    }

    pub fn image_base64(&self) -> &str {
        &self.image_base64
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Effective prompt, default already substituted.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Session state holder.
#[derive(Debug, Default)]
pub struct Studio {
    photos: Vec<PhotoMemory>,
    selected: Option<PhotoId>,
    prompt: String,
    status: AppStatus,
    result: Option<GeneratedVideo>,
    last_error: Option<String>,
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl Studio {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- accessors ----

    pub fn photos(&self) -> &[PhotoMemory] {
        &self.photos
    }

    pub fn selected_photo(&self) -> Option<&PhotoMemory> {
        let id = self.selected?;
        self.photos.iter().find(|photo| photo.id() == id)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> AppStatus {
        self.status
    }

    pub fn result(&self) -> Option<&GeneratedVideo> {
        self.result.as_ref()
    }

    /// Message of the most recent failed generation, cleared when a new
    /// one starts.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ---- user actions ----

    /// Enter [`AppStatus::Uploading`] while files are being encoded.
    ///
    /// A shown result or error is dropped, since the status no longer
    /// describes it.
    pub fn mark_uploading(&mut self) {
        if !self.status.is_busy() {
            self.status = AppStatus::Uploading;
            self.result = None;
            self.last_error = None;
        }
    }

    /// Leave [`AppStatus::Uploading`] without adding anything, e.g. when a
    /// file could not be read.
    pub fn abort_upload(&mut self) {
        if self.status == AppStatus::Uploading {
            self.status = AppStatus::Idle;
        }
    }

    /// Append newly uploaded photos.
    ///
    /// The first new photo is selected only when nothing was selected
    /// before. Returns the number of photos added.
    pub fn add_photos(&mut self, photos: Vec<PhotoMemory>) -> usize {
        let added = photos.len();

        if self.selected.is_none() {
            self.selected = photos.first().map(PhotoMemory::id);
        }
        self.photos.extend(photos);

        if self.status == AppStatus::Uploading {
            self.status = AppStatus::Idle;
        }

        tracing::debug!(added, total = self.photos.len(), "Photos added");
        added
    }

    /// Focus a different photo. Clears any shown result and returns to
    /// [`AppStatus::Idle`].
    pub fn select_photo(&mut self, id: PhotoId) -> Result<(), CoreError> {
        if !self.photos.iter().any(|photo| photo.id() == id) {
            return Err(CoreError::NotFound(id));
        }

        self.selected = Some(id);
        self.result = None;
        self.status = AppStatus::Idle;
        Ok(())
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    /// Replace the prompt with one of the built-in presets.
    pub fn apply_preset(&mut self, index: usize) -> Result<(), CoreError> {
        self.prompt = prompt::preset(index)?.to_string();
        Ok(())
    }

    /// Start a generation for the selected photo.
    ///
    /// Rejects the request while another generation or an upload is in
    /// progress, or when no photo is selected.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, CoreError> {
        if self.in_flight.is_some() {
            return Err(CoreError::Conflict(
                "A video is already being generated".to_string(),
            ));
        }
        if self.status == AppStatus::Uploading {
            return Err(CoreError::Conflict(
                "Photos are still being uploaded".to_string(),
            ));
        }
        let photo = self
            .selected_photo()
            .ok_or_else(|| CoreError::Validation("No photo selected".to_string()))?;

        let ticket = GenerationTicket {
            id: self.next_ticket,
            photo_id: photo.id(),
            image_base64: photo.base64().to_string(),
            mime_type: photo.mime_type(),
            prompt: prompt::effective_prompt(&self.prompt).to_string(),
        };

        self.next_ticket += 1;
        self.in_flight = Some(ticket.id);
        self.status = AppStatus::Generating;
        self.result = None;
        self.last_error = None;

        tracing::info!(photo_id = %ticket.photo_id, ticket = ticket.id, "Generation started");
        Ok(ticket)
    }

    /// Record a successful generation. Returns `false` when the outcome
    /// was discarded because the user moved on.
    pub fn complete_generation(&mut self, ticket: &GenerationTicket, uri: impl Into<String>) -> bool {
        if !self.settle(ticket) {
            return false;
        }
        self.result = Some(GeneratedVideo {
            uri: uri.into(),
            prompt: ticket.prompt.clone(),
        });
        self.status = AppStatus::Complete;
        true
    }

    /// Record a failed generation. Returns `false` when the outcome was
    /// discarded because the user moved on.
    pub fn fail_generation(&mut self, ticket: &GenerationTicket, message: impl Into<String>) -> bool {
        if !self.settle(ticket) {
            return false;
        }
        self.last_error = Some(message.into());
        self.status = AppStatus::Error;
        true
    }

    /// Abandon the shown result so the user can try again.
    pub fn reset_result(&mut self) {
        self.result = None;
        self.last_error = None;
        if matches!(self.status, AppStatus::Complete | AppStatus::Error) {
            self.status = AppStatus::Idle;
        }
    }

    // ---- private helpers ----

    /// Release the in-flight slot for `ticket` and report whether its
    /// outcome should still be applied.
    fn settle(&mut self, ticket: &GenerationTicket) -> bool {
        if self.in_flight != Some(ticket.id) {
            tracing::warn!(ticket = ticket.id, "Ignoring outcome for unknown generation");
            return false;
        }
        self.in_flight = None;

        let current = self.status == AppStatus::Generating && self.selected == Some(ticket.photo_id);
        if !current {
            tracing::info!(
                ticket = ticket.id,
                photo_id = %ticket.photo_id,
                "Discarding outcome for a photo that is no longer selected",
            );
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn photo(name: &str) -> PhotoMemory {
        PhotoMemory::from_bytes(name, name.as_bytes())
    }

    fn studio_with(names: &[&str]) -> Studio {
        let mut studio = Studio::new();
        studio.add_photos(names.iter().map(|name| photo(name)).collect());
        studio
    }

    // -- Uploading --

    #[test]
    fn add_photos_appends_and_auto_selects_first() {
        let mut studio = Studio::new();
        let batch = vec![photo("a.jpg"), photo("b.jpg"), photo("c.jpg")];
        let first = batch[0].id();

        assert_eq!(studio.add_photos(batch), 3);
        assert_eq!(studio.photos().len(), 3);
        assert_eq!(studio.selected_photo().map(PhotoMemory::id), Some(first));
    }

    #[test]
    fn add_photos_keeps_existing_selection() {
        let mut studio = studio_with(&["a.jpg"]);
        let original = studio.selected_photo().unwrap().id();

        studio.add_photos(vec![photo("b.jpg"), photo("c.jpg")]);

        assert_eq!(studio.photos().len(), 3);
        assert_eq!(studio.selected_photo().unwrap().id(), original);
    }

    #[test]
    fn add_empty_batch_selects_nothing() {
        let mut studio = Studio::new();
        assert_eq!(studio.add_photos(Vec::new()), 0);
        assert!(studio.selected_photo().is_none());
    }

    #[test]
    fn uploading_returns_to_idle_after_add() {
        let mut studio = Studio::new();
        studio.mark_uploading();
        assert_eq!(studio.status(), AppStatus::Uploading);

        studio.add_photos(vec![photo("a.jpg")]);
        assert_eq!(studio.status(), AppStatus::Idle);
    }

    #[test]
    fn abort_upload_returns_to_idle() {
        let mut studio = Studio::new();
        studio.mark_uploading();
        studio.abort_upload();
        assert_eq!(studio.status(), AppStatus::Idle);
        assert!(studio.photos().is_empty());
    }

    #[test]
    fn upload_after_result_drops_result() {
        let mut studio = studio_with(&["a.jpg"]);
        let ticket = studio.begin_generation().unwrap();
        studio.complete_generation(&ticket, "https://v/1&key=k");

        studio.mark_uploading();
        studio.add_photos(vec![photo("b.jpg")]);

        assert_eq!(studio.status(), AppStatus::Idle);
        assert!(studio.result().is_none());
    }

    #[test]
    fn upload_after_failure_drops_error() {
        let mut studio = studio_with(&["a.jpg"]);
        let ticket = studio.begin_generation().unwrap();
        studio.fail_generation(&ticket, "boom");

        studio.mark_uploading();
        studio.abort_upload();

        assert_eq!(studio.status(), AppStatus::Idle);
        assert!(studio.last_error().is_none());
    }

    // -- Selection --

    #[test]
    fn select_unknown_photo_is_rejected() {
        let mut studio = studio_with(&["a.jpg"]);
        let stranger = PhotoId::new_v4();
        assert_matches!(studio.select_photo(stranger), Err(CoreError::NotFound(id)) if id == stranger);
    }

    #[test]
    fn selecting_new_photo_clears_result() {
        let mut studio = studio_with(&["a.jpg", "b.jpg"]);
        let b = studio.photos()[1].id();

        let ticket = studio.begin_generation().unwrap();
        assert!(studio.complete_generation(&ticket, "https://video/R&key=k"));
        assert_eq!(studio.status(), AppStatus::Complete);

        studio.select_photo(b).unwrap();
        assert!(studio.result().is_none());
        assert_eq!(studio.status(), AppStatus::Idle);
    }

    // -- Generation --

    #[test]
    fn begin_without_selection_fails() {
        let mut studio = Studio::new();
        assert_matches!(studio.begin_generation(), Err(CoreError::Validation(_)));
        assert_eq!(studio.status(), AppStatus::Idle);
    }

    #[test]
    fn begin_substitutes_default_prompt() {
        let mut studio = studio_with(&["a.jpg"]);
        studio.set_prompt("   ");
        let ticket = studio.begin_generation().unwrap();
        assert_eq!(ticket.prompt(), prompt::DEFAULT_PROMPT);
        assert_eq!(studio.status(), AppStatus::Generating);
    }

    #[test]
    fn begin_carries_photo_payload() {
        let mut studio = studio_with(&["a.jpg"]);
        studio.apply_preset(2).unwrap();
        let ticket = studio.begin_generation().unwrap();

        let selected = studio.selected_photo().unwrap();
        assert_eq!(ticket.photo_id(), selected.id());
        assert_eq!(ticket.image_base64(), selected.base64());
        assert_eq!(ticket.mime_type(), selected.mime_type());
        assert_eq!(ticket.prompt(), prompt::PROMPT_PRESETS[2]);
    }

    #[test]
    fn concurrent_generation_is_rejected() {
        let mut studio = studio_with(&["a.jpg"]);
        let _ticket = studio.begin_generation().unwrap();
        assert_matches!(studio.begin_generation(), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn complete_records_result() {
        let mut studio = studio_with(&["a.jpg"]);
        studio.set_prompt("orbit");
        let ticket = studio.begin_generation().unwrap();

        assert!(studio.complete_generation(&ticket, "https://v/1&key=k"));
        assert_eq!(
            studio.result(),
            Some(&GeneratedVideo {
                uri: "https://v/1&key=k".to_string(),
                prompt: "orbit".to_string(),
            })
        );

        // The slot is released.
        assert!(studio.begin_generation().is_ok());
    }

    #[test]
    fn failure_records_error() {
        let mut studio = studio_with(&["a.jpg"]);
        let ticket = studio.begin_generation().unwrap();

        assert!(studio.fail_generation(&ticket, "boom"));
        assert_eq!(studio.status(), AppStatus::Error);
        assert_eq!(studio.last_error(), Some("boom"));
        assert!(studio.result().is_none());
    }

    #[test]
    fn outcome_for_deselected_photo_is_discarded() {
        let mut studio = studio_with(&["a.jpg", "b.jpg"]);
        let b = studio.photos()[1].id();
        let ticket = studio.begin_generation().unwrap();

        studio.select_photo(b).unwrap();
        assert!(!studio.complete_generation(&ticket, "https://v/late"));
        assert!(studio.result().is_none());
        assert_eq!(studio.status(), AppStatus::Idle);

        // The slot is released, so the new photo can be generated.
        assert!(studio.begin_generation().is_ok());
    }

    #[test]
    fn settled_ticket_cannot_be_applied_twice() {
        let mut studio = studio_with(&["a.jpg"]);
        let ticket = studio.begin_generation().unwrap();
        assert!(studio.complete_generation(&ticket, "first"));
        assert!(!studio.fail_generation(&ticket, "second"));
        assert_eq!(studio.status(), AppStatus::Complete);
    }

    #[test]
    fn reset_result_returns_to_idle() {
        let mut studio = studio_with(&["a.jpg"]);
        let ticket = studio.begin_generation().unwrap();
        studio.complete_generation(&ticket, "uri");

        studio.reset_result();
        assert!(studio.result().is_none());
        assert_eq!(studio.status(), AppStatus::Idle);
    }

    #[test]
    fn reset_result_clears_error() {
        let mut studio = studio_with(&["a.jpg"]);
        let ticket = studio.begin_generation().unwrap();
        studio.fail_generation(&ticket, "boom");

        studio.reset_result();
        assert!(studio.last_error().is_none());
        assert_eq!(studio.status(), AppStatus::Idle);
    }

    #[test]
    fn reset_result_leaves_generation_running() {
        let mut studio = studio_with(&["a.jpg"]);
        let _ticket = studio.begin_generation().unwrap();
        studio.reset_result();
        assert_eq!(studio.status(), AppStatus::Generating);
    }
}
