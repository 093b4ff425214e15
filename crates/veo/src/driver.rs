//! Image-to-video generation driver.
//!
//! [`VideoJobDriver::generate_video_from_image`] runs one flow:
//! make sure a key is selected, submit the request, poll the operation
//! under the configured [`PollPolicy`] until it is done, then return the
//! video URI with the key attached for direct playback.
//!
//! The remote operation is never cancelled. Dropping the returned future
//! only stops observing it.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::Instant;

use memoria_core::photo::strip_data_url_prefix;
use memoria_core::prompt::effective_prompt;

use crate::api::{VeoApiError, VideoService};
use crate::credentials::{CredentialError, CredentialProvider};
use crate::events::GenerationEvent;
use crate::messages::{GenerationConfig, Operation, VideoRequest};
use crate::poll::{next_delay, PollPolicy};

/// Broadcast channel capacity for progress events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors surfaced by a generation flow.
#[derive(Debug, thiserror::Error)]
pub enum VeoError {
    /// No key is available even after the selection flow.
    #[error("No API key selected")]
    MissingCredential,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The key was rejected mid-flow; a new one has been requested.
    #[error("Session expired. Select your API key again and retry")]
    SessionExpired,

    /// The operation finished without a video URI.
    #[error("No video URI returned from API")]
    NoVideoProduced,

    /// The operation finished with an error status.
    #[error("Video generation failed ({code}): {message}")]
    OperationFailed { code: i32, message: String },

    /// The poll policy ran out before the operation finished.
    #[error("Operation {operation} still running after {attempts} polls ({waited_secs}s)")]
    PollTimeout {
        operation: String,
        attempts: u32,
        waited_secs: u64,
    },

    #[error(transparent)]
    Api(#[from] VeoApiError),
}

impl VeoError {
    /// Whether repeating the same request may succeed without other
    /// changes on the user's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::PollTimeout { .. })
    }
}

/// Drives one image + prompt pair through the video service.
pub struct VideoJobDriver {
    service: Arc<dyn VideoService>,
    credentials: Arc<dyn CredentialProvider>,
    policy: PollPolicy,
    event_tx: broadcast::Sender<GenerationEvent>,
}

impl VideoJobDriver {
    pub fn new(service: Arc<dyn VideoService>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            credentials,
            policy: PollPolicy::default(),
            event_tx,
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.event_tx.subscribe()
    }

    /// Open the selection flow when the provider supports it and no key is
    /// selected yet.
    pub async fn ensure_api_key(&self) -> Result<(), VeoError> {
        if self.credentials.can_select() && !self.credentials.has_selected_key().await {
            tracing::info!("No API key selected, opening key selection");
            self.credentials.open_select_key().await?;
        }
        Ok(())
    }

    /// Animate an encoded image according to `prompt`.
    ///
    /// `image_base64` may be a bare payload or a full `data:` URL. An empty
    /// or whitespace-only prompt is replaced by the default prompt.
    /// Returns `<video uri>&key=<api key>`.
    pub async fn generate_video_from_image(
        &self,
        image_base64: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, VeoError> {
        self.ensure_api_key().await?;

        let request = VideoRequest {
            prompt: effective_prompt(prompt).to_string(),
            image_base64: strip_data_url_prefix(image_base64).to_string(),
            mime_type: mime_type.to_string(),
            config: GenerationConfig::default(),
        };

        let result = match self.run(&request).await {
            Err(VeoError::Api(VeoApiError::EntityNotFound(detail))) if self.credentials.can_select() => {
                tracing::warn!(detail = %detail, "Entity not found, requesting a new API key");
                if let Err(e) = self.credentials.open_select_key().await {
                    tracing::error!(error = %e, "Failed to reopen key selection");
                }
                Err(VeoError::SessionExpired)
            }
            other => other,
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "Video generation failed");
            let _ = self.event_tx.send(GenerationEvent::Failed {
                error: e.to_string(),
                at: Utc::now(),
            });
        }
        result
    }

    // ---- private helpers ----

    /// Submit, poll, extract, decorate.
    async fn run(&self, request: &VideoRequest) -> Result<String, VeoError> {
        let key = self.current_key().await?;
        let mut operation = self.service.create_operation(&key, request).await?;
        let name = operation.name.clone();

        tracing::info!(operation = %name, prompt = %request.prompt, "Video generation submitted");
        let _ = self.event_tx.send(GenerationEvent::Submitted {
            operation: name.clone(),
            at: Utc::now(),
        });

        let started = Instant::now();
        let mut delay = self.policy.interval;
        let mut attempts = 0u32;

        while !operation.done {
            if self.policy.is_exhausted(attempts, started.elapsed()) {
                return Err(VeoError::PollTimeout {
                    operation: name,
                    attempts,
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            // Never sleep past the deadline.
            let wait = match self.policy.remaining(started.elapsed()) {
                Some(left) => delay.min(left),
                None => delay,
            };
            tokio::time::sleep(wait).await;
            delay = next_delay(delay, &self.policy);

            let key = self.current_key().await?;
            operation = self.service.get_operation(&key, &name).await?;
            attempts += 1;

            tracing::debug!(
                operation = %name,
                attempt = attempts,
                done = operation.done,
                metadata = ?operation.metadata,
                "Polled video status",
            );
            let _ = self.event_tx.send(GenerationEvent::Polled {
                operation: name.clone(),
                attempt: attempts,
                done: operation.done,
                metadata: operation.metadata.clone(),
            });
        }

        let video_uri = extract_video_uri(&operation)?.to_string();

        // The key may have been rotated while polling.
        let key = self.current_key().await?;

        tracing::info!(operation = %name, attempts, "Video generation completed");
        let _ = self.event_tx.send(GenerationEvent::Completed {
            operation: name,
            video_uri: video_uri.clone(),
            at: Utc::now(),
        });

        Ok(playback_url(&video_uri, &key))
    }

    async fn current_key(&self) -> Result<String, VeoError> {
        self.credentials
            .current_key()
            .await
            .ok_or(VeoError::MissingCredential)
    }
}

/// Read the video URI from a finished operation.
fn extract_video_uri(operation: &Operation) -> Result<&str, VeoError> {
    if let Some(status) = &operation.error {
        if status.is_not_found() {
            return Err(VeoApiError::EntityNotFound(status.message.clone()).into());
        }
        return Err(VeoError::OperationFailed {
            code: status.code,
            message: status.message.clone(),
        });
    }
    operation.video_uri().ok_or(VeoError::NoVideoProduced)
}

/// Attach the key to a service URI so the video can be played directly.
pub fn playback_url(video_uri: &str, api_key: &str) -> String {
    format!("{video_uri}&key={api_key}")
}
