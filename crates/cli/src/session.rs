//! One command-line session: upload photos into a [`Studio`], run the
//! generation driver for the selected photo, and record the outcome.

use std::path::PathBuf;

use tokio::sync::broadcast;

use memoria_core::error::CoreError;
use memoria_core::photo::load_photos;
use memoria_core::studio::{GeneratedVideo, Studio};
use memoria_veo::driver::{VeoError, VideoJobDriver};
use memoria_veo::events::GenerationEvent;

/// Shown for every failed generation, ahead of the specific error.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Error generating the video. Check that you selected an API key from a paid Google Cloud project.";

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub photos: Vec<PathBuf>,
    /// 1-based index into `photos`; the first photo when unset.
    pub select: Option<usize>,
    pub prompt: Option<String>,
    /// Zero-based preset index, used when no prompt is given.
    pub preset: Option<usize>,
}

/// How a generation ended.
#[derive(Debug)]
pub enum GenerationOutcome {
    Completed(GeneratedVideo),
    Failed(VeoError),
}

/// Load the photos, select one, set the prompt, and run the driver.
///
/// Caller mistakes (unreadable files, bad indices) are returned as
/// [`CoreError`]; generation failures are reported in the outcome and
/// leave the studio in [`AppStatus::Error`](memoria_core::status::AppStatus::Error).
pub async fn generate(
    studio: &mut Studio,
    driver: &VideoJobDriver,
    options: &GenerateOptions,
) -> Result<GenerationOutcome, CoreError> {
    studio.mark_uploading();
    let photos = match load_photos(&options.photos).await {
        Ok(photos) => photos,
        Err(e) => {
            studio.abort_upload();
            return Err(e);
        }
    };
    let first_new = studio.photos().len();
    studio.add_photos(photos);

    if let Some(position) = options.select {
        let id = position
            .checked_sub(1)
            .and_then(|offset| studio.photos().get(first_new + offset))
            .map(|photo| photo.id())
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "--select {position} is out of range (1..={})",
                    options.photos.len()
                ))
            })?;
        studio.select_photo(id)?;
    }

    match (&options.prompt, options.preset) {
        (Some(prompt), _) => studio.set_prompt(prompt.clone()),
        (None, Some(index)) => studio.apply_preset(index)?,
        (None, None) => {}
    }

    let ticket = studio.begin_generation()?;
    tracing::info!(
        photo_id = %ticket.photo_id(),
        mime_type = ticket.mime_type(),
        prompt = %ticket.prompt(),
        "Generating video",
    );

    let outcome = match driver
        .generate_video_from_image(ticket.image_base64(), ticket.mime_type(), ticket.prompt())
        .await
    {
        Ok(uri) => {
            studio.complete_generation(&ticket, uri);
            match studio.result() {
                Some(video) => GenerationOutcome::Completed(video.clone()),
                None => {
                    return Err(CoreError::Internal(
                        "generation completed without a recorded result".to_string(),
                    ))
                }
            }
        }
        Err(e) => {
            studio.fail_generation(&ticket, e.to_string());
            GenerationOutcome::Failed(e)
        }
    };

    Ok(outcome)
}

/// Log driver progress until the channel closes.
pub async fn report_progress(mut events: broadcast::Receiver<GenerationEvent>) {
    loop {
        match events.recv().await {
            Ok(GenerationEvent::Submitted { operation, .. }) => {
                tracing::info!(operation = %operation, "Request accepted, rendering video");
            }
            Ok(GenerationEvent::Polled {
                attempt,
                done,
                metadata,
                ..
            }) => {
                tracing::info!(attempt, done, ?metadata, "Polling video status...");
            }
            Ok(GenerationEvent::Completed { .. }) => {
                tracing::info!("Video ready");
            }
            Ok(GenerationEvent::Failed { error, .. }) => {
                tracing::warn!(error = %error, "Video generation failed");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress reporter fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
