//! Veo request and long-running operation types.
//!
//! The Gemini API answers a `predictLongRunning` call with an operation
//! of the shape `{"name": "...", "done": bool, "response": {...}}`. This
//! module deserializes those into [`Operation`] and builds the request
//! body from a [`VideoRequest`].

use serde::{Deserialize, Serialize};

/// Veo model used when none is configured.
pub const DEFAULT_MODEL: &str = "veo-3.1-fast-generate-preview";

/// `google.rpc.Code` value for NOT_FOUND.
pub const RPC_CODE_NOT_FOUND: i32 = 5;

/// Message the service returns when the operation or model cannot be
/// resolved for the credential in use.
pub const ENTITY_NOT_FOUND_MESSAGE: &str = "Requested entity was not found";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Output settings for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationConfig {
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl Default for GenerationConfig {
    /// One 720p vertical video.
    fn default() -> Self {
        Self {
            number_of_videos: 1,
            resolution: "720p".to_string(),
            aspect_ratio: "9:16".to_string(),
        }
    }
}

/// A single image-to-video request.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    /// Bare base64 payload, no `data:` header.
    pub image_base64: String,
    pub mime_type: String,
    pub config: GenerationConfig,
}

impl VideoRequest {
    /// JSON body for `models/{model}:predictLongRunning`.
    pub fn to_predict_body(&self) -> serde_json::Value {
        serde_json::json!({
            "instances": [{
                "prompt": self.prompt,
                "image": {
                    "bytesBase64Encoded": self.image_base64,
                    "mimeType": self.mime_type,
                },
            }],
            "parameters": {
                "sampleCount": self.config.number_of_videos,
                "resolution": self.config.resolution,
                "aspectRatio": self.config.aspect_ratio,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A long-running generation operation as reported by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    /// Opaque handle, e.g. `models/veo-3.1-fast-generate-preview/operations/abc`.
    pub name: String,
    #[serde(default)]
    pub done: bool,
    /// Service-defined progress information.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub response: Option<OperationResponse>,
    /// Set when the operation finished unsuccessfully.
    #[serde(default)]
    pub error: Option<OperationStatus>,
}

impl Operation {
    /// URI of the first generated video, if the operation produced one.
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .samples()
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
    }
}

/// The `response` field of a finished operation.
///
/// The REST API nests samples under `generateVideoResponse`; SDK-shaped
/// payloads put them directly under `generatedVideos`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
    #[serde(default)]
    pub generated_videos: Option<Vec<GeneratedSample>>,
}

impl OperationResponse {
    fn samples(&self) -> &[GeneratedSample] {
        if let Some(inner) = &self.generate_video_response {
            return &inner.generated_samples;
        }
        self.generated_videos.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoFile {
    #[serde(default)]
    pub uri: Option<String>,
}

/// `google.rpc.Status` attached to a failed operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl OperationStatus {
    pub fn is_not_found(&self) -> bool {
        self.code == RPC_CODE_NOT_FOUND || self.message.contains(ENTITY_NOT_FOUND_MESSAGE)
    }
}

/// Parse an operation JSON body.
pub fn parse_operation(text: &str) -> Result<Operation, serde_json::Error> {
    serde_json::from_str(text)
}
