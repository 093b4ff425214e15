//! Progress events emitted by the generation driver.
//!
//! Published on a [`tokio::sync::broadcast`] channel. Subscribers that
//! fall behind miss events; nothing in the driver depends on delivery.

use serde::Serialize;

use memoria_core::types::Timestamp;

/// A state change in one generation flow.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// The creation request was accepted.
    Submitted { operation: String, at: Timestamp },

    /// One status query returned.
    Polled {
        operation: String,
        /// 1-based query count.
        attempt: u32,
        done: bool,
        /// Service-defined progress information, if any.
        metadata: Option<serde_json::Value>,
    },

    /// The operation finished with a video.
    Completed {
        operation: String,
        /// Service URI, without the credential attached.
        video_uri: String,
        at: Timestamp,
    },

    /// The flow failed.
    Failed {
        /// Human-readable error description.
        error: String,
        at: Timestamp,
    },
}
