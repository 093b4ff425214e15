//! Workflow status for the single active generation flow.

use serde::Serialize;

/// The state of the session's one active workflow.
///
/// Exactly one value is active at a time. Transitions are driven by user
/// actions on [`Studio`](crate::studio::Studio) or by the outcome the
/// generation driver reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    #[default]
    Idle,
    /// Files are being read and encoded.
    Uploading,
    /// A generation request is in flight.
    Generating,
    /// The last generation produced a playable video.
    Complete,
    /// The last generation failed.
    Error,
}

impl AppStatus {
    /// Stable lowercase name, used in log fields and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Generating => "generating",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Returns `true` while work is pending and the user should wait.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Generating)
    }
}

impl std::fmt::Display for AppStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(AppStatus::default(), AppStatus::Idle);
    }

    #[test]
    fn busy_states() {
        assert!(AppStatus::Uploading.is_busy());
        assert!(AppStatus::Generating.is_busy());
        assert!(!AppStatus::Idle.is_busy());
        assert!(!AppStatus::Complete.is_busy());
        assert!(!AppStatus::Error.is_busy());
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(AppStatus::Generating.to_string(), "generating");
        assert_eq!(AppStatus::Complete.as_str(), "complete");
    }
}
