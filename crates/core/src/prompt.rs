//! Motion prompt defaults and presets.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Prompt sent when the user leaves the prompt empty or whitespace-only.
pub const DEFAULT_PROMPT: &str = "Cinematic motion, beautiful lighting, highly detailed, 4k";

/// Built-in motion descriptions offered as one-click prompts.
pub const PROMPT_PRESETS: &[&str] = &[
    "Cinematic drone shot orbiting the statue, golden sunset",
    "Cinematic slow motion, soft wind in the hair, smiling",
    "Dolly zoom camera move, celebration atmosphere, confetti",
    "Panoramic aerial view of the mountain landscape",
    "Festive ambience with soft lights and a magical glow",
];

/// Number of characters of a preset shown before it is truncated.
pub const PRESET_LABEL_MAX_CHARS: usize = 30;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return the prompt to submit: the trimmed input, or [`DEFAULT_PROMPT`]
/// when nothing but whitespace was entered.
pub fn effective_prompt(prompt: &str) -> &str {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        DEFAULT_PROMPT
    } else {
        trimmed
    }
}

/// Look up a preset by zero-based index.
pub fn preset(index: usize) -> Result<&'static str, CoreError> {
    PROMPT_PRESETS.get(index).copied().ok_or_else(|| {
        CoreError::Validation(format!(
            "Invalid preset {index}. Must be between 0 and {}",
            PROMPT_PRESETS.len() - 1
        ))
    })
}

/// Short label for a preset button: the first [`PRESET_LABEL_MAX_CHARS`]
/// characters followed by `...` when the preset is longer.
pub fn preset_label(text: &str) -> String {
    if text.chars().count() > PRESET_LABEL_MAX_CHARS {
        let head: String = text.chars().take(PRESET_LABEL_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_uses_default() {
        assert_eq!(effective_prompt(""), DEFAULT_PROMPT);
    }

    #[test]
    fn whitespace_prompt_uses_default() {
        assert_eq!(effective_prompt("  \t\n "), DEFAULT_PROMPT);
    }

    #[test]
    fn prompt_is_trimmed() {
        assert_eq!(effective_prompt("  slow pan left "), "slow pan left");
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(preset(0).unwrap(), PROMPT_PRESETS[0]);
        assert!(preset(PROMPT_PRESETS.len()).is_err());
    }

    #[test]
    fn short_label_untouched() {
        assert_eq!(preset_label("short"), "short");
    }

    #[test]
    fn long_label_truncated() {
        let label = preset_label(PROMPT_PRESETS[0]);
        assert!(label.ends_with("..."));
        assert_eq!(label.chars().count(), PRESET_LABEL_MAX_CHARS + 3);
    }

    #[test]
    fn label_truncation_is_char_safe() {
        let text = "é".repeat(40);
        assert_eq!(preset_label(&text), format!("{}...", "é".repeat(30)));
    }
}
