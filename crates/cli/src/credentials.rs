//! Terminal-backed credential provider.
//!
//! Starts from the key found in the environment and, when stdin is a
//! terminal, lets the user paste a new key whenever the driver asks for a
//! selection. A selected key can be saved to the dotenv file read at
//! startup so later runs pick it up.

use std::io::IsTerminal;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;

use memoria_veo::credentials::{CredentialError, CredentialProvider, EnvCredentialProvider};

/// Dotenv file loaded at startup and written by `memoria select-key`.
pub const DOTENV_FILE: &str = ".env";

/// Variable a saved key is stored under.
pub const PERSISTED_KEY_VAR: &str = "GEMINI_API_KEY";

/// Key provider that prompts on the terminal.
pub struct TerminalCredentialProvider {
    key: RwLock<Option<String>>,
    interactive: bool,
}

impl TerminalCredentialProvider {
    /// Seed from the environment. Interactive selection is enabled only
    /// when stdin is a terminal.
    pub async fn from_env() -> Self {
        let key = EnvCredentialProvider::default().current_key().await;
        Self::new(key, std::io::stdin().is_terminal())
    }

    pub fn new(key: Option<String>, interactive: bool) -> Self {
        Self {
            key: RwLock::new(key),
            interactive,
        }
    }
}

#[async_trait]
impl CredentialProvider for TerminalCredentialProvider {
    async fn has_selected_key(&self) -> bool {
        self.key.read().await.is_some()
    }

    async fn open_select_key(&self) -> Result<(), CredentialError> {
        if !self.interactive {
            return Err(CredentialError::SelectionUnavailable);
        }

        eprintln!("Paste a Gemini API key from a billing-enabled project and press Enter:");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| CredentialError::SelectionFailed(e.to_string()))?;

        let key = line.trim();
        if key.is_empty() {
            return Err(CredentialError::SelectionFailed("no key entered".to_string()));
        }

        *self.key.write().await = Some(key.to_string());
        tracing::info!("API key selected");
        Ok(())
    }

    async fn current_key(&self) -> Option<String> {
        self.key.read().await.clone()
    }

    fn can_select(&self) -> bool {
        self.interactive
    }
}

// ---------------------------------------------------------------------------
// Dotenv persistence
// ---------------------------------------------------------------------------

/// Save `key` as `GEMINI_API_KEY` in the dotenv file at `path`.
///
/// An existing entry is replaced in place; every other line is kept. The
/// file is created when missing.
pub async fn persist_key(path: &Path, key: &str) -> std::io::Result<()> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    tokio::fs::write(path, upsert_env_var(&existing, PERSISTED_KEY_VAR, key)).await?;
    tracing::info!(path = %path.display(), var = PERSISTED_KEY_VAR, "API key saved");
    Ok(())
}

fn upsert_env_var(contents: &str, var: &str, value: &str) -> String {
    let entry = format!("{var}={value}");
    let mut replaced = false;

    let mut lines: Vec<String> = Vec::new();
    for line in contents.lines() {
        if !defines_var(line, var) {
            lines.push(line.to_string());
        } else if !replaced {
            lines.push(entry.clone());
            replaced = true;
        }
    }
    if !replaced {
        lines.push(entry);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Whether `line` assigns `var`, with or without a leading `export`.
fn defines_var(line: &str, var: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(var)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_interactive_cannot_select() {
        let provider = TerminalCredentialProvider::new(None, false);
        assert!(!provider.can_select());
        assert!(matches!(
            provider.open_select_key().await,
            Err(CredentialError::SelectionUnavailable)
        ));
    }

    #[tokio::test]
    async fn seeded_key_is_current() {
        let provider = TerminalCredentialProvider::new(Some("k".to_string()), false);
        assert!(provider.has_selected_key().await);
        assert_eq!(provider.current_key().await.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn persisted_key_is_read_back_by_dotenvy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(DOTENV_FILE);

        persist_key(&path, "fresh-key").await.expect("persist");

        let entries: Vec<(String, String)> = dotenvy::from_path_iter(&path)
            .expect("open dotenv")
            .collect::<Result<_, _>>()
            .expect("parse dotenv");
        assert_eq!(entries, vec![(PERSISTED_KEY_VAR.to_string(), "fresh-key".to_string())]);
    }

    #[tokio::test]
    async fn persisting_replaces_old_key_and_keeps_other_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(DOTENV_FILE);
        std::fs::write(
            &path,
            "# memoria\nVEO_MODEL=veo-x\nexport GEMINI_API_KEY=old\nGEMINI_API_KEY_BACKUP=spare\n",
        )
        .expect("write fixture");

        persist_key(&path, "new").await.expect("persist");

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# memoria\nVEO_MODEL=veo-x\nGEMINI_API_KEY=new\nGEMINI_API_KEY_BACKUP=spare\n"
        );
    }

    #[test]
    fn duplicate_entries_collapse_to_one() {
        let out = upsert_env_var("GEMINI_API_KEY=a\nGEMINI_API_KEY = b\n", "GEMINI_API_KEY", "c");
        assert_eq!(out, "GEMINI_API_KEY=c\n");
    }
}
