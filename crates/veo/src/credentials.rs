//! Access credential providers.
//!
//! The driver never reads a key from global state. It is handed an
//! `Arc<dyn CredentialProvider>` and asks it for the current key on every
//! request, so a key rotated mid-flow is picked up by the next call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Environment variables consulted by [`EnvCredentialProvider::default`],
/// in order.
pub const DEFAULT_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Errors raised by a credential provider.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The provider has no way to ask the user for a key.
    #[error("Interactive key selection is not available")]
    SelectionUnavailable,

    /// The selection flow ran but could not complete.
    #[error("Key selection failed: {0}")]
    SelectionFailed(String),
}

/// Source of the API key used to authorize video-generation calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Whether a key is currently selected.
    async fn has_selected_key(&self) -> bool;

    /// Run the interactive selection flow. Side effect only.
    async fn open_select_key(&self) -> Result<(), CredentialError>;

    /// The key in effect right now, if any.
    async fn current_key(&self) -> Option<String>;

    /// Whether [`open_select_key`](Self::open_select_key) can do anything.
    fn can_select(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Reads the key from environment variables on every call.
///
/// Has no interactive selection flow.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    vars: Vec<String>,
}

impl EnvCredentialProvider {
    /// Consult `vars` in order; the first non-empty value wins.
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    fn lookup(&self) -> Option<String> {
        self.vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_VARS.iter().copied())
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn has_selected_key(&self) -> bool {
        self.lookup().is_some()
    }

    async fn open_select_key(&self) -> Result<(), CredentialError> {
        Err(CredentialError::SelectionUnavailable)
    }

    async fn current_key(&self) -> Option<String> {
        self.lookup()
    }

    fn can_select(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Holds the key in memory.
///
/// Each call to [`open_select_key`](CredentialProvider::open_select_key)
/// takes the next queued key, if any, and counts the request. Useful for
/// embedding front ends that obtain keys out of band, and for tests.
#[derive(Debug, Default)]
pub struct InMemoryCredentialProvider {
    key: RwLock<Option<String>>,
    queued: Mutex<VecDeque<String>>,
    selection_requests: AtomicU32,
}

impl InMemoryCredentialProvider {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: RwLock::new(key),
            ..Default::default()
        }
    }

    /// Queue keys handed out by successive selection flows.
    pub fn with_selections<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queued: Mutex::new(keys.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    /// Replace the current key.
    pub async fn set_key(&self, key: Option<String>) {
        *self.key.write().await = key;
    }

    /// How many times the selection flow has been opened.
    pub fn selection_requests(&self) -> u32 {
        self.selection_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for InMemoryCredentialProvider {
    async fn has_selected_key(&self) -> bool {
        self.key.read().await.is_some()
    }

    async fn open_select_key(&self) -> Result<(), CredentialError> {
        self.selection_requests.fetch_add(1, Ordering::SeqCst);

        let next = self
            .queued
            .lock()
            .map_err(|_| CredentialError::SelectionFailed("selection queue poisoned".into()))?
            .pop_front();

        if let Some(key) = next {
            *self.key.write().await = Some(key);
        }
        Ok(())
    }

    async fn current_key(&self) -> Option<String> {
        self.key.read().await.clone()
    }
}
