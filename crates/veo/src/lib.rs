//! Google Veo video-generation client library.
//!
//! Provides typed operation messages, a REST client for the Gemini
//! long-running video endpoints, injectable credential providers, an
//! explicit poll policy, and the driver that takes one image + prompt
//! from submission to a playable URL.

pub mod api;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod events;
pub mod messages;
pub mod poll;
