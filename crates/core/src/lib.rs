//! Domain types and session state for Memoria.
//!
//! This crate has zero internal dependencies so it can be shared by the
//! Veo client, the CLI, and any future front end.

pub mod error;
pub mod photo;
pub mod prompt;
pub mod status;
pub mod studio;
pub mod types;
