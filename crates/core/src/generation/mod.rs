// crates/core/src/generation/mod.rs
//! Collaborators invoked from inside job bodies.
//!
//! Job bodies only see the traits in `provider`; the HTTP-backed client and
//! the bundle exporter are the implementations the server wires by default.

pub mod bundle;
pub mod openai;
pub mod provider;
pub mod types;

pub use bundle::BundleExporter;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use provider::{DocumentExporter, ImageGenerator, TextGenerator};
pub use types::*;
