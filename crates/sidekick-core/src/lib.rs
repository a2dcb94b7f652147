//! Sidekick core: configuration, answer synthesis, diagram sanitizing and the
//! [`Sidekick`] service handle.

pub mod bootstrap;
pub mod config;
pub mod diagram;
pub mod error;
pub mod secret;
pub mod service;
pub mod synthesizer;

pub use config::Config;
pub use diagram::{DiagramKind, sanitize};
pub use error::{Result, SidekickError};
pub use service::{Answer, Sidekick, Source};
pub use synthesizer::{DocSection, QueryMode, Synthesizer};
