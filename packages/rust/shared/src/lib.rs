//! Shared types, error model, and configuration for LLMO Writer.
//!
//! This crate is the foundation depended on by all other LLMO crates.
//! It provides:
//! - [`LlmoError`]: the unified error type
//! - Domain types ([`KeywordSet`], [`Article`], [`GroundingResponse`], [`SessionId`])
//! - Configuration ([`AppConfig`], [`GeminiConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GeminiConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key,
};
pub use error::{LlmoError, Result, Severity};
pub use types::{
    Article, GroundingResponse, GroundingSupport, KeywordSet, SessionId, SourceChunk,
};
