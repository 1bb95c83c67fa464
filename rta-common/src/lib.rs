//! # RTA Common Library
//!
//! Shared code for the Roundtable Alias screening services including:
//! - Error types
//! - Configuration loading (TOML bootstrap + defaults)
//! - Response text cleaning used for duplicate matching
//! - SQLite pool initialization and schema

pub mod config;
pub mod db;
pub mod error;
pub mod text;

pub use error::{Error, Result};
pub use text::clean_response;
