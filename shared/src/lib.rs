//! Shared configuration and utilities for the TokenBuilder workspace
//!
//! This crate provides functionality used by both the core and the
//! infrastructure crates:
//! - Configuration types
//! - Validation helpers

pub mod config;
pub mod utils;

pub use config::{AppConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig, TokenPolicyConfig};
pub use utils::validation;
