//! Ankivec Core Library
//!
//! This crate provides the foundational utilities shared by the ankivec crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Process configuration (`AppConfig`) and per-collection add-on settings
//!   (`AddonConfig`)

pub mod addon;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use addon::{load_addon_config, AddonConfig, ConfigStore, FileConfigStore};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
