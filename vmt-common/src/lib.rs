//! # VMT Common Library
//!
//! Shared code for the VMT issue tracker:
//! - Database schema initialization and persisted models
//! - Event types (VmtEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - The common error type

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
