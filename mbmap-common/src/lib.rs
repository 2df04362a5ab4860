//! # mbmap Common Library
//!
//! Shared code for the mbmap tools including:
//! - Error types
//! - Layered configuration loading (CLI → ENV → TOML → compiled default)
//! - Run event types and the broadcast EventBus
//! - Human-readable elapsed time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{EventBus, ResolveEvent, ResolveState, ScanPass};
