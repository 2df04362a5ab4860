//! Test Helper Utilities
//!
//! Shared utilities for testing mbmap-resolver

#![allow(dead_code)]

pub mod archive_builder;

pub use archive_builder::{Compression, DumpFixture};
