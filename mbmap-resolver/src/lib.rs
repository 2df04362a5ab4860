//! mbmap-resolver library interface
//!
//! Resolves external recording identifiers (ISRCs) to MusicBrainz
//! recording identifiers with a two-pass streaming join over a compressed
//! dump archive:
//!
//! 1. Pass 1 reads the whole alias member and keeps only the rows whose
//!    identifier is sought, building a small internal-key index.
//! 2. Pass 2 streams the canonical member and stops as soon as every
//!    indexed key has resolved.
//!
//! Exposes public APIs for the CLI and for integration testing.

pub mod archive;
pub mod config;
pub mod error;
pub mod index_builder;
pub mod models;
pub mod orchestrator;
pub mod scanner;
pub mod sink;
pub mod sought_keys;
pub mod tsv;

pub use crate::archive::{ArchiveFormat, ArchiveReader, MemberSelector};
pub use crate::config::{ConfigOverrides, ResolverConfig};
pub use crate::error::{ResolveError, ResolveResult};
pub use crate::models::{InternalIndex, ResolvedMap, SoughtKeySet};
pub use crate::orchestrator::{CoverageReport, PassStatistics, Resolver, RunSummary};
