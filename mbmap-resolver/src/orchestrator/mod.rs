//! Resolve run orchestration
//!
//! Drives one run through its states:
//!
//! ```text
//! IDLE → LOADING_KEYS → VERIFYING_ARCHIVE → PASS1_RUNNING → PASS1_DONE
//!      → PASS2_RUNNING → PASS2_DONE
//! ```
//!
//! `VERIFYING_ARCHIVE` only occurs with preflight enabled. Any error moves
//! the run to `FAILED` and nothing is written. The output artifact is
//! written before `PASS2_DONE`, so reaching it means the artifact exists.
//!
//! The resolver is synchronous; callers in async code run it on a
//! blocking thread and cancel it through its `CancellationToken`.

mod statistics;

pub use statistics::{CoverageReport, PassStatistics, RunSummary};

use crate::archive::{ArchiveReader, MemberSelector};
use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::index_builder::{build_index, IndexStats};
use crate::models::{InternalIndex, SoughtKeySet};
use crate::scanner::{resolve, ScanOutcome};
use crate::sink::write_resolved_map;
use crate::sought_keys::load_sought_keys;
use crate::tsv::{Record, TsvRecords};
use chrono::{DateTime, Utc};
use mbmap_common::events::{EventBus, ResolveEvent, ResolveState, ScanPass};
use std::io;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Records between cancellation checks inside a pass
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// One ISRC → MBID resolve run
pub struct Resolver {
    config: ResolverConfig,
    event_bus: EventBus,
    cancel: CancellationToken,
    run_id: Uuid,
    state: ResolveState,
}

impl Resolver {
    pub fn new(config: ResolverConfig, event_bus: EventBus) -> Self {
        Self {
            config,
            event_bus,
            cancel: CancellationToken::new(),
            run_id: Uuid::new_v4(),
            state: ResolveState::Idle,
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> ResolveState {
        self.state
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Execute the run to completion
    ///
    /// On failure the run ends in `FAILED` and a `RunFailed` event is
    /// emitted before the error is returned.
    pub fn run(mut self) -> ResolveResult<RunSummary> {
        let started_at = Utc::now();
        info!(
            run_id = %self.run_id,
            "Resolve run started: archive {}, sought keys {}",
            self.config.archive_path.display(),
            self.config.sought_keys_path.display()
        );

        match self.execute(started_at) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(run_id = %self.run_id, "Resolve run failed: {}", e);
                self.transition(ResolveState::Failed);
                self.event_bus.emit_lossy(ResolveEvent::RunFailed {
                    run_id: self.run_id,
                    error_kind: e.kind().to_string(),
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    fn execute(&mut self, started_at: DateTime<Utc>) -> ResolveResult<RunSummary> {
        let archive = ArchiveReader::open(&self.config.archive_path)?;
        debug!(
            run_id = %self.run_id,
            "Archive {} opened as {}",
            archive.path().display(),
            archive.format()
        );
        if !self.config.sought_keys_path.is_file() {
            return Err(ResolveError::InputMissing(
                self.config.sought_keys_path.clone(),
            ));
        }

        self.transition(ResolveState::LoadingKeys);
        let sought = load_sought_keys(&self.config.sought_keys_path, &self.config.sought_column)?;
        self.check_cancelled()?;

        let (alias_selector, canonical_selector) = if self.config.preflight {
            self.transition(ResolveState::VerifyingArchive);
            let names = archive.locate_members(&[
                &self.config.alias_member_selector,
                &self.config.canonical_member_selector,
            ])?;
            info!(
                run_id = %self.run_id,
                "Archive members located: alias {}, canonical {}",
                names[0],
                names[1]
            );
            (
                MemberSelector::exact(names[0].as_str()),
                MemberSelector::exact(names[1].as_str()),
            )
        } else {
            (
                self.config.alias_member_selector.clone(),
                self.config.canonical_member_selector.clone(),
            )
        };
        self.check_cancelled()?;

        self.transition(ResolveState::Pass1Running);
        let (index, index_stats, alias_pass) =
            self.run_alias_pass(&archive, &alias_selector, &sought)?;
        self.transition(ResolveState::Pass1Done);
        self.check_cancelled()?;

        self.transition(ResolveState::Pass2Running);
        let (outcome, canonical_pass) =
            self.run_canonical_pass(&archive, &canonical_selector, &index)?;
        let indexed = index.len();
        drop(index);
        self.check_cancelled()?;

        let ScanOutcome {
            resolved,
            stats: scan_stats,
        } = outcome;

        write_resolved_map(&self.config.output_path, &resolved, &self.config.output_headers)?;

        let coverage = CoverageReport {
            sought: sought.len(),
            indexed,
            resolved: resolved.len(),
        };
        info!(run_id = %self.run_id, "{}", coverage.display_string());
        self.event_bus.emit_lossy(ResolveEvent::RunCompleted {
            run_id: self.run_id,
            sought: coverage.sought,
            indexed: coverage.indexed,
            resolved: coverage.resolved,
            timestamp: Utc::now(),
        });
        self.transition(ResolveState::Pass2Done);

        Ok(RunSummary {
            run_id: self.run_id,
            started_at,
            finished_at: Utc::now(),
            archive_path: self.config.archive_path.clone(),
            output_path: self.config.output_path.clone(),
            alias_pass,
            canonical_pass,
            superseded_entries: index_stats.superseded_entries,
            unmatched_keys: index_stats.unmatched_keys,
            duplicate_canonical_keys: scan_stats.duplicate_keys,
            coverage,
        })
    }

    /// Pass 1: read the whole alias member into the internal index
    fn run_alias_pass(
        &self,
        archive: &ArchiveReader,
        selector: &MemberSelector,
        sought: &SoughtKeySet,
    ) -> ResolveResult<(InternalIndex, IndexStats, PassStatistics)> {
        let started = Instant::now();

        let (member, outcome, undecodable_lines) = archive.with_member(selector, |name, reader| {
            info!(run_id = %self.run_id, "Pass 1: indexing {}", name);
            let mut records = TsvRecords::new(reader);
            let monitored = self.monitor(&mut records, ScanPass::Alias);
            let outcome =
                build_index(monitored, sought).map_err(|e| self.scan_error(archive, e))?;
            Ok((name.to_string(), outcome, records.undecodable_lines()))
        })?;

        let pass = PassStatistics {
            member,
            records_read: outcome.stats.records_read,
            matched: outcome.index.len(),
            short_records: outcome.stats.short_records,
            undecodable_lines,
            completed: false,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(run_id = %self.run_id, "Pass 1 complete: {}", pass.display_string());
        self.emit_pass_completed(ScanPass::Alias, &pass);

        Ok((outcome.index, outcome.stats, pass))
    }

    /// Pass 2: scan the canonical member until every index entry resolves
    ///
    /// An empty index is already complete, so the member is not opened.
    fn run_canonical_pass(
        &self,
        archive: &ArchiveReader,
        selector: &MemberSelector,
        index: &InternalIndex,
    ) -> ResolveResult<(ScanOutcome, PassStatistics)> {
        let started = Instant::now();

        if index.is_empty() {
            info!(run_id = %self.run_id, "Pass 2: nothing indexed, skipping canonical member");
            let outcome = resolve(std::iter::empty::<io::Result<Record>>(), index)
                .map_err(|e| archive.read_error(e))?;
            let pass = PassStatistics {
                member: selector_label(selector),
                completed: outcome.stats.completed,
                ..Default::default()
            };
            self.emit_pass_completed(ScanPass::Canonical, &pass);
            return Ok((outcome, pass));
        }

        let (member, outcome, undecodable_lines) = archive.with_member(selector, |name, reader| {
            info!(
                run_id = %self.run_id,
                "Pass 2: resolving {} indexed keys from {}",
                index.len(),
                name
            );
            let mut records = TsvRecords::new(reader);
            let monitored = self.monitor(&mut records, ScanPass::Canonical);
            let outcome = resolve(monitored, index).map_err(|e| self.scan_error(archive, e))?;
            Ok((name.to_string(), outcome, records.undecodable_lines()))
        })?;

        let pass = PassStatistics {
            member,
            records_read: outcome.stats.records_read,
            matched: outcome.resolved.len(),
            short_records: outcome.stats.short_records,
            undecodable_lines,
            completed: outcome.stats.completed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        if outcome.stats.duplicate_keys > 0 {
            warn!(
                run_id = %self.run_id,
                "{} canonical records repeated an already resolved key; first match kept",
                outcome.stats.duplicate_keys
            );
        }
        info!(run_id = %self.run_id, "Pass 2 complete: {}", pass.display_string());
        self.emit_pass_completed(ScanPass::Canonical, &pass);

        Ok((outcome, pass))
    }

    fn monitor<I>(&self, records: I, pass: ScanPass) -> ScanMonitor<'_, I> {
        ScanMonitor {
            inner: records,
            cancel: &self.cancel,
            event_bus: &self.event_bus,
            run_id: self.run_id,
            pass,
            progress_interval: self.config.progress_interval,
            records_read: 0,
        }
    }

    /// Classify an I/O error raised while streaming a member
    fn scan_error(&self, archive: &ArchiveReader, err: io::Error) -> ResolveError {
        if err.kind() == io::ErrorKind::Interrupted && self.cancel.is_cancelled() {
            ResolveError::Cancelled
        } else {
            archive.read_error(err)
        }
    }

    fn check_cancelled(&self) -> ResolveResult<()> {
        if self.cancel.is_cancelled() {
            info!(run_id = %self.run_id, "Cancellation requested in state {}", self.state);
            return Err(ResolveError::Cancelled);
        }
        Ok(())
    }

    /// Move to `new_state`; terminal states are final
    fn transition(&mut self, new_state: ResolveState) {
        let old_state = self.state;
        if old_state.is_terminal() {
            warn!(
                run_id = %self.run_id,
                "Ignoring transition {} → {} after run ended",
                old_state,
                new_state
            );
            return;
        }
        self.state = new_state;
        debug!(run_id = %self.run_id, "State {} → {}", old_state, new_state);
        self.event_bus.emit_lossy(ResolveEvent::StateChanged {
            run_id: self.run_id,
            old_state,
            new_state,
            timestamp: Utc::now(),
        });
    }

    fn emit_pass_completed(&self, pass: ScanPass, stats: &PassStatistics) {
        self.event_bus.emit_lossy(ResolveEvent::PassCompleted {
            run_id: self.run_id,
            pass,
            member: stats.member.clone(),
            records_read: stats.records_read,
            matched: stats.matched,
            skipped: stats.skipped(),
            completed: stats.completed,
            elapsed_ms: stats.elapsed_ms,
            timestamp: Utc::now(),
        });
    }
}

fn selector_label(selector: &MemberSelector) -> String {
    match selector {
        MemberSelector::Exact(name) => name.clone(),
        other => other.to_string(),
    }
}

/// Record stream adapter: cancellation checks and progress events
///
/// Once the token is cancelled the next check yields an `Interrupted`
/// error, which ends the pass.
struct ScanMonitor<'a, I> {
    inner: I,
    cancel: &'a CancellationToken,
    event_bus: &'a EventBus,
    run_id: Uuid,
    pass: ScanPass,
    progress_interval: u64,
    records_read: u64,
}

impl<I> Iterator for ScanMonitor<'_, I>
where
    I: Iterator<Item = io::Result<Record>>,
{
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.records_read % CANCEL_CHECK_INTERVAL == 0 && self.cancel.is_cancelled() {
            return Some(Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "scan cancelled",
            )));
        }

        let item = self.inner.next()?;
        if item.is_ok() {
            self.records_read += 1;
            if self.progress_interval > 0 && self.records_read % self.progress_interval == 0 {
                self.event_bus.emit_lossy(ResolveEvent::ScanProgress {
                    run_id: self.run_id,
                    pass: self.pass,
                    records_read: self.records_read,
                    timestamp: Utc::now(),
                });
            }
        }
        Some(item)
    }
}
