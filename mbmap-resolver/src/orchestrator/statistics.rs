//! Run statistics and coverage reporting

use chrono::{DateTime, Utc};
use mbmap_common::human_time::{format_count, format_elapsed};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Resolved count against sought count
///
/// Partial coverage is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Distinct identifiers requested
    pub sought: usize,
    /// Identifiers that found an alias entry in pass 1
    pub indexed: usize,
    /// Identifiers resolved to a stable identifier in pass 2
    pub resolved: usize,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.resolved == self.sought
    }

    /// Resolved share of sought identifiers, 0-100
    pub fn percent(&self) -> f64 {
        if self.sought == 0 {
            return 100.0;
        }
        self.resolved as f64 * 100.0 / self.sought as f64
    }

    pub fn display_string(&self) -> String {
        format!(
            "Mapped {} of {} sought identifiers ({:.1}%), {} found in alias data",
            self.resolved,
            self.sought,
            self.percent(),
            self.indexed
        )
    }
}

/// One archive pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStatistics {
    /// Archive member that was read
    pub member: String,
    pub records_read: u64,
    /// Index entries (pass 1) or resolved pairs (pass 2)
    pub matched: usize,
    pub short_records: u64,
    pub undecodable_lines: u64,
    /// Pass 2 stopped on a fully resolved index
    pub completed: bool,
    pub elapsed_ms: u64,
}

impl PassStatistics {
    /// Records dropped as malformed
    pub fn skipped(&self) -> u64 {
        self.short_records + self.undecodable_lines
    }

    pub fn display_string(&self) -> String {
        let mut text = format!(
            "{}: {} records read, {} matched, {} skipped in {}",
            self.member,
            format_count(self.records_read),
            format_count(self.matched as u64),
            format_count(self.skipped()),
            format_elapsed(Duration::from_millis(self.elapsed_ms))
        );
        if self.completed {
            text.push_str(" (all indexed keys resolved)");
        }
        text
    }
}

/// Everything a successful run reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub archive_path: PathBuf,
    pub output_path: PathBuf,
    pub alias_pass: PassStatistics,
    pub canonical_pass: PassStatistics,
    /// Alias entries replaced by later records
    pub superseded_entries: u64,
    /// Sought identifiers with no alias entry
    pub unmatched_keys: usize,
    /// Canonical keys seen again after being resolved
    pub duplicate_canonical_keys: u64,
    pub coverage: CoverageReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_coverage() {
        let coverage = CoverageReport {
            sought: 2,
            indexed: 1,
            resolved: 1,
        };
        assert!(!coverage.is_complete());
        assert_eq!(coverage.percent(), 50.0);
        assert_eq!(
            coverage.display_string(),
            "Mapped 1 of 2 sought identifiers (50.0%), 1 found in alias data"
        );
    }

    #[test]
    fn test_empty_sought_set_is_complete() {
        let coverage = CoverageReport {
            sought: 0,
            indexed: 0,
            resolved: 0,
        };
        assert!(coverage.is_complete());
        assert_eq!(coverage.percent(), 100.0);
    }

    #[test]
    fn test_pass_display() {
        let stats = PassStatistics {
            member: "mbdump/recording".to_string(),
            records_read: 1_234_567,
            matched: 10,
            short_records: 2,
            undecodable_lines: 1,
            completed: true,
            elapsed_ms: 4_500,
        };
        assert_eq!(stats.skipped(), 3);
        assert_eq!(
            stats.display_string(),
            "mbdump/recording: 1,234,567 records read, 10 matched, 3 skipped in 4.50s (all indexed keys resolved)"
        );
    }
}
