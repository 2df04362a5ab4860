//! Event system for mbmap
//!
//! Provides the run event definitions and the EventBus used to surface
//! resolver progress to whoever is listening (CLI logger, tests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Resolver run state
///
/// `Idle → LoadingKeys → VerifyingArchive → Pass1Running → Pass1Done →
/// Pass2Running → Pass2Done`. `Failed` is reachable from every
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveState {
    Idle,
    LoadingKeys,
    VerifyingArchive,
    Pass1Running,
    Pass1Done,
    Pass2Running,
    Pass2Done,
    Failed,
}

impl ResolveState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolveState::Pass2Done | ResolveState::Failed)
    }
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolveState::Idle => "IDLE",
            ResolveState::LoadingKeys => "LOADING_KEYS",
            ResolveState::VerifyingArchive => "VERIFYING_ARCHIVE",
            ResolveState::Pass1Running => "PASS1_RUNNING",
            ResolveState::Pass1Done => "PASS1_DONE",
            ResolveState::Pass2Running => "PASS2_RUNNING",
            ResolveState::Pass2Done => "PASS2_DONE",
            ResolveState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Which archive scan an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPass {
    /// Pass 1: alias member, builds the internal index
    Alias,
    /// Pass 2: canonical member, resolves stable identifiers
    Canonical,
}

impl fmt::Display for ScanPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPass::Alias => f.write_str("pass 1 (alias)"),
            ScanPass::Canonical => f.write_str("pass 2 (canonical)"),
        }
    }
}

/// mbmap event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag so
/// they can be written out as JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolveEvent {
    /// Run moved between states
    StateChanged {
        run_id: Uuid,
        old_state: ResolveState,
        new_state: ResolveState,
        timestamp: DateTime<Utc>,
    },

    /// Periodic scan progress within a pass
    ScanProgress {
        run_id: Uuid,
        pass: ScanPass,
        records_read: u64,
        timestamp: DateTime<Utc>,
    },

    /// A pass finished reading its member
    PassCompleted {
        run_id: Uuid,
        pass: ScanPass,
        member: String,
        records_read: u64,
        matched: usize,
        /// Undecodable lines plus records with too few fields
        skipped: u64,
        /// Every index entry was resolved before the member ran out
        completed: bool,
        elapsed_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Run finished and the artifact was written
    RunCompleted {
        run_id: Uuid,
        sought: usize,
        indexed: usize,
        resolved: usize,
        timestamp: DateTime<Utc>,
    },

    /// Run aborted; nothing was written
    RunFailed {
        run_id: Uuid,
        error_kind: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ResolveEvent {
    /// Run the event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            ResolveEvent::StateChanged { run_id, .. }
            | ResolveEvent::ScanProgress { run_id, .. }
            | ResolveEvent::PassCompleted { run_id, .. }
            | ResolveEvent::RunCompleted { run_id, .. }
            | ResolveEvent::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Fan-out channel for run events
///
/// Backed by `tokio::sync::broadcast`. Sending never blocks; a subscriber
/// that falls more than `capacity` events behind sees `Lagged` and skips
/// ahead. Sending is a plain function call, so the resolver can publish
/// from its blocking thread while async tasks consume.
///
/// ```
/// use mbmap_common::events::{EventBus, ResolveEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(ResolveEvent::RunCompleted {
///     run_id: uuid::Uuid::new_v4(),
///     sought: 2,
///     indexed: 1,
///     resolved: 1,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ResolveEvent>,
}

impl EventBus {
    /// Bus buffering up to `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for every event sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ResolveEvent> {
        self.sender.subscribe()
    }

    /// Send, dropping the event if nobody is listening
    pub fn emit_lossy(&self, event: ResolveEvent) {
        let _ = self.sender.send(event);
    }
}
