// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Outcome reporting.
//!
//! The synchronizer never tells the user anything by itself. This module
//! turns its outcomes into one log line each, and tallies them so the caller
//! can tell "nothing to do", "already done", and "actually failed" apart.

use crate::sync::{SyncMode, SyncOutcome};

use std::error::Error as StdError;
use tracing::Level;

/// Log line for one sync outcome.
///
/// With `force` set, already present resources warn that overwriting is not
/// implemented instead of being mentioned at debug level.
pub fn describe_outcome(outcome: &SyncOutcome, force: bool) -> (Level, String) {
    let resource = outcome.resource();
    match (outcome.mode(), outcome.failure()) {
        (SyncMode::Skip, _) => (Level::WARN, format!("skipped {resource} (not found in source)")),
        (SyncMode::Exists, _) if force => (
            Level::WARN,
            format!("{resource} already exists (force overwrite not yet implemented)"),
        ),
        (SyncMode::Exists, _) => (Level::DEBUG, format!("{resource} already present")),
        (_, Some(failure)) => (
            Level::ERROR,
            format!("failed to sync {resource}: {}", error_chain(failure)),
        ),
        (SyncMode::Symlink, None) => (Level::INFO, format!("linked {resource}")),
        (SyncMode::Copy, None) => (Level::INFO, format!("copied {resource}")),
        (SyncMode::Error, None) => (Level::ERROR, format!("failed to sync {resource}")),
    }
}

/// Join error with every one of its causes.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }

    message
}

/// Count of sync outcomes by kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncTally {
    /// Linked or copied.
    pub synced: usize,

    /// Missing from the source tree.
    pub skipped: usize,

    /// Already present at the destination.
    pub present: usize,

    /// Failed while linking or copying.
    pub failed: usize,
}

impl SyncTally {
    /// Tally up outcomes of one synchronization.
    pub fn new(outcomes: &[SyncOutcome]) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            match (outcome.mode(), outcome.success()) {
                (SyncMode::Skip, _) => tally.skipped += 1,
                (SyncMode::Exists, _) => tally.present += 1,
                (SyncMode::Symlink | SyncMode::Copy, true) => tally.synced += 1,
                _ => tally.failed += 1,
            }
        }

        tally
    }

    /// Total number of outcomes tallied.
    pub fn total(&self) -> usize {
        self.synced + self.skipped + self.present + self.failed
    }

    /// Number of synced resources, unless any resource failed.
    ///
    /// Resources skipped for being absent from the source tree do not count
    /// as failures.
    ///
    /// # Errors
    ///
    /// - Return [`SyncFailed`] if at least one resource failed.
    pub fn into_result(self) -> Result<usize, SyncFailed> {
        if self.failed > 0 {
            return Err(SyncFailed {
                failed: self.failed,
                total: self.total(),
            });
        }

        Ok(self.synced)
    }
}

/// At least one resource failed to synchronize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to sync {failed} of {total} resources")]
pub struct SyncFailed {
    pub failed: usize,
    pub total: usize,
}
