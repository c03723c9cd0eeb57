//! Authentication and provisioning state machines
//!
//! `ProvisioningState` doubles as the user-visible progress log: each
//! `Working` transition pushes the step it replaces onto a bounded history.
//! The transition rules live here as pure functions so the repository can
//! apply them atomically inside a single channel update.

use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of history entries kept in a provisioning log.
pub const MAX_HISTORY_SIZE: usize = 100;

/// High-level authentication state of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthState {
    /// No credentials stored; setup required
    Uninitialized,
    /// Bootstrap credentials stored; provisioning not yet complete
    SetupPending,
    /// Runtime credentials stored and active
    Authenticated,
}

/// Detailed state of a provisioning or recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Idle,
    Working {
        current_step: String,
        history: Vec<String>,
    },
    Success {
        history: Vec<String>,
    },
    Failure {
        error: DomainError,
        history: Vec<String>,
    },
}

impl ProvisioningState {
    pub fn working(step: impl Into<String>) -> Self {
        Self::Working {
            current_step: step.into(),
            history: Vec::new(),
        }
    }

    pub fn success() -> Self {
        Self::Success {
            history: Vec::new(),
        }
    }

    pub fn failure(error: DomainError) -> Self {
        Self::Failure {
            error,
            history: Vec::new(),
        }
    }

    /// History carried by this state (empty for `Idle`).
    pub fn history(&self) -> &[String] {
        match self {
            Self::Idle => &[],
            Self::Working { history, .. }
            | Self::Success { history }
            | Self::Failure { history, .. } => history,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failure { .. })
    }

    /// Compute the state that results from publishing `next` on top of `self`.
    ///
    /// - `Working` after `Working`: the previous step is appended to the
    ///   previous history (capped at [`MAX_HISTORY_SIZE`]); any history
    ///   supplied with `next` is ignored.
    /// - `Working` after anything else: history starts empty.
    /// - `Success`/`Failure` after `Working` with no explicit history: the
    ///   run's log (history plus the last step) is carried over.
    /// - Everything else is published as given.
    pub fn transition(&self, next: ProvisioningState) -> ProvisioningState {
        match (self, next) {
            (
                Self::Working {
                    current_step: previous,
                    history,
                },
                Self::Working { current_step, .. },
            ) => Self::Working {
                current_step,
                history: appended(history, previous),
            },
            (_, Self::Working { current_step, .. }) => Self::Working {
                current_step,
                history: Vec::new(),
            },
            (
                Self::Working {
                    current_step,
                    history,
                },
                Self::Success { history: given },
            ) if given.is_empty() => Self::Success {
                history: appended(history, current_step),
            },
            (
                Self::Working {
                    current_step,
                    history,
                },
                Self::Failure {
                    error,
                    history: given,
                },
            ) if given.is_empty() => Self::Failure {
                error,
                history: appended(history, current_step),
            },
            (_, next) => next,
        }
    }
}

fn appended(history: &[String], step: &str) -> Vec<String> {
    let mut log = ProgressLog::from_slice(history);
    log.push(step);
    log.into_vec()
}

/// Bounded FIFO log of completed steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressLog {
    entries: VecDeque<String>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from existing entries, keeping only the newest
    /// [`MAX_HISTORY_SIZE`].
    pub fn from_slice(entries: &[String]) -> Self {
        let skip = entries.len().saturating_sub(MAX_HISTORY_SIZE);
        Self {
            entries: entries.iter().skip(skip).cloned().collect(),
        }
    }

    /// Append an entry, evicting the oldest once the cap is reached.
    pub fn push(&mut self, entry: impl Into<String>) {
        if self.entries.len() >= MAX_HISTORY_SIZE {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries.into()
    }
}

/// Coarse onboarding stage, persisted so setup can resume after restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnboardingStage {
    Idle,
    Provisioning,
    PermissionsPending,
    Complete,
}

/// Why a candidate bucket cannot be used for recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketValidationError {
    /// Bucket lacks the `LocusRole=DeviceBucket` tag
    MissingLocusTag,
    /// Tags could not be read
    AccessDenied,
}

/// Result of checking one candidate bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketValidationStatus {
    Available,
    Invalid(BucketValidationError),
}
