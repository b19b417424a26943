//! Reconciliation error types

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::duplicates::DuplicateDetectionResult;

/// Errors produced by the reconciliation engine
///
/// Maps the failure taxonomy: validation errors (nothing written), a blocking
/// duplicate (carries the full detection result so callers can render it),
/// and store failures wrapped with a message. Secondary-update failures are
/// never surfaced here — they are logged and reported via outcome flags.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("subscription {0} not found")]
    SubscriptionNotFound(Uuid),

    #[error("payment amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("billing period start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("subscription start date {0} is in the future, nothing to backfill")]
    FutureStartDate(NaiveDate),

    #[error("blocked by duplicate detection: {}", .0.message)]
    DuplicateBlocked(DuplicateDetectionResult),

    #[error("store error: {0}")]
    Store(String),
}

impl ReconcileError {
    /// The detection result for a blocking duplicate, if that is what this is
    pub fn duplicate_result(&self) -> Option<&DuplicateDetectionResult> {
        match self {
            ReconcileError::DuplicateBlocked(result) => Some(result),
            _ => None,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
