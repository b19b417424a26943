// Reconcile crate clippy configuration
// These are intentional patterns in this crate:
#![allow(clippy::result_large_err)] // ReconcileError::DuplicateBlocked carries the detection result
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Subtrack Reconciliation Engine
//!
//! Decides, for every payment event attached to a recurring subscription,
//! whether it duplicates an existing record, whether it should advance the
//! subscription's last-billing-date watermark, and how to synthesize a full
//! historical payment trail for subscriptions that predate first login.
//!
//! ## Features
//!
//! - **Billing Periods**: Calendar-aware period enumeration across
//!   monthly/quarterly/yearly cycles with month-end clamping
//! - **Duplicate Detection**: Five-heuristic battery with severity tiers,
//!   evaluated in fixed priority order
//! - **Payment Records**: Validated record creation with an optional
//!   hard-block on high-severity duplicates
//! - **Watermark Advance**: Injected policy deciding when the last billing
//!   date moves; best-effort write, never transactional with the record
//! - **Backfill**: Bulk generation of historical success records
//!
//! The engine is stateless: all context arrives as explicit parameters, and
//! persistence sits behind the [`PaymentStore`] trait. Reconciliation is
//! advisory — the store's unique constraint on successful (subscription,
//! period) pairs is the authoritative integrity rule.

pub mod duplicates;
pub mod error;
pub mod periods;
pub mod policy;
pub mod records;
pub mod store;


// Duplicates
pub use duplicates::{
    DetectionConfig, DuplicateDetectionResult, DuplicateDetector, DuplicateType, Severity,
};

// Error
pub use error::{ReconcileError, ReconcileResult};

// Periods
pub use periods::{compute_periods, next_billing_date, BillingPeriod};

// Policy
pub use policy::{AdvanceContext, AdvanceDecision, AdvancePolicy, DefaultAdvancePolicy};

// Records
pub use records::{
    AddPaymentOutcome, AddPaymentParams, AutoGenerateOutcome, PaymentRecordService,
};

// Store
pub use store::{InMemoryStore, PaymentStore, SubscriptionBillingUpdate};
