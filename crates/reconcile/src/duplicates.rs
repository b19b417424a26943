//! Duplicate payment detection
//!
//! Evaluates a fixed battery of heuristics against a candidate payment and
//! the existing payment history of the same subscription, returning the most
//! severe match or "no duplicate". The battery is an explicit ordered table
//! evaluated first-match-wins, so the priority is visible in one place and
//! each heuristic is independently testable.
//!
//! Pure decision logic: no store access, no side effects, deterministic over
//! its inputs.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use subtrack_shared::{NewPaymentRecord, PaymentRecord, PaymentStatus};

/// Thresholds and policy for duplicate detection
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Max wall-clock gap for the short-interval heuristic
    pub short_interval: Duration,
    /// Amounts closer than this are considered equal (rounding guard)
    pub amount_tolerance: f64,
    /// Smaller/larger amount ratio at or above which amounts are "similar"
    pub amount_similarity_ratio: f64,
    /// Whether callers may force-add past a positive match. Policy flag,
    /// not derived from the data.
    pub allow_force_add: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            short_interval: Duration::minutes(30),
            amount_tolerance: 0.01,
            amount_similarity_ratio: 0.95,
            allow_force_add: true,
        }
    }
}

/// Which heuristic flagged the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateType {
    SameBillingPeriod,
    SameDateAndAmount,
    ShortInterval,
    OverlappingPeriod,
    SimilarAmount,
}

impl DuplicateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateType::SameBillingPeriod => "same_billing_period",
            DuplicateType::SameDateAndAmount => "same_date_and_amount",
            DuplicateType::ShortInterval => "short_interval",
            DuplicateType::OverlappingPeriod => "overlapping_period",
            DuplicateType::SimilarAmount => "similar_amount",
        }
    }

    fn message(&self, conflict_count: usize) -> String {
        match self {
            DuplicateType::SameBillingPeriod => format!(
                "A successful payment already exists for this billing period ({} match{})",
                conflict_count,
                if conflict_count == 1 { "" } else { "es" }
            ),
            DuplicateType::SameDateAndAmount => {
                "A payment with the same date and amount already exists".to_string()
            }
            DuplicateType::ShortInterval => {
                "Another payment was recorded minutes away from this one".to_string()
            }
            DuplicateType::OverlappingPeriod => {
                "The billing period overlaps an existing payment's period".to_string()
            }
            DuplicateType::SimilarAmount => {
                "An existing payment has a very similar amount".to_string()
            }
        }
    }

    fn suggestion(&self) -> &'static str {
        match self {
            DuplicateType::SameBillingPeriod => {
                "This looks like a double charge. Verify with your payment provider before adding."
            }
            DuplicateType::SameDateAndAmount => {
                "Check whether this payment was already imported or entered manually."
            }
            DuplicateType::ShortInterval => {
                "Two charges in quick succession usually mean a retry. Confirm both settled."
            }
            DuplicateType::OverlappingPeriod => {
                "Overlapping periods usually indicate a mid-cycle plan change, not a duplicate."
            }
            DuplicateType::SimilarAmount => {
                "Amounts differ slightly; this may be a price change between periods."
            }
        }
    }
}

impl std::fmt::Display for DuplicateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Confidence tier of a duplicate match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// Outcome of one duplicate check. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateDetectionResult {
    pub is_duplicate: bool,
    pub duplicate_type: Option<DuplicateType>,
    /// The existing records that triggered the match, in history order
    pub conflicting_payments: Vec<PaymentRecord>,
    pub severity: Severity,
    /// Human-readable, advisory only
    pub message: String,
    pub suggestion: String,
    /// Copied from config; lets the caller decide whether to hard-block
    pub allow_force_add: bool,
}

impl DuplicateDetectionResult {
    fn no_duplicate(allow_force_add: bool) -> Self {
        Self {
            is_duplicate: false,
            duplicate_type: None,
            conflicting_payments: Vec::new(),
            severity: Severity::Low,
            message: "No duplicate detected".to_string(),
            suggestion: String::new(),
            allow_force_add,
        }
    }
}

/// One entry of the detection battery
struct Heuristic {
    kind: DuplicateType,
    severity: Severity,
    matches: fn(&DetectionConfig, &NewPaymentRecord, &PaymentRecord) -> bool,
}

/// The battery, in priority order. First match wins, so the strongest
/// double-charge signal always surfaces ahead of the weak amount heuristic.
const HEURISTICS: &[Heuristic] = &[
    Heuristic {
        kind: DuplicateType::SameBillingPeriod,
        severity: Severity::High,
        matches: same_billing_period,
    },
    Heuristic {
        kind: DuplicateType::SameDateAndAmount,
        severity: Severity::High,
        matches: same_date_and_amount,
    },
    Heuristic {
        kind: DuplicateType::ShortInterval,
        severity: Severity::Medium,
        matches: short_interval,
    },
    Heuristic {
        kind: DuplicateType::OverlappingPeriod,
        severity: Severity::Medium,
        matches: overlapping_period,
    },
    Heuristic {
        kind: DuplicateType::SimilarAmount,
        severity: Severity::Low,
        matches: similar_amount,
    },
];

fn amounts_equal(config: &DetectionConfig, a: f64, b: f64) -> bool {
    (a - b).abs() <= config.amount_tolerance
}

/// A billing period should have at most one successful charge. Identical
/// period bounds with both payments successful is the canonical double
/// charge.
fn same_billing_period(
    _config: &DetectionConfig,
    candidate: &NewPaymentRecord,
    existing: &PaymentRecord,
) -> bool {
    existing.billing_period_start == candidate.billing_period_start
        && existing.billing_period_end == candidate.billing_period_end
        && existing.status == PaymentStatus::Success
        && candidate.status == PaymentStatus::Success
}

fn same_date_and_amount(
    config: &DetectionConfig,
    candidate: &NewPaymentRecord,
    existing: &PaymentRecord,
) -> bool {
    existing.payment_date == candidate.payment_date
        && amounts_equal(config, existing.amount, candidate.amount)
}

/// Date-only payment dates enter as midnight, so this heuristic only
/// discriminates when the stored dates carry a time of day. Known precision
/// limitation.
fn short_interval(
    config: &DetectionConfig,
    candidate: &NewPaymentRecord,
    existing: &PaymentRecord,
) -> bool {
    let gap = existing.payment_date - candidate.payment_date;
    gap.abs() <= config.short_interval
}

fn overlapping_period(
    _config: &DetectionConfig,
    candidate: &NewPaymentRecord,
    existing: &PaymentRecord,
) -> bool {
    let identical = existing.billing_period_start == candidate.billing_period_start
        && existing.billing_period_end == candidate.billing_period_end;
    !identical
        && candidate.billing_period_start <= existing.billing_period_end
        && existing.billing_period_start <= candidate.billing_period_end
}

fn similar_amount(
    config: &DetectionConfig,
    candidate: &NewPaymentRecord,
    existing: &PaymentRecord,
) -> bool {
    if amounts_equal(config, existing.amount, candidate.amount) {
        return false;
    }
    let larger = existing.amount.max(candidate.amount);
    let smaller = existing.amount.min(candidate.amount);
    larger > 0.0 && smaller / larger >= config.amount_similarity_ratio
}

/// Runs the heuristic battery over a candidate and its subscription's history
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    config: DetectionConfig,
}

impl DuplicateDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Evaluate the battery in priority order and return the first match
    ///
    /// `existing` must be the payment history of the candidate's own
    /// subscription; records for other subscriptions are the caller's bug.
    pub fn detect(
        &self,
        candidate: &NewPaymentRecord,
        existing: &[PaymentRecord],
    ) -> DuplicateDetectionResult {
        for heuristic in HEURISTICS {
            let conflicting: Vec<PaymentRecord> = existing
                .iter()
                .filter(|record| (heuristic.matches)(&self.config, candidate, record))
                .cloned()
                .collect();

            if !conflicting.is_empty() {
                return DuplicateDetectionResult {
                    is_duplicate: true,
                    duplicate_type: Some(heuristic.kind),
                    severity: heuristic.severity,
                    message: heuristic.kind.message(conflicting.len()),
                    suggestion: heuristic.kind.suggestion().to_string(),
                    allow_force_add: self.config.allow_force_add,
                    conflicting_payments: conflicting,
                };
            }
        }

        DuplicateDetectionResult::no_duplicate(self.config.allow_force_add)
    }
}
