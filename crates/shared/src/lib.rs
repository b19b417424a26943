// Shared crate clippy configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Subtrack Shared Types
//!
//! Domain types shared between the reconciliation engine and the
//! surrounding application: billing cycles, payment statuses, payment
//! records, and the subscription fields the engine consumes.
//!
//! These are plain data types — no I/O, no store access.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recurrence interval of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingCycle {
    /// Cycle length in calendar months
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::Yearly => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "quarterly" => Ok(BillingCycle::Quarterly),
            "yearly" => Ok(BillingCycle::Yearly),
            other => Err(format!("unknown billing cycle: {}", other)),
        }
    }
}

/// Status of a recorded payment event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Pending => "pending",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One payment event tied to a subscription
///
/// Immutable once created except for status/notes corrections through an
/// explicit update in the store. `billing_period_start <= billing_period_end`
/// and `amount > 0` are enforced at creation by the record service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Assigned by the persistence layer
    pub id: Uuid,
    pub subscription_id: Uuid,
    /// When the payment happened; date-only sources enter as midnight UTC
    pub payment_date: DateTime<Utc>,
    pub amount: f64,
    /// ISO 4217 code, e.g. "USD"
    pub currency: String,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A payment record candidate, before the store has assigned an id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentRecord {
    pub subscription_id: Uuid,
    pub payment_date: DateTime<Utc>,
    pub amount: f64,
    pub currency: String,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub status: PaymentStatus,
    pub notes: Option<String>,
}

/// Subscription fields the reconciliation engine consumes
///
/// `last_billing_date` is a monotonic watermark: the period start of the most
/// recent period with a known successful payment. It only moves forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub name: String,
    pub billing_cycle: BillingCycle,
    pub start_date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub last_billing_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
}
