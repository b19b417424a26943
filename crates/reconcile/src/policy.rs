//! Last-billing-date advance policy
//!
//! Whether a payment should move a subscription's last-billing-date
//! watermark is a policy decision injected by the caller. The record service
//! acts on the decision without second-guessing it; the default policy below
//! implements the standard rules.

use chrono::{DateTime, NaiveDate, Utc};
use subtrack_shared::{BillingCycle, PaymentStatus};

/// Everything the policy may consider for one payment
#[derive(Debug, Clone)]
pub struct AdvanceContext {
    pub payment_date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub current_last_billing_date: Option<NaiveDate>,
    pub billing_cycle: BillingCycle,
}

/// The policy's verdict plus a human-readable reason
#[derive(Debug, Clone)]
pub struct AdvanceDecision {
    pub advance: bool,
    pub reason: String,
}

impl AdvanceDecision {
    fn no(reason: impl Into<String>) -> Self {
        Self {
            advance: false,
            reason: reason.into(),
        }
    }

    fn yes(reason: impl Into<String>) -> Self {
        Self {
            advance: true,
            reason: reason.into(),
        }
    }
}

pub trait AdvancePolicy: Send + Sync {
    fn should_advance(&self, ctx: &AdvanceContext) -> AdvanceDecision;
}

/// Standard watermark rules: successful payments only, the period must have
/// started by the payment date, and the watermark never regresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAdvancePolicy;

impl AdvancePolicy for DefaultAdvancePolicy {
    fn should_advance(&self, ctx: &AdvanceContext) -> AdvanceDecision {
        if ctx.status != PaymentStatus::Success {
            return AdvanceDecision::no(format!(
                "payment status is {}, only successful payments move the last billing date",
                ctx.status
            ));
        }

        if ctx.period_start > ctx.payment_date.date_naive() {
            return AdvanceDecision::no(format!(
                "billing period starting {} has not begun as of the payment date",
                ctx.period_start
            ));
        }

        match ctx.current_last_billing_date {
            None => AdvanceDecision::yes("first recorded successful payment"),
            Some(current) if ctx.period_start > current => AdvanceDecision::yes(format!(
                "period start {} is newer than the current last billing date {}",
                ctx.period_start, current
            )),
            Some(current) => AdvanceDecision::no(format!(
                "period start {} does not advance the current last billing date {}",
                ctx.period_start, current
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx(
        status: PaymentStatus,
        period_start: NaiveDate,
        current: Option<NaiveDate>,
    ) -> AdvanceContext {
        AdvanceContext {
            payment_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            status,
            period_start,
            period_end: date(2024, 3, 31),
            current_last_billing_date: current,
            billing_cycle: BillingCycle::Monthly,
        }
    }

    #[test]
    fn test_failed_payment_never_advances() {
        let decision = DefaultAdvancePolicy
            .should_advance(&ctx(PaymentStatus::Failed, date(2024, 3, 1), None));
        assert!(!decision.advance);
    }

    #[test]
    fn test_pending_payment_never_advances() {
        let decision = DefaultAdvancePolicy
            .should_advance(&ctx(PaymentStatus::Pending, date(2024, 3, 1), None));
        assert!(!decision.advance);
    }

    #[test]
    fn test_first_success_advances_null_watermark() {
        let decision = DefaultAdvancePolicy
            .should_advance(&ctx(PaymentStatus::Success, date(2024, 3, 1), None));
        assert!(decision.advance);
    }

    #[test]
    fn test_newer_period_advances() {
        let decision = DefaultAdvancePolicy.should_advance(&ctx(
            PaymentStatus::Success,
            date(2024, 3, 1),
            Some(date(2024, 2, 1)),
        ));
        assert!(decision.advance);
    }

    #[test]
    fn test_older_period_does_not_regress_watermark() {
        let decision = DefaultAdvancePolicy.should_advance(&ctx(
            PaymentStatus::Success,
            date(2024, 1, 1),
            Some(date(2024, 2, 1)),
        ));
        assert!(!decision.advance);
    }

    #[test]
    fn test_equal_period_does_not_advance() {
        let decision = DefaultAdvancePolicy.should_advance(&ctx(
            PaymentStatus::Success,
            date(2024, 2, 1),
            Some(date(2024, 2, 1)),
        ));
        assert!(!decision.advance);
    }

    #[test]
    fn test_future_period_relative_to_payment_date_does_not_advance() {
        // Payment dated Mar 1 cannot vouch for a period starting Apr 1
        let decision = DefaultAdvancePolicy
            .should_advance(&ctx(PaymentStatus::Success, date(2024, 4, 1), None));
        assert!(!decision.advance);
    }
}
