//! Billing period calculation
//!
//! Pure calendar arithmetic: enumerates the billing periods a subscription
//! has entered between its start date and a cutoff. Anchors are always
//! computed from the original start date so day-of-month anchoring is
//! preserved across month-length drift (Jan 31 anchors Feb on Feb's last
//! day, then back to the 31st in March).

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use subtrack_shared::BillingCycle;

/// One concrete billing period of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Nominal billing date, equal to the period start
    pub billing_date: NaiveDate,
    pub period_start: NaiveDate,
    /// Inclusive; the day before the next period's start
    pub period_end: NaiveDate,
}

/// Compute every billing period whose start falls on or before `cutoff_date`
///
/// Returns periods in chronological order, contiguous and non-overlapping by
/// construction. Empty when `start_date > cutoff_date` — a future-dated
/// subscription has no elapsed periods, which is not an error.
pub fn compute_periods(
    start_date: NaiveDate,
    cutoff_date: NaiveDate,
    cycle: BillingCycle,
) -> Vec<BillingPeriod> {
    if start_date > cutoff_date {
        return Vec::new();
    }

    let step = cycle.months();
    let mut periods = Vec::new();
    let mut index: u32 = 0;

    loop {
        // Anchor from the original start, not the previous anchor, so that
        // clamping in a short month does not stick for the rest of the run.
        let Some(anchor) = start_date.checked_add_months(Months::new(index * step)) else {
            break;
        };
        if anchor > cutoff_date {
            break;
        }
        let Some(next_anchor) = start_date.checked_add_months(Months::new((index + 1) * step))
        else {
            break;
        };
        let Some(period_end) = next_anchor.checked_sub_days(Days::new(1)) else {
            break;
        };

        periods.push(BillingPeriod {
            billing_date: anchor,
            period_start: anchor,
            period_end,
        });
        index += 1;
    }

    periods
}

/// The next billing date one cycle past a period start
///
/// `None` only on calendar overflow, which no realistic subscription reaches.
pub fn next_billing_date(period_start: NaiveDate, cycle: BillingCycle) -> Option<NaiveDate> {
    period_start.checked_add_months(Months::new(cycle.months()))
}
