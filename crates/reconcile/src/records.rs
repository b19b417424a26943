//! Payment record service
//!
//! Orchestrates the add-payment flow: validation, duplicate detection,
//! persistence, and the best-effort advance of the subscription's
//! last-billing-date watermark. Also owns the bulk historical backfill for
//! subscriptions that predate the user's first login.
//!
//! Ordering rule throughout: the payment record is truth, the watermark is
//! derived. A failed watermark update never rolls back or fails a payment
//! write that already happened.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::duplicates::{DuplicateDetectionResult, DuplicateDetector, Severity};
use crate::error::{ReconcileError, ReconcileResult};
use crate::periods::{compute_periods, next_billing_date};
use crate::policy::{AdvanceContext, AdvancePolicy, DefaultAdvancePolicy};
use crate::store::{PaymentStore, SubscriptionBillingUpdate};
use subtrack_shared::{NewPaymentRecord, PaymentRecord, PaymentStatus, Subscription};

/// Parameters for recording one payment event
#[derive(Debug, Clone)]
pub struct AddPaymentParams {
    pub subscription_id: Uuid,
    pub payment_date: DateTime<Utc>,
    pub amount: f64,
    pub currency: String,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    /// Skip duplicate detection entirely (post-confirmation force add)
    pub skip_duplicate_check: bool,
}

impl AddPaymentParams {
    fn into_candidate(self) -> NewPaymentRecord {
        NewPaymentRecord {
            subscription_id: self.subscription_id,
            payment_date: self.payment_date,
            amount: self.amount,
            currency: self.currency,
            billing_period_start: self.billing_period_start,
            billing_period_end: self.billing_period_end,
            status: self.status,
            notes: self.notes,
        }
    }
}

/// Result of one add-payment invocation
#[derive(Debug, Clone)]
pub struct AddPaymentOutcome {
    /// The persisted record
    pub record: PaymentRecord,
    /// Detection result, when a check was run
    pub duplicate_check: Option<DuplicateDetectionResult>,
    /// Whether the subscription's last billing date was advanced and written
    pub last_billing_date_updated: bool,
    /// The policy's reason for advancing or holding the watermark
    pub advance_reason: String,
}

/// Result of a historical backfill run
#[derive(Debug, Clone)]
pub struct AutoGenerateOutcome {
    pub records_created: usize,
    pub records: Vec<PaymentRecord>,
    /// Watermark written after the run, if any periods were generated
    pub last_billing_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
    /// False when the final subscription update failed (records are kept)
    pub subscription_updated: bool,
}

/// Orchestrates payment record reconciliation against the external store
///
/// Stateless apart from injected collaborators; all request context comes in
/// as explicit parameters, so the service is safe to share across callers.
pub struct PaymentRecordService {
    store: Arc<dyn PaymentStore>,
    detector: DuplicateDetector,
    policy: Arc<dyn AdvancePolicy>,
}

impl PaymentRecordService {
    /// Service with default detection thresholds and the standard advance
    /// policy
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self {
            store,
            detector: DuplicateDetector::default(),
            policy: Arc::new(DefaultAdvancePolicy),
        }
    }

    pub fn with_collaborators(
        store: Arc<dyn PaymentStore>,
        detector: DuplicateDetector,
        policy: Arc<dyn AdvancePolicy>,
    ) -> Self {
        Self {
            store,
            detector,
            policy,
        }
    }

    /// Record one payment event
    ///
    /// `known_subscriptions` is the caller's already-loaded subscription
    /// list; the service validates against it instead of re-fetching. The
    /// only hard rejection is a high-severity duplicate with force-add
    /// disallowed; anything else persists, and the watermark update that
    /// follows is best-effort.
    pub async fn add_payment_record(
        &self,
        params: AddPaymentParams,
        known_subscriptions: &[Subscription],
    ) -> ReconcileResult<AddPaymentOutcome> {
        let subscription = known_subscriptions
            .iter()
            .find(|s| s.id == params.subscription_id)
            .ok_or(ReconcileError::SubscriptionNotFound(params.subscription_id))?;

        if params.amount <= 0.0 {
            return Err(ReconcileError::InvalidAmount(params.amount));
        }
        if params.billing_period_start > params.billing_period_end {
            return Err(ReconcileError::InvalidPeriod {
                start: params.billing_period_start,
                end: params.billing_period_end,
            });
        }

        let skip_duplicate_check = params.skip_duplicate_check;
        let candidate = params.into_candidate();

        let duplicate_check = if skip_duplicate_check {
            None
        } else {
            let existing = self
                .store
                .list_records_by_subscription(candidate.subscription_id)
                .await?;
            let result = self.detector.detect(&candidate, &existing);
            if result.is_duplicate {
                tracing::info!(
                    subscription_id = %candidate.subscription_id,
                    duplicate_type = ?result.duplicate_type,
                    severity = %result.severity,
                    conflicts = result.conflicting_payments.len(),
                    "duplicate detection flagged candidate payment"
                );
            }
            if result.is_duplicate
                && result.severity == Severity::High
                && !result.allow_force_add
            {
                return Err(ReconcileError::DuplicateBlocked(result));
            }
            Some(result)
        };

        let record = self.store.create_record(candidate).await?;
        tracing::info!(
            record_id = %record.id,
            subscription_id = %record.subscription_id,
            amount = record.amount,
            status = %record.status,
            "payment record created"
        );

        let decision = self.policy.should_advance(&AdvanceContext {
            payment_date: record.payment_date,
            status: record.status,
            period_start: record.billing_period_start,
            period_end: record.billing_period_end,
            current_last_billing_date: subscription.last_billing_date,
            billing_cycle: subscription.billing_cycle,
        });

        let mut last_billing_date_updated = false;
        if decision.advance {
            let update = SubscriptionBillingUpdate {
                last_billing_date: Some(record.billing_period_start),
                next_billing_date: None,
            };
            match self.store.update_subscription(subscription.id, update).await {
                Ok(()) => last_billing_date_updated = true,
                Err(error) => {
                    // The payment already happened; the watermark catches up
                    // on the next successful write.
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        error = %error,
                        "last billing date update failed, payment record kept"
                    );
                }
            }
        }

        Ok(AddPaymentOutcome {
            record,
            duplicate_check,
            last_billing_date_updated,
            advance_reason: decision.reason,
        })
    }

    /// Same flow with the duplicate check forced off
    ///
    /// Used after the user has explicitly confirmed a duplicate warning.
    pub async fn force_add_payment_record(
        &self,
        mut params: AddPaymentParams,
        known_subscriptions: &[Subscription],
    ) -> ReconcileResult<AddPaymentOutcome> {
        params.skip_duplicate_check = true;
        self.add_payment_record(params, known_subscriptions).await
    }

    /// Run duplicate detection for a candidate without writing anything
    ///
    /// Backs pre-submission warnings in the UI.
    pub async fn check_duplicate_payment(
        &self,
        candidate: &NewPaymentRecord,
    ) -> ReconcileResult<DuplicateDetectionResult> {
        let existing = self
            .store
            .list_records_by_subscription(candidate.subscription_id)
            .await?;
        Ok(self.detector.detect(candidate, &existing))
    }

    /// Backfill one successful payment record per elapsed billing period
    ///
    /// Does not run duplicate detection: this path initializes empty
    /// history. Calling it on a subscription that already has records for
    /// some of the elapsed periods will create duplicate success records —
    /// callers own that check.
    pub async fn auto_generate_payment_records(
        &self,
        subscription: &Subscription,
    ) -> ReconcileResult<AutoGenerateOutcome> {
        self.auto_generate_as_of(subscription, Utc::now().date_naive())
            .await
    }

    /// Backfill with an explicit cutoff date
    pub async fn auto_generate_as_of(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> ReconcileResult<AutoGenerateOutcome> {
        if subscription.start_date > today {
            return Err(ReconcileError::FutureStartDate(subscription.start_date));
        }

        let periods = compute_periods(
            subscription.start_date,
            today,
            subscription.billing_cycle,
        );
        if periods.is_empty() {
            return Ok(AutoGenerateOutcome {
                records_created: 0,
                records: Vec::new(),
                last_billing_date: None,
                next_billing_date: None,
                subscription_updated: false,
            });
        }

        let mut records = Vec::with_capacity(periods.len());
        for period in &periods {
            let payment_date = period
                .billing_date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .ok_or_else(|| {
                    ReconcileError::Store("invalid backfill payment timestamp".to_string())
                })?;
            let record = self
                .store
                .create_record(NewPaymentRecord {
                    subscription_id: subscription.id,
                    payment_date,
                    amount: subscription.amount,
                    currency: subscription.currency.clone(),
                    billing_period_start: period.period_start,
                    billing_period_end: period.period_end,
                    status: PaymentStatus::Success,
                    notes: Some("Auto-generated from billing history backfill".to_string()),
                })
                .await?;
            records.push(record);
        }

        let latest_start = periods[periods.len() - 1].period_start;
        let next = next_billing_date(latest_start, subscription.billing_cycle);

        let update = SubscriptionBillingUpdate {
            last_billing_date: Some(latest_start),
            next_billing_date: next,
        };
        let subscription_updated = match self
            .store
            .update_subscription(subscription.id, update)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    error = %error,
                    "billing date update failed after backfill, generated records kept"
                );
                false
            }
        };

        tracing::info!(
            subscription_id = %subscription.id,
            records_created = records.len(),
            last_billing_date = %latest_start,
            "historical payment backfill complete"
        );

        Ok(AutoGenerateOutcome {
            records_created: records.len(),
            records,
            last_billing_date: Some(latest_start),
            next_billing_date: next,
            subscription_updated,
        })
    }
}
