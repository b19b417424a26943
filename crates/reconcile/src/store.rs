//! Persistence collaborator interface
//!
//! The engine never talks to a database directly; it goes through this trait
//! so the hosted store, a local cache, or a test double can all sit behind
//! the same seam. Retry and timeout policy belong to the implementation's
//! transport, not to the engine.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{ReconcileError, ReconcileResult};
use subtrack_shared::{NewPaymentRecord, PaymentRecord, Subscription};

/// Billing-date fields to write back to a subscription
///
/// `None` leaves the field unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionBillingUpdate {
    pub last_billing_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a new payment record, returning it with store-assigned
    /// id and creation timestamp
    async fn create_record(&self, record: NewPaymentRecord) -> ReconcileResult<PaymentRecord>;

    /// All payment records for one subscription, in insertion order
    async fn list_records_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> ReconcileResult<Vec<PaymentRecord>>;

    /// Update a subscription's billing-date fields
    async fn update_subscription(
        &self,
        subscription_id: Uuid,
        update: SubscriptionBillingUpdate,
    ) -> ReconcileResult<()>;
}

/// In-memory store for tests and local development
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<PaymentRecord>>,
    subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subscription(&self, subscription: Subscription) -> ReconcileResult<()> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|_| ReconcileError::Store("subscription lock poisoned".to_string()))?;
        subscriptions.insert(subscription.id, subscription);
        Ok(())
    }

    pub fn subscription(&self, id: Uuid) -> ReconcileResult<Option<Subscription>> {
        let subscriptions = self
            .subscriptions
            .lock()
            .map_err(|_| ReconcileError::Store("subscription lock poisoned".to_string()))?;
        Ok(subscriptions.get(&id).cloned())
    }

    pub fn record_count(&self) -> ReconcileResult<usize> {
        let records = self
            .records
            .lock()
            .map_err(|_| ReconcileError::Store("record lock poisoned".to_string()))?;
        Ok(records.len())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn create_record(&self, record: NewPaymentRecord) -> ReconcileResult<PaymentRecord> {
        let persisted = PaymentRecord {
            id: Uuid::new_v4(),
            subscription_id: record.subscription_id,
            payment_date: record.payment_date,
            amount: record.amount,
            currency: record.currency,
            billing_period_start: record.billing_period_start,
            billing_period_end: record.billing_period_end,
            status: record.status,
            notes: record.notes,
            created_at: Utc::now(),
        };
        let mut records = self
            .records
            .lock()
            .map_err(|_| ReconcileError::Store("record lock poisoned".to_string()))?;
        records.push(persisted.clone());
        Ok(persisted)
    }

    async fn list_records_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> ReconcileResult<Vec<PaymentRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| ReconcileError::Store("record lock poisoned".to_string()))?;
        Ok(records
            .iter()
            .filter(|r| r.subscription_id == subscription_id)
            .cloned()
            .collect())
    }

    async fn update_subscription(
        &self,
        subscription_id: Uuid,
        update: SubscriptionBillingUpdate,
    ) -> ReconcileResult<()> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|_| ReconcileError::Store("subscription lock poisoned".to_string()))?;
        let subscription = subscriptions
            .get_mut(&subscription_id)
            .ok_or(ReconcileError::SubscriptionNotFound(subscription_id))?;
        if let Some(last) = update.last_billing_date {
            subscription.last_billing_date = Some(last);
        }
        if let Some(next) = update.next_billing_date {
            subscription.next_billing_date = Some(next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use subtrack_shared::{BillingCycle, PaymentStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn subscription() -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            name: "Streaming".to_string(),
            billing_cycle: BillingCycle::Monthly,
            start_date: date(2024, 1, 1),
            amount: 9.99,
            currency: "USD".to_string(),
            last_billing_date: None,
            next_billing_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_lists_by_subscription() {
        let store = InMemoryStore::new();
        let sub = subscription();
        let other = Uuid::new_v4();

        let record = store
            .create_record(NewPaymentRecord {
                subscription_id: sub.id,
                payment_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                amount: 9.99,
                currency: "USD".to_string(),
                billing_period_start: date(2024, 1, 1),
                billing_period_end: date(2024, 1, 31),
                status: PaymentStatus::Success,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(record.subscription_id, sub.id);

        let listed = store.list_records_by_subscription(sub.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store
            .list_records_by_subscription(other)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_subscription_partial_fields() {
        let store = InMemoryStore::new();
        let sub = subscription();
        let id = sub.id;
        store.insert_subscription(sub).unwrap();

        store
            .update_subscription(
                id,
                SubscriptionBillingUpdate {
                    last_billing_date: Some(date(2024, 4, 1)),
                    next_billing_date: None,
                },
            )
            .await
            .unwrap();

        let updated = store.subscription(id).unwrap().unwrap();
        assert_eq!(updated.last_billing_date, Some(date(2024, 4, 1)));
        assert_eq!(updated.next_billing_date, None);
    }

    #[tokio::test]
    async fn test_update_unknown_subscription_errors() {
        let store = InMemoryStore::new();
        let result = store
            .update_subscription(Uuid::new_v4(), SubscriptionBillingUpdate::default())
            .await;
        assert!(matches!(result, Err(ReconcileError::SubscriptionNotFound(_))));
    }
}
