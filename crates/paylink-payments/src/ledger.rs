//! Ledger Events
//!
//! A [`BillingEvent`] is the durable record of one confirmed payment. Events are
//! append-only: the store assigns the final name from a prefix, so two writes
//! for the same payment produce two distinct events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{PaymentError, Result};
use crate::subject::BillingSubject;

/// Name prefix for generated event names
pub const EVENT_NAME_PREFIX: &str = "payment-";

/// Event type recorded for confirmed payments
pub const EVENT_TYPE_PAYMENT: &str = "payment";

/// A ledger entry to be created in the subject's namespace
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingEvent {
    /// Prefix the store extends into a unique name
    pub generate_name: String,

    /// Namespace of the billed subject
    pub namespace: String,

    pub event_type: String,

    pub transition_time: DateTime<Utc>,

    pub amount: f64,

    /// Name of the billed subject
    pub billing_name: String,
}

impl BillingEvent {
    /// Payment event for `subject`
    pub fn payment(subject: &BillingSubject, amount: f64, at: DateTime<Utc>) -> Self {
        Self {
            generate_name: EVENT_NAME_PREFIX.into(),
            namespace: subject.namespace.clone(),
            event_type: EVENT_TYPE_PAYMENT.into(),
            transition_time: at,
            amount,
            billing_name: subject.name.clone(),
        }
    }
}

/// Ledger storage trait
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create an event; returns the name the store assigned
    async fn create(&self, event: &BillingEvent) -> Result<String>;
}

/// Stored event with its assigned name
#[derive(Clone, Debug, PartialEq)]
pub struct StoredEvent {
    pub name: String,
    pub event: BillingEvent,
}

/// In-memory ledger store (for development and tests)
#[derive(Default)]
pub struct MemoryLedgerStore {
    events: RwLock<Vec<StoredEvent>>,
    fail_writes: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<StoredEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn create(&self, event: &BillingEvent) -> Result<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PaymentError::Ledger("memory store rejected write".into()));
        }

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}{}", event.generate_name, &suffix[..5]);

        self.events.write().await.push(StoredEvent {
            name: name.clone(),
            event: event.clone(),
        });

        Ok(name)
    }
}

/// Submits payment events to a [`LedgerStore`]
#[derive(Clone)]
pub struct LedgerEmitter {
    store: Arc<dyn LedgerStore>,
}

impl LedgerEmitter {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Record a confirmed payment; a failed write is logged and returned, never retried
    pub async fn emit(
        &self,
        subject: &BillingSubject,
        amount: f64,
        at: DateTime<Utc>,
    ) -> Result<String> {
        let event = BillingEvent::payment(subject, amount, at);

        match self.store.create(&event).await {
            Ok(name) => {
                tracing::info!(
                    event = %name,
                    namespace = %subject.namespace,
                    billing = %subject.name,
                    amount,
                    "Recorded billing event"
                );
                Ok(name)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    namespace = %subject.namespace,
                    billing = %subject.name,
                    amount,
                    "Failed to record billing event"
                );
                Err(e)
            }
        }
    }
}
