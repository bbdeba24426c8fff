//! Mock Payment Provider
//!
//! In-memory provider for tests and local runs without provider credentials.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};

use super::{Confirmation, CreatePayment, PaymentProvider, PaymentStatus, ProviderPayment};
use crate::error::{PaymentError, Result};

/// Mock provider that keeps payments in memory
#[derive(Default)]
pub struct MockPaymentProvider {
    payments: Mutex<HashMap<String, ProviderPayment>>,
    created: Mutex<Vec<CreatePayment>>,
    lookups: AtomicUsize,
    fail_creates: AtomicBool,
    fail_lookups: AtomicBool,
    lookup_gate: Option<Arc<Notify>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a payment record
    #[must_use]
    pub fn with_payment(mut self, payment: ProviderPayment) -> Self {
        self.payments
            .get_mut()
            .insert(payment.id.clone(), payment);
        self
    }

    /// Hold every `find_payment` call until the gate is notified
    #[must_use]
    pub fn with_lookup_gate(mut self, gate: Arc<Notify>) -> Self {
        self.lookup_gate = Some(gate);
        self
    }

    /// Make every `create_payment` call fail
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make every `find_payment` call fail
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Move a stored payment to a new status
    pub async fn set_status(&self, payment_id: &str, status: PaymentStatus) {
        if let Some(payment) = self.payments.lock().await.get_mut(payment_id) {
            payment.paid = status == PaymentStatus::Succeeded;
            payment.status = status;
        }
    }

    /// Creation requests received so far
    pub async fn created_requests(&self) -> Vec<CreatePayment> {
        self.created.lock().await.clone()
    }

    /// Number of `find_payment` calls made
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment(&self, request: &CreatePayment) -> Result<ProviderPayment> {
        self.created.lock().await.push(request.clone());

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(PaymentError::Provider("mock provider rejected payment".into()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let payment = ProviderPayment {
            id: id.clone(),
            status: PaymentStatus::Pending,
            amount: request.amount.clone(),
            description: Some(request.description.clone()),
            metadata: Some(request.metadata.clone()),
            confirmation: Some(Confirmation {
                kind: request.confirmation.kind.clone(),
                confirmation_url: Some(format!("https://checkout.mock/payments?orderId={id}")),
                return_url: request.confirmation.return_url.clone(),
            }),
            paid: false,
            created_at: Some(Utc::now()),
        };

        self.payments.lock().await.insert(id, payment.clone());
        Ok(payment)
    }

    async fn find_payment(&self, payment_id: &str) -> Result<Option<ProviderPayment>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.lookup_gate {
            gate.notified().await;
        }

        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(PaymentError::Provider("mock provider unavailable".into()));
        }

        Ok(self.payments.lock().await.get(payment_id).cloned())
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
