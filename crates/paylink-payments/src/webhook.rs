//! Provider Webhook Handling
//!
//! Reconciles "payment succeeded" notifications into ledger events.
//!
//! ```text
//! Received ──▶ parse ──✗──▶ Rejected (400)
//!                │
//!                ├─ other event ──▶ Ignored (200)
//!                ▼
//!          re-fetch by id ──✗──▶ VerifyFailed (202)
//!                │                (empty id included)
//!                ▼
//!          recover identity/amount ──✗──▶ Unrecoverable (200)
//!                ▼
//!          emit ledger event ──▶ Recorded / LedgerWriteFailed (200)
//! ```
//!
//! The notification body is advisory: only its payment id is used, and every
//! decision is made on the record fetched back from the provider. Delivery of
//! ledger events is at-least-once; repeated notifications for the same payment
//! each produce an event.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::identity::{recover_amount, IdentityRecoverer};
use crate::ledger::{LedgerEmitter, LedgerStore};
use crate::provider::PaymentProvider;

/// Event kind that triggers reconciliation
pub const PAYMENT_SUCCEEDED: &str = "payment.succeeded";

/// Inbound notification envelope
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    pub event: String,

    #[serde(default)]
    pub object: Option<NotificationObject>,
}

/// Payment snapshot inside a notification; only the id is used
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotificationObject {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub status: Option<String>,
}

impl Notification {
    /// Parse a raw body; only non-JSON bodies and a missing `event` are errors
    pub fn parse(body: &[u8]) -> Result<Self> {
        let notification: Self = serde_json::from_slice(body)
            .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        if notification.event.trim().is_empty() {
            return Err(PaymentError::WebhookParse("empty event".into()));
        }

        Ok(notification)
    }

    /// Payment id from the object, trimmed; empty when absent
    pub fn payment_id(&self) -> &str {
        self.object.as_ref().map_or("", |object| object.id.trim())
    }
}

/// Terminal state of one notification
#[derive(Clone, Debug, PartialEq)]
pub enum WebhookOutcome {
    /// Body did not parse; the provider should redeliver
    Rejected { reason: String },

    /// Not a payment-succeeded event
    Ignored { event: String },

    /// Processing task ended before producing an outcome
    Interrupted { reason: String },

    /// Provider lookup failed, found nothing, or the payment is not succeeded
    VerifyFailed { payment_id: String, reason: String },

    /// No identity source yielded a billing subject
    IdentityUnrecoverable { payment_id: String },

    /// Amount could not be turned into a ledger quantity
    AmountUnparseable { payment_id: String, reason: String },

    /// Ledger store rejected the event
    LedgerWriteFailed { payment_id: String, error: String },

    /// Ledger event created
    Recorded { payment_id: String, event_name: String },
}

impl WebhookOutcome {
    /// HTTP status acknowledged to the provider
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Rejected { .. } => 400,
            Self::VerifyFailed { .. } => 202,
            Self::Ignored { .. }
            | Self::Interrupted { .. }
            | Self::IdentityUnrecoverable { .. }
            | Self::AmountUnparseable { .. }
            | Self::LedgerWriteFailed { .. }
            | Self::Recorded { .. } => 200,
        }
    }

    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }

    /// Short label for logs
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Ignored { .. } => "ignored",
            Self::Interrupted { .. } => "interrupted",
            Self::VerifyFailed { .. } => "verify_failed",
            Self::IdentityUnrecoverable { .. } => "identity_unrecoverable",
            Self::AmountUnparseable { .. } => "amount_unparseable",
            Self::LedgerWriteFailed { .. } => "ledger_write_failed",
            Self::Recorded { .. } => "recorded",
        }
    }
}

#[cfg(feature = "axum-handlers")]
impl axum::response::IntoResponse for WebhookOutcome {
    fn into_response(self) -> axum::response::Response {
        axum::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(axum::http::StatusCode::OK)
            .into_response()
    }
}

/// Webhook handler
pub struct WebhookHandler {
    provider: Arc<dyn PaymentProvider>,
    recoverer: IdentityRecoverer,
    emitter: LedgerEmitter,
}

impl WebhookHandler {
    pub fn new(provider: Arc<dyn PaymentProvider>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            provider,
            recoverer: IdentityRecoverer::default(),
            emitter: LedgerEmitter::new(ledger),
        }
    }

    #[must_use]
    pub fn with_recoverer(mut self, recoverer: IdentityRecoverer) -> Self {
        self.recoverer = recoverer;
        self
    }

    /// Parse and process a raw notification body
    pub async fn handle_body(&self, body: &[u8]) -> WebhookOutcome {
        match Notification::parse(body) {
            Ok(notification) => self.handle(notification).await,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected malformed webhook");
                WebhookOutcome::Rejected {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Process a parsed notification
    pub async fn handle(&self, notification: Notification) -> WebhookOutcome {
        let payment_id = notification.payment_id().to_string();
        tracing::info!(
            event_type = %notification.event,
            payment_id = %payment_id,
            provider = self.provider.name(),
            "Processing webhook"
        );

        if notification.event != PAYMENT_SUCCEEDED {
            tracing::debug!(event_type = %notification.event, "Unhandled webhook event");
            return WebhookOutcome::Ignored {
                event: notification.event,
            };
        }

        if payment_id.is_empty() {
            return self.verify_failed(payment_id, "empty payment id".into());
        }

        let payment = match self.provider.find_payment(&payment_id).await {
            Ok(Some(payment)) if payment.is_succeeded() => payment,
            Ok(Some(payment)) => {
                return self.verify_failed(payment_id, format!("status is {}", payment.status));
            }
            Ok(None) => return self.verify_failed(payment_id, "payment not found".into()),
            Err(e) => return self.verify_failed(payment_id, format!("lookup failed: {e}")),
        };

        let Some(identity) = self.recoverer.recover(&payment) else {
            tracing::warn!(payment_id = %payment.id, "No billing subject on verified payment");
            return WebhookOutcome::IdentityUnrecoverable { payment_id };
        };

        let amount = match recover_amount(&payment) {
            Ok(amount) => amount,
            Err(e) => {
                tracing::error!(payment_id = %payment.id, error = %e, "Unusable payment amount");
                return WebhookOutcome::AmountUnparseable {
                    payment_id,
                    reason: e.to_string(),
                };
            }
        };

        tracing::debug!(
            payment_id = %payment.id,
            subject = %identity.subject,
            source = identity.source,
            "Recovered billing subject"
        );

        match self.emitter.emit(&identity.subject, amount, Utc::now()).await {
            Ok(event_name) => WebhookOutcome::Recorded {
                payment_id,
                event_name,
            },
            Err(e) => WebhookOutcome::LedgerWriteFailed {
                payment_id,
                error: e.to_string(),
            },
        }
    }

    fn verify_failed(&self, payment_id: String, reason: String) -> WebhookOutcome {
        tracing::warn!(
            payment_id = %payment_id,
            reason = %reason,
            provider = self.provider.name(),
            "Webhook not confirmed by provider"
        );
        WebhookOutcome::VerifyFailed { payment_id, reason }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::ledger::MemoryLedgerStore;
    use crate::provider::{Amount, MockPaymentProvider, PaymentStatus, ProviderPayment};

    fn payment(id: &str, status: PaymentStatus) -> ProviderPayment {
        let paid = status == PaymentStatus::Succeeded;
        ProviderPayment {
            id: id.into(),
            status,
            amount: Amount { value: "150.00".into(), currency: "RUB".into() },
            description: Some("Payment for acme/team-a".into()),
            metadata: Some(HashMap::from([
                ("namespace".to_string(), "acme".to_string()),
                ("billing".to_string(), "team-a".to_string()),
            ])),
            confirmation: None,
            paid,
            created_at: None,
        }
    }

    fn body(event: &str, id: &str) -> Vec<u8> {
        serde_json::json!({
            "type": "notification",
            "event": event,
            "object": {"id": id, "status": "succeeded", "amount": {"value": "999999.00", "currency": "RUB"}}
        })
        .to_string()
        .into_bytes()
    }

    fn setup(provider: MockPaymentProvider) -> (Arc<MockPaymentProvider>, Arc<MemoryLedgerStore>, WebhookHandler) {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryLedgerStore::new());
        let handler = WebhookHandler::new(provider.clone(), store.clone());
        (provider, store, handler)
    }

    #[tokio::test]
    async fn test_malformed_body_rejected_without_lookup() {
        let (provider, store, handler) = setup(MockPaymentProvider::new());

        let bodies: [&[u8]; 3] = [
            b"not json",
            br#"{"object": {"id": "p1"}}"#,
            br#"{"event": "", "object": {"id": "p1"}}"#,
        ];
        for raw in bodies {
            let outcome = handler.handle_body(raw).await;
            assert!(matches!(outcome, WebhookOutcome::Rejected { .. }));
            assert_eq!(outcome.status_code(), 400);
        }
        assert_eq!(provider.lookup_count(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_other_events_ignored() {
        let (provider, store, handler) =
            setup(MockPaymentProvider::new().with_payment(payment("p1", PaymentStatus::Succeeded)));

        for event in ["payment.waiting_for_capture", "payment.canceled", "refund.succeeded"] {
            let outcome = handler.handle_body(&body(event, "p1")).await;
            assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
            assert_eq!(outcome.status_code(), 200);
        }
        assert_eq!(provider.lookup_count(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_other_events_ignored_without_payment_id() {
        let (provider, store, handler) = setup(MockPaymentProvider::new());

        let bodies: [&[u8]; 3] = [
            br#"{"event": "payment.canceled", "object": {"id": ""}}"#,
            br#"{"event": "refund.succeeded"}"#,
            br#"{"event": "payment.waiting_for_capture", "object": {}}"#,
        ];
        for raw in bodies {
            let outcome = handler.handle_body(raw).await;
            assert!(matches!(outcome, WebhookOutcome::Ignored { .. }), "{outcome:?}");
            assert_eq!(outcome.status_code(), 200);
        }
        assert_eq!(provider.lookup_count(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_succeeded_without_payment_id_accepted_without_event() {
        let (provider, store, handler) = setup(MockPaymentProvider::new());

        let bodies: [&[u8]; 3] = [
            br#"{"event": "payment.succeeded", "object": {"id": ""}}"#,
            br#"{"event": "payment.succeeded", "object": {"id": "   "}}"#,
            br#"{"event": "payment.succeeded"}"#,
        ];
        for raw in bodies {
            let outcome = handler.handle_body(raw).await;
            assert!(matches!(outcome, WebhookOutcome::VerifyFailed { .. }), "{outcome:?}");
            assert_eq!(outcome.status_code(), 202);
        }
        assert_eq!(provider.lookup_count(), 0);
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_interrupted_is_acknowledged() {
        let outcome = WebhookOutcome::Interrupted { reason: "task panicked".into() };
        assert_eq!(outcome.status_code(), 200);
        assert_eq!(outcome.label(), "interrupted");
    }

    #[tokio::test]
    async fn test_unconfirmed_status_accepted_without_event() {
        for status in [PaymentStatus::Pending, PaymentStatus::WaitingForCapture, PaymentStatus::Canceled] {
            let (_, store, handler) =
                setup(MockPaymentProvider::new().with_payment(payment("p1", status)));

            let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
            assert!(matches!(outcome, WebhookOutcome::VerifyFailed { .. }));
            assert_eq!(outcome.status_code(), 202);
            assert!(store.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_unknown_payment_accepted_without_event() {
        let (provider, store, handler) = setup(MockPaymentProvider::new());

        let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "spoofed")).await;
        assert_eq!(outcome.status_code(), 202);
        assert_eq!(provider.lookup_count(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_lookup_failure_accepted_without_event() {
        let (provider, store, handler) =
            setup(MockPaymentProvider::new().with_payment(payment("p1", PaymentStatus::Succeeded)));
        provider.fail_lookups(true);

        let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        assert_eq!(outcome.status_code(), 202);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_verified_payment_recorded_from_provider_record() {
        let (_, store, handler) =
            setup(MockPaymentProvider::new().with_payment(payment("p1", PaymentStatus::Succeeded)));

        let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        assert!(outcome.is_recorded());
        assert_eq!(outcome.status_code(), 200);

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        let event = &events[0].event;
        assert_eq!(event.namespace, "acme");
        assert_eq!(event.billing_name, "team-a");
        assert_eq!(event.event_type, "payment");
        // The notification claimed 999999.00; the provider record wins
        assert!((event.amount - 150.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_description_fallback_recorded() {
        let mut p = payment("p1", PaymentStatus::Succeeded);
        p.metadata = Some(HashMap::new());
        p.description = Some("Payment for acme-corp/team-a".into());
        let (_, store, handler) = setup(MockPaymentProvider::new().with_payment(p));

        let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        assert!(outcome.is_recorded());
        assert_eq!(store.events().await[0].event.namespace, "acme-corp");
    }

    #[tokio::test]
    async fn test_unrecoverable_identity_acknowledged() {
        let mut p = payment("p1", PaymentStatus::Succeeded);
        p.metadata = None;
        p.description = Some("Top-up".into());
        let (_, store, handler) = setup(MockPaymentProvider::new().with_payment(p));

        let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        assert!(matches!(outcome, WebhookOutcome::IdentityUnrecoverable { .. }));
        assert_eq!(outcome.status_code(), 200);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_bad_amount_acknowledged_without_event() {
        let mut p = payment("p1", PaymentStatus::Succeeded);
        p.amount.value = "one hundred".into();
        let (_, store, handler) = setup(MockPaymentProvider::new().with_payment(p));

        let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        assert!(matches!(outcome, WebhookOutcome::AmountUnparseable { .. }));
        assert_eq!(outcome.status_code(), 200);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ledger_failure_still_acknowledged() {
        let (_, store, handler) =
            setup(MockPaymentProvider::new().with_payment(payment("p1", PaymentStatus::Succeeded)));
        store.fail_writes(true);

        let outcome = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        assert!(matches!(outcome, WebhookOutcome::LedgerWriteFailed { .. }));
        assert_eq!(outcome.status_code(), 200);
    }

    #[tokio::test]
    async fn test_duplicate_notifications_are_not_deduplicated() {
        let (_, store, handler) =
            setup(MockPaymentProvider::new().with_payment(payment("p1", PaymentStatus::Succeeded)));

        let first = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        let second = handler.handle_body(&body(PAYMENT_SUCCEEDED, "p1")).await;
        assert!(first.is_recorded());
        assert!(second.is_recorded());

        // At-least-once: each delivery creates its own event
        let events = store.events().await;
        assert_eq!(events.len(), 2);
        assert_ne!(events[0].name, events[1].name);
    }
}
