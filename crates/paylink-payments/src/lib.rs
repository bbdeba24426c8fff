//! # paylink-payments
//!
//! Payment links and payment-confirmation reconciliation for paylink.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐  POST /payment   ┌────────────┐  create payment  ┌──────────┐
//! │  Client  │─────────────────▶│ LinkEncoder│─────────────────▶│ Provider │
//! └──────────┘◀──── 301 ────────└────────────┘                  └────┬─────┘
//!                                                                    │ webhook
//! ┌──────────────┐   create   ┌───────────────┐  find payment   ┌────▼─────┐
//! │ LedgerStore  │◀───────────│ WebhookHandler│────────────────▶│ Provider │
//! └──────────────┘            └───────────────┘                 └──────────┘
//! ```
//!
//! The subject identity rides along in payment metadata and, as a fallback,
//! in the description `Payment for <namespace>/<name>`. A webhook is acted on
//! only after the provider's own record confirms the payment succeeded.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use paylink_payments::{LinkEncoder, MemoryLedgerStore, PaymentRequest, WebhookHandler, YooKassaClient};
//!
//! let provider = Arc::new(YooKassaClient::from_env()?);
//! let encoder = LinkEncoder::new("https://rancher.example.com");
//!
//! let link = encoder.create_link(provider.as_ref(), &PaymentRequest {
//!     namespace: "acme".into(),
//!     name: "team-a".into(),
//!     amount: "150.00".into(),
//! }).await?;
//! // Redirect the payer to: link.confirmation_url
//!
//! let handler = WebhookHandler::new(provider, Arc::new(MemoryLedgerStore::new()));
//! let outcome = handler.handle_body(&body).await;
//! // Acknowledge with: outcome.status_code()
//! ```

mod error;
mod identity;
mod ledger;
mod link;
mod provider;
mod subject;
mod webhook;

pub use error::{PaymentError, Result};
pub use identity::{
    recover_amount, DescriptionIdentity, IdentityRecoverer, IdentitySource, MetadataIdentity,
    RecoveredIdentity,
};
pub use ledger::{
    BillingEvent, LedgerEmitter, LedgerStore, MemoryLedgerStore, StoredEvent, EVENT_NAME_PREFIX,
    EVENT_TYPE_PAYMENT,
};
pub use link::{LinkEncoder, PaymentLink, PaymentRequest, CURRENCY, DEFAULT_RETURN_PATH};
pub use provider::{
    Amount, Confirmation, CreatePayment, MockPaymentProvider, PaymentMethodData, PaymentProvider,
    PaymentStatus, ProviderPayment, YooKassaClient, YooKassaConfig,
};
pub use subject::{is_dns_label, is_dns_subdomain, BillingSubject};
pub use webhook::{Notification, NotificationObject, WebhookHandler, WebhookOutcome, PAYMENT_SUCCEEDED};
