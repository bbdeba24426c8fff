//! Application State

use std::sync::Arc;

use paylink_payments::{LedgerStore, LinkEncoder, PaymentProvider, WebhookHandler};

/// Shared application state, immutable after startup
#[derive(Clone)]
pub struct AppState {
    /// Payment provider (YooKassa)
    pub provider: Arc<dyn PaymentProvider>,

    /// Link encoder holding the dashboard return URL
    pub links: Arc<LinkEncoder>,

    /// Webhook reconciliation pipeline
    pub webhooks: Arc<WebhookHandler>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        links: LinkEncoder,
        ledger: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            webhooks: Arc::new(WebhookHandler::new(provider.clone(), ledger)),
            links: Arc::new(links),
            provider,
        }
    }
}
