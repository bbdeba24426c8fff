//! Payment Provider Integration
//!
//! The provider owns payment state. The bridge creates payments through it and
//! reads them back by id; it never trusts a pushed snapshot for state changes.

mod mock;
mod yookassa;

pub use mock::MockPaymentProvider;
pub use yookassa::{YooKassaClient, YooKassaConfig};

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Payment provider trait (Strategy pattern)
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment and return the provider's record of it
    async fn create_payment(&self, request: &CreatePayment) -> Result<ProviderPayment>;

    /// Look up the authoritative record for a payment.
    ///
    /// Returns `Ok(None)` when the provider has no payment with this id.
    async fn find_payment(&self, payment_id: &str) -> Result<Option<ProviderPayment>>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Payment lifecycle status as reported by the provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::WaitingForCapture => "waiting_for_capture",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monetary amount as the provider encodes it (decimal string + ISO currency)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

/// Confirmation details returned with a payment
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

/// The provider's record of a payment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayment {
    pub id: String,

    pub status: PaymentStatus,

    pub amount: Amount,

    #[serde(default)]
    pub description: Option<String>,

    /// Opaque key/value side channel attached at creation time
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,

    #[serde(default)]
    pub confirmation: Option<Confirmation>,

    #[serde(default)]
    pub paid: bool,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProviderPayment {
    /// Non-empty metadata value for `key`
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Checkout URL the payer is redirected to
    pub fn confirmation_url(&self) -> Option<&str> {
        self.confirmation
            .as_ref()
            .and_then(|c| c.confirmation_url.as_deref())
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }
}

/// Payment method requested at creation time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodData {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Payment creation request sent to the provider
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatePayment {
    pub amount: Amount,

    /// Capture immediately so the payment can reach `succeeded`
    pub capture: bool,

    pub payment_method_data: PaymentMethodData,

    pub confirmation: Confirmation,

    pub description: String,

    pub metadata: HashMap<String, String>,
}
