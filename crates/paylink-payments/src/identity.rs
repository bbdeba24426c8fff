//! Identity Recovery
//!
//! Recovers the billing subject from a verified payment by trying each
//! [`IdentitySource`] in order; the first one that yields a valid subject wins.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{PaymentError, Result};
use crate::provider::ProviderPayment;
use crate::subject::{BillingSubject, METADATA_BILLING, METADATA_NAMESPACE};

/// One way of reading a billing subject off a payment
pub trait IdentitySource: Send + Sync {
    /// Source name, for logs
    fn name(&self) -> &'static str;

    /// Extract the subject, or `None` if this source is absent or malformed
    fn extract(&self, payment: &ProviderPayment) -> Option<BillingSubject>;
}

/// Reads `metadata.namespace` and `metadata.billing`
pub struct MetadataIdentity;

impl IdentitySource for MetadataIdentity {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn extract(&self, payment: &ProviderPayment) -> Option<BillingSubject> {
        let namespace = payment.metadata_value(METADATA_NAMESPACE)?;
        let name = payment.metadata_value(METADATA_BILLING)?;
        BillingSubject::new(namespace, name).ok()
    }
}

/// Parses `Payment for <namespace>/<name>` out of the description
pub struct DescriptionIdentity;

impl IdentitySource for DescriptionIdentity {
    fn name(&self) -> &'static str {
        "description"
    }

    fn extract(&self, payment: &ProviderPayment) -> Option<BillingSubject> {
        BillingSubject::from_description(payment.description.as_deref()?)
    }
}

/// Subject plus the source it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveredIdentity {
    pub subject: BillingSubject,
    pub source: &'static str,
}

/// Ordered chain of identity sources
pub struct IdentityRecoverer {
    sources: Vec<Box<dyn IdentitySource>>,
}

impl Default for IdentityRecoverer {
    fn default() -> Self {
        Self::new(vec![Box::new(MetadataIdentity), Box::new(DescriptionIdentity)])
    }
}

impl IdentityRecoverer {
    pub fn new(sources: Vec<Box<dyn IdentitySource>>) -> Self {
        Self { sources }
    }

    pub fn recover(&self, payment: &ProviderPayment) -> Option<RecoveredIdentity> {
        self.sources.iter().find_map(|source| {
            let subject = source.extract(payment);
            if subject.is_none() {
                tracing::debug!(
                    payment_id = %payment.id,
                    source = source.name(),
                    "Identity source yielded nothing"
                );
            }
            subject.map(|subject| RecoveredIdentity {
                subject,
                source: source.name(),
            })
        })
    }
}

/// Parse `amount.value` into the ledger's float quantity; fails closed
pub fn recover_amount(payment: &ProviderPayment) -> Result<f64> {
    let raw = payment.amount.value.trim();
    let amount = Decimal::from_str(raw)
        .map_err(|e| PaymentError::Amount(format!("{raw:?}: {e}")))?;

    if amount <= Decimal::ZERO {
        return Err(PaymentError::Amount(format!("{raw:?} is not positive")));
    }

    amount
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PaymentError::Amount(format!("{raw:?} does not fit a float")))
}
