//! Payment Link Creation
//!
//! Turns a client's `(namespace, name, amount)` into a provider payment and
//! hands back the provider's checkout URL. The subject identity is carried in
//! metadata and in the description; the return URL stays identity-free.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::provider::{
    Amount, Confirmation, CreatePayment, PaymentMethodData, PaymentProvider,
};
use crate::subject::{BillingSubject, METADATA_BILLING, METADATA_NAMESPACE};

/// Currency all links are issued in
pub const CURRENCY: &str = "RUB";

/// Dashboard page the payer returns to after checkout
pub const DEFAULT_RETURN_PATH: &str = "/dashboard/c/_/gorizond/provisioning.gorizond.io.billing";

const PAYMENT_METHOD: &str = "bank_card";
const CONFIRMATION_REDIRECT: &str = "redirect";
const MAX_DESCRIPTION_LEN: usize = 128;
const MAX_AMOUNT_SCALE: u32 = 2;

/// Client request for a payment link
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub name: String,

    /// Decimal string, e.g. `"150.00"`
    #[serde(default)]
    pub amount: String,
}

impl PaymentRequest {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("namespace", &self.namespace),
            ("name", &self.name),
            ("amount", &self.amount),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// Result of creating a payment link
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentLink {
    /// Provider payment ID
    pub payment_id: String,

    /// URL to redirect the payer to
    pub confirmation_url: String,
}

/// Builds provider payment requests for billing subjects
#[derive(Clone, Debug)]
pub struct LinkEncoder {
    return_url: String,
}

impl LinkEncoder {
    /// Create an encoder returning payers to the default billing page under `dashboard_url`
    pub fn new(dashboard_url: &str) -> Self {
        Self::with_return_path(dashboard_url, DEFAULT_RETURN_PATH)
    }

    pub fn with_return_path(dashboard_url: &str, return_path: &str) -> Self {
        Self {
            return_url: format!("{}{}", dashboard_url.trim_end_matches('/'), return_path),
        }
    }

    pub fn return_url(&self) -> &str {
        &self.return_url
    }

    /// Validate a request and build the provider call for it
    pub fn encode(&self, request: &PaymentRequest) -> Result<CreatePayment> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(PaymentError::InvalidRequest(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }

        let subject = BillingSubject::new(request.namespace.trim(), request.name.trim())?;
        let amount = parse_link_amount(&request.amount)?;

        let description = subject.description();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(PaymentError::InvalidRequest(format!(
                "namespace and name are too long for the payment description ({MAX_DESCRIPTION_LEN} chars max)"
            )));
        }

        let metadata = HashMap::from([
            (METADATA_NAMESPACE.to_string(), subject.namespace.clone()),
            (METADATA_BILLING.to_string(), subject.name.clone()),
        ]);

        Ok(CreatePayment {
            amount: Amount {
                value: format!("{amount:.2}"),
                currency: CURRENCY.into(),
            },
            capture: true,
            payment_method_data: PaymentMethodData {
                kind: PAYMENT_METHOD.into(),
            },
            confirmation: Confirmation {
                kind: CONFIRMATION_REDIRECT.into(),
                confirmation_url: None,
                return_url: Some(self.return_url.clone()),
            },
            description,
            metadata,
        })
    }

    /// Create the payment with the provider and return its checkout URL
    pub async fn create_link(
        &self,
        provider: &dyn PaymentProvider,
        request: &PaymentRequest,
    ) -> Result<PaymentLink> {
        let create = self.encode(request)?;

        let payment = provider.create_payment(&create).await?;

        let confirmation_url = payment
            .confirmation_url()
            .ok_or_else(|| PaymentError::Provider("No confirmation URL returned".into()))?
            .to_string();

        tracing::info!(
            payment_id = %payment.id,
            namespace = %request.namespace,
            billing = %request.name,
            amount = %create.amount.value,
            "Created payment link"
        );

        Ok(PaymentLink {
            payment_id: payment.id,
            confirmation_url,
        })
    }
}

fn parse_link_amount(value: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(value.trim())
        .map_err(|e| PaymentError::InvalidRequest(format!("amount {value:?}: {e}")))?;

    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidRequest(format!(
            "amount {value:?} must be positive"
        )));
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(PaymentError::InvalidRequest(format!(
            "amount {value:?} has more than {MAX_AMOUNT_SCALE} decimal places"
        )));
    }

    Ok(amount)
}
