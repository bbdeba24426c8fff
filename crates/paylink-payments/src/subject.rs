//! Billing Subjects
//!
//! A billing subject is the namespaced cluster object a payment is credited to.
//! Its identity travels through the provider twice: in payment metadata and in
//! the free-text description `Payment for <namespace>/<name>`.

use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// Metadata key carrying the subject namespace
pub const METADATA_NAMESPACE: &str = "namespace";

/// Metadata key carrying the subject name
pub const METADATA_BILLING: &str = "billing";

/// Fixed prefix of the description grammar
pub const DESCRIPTION_PREFIX: &str = "Payment for ";

const MAX_LABEL_LEN: usize = 63;
const MAX_SUBDOMAIN_LEN: usize = 253;

/// Namespaced billing subject
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingSubject {
    pub namespace: String,
    pub name: String,
}

impl BillingSubject {
    /// Validate and build a subject
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let name = name.into();

        if !is_dns_label(&namespace) {
            return Err(PaymentError::InvalidRequest(format!(
                "namespace {namespace:?} is not a valid DNS label"
            )));
        }
        if !is_dns_subdomain(&name) {
            return Err(PaymentError::InvalidRequest(format!(
                "name {name:?} is not a valid object name"
            )));
        }

        Ok(Self { namespace, name })
    }

    /// Human-readable description carrying the identity
    pub fn description(&self) -> String {
        format!("{DESCRIPTION_PREFIX}{}/{}", self.namespace, self.name)
    }

    /// Parse a description produced by [`BillingSubject::description`].
    ///
    /// The namespace ends at the first `/`; everything after it is the name.
    pub fn from_description(description: &str) -> Option<Self> {
        let rest = description.trim().strip_prefix(DESCRIPTION_PREFIX)?;
        let (namespace, name) = rest.split_once('/')?;
        Self::new(namespace.trim(), name.trim()).ok()
    }
}

impl std::fmt::Display for BillingSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// RFC 1123 label: namespaces
pub fn is_dns_label(value: &str) -> bool {
    value.len() <= MAX_LABEL_LEN && has_valid_shape(value, |c| c == '-')
}

/// RFC 1123 subdomain: object names
pub fn is_dns_subdomain(value: &str) -> bool {
    value.len() <= MAX_SUBDOMAIN_LEN && has_valid_shape(value, |c| c == '-' || c == '.')
}

fn has_valid_shape(value: &str, allowed_inner: impl Fn(char) -> bool) -> bool {
    let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    match (value.chars().next(), value.chars().last()) {
        (Some(first), Some(last)) if is_alnum(first) && is_alnum(last) => {
            value.chars().all(|c| is_alnum(c) || allowed_inner(c))
        }
        _ => false,
    }
}
