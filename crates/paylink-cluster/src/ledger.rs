//! BillingEvent Storage
//!
//! Stores ledger events as `provisioning.gorizond.io/v1` `BillingEvent`
//! objects in the billed subject's namespace.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use paylink_payments::{BillingEvent, LedgerStore, PaymentError};
use serde::{Deserialize, Serialize};

use crate::client::KubeClient;

pub const API_GROUP: &str = "provisioning.gorizond.io";
pub const API_VERSION: &str = "v1";
pub const KIND: &str = "BillingEvent";
const RESOURCE: &str = "billingevents";

/// Wire shape of a `BillingEvent` object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEventObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: Option<BillingEventStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEventStatus {
    #[serde(rename = "type")]
    pub event_type: String,
    pub transition_time: String,
    pub amount: f64,
    pub billing_name: String,
}

impl From<&BillingEvent> for BillingEventObject {
    fn from(event: &BillingEvent) -> Self {
        Self {
            api_version: format!("{API_GROUP}/{API_VERSION}"),
            kind: KIND.into(),
            metadata: ObjectMeta {
                name: None,
                generate_name: Some(event.generate_name.clone()),
                namespace: Some(event.namespace.clone()),
            },
            status: Some(BillingEventStatus {
                event_type: event.event_type.clone(),
                transition_time: rfc3339(event.transition_time),
                amount: event.amount,
                billing_name: event.billing_name.clone(),
            }),
        }
    }
}

/// Kubernetes timestamps carry whole seconds
fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Ledger store backed by `BillingEvent` objects
pub struct ClusterLedgerStore {
    client: KubeClient,
}

impl ClusterLedgerStore {
    pub const fn new(client: KubeClient) -> Self {
        Self { client }
    }

    fn collection_path(namespace: &str) -> String {
        format!("/apis/{API_GROUP}/{API_VERSION}/namespaces/{namespace}/{RESOURCE}")
    }
}

#[async_trait]
impl LedgerStore for ClusterLedgerStore {
    async fn create(&self, event: &BillingEvent) -> paylink_payments::Result<String> {
        let body = BillingEventObject::from(event);

        let created: BillingEventObject = self
            .client
            .create(&Self::collection_path(&event.namespace), &body)
            .await
            .map_err(|e| {
                tracing::warn!(
                    namespace = %event.namespace,
                    retryable = e.is_retryable(),
                    error = %e,
                    "BillingEvent create rejected"
                );
                PaymentError::Ledger(e.to_string())
            })?;

        created
            .metadata
            .name
            .ok_or_else(|| PaymentError::Ledger("created BillingEvent has no name".into()))
    }
}
