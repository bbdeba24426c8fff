//! # paylink-cluster
//!
//! Kubernetes access for paylink.
//!
//! - [`ClusterCredentials`]: kubeconfig or in-cluster service account
//! - [`KubeClient`]: minimal JSON client for the API server
//! - [`fetch_setting`]: Rancher `Setting` lookup, used once at startup
//! - [`ClusterLedgerStore`]: `BillingEvent` creation behind [`paylink_payments::LedgerStore`]

mod client;
mod credentials;
mod error;
mod ledger;
mod settings;

pub use client::{KubeClient, DEFAULT_TIMEOUT_SECS};
pub use credentials::ClusterCredentials;
pub use error::{ClusterError, Result};
pub use ledger::{BillingEventObject, BillingEventStatus, ClusterLedgerStore, ObjectMeta};
pub use settings::{fetch_setting, PAYMENT_URL_SETTING};
