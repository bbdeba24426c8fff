//! Server Configuration

use std::path::PathBuf;

use clap::Parser;
use paylink_cluster::{DEFAULT_TIMEOUT_SECS, PAYMENT_URL_SETTING};
use paylink_payments::DEFAULT_RETURN_PATH;

/// paylink HTTP server
///
/// Provider credentials come from `YOOKASSA_SHOP_ID` and `YOOKASSA_SECRET_KEY`.
#[derive(Parser, Debug, Clone)]
#[command(name = "paylink-server")]
#[command(version)]
#[command(about = "Payment links and YooKassa webhook reconciliation into BillingEvents")]
pub struct Args {
    /// Path to kubeconfig file; in-cluster credentials are used when omitted
    #[arg(long, env = "KUBECONFIG_PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:80")]
    pub bind_addr: String,

    /// Rancher setting holding the dashboard base URL
    #[arg(long, env = "PAYMENT_URL_SETTING", default_value = PAYMENT_URL_SETTING)]
    pub payment_url_setting: String,

    /// Dashboard path the payer returns to after checkout
    #[arg(long, env = "PAYMENT_RETURN_PATH", default_value = DEFAULT_RETURN_PATH)]
    pub return_path: String,

    /// Timeout for cluster API calls, in seconds
    #[arg(long, env = "CLUSTER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub cluster_timeout_secs: u64,
}
