//! Rancher Settings
//!
//! Reads cluster-scoped `management.cattle.io/v3` settings.

use serde::Deserialize;

use crate::client::KubeClient;
use crate::error::{ClusterError, Result};

/// Setting that holds the dashboard base URL for payment return links
pub const PAYMENT_URL_SETTING: &str = "gorizond-install-payment-url";

const SETTINGS_PATH: &str = "/apis/management.cattle.io/v3/settings";

#[derive(Debug, Deserialize)]
struct Setting {
    #[serde(default)]
    value: Option<String>,

    #[serde(default)]
    default: Option<String>,
}

impl Setting {
    fn effective_value(self) -> Option<String> {
        self.value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.default.filter(|v| !v.trim().is_empty()))
    }
}

/// Fetch a setting's value, falling back to its default when the value is empty
pub async fn fetch_setting(client: &KubeClient, name: &str) -> Result<String> {
    let setting: Setting = client.get(&format!("{SETTINGS_PATH}/{name}")).await?;

    let value = setting
        .effective_value()
        .ok_or_else(|| ClusterError::SettingMissing(name.to_string()))?;

    tracing::info!(setting = %name, value = %value, "Loaded cluster setting");
    Ok(value)
}
