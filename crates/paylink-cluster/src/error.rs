//! Cluster Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Cluster access errors
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Kubeconfig could not be read or resolved
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),

    /// In-cluster service account is unavailable
    #[error("In-cluster config error: {0}")]
    InCluster(String),

    /// API server answered with a non-success status
    #[error("Kubernetes API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure talking to the API server
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Setting exists but carries no usable value
    #[error("Setting {0} has no value")]
    SettingMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl ClusterError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
