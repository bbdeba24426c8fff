//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Caller supplied missing or malformed fields
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider rejected the call or returned something unusable
    #[error("Provider error: {0}")]
    Provider(String),

    /// Transport failure talking to the provider
    #[error("Provider HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Notification body could not be parsed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Payment amount could not be turned into a ledger quantity
    #[error("Amount error: {0}")]
    Amount(String),

    /// Ledger store rejected a write
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Http(_) | Self::Ledger(_))
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid request",
            Self::Provider(_) | Self::Http(_) => "Payment processing failed. Please try again.",
            Self::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
