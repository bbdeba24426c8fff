//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;

use paylink_payments::{PaymentError, PaymentRequest, WebhookOutcome};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(status: StatusCode, error: impl Into<String>, code: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
        .into_response()
}

/// Liveness probe
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Create a payment link and redirect the payer to the provider's checkout
pub async fn create_payment(State(state): State<AppState>, request: Request) -> Response {
    let payload = match read_payment_request(request).await {
        Ok(payload) => payload,
        Err(reason) => {
            tracing::warn!(reason = %reason, "Unreadable payment request");
            return error_response(StatusCode::BAD_REQUEST, "invalid request", "INVALID_REQUEST");
        }
    };

    match state.links.create_link(state.provider.as_ref(), &payload).await {
        Ok(link) => (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, link.confirmation_url)],
        )
            .into_response(),
        Err(PaymentError::InvalidRequest(reason)) => {
            tracing::warn!(reason = %reason, "Rejected payment request");
            error_response(StatusCode::BAD_REQUEST, reason, "INVALID_REQUEST")
        }
        Err(e) => {
            tracing::error!(error = %e, "Payment link error");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.user_message(),
                "PAYMENT_PROVIDER_ERROR",
            )
        }
    }
}

/// JSON or form-encoded body
async fn read_payment_request(request: Request) -> Result<PaymentRequest, String> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        Form::<PaymentRequest>::from_request(request, &())
            .await
            .map(|Form(payload)| payload)
            .map_err(|e| e.body_text())
    } else {
        Json::<PaymentRequest>::from_request(request, &())
            .await
            .map(|Json(payload)| payload)
            .map_err(|e| e.body_text())
    }
}

/// YooKassa notification endpoint
///
/// Processing runs on its own task so a dropped connection cannot cancel
/// verification or the ledger write midway.
pub async fn yookassa_webhook(State(state): State<AppState>, body: Bytes) -> WebhookOutcome {
    let webhooks = state.webhooks.clone();
    let task = tokio::spawn(async move { webhooks.handle_body(&body).await });

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Webhook processing task failed");
            WebhookOutcome::Interrupted {
                reason: e.to_string(),
            }
        }
    };

    tracing::info!(
        outcome = outcome.label(),
        status = outcome.status_code(),
        "Webhook handled"
    );

    outcome
}
