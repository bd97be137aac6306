//! Payment creation and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::PaymentId;
use domain::{Payment, PaymentRequest};
use saga::PaymentCreator;
use serde::Serialize;
use store::{PaymentEvent, PaymentStore};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub creator: Arc<dyn PaymentCreator>,
    pub store: Arc<dyn PaymentStore>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub idempotency_key: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            idempotency_key: payment.idempotency_key,
            user_id: payment.user_id,
            amount_cents: payment.amount_cents.cents(),
            currency: payment.currency.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            gateway_ref: payment.gateway_ref,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct EventResponse {
    pub id: String,
    pub sequence: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEvent> for EventResponse {
    fn from(event: PaymentEvent) -> Self {
        Self {
            id: event.id.to_string(),
            sequence: event.sequence.as_i64(),
            event_type: event.event_type,
            payload: event.payload,
            created_at: event.created_at,
        }
    }
}

// -- Handlers --

/// POST /payments — create a payment and reserve funds.
///
/// The caller supplies the idempotency key in the `Idempotency-Key`
/// header; retrying with the same key returns the already-created
/// payment instead of charging twice.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Idempotency-Key header is required".to_string()))?;

    let payment = state.creator.create(idempotency_key, &req).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

/// GET /payments/{id} — current state of a payment.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment_id = parse_payment_id(&id)?;
    let payment = state.store.get_by_id(payment_id).await?;
    Ok(Json(payment.into()))
}

/// GET /payments/{id}/events — the payment's event history.
pub async fn events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let payment_id = parse_payment_id(&id)?;
    // Distinguish "no such payment" from "payment with no events yet".
    state.store.get_by_id(payment_id).await?;
    let events = state.store.get_events_by_payment_id(payment_id).await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

fn parse_payment_id(id: &str) -> Result<PaymentId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(PaymentId::from_uuid)
        .map_err(|err| ApiError::BadRequest(format!("invalid payment id: {err}")))
}
