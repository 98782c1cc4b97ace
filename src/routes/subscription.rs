use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{info, instrument};

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::subscription::{VerifyRequest, VerifyResponse},
    services::DEVELOPER_PAYLOAD,
};

/// POST /api/v1/subscriptions/verify
#[instrument(skip(state, payload))]
pub async fn verify_subscription(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>> {
    // A body that does not parse as JSON (or arrives without a JSON content
    // type) carries neither field; fold it into the missing-field path so the
    // error contract stays JSON.
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let (subscription_id, purchase_token) = match (request.subscription_id, request.purchase_token)
    {
        (Some(id), Some(token)) if !id.is_empty() && !token.is_empty() => (id, token),
        _ => {
            return Err(ApiError::BadRequest(
                "subscriptionId and purchaseToken are required".to_string(),
            ))
        }
    };

    let record = state
        .publisher
        .get_subscription(&subscription_id, &purchase_token)
        .await?;

    // First-time purchases must be acknowledged or the store auto-refunds
    // them after the grace period.
    if record.needs_acknowledgement() {
        state
            .publisher
            .acknowledge_subscription(&subscription_id, &purchase_token, DEVELOPER_PAYLOAD)
            .await?;
        info!(subscription_id, "Acknowledged first-time purchase");
    }

    let now_millis = chrono::Utc::now().timestamp_millis();

    Ok(Json(VerifyResponse {
        is_active: record.is_active_at(now_millis),
        // Historical contract: always true, even when no acknowledgement ran
        // this call.
        acknowledge: true,
        expiry_time: record.expiry_millis(),
        raw: record,
    }))
}
