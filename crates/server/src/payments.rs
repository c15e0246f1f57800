//! Payment API endpoints.

use api_types::payment::{
    PaymentCreated, PaymentListResponse, PaymentMethod as ApiMethod, PaymentNew, PaymentView,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use engine::{PaymentMethod, RecordPaymentCmd};

fn map_method(method: ApiMethod) -> PaymentMethod {
    match method {
        ApiMethod::Upi => PaymentMethod::Upi,
        ApiMethod::Cash => PaymentMethod::Cash,
        ApiMethod::Bank => PaymentMethod::Bank,
        ApiMethod::Other => PaymentMethod::Other,
    }
}

fn map_method_back(method: PaymentMethod) -> ApiMethod {
    match method {
        PaymentMethod::Upi => ApiMethod::Upi,
        PaymentMethod::Cash => ApiMethod::Cash,
        PaymentMethod::Bank => ApiMethod::Bank,
        PaymentMethod::Other => ApiMethod::Other,
    }
}

pub(crate) fn build_record_cmd(payload: PaymentNew, username: &str) -> RecordPaymentCmd {
    RecordPaymentCmd {
        group_id: payload.group_id,
        from_user: payload.from_user,
        to_user: payload.to_user,
        amount_minor: payload.amount_minor,
        method: map_method(payload.method),
        note: payload.note,
        user_id: username.to_string(),
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PaymentNew>,
) -> Result<(StatusCode, Json<PaymentCreated>), ServerError> {
    let cmd = build_record_cmd(payload, &user.username);
    let id = state.engine.record_payment(cmd).await?;
    Ok((StatusCode::CREATED, Json(PaymentCreated { id })))
}

#[derive(Deserialize)]
pub struct PaymentListParams {
    pub group_id: Uuid,
    pub limit: Option<u64>,
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<PaymentListResponse>, ServerError> {
    let limit = params.limit.unwrap_or(50);
    let payments = state
        .engine
        .list_payments(params.group_id, &user.username, limit)
        .await?;

    let payments = payments
        .into_iter()
        .map(|payment| PaymentView {
            id: payment.id,
            group_id: payment.group_id,
            from_user: payment.from_user,
            to_user: payment.to_user,
            amount_minor: payment.amount_minor,
            method: map_method_back(payment.method),
            note: payment.note,
            created_at: payment.created_at,
        })
        .collect();

    Ok(Json(PaymentListResponse { payments }))
}
