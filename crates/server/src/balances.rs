//! Balance API endpoints.

use api_types::balance::{BalanceView, GroupBalancesResponse, NetBalanceView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use engine::net_balances;

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupBalancesResponse>, ServerError> {
    let balances = state
        .engine
        .balances_for_group(group_id, &user.username)
        .await?;

    let net_balances = net_balances(&balances)
        .into_iter()
        .map(|net| NetBalanceView {
            user_id: net.user_id,
            amount_minor: net.amount.cents(),
        })
        .collect();

    let balances = balances
        .into_iter()
        .map(|balance| BalanceView {
            from_user: balance.from_user,
            to_user: balance.to_user,
            amount_minor: balance.amount_minor,
            updated_at: balance.updated_at,
        })
        .collect();

    Ok(Json(GroupBalancesResponse {
        balances,
        net_balances,
    }))
}

pub async fn recalculate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .recalculate_balances(group_id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
