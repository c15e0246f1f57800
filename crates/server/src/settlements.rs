//! Settlement-plan API endpoint.

use api_types::balance::NetBalanceView;
use api_types::settlement::{SavingsView, SettlementPlanResponse, TransferView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub async fn plan(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<SettlementPlanResponse>, ServerError> {
    let plan = state
        .engine
        .settlement_plan(group_id, &user.username)
        .await?;

    let net_balances = plan
        .net_balances
        .iter()
        .map(|net| NetBalanceView {
            user_id: net.user_id.clone(),
            amount_minor: net.amount.cents(),
        })
        .collect();

    let transfers = plan
        .transfers
        .iter()
        .map(|transfer| TransferView {
            from: transfer.from.clone(),
            to: transfer.to.clone(),
            amount_minor: transfer.amount.cents(),
        })
        .collect();

    Ok(Json(SettlementPlanResponse {
        group_id: plan.group_id,
        net_balances,
        transfers,
        original_count: plan.original_count,
        optimized_count: plan.optimized_count,
        savings: SavingsView {
            saved: plan.savings.saved,
            percentage: plan.savings.percentage,
        },
    }))
}
