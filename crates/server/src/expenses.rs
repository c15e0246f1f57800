//! Expense API endpoints.

use api_types::expense::{
    ExpenseCreated, ExpenseListResponse, ExpenseNew, ExpenseUpdate, ExpenseView,
    SplitKind as ApiSplitKind,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use engine::{CreateExpenseCmd, SplitInput, SplitKind, UpdateExpenseCmd};

fn map_split_kind(kind: ApiSplitKind) -> SplitKind {
    match kind {
        ApiSplitKind::Equal => SplitKind::Equal,
        ApiSplitKind::Custom => SplitKind::Custom,
        ApiSplitKind::Percentage => SplitKind::Percentage,
    }
}

fn map_split_kind_back(kind: SplitKind) -> ApiSplitKind {
    match kind {
        SplitKind::Equal => ApiSplitKind::Equal,
        SplitKind::Custom => ApiSplitKind::Custom,
        SplitKind::Percentage => ApiSplitKind::Percentage,
    }
}

pub(crate) fn build_create_cmd(payload: ExpenseNew, username: &str) -> CreateExpenseCmd {
    CreateExpenseCmd {
        group_id: payload.group_id,
        title: payload.title,
        description: payload.description,
        amount_minor: payload.amount_minor,
        paid_by: payload.paid_by.unwrap_or_else(|| username.to_string()),
        split_kind: map_split_kind(payload.split_kind),
        splits: payload
            .splits
            .into_iter()
            .map(|split| SplitInput::new(split.user_id, split.amount_minor))
            .collect(),
        idempotency_key: payload.idempotency_key,
        user_id: username.to_string(),
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseCreated>), ServerError> {
    let cmd = build_create_cmd(payload, &user.username);
    let id = state.engine.create_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(ExpenseCreated { id })))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<StatusCode, ServerError> {
    let cmd = UpdateExpenseCmd {
        expense_id,
        title: payload.title,
        description: payload.description,
        amount_minor: payload.amount_minor,
        user_id: user.username,
    };
    state.engine.update_expense(cmd).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_expense(expense_id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ExpenseListParams {
    pub group_id: Uuid,
    pub limit: Option<u64>,
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(params): Query<ExpenseListParams>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let limit = params.limit.unwrap_or(50);
    let expenses = state
        .engine
        .list_expenses(params.group_id, &user.username, limit)
        .await?;

    let expenses = expenses
        .into_iter()
        .map(|expense| ExpenseView {
            id: expense.id,
            group_id: expense.group_id,
            title: expense.title,
            description: expense.description,
            amount_minor: expense.amount_minor,
            paid_by: expense.paid_by,
            split_kind: map_split_kind_back(expense.split_kind),
            created_at: expense.created_at,
        })
        .collect();

    Ok(Json(ExpenseListResponse { expenses }))
}
