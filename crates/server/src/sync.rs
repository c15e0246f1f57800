//! Offline-queue and sync API endpoints.

use api_types::sync::{QueuedActionCreated, QueuedActionNew, SyncReportView, SyncStatus};
use axum::{Extension, Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{ServerError, expenses, payments, server::ServerState, user};
use engine::{ActionPayload, UpdateExpenseCmd};

fn build_payload(action: QueuedActionNew, username: &str) -> ActionPayload {
    match action {
        QueuedActionNew::CreateExpense(expense) => {
            let mut cmd = expenses::build_create_cmd(expense, username);
            // Deferred creations always carry a key so replay after a false
            // failure cannot double-apply the debts.
            if cmd.idempotency_key.is_none() {
                cmd.idempotency_key = Some(Uuid::new_v4().to_string());
            }
            ActionPayload::CreateExpense(cmd)
        }
        QueuedActionNew::UpdateExpense {
            expense_id,
            title,
            description,
            amount_minor,
        } => ActionPayload::UpdateExpense(UpdateExpenseCmd {
            expense_id,
            title,
            description,
            amount_minor,
            user_id: username.to_string(),
        }),
        QueuedActionNew::DeleteExpense { expense_id } => ActionPayload::DeleteExpense {
            expense_id,
            user_id: username.to_string(),
        },
        QueuedActionNew::RecordPayment(payment) => {
            ActionPayload::RecordPayment(payments::build_record_cmd(payment, username))
        }
    }
}

pub async fn enqueue(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(action): Json<QueuedActionNew>,
) -> Result<(StatusCode, Json<QueuedActionCreated>), ServerError> {
    let payload = build_payload(action, &user.username);
    let id = state.sync.queue().enqueue(&payload).await?;
    Ok((StatusCode::ACCEPTED, Json(QueuedActionCreated { id })))
}

pub async fn sync_now(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<SyncReportView>, ServerError> {
    match state.sync.sync_pending().await? {
        Some(report) => Ok(Json(SyncReportView {
            attempted: report.attempted,
            succeeded: report.succeeded,
            failed: report.failed,
        })),
        None => Err(ServerError::Generic("a sync is already running".to_string())),
    }
}

pub async fn status(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<SyncStatus>, ServerError> {
    let pending = state.sync.queue().len().await?;
    Ok(Json(SyncStatus {
        pending,
        syncing: state.sync.is_syncing(),
    }))
}
