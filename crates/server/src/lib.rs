use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod balances;
mod expenses;
mod groups;
mod payments;
mod server;
mod settlements;
mod sync;
mod user;

pub mod types {
    pub mod group {
        pub use api_types::group::{
            GroupCreated, GroupNew, MemberListResponse, MemberNew, MemberView,
        };
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseCreated, ExpenseListResponse, ExpenseNew, ExpenseUpdate, ExpenseView, SplitKind,
            SplitNew,
        };
    }

    pub mod balance {
        pub use api_types::balance::{BalanceView, GroupBalancesResponse, NetBalanceView};
    }

    pub mod settlement {
        pub use api_types::settlement::{SavingsView, SettlementPlanResponse, TransferView};
    }

    pub mod payment {
        pub use api_types::payment::{PaymentCreated, PaymentListResponse, PaymentNew, PaymentView};
    }

    pub mod sync {
        pub use api_types::sync::{QueuedActionCreated, QueuedActionNew, SyncReportView, SyncStatus};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

//TODO: Find a better solution
#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) | EngineError::BalanceNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::OverSettlement(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
