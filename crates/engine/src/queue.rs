//! Durable queue of deferred ledger mutations.
//!
//! When a mutation cannot reach the backend it is appended here and
//! replayed later by the sync orchestrator. The queue lives in its own
//! app-local database so it survives process restarts independently of
//! backend connectivity, and it is owned exclusively by one process: it is
//! never shared across devices.
//!
//! Replay order is strictly FIFO (by insertion id), preserving causal
//! ordering of dependent mutations such as create-then-settle.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, DatabaseConnection, PaginatorTrait, QueryOrder, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CreateExpenseCmd, EngineError, RecordPaymentCmd, ResultEngine, UpdateExpenseCmd};

/// Replay attempts per action before it is dropped for good.
pub const MAX_RETRIES: i32 = 3;

/// The closed set of queueable mutations.
///
/// One variant per action kind, so the replay dispatcher is checked for
/// exhaustiveness at compile time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    CreateExpense(CreateExpenseCmd),
    UpdateExpense(UpdateExpenseCmd),
    DeleteExpense { expense_id: Uuid, user_id: String },
    RecordPayment(RecordPaymentCmd),
}

impl ActionPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateExpense(_) => "create_expense",
            Self::UpdateExpense(_) => "update_expense",
            Self::DeleteExpense { .. } => "delete_expense",
            Self::RecordPayment(_) => "record_payment",
        }
    }
}

/// A queued mutation waiting for replay.
#[derive(Clone, Debug, PartialEq)]
pub struct OfflineAction {
    pub id: i64,
    pub payload: ActionPayload,
    pub created_at: DateTime<Utc>,
    pub retry_count: i32,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "offline_actions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kind: String,
    pub payload: String,
    pub created_at: DateTimeUtc,
    pub retry_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for OfflineAction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let payload: ActionPayload = serde_json::from_str(&model.payload).map_err(|err| {
            EngineError::InvariantViolation(format!(
                "corrupt queued action {}: {err}",
                model.id
            ))
        })?;
        Ok(Self {
            id: model.id,
            payload,
            created_at: model.created_at,
            retry_count: model.retry_count,
        })
    }
}

/// Handle to the local mutation queue.
///
/// Constructed once at application start and passed by reference to
/// callers; tests build one over an in-memory database.
#[derive(Debug)]
pub struct MutationQueue {
    database: DatabaseConnection,
}

impl MutationQueue {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    /// Appends an action with `retry_count = 0` and returns its id.
    ///
    /// Ids are assigned by the store in insertion order, so they double as
    /// the FIFO replay order.
    pub async fn enqueue(&self, payload: &ActionPayload) -> ResultEngine<i64> {
        let serialized = serde_json::to_string(payload).map_err(|err| {
            EngineError::InvariantViolation(format!("unserializable action: {err}"))
        })?;
        let model = ActiveModel {
            id: ActiveValue::NotSet,
            kind: ActiveValue::Set(payload.kind().to_string()),
            payload: ActiveValue::Set(serialized),
            created_at: ActiveValue::Set(Utc::now()),
            retry_count: ActiveValue::Set(0),
        };
        let inserted = model.insert(&self.database).await?;
        Ok(inserted.id)
    }

    /// Returns all pending actions in FIFO order.
    pub async fn pending(&self) -> ResultEngine<Vec<OfflineAction>> {
        let models = Entity::find()
            .order_by_asc(Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(OfflineAction::try_from).collect()
    }

    /// Number of pending actions.
    pub async fn len(&self) -> ResultEngine<u64> {
        Ok(Entity::find().count(&self.database).await?)
    }

    pub async fn remove(&self, id: i64) -> ResultEngine<()> {
        Entity::delete_by_id(id).exec(&self.database).await?;
        Ok(())
    }

    pub async fn increment_retry(&self, id: i64) -> ResultEngine<()> {
        let model = Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("queued action {id}")))?;
        let retry_count = model.retry_count + 1;
        let update = ActiveModel {
            id: ActiveValue::Set(id),
            retry_count: ActiveValue::Set(retry_count),
            ..Default::default()
        };
        update.update(&self.database).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_with_kind_tag() {
        let cmd = CreateExpenseCmd::new(Uuid::new_v4(), "alice", "Dinner", 3000)
            .split("alice", 1500)
            .split("bob", 1500)
            .idempotency_key("k-1");
        let payload = ActionPayload::CreateExpense(cmd);

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"create_expense\""));
        let back: ActionPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.kind(), "create_expense");
    }

    #[test]
    fn delete_payload_round_trips() {
        let payload = ActionPayload::DeleteExpense {
            expense_id: Uuid::new_v4(),
            user_id: "alice".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: ActionPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
