//! Expense primitives.
//!
//! An `Expense` is a shared cost paid by one group member and split across
//! participants via [`ExpenseSplit`](crate::ExpenseSplit) rows. Split
//! amounts must sum exactly to the expense amount; every non-payer split
//! turns into one directed ledger debt towards the payer.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    Equal,
    Custom,
    Percentage,
}

impl SplitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Custom => "custom",
            Self::Percentage => "percentage",
        }
    }
}

impl TryFrom<&str> for SplitKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "custom" => Ok(Self::Custom),
            "percentage" => Ok(Self::Percentage),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid split kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub paid_by: String,
    pub split_kind: SplitKind,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        group_id: Uuid,
        title: String,
        description: Option<String>,
        amount_minor: i64,
        paid_by: String,
        split_kind: SplitKind,
        idempotency_key: Option<String>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            title,
            description,
            amount_minor,
            paid_by,
            split_kind,
            idempotency_key,
            created_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub paid_by: String,
    pub split_kind: String,
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    ExpenseSplits,
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.to_string()),
            title: ActiveValue::Set(expense.title.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            paid_by: ActiveValue::Set(expense.paid_by.clone()),
            split_kind: ActiveValue::Set(expense.split_kind.as_str().to_string()),
            idempotency_key: ActiveValue::Set(expense.idempotency_key.clone()),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            title: model.title,
            description: model.description,
            amount_minor: model.amount_minor,
            paid_by: model.paid_by,
            split_kind: SplitKind::try_from(model.split_kind.as_str())?,
            idempotency_key: model.idempotency_key,
            created_at: model.created_at,
        })
    }
}
