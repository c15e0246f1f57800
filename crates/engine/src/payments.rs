//! Payment records.
//!
//! A `PaymentRecord` is an immutable audit row: it documents that a payment
//! happened, independent of the mutable pairwise balance it settles. The
//! ledger mutation and the audit row are written in the same transaction
//! but never updated afterwards.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Cash,
    Bank,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upi => "upi",
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "upi" => Ok(Self::Upi),
            "cash" => Ok(Self::Cash),
            "bank" => Ok(Self::Bank),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub group_id: Uuid,
    pub from_user: String,
    pub to_user: String,
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        group_id: Uuid,
        from_user: String,
        to_user: String,
        amount_minor: i64,
        method: PaymentMethod,
        note: Option<String>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            from_user,
            to_user,
            amount_minor,
            method,
            note,
            created_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount_minor: i64,
    pub method: String,
    pub note: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PaymentRecord> for ActiveModel {
    fn from(record: &PaymentRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            group_id: ActiveValue::Set(record.group_id.to_string()),
            from_user: ActiveValue::Set(record.from_user.clone()),
            to_user: ActiveValue::Set(record.to_user.clone()),
            amount_minor: ActiveValue::Set(record.amount_minor),
            method: ActiveValue::Set(record.method.as_str().to_string()),
            note: ActiveValue::Set(record.note.clone()),
            created_at: ActiveValue::Set(record.created_at),
        }
    }
}

impl TryFrom<Model> for PaymentRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payment")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            from_user: model.from_user,
            to_user: model.to_user,
            amount_minor: model.amount_minor,
            method: PaymentMethod::try_from(model.method.as_str())?,
            note: model.note,
            created_at: model.created_at,
        })
    }
}
