//! Pairwise balances: the durable "who owes whom" rows of a group ledger.
//!
//! A [`PairwiseBalance`] is a directed debt: `from_user` owes `to_user` a
//! positive number of minor units. At most one row exists per ordered
//! `(group, from, to)` pair; the reverse pair may exist only transiently
//! until the next write nets the two directions against each other.
//!
//! Concurrent writers from independent processes race on these rows with
//! last-write-wins semantics. The engine guarantees eventual,
//! order-independent convergence of a group's balances, not strict
//! real-time consistency.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairwiseBalance {
    pub id: Uuid,
    pub group_id: Uuid,
    pub from_user: String,
    pub to_user: String,
    pub amount_minor: i64,
    pub updated_at: DateTime<Utc>,
}

impl PairwiseBalance {
    pub fn new(
        group_id: Uuid,
        from_user: impl Into<String>,
        to_user: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            from_user: from_user.into(),
            to_user: to_user.into(),
            amount_minor,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount_minor: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PairwiseBalance> for ActiveModel {
    fn from(balance: &PairwiseBalance) -> Self {
        Self {
            id: ActiveValue::Set(balance.id.to_string()),
            group_id: ActiveValue::Set(balance.group_id.to_string()),
            from_user: ActiveValue::Set(balance.from_user.clone()),
            to_user: ActiveValue::Set(balance.to_user.clone()),
            amount_minor: ActiveValue::Set(balance.amount_minor),
            updated_at: ActiveValue::Set(balance.updated_at),
        }
    }
}

impl TryFrom<Model> for PairwiseBalance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "balance")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            from_user: model.from_user,
            to_user: model.to_user,
            amount_minor: model.amount_minor,
            updated_at: model.updated_at,
        })
    }
}
