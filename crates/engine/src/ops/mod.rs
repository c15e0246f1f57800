use std::collections::HashSet;

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{Engine, EngineError, ResultEngine, group_members, groups};

mod expenses;
mod groups_ops;
mod ledger;
mod payments;
mod settlement;

impl Engine {
    /// Fails with `KeyNotFound` when the group does not exist.
    pub(crate) async fn require_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: Uuid,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    /// Every mutation and read goes through this gate: the acting user must
    /// be identified and a member of the group.
    pub(crate) async fn require_member<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        if user_id.trim().is_empty() {
            return Err(EngineError::NotAuthenticated);
        }
        let membership = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .filter(group_members::Column::UserId.eq(user_id))
            .one(conn)
            .await?;
        if membership.is_none() {
            return Err(EngineError::Forbidden(
                "not a member of this group".to_string(),
            ));
        }
        Ok(())
    }

    /// All member usernames of a group, for validating expense participants
    /// in one query.
    pub(crate) async fn member_set<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: Uuid,
    ) -> ResultEngine<HashSet<String>> {
        let members = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .all(conn)
            .await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }
}
