//! Group operations. Kept thin: the engine only needs groups as ledger
//! scopes and membership as the mutation gate.

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::util::normalize_required_name;
use crate::{
    Engine, EngineError, Group, GroupMember, GroupRole, ResultEngine, group_members, groups,
    with_tx,
};

impl Engine {
    /// Creates a group; the creator becomes its owner member.
    pub async fn create_group(&self, name: &str, user_id: &str) -> ResultEngine<Uuid> {
        if user_id.trim().is_empty() {
            return Err(EngineError::NotAuthenticated);
        }
        let name = normalize_required_name(name, "group")?;
        let group = Group::new(name, user_id);
        let owner = GroupMember::new(group.id, user_id, GroupRole::Owner);

        with_tx!(self, |db_tx| {
            groups::ActiveModel::from(&group).insert(&db_tx).await?;
            group_members::ActiveModel::from(&owner)
                .insert(&db_tx)
                .await?;
            Ok(group.id)
        })
    }

    /// Adds a member to a group. Only existing members may add.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        new_user: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.require_group(&self.database, group_id).await?;
        self.require_member(&self.database, group_id, user_id)
            .await?;

        let new_user = normalize_required_name(new_user, "member")?;
        let existing = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .filter(group_members::Column::UserId.eq(new_user.clone()))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::ExistingKey(new_user));
        }

        let member = GroupMember::new(group_id, new_user, GroupRole::Member);
        group_members::ActiveModel::from(&member)
            .insert(&self.database)
            .await?;
        Ok(())
    }

    /// Lists a group's members.
    pub async fn members(&self, group_id: Uuid, user_id: &str) -> ResultEngine<Vec<GroupMember>> {
        self.require_member(&self.database, group_id, user_id)
            .await?;
        let models = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .all(&self.database)
            .await?;
        models.into_iter().map(GroupMember::try_from).collect()
    }
}
