//! Expense operations: create (with ledger application), update, delete,
//! list.

use std::collections::HashSet;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::money::MoneyCents;
use crate::util::{normalize_optional_text, normalize_required_name, parse_uuid};
use crate::{
    CreateExpenseCmd, Engine, EngineError, Expense, ExpenseSplit, ResultEngine, UpdateExpenseCmd,
    expense_splits, expenses, with_tx,
};

impl Engine {
    /// Creates an expense, its splits, and the resulting ledger debts in one
    /// transaction.
    ///
    /// Conservation is checked up front: the splits must distribute the full
    /// amount exactly once, so the pairwise deltas produced by the expense
    /// sum to zero. A mismatch is a programming defect on the caller side
    /// and rejected as an invariant violation.
    ///
    /// When the command carries an idempotency key and an expense with that
    /// key already exists in the group, the existing id is returned and
    /// nothing is re-applied. Queued offline actions rely on this to make
    /// replay safe against false failures.
    pub async fn create_expense(&self, cmd: CreateExpenseCmd) -> ResultEngine<Uuid> {
        let title = normalize_required_name(&cmd.title, "expense")?;
        let description = normalize_optional_text(cmd.description.as_deref());

        if cmd.splits.is_empty() {
            return Err(EngineError::InvalidAmount(
                "expense needs at least one split".to_string(),
            ));
        }
        let mut participants: HashSet<&str> = HashSet::with_capacity(cmd.splits.len());
        for split in &cmd.splits {
            if split.amount_minor < 0 {
                return Err(EngineError::InvalidAmount(format!(
                    "negative split for {}",
                    split.user_id
                )));
            }
            if !participants.insert(split.user_id.as_str()) {
                return Err(EngineError::InvalidAmount(format!(
                    "duplicate split participant {}",
                    split.user_id
                )));
            }
        }
        let split_total: i64 = cmd.splits.iter().map(|s| s.amount_minor).sum();
        if split_total != cmd.amount_minor {
            return Err(EngineError::InvariantViolation(format!(
                "splits sum to {} but expense amount is {}",
                MoneyCents::new(split_total),
                MoneyCents::new(cmd.amount_minor)
            )));
        }

        if cmd.user_id.trim().is_empty() {
            return Err(EngineError::NotAuthenticated);
        }
        let members = self.member_set(&self.database, cmd.group_id).await?;
        if members.is_empty() {
            // No members means no such group (every group has its creator).
            self.require_group(&self.database, cmd.group_id).await?;
        }
        if !members.contains(&cmd.user_id) {
            return Err(EngineError::Forbidden(
                "not a member of this group".to_string(),
            ));
        }
        if !members.contains(&cmd.paid_by) {
            return Err(EngineError::InvalidAmount(format!(
                "payer {} is not a group member",
                cmd.paid_by
            )));
        }
        if let Some(outsider) = cmd
            .splits
            .iter()
            .find(|split| !members.contains(&split.user_id))
        {
            return Err(EngineError::InvalidAmount(format!(
                "split participant {} is not a group member",
                outsider.user_id
            )));
        }

        let expense = Expense::new(
            cmd.group_id,
            title,
            description,
            cmd.amount_minor,
            cmd.paid_by.clone(),
            cmd.split_kind,
            cmd.idempotency_key.clone(),
        )?;

        let expense_id = with_tx!(self, |db_tx| {
            self.insert_expense_with_splits(&db_tx, &expense, &cmd).await
        })?;

        self.views.invalidate(cmd.group_id);
        Ok(expense_id)
    }

    async fn insert_expense_with_splits(
        &self,
        db_tx: &DatabaseTransaction,
        expense: &Expense,
        cmd: &CreateExpenseCmd,
    ) -> ResultEngine<Uuid> {
        if let Some(key) = expense.idempotency_key.as_deref() {
            let existing = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(expense.group_id.to_string()))
                .filter(expenses::Column::IdempotencyKey.eq(key))
                .one(db_tx)
                .await?;
            if let Some(existing) = existing {
                return parse_uuid(&existing.id, "expense");
            }
        }

        expenses::ActiveModel::from(expense).insert(db_tx).await?;
        for split in &cmd.splits {
            let split_row = ExpenseSplit::new(expense.id, &split.user_id, split.amount_minor);
            expense_splits::ActiveModel::from(&split_row)
                .insert(db_tx)
                .await?;
        }

        for split in &cmd.splits {
            if split.user_id == expense.paid_by || split.amount_minor == 0 {
                continue;
            }
            self.apply_debt_tx(
                db_tx,
                expense.group_id,
                &split.user_id,
                &expense.paid_by,
                split.amount_minor,
            )
            .await?;
        }

        Ok(expense.id)
    }

    /// Updates the title/description/amount of an existing expense.
    ///
    /// Only the payer may edit. The stored splits and the ledger stay as
    /// they are; `recalculate_balances` is the repair path when the new
    /// amount should flow back into the balances.
    pub async fn update_expense(&self, cmd: UpdateExpenseCmd) -> ResultEngine<()> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let title = normalize_required_name(&cmd.title, "expense")?;
        let description = normalize_optional_text(cmd.description.as_deref());

        let model = expenses::Entity::find_by_id(cmd.expense_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        if model.paid_by != cmd.user_id {
            return Err(EngineError::Forbidden(
                "only the payer can edit this expense".to_string(),
            ));
        }

        let update = expenses::ActiveModel {
            id: ActiveValue::Set(model.id),
            title: ActiveValue::Set(title),
            description: ActiveValue::Set(description),
            amount_minor: ActiveValue::Set(cmd.amount_minor),
            ..Default::default()
        };
        update.update(&self.database).await?;
        Ok(())
    }

    /// Deletes an expense and its splits. Only the payer may delete.
    ///
    /// As with updates, recorded balances are left alone; deleting an
    /// expense whose debts are still outstanding calls for a
    /// `recalculate_balances` afterwards.
    pub async fn delete_expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        if model.paid_by != user_id {
            return Err(EngineError::Forbidden(
                "only the payer can delete this expense".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            expense_splits::Entity::delete_many()
                .filter(expense_splits::Column::ExpenseId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(model.id.clone())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Lists a group's expenses, newest first.
    pub async fn list_expenses(
        &self,
        group_id: Uuid,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<Expense>> {
        self.require_member(&self.database, group_id, user_id)
            .await?;
        let models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(expenses::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?;
        models.into_iter().map(Expense::try_from).collect()
    }

    /// Splits of one expense.
    pub async fn expense_splits(
        &self,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<ExpenseSplit>> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        let group_id = parse_uuid(&model.group_id, "group")?;
        self.require_member(&self.database, group_id, user_id)
            .await?;

        let models = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(model.id))
            .all(&self.database)
            .await?;
        models.into_iter().map(ExpenseSplit::try_from).collect()
    }
}
