//! Balance ledger operations: applying debts, settling them, and the
//! full-rebuild repair path.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::money::{EPSILON_MINOR, MoneyCents};
use crate::{
    Engine, EngineError, PairwiseBalance, ResultEngine, balances, expense_splits, expenses,
    payments, with_tx,
};

/// Looks up the single balance row for an ordered pair, if any.
async fn find_pair<C: ConnectionTrait>(
    conn: &C,
    group_id: Uuid,
    from_user: &str,
    to_user: &str,
) -> ResultEngine<Option<balances::Model>> {
    Ok(balances::Entity::find()
        .filter(balances::Column::GroupId.eq(group_id.to_string()))
        .filter(balances::Column::FromUser.eq(from_user))
        .filter(balances::Column::ToUser.eq(to_user))
        .one(conn)
        .await?)
}

async fn set_amount<C: ConnectionTrait>(
    conn: &C,
    row: &balances::Model,
    amount_minor: i64,
) -> ResultEngine<()> {
    let model = balances::ActiveModel {
        id: ActiveValue::Set(row.id.clone()),
        amount_minor: ActiveValue::Set(amount_minor),
        updated_at: ActiveValue::Set(Utc::now()),
        ..Default::default()
    };
    model.update(conn).await?;
    Ok(())
}

async fn delete_row<C: ConnectionTrait>(conn: &C, row: &balances::Model) -> ResultEngine<()> {
    balances::Entity::delete_by_id(row.id.clone())
        .exec(conn)
        .await?;
    Ok(())
}

/// In-memory mirror-netting fold, used when rebuilding a group's balances
/// from scratch. Mirrors the row-level logic of `apply_debt_tx`/`settle_tx`
/// without touching storage.
#[derive(Default)]
struct LedgerFold {
    pairs: HashMap<(String, String), i64>,
}

impl LedgerFold {
    fn debt(&mut self, from_user: &str, to_user: &str, amount_minor: i64) {
        if amount_minor <= 0 || from_user == to_user {
            return;
        }
        let forward = (from_user.to_string(), to_user.to_string());
        if let Some(existing) = self.pairs.get_mut(&forward) {
            *existing += amount_minor;
            return;
        }

        let reverse = (to_user.to_string(), from_user.to_string());
        match self.pairs.get(&reverse).copied() {
            None => {
                self.pairs.insert(forward, amount_minor);
            }
            Some(reverse_amount) => {
                let remaining = reverse_amount - amount_minor;
                if remaining > EPSILON_MINOR {
                    self.pairs.insert(reverse, remaining);
                } else if remaining >= -EPSILON_MINOR {
                    self.pairs.remove(&reverse);
                } else {
                    self.pairs.remove(&reverse);
                    self.pairs.insert(forward, -remaining);
                }
            }
        }
    }

    /// Reduces the outstanding debt between a pair, in either direction.
    /// Returns the excess that had no debt left to settle against.
    fn settle(&mut self, from_user: &str, to_user: &str, amount_minor: i64) -> i64 {
        let forward = (from_user.to_string(), to_user.to_string());
        let reverse = (to_user.to_string(), from_user.to_string());
        let key = if self.pairs.contains_key(&forward) {
            forward
        } else if self.pairs.contains_key(&reverse) {
            reverse
        } else {
            return amount_minor;
        };

        let outstanding = self.pairs[&key];
        let remaining = outstanding - amount_minor;
        if remaining > EPSILON_MINOR {
            self.pairs.insert(key, remaining);
            0
        } else {
            self.pairs.remove(&key);
            remaining.min(0).abs()
        }
    }

    fn into_entries(self) -> Vec<((String, String), i64)> {
        self.pairs.into_iter().collect()
    }
}

impl Engine {
    /// Increases the directed debt `from_user` → `to_user`, netting against
    /// any existing debt in the opposite direction.
    ///
    /// The mirror check keeps the pair invariant: two users never owe each
    /// other in both directions at once. When the reverse debt is larger,
    /// it shrinks; when it is smaller, it is deleted and the excess becomes
    /// the forward debt; when the difference is inside the settled
    /// threshold, both directions disappear.
    pub(crate) async fn apply_debt_tx<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: Uuid,
        from_user: &str,
        to_user: &str,
        amount_minor: i64,
    ) -> ResultEngine<()> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "debt amount must be > 0".to_string(),
            ));
        }
        if from_user == to_user {
            return Err(EngineError::InvalidAmount(
                "from_user and to_user must differ".to_string(),
            ));
        }

        if let Some(forward) = find_pair(conn, group_id, from_user, to_user).await? {
            return set_amount(conn, &forward, forward.amount_minor + amount_minor).await;
        }

        match find_pair(conn, group_id, to_user, from_user).await? {
            None => {
                let balance = PairwiseBalance::new(group_id, from_user, to_user, amount_minor);
                balances::ActiveModel::from(&balance).insert(conn).await?;
            }
            Some(reverse) => {
                let remaining = reverse.amount_minor - amount_minor;
                if remaining > EPSILON_MINOR {
                    set_amount(conn, &reverse, remaining).await?;
                } else if remaining >= -EPSILON_MINOR {
                    delete_row(conn, &reverse).await?;
                } else {
                    delete_row(conn, &reverse).await?;
                    let balance = PairwiseBalance::new(group_id, from_user, to_user, -remaining);
                    balances::ActiveModel::from(&balance).insert(conn).await?;
                }
            }
        }
        Ok(())
    }

    /// Decreases an outstanding debt between two users.
    ///
    /// Consults both directions, since the row may be stored either way.
    /// A result inside the settled threshold deletes the row; an amount
    /// exceeding the known debt is rejected as `OverSettlement` instead of
    /// being clamped or flipped, because it means the caller settled
    /// against stale state.
    pub(crate) async fn settle_tx<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: Uuid,
        from_user: &str,
        to_user: &str,
        amount_minor: i64,
    ) -> ResultEngine<()> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be > 0".to_string(),
            ));
        }

        let row = match find_pair(conn, group_id, from_user, to_user).await? {
            Some(row) => row,
            None => find_pair(conn, group_id, to_user, from_user)
                .await?
                .ok_or_else(|| {
                    EngineError::BalanceNotFound(format!(
                        "no outstanding balance between {from_user} and {to_user}; it may have \
                         already been settled"
                    ))
                })?,
        };

        let remaining = row.amount_minor - amount_minor;
        if remaining < -EPSILON_MINOR {
            return Err(EngineError::OverSettlement(format!(
                "settlement of {} exceeds outstanding debt of {}",
                MoneyCents::new(amount_minor),
                MoneyCents::new(row.amount_minor)
            )));
        }
        if remaining <= EPSILON_MINOR {
            delete_row(conn, &row).await
        } else {
            set_amount(conn, &row, remaining).await
        }
    }

    /// Public entry point for a bare debt application.
    pub async fn apply_debt(
        &self,
        group_id: Uuid,
        from_user: &str,
        to_user: &str,
        amount_minor: i64,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.require_member(&self.database, group_id, user_id)
            .await?;
        with_tx!(self, |db_tx| {
            self.apply_debt_tx(&db_tx, group_id, from_user, to_user, amount_minor)
                .await
        })?;
        self.views.invalidate(group_id);
        Ok(())
    }

    /// Public entry point for a bare settlement.
    pub async fn settle(
        &self,
        group_id: Uuid,
        from_user: &str,
        to_user: &str,
        amount_minor: i64,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.require_member(&self.database, group_id, user_id)
            .await?;
        with_tx!(self, |db_tx| {
            self.settle_tx(&db_tx, group_id, from_user, to_user, amount_minor)
                .await
        })?;
        self.views.invalidate(group_id);
        Ok(())
    }

    pub(crate) async fn load_balances(&self, group_id: Uuid) -> ResultEngine<Vec<PairwiseBalance>> {
        let models = balances::Entity::find()
            .filter(balances::Column::GroupId.eq(group_id.to_string()))
            .all(&self.database)
            .await?;
        models.into_iter().map(PairwiseBalance::try_from).collect()
    }

    /// All pairwise balances of a group.
    pub async fn balances_for_group(
        &self,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<PairwiseBalance>> {
        self.require_member(&self.database, group_id, user_id)
            .await?;
        self.load_balances(group_id).await
    }

    /// Rebuilds a group's balance rows from its expenses and payments.
    ///
    /// Repair path for drift between the denormalized rows and the
    /// expense/payment history (e.g. after an expense edit). Expense splits
    /// are replayed chronologically through the mirror-netting fold, then
    /// payment records are replayed as settlements; payment excess beyond
    /// the outstanding debt is dropped rather than flipped.
    pub async fn recalculate_balances(&self, group_id: Uuid, user_id: &str) -> ResultEngine<()> {
        self.require_member(&self.database, group_id, user_id)
            .await?;

        with_tx!(self, |db_tx| {
            balances::Entity::delete_many()
                .filter(balances::Column::GroupId.eq(group_id.to_string()))
                .exec(&db_tx)
                .await?;

            let mut fold = LedgerFold::default();

            let expense_models = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(expenses::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            for expense_model in &expense_models {
                let split_models = expense_splits::Entity::find()
                    .filter(expense_splits::Column::ExpenseId.eq(expense_model.id.clone()))
                    .all(&db_tx)
                    .await?;
                for split in split_models {
                    if split.user_id != expense_model.paid_by {
                        fold.debt(&split.user_id, &expense_model.paid_by, split.amount_minor);
                    }
                }
            }

            let payment_models = payments::Entity::find()
                .filter(payments::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(payments::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            for payment in payment_models {
                let dropped =
                    fold.settle(&payment.from_user, &payment.to_user, payment.amount_minor);
                if dropped > 0 {
                    tracing::warn!(
                        payment_id = %payment.id,
                        "payment exceeds rebuilt debt by {}; excess dropped",
                        MoneyCents::new(dropped)
                    );
                }
            }

            for ((from_user, to_user), amount_minor) in fold.into_entries() {
                if amount_minor > EPSILON_MINOR {
                    let balance = PairwiseBalance::new(group_id, from_user, to_user, amount_minor);
                    balances::ActiveModel::from(&balance).insert(&db_tx).await?;
                }
            }

            Ok::<(), crate::EngineError>(())
        })?;

        self.views.invalidate(group_id);
        Ok(())
    }
}
