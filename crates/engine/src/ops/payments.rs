//! Payment operations: audit row plus settlement in one transaction.

use sea_orm::{QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Engine, PaymentRecord, RecordPaymentCmd, ResultEngine, payments, with_tx};

impl Engine {
    /// Records a payment and settles the matching pairwise balance.
    ///
    /// The audit row is immutable and survives independently of the balance
    /// it affects; the settlement itself follows the ledger rules (both
    /// directions consulted, over-settlement rejected, dust deleted). If
    /// the settlement fails, the audit row is rolled back with it.
    pub async fn record_payment(&self, cmd: RecordPaymentCmd) -> ResultEngine<Uuid> {
        self.require_member(&self.database, cmd.group_id, &cmd.user_id)
            .await?;

        let record = PaymentRecord::new(
            cmd.group_id,
            cmd.from_user.clone(),
            cmd.to_user.clone(),
            cmd.amount_minor,
            cmd.method,
            cmd.note.clone(),
        )?;

        let payment_id = with_tx!(self, |db_tx| {
            payments::ActiveModel::from(&record).insert(&db_tx).await?;
            self.settle_tx(
                &db_tx,
                cmd.group_id,
                &cmd.from_user,
                &cmd.to_user,
                cmd.amount_minor,
            )
            .await?;
            Ok::<Uuid, crate::EngineError>(record.id)
        })?;

        self.views.invalidate(cmd.group_id);
        Ok(payment_id)
    }

    /// Lists a group's payment records, newest first.
    pub async fn list_payments(
        &self,
        group_id: Uuid,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<PaymentRecord>> {
        self.require_member(&self.database, group_id, user_id)
            .await?;
        let models = payments::Entity::find()
            .filter(payments::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(payments::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?;
        models.into_iter().map(PaymentRecord::try_from).collect()
    }
}
