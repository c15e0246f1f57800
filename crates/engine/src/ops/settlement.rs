//! Derived settlement views over the ledger.

use std::sync::Arc;

use uuid::Uuid;

use crate::settlement::{net_balances, savings, simplify};
use crate::{Engine, ResultEngine, SettlementPlan};

impl Engine {
    /// Settlement plan for a group: aggregated net balances plus greedy
    /// transfer suggestions.
    ///
    /// Cached per group until the next ledger write. The plan is advisory:
    /// executing a suggested transfer means recording a payment against the
    /// real balance rows, not persisting the suggestion.
    pub async fn settlement_plan(
        &self,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Arc<SettlementPlan>> {
        self.require_member(&self.database, group_id, user_id)
            .await?;

        if let Some(plan) = self.views.get(group_id) {
            return Ok(plan);
        }

        let balances = self.load_balances(group_id).await?;
        let nets = net_balances(&balances);
        let transfers = simplify(&nets)?;
        let plan = SettlementPlan {
            group_id,
            original_count: balances.len(),
            optimized_count: transfers.len(),
            savings: savings(balances.len(), transfers.len()),
            net_balances: nets,
            transfers,
        };
        Ok(self.views.insert(plan))
    }

    /// Drops every cached derived view. Called once after a queue drain,
    /// whatever the per-action outcomes were.
    pub fn invalidate_all_views(&self) {
        self.views.clear();
    }
}
