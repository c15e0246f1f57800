//! Cached ledger-derived views.
//!
//! The engine does no incremental bookkeeping: net balances and settlement
//! plans are recomputed from the ledger on demand. This cache only saves
//! the recomputation between writes; every ledger write for a group drops
//! that group's entry, and a queue drain drops all of them at once.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::settlement::{NetBalance, Savings, SuggestedTransfer};

/// A full settlement plan for one group: the aggregated net balances, the
/// greedy transfer suggestions, and the savings over paying each pairwise
/// balance separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    pub group_id: Uuid,
    pub net_balances: Vec<NetBalance>,
    pub transfers: Vec<SuggestedTransfer>,
    pub original_count: usize,
    pub optimized_count: usize,
    pub savings: Savings,
}

#[derive(Debug, Default)]
pub(crate) struct ViewCache {
    plans: RwLock<HashMap<Uuid, Arc<SettlementPlan>>>,
}

impl ViewCache {
    pub(crate) fn get(&self, group_id: Uuid) -> Option<Arc<SettlementPlan>> {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&group_id)
            .cloned()
    }

    pub(crate) fn insert(&self, plan: SettlementPlan) -> Arc<SettlementPlan> {
        let plan = Arc::new(plan);
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plan.group_id, plan.clone());
        plan
    }

    pub(crate) fn invalidate(&self, group_id: Uuid) {
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&group_id);
    }

    pub(crate) fn clear(&self) {
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
