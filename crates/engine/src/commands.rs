//! Command structs for engine write operations.
//!
//! These types group parameters for ledger-mutating operations, keeping
//! call sites readable and avoiding long argument lists. They also
//! serialize, so a command can be queued verbatim for offline replay.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PaymentMethod, SplitKind};

/// One participant's share of an expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInput {
    pub user_id: String,
    pub amount_minor: i64,
}

impl SplitInput {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount_minor: i64) -> Self {
        Self {
            user_id: user_id.into(),
            amount_minor,
        }
    }
}

/// Create an expense and apply its splits to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateExpenseCmd {
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub paid_by: String,
    pub split_kind: SplitKind,
    pub splits: Vec<SplitInput>,
    pub idempotency_key: Option<String>,
    pub user_id: String,
}

impl CreateExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        user_id: impl Into<String>,
        title: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            group_id,
            title: title.into(),
            description: None,
            amount_minor,
            paid_by: user_id.clone(),
            split_kind: SplitKind::Equal,
            splits: Vec::new(),
            idempotency_key: None,
            user_id,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn paid_by(mut self, paid_by: impl Into<String>) -> Self {
        self.paid_by = paid_by.into();
        self
    }

    #[must_use]
    pub fn split_kind(mut self, split_kind: SplitKind) -> Self {
        self.split_kind = split_kind;
        self
    }

    #[must_use]
    pub fn split(mut self, user_id: impl Into<String>, amount_minor: i64) -> Self {
        self.splits.push(SplitInput::new(user_id, amount_minor));
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Update the title/description/amount of an existing expense.
///
/// Balances are intentionally left untouched: the original split stays the
/// authoritative ledger record, and `recalculate_balances` is the repair
/// path when amounts diverge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateExpenseCmd {
    pub expense_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub user_id: String,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new(
        expense_id: Uuid,
        user_id: impl Into<String>,
        title: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        Self {
            expense_id,
            title: title.into(),
            description: None,
            amount_minor,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Record a payment as an audit row and settle the matching balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPaymentCmd {
    pub group_id: Uuid,
    pub from_user: String,
    pub to_user: String,
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub note: Option<String>,
    pub user_id: String,
}

impl RecordPaymentCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        user_id: impl Into<String>,
        from_user: impl Into<String>,
        to_user: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        Self {
            group_id,
            from_user: from_user.into(),
            to_user: to_user.into(),
            amount_minor,
            method: PaymentMethod::Other,
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
