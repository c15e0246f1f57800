use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub user_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: String,
        pub role: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberListResponse {
        pub members: Vec<MemberView>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SplitKind {
        Equal,
        Custom,
        Percentage,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SplitNew {
        pub user_id: String,
        pub amount_minor: i64,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub group_id: Uuid,
        pub title: String,
        pub description: Option<String>,
        pub amount_minor: i64,
        /// Defaults to the authenticated user.
        pub paid_by: Option<String>,
        pub split_kind: SplitKind,
        pub splits: Vec<SplitNew>,
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub title: String,
        pub description: Option<String>,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub title: String,
        pub description: Option<String>,
        pub amount_minor: i64,
        pub paid_by: String,
        pub split_kind: SplitKind,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub from_user: String,
        pub to_user: String,
        pub amount_minor: i64,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NetBalanceView {
        pub user_id: String,
        /// Positive = net creditor, negative = net debtor.
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupBalancesResponse {
        pub balances: Vec<BalanceView>,
        pub net_balances: Vec<NetBalanceView>,
    }
}

pub mod settlement {
    use super::*;
    use super::balance::NetBalanceView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferView {
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SavingsView {
        pub saved: usize,
        pub percentage: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementPlanResponse {
        pub group_id: Uuid,
        pub net_balances: Vec<NetBalanceView>,
        pub transfers: Vec<TransferView>,
        pub original_count: usize,
        pub optimized_count: usize,
        pub savings: SavingsView,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentMethod {
        Upi,
        Cash,
        Bank,
        Other,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub group_id: Uuid,
        pub from_user: String,
        pub to_user: String,
        pub amount_minor: i64,
        pub method: PaymentMethod,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub from_user: String,
        pub to_user: String,
        pub amount_minor: i64,
        pub method: PaymentMethod,
        pub note: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentListResponse {
        pub payments: Vec<PaymentView>,
    }
}

pub mod sync {
    use super::*;
    use super::expense::ExpenseNew;
    use super::payment::PaymentNew;

    /// A mutation to defer for later replay. Mirrors the engine's closed
    /// action set.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum QueuedActionNew {
        CreateExpense(ExpenseNew),
        UpdateExpense {
            expense_id: Uuid,
            title: String,
            description: Option<String>,
            amount_minor: i64,
        },
        DeleteExpense {
            expense_id: Uuid,
        },
        RecordPayment(PaymentNew),
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct QueuedActionCreated {
        pub id: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SyncStatus {
        pub pending: u64,
        pub syncing: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SyncReportView {
        pub attempted: usize,
        pub succeeded: usize,
        pub failed: usize,
    }
}
