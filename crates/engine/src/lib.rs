use sea_orm::DatabaseConnection;

pub use balances::PairwiseBalance;
pub use commands::{CreateExpenseCmd, RecordPaymentCmd, SplitInput, UpdateExpenseCmd};
pub use error::EngineError;
pub use expenses::{Expense, SplitKind};
pub use expense_splits::ExpenseSplit;
pub use groups::Group;
pub use group_members::{GroupMember, GroupRole};
pub use money::{EPSILON_MINOR, MoneyCents};
pub use payments::{PaymentMethod, PaymentRecord};
pub use queue::{ActionPayload, MAX_RETRIES, MutationQueue, OfflineAction};
pub use settlement::{NetBalance, Savings, SuggestedTransfer, net_balances, savings, simplify};
pub use sync::{SyncOrchestrator, SyncReport};
pub use views::SettlementPlan;

mod balances;
mod commands;
mod error;
mod expense_splits;
mod expenses;
mod group_members;
mod groups;
mod money;
mod ops;
mod payments;
mod queue;
mod settlement;
mod sync;
mod util;
mod views;

type ResultEngine<T> = Result<T, EngineError>;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger engine: pairwise group balances, expense splits, settlements,
/// and the derived settlement-plan views.
///
/// All writes go through the shared backend database; derived views are
/// recomputed from ledger state on demand and cached per group until the
/// next write. The engine keeps no other in-process state, so multiple
/// independent processes may point at the same database (last write wins on
/// shared balance rows; see `balances`).
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    views: views::ViewCache,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            views: views::ViewCache::default(),
        })
    }
}
