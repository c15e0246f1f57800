use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::sync::Arc;
use uuid::Uuid;

use engine::{
    CreateExpenseCmd, Engine, EngineError, PairwiseBalance, PaymentMethod, RecordPaymentCmd,
    UpdateExpenseCmd, net_balances,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "bob", "carol", "dave"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn group_with_members(engine: &Engine, members: &[&str]) -> Uuid {
    let owner = members[0];
    let group_id = engine.create_group("Trip", owner).await.unwrap();
    for member in &members[1..] {
        engine.add_member(group_id, member, owner).await.unwrap();
    }
    group_id
}

fn amount_between(balances: &[PairwiseBalance], from: &str, to: &str) -> Option<i64> {
    balances
        .iter()
        .find(|b| b.from_user == from && b.to_user == to)
        .map(|b| b.amount_minor)
}

#[tokio::test]
async fn cross_cancel_nets_to_a_single_row() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 5000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "bob", "alice", 2000, "alice")
        .await
        .unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(amount_between(&balances, "alice", "bob"), Some(3000));
}

#[tokio::test]
async fn forward_debts_accumulate_on_one_row() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 1000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "alice", "bob", 1500, "alice")
        .await
        .unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(amount_between(&balances, "alice", "bob"), Some(2500));
}

#[tokio::test]
async fn larger_reverse_debt_flips_the_direction() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 2000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "bob", "alice", 5000, "alice")
        .await
        .unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(amount_between(&balances, "bob", "alice"), Some(3000));
}

#[tokio::test]
async fn matching_reverse_debt_cancels_both_directions() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 2000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "bob", "alice", 2000, "alice")
        .await
        .unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert!(balances.is_empty());
}

#[tokio::test]
async fn settle_deletes_sub_epsilon_residue() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 1000, "alice")
        .await
        .unwrap();
    engine
        .settle(group_id, "alice", "bob", 999, "alice")
        .await
        .unwrap();

    // A one-cent residue is dust, not a stored balance.
    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert!(balances.is_empty());
}

#[tokio::test]
async fn settle_works_against_the_reverse_direction() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 3000, "alice")
        .await
        .unwrap();
    // The caller names the pair the other way around; the stored row is
    // found anyway.
    engine
        .settle(group_id, "bob", "alice", 1000, "bob")
        .await
        .unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(amount_between(&balances, "alice", "bob"), Some(2000));
}

#[tokio::test]
async fn over_settlement_is_rejected_not_clamped() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 1000, "alice")
        .await
        .unwrap();

    let err = engine
        .settle(group_id, "alice", "bob", 1500, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverSettlement(_)));

    // The balance is untouched by the rejected settlement.
    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(amount_between(&balances, "alice", "bob"), Some(1000));
}

#[tokio::test]
async fn settling_a_missing_balance_errors() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    let err = engine
        .settle(group_id, "alice", "bob", 1000, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::BalanceNotFound(_)));
}

#[tokio::test]
async fn expense_splits_become_debts_towards_the_payer() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob", "carol"]).await;

    let cmd = CreateExpenseCmd::new(group_id, "alice", "Dinner", 9000)
        .split("alice", 3000)
        .split("bob", 3000)
        .split("carol", 3000);
    engine.create_expense(cmd).await.unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(balances.len(), 2);
    assert_eq!(amount_between(&balances, "bob", "alice"), Some(3000));
    assert_eq!(amount_between(&balances, "carol", "alice"), Some(3000));

    // Conservation: the nets of one expense sum to zero.
    let total: i64 = net_balances(&balances).iter().map(|n| n.amount.cents()).sum();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn split_sum_mismatch_is_an_invariant_violation() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    let cmd = CreateExpenseCmd::new(group_id, "alice", "Dinner", 9000)
        .split("alice", 3000)
        .split("bob", 3000);
    let err = engine.create_expense(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert!(balances.is_empty());
}

#[tokio::test]
async fn non_members_cannot_touch_the_ledger() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    let err = engine
        .apply_debt(group_id, "alice", "bob", 1000, "dave")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .create_expense(
            CreateExpenseCmd::new(group_id, "dave", "Dinner", 1000).split("dave", 1000),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine.balances_for_group(group_id, "dave").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn empty_user_is_not_authenticated() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice"]).await;

    let err = engine.balances_for_group(group_id, "").await.unwrap_err();
    assert_eq!(err, EngineError::NotAuthenticated);
}

#[tokio::test]
async fn idempotency_key_makes_create_expense_replay_safe() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    let cmd = CreateExpenseCmd::new(group_id, "alice", "Dinner", 2000)
        .split("alice", 1000)
        .split("bob", 1000)
        .idempotency_key("offline-1");

    let first = engine.create_expense(cmd.clone()).await.unwrap();
    let second = engine.create_expense(cmd).await.unwrap();
    assert_eq!(first, second);

    let expenses = engine.list_expenses(group_id, "alice", 50).await.unwrap();
    assert_eq!(expenses.len(), 1);

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(amount_between(&balances, "bob", "alice"), Some(1000));
}

#[tokio::test]
async fn only_the_payer_edits_or_deletes_an_expense() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    let expense_id = engine
        .create_expense(
            CreateExpenseCmd::new(group_id, "alice", "Dinner", 2000)
                .split("alice", 1000)
                .split("bob", 1000),
        )
        .await
        .unwrap();

    let err = engine
        .update_expense(UpdateExpenseCmd::new(expense_id, "bob", "Brunch", 2000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine.delete_expense(expense_id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .update_expense(UpdateExpenseCmd::new(expense_id, "alice", "Brunch", 2000))
        .await
        .unwrap();
    let expenses = engine.list_expenses(group_id, "alice", 50).await.unwrap();
    assert_eq!(expenses[0].title, "Brunch");

    engine.delete_expense(expense_id, "alice").await.unwrap();
    let expenses = engine.list_expenses(group_id, "alice", 50).await.unwrap();
    assert!(expenses.is_empty());
}

#[tokio::test]
async fn record_payment_writes_audit_row_and_settles() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .create_expense(
            CreateExpenseCmd::new(group_id, "alice", "Dinner", 2000)
                .split("alice", 1000)
                .split("bob", 1000),
        )
        .await
        .unwrap();

    engine
        .record_payment(
            RecordPaymentCmd::new(group_id, "bob", "bob", "alice", 400)
                .method(PaymentMethod::Upi)
                .note("partial"),
        )
        .await
        .unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(amount_between(&balances, "bob", "alice"), Some(600));

    let payments = engine.list_payments(group_id, "alice", 50).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_minor, 400);
    assert_eq!(payments[0].method, PaymentMethod::Upi);
}

#[tokio::test]
async fn failed_settlement_rolls_back_the_audit_row() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    // No balance exists, so the payment has nothing to settle.
    let err = engine
        .record_payment(RecordPaymentCmd::new(group_id, "bob", "bob", "alice", 400))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::BalanceNotFound(_)));

    let payments = engine.list_payments(group_id, "alice", 50).await.unwrap();
    assert!(payments.is_empty());
}

#[tokio::test]
async fn recalculate_rebuilds_from_expenses_and_payments() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob", "carol"]).await;

    engine
        .create_expense(
            CreateExpenseCmd::new(group_id, "alice", "Dinner", 6000)
                .split("alice", 2000)
                .split("bob", 2000)
                .split("carol", 2000),
        )
        .await
        .unwrap();
    engine
        .record_payment(RecordPaymentCmd::new(group_id, "bob", "bob", "alice", 500))
        .await
        .unwrap();

    // A stray debt with no expense behind it disappears on rebuild.
    engine
        .apply_debt(group_id, "carol", "bob", 700, "alice")
        .await
        .unwrap();

    engine.recalculate_balances(group_id, "alice").await.unwrap();

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(balances.len(), 2);
    assert_eq!(amount_between(&balances, "bob", "alice"), Some(1500));
    assert_eq!(amount_between(&balances, "carol", "alice"), Some(2000));
}

#[tokio::test]
async fn triangle_of_debts_needs_no_transfers() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob", "carol"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 3000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "bob", "carol", 3000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "carol", "alice", 3000, "alice")
        .await
        .unwrap();

    let plan = engine.settlement_plan(group_id, "alice").await.unwrap();
    assert_eq!(plan.original_count, 3);
    assert!(plan.net_balances.is_empty());
    assert!(plan.transfers.is_empty());
    assert_eq!(plan.savings.saved, 3);
    assert_eq!(plan.savings.percentage, 100);
}

#[tokio::test]
async fn star_of_debtors_pays_the_sole_creditor_directly() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob", "carol", "dave"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 10_000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "carol", "bob", 5_000, "alice")
        .await
        .unwrap();
    engine
        .apply_debt(group_id, "dave", "bob", 2_500, "alice")
        .await
        .unwrap();

    let plan = engine.settlement_plan(group_id, "alice").await.unwrap();
    assert_eq!(plan.transfers.len(), 3);
    assert!(plan.transfers.iter().all(|t| t.to == "bob"));
    let transferred: i64 = plan.transfers.iter().map(|t| t.amount.cents()).sum();
    assert_eq!(transferred, 17_500);
}

#[tokio::test]
async fn settlement_plan_is_cached_until_the_next_write() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    engine
        .apply_debt(group_id, "alice", "bob", 1000, "alice")
        .await
        .unwrap();

    let first = engine.settlement_plan(group_id, "alice").await.unwrap();
    let second = engine.settlement_plan(group_id, "alice").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    engine
        .apply_debt(group_id, "alice", "bob", 500, "alice")
        .await
        .unwrap();

    let third = engine.settlement_plan(group_id, "alice").await.unwrap();
    assert!(!Arc::ptr_eq(&second, &third));
    assert_eq!(third.transfers[0].amount.cents(), 1500);
}

#[tokio::test]
async fn duplicate_members_conflict() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_with_members(&engine, &["alice", "bob"]).await;

    let err = engine.add_member(group_id, "bob", "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}
