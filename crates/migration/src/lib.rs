pub use sea_orm_migration::prelude::*;

mod m20260110_080000_users;
mod m20260110_081500_groups;
mod m20260110_083000_expenses;
mod m20260110_084500_balances;
mod m20260110_090000_payment_records;
mod m20260111_090000_offline_actions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_080000_users::Migration),
            Box::new(m20260110_081500_groups::Migration),
            Box::new(m20260110_083000_expenses::Migration),
            Box::new(m20260110_084500_balances::Migration),
            Box::new(m20260110_090000_payment_records::Migration),
            Box::new(m20260111_090000_offline_actions::Migration),
        ]
    }
}
