// migration/src/lib.rs
pub use sea_orm_migration::prelude::*;

// ユーザー関連マイグレーション
mod m20250801_000001_create_users_table;
mod m20250801_000002_create_user_attributes_table;

// 法的ポリシー設定
mod m20250801_000003_create_legal_settings_table;
mod m20250801_000004_seed_legal_settings;

// 予約アカウント（ゲスト・管理者）
mod m20250801_000005_create_reserved_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_users_table::Migration),
            Box::new(m20250801_000002_create_user_attributes_table::Migration),
            Box::new(m20250801_000003_create_legal_settings_table::Migration),
            Box::new(m20250801_000004_seed_legal_settings::Migration),
            Box::new(m20250801_000005_create_reserved_accounts::Migration),
        ]
    }
}
