use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend};

use super::m20250801_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// ゲスト（uid=1）と管理者（uid=2）は予約済み
const GUEST_UID: i32 = 1;
const ADMIN_UID: i32 = 2;

/// ログイン不可のハッシュ。管理者パスワードは generate-password-hash で生成して設定する
const UNUSABLE_PASSWORD_HASH: &str = "!";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::insert()
                    .into_table(Users::Table)
                    .columns([
                        Users::Uid,
                        Users::Uname,
                        Users::Email,
                        Users::PasswordHash,
                        Users::IsActive,
                    ])
                    .values_panic([
                        GUEST_UID.into(),
                        "guest".into(),
                        "guest@localhost".into(),
                        UNUSABLE_PASSWORD_HASH.into(),
                        false.into(),
                    ])
                    .values_panic([
                        ADMIN_UID.into(),
                        "admin".into(),
                        "admin@localhost".into(),
                        UNUSABLE_PASSWORD_HASH.into(),
                        true.into(),
                    ])
                    .to_owned(),
            )
            .await?;

        // 明示的にuidを指定したため、PostgreSQLではシーケンスを進めておく
        if manager.get_database_backend() == DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared(
                    "SELECT setval(pg_get_serial_sequence('users', 'uid'), (SELECT MAX(uid) FROM users))",
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Users::Table)
                    .and_where(Expr::col(Users::Uid).is_in([GUEST_UID, ADMIN_UID]))
                    .to_owned(),
            )
            .await
    }
}
