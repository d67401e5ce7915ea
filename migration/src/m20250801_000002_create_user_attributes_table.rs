use sea_orm_migration::prelude::*;

use super::m20250801_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ユーザー属性（ポリシー承認日時などのキー・バリュー）
        manager
            .create_table(
                Table::create()
                    .table(UserAttributes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserAttributes::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(UserAttributes::Name)
                            .string_len(80)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserAttributes::Value).text().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_user_attributes")
                            .col(UserAttributes::UserId)
                            .col(UserAttributes::Name),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_attributes_user_id")
                            .from(UserAttributes::Table, UserAttributes::UserId)
                            .to(Users::Table, Users::Uid)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAttributes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserAttributes {
    Table,
    UserId,
    Name,
    Value,
}
