use sea_orm_migration::prelude::*;

use super::m20250801_000003_create_legal_settings_table::LegalSettings;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// インストール時のデフォルト値
const DEFAULT_SETTINGS: [(&str, &str); 13] = [
    ("legalNoticeActive", "1"),
    ("termsOfUseActive", "1"),
    ("privacyPolicyActive", "1"),
    ("accessibilityStatementActive", "1"),
    ("cancellationRightPolicyActive", "0"),
    ("tradeConditionsActive", "0"),
    ("legalNoticeUrl", ""),
    ("termsOfUseUrl", ""),
    ("privacyPolicyUrl", ""),
    ("accessibilityStatementUrl", ""),
    ("cancellationRightPolicyUrl", ""),
    ("tradeConditionsUrl", ""),
    ("minimumAge", "13"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert
            .into_table(LegalSettings::Table)
            .columns([LegalSettings::Name, LegalSettings::Value]);
        for (name, value) in DEFAULT_SETTINGS {
            insert.values_panic([name.into(), value.into()]);
        }

        manager.exec_stmt(insert.to_owned()).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let names: Vec<&str> = DEFAULT_SETTINGS.iter().map(|(name, _)| *name).collect();
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(LegalSettings::Table)
                    .and_where(Expr::col(LegalSettings::Name).is_in(names))
                    .to_owned(),
            )
            .await
    }
}
