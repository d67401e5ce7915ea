// src/repository/legal_setting_repository.rs

use crate::domain::legal_setting_model::{
    self, ActiveModel as SettingActiveModel, Entity as SettingEntity,
};
use sea_orm::entity::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DbConn, DbErr, Set};
use std::collections::HashMap;

/// サイト設定ストア
#[derive(Debug, Clone)]
pub struct LegalSettingRepository {
    db: DbConn,
}

impl LegalSettingRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn get_value(&self, name: &str) -> Result<Option<String>, DbErr> {
        Ok(SettingEntity::find_by_id(name.to_string())
            .one(&self.db)
            .await?
            .map(|setting| setting.value))
    }

    pub async fn load_all(&self) -> Result<HashMap<String, String>, DbErr> {
        Ok(SettingEntity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|setting| (setting.name, setting.value))
            .collect())
    }

    pub async fn set_value(&self, name: &str, value: &str) -> Result<(), DbErr> {
        let model = SettingActiveModel {
            name: Set(name.to_string()),
            value: Set(value.to_string()),
        };

        SettingEntity::insert(model)
            .on_conflict(
                OnConflict::column(legal_setting_model::Column::Name)
                    .update_column(legal_setting_model::Column::Value)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}
