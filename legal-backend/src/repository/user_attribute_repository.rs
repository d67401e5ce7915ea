// src/repository/user_attribute_repository.rs

use crate::domain::policy::{AttributeChange, PolicySlot};
use crate::domain::user_attribute_model::{
    self, ActiveModel as AttributeActiveModel, Entity as AttributeEntity,
};
use sea_orm::entity::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbConn, DbErr, QueryFilter, Set};
use std::collections::HashMap;

/// ユーザー属性ストア
#[derive(Debug, Clone)]
pub struct UserAttributeRepository {
    db: DbConn,
}

impl UserAttributeRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn get(&self, uid: i32, name: &str) -> Result<Option<String>, DbErr> {
        Ok(AttributeEntity::find_by_id((uid, name.to_string()))
            .one(&self.db)
            .await?
            .map(|attr| attr.value))
    }

    /// ユーザーのポリシー承認属性のみを取得
    pub async fn find_policy_attributes(
        &self,
        uid: i32,
    ) -> Result<HashMap<String, String>, DbErr> {
        let names: Vec<&str> = PolicySlot::ALL.iter().map(|s| s.attribute_name()).collect();

        let attributes = AttributeEntity::find()
            .filter(user_attribute_model::Column::UserId.eq(uid))
            .filter(user_attribute_model::Column::Name.is_in(names))
            .all(&self.db)
            .await?;

        Ok(attributes
            .into_iter()
            .map(|attr| (attr.name, attr.value))
            .collect())
    }

    /// 属性をupsertする
    pub async fn set<C>(conn: &C, uid: i32, name: &str, value: &str) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let model = AttributeActiveModel {
            user_id: Set(uid),
            name: Set(name.to_string()),
            value: Set(value.to_string()),
        };

        AttributeEntity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    user_attribute_model::Column::UserId,
                    user_attribute_model::Column::Name,
                ])
                .update_column(user_attribute_model::Column::Value)
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    /// 属性を削除する。存在しなくてもエラーにしない
    pub async fn delete<C>(conn: &C, uid: i32, name: &str) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        AttributeEntity::delete_many()
            .filter(user_attribute_model::Column::UserId.eq(uid))
            .filter(user_attribute_model::Column::Name.eq(name))
            .exec(conn)
            .await?;
        Ok(())
    }

    pub async fn apply_changes<C>(conn: &C, changes: &[AttributeChange]) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        for change in changes {
            match change {
                AttributeChange::Set { uid, slot, value } => {
                    Self::set(conn, *uid, slot.attribute_name(), value).await?
                }
                AttributeChange::Delete { uid, slot } => {
                    Self::delete(conn, *uid, slot.attribute_name()).await?
                }
            }
        }
        Ok(())
    }
}
