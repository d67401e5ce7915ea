// src/domain/user_model.rs

use super::policy::RESERVED_ADMIN_UID;
use crate::types::{optional_timestamp, Timestamp};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, DbErr, Set};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub uid: i32,

    #[sea_orm(unique)]
    pub uname: String,

    #[sea_orm(unique)]
    pub email: String,

    #[serde(skip_serializing)] // パスワードハッシュは絶対にシリアライズしない
    pub password_hash: String,

    pub is_active: bool,

    pub last_login_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::domain::user_attribute_model::Entity")]
    Attributes,
}

impl Related<crate::domain::user_attribute_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attributes.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            is_active: Set(true),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            // 更新の場合のみ updated_at を更新
            self.updated_at = Set(Utc::now());
        }
        Ok(self)
    }
}

impl Model {
    /// ユーザーが認証可能な状態かチェック
    pub fn can_authenticate(&self) -> bool {
        self.is_active
    }

    /// パスワードハッシュを除いたセーフなユーザー情報を取得
    pub fn to_safe_user(&self) -> SafeUser {
        SafeUser {
            uid: self.uid,
            uname: self.uname.clone(),
            email: self.email.clone(),
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
        }
    }
}

/// パスワードハッシュを含まないセーフなユーザー表現
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SafeUser {
    pub uid: i32,
    pub uname: String,
    pub email: String,
    pub is_active: bool,
    #[serde(with = "optional_timestamp")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Model> for SafeUser {
    fn from(model: Model) -> Self {
        model.to_safe_user()
    }
}

/// JWTに埋め込むユーザー情報
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub uid: i32,
    pub uname: String,
    pub email: String,
    pub is_active: bool,
}

impl UserClaims {
    pub fn is_site_admin(&self) -> bool {
        self.uid == RESERVED_ADMIN_UID
    }
}

impl From<&Model> for UserClaims {
    fn from(user: &Model) -> Self {
        Self {
            uid: user.uid,
            uname: user.uname.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
        }
    }
}
