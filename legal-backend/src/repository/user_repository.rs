// src/repository/user_repository.rs

use crate::domain::user_model::{self, ActiveModel as UserActiveModel, Entity as UserEntity};
use chrono::Utc;
use sea_orm::entity::*;
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, PaginatorTrait, QueryFilter};
use sea_orm::{ConnectionTrait, DbConn, DbErr, Set};

#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DbConn,
}

impl UserRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// ユーザーをuidで検索
    pub async fn find_by_id(&self, uid: i32) -> Result<Option<user_model::Model>, DbErr> {
        UserEntity::find_by_id(uid).one(&self.db).await
    }

    /// メールアドレスまたはユーザー名でユーザーを検索
    pub async fn find_by_email_or_uname(
        &self,
        identifier: &str,
    ) -> Result<Option<user_model::Model>, DbErr> {
        UserEntity::find()
            .filter(
                Condition::any()
                    .add(user_model::Column::Email.eq(identifier))
                    .add(user_model::Column::Uname.eq(identifier)),
            )
            .one(&self.db)
            .await
    }

    /// ユーザーを作成
    pub async fn create<C>(conn: &C, create_user: CreateUser) -> Result<user_model::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut new_user = UserActiveModel::new();
        new_user.uname = Set(create_user.uname);
        new_user.email = Set(create_user.email);
        new_user.password_hash = Set(create_user.password_hash);
        new_user.insert(conn).await
    }

    /// メールアドレスを更新
    pub async fn update_email<C>(
        conn: &C,
        user: user_model::Model,
        email: String,
    ) -> Result<user_model::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model: UserActiveModel = user.into();
        active_model.email = Set(email);
        active_model.update(conn).await
    }

    /// 最終ログイン日時を記録
    pub async fn update_last_login(&self, uid: i32) -> Result<(), DbErr> {
        UserEntity::update_many()
            .col_expr(
                user_model::Column::LastLoginAt,
                Expr::value(Utc::now()),
            )
            .filter(user_model::Column::Uid.eq(uid))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// メールアドレスの重複チェック（指定uidを除く）
    pub async fn is_email_taken(
        &self,
        email: &str,
        exclude_uid: Option<i32>,
    ) -> Result<bool, DbErr> {
        let mut condition = Condition::all().add(user_model::Column::Email.eq(email));
        if let Some(uid) = exclude_uid {
            condition = condition.add(user_model::Column::Uid.ne(uid));
        }
        let count = UserEntity::find().filter(condition).count(&self.db).await?;
        Ok(count > 0)
    }

    /// ユーザー名の重複チェック
    pub async fn is_uname_taken(&self, uname: &str) -> Result<bool, DbErr> {
        let count = UserEntity::find()
            .filter(user_model::Column::Uname.eq(uname))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

/// ユーザー作成用の構造体
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub uname: String,
    pub email: String,
    pub password_hash: String,
}
