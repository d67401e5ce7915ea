// src/service/pending_login_service.rs
//
// ポリシー未承認でログインを拒否したユーザーを、承認完了まで一時的に保持する。
// 資格情報は保持せず、uid と remember_me のみを持つ。

use crate::config::PendingLoginConfig;
use crate::log_with_context;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 承認待ちのログイン
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingLogin {
    pub uid: i32,
    pub remember_me: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PendingLoginService {
    entries: Arc<RwLock<HashMap<String, PendingLogin>>>,
    ttl: Duration,
}

impl PendingLoginService {
    pub fn new(config: &PendingLoginConfig) -> Self {
        Self::with_ttl(Duration::seconds(config.ttl_seconds))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// 保留中のログインを登録し、不透明なトークンを返す
    pub async fn stash(&self, uid: i32, remember_me: bool) -> String {
        self.stash_at(uid, remember_me, Utc::now()).await
    }

    async fn stash_at(&self, uid: i32, remember_me: bool, now: DateTime<Utc>) -> String {
        let pending = PendingLogin {
            uid,
            remember_me,
            created_at: now,
        };
        self.insert(pending, now).await
    }

    /// 取り出した保留ログインを新しいトークンで登録し直す。
    /// 有効期限は最初のログイン拒否時点から数える
    pub async fn restash(&self, pending: PendingLogin) -> String {
        self.insert(pending, Utc::now()).await
    }

    async fn insert(&self, pending: PendingLogin, now: DateTime<Utc>) -> String {
        let token = Uuid::new_v4().to_string();
        let uid = pending.uid;
        let mut entries = self.entries.write().await;

        // 期限切れのエントリはここでまとめて掃除する
        let ttl = self.ttl;
        entries.retain(|_, pending| now - pending.created_at <= ttl);
        entries.insert(token.clone(), pending);

        log_with_context!(
            tracing::Level::DEBUG,
            "Pending login stored",
            "uid" => uid,
            "pending_count" => entries.len()
        );

        token
    }

    /// トークンに対応する保留ログインを取り出す（一度きり）
    pub async fn take(&self, token: &str) -> Option<PendingLogin> {
        self.take_at(token, Utc::now()).await
    }

    async fn take_at(&self, token: &str, now: DateTime<Utc>) -> Option<PendingLogin> {
        let pending = self.entries.write().await.remove(token)?;

        if now - pending.created_at > self.ttl {
            log_with_context!(
                tracing::Level::INFO,
                "Pending login expired",
                "uid" => pending.uid
            );
            return None;
        }

        Some(pending)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
