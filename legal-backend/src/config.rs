// src/config.rs
use crate::utils::jwt::JwtConfig;
use crate::utils::password::Argon2Config;
use dotenvy::dotenv;
use std::env;

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    pub cookie_secure: bool,
}

/// ログイン保留（ポリシー承認待ち）の設定
#[derive(Clone, Debug)]
pub struct PendingLoginConfig {
    pub ttl_seconds: i64,
    pub cookie_name: String,
}

impl Default for PendingLoginConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 600,
            cookie_name: "legal_pending_login".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub homepage_url: String,
    pub jwt: JwtConfig,
    pub argon2: Argon2Config,
    pub pending_login: PendingLoginConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok(); // .env ファイルを読み込む (存在しなくてもエラーにしない)

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        let jwt = JwtConfig::from_env().map_err(|e| e.to_string())?;

        let ttl_seconds = env::var("PENDING_LOGIN_TTL_SECONDS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .map_err(|_| "Invalid PENDING_LOGIN_TTL_SECONDS value")?;

        Ok(Self {
            environment,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| "Invalid PORT value")?,
            database_url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            homepage_url: env::var("HOMEPAGE_URL").unwrap_or_else(|_| "/".to_string()),
            jwt,
            argon2: Argon2Config::from_env(),
            pending_login: PendingLoginConfig {
                ttl_seconds,
                ..PendingLoginConfig::default()
            },
            security: SecurityConfig {
                cookie_secure: is_production,
            },
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// テスト用の設定を作成
    pub fn for_testing() -> Self {
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_url: "sqlite::memory:".to_string(),
            homepage_url: "/".to_string(),
            jwt: JwtConfig {
                secret_key: "test-secret-key-that-is-at-least-32-characters-long".to_string(),
                ..JwtConfig::default()
            },
            // テストではハッシュ計算を軽くする
            argon2: Argon2Config {
                memory_cost: 4096,
                time_cost: 1,
                parallelism: 1,
                output_length: 32,
            },
            pending_login: PendingLoginConfig::default(),
            security: SecurityConfig {
                cookie_secure: false,
            },
        }
    }
}
