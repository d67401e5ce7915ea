// src/service/mod.rs
pub mod auth_service;
pub mod legal_service;
pub mod pending_login_service;
pub mod policy_reconciler;
pub mod user_service;
