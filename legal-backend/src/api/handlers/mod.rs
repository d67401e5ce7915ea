// src/api/handlers/mod.rs
pub mod auth_handler;
pub mod legal_handler;
pub mod user_handler;
