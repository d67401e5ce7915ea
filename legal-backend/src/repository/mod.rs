// src/repository/mod.rs
pub mod legal_setting_repository;
pub mod user_attribute_repository;
pub mod user_repository;
