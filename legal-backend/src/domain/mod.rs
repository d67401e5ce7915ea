// src/domain/mod.rs
pub mod legal_setting_model;
pub mod policy;
pub mod user_attribute_model;
pub mod user_model;
