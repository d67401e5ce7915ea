// src/api/dto/mod.rs
pub mod auth_dto;
pub mod common;
pub mod legal_dto;
pub mod user_dto;
