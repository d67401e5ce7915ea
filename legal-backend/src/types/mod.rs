// src/types/mod.rs
pub mod datetime;

pub use datetime::{
    acceptance_timestamp, optional_timestamp, parse_acceptance_timestamp, Timestamp,
};
