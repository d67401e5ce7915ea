// tests/integration/mod.rs

pub mod acceptance_flow_tests;
pub mod login_veto_tests;
pub mod profile_tests;
