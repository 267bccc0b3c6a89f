// File: dispatcher/src/services/mod.rs
pub mod batch_service;

pub use batch_service::BatchService;
