// File: dispatcher/src/lib.rs
pub mod admission;
pub mod batch;
pub mod config;
pub mod cron;
pub mod dispatch;
pub mod errors;
pub mod services;
pub mod web;
