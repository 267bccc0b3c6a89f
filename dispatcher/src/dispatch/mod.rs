// File: dispatcher/src/dispatch/mod.rs
pub mod agent;
pub mod aggregator;
pub mod cancel;
pub mod scheduler;

pub use agent::{AgentClient, HttpAgentClient};
pub use cancel::CancelHandle;
pub use scheduler::PacingScheduler;
