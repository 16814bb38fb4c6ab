//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the admission evaluator with time:
//! - Wait orchestrator (evaluate/sleep loop with cancellation and timeout)
//! - Gated action runner (admission then exactly-once execution)
//! - Per-call configuration and caller-owned metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cancellation;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod ports;
pub mod runner;
