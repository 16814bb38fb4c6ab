//! Domain layer - pure admission logic with no I/O.
//!
//! - Policy snapshots read from the ledger
//! - The admission evaluator
//! - Status projection for dashboards and logs
//!
//! Nothing in this layer reads a clock; "now" is always an argument.

pub mod decision;
pub mod policy;
pub mod status;
