//! Backing Store Module
//!
//! Keeps the two backing stores of the aggregator reachable across transient
//! outages.
//!
//! ## Core Concepts
//! - **Watchdog**: a generic detect -> reconnect -> resume state machine around
//!   one store handle (`watchdog`).
//! - **Document store**: MongoDB, re-validated in place on refresh (`document`).
//! - **Cache**: Redis behind Sentinels, re-dialed through the sentinel list on
//!   refresh so that a master failover is followed (`cache`).
//! - **Errors**: one closed taxonomy for both stores; only connectivity
//!   failures are retried (`error`).

pub mod cache;
pub mod document;
pub mod error;
pub mod watchdog;

#[cfg(test)]
pub mod memory;

#[cfg(test)]
mod tests;
