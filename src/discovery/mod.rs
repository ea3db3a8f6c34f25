//! Worker Discovery Module
//!
//! Workers announce themselves on a multicast group; the aggregator keeps the
//! set of workers it has heard from recently. No worker address is configured
//! anywhere.
//!
//! ## Core Mechanisms
//! - **Announcer**: a worker re-sends the same fixed datagram every 500 ms,
//!   re-dialing on the next tick after any socket failure.
//! - **Registry**: one control loop ingests datagrams, answers snapshot
//!   queries and sweeps stale entries, strictly one event at a time.
//! - **Liveness**: an entry silent for 2 s is dropped until the worker is heard again.
//! - **Dedup**: `(name, content_type, content_hash)` identifies a worker.

pub mod announcer;
pub mod codec;
pub mod registry;
pub mod types;
