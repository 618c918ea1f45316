//! Deterministic simulation of a packet-switched network.
//!
//! This crate owns the whole simulated universe: the router graph, the
//! tick counter, and the seeded random stream. Given the same
//! [`NetworkConfig`] (seed included), a run produces identical results
//! every time.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Network                            │
//! │                                                           │
//! │  tick():  for each router, in insertion order:            │
//! │    1. drain neighbor output buffers → deliver to peers    │
//! │    2. deliver local buffer → owned terminals              │
//! │    3. tick terminals (traffic, sweeps, output, input)     │
//! │    4. route input buffer → local/neighbor buffers         │
//! │                                                           │
//! │  every 5 ticks: recompute all routing tables against      │
//! │  live output-buffer occupancy (load-aware Dijkstra)       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! All mutation happens inside [`Network::tick`] or calls nested directly
//! under it; there is no concurrency and no I/O.

mod config;
mod network;
mod stats;

pub use config::NetworkConfig;
pub use network::{Network, NetworkError};
pub use stats::NetworkStats;
