//! Node-level machinery for the pagenet network simulator.
//!
//! This crate contains everything that lives inside a single network node:
//!
//! - [`PacketBuffer`]: the bounded FIFO used for every queue in the system
//! - [`PageReassembler`]: out-of-order reconstruction of one page
//! - [`Terminal`]: traffic endpoint: fragmentation, reassembly, quarantine
//! - [`Router`]: the four-stage per-tick forwarding pipeline
//!
//! Routers and terminals never hold references to their peers. Every stage
//! that would hand a packet to another node instead returns the drained
//! packets to its caller, and the simulation harness performs the delivery.
//! This keeps the cyclic router graph free of ownership cycles and keeps
//! the whole crate single-threaded by construction.

mod buffer;
mod reassembler;
mod router;
mod terminal;

pub use buffer::{BufferError, PacketBuffer};
pub use reassembler::{PageReassembler, ReassemblerError};
pub use router::{Router, RouterConfig, RouterCounters, RouterError};
pub use terminal::{Terminal, TerminalConfig, TerminalCounters, TerminalError, TrafficConfig};
