//! Core types for the pagenet network simulator.
//!
//! This crate provides the foundational value types used throughout the
//! simulator:
//!
//! - **Addressing**: [`IpAddress`], the compact router/terminal identifier
//! - **Transport units**: [`Packet`] and [`Page`]
//! - **Routing state**: [`RoutingTable`], the per-router next-hop map
//! - **Time**: the [`Tick`] alias and the protocol TTL constants
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod ip;
mod packet;
mod page;
mod table;

pub use ip::IpAddress;
pub use packet::{Packet, PacketError};
pub use page::{Page, PageError};
pub use table::RoutingTable;

/// One integer-valued step of simulated time.
pub type Tick = u64;

/// Identifier of a logical page, unique per originating terminal.
pub type PageId = u64;

/// Ticks added to the current tick when a traffic source stamps an expiry
/// onto freshly generated packets.
pub const PACKET_TTL: Tick = 100;

/// Ticks a reassembler may wait for its remaining packets before it is
/// swept and its page quarantined.
pub const MAX_ASSEMBLER_TTL: Tick = 250;
