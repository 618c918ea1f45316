//! The unit of transmission.

use crate::{IpAddress, PageId, Tick};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single packet of a fragmented page.
///
/// Packets are immutable values: they carry the identity of the page they
/// belong to, their position within it, the endpoints, and an absolute
/// expiry tick. Two packets referring to the same page slot are considered
/// duplicates regardless of the remaining metadata, so equality and hashing
/// are defined on `(page_id, position)` only.
#[derive(Clone, Copy)]
pub struct Packet {
    page_id: PageId,
    position: usize,
    page_len: usize,
    src: IpAddress,
    dst: IpAddress,
    expiry_tick: Tick,
}

/// Errors raised when constructing a [`Packet`] from invalid parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// The page length was zero.
    #[error("page length must be positive")]
    EmptyPage,

    /// The position did not fall inside the page.
    #[error("position {position} outside page of length {page_len}")]
    PositionOutOfPage {
        /// Claimed position.
        position: usize,
        /// Claimed page length.
        page_len: usize,
    },

    /// One of the endpoint addresses was the invalid address.
    #[error("{endpoint} address is invalid")]
    InvalidEndpoint {
        /// Which endpoint was invalid ("source" or "destination").
        endpoint: &'static str,
    },
}

impl Packet {
    /// Create a packet, validating `position < page_len`, `page_len > 0`,
    /// and that both endpoints are valid addresses.
    pub fn new(
        page_id: PageId,
        position: usize,
        page_len: usize,
        src: IpAddress,
        dst: IpAddress,
        expiry_tick: Tick,
    ) -> Result<Self, PacketError> {
        if page_len == 0 {
            return Err(PacketError::EmptyPage);
        }
        if position >= page_len {
            return Err(PacketError::PositionOutOfPage { position, page_len });
        }
        if !src.is_valid() {
            return Err(PacketError::InvalidEndpoint { endpoint: "source" });
        }
        if !dst.is_valid() {
            return Err(PacketError::InvalidEndpoint {
                endpoint: "destination",
            });
        }
        Ok(Self {
            page_id,
            position,
            page_len,
            src,
            dst,
            expiry_tick,
        })
    }

    /// Identifier of the page this packet belongs to.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Zero-based position of this packet within its page.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total number of packets in the page.
    pub fn page_len(&self) -> usize {
        self.page_len
    }

    /// Originating terminal address.
    pub fn src(&self) -> IpAddress {
        self.src
    }

    /// Destination terminal address.
    pub fn dst(&self) -> IpAddress {
        self.dst
    }

    /// Absolute tick at which this packet expires.
    pub fn expiry_tick(&self) -> Tick {
        self.expiry_tick
    }

    /// Whether the packet has expired at `now`. Expiry is inclusive: a
    /// packet observed at its expiry tick is already dead.
    pub fn is_expired(&self, now: Tick) -> bool {
        now >= self.expiry_tick
    }

    /// Whether this is the first packet of its page.
    pub fn is_first(&self) -> bool {
        self.position == 0
    }

    /// Whether this is the last packet of its page.
    pub fn is_last(&self) -> bool {
        self.position == self.page_len - 1
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id && self.position == other.position
    }
}

impl Eq for Packet {}

impl Hash for Packet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.page_id.hash(state);
        self.position.hash(state);
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet({}/{} of page {}, {} -> {}, exp {})",
            self.position, self.page_len, self.page_id, self.src, self.dst, self.expiry_tick
        )
    }
}
