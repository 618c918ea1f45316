//! Logical messages exchanged between terminals.

use crate::{IpAddress, Packet, PageId, Tick};
use std::fmt;

/// A logical message at the terminal level.
///
/// A page exists transiently at the two ends of a transfer: the sender
/// builds one and fragments it into packets, and the receiver validates one
/// back out of a completed, ordered packet list.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    page_id: PageId,
    page_len: usize,
    src: IpAddress,
    dst: IpAddress,
}

/// Errors raised when constructing a [`Page`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The page length was zero.
    #[error("page length must be positive")]
    EmptyPage,

    /// One of the endpoint addresses was the invalid address.
    #[error("{endpoint} address is invalid")]
    InvalidEndpoint {
        /// Which endpoint was invalid ("source" or "destination").
        endpoint: &'static str,
    },

    /// The packet list did not contain exactly `page_len` packets.
    #[error("packet count {actual} does not match page length {expected}")]
    WrongPacketCount {
        /// Packets supplied.
        actual: usize,
        /// Page length claimed by the first packet.
        expected: usize,
    },

    /// A packet disagreed with the first packet's header fields.
    #[error("packet {index} has inconsistent {field}")]
    InconsistentPacket {
        /// Index of the offending packet in the supplied list.
        index: usize,
        /// The field that disagreed.
        field: &'static str,
    },

    /// A packet sat at the wrong list index for its position.
    #[error("packet at index {index} carries position {position}")]
    OutOfOrderPacket {
        /// Index in the supplied list.
        index: usize,
        /// Position the packet claims.
        position: usize,
    },
}

impl Page {
    /// Create a fresh page, validating the length and both endpoints.
    pub fn new(
        page_id: PageId,
        page_len: usize,
        src: IpAddress,
        dst: IpAddress,
    ) -> Result<Self, PageError> {
        if page_len == 0 {
            return Err(PageError::EmptyPage);
        }
        if !src.is_valid() {
            return Err(PageError::InvalidEndpoint { endpoint: "source" });
        }
        if !dst.is_valid() {
            return Err(PageError::InvalidEndpoint {
                endpoint: "destination",
            });
        }
        Ok(Self {
            page_id,
            page_len,
            src,
            dst,
        })
    }

    /// Validate a page out of a completed packet list.
    ///
    /// The list must contain exactly `page_len` packets, all sharing the
    /// first packet's page id, length, and endpoints, with the packet at
    /// index `i` carrying position `i`.
    pub fn from_packets(packets: &[Packet]) -> Result<Self, PageError> {
        let first = packets.first().ok_or(PageError::EmptyPage)?;

        let page = Self {
            page_id: first.page_id(),
            page_len: first.page_len(),
            src: first.src(),
            dst: first.dst(),
        };

        if packets.len() != page.page_len {
            return Err(PageError::WrongPacketCount {
                actual: packets.len(),
                expected: page.page_len,
            });
        }

        for (index, packet) in packets.iter().enumerate() {
            if packet.page_id() != page.page_id {
                return Err(PageError::InconsistentPacket {
                    index,
                    field: "page id",
                });
            }
            if packet.page_len() != page.page_len {
                return Err(PageError::InconsistentPacket {
                    index,
                    field: "page length",
                });
            }
            if packet.src() != page.src {
                return Err(PageError::InconsistentPacket {
                    index,
                    field: "source",
                });
            }
            if packet.dst() != page.dst {
                return Err(PageError::InconsistentPacket {
                    index,
                    field: "destination",
                });
            }
            if packet.position() != index {
                return Err(PageError::OutOfOrderPacket {
                    index,
                    position: packet.position(),
                });
            }
        }

        Ok(page)
    }

    /// Fragment this page into its packets, positions `0..page_len`, all
    /// stamped with the given absolute expiry tick.
    pub fn to_packets(&self, expiry_tick: Tick) -> Vec<Packet> {
        (0..self.page_len)
            .map(|position| {
                Packet::new(
                    self.page_id,
                    position,
                    self.page_len,
                    self.src,
                    self.dst,
                    expiry_tick,
                )
                .expect("page invariants guarantee valid packets")
            })
            .collect()
    }

    /// Identifier of this page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Number of packets this page fragments into.
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
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page(id {}, len {}, {} -> {})",
            self.page_id, self.page_len, self.src, self.dst
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> IpAddress {
        IpAddress::new(1, 1)
    }

    fn dst() -> IpAddress {
        IpAddress::new(2, 1)
    }

    #[test]
    fn test_fragment_then_validate_roundtrip() {
        let page = Page::new(42, 4, src(), dst()).unwrap();
        let packets = page.to_packets(100);
        assert_eq!(packets.len(), 4);
        for (i, p) in packets.iter().enumerate() {
            assert_eq!(p.position(), i);
            assert_eq!(p.expiry_tick(), 100);
        }

        let rebuilt = Page::from_packets(&packets).unwrap();
        assert_eq!(rebuilt, page);
    }

    #[test]
    fn test_from_packets_rejects_empty_list() {
        assert_eq!(Page::from_packets(&[]).unwrap_err(), PageError::EmptyPage);
    }

    #[test]
    fn test_from_packets_rejects_wrong_count() {
        let page = Page::new(1, 3, src(), dst()).unwrap();
        let packets = page.to_packets(10);
        let err = Page::from_packets(&packets[..2]).unwrap_err();
        assert_eq!(
            err,
            PageError::WrongPacketCount {
                actual: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn test_from_packets_rejects_out_of_order() {
        let page = Page::new(1, 3, src(), dst()).unwrap();
        let mut packets = page.to_packets(10);
        packets.swap(0, 2);
        let err = Page::from_packets(&packets).unwrap_err();
        assert_eq!(
            err,
            PageError::OutOfOrderPacket {
                index: 0,
                position: 2
            }
        );
    }

    #[test]
    fn test_from_packets_rejects_foreign_packet() {
        let page = Page::new(1, 2, src(), dst()).unwrap();
        let mut packets = page.to_packets(10);
        packets[1] = Packet::new(9, 1, 2, src(), dst(), 10).unwrap();
        let err = Page::from_packets(&packets).unwrap_err();
        assert_eq!(
            err,
            PageError::InconsistentPacket {
                index: 1,
                field: "page id"
            }
        );
    }

    #[test]
    fn test_new_validates_endpoints() {
        let invalid = IpAddress::new(0, 0);
        assert!(Page::new(1, 1, invalid, dst()).is_err());
        assert!(Page::new(1, 1, src(), invalid).is_err());
        assert_eq!(
            Page::new(1, 0, src(), dst()).unwrap_err(),
            PageError::EmptyPage
        );
    }
}
