//! Out-of-order reconstruction of a single page.

use pagenet_types::{Packet, PageId, Tick};

/// Errors surfaced by [`PageReassembler`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReassemblerError {
    /// The expected packet count was zero.
    #[error("expected packet count must be positive")]
    EmptyPage,

    /// Slot index outside `0..total`.
    #[error("slot {index} out of range for page of length {total}")]
    SlotOutOfRange {
        /// Requested slot.
        index: usize,
        /// Number of slots.
        total: usize,
    },

    /// Packaging was attempted before every slot was filled.
    #[error("cannot package incomplete page: {received}/{total} packets received")]
    Incomplete {
        /// Slots filled so far.
        received: usize,
        /// Number of slots.
        total: usize,
    },
}

/// Collects the packets of one page, in any arrival order, until complete.
///
/// A reassembler owns a fixed array of slots, one per packet position.
/// Packets that do not belong (wrong page, wrong length, out-of-range
/// position, or a slot already filled) are rejected by return value, never
/// by error: stray traffic is a routine event at a terminal.
///
/// The expiry tick is stamped at creation; the owning terminal sweeps
/// expired reassemblers and quarantines their page ids.
#[derive(Debug)]
pub struct PageReassembler {
    page_id: PageId,
    slots: Vec<Option<Packet>>,
    received: usize,
    expiry_tick: Tick,
}

impl PageReassembler {
    /// Create a reassembler for a page of `total` packets, expiring at the
    /// given absolute tick.
    pub fn new(page_id: PageId, total: usize, expiry_tick: Tick) -> Result<Self, ReassemblerError> {
        if total == 0 {
            return Err(ReassemblerError::EmptyPage);
        }
        Ok(Self {
            page_id,
            slots: vec![None; total],
            received: 0,
            expiry_tick,
        })
    }

    /// Identifier of the page under reconstruction.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Number of slots (the page length).
    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// Number of distinct positions received so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Absolute tick at which this reassembler gives up.
    pub fn expiry_tick(&self) -> Tick {
        self.expiry_tick
    }

    /// Whether the reassembler has expired at `now`.
    pub fn is_expired(&self, now: Tick) -> bool {
        self.expiry_tick <= now
    }

    /// Fraction of the page received, in `[0.0, 1.0]`.
    pub fn completion_rate(&self) -> f64 {
        self.received as f64 / self.slots.len() as f64
    }

    /// Packets still missing.
    pub fn remaining_packets(&self) -> usize {
        self.slots.len() - self.received
    }

    /// Store a packet in its slot.
    ///
    /// Returns `false` without changing state if the packet's page id or
    /// length disagree, its position is out of range, or the slot is
    /// already filled.
    pub fn add_packet(&mut self, packet: Packet) -> bool {
        if packet.page_id() != self.page_id {
            return false;
        }
        if packet.page_len() != self.slots.len() {
            return false;
        }
        let Some(slot) = self.slots.get_mut(packet.position()) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(packet);
        self.received += 1;
        true
    }

    /// Whether slot `index` is filled.
    pub fn has_packet_at(&self, index: usize) -> Result<bool, ReassemblerError> {
        self.slots
            .get(index)
            .map(Option::is_some)
            .ok_or(ReassemblerError::SlotOutOfRange {
                index,
                total: self.slots.len(),
            })
    }

    /// Whether every slot is filled.
    pub fn is_complete(&self) -> bool {
        self.received == self.slots.len()
    }

    /// Drain the slots into an ordered packet list (position 0 first).
    ///
    /// Fails if the page is incomplete. On success the reassembler is left
    /// empty and reusable.
    pub fn package(&mut self) -> Result<Vec<Packet>, ReassemblerError> {
        if !self.is_complete() {
            return Err(ReassemblerError::Incomplete {
                received: self.received,
                total: self.slots.len(),
            });
        }
        self.received = 0;
        Ok(self
            .slots
            .iter_mut()
            .map(|slot| slot.take().expect("complete reassembler has no empty slot"))
            .collect())
    }

    /// Clear every slot without producing a list.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.received = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagenet_types::IpAddress;

    fn packet(page_id: PageId, position: usize, page_len: usize) -> Packet {
        Packet::new(
            page_id,
            position,
            page_len,
            IpAddress::new(1, 1),
            IpAddress::new(2, 1),
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_out_of_order_assembly() {
        let mut r = PageReassembler::new(7, 3, 50).unwrap();
        assert!(r.add_packet(packet(7, 2, 3)));
        assert!(r.add_packet(packet(7, 0, 3)));
        assert!(!r.is_complete());
        assert!(r.add_packet(packet(7, 1, 3)));
        assert!(r.is_complete());

        let packets = r.package().unwrap();
        let positions: Vec<usize> = packets.iter().map(Packet::position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        // Reusable after packaging.
        assert_eq!(r.received(), 0);
        assert!(r.add_packet(packet(7, 0, 3)));
    }

    #[test]
    fn test_duplicate_rejected_without_state_change() {
        let mut r = PageReassembler::new(7, 3, 50).unwrap();
        assert!(r.add_packet(packet(7, 1, 3)));
        assert!(!r.add_packet(packet(7, 1, 3)));
        assert_eq!(r.received(), 1);
    }

    #[test]
    fn test_mismatches_rejected() {
        let mut r = PageReassembler::new(7, 3, 50).unwrap();
        // Wrong page.
        assert!(!r.add_packet(packet(8, 0, 3)));
        // Wrong length claim.
        assert!(!r.add_packet(packet(7, 0, 4)));
        assert_eq!(r.received(), 0);
    }

    #[test]
    fn test_package_incomplete_fails() {
        let mut r = PageReassembler::new(7, 2, 50).unwrap();
        r.add_packet(packet(7, 0, 2));
        assert_eq!(
            r.package().unwrap_err(),
            ReassemblerError::Incomplete {
                received: 1,
                total: 2
            }
        );
        // The failed attempt must not disturb the slots.
        assert!(r.has_packet_at(0).unwrap());
        assert_eq!(r.received(), 1);
    }

    #[test]
    fn test_has_packet_at_bounds() {
        let r = PageReassembler::new(7, 2, 50).unwrap();
        assert!(!r.has_packet_at(1).unwrap());
        assert_eq!(
            r.has_packet_at(2).unwrap_err(),
            ReassemblerError::SlotOutOfRange { index: 2, total: 2 }
        );
    }

    #[test]
    fn test_reset() {
        let mut r = PageReassembler::new(7, 2, 50).unwrap();
        r.add_packet(packet(7, 0, 2));
        r.reset();
        assert_eq!(r.received(), 0);
        assert!(!r.has_packet_at(0).unwrap());
    }

    #[test]
    fn test_zero_total_rejected() {
        assert_eq!(
            PageReassembler::new(7, 0, 50).unwrap_err(),
            ReassemblerError::EmptyPage
        );
    }

    #[test]
    fn test_expiry() {
        let r = PageReassembler::new(7, 1, 50).unwrap();
        assert!(!r.is_expired(49));
        assert!(r.is_expired(50));
        assert!(r.is_expired(51));
    }

    #[test]
    fn test_completion_accessors() {
        let mut r = PageReassembler::new(7, 4, 50).unwrap();
        r.add_packet(packet(7, 0, 4));
        assert_eq!(r.completion_rate(), 0.25);
        assert_eq!(r.remaining_packets(), 3);
    }
}
