//! Traffic endpoints: page fragmentation, reassembly and quarantine.

use crate::{PacketBuffer, PageReassembler};
use pagenet_types::{IpAddress, Packet, Page, PageError, PageId, Tick, MAX_ASSEMBLER_TTL, PACKET_TTL};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Buffer and bandwidth configuration for a [`Terminal`].
#[derive(Debug, Clone, Copy)]
pub struct TerminalConfig {
    /// Input buffer capacity (0 = unbounded).
    pub in_buffer_cap: usize,
    /// Packets processed from the input buffer per tick.
    pub in_proc_cap: usize,
    /// Output buffer capacity (0 = unbounded).
    pub out_buffer_cap: usize,
    /// Packets pushed toward the parent router per tick.
    pub output_bw: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            in_buffer_cap: 100,
            in_proc_cap: 8,
            out_buffer_cap: 50,
            output_bw: 4,
        }
    }
}

/// Autonomous traffic generation parameters.
///
/// A probability of zero disables generation, which is the default for
/// hand-built terminals; the network constructor installs the configured
/// probability on every terminal it creates.
#[derive(Debug, Clone, Copy)]
pub struct TrafficConfig {
    /// Per-tick probability of emitting one page.
    pub probability: f64,
    /// Page lengths are drawn uniformly from `1..=max_page_len`.
    pub max_page_len: usize,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            probability: 0.0,
            max_page_len: 1,
        }
    }
}

/// Cumulative event counters of a [`Terminal`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalCounters {
    /// Pages successfully fragmented and enqueued.
    pub pages_created: u64,
    /// Pages whose packets all entered the output buffer.
    pub pages_sent: u64,
    /// Pages dropped whole for lack of output buffer space.
    pub pages_dropped: u64,
    /// Pages fully reassembled.
    pub pages_completed: u64,
    /// Reassemblers swept after their TTL elapsed.
    pub pages_timed_out: u64,
    /// Packets produced by fragmentation, dropped or not.
    pub packets_generated: u64,
    /// Packets handed to the parent router.
    pub packets_sent: u64,
    /// Packets discarded because the whole page did not fit.
    pub packets_out_dropped: u64,
    /// Packets expired while waiting in the output buffer.
    pub packets_out_timed_out: u64,
    /// Packets offered to this terminal.
    pub packets_received: u64,
    /// Packets rejected at or after input: buffer overflow, misdelivery,
    /// or a reassembler refusal.
    pub packets_in_dropped: u64,
    /// Packets lost to expiry, quarantine, or a timed-out reassembler.
    pub packets_in_timed_out: u64,
    /// Packets that ended up in a completed page.
    pub packets_succ_processed: u64,
}

/// Errors raised when constructing or attaching a [`Terminal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerminalError {
    /// The address has a zero terminal byte or is the invalid address.
    #[error("{ip} is not a terminal address")]
    NotATerminalAddress {
        /// The offending address.
        ip: IpAddress,
    },
}

/// A page id barred from reassembly until the given tick.
#[derive(Debug, Clone, Copy)]
struct QuarantineEntry {
    page_id: PageId,
    expiry_tick: Tick,
}

/// A traffic endpoint attached to one router.
///
/// Terminals generate pages, fragment them into packets, and reassemble
/// incoming packets back into pages. All hand-offs to the parent router go
/// through the return value of [`tick`](Terminal::tick): the terminal holds
/// no reference to its owner.
///
/// After a reassembler times out, its page id is quarantined for
/// [`PACKET_TTL`] ticks so that stragglers of the dead page cannot seed a
/// fresh reassembler and burn a second TTL.
#[derive(Debug)]
pub struct Terminal {
    ip: IpAddress,
    input_buffer: PacketBuffer,
    output_buffer: PacketBuffer,
    reassemblers: Vec<PageReassembler>,
    quarantine: Vec<QuarantineEntry>,
    config: TerminalConfig,
    traffic: TrafficConfig,
    counters: TerminalCounters,
    next_page_id: PageId,
}

impl Terminal {
    /// Create a terminal with no autonomous traffic.
    pub fn new(ip: IpAddress, config: TerminalConfig) -> Result<Self, TerminalError> {
        Self::with_traffic(ip, config, TrafficConfig::default())
    }

    /// Create a terminal with the given traffic generation parameters.
    pub fn with_traffic(
        ip: IpAddress,
        config: TerminalConfig,
        traffic: TrafficConfig,
    ) -> Result<Self, TerminalError> {
        if !ip.is_valid() || ip.is_router() {
            return Err(TerminalError::NotATerminalAddress { ip });
        }
        Ok(Self {
            ip,
            input_buffer: PacketBuffer::new(config.in_buffer_cap),
            output_buffer: PacketBuffer::new(config.out_buffer_cap),
            reassemblers: Vec::new(),
            quarantine: Vec::new(),
            config,
            traffic,
            counters: TerminalCounters::default(),
            next_page_id: 0,
        })
    }

    /// This terminal's address.
    pub fn ip(&self) -> IpAddress {
        self.ip
    }

    /// The cumulative counters.
    pub fn counters(&self) -> &TerminalCounters {
        &self.counters
    }

    /// The input buffer (packets awaiting reassembly).
    pub fn input_buffer(&self) -> &PacketBuffer {
        &self.input_buffer
    }

    /// The output buffer (packets awaiting hand-off to the router).
    pub fn output_buffer(&self) -> &PacketBuffer {
        &self.output_buffer
    }

    /// Number of pages currently being reassembled.
    pub fn active_reassemblers(&self) -> usize {
        self.reassemblers.len()
    }

    /// Whether the given page id is currently quarantined.
    pub fn is_quarantined(&self, page_id: PageId) -> bool {
        self.quarantine.iter().any(|e| e.page_id == page_id)
    }

    /// Packets sitting in this terminal's buffers.
    pub fn buffered_packets(&self) -> usize {
        self.input_buffer.len() + self.output_buffer.len()
    }

    /// Fragment a fresh page toward `dst` and enqueue every packet.
    ///
    /// The page is sent atomically: if the output buffer cannot take all
    /// `length` packets, none is enqueued, the page counts as dropped, and
    /// `Ok(false)` is returned. The page id is consumed either way.
    ///
    /// Invalid arguments (zero length, invalid destination) abort the
    /// operation with an error instead.
    pub fn send_page(
        &mut self,
        length: usize,
        dst: IpAddress,
        expiry_tick: Tick,
    ) -> Result<bool, PageError> {
        let page_id = self.next_page_id;
        self.next_page_id += 1;

        let page = Page::new(page_id, length, self.ip, dst)?;
        self.counters.packets_generated += length as u64;

        if self.output_buffer.available_space() < length {
            self.counters.pages_dropped += 1;
            self.counters.packets_out_dropped += length as u64;
            trace!(%dst, page_id, length, "page dropped: output buffer full");
            return Ok(false);
        }

        for packet in page.to_packets(expiry_tick) {
            let enqueued = self.output_buffer.enqueue(packet);
            debug_assert!(enqueued, "space was checked before enqueueing");
        }
        self.counters.pages_created += 1;
        self.counters.pages_sent += 1;
        Ok(true)
    }

    /// Accept a packet from the parent router.
    ///
    /// Quarantined pages are refused (counted as timed out); a full input
    /// buffer drops the packet.
    pub fn receive_packet(&mut self, packet: Packet) -> bool {
        self.counters.packets_received += 1;
        if self.is_quarantined(packet.page_id()) {
            self.counters.packets_in_timed_out += 1;
            return false;
        }
        if !self.input_buffer.enqueue(packet) {
            self.counters.packets_in_dropped += 1;
            return false;
        }
        true
    }

    /// Run one simulation tick.
    ///
    /// Order: traffic generation, quarantine sweep, reassembler sweep,
    /// output drain, input processing. The sweeps run before the processing
    /// stages so that a reassembler expiring this tick is quarantined
    /// before any of its stragglers is classified.
    ///
    /// Returns the packets drained from the output buffer this tick; the
    /// owning router is responsible for receiving them.
    pub fn tick(
        &mut self,
        now: Tick,
        rng: &mut ChaCha8Rng,
        address_book: &[IpAddress],
    ) -> Vec<Packet> {
        self.generate_traffic(now, rng, address_book);
        self.update_quarantine(now);
        self.cleanup_reassemblers(now);
        let outbound = self.process_output_buffer(now);
        self.process_input_buffer(now);
        outbound
    }

    /// Drain up to `output_bw` packets from the output buffer.
    ///
    /// Expired packets are discarded with accounting; the rest count as
    /// sent, even if the router subsequently drops them, and are returned
    /// for delivery.
    pub fn process_output_buffer(&mut self, now: Tick) -> Vec<Packet> {
        let mut outbound = Vec::new();
        for _ in 0..self.config.output_bw {
            let Ok(packet) = self.output_buffer.dequeue() else {
                break;
            };
            if packet.is_expired(now) {
                self.counters.packets_out_timed_out += 1;
                continue;
            }
            self.counters.packets_sent += 1;
            outbound.push(packet);
        }
        outbound
    }

    /// Process up to `in_proc_cap` packets from the input buffer into
    /// reassemblers. Returns the number of packets dequeued.
    pub fn process_input_buffer(&mut self, now: Tick) -> usize {
        let mut processed = 0;
        while processed < self.config.in_proc_cap {
            let Ok(packet) = self.input_buffer.dequeue() else {
                break;
            };
            processed += 1;

            if packet.is_expired(now) {
                self.counters.packets_in_timed_out += 1;
                continue;
            }
            if packet.dst() != self.ip {
                self.counters.packets_in_dropped += 1;
                continue;
            }

            let index = match self
                .reassemblers
                .iter()
                .position(|r| r.page_id() == packet.page_id())
            {
                Some(index) => {
                    if self.reassemblers[index].total() != packet.page_len() {
                        // A page id reused with a different length: treat
                        // the straggler like leftovers of a dead page.
                        self.counters.packets_in_timed_out += 1;
                        continue;
                    }
                    index
                }
                None => {
                    let reassembler = PageReassembler::new(
                        packet.page_id(),
                        packet.page_len(),
                        now + MAX_ASSEMBLER_TTL,
                    )
                    .expect("packet page length is positive");
                    self.reassemblers.push(reassembler);
                    self.reassemblers.len() - 1
                }
            };

            if !self.reassemblers[index].add_packet(packet) {
                self.counters.packets_in_dropped += 1;
                continue;
            }

            if self.reassemblers[index].is_complete() {
                let total = self.reassemblers[index].total();
                let packets = self.reassemblers[index]
                    .package()
                    .expect("reassembler is complete");
                let page = Page::from_packets(&packets).expect("packaged packets form a valid page");
                debug!(ip = %self.ip, page_id = page.page_id(), src = %page.src(), "page completed");

                self.counters.pages_completed += 1;
                self.counters.packets_succ_processed += total as u64;
                self.reassemblers.remove(index);
            }
        }
        processed
    }

    /// Sweep expired reassemblers, quarantining their page ids.
    pub fn cleanup_reassemblers(&mut self, now: Tick) {
        let Self {
            ip,
            reassemblers,
            quarantine,
            counters,
            ..
        } = self;
        reassemblers.retain(|reassembler| {
            if !reassembler.is_expired(now) {
                return true;
            }
            counters.pages_timed_out += 1;
            counters.packets_in_timed_out += reassembler.received() as u64;
            quarantine.push(QuarantineEntry {
                page_id: reassembler.page_id(),
                expiry_tick: now + PACKET_TTL,
            });
            debug!(
                ip = %ip,
                page_id = reassembler.page_id(),
                received = reassembler.received(),
                total = reassembler.total(),
                "page timed out, quarantined"
            );
            false
        });
    }

    /// Drop quarantine entries whose silence window has elapsed.
    pub fn update_quarantine(&mut self, now: Tick) {
        self.quarantine.retain(|entry| entry.expiry_tick > now);
    }

    /// With per-tick probability, emit one page toward a random peer.
    fn generate_traffic(&mut self, now: Tick, rng: &mut ChaCha8Rng, address_book: &[IpAddress]) {
        if self.traffic.probability <= 0.0 {
            return;
        }
        if rng.gen::<f64>() >= self.traffic.probability {
            return;
        }
        let candidates: Vec<IpAddress> = address_book
            .iter()
            .copied()
            .filter(|&ip| ip != self.ip)
            .collect();
        if candidates.is_empty() {
            return;
        }
        let dst = candidates[rng.gen_range(0..candidates.len())];
        let length = rng.gen_range(1..=self.traffic.max_page_len.max(1));
        if let Ok(sent) = self.send_page(length, dst, now + PACKET_TTL) {
            trace!(ip = %self.ip, %dst, length, sent, "traffic generated");
        }
    }
}
