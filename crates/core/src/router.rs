//! The four-stage per-tick forwarding pipeline.

use crate::{PacketBuffer, Terminal, TerminalConfig, TrafficConfig};
use pagenet_types::{IpAddress, Packet, RoutingTable, Tick};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::trace;

/// Buffer and bandwidth configuration for a [`Router`].
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Input buffer capacity (0 = unbounded).
    pub in_buffer_cap: usize,
    /// Packets routed from the input buffer per tick.
    pub in_proc_cap: usize,
    /// Local-delivery buffer capacity (0 = unbounded).
    pub loc_buffer_cap: usize,
    /// Packets delivered to local terminals per tick.
    pub loc_bw: usize,
    /// Capacity of each neighbor output buffer (0 = unbounded).
    pub out_buffer_cap: usize,
    /// Packets drained toward each neighbor per tick.
    pub out_bw: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            in_buffer_cap: 200,
            in_proc_cap: 10,
            loc_buffer_cap: 200,
            loc_bw: 10,
            out_buffer_cap: 50,
            out_bw: 5,
        }
    }
}

/// Cumulative event counters of a [`Router`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RouterCounters {
    /// Packets offered to this router.
    pub packets_received: u64,
    /// Packets lost to buffer overflow or a missing route.
    pub packets_dropped: u64,
    /// Packets discarded because their TTL elapsed here.
    pub packets_timed_out: u64,
    /// Packets handed to a neighbor router.
    pub packets_forwarded: u64,
    /// Packets handed to a local terminal.
    pub packets_delivered: u64,
}

/// Errors raised when constructing a [`Router`] or attaching a terminal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// The router address carried a nonzero terminal byte.
    #[error("{ip} is not a router address")]
    NotARouterAddress {
        /// The offending address.
        ip: IpAddress,
    },

    /// A terminal with the same address is already attached.
    #[error("terminal {ip} already connected")]
    DuplicateTerminal {
        /// The duplicate address.
        ip: IpAddress,
    },

    /// The terminal's router byte does not match this router.
    #[error("terminal {terminal} does not belong to router {router}")]
    ForeignTerminal {
        /// The terminal's address.
        terminal: IpAddress,
        /// This router's address.
        router: IpAddress,
    },
}

/// A link to a neighbor router with its dedicated output queue.
///
/// The neighbor is identified by address only; the simulation harness
/// resolves addresses to routers when it delivers drained packets. Cycles
/// in the router graph are therefore just data.
#[derive(Debug)]
struct NeighborConnection {
    neighbor: IpAddress,
    output_buffer: PacketBuffer,
}

/// A packet switch owning a set of terminals and links to its neighbors.
///
/// Each tick runs four stages in fixed order:
///
/// 1. drain every neighbor output buffer (up to `out_bw` packets each)
/// 2. deliver from the local buffer to owned terminals (up to `loc_bw`)
/// 3. tick every terminal, absorbing their outbound packets
/// 4. route packets from the input buffer (up to `in_proc_cap`)
///
/// Draining toward the outside first frees neighbor-output capacity, local
/// delivery frees the local buffer, terminals then emit new traffic into
/// the input buffer, and finally newly arrived packets are routed. A packet
/// received in tick T is never forwarded within tick T.
#[derive(Debug)]
pub struct Router {
    ip: IpAddress,
    input_buffer: PacketBuffer,
    local_buffer: PacketBuffer,
    terminals: BTreeMap<IpAddress, Terminal>,
    connections: Vec<NeighborConnection>,
    routing_table: RoutingTable,
    config: RouterConfig,
    counters: RouterCounters,
}

impl Router {
    /// Create a router with no terminals.
    pub fn new(ip: IpAddress, config: RouterConfig) -> Result<Self, RouterError> {
        if !ip.is_router() {
            return Err(RouterError::NotARouterAddress { ip });
        }
        Ok(Self {
            ip,
            input_buffer: PacketBuffer::new(config.in_buffer_cap),
            local_buffer: PacketBuffer::new(config.loc_buffer_cap),
            terminals: BTreeMap::new(),
            connections: Vec::new(),
            routing_table: RoutingTable::new(),
            config,
            counters: RouterCounters::default(),
        })
    }

    /// Create a router owning `terminal_count` terminals with sequential
    /// terminal ids `1..=terminal_count`.
    pub fn with_terminals(
        ip: IpAddress,
        terminal_count: u8,
        config: RouterConfig,
        terminal_config: TerminalConfig,
        traffic: TrafficConfig,
    ) -> Result<Self, RouterError> {
        let mut router = Self::new(ip, config)?;
        for terminal_id in 1..=terminal_count {
            let terminal_ip = IpAddress::new(ip.router_id(), terminal_id);
            let terminal = Terminal::with_traffic(terminal_ip, terminal_config, traffic)
                .expect("terminal ids starting at 1 are valid");
            router.connect_terminal(terminal)?;
        }
        Ok(router)
    }

    /// This router's address.
    pub fn ip(&self) -> IpAddress {
        self.ip
    }

    /// The cumulative counters.
    pub fn counters(&self) -> &RouterCounters {
        &self.counters
    }

    /// The input buffer.
    pub fn input_buffer(&self) -> &PacketBuffer {
        &self.input_buffer
    }

    /// The local-delivery buffer.
    pub fn local_buffer(&self) -> &PacketBuffer {
        &self.local_buffer
    }

    /// Replace the routing table (typically after a Dijkstra run).
    pub fn set_routing_table(&mut self, table: RoutingTable) {
        self.routing_table = table;
    }

    /// The current routing table.
    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    // ─── Connection management ───────────────────────────────────────────

    /// Attach a terminal, taking ownership.
    ///
    /// Fails if a terminal with the same address is already attached or the
    /// terminal's router byte does not match this router.
    pub fn connect_terminal(&mut self, terminal: Terminal) -> Result<(), RouterError> {
        let terminal_ip = terminal.ip();
        if terminal_ip.router_id() != self.ip.router_id() {
            return Err(RouterError::ForeignTerminal {
                terminal: terminal_ip,
                router: self.ip,
            });
        }
        if self.terminals.contains_key(&terminal_ip) {
            return Err(RouterError::DuplicateTerminal { ip: terminal_ip });
        }
        self.terminals.insert(terminal_ip, terminal);
        Ok(())
    }

    /// Link this router to a neighbor, creating the output buffer for it.
    ///
    /// Self-links and duplicates return `false` without side effects. The
    /// reverse direction is the caller's responsibility.
    pub fn connect_router(&mut self, neighbor: IpAddress) -> bool {
        if neighbor == self.ip || self.is_connected_to(neighbor) {
            return false;
        }
        self.connections.push(NeighborConnection {
            neighbor,
            output_buffer: PacketBuffer::toward(neighbor, self.config.out_buffer_cap),
        });
        true
    }

    /// Remove the link to a neighbor, discarding its queued packets.
    pub fn disconnect_router(&mut self, neighbor: IpAddress) -> bool {
        match self.connections.iter().position(|c| c.neighbor == neighbor) {
            Some(index) => {
                self.connections.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether a link to the given neighbor exists.
    pub fn is_connected_to(&self, neighbor: IpAddress) -> bool {
        self.connections.iter().any(|c| c.neighbor == neighbor)
    }

    /// Addresses of all linked neighbors, in link order.
    pub fn neighbor_ips(&self) -> Vec<IpAddress> {
        self.connections.iter().map(|c| c.neighbor).collect()
    }

    /// Packets currently queued toward the given neighbor (0 if unknown).
    ///
    /// This live occupancy is the edge weight used by route computation.
    pub fn neighbor_buffer_usage(&self, neighbor: IpAddress) -> usize {
        self.connections
            .iter()
            .find(|c| c.neighbor == neighbor)
            .map(|c| c.output_buffer.len())
            .unwrap_or(0)
    }

    /// Addresses of all owned terminals, in address order.
    pub fn terminal_ips(&self) -> Vec<IpAddress> {
        self.terminals.keys().copied().collect()
    }

    /// Number of owned terminals.
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// A terminal by address.
    pub fn terminal(&self, ip: IpAddress) -> Option<&Terminal> {
        self.terminals.get(&ip)
    }

    /// A terminal by address, mutably.
    pub fn terminal_mut(&mut self, ip: IpAddress) -> Option<&mut Terminal> {
        self.terminals.get_mut(&ip)
    }

    /// Iterate over the owned terminals in address order.
    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.terminals.values()
    }

    /// Packets sitting in this router's buffers, its terminals excluded.
    pub fn buffered_packets(&self) -> usize {
        self.input_buffer.len()
            + self.local_buffer.len()
            + self
                .connections
                .iter()
                .map(|c| c.output_buffer.len())
                .sum::<usize>()
    }

    // ─── Packet reception and pipeline ───────────────────────────────────

    /// Accept a packet from a terminal or a neighbor router.
    pub fn receive_packet(&mut self, packet: Packet) -> bool {
        self.counters.packets_received += 1;
        if !self.input_buffer.enqueue(packet) {
            self.counters.packets_dropped += 1;
            trace!(ip = %self.ip, ?packet, "packet dropped: input buffer full");
            return false;
        }
        true
    }

    /// Stage 1: drain up to `out_bw` packets per neighbor output buffer.
    ///
    /// Expired packets are discarded with accounting. The rest count as
    /// forwarded (receiver-side drops are the receiver's business) and
    /// are returned as `(neighbor, packet)` pairs for the harness to
    /// deliver.
    pub fn drain_output_buffers(&mut self, now: Tick) -> Vec<(IpAddress, Packet)> {
        let mut outbound = Vec::new();
        for connection in &mut self.connections {
            for _ in 0..self.config.out_bw {
                let Ok(packet) = connection.output_buffer.dequeue() else {
                    break;
                };
                if packet.is_expired(now) {
                    self.counters.packets_timed_out += 1;
                    continue;
                }
                self.counters.packets_forwarded += 1;
                outbound.push((connection.neighbor, packet));
            }
        }
        outbound
    }

    /// Stage 2: deliver up to `loc_bw` packets to owned terminals.
    pub fn process_local_buffer(&mut self, now: Tick) -> usize {
        let mut delivered = 0;
        for _ in 0..self.config.loc_bw {
            let Ok(packet) = self.local_buffer.dequeue() else {
                break;
            };
            if packet.is_expired(now) {
                self.counters.packets_timed_out += 1;
                continue;
            }
            match self.terminals.get_mut(&packet.dst()) {
                Some(terminal) => {
                    terminal.receive_packet(packet);
                    self.counters.packets_delivered += 1;
                    delivered += 1;
                }
                None => {
                    self.counters.packets_dropped += 1;
                    trace!(ip = %self.ip, dst = %packet.dst(), "packet dropped: no such terminal");
                }
            }
        }
        delivered
    }

    /// Stage 3: tick every owned terminal and absorb its outbound packets
    /// into this router's input buffer.
    pub fn tick_terminals(&mut self, now: Tick, rng: &mut ChaCha8Rng, address_book: &[IpAddress]) {
        let mut outbound = Vec::new();
        for terminal in self.terminals.values_mut() {
            outbound.extend(terminal.tick(now, rng, address_book));
        }
        for packet in outbound {
            self.receive_packet(packet);
        }
    }

    /// Stage 4: route up to `in_proc_cap` packets from the input buffer.
    pub fn process_input_buffer(&mut self, now: Tick) -> usize {
        let mut processed = 0;
        while processed < self.config.in_proc_cap {
            let Ok(packet) = self.input_buffer.dequeue() else {
                break;
            };
            processed += 1;
            if packet.is_expired(now) {
                self.counters.packets_timed_out += 1;
                continue;
            }
            self.route_packet(packet);
        }
        processed
    }

    /// Run stages 1–4 in order, returning stage 1's outbound packets.
    pub fn tick(
        &mut self,
        now: Tick,
        rng: &mut ChaCha8Rng,
        address_book: &[IpAddress],
    ) -> Vec<(IpAddress, Packet)> {
        let outbound = self.drain_output_buffers(now);
        self.process_local_buffer(now);
        self.tick_terminals(now, rng, address_book);
        self.process_input_buffer(now);
        outbound
    }

    /// Enqueue one packet toward its destination: the local buffer when the
    /// destination terminal hangs off this router, otherwise the output
    /// buffer of the next hop from the routing table.
    fn route_packet(&mut self, packet: Packet) {
        if packet.dst().router_id() == self.ip.router_id() {
            if !self.local_buffer.enqueue(packet) {
                self.counters.packets_dropped += 1;
                trace!(ip = %self.ip, ?packet, "packet dropped: local buffer full");
            }
            return;
        }

        let Some(next_hop) = self.routing_table.next_hop(packet.dst()) else {
            self.counters.packets_dropped += 1;
            trace!(ip = %self.ip, dst = %packet.dst(), "packet dropped: no route");
            return;
        };
        let Some(connection) = self
            .connections
            .iter_mut()
            .find(|c| c.neighbor == next_hop)
        else {
            self.counters.packets_dropped += 1;
            trace!(ip = %self.ip, %next_hop, "packet dropped: next hop not a neighbor");
            return;
        };
        if !connection.output_buffer.enqueue(packet) {
            self.counters.packets_dropped += 1;
            trace!(ip = %self.ip, %next_hop, "packet dropped: output buffer full");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagenet_types::PageId;
    use rand::SeedableRng;

    fn router(id: u8) -> Router {
        Router::new(IpAddress::router(id), RouterConfig::default()).unwrap()
    }

    fn packet_to(dst: IpAddress, page_id: PageId) -> Packet {
        Packet::new(page_id, 0, 1, IpAddress::new(9, 1), dst, 1_000).unwrap()
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    #[test]
    fn test_rejects_terminal_address() {
        let err = Router::new(IpAddress::new(1, 1), RouterConfig::default()).unwrap_err();
        assert_eq!(
            err,
            RouterError::NotARouterAddress {
                ip: IpAddress::new(1, 1)
            }
        );
    }

    #[test]
    fn test_with_terminals_assigns_sequential_ids() {
        let r = Router::with_terminals(
            IpAddress::router(3),
            4,
            RouterConfig::default(),
            TerminalConfig::default(),
            TrafficConfig::default(),
        )
        .unwrap();
        assert_eq!(
            r.terminal_ips(),
            vec![
                IpAddress::new(3, 1),
                IpAddress::new(3, 2),
                IpAddress::new(3, 3),
                IpAddress::new(3, 4),
            ]
        );
    }

    #[test]
    fn test_connect_terminal_validation() {
        let mut r = router(1);
        let foreign = Terminal::new(IpAddress::new(2, 1), TerminalConfig::default()).unwrap();
        assert!(matches!(
            r.connect_terminal(foreign),
            Err(RouterError::ForeignTerminal { .. })
        ));

        let t = Terminal::new(IpAddress::new(1, 1), TerminalConfig::default()).unwrap();
        r.connect_terminal(t).unwrap();
        let dup = Terminal::new(IpAddress::new(1, 1), TerminalConfig::default()).unwrap();
        assert!(matches!(
            r.connect_terminal(dup),
            Err(RouterError::DuplicateTerminal { .. })
        ));
    }

    #[test]
    fn test_connect_router_rejects_self_and_duplicates() {
        let mut r = router(1);
        assert!(!r.connect_router(IpAddress::router(1)));
        assert!(r.connect_router(IpAddress::router(2)));
        assert!(!r.connect_router(IpAddress::router(2)));
        assert_eq!(r.neighbor_ips(), vec![IpAddress::router(2)]);
    }

    #[test]
    fn test_disconnect_router() {
        let mut r = router(1);
        r.connect_router(IpAddress::router(2));
        assert!(r.disconnect_router(IpAddress::router(2)));
        assert!(!r.disconnect_router(IpAddress::router(2)));
        assert!(r.neighbor_ips().is_empty());
    }

    #[test]
    fn test_receive_packet_overflow() {
        let mut r = Router::new(
            IpAddress::router(1),
            RouterConfig {
                in_buffer_cap: 1,
                ..RouterConfig::default()
            },
        )
        .unwrap();
        assert!(r.receive_packet(packet_to(IpAddress::new(1, 1), 1)));
        assert!(!r.receive_packet(packet_to(IpAddress::new(1, 1), 2)));
        assert_eq!(r.counters().packets_received, 2);
        assert_eq!(r.counters().packets_dropped, 1);
    }

    #[test]
    fn test_local_destination_routed_to_local_buffer() {
        let mut r = router(1);
        let t = Terminal::new(IpAddress::new(1, 1), TerminalConfig::default()).unwrap();
        r.connect_terminal(t).unwrap();

        r.receive_packet(packet_to(IpAddress::new(1, 1), 1));
        r.process_input_buffer(1);
        assert_eq!(r.local_buffer().len(), 1);

        r.process_local_buffer(1);
        assert_eq!(r.counters().packets_delivered, 1);
        let t = r.terminal(IpAddress::new(1, 1)).unwrap();
        assert_eq!(t.counters().packets_received, 1);
    }

    #[test]
    fn test_local_delivery_unknown_terminal_drops() {
        let mut r = router(1);
        r.receive_packet(packet_to(IpAddress::new(1, 7), 1));
        r.process_input_buffer(1);
        r.process_local_buffer(1);
        assert_eq!(r.counters().packets_dropped, 1);
        assert_eq!(r.counters().packets_delivered, 0);
    }

    #[test]
    fn test_remote_destination_uses_routing_table() {
        let mut r = router(1);
        r.connect_router(IpAddress::router(2));
        let mut table = RoutingTable::new();
        table.set_next_hop(IpAddress::router(3), IpAddress::router(2));
        r.set_routing_table(table);

        r.receive_packet(packet_to(IpAddress::new(3, 1), 1));
        r.process_input_buffer(1);
        assert_eq!(r.neighbor_buffer_usage(IpAddress::router(2)), 1);
    }

    #[test]
    fn test_missing_route_drops() {
        let mut r = router(1);
        r.connect_router(IpAddress::router(2));
        r.receive_packet(packet_to(IpAddress::new(3, 1), 1));
        r.process_input_buffer(1);
        assert_eq!(r.counters().packets_dropped, 1);
        assert_eq!(r.neighbor_buffer_usage(IpAddress::router(2)), 0);
    }

    #[test]
    fn test_route_to_non_neighbor_drops() {
        let mut r = router(1);
        r.connect_router(IpAddress::router(2));
        let mut table = RoutingTable::new();
        table.set_next_hop(IpAddress::router(3), IpAddress::router(4));
        r.set_routing_table(table);

        r.receive_packet(packet_to(IpAddress::new(3, 1), 1));
        r.process_input_buffer(1);
        assert_eq!(r.counters().packets_dropped, 1);
    }

    #[test]
    fn test_drain_respects_bandwidth_per_neighbor() {
        let mut r = Router::new(
            IpAddress::router(1),
            RouterConfig {
                out_bw: 2,
                ..RouterConfig::default()
            },
        )
        .unwrap();
        r.connect_router(IpAddress::router(2));
        r.connect_router(IpAddress::router(3));

        let mut table = RoutingTable::new();
        table.set_next_hop(IpAddress::router(2), IpAddress::router(2));
        table.set_next_hop(IpAddress::router(3), IpAddress::router(3));
        r.set_routing_table(table);

        for page_id in 0..3 {
            r.receive_packet(packet_to(IpAddress::new(2, 1), page_id));
            r.receive_packet(packet_to(IpAddress::new(3, 1), 100 + page_id));
        }
        r.process_input_buffer(1);

        let outbound = r.drain_output_buffers(1);
        // Two per neighbor despite three queued toward each.
        assert_eq!(outbound.len(), 4);
        assert_eq!(r.counters().packets_forwarded, 4);
        assert_eq!(r.neighbor_buffer_usage(IpAddress::router(2)), 1);
        assert_eq!(r.neighbor_buffer_usage(IpAddress::router(3)), 1);
    }

    #[test]
    fn test_drain_discards_expired() {
        let mut r = router(1);
        r.connect_router(IpAddress::router(2));
        let mut table = RoutingTable::new();
        table.set_next_hop(IpAddress::router(2), IpAddress::router(2));
        r.set_routing_table(table);

        let expiring = Packet::new(1, 0, 1, IpAddress::new(9, 1), IpAddress::new(2, 1), 5).unwrap();
        r.receive_packet(expiring);
        r.process_input_buffer(1);

        let outbound = r.drain_output_buffers(5);
        assert!(outbound.is_empty());
        assert_eq!(r.counters().packets_timed_out, 1);
    }

    #[test]
    fn test_received_packet_not_forwarded_same_tick() {
        let mut r = router(1);
        r.connect_router(IpAddress::router(2));
        let mut table = RoutingTable::new();
        table.set_next_hop(IpAddress::router(2), IpAddress::router(2));
        r.set_routing_table(table);

        r.receive_packet(packet_to(IpAddress::new(2, 1), 1));
        // Stage 1 runs before stage 4, so the freshly received packet is
        // still in the input buffer when outputs drain.
        let outbound = r.tick(1, &mut rng(), &[]);
        assert!(outbound.is_empty());
        assert_eq!(r.neighbor_buffer_usage(IpAddress::router(2)), 1);

        let outbound = r.tick(2, &mut rng(), &[]);
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].0, IpAddress::router(2));
    }

    #[test]
    fn test_terminal_output_lands_in_input_buffer() {
        let mut r = router(1);
        let mut t = Terminal::new(IpAddress::new(1, 1), TerminalConfig::default()).unwrap();
        t.send_page(2, IpAddress::new(2, 1), 1_000).unwrap();
        r.connect_terminal(t).unwrap();

        r.tick_terminals(1, &mut rng(), &[]);
        assert_eq!(r.input_buffer().len(), 2);
        assert_eq!(r.counters().packets_received, 2);
        let t = r.terminal(IpAddress::new(1, 1)).unwrap();
        assert_eq!(t.counters().packets_sent, 2);
    }
}
