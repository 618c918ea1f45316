//! The simulated universe.

use crate::{NetworkConfig, NetworkStats};
use pagenet_core::{Router, RouterError, Terminal, TrafficConfig};
use pagenet_routing::compute_all_routing_tables;
use pagenet_types::{IpAddress, Tick};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Ticks between routing-table recomputations during [`Network::simulate`].
const ROUTE_RECOMPUTE_INTERVAL: usize = 5;

/// Errors raised while building a [`Network`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// A router or terminal rejected its construction parameters.
    #[error(transparent)]
    Router(#[from] RouterError),
}

/// The owner of the entire simulation: all routers, the tick counter, and
/// the random stream.
///
/// Routers refer to each other by address only; the network resolves
/// addresses when it delivers the packets each router drains toward its
/// neighbors. Time advances strictly one tick at a time, routers are
/// processed in insertion order, and the seeded random stream is the sole
/// source of nondeterminism, so a run is a pure function of its config.
pub struct Network {
    routers: Vec<Router>,
    current_tick: Tick,
    rng: ChaCha8Rng,
    address_book: Vec<IpAddress>,
    config: NetworkConfig,
}

impl Network {
    /// Generate a random network per the config: sequentially addressed
    /// routers with their terminals, a random spanning tree (guaranteeing
    /// connectivity), `complexity` extra link attempts per router, and an
    /// initial routing-table computation.
    pub fn new(config: NetworkConfig) -> Result<Self, NetworkError> {
        let traffic = TrafficConfig {
            probability: config.traffic_probability,
            max_page_len: config.max_page_len,
        };

        let mut routers = Vec::with_capacity(config.router_count as usize);
        for router_id in 0..config.router_count {
            routers.push(Router::with_terminals(
                IpAddress::router(router_id),
                config.max_terminal_count,
                config.router_config,
                config.terminal_config,
                traffic,
            )?);
        }

        let mut network = Self {
            address_book: routers.iter().flat_map(|r| r.terminal_ips()).collect(),
            routers,
            current_tick: 1,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
        };
        network.connect_minimal();
        network.add_additional_connections();
        network.recalculate_all_routes();

        debug!(
            routers = network.routers.len(),
            terminals = network.address_book.len(),
            seed = network.config.seed,
            "network generated"
        );
        Ok(network)
    }

    /// Build a network around a hand-made router list. No links are created
    /// and no routes are computed; the caller wires the topology and calls
    /// [`recalculate_all_routes`](Self::recalculate_all_routes).
    pub fn from_routers(routers: Vec<Router>, config: NetworkConfig) -> Self {
        Self {
            address_book: routers.iter().flat_map(|r| r.terminal_ips()).collect(),
            routers,
            current_tick: 1,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
        }
    }

    // ─── Topology ────────────────────────────────────────────────────────

    /// Random spanning tree: router `i` links to a uniformly random earlier
    /// router, for every `i >= 1`.
    fn connect_minimal(&mut self) {
        for i in 1..self.routers.len() {
            let j = self.rng.gen_range(0..i);
            self.establish_link_by_index(i, j);
        }
    }

    /// `complexity` extra link attempts per router toward uniformly random
    /// partners. Self-links and duplicates are silently ignored.
    fn add_additional_connections(&mut self) {
        if self.config.complexity == 0 || self.routers.is_empty() {
            return;
        }
        for i in 0..self.routers.len() {
            for _ in 0..self.config.complexity {
                let j = self.rng.gen_range(0..self.routers.len());
                self.establish_link_by_index(i, j);
            }
        }
    }

    /// Link two routers by index, in both directions. Returns `false` on a
    /// self-link, an out-of-range index, or an already-present link.
    pub fn establish_link_by_index(&mut self, a: usize, b: usize) -> bool {
        if a == b || a >= self.routers.len() || b >= self.routers.len() {
            return false;
        }
        let ip_a = self.routers[a].ip();
        let ip_b = self.routers[b].ip();
        let forward = self.routers[a].connect_router(ip_b);
        let reverse = self.routers[b].connect_router(ip_a);
        forward && reverse
    }

    /// Link two routers by address, in both directions.
    pub fn establish_link(&mut self, a: IpAddress, b: IpAddress) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.establish_link_by_index(a, b),
            _ => false,
        }
    }

    fn index_of(&self, ip: IpAddress) -> Option<usize> {
        self.routers.iter().position(|r| r.ip() == ip.router_ip())
    }

    // ─── Simulation ──────────────────────────────────────────────────────

    /// Run `ticks` simulation steps, recomputing routes every
    /// [`ROUTE_RECOMPUTE_INTERVAL`] ticks and once more after the loop so
    /// post-run inspection sees tables consistent with the final buffers.
    pub fn simulate(&mut self, ticks: usize) {
        for i in 0..ticks {
            self.tick();
            if i % ROUTE_RECOMPUTE_INTERVAL == 0 {
                self.recalculate_all_routes();
            }
        }
        self.recalculate_all_routes();
    }

    /// Advance the simulation by one tick: every router runs its pipeline
    /// in insertion order, with drained packets delivered to their
    /// neighbors as part of the draining router's stage 1.
    pub fn tick(&mut self) {
        let now = self.current_tick;
        for i in 0..self.routers.len() {
            let outbound = self.routers[i].tick(now, &mut self.rng, &self.address_book);
            for (neighbor, packet) in outbound {
                match self.index_of(neighbor) {
                    Some(j) => {
                        self.routers[j].receive_packet(packet);
                    }
                    None => {
                        trace!(%neighbor, "packet drained toward unknown router");
                    }
                }
            }
        }
        self.current_tick += 1;
    }

    /// Overwrite every router's table with a fresh computation against the
    /// current buffer occupancies.
    pub fn recalculate_all_routes(&mut self) {
        let tables = compute_all_routing_tables(&self.routers)
            .expect("every route source is a router in the list");
        for (router, table) in self.routers.iter_mut().zip(tables) {
            router.set_routing_table(table);
        }
        trace!(tick = self.current_tick, "routing tables recomputed");
    }

    // ─── Inspection ──────────────────────────────────────────────────────

    /// The tick the next [`tick`](Self::tick) call will execute.
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// All routers, in insertion order.
    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    /// A router by address (the terminal byte is ignored).
    pub fn router(&self, ip: IpAddress) -> Option<&Router> {
        self.index_of(ip).map(|i| &self.routers[i])
    }

    /// A router by address, mutably.
    pub fn router_mut(&mut self, ip: IpAddress) -> Option<&mut Router> {
        self.index_of(ip).map(|i| &mut self.routers[i])
    }

    /// A terminal by address.
    pub fn terminal(&self, ip: IpAddress) -> Option<&Terminal> {
        self.router(ip)?.terminal(ip)
    }

    /// A terminal by address, mutably.
    pub fn terminal_mut(&mut self, ip: IpAddress) -> Option<&mut Terminal> {
        self.router_mut(ip)?.terminal_mut(ip)
    }

    /// Every terminal address in the network.
    pub fn address_book(&self) -> &[IpAddress] {
        &self.address_book
    }

    /// The configuration this network was built from.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Snapshot every counter, summed across routers and terminals.
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            current_tick: self.current_tick - 1,
            ..NetworkStats::default()
        };
        for router in &self.routers {
            stats.total_routers += 1;
            stats.total_terminals += router.terminal_count() as u64;

            let counters = router.counters();
            stats.packets_dropped += counters.packets_dropped;
            stats.packets_timed_out += counters.packets_timed_out;
            stats.packets_in_flight += router.buffered_packets() as u64;

            for terminal in router.terminals() {
                let counters = terminal.counters();
                stats.pages_created += counters.pages_created;
                stats.pages_dropped += counters.pages_dropped;
                stats.pages_completed += counters.pages_completed;
                stats.pages_timed_out += counters.pages_timed_out;
                stats.packets_generated += counters.packets_generated;
                stats.packets_sent += counters.packets_sent;
                stats.packets_delivered += counters.packets_succ_processed;
                stats.packets_dropped +=
                    counters.packets_in_dropped + counters.packets_out_dropped;
                stats.packets_timed_out +=
                    counters.packets_in_timed_out + counters.packets_out_timed_out;
                stats.packets_in_flight += terminal.buffered_packets() as u64;
            }
        }
        stats
    }
}
