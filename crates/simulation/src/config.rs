//! Simulation configuration.

use pagenet_core::{RouterConfig, TerminalConfig};

/// Configuration for a randomly generated [`Network`](crate::Network).
///
/// The topology is connected by construction: a random spanning tree links
/// every router, and `complexity` extra link attempts per router add
/// redundancy on top.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Number of routers, with addresses `0.0` through `(router_count-1).0`.
    pub router_count: u8,
    /// Terminals per router, with terminal ids `1..=max_terminal_count`.
    pub max_terminal_count: u8,
    /// Extra random link attempts per router beyond the spanning tree.
    /// Self-links and duplicates are silently ignored.
    pub complexity: usize,
    /// Per-tick probability that a terminal emits one page.
    pub traffic_probability: f64,
    /// Generated page lengths are drawn uniformly from `1..=max_page_len`.
    pub max_page_len: usize,
    /// Seed for the random stream. Same seed, same run.
    pub seed: u64,
    /// Buffer and bandwidth settings applied to every router.
    pub router_config: RouterConfig,
    /// Buffer and bandwidth settings applied to every terminal.
    pub terminal_config: TerminalConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            router_count: 10,
            max_terminal_count: 4,
            complexity: 2,
            traffic_probability: 0.1,
            max_page_len: 8,
            seed: 0,
            router_config: RouterConfig::default(),
            terminal_config: TerminalConfig::default(),
        }
    }
}

impl NetworkConfig {
    /// Set the number of routers.
    pub fn with_router_count(mut self, router_count: u8) -> Self {
        self.router_count = router_count;
        self
    }

    /// Set the number of terminals per router.
    pub fn with_terminal_count(mut self, max_terminal_count: u8) -> Self {
        self.max_terminal_count = max_terminal_count;
        self
    }

    /// Set the number of extra link attempts per router.
    pub fn with_complexity(mut self, complexity: usize) -> Self {
        self.complexity = complexity;
        self
    }

    /// Set the per-tick traffic probability.
    pub fn with_traffic_probability(mut self, traffic_probability: f64) -> Self {
        self.traffic_probability = traffic_probability;
        self
    }

    /// Set the maximum generated page length.
    pub fn with_max_page_len(mut self, max_page_len: usize) -> Self {
        self.max_page_len = max_page_len;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
