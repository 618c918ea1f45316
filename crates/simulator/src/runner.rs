//! The administrative simulation loop.

use crate::NetworkReport;
use pagenet_simulation::{Network, NetworkConfig, NetworkError};
use tracing::info;

/// Drives a [`Network`] for an operator: tick batches, periodic reports,
/// and a final snapshot.
pub struct Simulator {
    network: Network,
}

impl Simulator {
    /// Generate the network described by the config.
    pub fn new(config: NetworkConfig) -> Result<Self, NetworkError> {
        Ok(Self {
            network: Network::new(config)?,
        })
    }

    /// The simulated network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The simulated network, mutably.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Run `ticks` simulation steps, printing a report every
    /// `report_interval` ticks (0 disables progress reports). Returns the
    /// final report.
    pub fn run_for(&mut self, ticks: usize, report_interval: usize) -> NetworkReport {
        for i in 1..=ticks {
            self.network.simulate(1);
            if report_interval > 0 && i % report_interval == 0 {
                self.report().print_summary();
            }
        }
        let report = self.report();
        info!(
            ticks,
            delivered = report.stats().packets_delivered,
            dropped = report.stats().packets_dropped,
            timed_out = report.stats().packets_timed_out,
            "simulation finished"
        );
        report
    }

    /// Snapshot the current statistics.
    pub fn report(&self) -> NetworkReport {
        NetworkReport::new(self.network.stats())
    }
}
