//! Admin layer for the pagenet network simulator.
//!
//! Wraps [`pagenet_simulation::Network`] with the administrative loop:
//! run a simulation for a number of ticks, print a report at a fixed
//! interval, and render the final statistics for humans or machines.
//!
//! # Example
//!
//! ```ignore
//! use pagenet_simulation::NetworkConfig;
//! use pagenet_simulator::Simulator;
//!
//! let mut simulator = Simulator::new(NetworkConfig::default().with_seed(42))?;
//! let report = simulator.run_for(100, 10);
//! report.print_summary();
//! ```

mod report;
mod runner;

pub use report::NetworkReport;
pub use runner::Simulator;
