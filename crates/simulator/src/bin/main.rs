//! pagenet Simulator CLI
//!
//! Run deterministic packet-network simulations with configurable
//! topology and traffic parameters.
//!
//! # Example
//!
//! ```bash
//! # Run a deterministic simulation with a fixed seed
//! pagenet-sim --seed 42 -r 10 -t 4 -d 200
//!
//! # Heavier traffic on a denser graph, machine-readable output
//! pagenet-sim -r 20 -c 3 -p 0.4 --json
//! ```

use clap::Parser;
use pagenet_simulation::NetworkConfig;
use pagenet_simulator::Simulator;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// pagenet Simulator
///
/// Runs deterministic packet-network simulations. Single-threaded,
/// reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "pagenet-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of routers
    #[arg(short = 'r', long, default_value = "10")]
    routers: u8,

    /// Number of terminals per router
    #[arg(short = 't', long, default_value = "4")]
    terminals: u8,

    /// Extra random link attempts per router beyond the spanning tree
    #[arg(short = 'c', long, default_value = "2")]
    complexity: usize,

    /// Per-tick probability that a terminal emits a page (0.0-1.0)
    #[arg(short = 'p', long, default_value = "0.1")]
    probability: f64,

    /// Maximum page length in packets
    #[arg(long, default_value = "8")]
    max_page_len: usize,

    /// Simulation duration in ticks
    #[arg(short = 'd', long, default_value = "100")]
    ticks: usize,

    /// Ticks between progress reports (0 disables them)
    #[arg(long, default_value = "10")]
    report_interval: usize,

    /// Random seed for reproducible results. When omitted, a random seed
    /// is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Emit the final report as JSON instead of the human summary
    #[arg(long)]
    json: bool,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,pagenet_simulator=info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    info!(
        routers = args.routers,
        terminals = args.terminals,
        complexity = args.complexity,
        probability = args.probability,
        max_page_len = args.max_page_len,
        ticks = args.ticks,
        seed,
        "Starting simulation"
    );

    let config = NetworkConfig::default()
        .with_router_count(args.routers)
        .with_terminal_count(args.terminals)
        .with_complexity(args.complexity)
        .with_traffic_probability(args.probability)
        .with_max_page_len(args.max_page_len)
        .with_seed(seed);

    let mut simulator = Simulator::new(config).expect("failed to create simulator");
    let report_interval = if args.json { 0 } else { args.report_interval };
    let report = simulator.run_for(args.ticks, report_interval);

    if args.json {
        println!("{}", report.to_json());
    } else {
        println!("\n=== Final Report ===");
        report.print_summary();
    }
}
