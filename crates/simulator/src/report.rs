//! Human- and machine-readable rendering of network statistics.

use pagenet_simulation::NetworkStats;

/// A rendered snapshot of a network's statistics.
#[derive(Debug, Clone)]
pub struct NetworkReport {
    stats: NetworkStats,
}

impl NetworkReport {
    pub(crate) fn new(stats: NetworkStats) -> Self {
        Self { stats }
    }

    /// The underlying statistics snapshot.
    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Print the report to stdout.
    pub fn print_summary(&self) {
        let s = &self.stats;
        println!("=== Network Report (tick {}) ===", s.current_tick);
        println!(
            "Topology:  {} routers, {} terminals",
            s.total_routers, s.total_terminals
        );
        println!("Packets:");
        println!("  generated: {:>8}", s.packets_generated);
        println!("  sent:      {:>8}", s.packets_sent);
        println!("  delivered: {:>8}", s.packets_delivered);
        println!("  dropped:   {:>8}", s.packets_dropped);
        println!("  timed out: {:>8}", s.packets_timed_out);
        println!("  in flight: {:>8}", s.packets_in_flight);
        println!("Pages:");
        println!("  created:   {:>8}", s.pages_created);
        println!("  completed: {:>8}", s.pages_completed);
        println!("  dropped:   {:>8}", s.pages_dropped);
        println!("  timed out: {:>8}", s.pages_timed_out);
        println!("Rates:");
        println!("  delivery:  {:>7.1}%", s.delivery_rate() * 100.0);
        println!("  success:   {:>7.1}%", s.success_rate() * 100.0);
        println!("  drop:      {:>7.1}%", s.drop_rate() * 100.0);
    }

    /// Render the statistics as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self.stats).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.insert("delivery_rate".into(), self.stats.delivery_rate().into());
            object.insert("success_rate".into(), self.stats.success_rate().into());
            object.insert("drop_rate".into(), self.stats.drop_rate().into());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_carries_counters_and_rates() {
        let report = NetworkReport::new(NetworkStats {
            current_tick: 10,
            packets_generated: 4,
            packets_delivered: 2,
            ..NetworkStats::default()
        });
        let json = report.to_json();
        assert_eq!(json["current_tick"], 10);
        assert_eq!(json["packets_generated"], 4);
        assert_eq!(json["delivery_rate"], 0.5);
    }
}
