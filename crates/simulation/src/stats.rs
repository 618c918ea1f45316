//! Aggregated simulation statistics.

use pagenet_types::Tick;
use serde::Serialize;

/// A point-in-time snapshot of every counter in the network, summed across
/// all routers and terminals.
///
/// The raw counters are authoritative; the rate methods are convenience
/// ratios and consumers are free to derive their own.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    /// The last completed tick.
    pub current_tick: Tick,
    /// Number of routers.
    pub total_routers: u64,
    /// Number of terminals across all routers.
    pub total_terminals: u64,
    /// Packets produced by fragmentation at any terminal.
    pub packets_generated: u64,
    /// Packets handed by terminals to their routers.
    pub packets_sent: u64,
    /// Packets that ended up in a completed page.
    pub packets_delivered: u64,
    /// Packets lost to buffer overflow, missing routes or misdelivery.
    pub packets_dropped: u64,
    /// Packets lost to TTL expiry anywhere in the system.
    pub packets_timed_out: u64,
    /// Packets currently sitting in some buffer.
    pub packets_in_flight: u64,
    /// Pages successfully fragmented and enqueued.
    pub pages_created: u64,
    /// Pages dropped whole at send time.
    pub pages_dropped: u64,
    /// Pages fully reassembled at their destination.
    pub pages_completed: u64,
    /// Pages whose reassembly timed out.
    pub pages_timed_out: u64,
}

impl NetworkStats {
    /// Delivered packets over generated packets (1.0 when nothing was
    /// generated).
    pub fn delivery_rate(&self) -> f64 {
        if self.packets_generated == 0 {
            1.0
        } else {
            self.packets_delivered as f64 / self.packets_generated as f64
        }
    }

    /// Completed pages over created pages (1.0 when nothing was created).
    pub fn success_rate(&self) -> f64 {
        if self.pages_created == 0 {
            1.0
        } else {
            self.pages_completed as f64 / self.pages_created as f64
        }
    }

    /// Dropped packets over generated packets (0.0 when nothing was
    /// generated).
    pub fn drop_rate(&self) -> f64 {
        if self.packets_generated == 0 {
            0.0
        } else {
            self.packets_dropped as f64 / self.packets_generated as f64
        }
    }
}
