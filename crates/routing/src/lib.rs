//! Load-aware route computation.
//!
//! Routes are recomputed from scratch against the live router list: the
//! weight of the edge from router A to neighbor B is the number of packets
//! A currently has queued toward B. Congested links therefore repel
//! traffic, and the resulting next-hop tables shift load across the graph
//! as buffers fill and drain.

mod dijkstra;

pub use dijkstra::{compute_all_routing_tables, compute_routing_table, DijkstraError};
