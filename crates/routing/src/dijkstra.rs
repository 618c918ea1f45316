//! Shortest-path computation over the router graph.

use pagenet_core::Router;
use pagenet_types::{IpAddress, RoutingTable};
use std::collections::BTreeMap;

/// Errors raised by route computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DijkstraError {
    /// The source address is not in the router list.
    #[error("source router {ip} not found")]
    SourceNotFound {
        /// The missing address.
        ip: IpAddress,
    },
}

const INF: u64 = u64::MAX;

/// Compute the next-hop table for one source router.
///
/// Classic Dijkstra over the bidirectional neighbor relation, with the
/// live output-buffer occupancy toward each neighbor as the edge weight.
/// Unreachable routers get no entry. Ties between equal distances resolve
/// to the lowest router index; callers must not depend on tie order.
pub fn compute_routing_table(
    routers: &[Router],
    source_ip: IpAddress,
) -> Result<RoutingTable, DijkstraError> {
    let index_by_ip: BTreeMap<IpAddress, usize> = routers
        .iter()
        .enumerate()
        .map(|(index, router)| (router.ip(), index))
        .collect();
    let source = *index_by_ip
        .get(&source_ip)
        .ok_or(DijkstraError::SourceNotFound { ip: source_ip })?;

    let mut distance = vec![INF; routers.len()];
    let mut parent: Vec<Option<usize>> = vec![None; routers.len()];
    let mut visited = vec![false; routers.len()];
    distance[source] = 0;
    parent[source] = Some(source);

    // Select-unvisited-minimum loop; linear scan is plenty for the graph
    // sizes an 8-bit router id allows.
    while let Some(current) = (0..routers.len())
        .filter(|&i| !visited[i] && distance[i] != INF)
        .min_by_key(|&i| distance[i])
    {
        visited[current] = true;

        for neighbor_ip in routers[current].neighbor_ips() {
            let Some(&neighbor) = index_by_ip.get(&neighbor_ip) else {
                // Link to a router outside the list; nothing to relax.
                continue;
            };
            if visited[neighbor] {
                continue;
            }
            let weight = routers[current].neighbor_buffer_usage(neighbor_ip) as u64;
            let candidate = distance[current].saturating_add(weight);
            if candidate < distance[neighbor] {
                distance[neighbor] = candidate;
                parent[neighbor] = Some(current);
            }
        }
    }

    let mut table = RoutingTable::new();
    for target in 0..routers.len() {
        if target == source || distance[target] == INF {
            continue;
        }
        // Walk the parent chain back toward the source; the node just
        // before the source is the next hop for this target.
        let mut hop = target;
        while let Some(p) = parent[hop] {
            if p == source {
                break;
            }
            hop = p;
        }
        table.set_next_hop(routers[target].ip(), routers[hop].ip());
    }
    Ok(table)
}

/// Compute one table per router, in router-list order.
pub fn compute_all_routing_tables(routers: &[Router]) -> Result<Vec<RoutingTable>, DijkstraError> {
    routers
        .iter()
        .map(|router| compute_routing_table(routers, router.ip()))
        .collect()
}
