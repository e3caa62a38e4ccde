// Relace: Rewiring Leaf-Spine Fabrics with Minimal Cable Churn
// Copyright (C) 2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # ECMP route computation
//!
//! Given a [`Fabric`], compute an egress port on every non-host switch for every host
//! destination. The rule is tier-specific:
//!
//! - **Edge**: directly attached hosts leave through the first port of that adjacency; all other
//!   hosts are spread round-robin over the contiguous uplink port tail.
//! - **Agg**: hosts of the own pod (reachable via one edge-tier hop) leave through the first
//!   port towards that edge switch; all others round-robin over the uplinks.
//! - **Core**: the fabric is symmetric below the core, so per-flow ECMP is simulated by picking
//!   a uniformly random port among all ports towards aggs that cover the host.
//!
//! The router never mutates the fabric; it writes into an owned [`RoutingTable`] and returns it.
//! The random choice at the core tier comes from an injectable RNG, so a fixed seed makes the
//! whole computation deterministic.

use crate::fabric::{Fabric, Port, SwitchId, Tier};

use log::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// # Routing table
///
/// The nested forwarding map `switch -> host -> egress port`, as produced by [`EcmpRouter`].
/// Only non-host switches have entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<SwitchId, HashMap<SwitchId, Port>>,
}

impl RoutingTable {
    /// The egress port on `switch` towards `host`, if one was computed.
    pub fn egress(&self, switch: SwitchId, host: SwitchId) -> Option<Port> {
        self.routes.get(&switch).and_then(|r| r.get(&host)).copied()
    }

    /// All entries of one switch.
    pub fn switch_routes(&self, switch: SwitchId) -> Option<&HashMap<SwitchId, Port>> {
        self.routes.get(&switch)
    }

    /// Number of switches with at least one entry.
    pub fn num_switches(&self) -> usize {
        self.routes.len()
    }

    fn insert(&mut self, switch: SwitchId, host: SwitchId, port: Port) {
        self.routes.entry(switch).or_insert_with(HashMap::new).insert(host, port);
    }
}

/// # ECMP Router
///
/// Stateless apart from its RNG: every call to [`EcmpRouter::routes`] recomputes the full table
/// from the fabric. Construct with a seed for deterministic results.
pub struct EcmpRouter {
    rng: StdRng,
}

impl fmt::Debug for EcmpRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcmpRouter")
    }
}

impl EcmpRouter {
    /// Create a new router. With `Some(seed)`, core-tier choices are reproducible; with `None`,
    /// the RNG is seeded from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Compute the full routing table for the fabric.
    pub fn routes(&mut self, fabric: &Fabric) -> RoutingTable {
        let mut table = RoutingTable::default();
        let pods = agg_pods(fabric);
        self.route_edge_tier(fabric, &mut table);
        self.route_agg_tier(fabric, &pods, &mut table);
        self.route_core_tier(fabric, &pods, &mut table);
        table
    }

    fn route_edge_tier(&mut self, fabric: &Fabric, table: &mut RoutingTable) {
        for &e in fabric.get_tier(Tier::Edge) {
            let sw = fabric.get_switch(e).unwrap();
            let up_ports = sw.uplink_ports();
            let mut counter = 0;
            for &h in fabric.get_tier(Tier::Host) {
                if let Some(ports) = sw.ports_to(h) {
                    table.insert(e, h, ports[0]);
                } else if up_ports.is_empty() {
                    warn!("edge switch {} has no uplinks, cannot reach host {}", e, h);
                } else {
                    table.insert(e, h, up_ports[counter % up_ports.len()]);
                    counter += 1;
                }
            }
        }
    }

    fn route_agg_tier(&mut self, fabric: &Fabric, pods: &PodMap, table: &mut RoutingTable) {
        for &a in fabric.get_tier(Tier::Agg) {
            let sw = fabric.get_switch(a).unwrap();
            let pod = &pods[&a];
            let up_ports = sw.uplink_ports();
            let mut counter = 0;
            for &h in fabric.get_tier(Tier::Host) {
                if let Some(&e) = pod.get(&h) {
                    if let Some(ports) = sw.ports_to(e) {
                        table.insert(a, h, ports[0]);
                    }
                } else if up_ports.is_empty() {
                    warn!("agg switch {} has no uplinks, cannot reach host {}", a, h);
                } else {
                    table.insert(a, h, up_ports[counter % up_ports.len()]);
                    counter += 1;
                }
            }
        }
    }

    fn route_core_tier(&mut self, fabric: &Fabric, pods: &PodMap, table: &mut RoutingTable) {
        for &c in fabric.get_tier(Tier::Core) {
            let sw = fabric.get_switch(c).unwrap();
            for &h in fabric.get_tier(Tier::Host) {
                // every port towards an agg that covers the host is an equal-cost option
                let mut opt_ports: Vec<Port> = Vec::new();
                for a in sw.neighbors() {
                    if fabric.get_switch(a).map(|s| s.tier()) != Some(Tier::Agg) {
                        continue;
                    }
                    if pods.get(&a).map_or(false, |pod| pod.contains_key(&h)) {
                        if let Some(ports) = sw.ports_to(a) {
                            opt_ports.extend_from_slice(ports);
                        }
                    }
                }
                match opt_ports.choose(&mut self.rng) {
                    Some(&p) => table.insert(c, h, p),
                    None => warn!("core switch {} has no path to host {}", c, h),
                }
            }
        }
    }
}

type PodMap = HashMap<SwitchId, BTreeMap<SwitchId, SwitchId>>;

/// For every agg switch, the hosts of its pod with the edge switch they are attached to.
fn agg_pods(fabric: &Fabric) -> PodMap {
    let mut pods = PodMap::new();
    for &a in fabric.get_tier(Tier::Agg) {
        let sw = fabric.get_switch(a).unwrap();
        let mut pod = BTreeMap::new();
        for e in sw.neighbors() {
            let esw = match fabric.get_switch(e) {
                Some(s) if s.tier() == Tier::Edge => s,
                _ => continue,
            };
            for h in esw.neighbors() {
                if fabric.get_switch(h).map(|s| s.tier()) == Some(Tier::Host) {
                    pod.insert(h, e);
                }
            }
        }
        pods.insert(a, pod);
    }
    pods
}
