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

//! Shared helpers for the test modules.

use crate::fabric::{Fabric, Tier, WiringMatrix};
use crate::planner::RewireAction;
use std::collections::HashSet;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// Check the structural invariants of the fabric: port caps, port distinctness, link symmetry
/// and uplink accounting. Panics with a description on any violation.
pub fn check_invariants(fabric: &Fabric) {
    for sw in fabric.switches() {
        assert!(
            sw.nlinks() <= sw.nports(),
            "{} occupies {} of {} ports",
            sw.sid(),
            sw.nlinks(),
            sw.nports()
        );

        let mut seen: HashSet<usize> = HashSet::new();
        let mut total = 0;
        for n in sw.neighbors() {
            let ports = sw.ports_to(n).expect("neighbor without port list");
            assert!(!ports.is_empty(), "ghost adjacency {} -> {}", sw.sid(), n);
            total += ports.len();
            for &p in ports {
                assert!(1 <= p && p <= sw.nports(), "port {} out of range on {}", p, sw.sid());
                assert!(seen.insert(p), "port {} assigned twice on {}", p, sw.sid());
            }
            let peer = fabric.get_switch(n).expect("unknown neighbor");
            assert_eq!(
                ports.len(),
                peer.ports_to(sw.sid()).map(|p| p.len()).unwrap_or(0),
                "asymmetric adjacency {} <-> {}",
                sw.sid(),
                n
            );
            assert_eq!(ports.len(), fabric.multiplicity(sw.sid(), n));
        }
        assert_eq!(total, sw.nlinks(), "nlinks out of sync on {}", sw.sid());

        let expected_uplinks: usize = sw
            .neighbors()
            .filter(|&n| fabric.get_switch(n).unwrap().tier() > sw.tier())
            .map(|n| fabric.multiplicity(sw.sid(), n))
            .sum();
        assert_eq!(sw.uplinks(), expected_uplinks, "uplinks out of sync on {}", sw.sid());
    }
}

/// Check that the routing table is total: every non-host switch has an entry for every host,
/// and every entry is a legal local port.
pub fn check_routing_totality(fabric: &Fabric, routes: &crate::routing::RoutingTable) {
    for tier in &[Tier::Edge, Tier::Agg, Tier::Core] {
        for &s in fabric.get_tier(*tier) {
            let sw = fabric.get_switch(s).unwrap();
            for &h in fabric.get_tier(Tier::Host) {
                let port = routes
                    .egress(s, h)
                    .unwrap_or_else(|| panic!("no route on {} towards {}", s, h));
                assert!(1 <= port && port <= sw.nports(), "illegal port {} on {}", port, s);
            }
        }
    }
}

/// Replay an action list onto a wiring matrix, checking after every single action that no core
/// column exceeds its port budget. Returns the final matrix.
pub fn replay(w0: &WiringMatrix, actions: &[RewireAction], core_ports: &[i64]) -> WiringMatrix {
    let mut w = w0.clone();
    for (step, action) in actions.iter().enumerate() {
        match *action {
            RewireAction::Connect { agg, core } => w[[agg, core]] += 1,
            RewireAction::Disconnect { agg, core } => {
                assert!(w[[agg, core]] > 0, "step {}: disconnect on an empty cell", step);
                w[[agg, core]] -= 1;
            }
        }
        for (j, &cap) in core_ports.iter().enumerate() {
            let used = w.column(j).sum();
            assert!(used <= cap, "step {}: core {} over budget ({} > {})", step, j, used, cap);
        }
    }
    w
}
