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

//! # Example fabrics
//!
//! Prepared starting topologies for tests and demos.

use crate::fabric::{Fabric, SwitchId, Tier};

/// # Reference fat-tree
///
/// The two-core starting topology used throughout the test suite: hosts `1..=8` (4 ports),
/// edges `9..=12` (4 ports), aggs `13..=16` (5 ports) and cores `17..=18` (6 ports). Each edge
/// switch serves two hosts, each pod has two aggs, and the agg/core wiring is intentionally
/// uneven (2/1 vs 1/2) so that an expansion has something to balance:
///
/// ```text
///            17        18          core
///          / | \     / | \
///        13 14 15 16  (x2/x1)      agg
///        |X|     |X|
///        9 10   11 12              edge
///       /| |\   /| |\
///      1 2 3 4 5 6 7 8             host
/// ```
pub fn reference_fat_tree() -> Fabric {
    let mut net = Fabric::new();

    for sid in 1..=8 {
        net.add_switch(SwitchId(sid), 4, Tier::Host).unwrap();
    }
    for sid in 9..=12 {
        net.add_switch(SwitchId(sid), 4, Tier::Edge).unwrap();
    }
    for sid in 13..=16 {
        net.add_switch(SwitchId(sid), 5, Tier::Agg).unwrap();
    }
    for sid in 17..=18 {
        net.add_switch(SwitchId(sid), 6, Tier::Core).unwrap();
    }

    let host_edge = [(1, 9), (2, 9), (3, 10), (4, 10), (5, 11), (6, 11), (7, 12), (8, 12)];
    let edge_agg = [(13, 9), (14, 9), (13, 10), (14, 10), (15, 11), (16, 11), (15, 12), (16, 12)];
    let agg_core = [
        (13, 17, 2),
        (14, 17, 1),
        (13, 18, 1),
        (14, 18, 2),
        (15, 17, 2),
        (16, 17, 1),
        (15, 18, 1),
        (16, 18, 2),
    ];

    for &(a, b) in host_edge.iter().chain(edge_agg.iter()) {
        net.add_link(SwitchId(a), SwitchId(b), 1).unwrap();
    }
    for &(a, c, count) in agg_core.iter() {
        net.add_link(SwitchId(a), SwitchId(c), count).unwrap();
    }

    net
}
