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

use super::utils::{check_invariants, check_routing_totality, init_logger};
use crate::example_fabrics::reference_fat_tree;
use crate::expansion::{host_address, Dataplane, Expander, ExpansionConfig};
use crate::fabric::{Port, SwitchId, Tier};
use crate::planner::{ExpandLevel, PlannerError, RewireAction};
use crate::routing::EcmpRouter;
use crate::Error;
use ndarray::array;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOp {
    Add(SwitchId, SwitchId),
    Del(SwitchId, SwitchId),
}

/// A dataplane that records everything it is told.
#[derive(Debug, Default)]
struct Recorder {
    flows: Vec<(SwitchId, Ipv4Addr, Port, u32)>,
    link_ops: Vec<LinkOp>,
}

impl Dataplane for Recorder {
    fn install_flow(&mut self, switch: SwitchId, dst: Ipv4Addr, out_port: Port, priority: u32) {
        self.flows.push((switch, dst, out_port, priority));
    }
    fn link_add(&mut self, agg: SwitchId, core: SwitchId) {
        self.link_ops.push(LinkOp::Add(agg, core));
    }
    fn link_del(&mut self, agg: SwitchId, core: SwitchId) {
        self.link_ops.push(LinkOp::Del(agg, core));
    }
}

fn config(seed: u64) -> ExpansionConfig {
    ExpansionConfig { rng_seed: Some(seed), ..Default::default() }
}

#[test]
fn adding_a_spine_rebalances_the_wiring() {
    init_logger();
    let mut expander = Expander::new(reference_fat_tree(), Recorder::default(), config(1));
    let actions = expander.expand(ExpandLevel::Spine, 5).unwrap();
    assert_eq!(actions.len(), 8);

    let net = expander.fabric();
    check_invariants(net);

    // the new switch is core number 3 with id 19
    let new = net.get_switch(SwitchId(19)).expect("new spine missing");
    assert_eq!(new.tier(), Tier::Core);
    assert_eq!(new.tier_index(), 2);
    assert_eq!(new.nports(), 5);

    // every agg now has one cable to each of the three cores
    let (wiring, _, _) = net.core_agg_wiring();
    assert_eq!(wiring, array![[1, 1, 1, 1], [1, 1, 1, 1], [1, 1, 1, 1]]);
    for agg in 13..=16 {
        assert_eq!(net.multiplicity(SwitchId(agg), SwitchId(19)), 1);
    }
}

#[test]
fn cabling_actions_are_mirrored_to_the_dataplane() {
    let mut expander = Expander::new(reference_fat_tree(), Recorder::default(), config(1));
    let actions = expander.expand(ExpandLevel::Spine, 5).unwrap();

    let aggs = [SwitchId(13), SwitchId(14), SwitchId(15), SwitchId(16)];
    let cores = [SwitchId(17), SwitchId(18), SwitchId(19)];
    let expected: Vec<LinkOp> = actions
        .iter()
        .map(|a| match *a {
            RewireAction::Connect { agg, core } => LinkOp::Add(aggs[agg], cores[core]),
            RewireAction::Disconnect { agg, core } => LinkOp::Del(aggs[agg], cores[core]),
        })
        .collect();
    assert_eq!(expander.dataplane().link_ops, expected);
}

#[test]
fn route_pushes_use_strictly_increasing_priorities() {
    let mut expander = Expander::new(reference_fat_tree(), Recorder::default(), config(2));
    expander.expand(ExpandLevel::Spine, 5).unwrap();

    // 8 actions at pace 2 trigger pushes after actions 0, 2, 4 and 6, plus the final one
    assert_eq!(expander.priority(), 1105);
    let flows = &expander.dataplane().flows;
    let mut priorities: Vec<u32> = flows.iter().map(|f| f.3).collect();
    assert!(priorities.windows(2).all(|w| w[0] <= w[1]), "priorities went backwards");
    priorities.dedup();
    assert_eq!(priorities, vec![1101, 1102, 1103, 1104, 1105]);
    // the final push covers all 11 non-host switches for all 8 hosts
    assert_eq!(flows.iter().filter(|f| f.3 == 1105).count(), 11 * 8);
}

#[test]
fn flows_carry_the_host_address_and_a_legal_port() {
    let mut expander = Expander::new(reference_fat_tree(), Recorder::default(), config(3));
    expander.expand(ExpandLevel::Spine, 5).unwrap();
    let (net, recorder) = expander.into_parts();
    for &(switch, dst, port, _) in &recorder.flows {
        let sw = net.get_switch(switch).unwrap();
        assert!(sw.tier() > Tier::Host);
        assert!(1 <= port && port <= sw.nports());
        let octets = dst.octets();
        assert_eq!(octets[0], 10);
        assert!(1 <= octets[3] && octets[3] <= 8);
    }
}

#[test]
fn routing_stays_total_after_the_expansion() {
    let mut expander = Expander::new(reference_fat_tree(), Recorder::default(), config(4));
    expander.expand(ExpandLevel::Spine, 5).unwrap();
    let routes = EcmpRouter::new(Some(4)).routes(expander.fabric());
    check_routing_totality(expander.fabric(), &routes);
}

#[test]
fn failed_expansions_are_rolled_back() {
    let mut expander = Expander::new(reference_fat_tree(), Recorder::default(), config(5));
    expander.expand(ExpandLevel::Spine, 5).unwrap();
    let before = expander.fabric().clone();
    let flows_before = expander.dataplane().flows.len();

    // all three cores are fully used, so a server block needing floor(4/3) >= 1 cables per
    // core cannot be wired
    let result = expander.expand(ExpandLevel::Server, 4);
    assert!(
        matches!(result, Err(Error::PlannerError(PlannerError::Infeasible))),
        "got {:?}",
        result
    );
    assert_eq!(expander.fabric(), &before);
    assert_eq!(expander.fabric().max_sid(), SwitchId(19));
    // no routes were pushed for the failed event
    assert_eq!(expander.dataplane().flows.len(), flows_before);
}

#[test]
fn push_routes_alone_bumps_the_priority() {
    let mut expander = Expander::new(reference_fat_tree(), Recorder::default(), config(6));
    assert_eq!(expander.priority(), 1100);
    expander.push_routes();
    assert_eq!(expander.priority(), 1101);
    assert_eq!(expander.dataplane().flows.len(), 10 * 8);
}

#[test]
fn host_addresses_live_in_ten_slash_eight() {
    assert_eq!(host_address(SwitchId(5)), Ipv4Addr::new(10, 0, 0, 5));
    assert_eq!(host_address(SwitchId(258)), Ipv4Addr::new(10, 0, 1, 2));
}
