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

//! # Expansion orchestrator
//!
//! Coordinates one expansion event: register the new switch, obtain a rewiring plan, apply the
//! cabling actions to the fabric one by one, and interleave fresh ECMP routes to the dataplane
//! so that host-to-host reachability survives the rewire. Route pushes carry a strictly
//! increasing priority, so newer forwarding entries shadow older ones and packets in flight
//! always find at least one consistent snapshot.

use crate::fabric::{Fabric, Port, SwitchId, Tier};
use crate::planner::{plan_expansion, ExpandLevel, RewireAction};
use crate::routing::EcmpRouter;
use crate::Error;

use log::*;
use std::fmt;
use std::net::Ipv4Addr;

/// Orchestrator options.
#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    /// Priority of the flow entries installed before the first expansion. Every route push uses
    /// the next higher value, so the first push carries `initial_priority + 1`.
    pub initial_priority: u32,
    /// Number of cabling actions to apply between two route pushes.
    pub pace: usize,
    /// Seed for the core-tier ECMP choice; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self { initial_priority: 1100, pace: 2, rng_seed: None }
    }
}

/// # Dataplane (southbound boundary)
///
/// The external fabric the orchestrator drives: a flow-table installer plus a physical cabling
/// actuator. The installer must program *both* an IPv4 and an ARP match for `dst`, accept
/// duplicate entries idempotently, and let the higher priority win.
pub trait Dataplane {
    /// Install the forwarding entry `dst -> out_port` on `switch` at the given priority.
    fn install_flow(&mut self, switch: SwitchId, dst: Ipv4Addr, out_port: Port, priority: u32);
    /// Plug one cable between an agg and a core switch.
    fn link_add(&mut self, agg: SwitchId, core: SwitchId);
    /// Unplug one cable between an agg and a core switch.
    fn link_del(&mut self, agg: SwitchId, core: SwitchId);
}

/// A [`Dataplane`] that swallows everything, for dry-running expansions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDataplane;

impl Dataplane for NoopDataplane {
    fn install_flow(&mut self, _: SwitchId, _: Ipv4Addr, _: Port, _: u32) {}
    fn link_add(&mut self, _: SwitchId, _: SwitchId) {}
    fn link_del(&mut self, _: SwitchId, _: SwitchId) {}
}

/// The IPv4 address of a host switch: `10.0.0.0` with the switch id in the low bits.
pub fn host_address(host: SwitchId) -> Ipv4Addr {
    Ipv4Addr::from((10u32 << 24) | host.0 as u32)
}

/// # Expander
///
/// Owns the [`Fabric`] and serializes expansion events onto it. One [`Expander::expand`] call
/// performs the full event loop: extend the state, plan, then for every applied action emit the
/// physical change and, every `pace` actions plus once at the very end, recompute and push the
/// full routing state.
///
/// ```rust
/// use relace::example_fabrics::reference_fat_tree;
/// use relace::expansion::{Expander, ExpansionConfig, NoopDataplane};
/// use relace::planner::ExpandLevel;
///
/// fn main() -> Result<(), relace::Error> {
///     let config = ExpansionConfig { rng_seed: Some(42), ..Default::default() };
///     let mut expander = Expander::new(reference_fat_tree(), NoopDataplane, config);
///     let actions = expander.expand(ExpandLevel::Spine, 5)?;
///     assert_eq!(actions.len(), 8);
///     Ok(())
/// }
/// ```
pub struct Expander<D> {
    fabric: Fabric,
    dataplane: D,
    router: EcmpRouter,
    priority: u32,
    pace: usize,
}

impl<D> fmt::Debug for Expander<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expander")
            .field("fabric", &self.fabric)
            .field("priority", &self.priority)
            .field("pace", &self.pace)
            .finish()
    }
}

impl<D: Dataplane> Expander<D> {
    /// Create a new expander owning the given fabric and dataplane.
    pub fn new(fabric: Fabric, dataplane: D, config: ExpansionConfig) -> Self {
        Self {
            fabric,
            dataplane,
            router: EcmpRouter::new(config.rng_seed),
            priority: config.initial_priority,
            pace: config.pace.max(1),
        }
    }

    /// The current fabric state.
    pub fn fabric(&self) -> &Fabric {
        &self.fabric
    }

    /// The dataplane driven by this expander.
    pub fn dataplane(&self) -> &D {
        &self.dataplane
    }

    /// The priority of the most recent route push.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Tear the expander apart, giving back the fabric and the dataplane.
    pub fn into_parts(self) -> (Fabric, D) {
        (self.fabric, self.dataplane)
    }

    /// # Expand the fabric by one switch
    ///
    /// Registers a switch with `nports` ports under the next free id (core tier for a spine
    /// block, agg tier for a server block), plans the rewiring, and applies it action by action
    /// with interleaved route pushes. Returns the applied actions.
    ///
    /// When the planner fails ([`Infeasible`](crate::planner::PlannerError::Infeasible) or a
    /// backend error), the fabric is rolled back to the pre-expansion snapshot and the error is
    /// surfaced.
    pub fn expand(
        &mut self,
        level: ExpandLevel,
        nports: usize,
    ) -> Result<Vec<RewireAction>, Error> {
        let snapshot = self.fabric.clone();

        // snapshot the wiring before the new (linkless) switch shows up in it
        let (wiring, _, _) = self.fabric.core_agg_wiring();
        let w0 = wiring.t().to_owned();

        let sid = SwitchId(self.fabric.max_sid().0 + 1);
        let tier = match level {
            ExpandLevel::Spine => Tier::Core,
            ExpandLevel::Server => Tier::Agg,
        };
        info!("expanding: new {} switch {} with {} ports", tier, sid, nports);
        self.fabric.add_switch(sid, nports, tier)?;

        let plan = match plan_expansion(&w0, level, nports) {
            Ok(plan) => plan,
            Err(e) => {
                error!("planner failed, rolling the expansion back: {}", e);
                self.fabric = snapshot;
                return Err(e.into());
            }
        };

        let aggs = self.fabric.get_tier(Tier::Agg).to_vec();
        let cores = self.fabric.get_tier(Tier::Core).to_vec();

        for (i, action) in plan.actions.iter().enumerate() {
            match *action {
                RewireAction::Connect { agg, core } => {
                    let (a, c) = (aggs[agg], cores[core]);
                    debug!("connect {} <-> {}", a, c);
                    self.fabric.add_link(a, c, 1)?;
                    self.dataplane.link_add(a, c);
                }
                RewireAction::Disconnect { agg, core } => {
                    let (a, c) = (aggs[agg], cores[core]);
                    debug!("disconnect {} <-> {}", a, c);
                    self.fabric.remove_link(a, c, 1)?;
                    self.dataplane.link_del(a, c);
                }
            }
            if i % self.pace == 0 {
                self.push_routes();
            }
        }

        // final rerouting so the last actions are covered as well
        self.push_routes();
        info!("expansion of {} complete after {} actions", sid, plan.actions.len());
        Ok(plan.actions)
    }

    /// Recompute the full ECMP state and push it to the dataplane at the next higher priority.
    /// Also used for the initial bring-up, before any expansion.
    pub fn push_routes(&mut self) {
        let routes = self.router.routes(&self.fabric);
        self.priority += 1;
        debug!("pushing routes at priority {}", self.priority);
        for tier in &[Tier::Edge, Tier::Agg, Tier::Core] {
            for &switch in self.fabric.get_tier(*tier) {
                for &host in self.fabric.get_tier(Tier::Host) {
                    if let Some(port) = routes.egress(switch, host) {
                        self.dataplane.install_flow(
                            switch,
                            host_address(host),
                            port,
                            self.priority,
                        );
                    }
                }
            }
        }
    }
}
