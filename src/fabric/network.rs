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

//! # Top-level Fabric module
//!
//! This module holds the network state: the tiered multigraph of switches and links that the
//! planner rewires and the router computes forwarding state for.

use crate::fabric::switch::Switch;
use crate::fabric::types::{FabricError, SwitchId, Tier, WiringMatrix};

use log::*;
use ndarray::Array2;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeMap, HashMap};

/// # Fabric
///
/// The physical state of the data-center network: an arena of [`Switch`] records indexed by id,
/// and an undirected edge map with multiplicities. The edge map is the single source of truth for
/// adjacency; per-switch port lists are derived state maintained by the link operations.
///
/// Edge keys are normalized to `(min(u, v), max(u, v))`, so both orientations of a query resolve
/// to the same entry. Switches are never removed; an adjacency disappears when its multiplicity
/// drops to zero.
///
/// ```rust
/// use relace::fabric::{Fabric, SwitchId, Tier};
///
/// fn main() -> Result<(), relace::Error> {
///     let mut fabric = Fabric::new();
///     fabric.add_switch(SwitchId(1), 4, Tier::Host)?;
///     fabric.add_switch(SwitchId(2), 4, Tier::Edge)?;
///     fabric.add_link(SwitchId(1), SwitchId(2), 1)?;
///     assert!(fabric.linked(SwitchId(2), SwitchId(1)));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fabric {
    switches: HashMap<SwitchId, Switch>,
    edges: BTreeMap<(SwitchId, SwitchId), usize>,
    tiers: HashMap<Tier, Vec<SwitchId>>,
    max_sid: usize,
}

impl Default for Fabric {
    fn default() -> Self {
        Self::new()
    }
}

impl Fabric {
    /// Generate an empty fabric
    pub fn new() -> Self {
        Self {
            switches: HashMap::new(),
            edges: BTreeMap::new(),
            tiers: Tier::ALL.iter().map(|t| (*t, Vec::new())).collect(),
            max_sid: 0,
        }
    }

    /// Register a new switch with the given port budget. The switch gets the next free ordinal
    /// within its tier (`tier_index`). Fails with [`FabricError::DuplicateSwitch`] if the id is
    /// already taken.
    pub fn add_switch(
        &mut self,
        sid: SwitchId,
        nports: usize,
        tier: Tier,
    ) -> Result<(), FabricError> {
        if self.switches.contains_key(&sid) {
            return Err(FabricError::DuplicateSwitch(sid));
        }
        let members = self.tiers.get_mut(&tier).unwrap();
        let tier_index = members.len();
        members.push(sid);
        self.switches.insert(sid, Switch::new(sid, nports, tier, tier_index));
        self.max_sid = self.max_sid.max(sid.0);
        trace!("added {} to tier {} at index {}", sid, tier, tier_index);
        Ok(())
    }

    /// Add `count` parallel links between `a` and `b`, allocating `count` fresh ports on each
    /// side. Fails with [`FabricError::UnknownSwitch`] if either endpoint is absent, and with
    /// [`FabricError::PortsExhausted`] if either side cannot fit `count` more links. On failure
    /// the fabric is left unchanged.
    pub fn add_link(&mut self, a: SwitchId, b: SwitchId, count: usize) -> Result<(), FabricError> {
        debug_assert_ne!(a, b, "self-loops are not meaningful in a tiered fabric");
        let tier_a = self.tier_of(a)?;
        let tier_b = self.tier_of(b)?;
        for &sid in &[a, b] {
            let free = self.switches[&sid].free_ports();
            if free < count {
                return Err(FabricError::PortsExhausted { switch: sid, requested: count, free });
            }
        }
        self.switches.get_mut(&a).unwrap().attach(b, count, tier_a < tier_b);
        self.switches.get_mut(&b).unwrap().attach(a, count, tier_b < tier_a);
        *self.edges.entry(edge_key(a, b)).or_insert(0) += count;
        Ok(())
    }

    /// Remove `count` parallel links between `a` and `b`, freeing the newest ports of the
    /// adjacency on each side. Fails with [`FabricError::InsufficientLinks`] if fewer than
    /// `count` parallel links exist (including none at all); the fabric is then left unchanged.
    pub fn remove_link(
        &mut self,
        a: SwitchId,
        b: SwitchId,
        count: usize,
    ) -> Result<(), FabricError> {
        let tier_a = self.tier_of(a)?;
        let tier_b = self.tier_of(b)?;
        let key = edge_key(a, b);
        let present = self.edges.get(&key).copied().unwrap_or(0);
        if present < count {
            return Err(FabricError::InsufficientLinks { a, b, requested: count, present });
        }
        self.switches.get_mut(&a).unwrap().detach(b, count, tier_a < tier_b);
        self.switches.get_mut(&b).unwrap().detach(a, count, tier_b < tier_a);
        if present == count {
            self.edges.remove(&key);
        } else {
            *self.edges.get_mut(&key).unwrap() -= count;
        }
        Ok(())
    }

    /// All switch ids of the given tier, in ascending `tier_index` order.
    pub fn get_tier(&self, tier: Tier) -> &[SwitchId] {
        &self.tiers[&tier]
    }

    /// True iff at least one link exists between `a` and `b` (either orientation).
    pub fn linked(&self, a: SwitchId, b: SwitchId) -> bool {
        self.edges.contains_key(&edge_key(a, b))
    }

    /// Number of parallel links between `a` and `b` (either orientation), 0 if unlinked.
    pub fn multiplicity(&self, a: SwitchId, b: SwitchId) -> usize {
        self.edges.get(&edge_key(a, b)).copied().unwrap_or(0)
    }

    /// Look up a switch record.
    pub fn get_switch(&self, sid: SwitchId) -> Option<&Switch> {
        self.switches.get(&sid)
    }

    /// Iterator over all switch records, in no particular order.
    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    /// Number of switches in the fabric.
    pub fn num_switches(&self) -> usize {
        self.switches.len()
    }

    /// The largest switch id registered so far (`SwitchId(0)` for an empty fabric). A fresh id
    /// for an expansion is `max_sid + 1`.
    pub fn max_sid(&self) -> SwitchId {
        SwitchId(self.max_sid)
    }

    /// # Core/Agg wiring matrix
    ///
    /// Extract the bipartite multiplicity matrix between the core and the aggregation tier:
    /// `W[r, c]` is the number of parallel links between the core switch with `tier_index = r`
    /// and the agg switch with `tier_index = c`. Returns the matrix together with both index
    /// maps, `core sid -> row` and `agg sid -> column`.
    pub fn core_agg_wiring(
        &self,
    ) -> (WiringMatrix, HashMap<SwitchId, usize>, HashMap<SwitchId, usize>) {
        let core_key: HashMap<SwitchId, usize> =
            self.get_tier(Tier::Core).iter().enumerate().map(|(i, s)| (*s, i)).collect();
        let agg_key: HashMap<SwitchId, usize> =
            self.get_tier(Tier::Agg).iter().enumerate().map(|(i, s)| (*s, i)).collect();
        let mut wiring: WiringMatrix = Array2::zeros((core_key.len(), agg_key.len()));
        for (c, r) in core_key.iter() {
            for (a, col) in agg_key.iter() {
                wiring[[*r, *col]] = self.multiplicity(*c, *a) as i64;
            }
        }
        (wiring, core_key, agg_key)
    }

    /// Convert the fabric into an undirected petgraph graph, with switch ids as node weights and
    /// link multiplicities as edge weights. Nodes are added in ascending id order.
    pub fn to_graph(&self) -> UnGraph<SwitchId, usize> {
        let mut graph = UnGraph::new_undirected();
        let mut nodes: HashMap<SwitchId, NodeIndex> = HashMap::new();
        let mut sids: Vec<SwitchId> = self.switches.keys().copied().collect();
        sids.sort();
        for sid in sids {
            nodes.insert(sid, graph.add_node(sid));
        }
        for (&(a, b), &count) in self.edges.iter() {
            graph.add_edge(nodes[&a], nodes[&b], count);
        }
        graph
    }

    fn tier_of(&self, sid: SwitchId) -> Result<Tier, FabricError> {
        self.switches.get(&sid).map(|s| s.tier()).ok_or(FabricError::UnknownSwitch(sid))
    }
}

fn edge_key(a: SwitchId, b: SwitchId) -> (SwitchId, SwitchId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
