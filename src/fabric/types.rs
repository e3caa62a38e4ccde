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

//! Module containing all type definitions of the fabric model

use ndarray::Array2;
use thiserror::Error;

/// Switch Identification: a dense integer id, unique within one [`Fabric`](super::Fabric)
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct SwitchId(pub usize);

impl std::fmt::Display for SwitchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl From<usize> for SwitchId {
    fn from(sid: usize) -> Self {
        Self(sid)
    }
}

/// Local port number on a switch. Ports are 1-based and never exceed the switch's port budget.
pub type Port = usize;

/// Bipartite link multiplicity matrix between two adjacent tiers. Entries are link counts and
/// therefore non-negative; the signed type makes diffing two matrices direct.
pub type WiringMatrix = Array2<i64>;

/// # Tier
///
/// The level of a switch in the hierarchical topology. The derived order is the physical one:
/// `Host < Edge < Agg < Core`. A link `(u, v)` is an *uplink* of `u` iff `v` sits in a strictly
/// higher tier.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum Tier {
    /// End host (leaf of the topology)
    Host,
    /// Top-of-rack switch, directly connected to hosts
    Edge,
    /// Aggregation switch of a pod
    Agg,
    /// Core (spine block) switch
    Core,
}

impl Tier {
    /// All tiers, from the bottom up.
    pub const ALL: [Tier; 4] = [Tier::Host, Tier::Edge, Tier::Agg, Tier::Core];
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Host => write!(f, "host"),
            Tier::Edge => write!(f, "edge"),
            Tier::Agg => write!(f, "agg"),
            Tier::Core => write!(f, "core"),
        }
    }
}

/// Fabric Errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FabricError {
    /// A link operation references a switch id that was never registered.
    #[error("Switch {0} is not part of the fabric")]
    UnknownSwitch(SwitchId),
    /// `add_switch` was called with an id that is already taken.
    #[error("Switch {0} does already exist")]
    DuplicateSwitch(SwitchId),
    /// A link operation would exceed the port budget of one endpoint.
    #[error("Switch {switch} cannot fit {requested} more links ({free} ports free)")]
    PortsExhausted {
        /// The endpoint that ran out of ports
        switch: SwitchId,
        /// Number of additional links requested
        requested: usize,
        /// Number of ports still free on that endpoint
        free: usize,
    },
    /// `remove_link` asked for more parallel links than are present.
    #[error("Cannot remove {requested} links between {a} and {b}: only {present} present")]
    InsufficientLinks {
        /// First endpoint
        a: SwitchId,
        /// Second endpoint
        b: SwitchId,
        /// Number of links to remove
        requested: usize,
        /// Current multiplicity of the adjacency
        present: usize,
    },
}
