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

#![deny(missing_docs, missing_debug_implementations)]

//! # Fabric state model
//!
//! The tiered multigraph of the data-center network. The main structure is [`Fabric`]; every
//! device is a [`Switch`] in one of the four [`Tier`]s. Invariants maintained by the link
//! operations:
//!
//! 1. `0 <= nlinks <= nports` for every switch.
//! 2. Both endpoints of an adjacency hold port lists of the same length, equal to the edge
//!    multiplicity.
//! 3. Port numbers of one switch are pairwise disjoint across all its adjacencies and lie in
//!    `[1, nports]`.
//! 4. `uplinks` counts exactly the links towards strictly higher tiers.

pub mod export;
pub(crate) mod network;
pub(crate) mod switch;
pub(crate) mod types;

pub use network::Fabric;
pub use switch::Switch;
pub use types::{FabricError, Port, SwitchId, Tier, WiringMatrix};
