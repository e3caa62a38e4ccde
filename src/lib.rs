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

#![deny(missing_docs)]

//! # Relace: Rewiring Leaf-Spine Fabrics with Minimal Cable Churn
//!
//! This is a library for growing an operational leaf/spine ("fat-tree"-style) data-center
//! fabric. When a spine block or a server block switch is added, the library decides the new
//! agg/core wiring that restores capacity balance while disturbing the existing cabling as
//! little as possible, linearizes the change into physical connect/disconnect actions that never
//! exceed a switch's port budget, and recomputes the ECMP forwarding state so that host-to-host
//! reachability is preserved throughout the rewire.
//!
//! ## Problem Statement
//!
//! Given
//! - the current agg/core bipartite wiring $W_0$ and the per-block port budgets,
//! - a new switch with $n$ ports at either the spine or the server level,
//!
//! find a new wiring $W$ that maximizes link utilization and minimizes the edit distance
//! $\sum |W - W_0|$, subject to the port caps and an even spread of every agg's uplinks over
//! all cores — and an ordering of the physical re-cabling steps that is safe at every
//! intermediate state.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`fabric`]**: The network state model: a tiered multigraph of switches with per-switch
//!   port accounting, plus the northbound node-link JSON export ([`fabric::export`]).
//!
//! - **[`routing`]**: Tier-aware ECMP route computation. Produces a
//!   [`RoutingTable`](routing::RoutingTable) mapping every non-host switch and every host to an
//!   egress port, with a seedable RNG for the core tier.
//!
//! - **[`planner`]**: The minimal-rewiring planner: an integer program for the target wiring
//!   (see [`planner::ilp`]) and the diff matcher plus capacity-safe sequencer (see
//!   [`planner::sequencer`]) that orders the physical actions.
//!
//! - **[`expansion`]**: The orchestrator gluing the three together. Owns the fabric, drives a
//!   [`Dataplane`](expansion::Dataplane) (flow-table installer and cabling actuator), and
//!   interleaves route pushes with strictly increasing priority between the cabling actions.
//!
//! - **[`example_fabrics`]**: Prepared starting topologies for tests and demos.
//!
//! ## Usage
//!
//! ```rust
//! use relace::example_fabrics::reference_fat_tree;
//! use relace::expansion::{Expander, ExpansionConfig, NoopDataplane};
//! use relace::planner::ExpandLevel;
//!
//! fn main() -> Result<(), relace::Error> {
//!     // prepare the fabric (or build your own with `Fabric::new`)
//!     let fabric = reference_fat_tree();
//!
//!     // attach the dataplane and expand by one 5-port spine block
//!     let config = ExpansionConfig { rng_seed: Some(42), ..Default::default() };
//!     let mut expander = Expander::new(fabric, NoopDataplane, config);
//!     let actions = expander.expand(ExpandLevel::Spine, 5)?;
//!
//!     // every agg moved one cable onto the new spine
//!     assert_eq!(actions.len(), 8);
//!     Ok(())
//! }
//! ```

pub mod example_fabrics;
mod test;

mod error;
pub mod expansion;
pub mod fabric;
pub mod planner;
pub mod routing;

pub use error::Error;
pub use expansion::{Dataplane, Expander, ExpansionConfig};
