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

//! # Minimal-rewiring planner
//!
//! When a spine or server block is added, the planner decides the new agg/core bipartite wiring
//! and linearizes the diff into an ordered, capacity-safe sequence of physical cabling actions.
//! It works in three steps:
//!
//! 1. An integer program ([`ilp`]) computes the target wiring: maximize link utilization,
//!    minimize the edit distance to the current wiring, subject to per-block port caps and the
//!    even-spread bounds `floor(s_i / C) <= x_ij <= ceil(s_i / C)`.
//! 2. A row-major diff matcher ([`sequencer::link_moves`]) pairs decrements with increments of
//!    the same row into unit link moves.
//! 3. A greedy sequencer ([`sequencer::sequence`]) orders the moves such that no core switch
//!    ever exceeds its port budget, splicing a second move in whenever the target core is
//!    momentarily full.
//!
//! The planner reads a snapshot of the wiring matrix and returns a new matrix together with the
//! action list; it never touches the [`Fabric`](crate::fabric::Fabric) itself. Wiring matrices
//! here are oriented rows = aggs, columns = cores.

pub mod ilp;
pub mod sequencer;

pub use ilp::BlockSet;
pub use sequencer::{LinkMove, WiringDiff};

use crate::fabric::WiringMatrix;

use good_lp::ResolutionError;
use log::*;
use thiserror::Error;

/// Which tier the expansion grows: a spine block appends a core column, a server block appends
/// an agg row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandLevel {
    /// Add a core (spine block) switch
    Spine,
    /// Add an aggregation (server block) switch
    Server,
}

/// A single physical cabling action. Indices refer to the post-expansion wiring matrix; the
/// orchestrator resolves them back to switch ids through the tier ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewireAction {
    /// Plug one cable between the given agg and core switch
    Connect {
        /// Row index of the agg switch
        agg: usize,
        /// Column index of the core switch
        core: usize,
    },
    /// Unplug one cable between the given agg and core switch
    Disconnect {
        /// Row index of the agg switch
        agg: usize,
        /// Column index of the core switch
        core: usize,
    },
}

/// The planner result: the post-expansion wiring (rows = aggs, columns = cores) and the ordered
/// action list realizing it.
#[derive(Debug, Clone)]
pub struct RewirePlan {
    /// Target wiring matrix
    pub wiring: WiringMatrix,
    /// Ordered, capacity-safe cabling actions
    pub actions: Vec<RewireAction>,
}

/// Planner Errors
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The even-spread bounds contradict a port cap. This only happens when the caller asks for
    /// an expansion the fabric has no spare ports for.
    #[error("The port caps and the even-spread bounds contradict each other")]
    Infeasible,
    /// The ILP backend failed for any other reason.
    #[error("ILP backend failure: {0}")]
    Solver(ResolutionError),
    /// The diff residue or the capacity accounting was violated. This is a bug in the planner,
    /// not a property of the input.
    #[error("Sequencer invariant violated: {0}")]
    SequencerInvariant(String),
}

impl From<ResolutionError> for PlannerError {
    fn from(e: ResolutionError) -> Self {
        match e {
            ResolutionError::Infeasible => PlannerError::Infeasible,
            other => PlannerError::Solver(other),
        }
    }
}

/// # Plan an expansion
///
/// Compute the rewiring plan for adding a switch with `nports` ports at the given level to a
/// fabric whose current agg/core wiring is `current` (rows = aggs, columns = cores). Port
/// budgets are taken from the current wiring (row and column sums); the new block contributes
/// its full `nports`.
///
/// ```rust
/// use ndarray::array;
/// use relace::planner::{plan_expansion, ExpandLevel};
///
/// # fn main() -> Result<(), relace::Error> {
/// let current = array![[2, 1], [1, 2], [2, 1], [1, 2]];
/// let plan = plan_expansion(&current, ExpandLevel::Spine, 5)?;
/// assert_eq!(plan.wiring, array![[1, 1, 1], [1, 1, 1], [1, 1, 1], [1, 1, 1]]);
/// # Ok(())
/// # }
/// ```
pub fn plan_expansion(
    current: &WiringMatrix,
    level: ExpandLevel,
    nports: usize,
) -> Result<RewirePlan, PlannerError> {
    let blocks = BlockSet::from_wiring(current).expand(level, nports);
    let w0 = ilp::zero_pad(current, blocks.num_aggs(), blocks.num_cores());

    info!(
        "planning a rewiring for {} aggs x {} cores ({:?} expansion, {} ports)",
        blocks.num_aggs(),
        blocks.num_cores(),
        level,
        nports
    );
    let wiring = ilp::solve_rewiring(&w0, &blocks)?;
    debug!("target wiring:\n{}", wiring);

    let diff = sequencer::link_moves(&w0, &wiring)?;
    let actions = sequencer::sequence(diff, blocks.core_slack(&w0))?;
    info!("rewiring plan has {} actions", actions.len());

    Ok(RewirePlan { wiring, actions })
}
