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

//! The integer program of the planner: port-capped, evenly spread, minimum-edit bipartite
//! wiring.
//!
//! Variables are one `x_ij` per matrix cell (the new multiplicity) and one slack `d_ij` encoding
//! `|x_ij - w0_ij|` through the two constraints `d_ij >= x_ij - w0_ij` and
//! `d_ij >= w0_ij - x_ij`. The objective `sum(d) - sum(x)` simultaneously maximizes link
//! utilization and penalizes edits to the existing cabling, unweighted, as both terms count
//! single cables. The even-spread requirement is expressed directly as the variable bounds
//! `floor(s_i / C) <= x_ij <= ceil(s_i / C)`.

use crate::fabric::WiringMatrix;
use crate::planner::{ExpandLevel, PlannerError};

use good_lp::solvers::microlp::microlp;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use itertools::iproduct;
use log::*;
use ndarray::{s, Array2, Axis};

/// # Block set
///
/// The port budgets of the two switch blocks the planner wires against each other: one entry
/// per agg (server block) row and one per core (spine block) column. Budgets of existing blocks
/// are derived from the current wiring (their ports in this bipartite layer are exactly the
/// ones in use); a newly added block contributes its full port count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSet {
    agg_ports: Vec<i64>,
    core_ports: Vec<i64>,
}

impl BlockSet {
    /// Derive the budgets from a wiring matrix: row sums for the aggs, column sums for the
    /// cores.
    pub fn from_wiring(wiring: &WiringMatrix) -> Self {
        Self {
            agg_ports: wiring.sum_axis(Axis(1)).to_vec(),
            core_ports: wiring.sum_axis(Axis(0)).to_vec(),
        }
    }

    /// Append the new block with its full port budget.
    pub fn expand(mut self, level: ExpandLevel, nports: usize) -> Self {
        match level {
            ExpandLevel::Spine => self.core_ports.push(nports as i64),
            ExpandLevel::Server => self.agg_ports.push(nports as i64),
        }
        self
    }

    /// Number of agg rows.
    pub fn num_aggs(&self) -> usize {
        self.agg_ports.len()
    }

    /// Number of core columns.
    pub fn num_cores(&self) -> usize {
        self.core_ports.len()
    }

    /// Per-agg port budgets.
    pub fn agg_ports(&self) -> &[i64] {
        &self.agg_ports
    }

    /// Per-core port budgets.
    pub fn core_ports(&self) -> &[i64] {
        &self.core_ports
    }

    /// Free ports per core, given the occupancy in `wiring`. This seeds the capacity vector of
    /// the sequencer.
    pub fn core_slack(&self, wiring: &WiringMatrix) -> Vec<i64> {
        let used = wiring.sum_axis(Axis(0));
        self.core_ports.iter().zip(used.iter()).map(|(t, u)| t - u).collect()
    }
}

/// Zero-pad a wiring matrix to the post-expansion shape.
pub(crate) fn zero_pad(wiring: &WiringMatrix, rows: usize, cols: usize) -> WiringMatrix {
    let mut out = Array2::zeros((rows, cols));
    out.slice_mut(s![..wiring.nrows(), ..wiring.ncols()]).assign(wiring);
    out
}

/// Solve the rewiring ILP. `w0` must already be zero-padded to the post-expansion shape given
/// by `blocks`. Returns the new wiring matrix, or [`PlannerError::Infeasible`] when the
/// even-spread bounds contradict a port cap.
pub(crate) fn solve_rewiring(
    w0: &WiringMatrix,
    blocks: &BlockSet,
) -> Result<WiringMatrix, PlannerError> {
    let rows = blocks.num_aggs();
    let cols = blocks.num_cores();
    debug_assert_eq!(w0.dim(), (rows, cols));

    let mut vars = variables!();

    // new multiplicities, bounded by the even spread of each agg's uplinks
    let mut x: Vec<Variable> = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        let k = blocks.agg_ports()[i] as f64 / cols as f64;
        for _ in 0..cols {
            x.push(vars.add(variable().integer().min(k.floor()).max(k.ceil())));
        }
    }

    // slack encoding |x - w0|
    let mut d: Vec<Variable> = Vec::with_capacity(rows * cols);
    for _ in 0..rows * cols {
        d.push(vars.add(variable().integer().min(0)));
    }

    let edit_cost = d.iter().fold(Expression::from(0.0), |acc, v| acc + *v);
    let utilization = x.iter().fold(Expression::from(0.0), |acc, v| acc + *v);
    let mut model = vars.minimise(edit_cost - utilization).using(microlp);

    // agg port caps (rows)
    for i in 0..rows {
        let row_sum = (0..cols).fold(Expression::from(0.0), |acc, j| acc + x[i * cols + j]);
        model = model.with(constraint!(row_sum <= blocks.agg_ports()[i] as f64));
    }
    // core port caps (columns)
    for j in 0..cols {
        let col_sum = (0..rows).fold(Expression::from(0.0), |acc, i| acc + x[i * cols + j]);
        model = model.with(constraint!(col_sum <= blocks.core_ports()[j] as f64));
    }
    // absolute value of the change
    for (i, j) in iproduct!(0..rows, 0..cols) {
        let idx = i * cols + j;
        let w = w0[[i, j]] as f64;
        model = model.with(constraint!(d[idx] >= x[idx] - w));
        model = model.with(constraint!(d[idx] >= w - x[idx]));
    }

    let solution = model.solve().map_err(|e| {
        warn!("ILP backend did not produce a solution: {}", e);
        PlannerError::from(e)
    })?;

    let mut wiring = Array2::zeros((rows, cols));
    for (i, j) in iproduct!(0..rows, 0..cols) {
        wiring[[i, j]] = solution.value(x[i * cols + j]).round() as i64;
    }
    Ok(wiring)
}
