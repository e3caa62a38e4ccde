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

//! Diff matching and capacity-safe sequencing of a wiring change.
//!
//! [`link_moves`] turns the cell-wise difference of two wiring matrices into unit *moves*
//! ("agg `i` moves one cable from core `j_from` to core `j_to`"), pairing decrements and
//! increments of the same row in row-major scan order. A row whose total changes leaves
//! one-sided residue: pure connects for a row that grows (a new server block filling up), pure
//! disconnects for a row that shrinks.
//!
//! [`sequence`] linearizes the result such that, simulated action by action, no core ever holds
//! more cables than its port budget. Disconnects always precede the paired connect; when the
//! target core is momentarily full, a second pending move that frees a port on it is spliced in
//! first.

use crate::planner::{PlannerError, RewireAction};

use crate::fabric::WiringMatrix;
use log::*;
use std::collections::VecDeque;

/// One unit move: agg row `agg` gives up a cable to core `from` and gains one to core `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMove {
    /// Agg row index
    pub agg: usize,
    /// Core column the cable leaves
    pub from: usize,
    /// Core column the cable arrives at
    pub to: usize,
}

/// The matched difference between two wiring matrices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiringDiff {
    /// Paired unit moves
    pub moves: Vec<LinkMove>,
    /// Unit connects left over in rows whose sum grows, as `(agg, core)`
    pub extra_connects: Vec<(usize, usize)>,
    /// Unit disconnects left over in rows whose sum shrinks, as `(agg, core)`
    pub extra_disconnects: Vec<(usize, usize)>,
}

impl WiringDiff {
    /// True iff the two matrices were identical.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.extra_connects.is_empty() && self.extra_disconnects.is_empty()
    }
}

/// # Match the wiring diff into unit moves
///
/// Scan the cells in row-major order. Each decrement unit is paired with a parked increment of
/// the same row (and vice versa); whatever cannot be paired is parked. After the scan, the
/// residue of every row must equal that row's sum change and be one-sided, otherwise the
/// matching itself is broken and [`PlannerError::SequencerInvariant`] is returned.
pub fn link_moves(w0: &WiringMatrix, w_new: &WiringMatrix) -> Result<WiringDiff, PlannerError> {
    if w0.dim() != w_new.dim() {
        return Err(invariant(format!(
            "wiring shapes differ: {:?} vs {:?}",
            w0.dim(),
            w_new.dim()
        )));
    }
    let (rows, cols) = w0.dim();

    let mut moves: Vec<LinkMove> = Vec::new();
    // parked one-sided deltas: (row, col, remaining units)
    let mut parked_inc: Vec<(usize, usize, i64)> = Vec::new();
    let mut parked_dec: Vec<(usize, usize, i64)> = Vec::new();

    for i in 0..rows {
        for j in 0..cols {
            let mut delta = w_new[[i, j]] - w0[[i, j]];
            if delta < 0 {
                for parked in parked_inc.iter_mut().filter(|p| p.0 == i) {
                    while parked.2 > 0 && delta < 0 {
                        parked.2 -= 1;
                        delta += 1;
                        moves.push(LinkMove { agg: i, from: j, to: parked.1 });
                    }
                    if delta == 0 {
                        break;
                    }
                }
                if delta < 0 {
                    parked_dec.push((i, j, -delta));
                }
            } else if delta > 0 {
                for parked in parked_dec.iter_mut().filter(|p| p.0 == i) {
                    while parked.2 > 0 && delta > 0 {
                        parked.2 -= 1;
                        delta -= 1;
                        moves.push(LinkMove { agg: i, from: parked.1, to: j });
                    }
                    if delta == 0 {
                        break;
                    }
                }
                if delta > 0 {
                    parked_inc.push((i, j, delta));
                }
            }
        }
    }

    // the residue of a row must be one-sided and account exactly for the row-sum change
    for i in 0..rows {
        let net = w_new.row(i).sum() - w0.row(i).sum();
        let plus: i64 = parked_inc.iter().filter(|p| p.0 == i).map(|p| p.2).sum();
        let minus: i64 = parked_dec.iter().filter(|p| p.0 == i).map(|p| p.2).sum();
        if plus - minus != net || (plus > 0 && minus > 0) {
            return Err(invariant(format!(
                "row {} residue broken: +{} -{} for a row-sum change of {}",
                i, plus, minus, net
            )));
        }
    }

    let expand = |parked: Vec<(usize, usize, i64)>| {
        parked
            .into_iter()
            .flat_map(|(i, j, n)| std::iter::repeat((i, j)).take(n as usize))
            .collect::<Vec<_>>()
    };
    Ok(WiringDiff {
        moves,
        extra_connects: expand(parked_inc),
        extra_disconnects: expand(parked_dec),
    })
}

/// # Capacity-safe sequencing
///
/// Turn a [`WiringDiff`] into the ordered action list. `capacity` holds the free ports per core
/// column at the starting wiring; it is updated with every emitted action (a disconnect frees a
/// port, a connect takes one), and a connect against a full core is only legal through the
/// splice rule. Residual disconnects are emitted up front, residual connects at the very end.
///
/// Returns [`PlannerError::SequencerInvariant`] if any emitted action would drive a core's free
/// port count below zero. For inputs produced by the planner this cannot happen.
pub fn sequence(
    diff: WiringDiff,
    mut capacity: Vec<i64>,
) -> Result<Vec<RewireAction>, PlannerError> {
    let mut actions: Vec<RewireAction> = Vec::new();

    for &(agg, core) in &diff.extra_disconnects {
        actions.push(RewireAction::Disconnect { agg, core });
        capacity[core] += 1;
    }

    let mut pending: VecDeque<LinkMove> = diff.moves.into();
    while let Some(mv) = pending.pop_front() {
        actions.push(RewireAction::Disconnect { agg: mv.agg, core: mv.from });
        capacity[mv.from] += 1;

        if capacity[mv.to] == 0 {
            // the target core is full: splice in a pending move that drains it, landing its
            // replacement cable on the port we just freed
            if let Some(pos) = pending.iter().position(|m| m.from == mv.to) {
                let spliced = pending.remove(pos).unwrap();
                debug!("splicing {:?} to free a port on core {}", spliced, mv.to);
                actions.push(RewireAction::Disconnect { agg: spliced.agg, core: spliced.from });
                capacity[spliced.from] += 1;
                if capacity[mv.from] == 0 {
                    return Err(invariant(format!(
                        "core {} has no free port for the spliced connect",
                        mv.from
                    )));
                }
                actions.push(RewireAction::Connect { agg: spliced.agg, core: mv.from });
                capacity[mv.from] -= 1;
                pending.push_front(LinkMove { agg: spliced.agg, from: mv.from, to: spliced.to });
            }
        }
        if capacity[mv.to] == 0 {
            return Err(invariant(format!(
                "core {} is full and no pending move frees a port on it",
                mv.to
            )));
        }
        actions.push(RewireAction::Connect { agg: mv.agg, core: mv.to });
        capacity[mv.to] -= 1;
    }

    for &(agg, core) in &diff.extra_connects {
        if capacity[core] == 0 {
            return Err(invariant(format!(
                "core {} is full, cannot place a residual connect",
                core
            )));
        }
        actions.push(RewireAction::Connect { agg, core });
        capacity[core] -= 1;
    }

    Ok(actions)
}

fn invariant(msg: String) -> PlannerError {
    error!("sequencer invariant violated: {}", msg);
    PlannerError::SequencerInvariant(msg)
}
