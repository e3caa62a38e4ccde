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

//! Module containing the per-switch record

use crate::fabric::types::{Port, SwitchId, Tier};
use std::collections::BTreeMap;
use std::fmt;

/// # Switch
///
/// A single device of the fabric: its tier, its port budget, and the local port numbers it has
/// assigned to each adjacency. The port lists are the only authoritative port state; `nlinks` and
/// `uplinks` are counters maintained by the link operations on [`Fabric`](super::Fabric).
///
/// New links take the lowest free port numbers (in a fabric that has only grown, that is
/// `nlinks + 1, nlinks + 2, ...`); removing links gives back the *tail* of that adjacency's
/// list. A freed port is physically free and is handed out again by the next allocation, which
/// keeps the uplink ports of a switch in the contiguous tail `[nports - uplinks + 1, nports]`
/// across the disconnect/connect cycles of a rewire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    sid: SwitchId,
    tier: Tier,
    tier_index: usize,
    nports: usize,
    nlinks: usize,
    uplinks: usize,
    links: BTreeMap<SwitchId, Vec<Port>>,
}

impl Switch {
    pub(crate) fn new(sid: SwitchId, nports: usize, tier: Tier, tier_index: usize) -> Self {
        Self { sid, tier, tier_index, nports, nlinks: 0, uplinks: 0, links: BTreeMap::new() }
    }

    /// Id of this switch
    pub fn sid(&self) -> SwitchId {
        self.sid
    }

    /// Tier of this switch
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// 0-based ordinal of this switch within its tier, assigned at creation
    pub fn tier_index(&self) -> usize {
        self.tier_index
    }

    /// Total port budget
    pub fn nports(&self) -> usize {
        self.nports
    }

    /// Number of occupied ports
    pub fn nlinks(&self) -> usize {
        self.nlinks
    }

    /// Number of occupied ports whose other endpoint sits in a strictly higher tier
    pub fn uplinks(&self) -> usize {
        self.uplinks
    }

    /// Number of ports still free
    pub fn free_ports(&self) -> usize {
        self.nports - self.nlinks
    }

    /// The local ports used by the adjacency towards `neighbor`, in allocation order, or `None`
    /// if there is no link to `neighbor`.
    pub fn ports_to(&self, neighbor: SwitchId) -> Option<&[Port]> {
        self.links.get(&neighbor).map(|p| p.as_slice())
    }

    /// Iterator over all neighbors, in ascending id order.
    pub fn neighbors(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.links.keys().copied()
    }

    /// The contiguous tail of uplink port numbers, `[nports - uplinks + 1, nports]`.
    pub fn uplink_ports(&self) -> Vec<Port> {
        (self.nports - self.uplinks + 1..=self.nports).collect()
    }

    /// Allocate the `count` lowest free ports towards `neighbor`. The caller has checked the
    /// budget.
    pub(crate) fn attach(&mut self, neighbor: SwitchId, count: usize, up: bool) {
        let used: std::collections::BTreeSet<Port> =
            self.links.values().flatten().copied().collect();
        let fresh: Vec<Port> = (1..=self.nports).filter(|p| !used.contains(p)).take(count).collect();
        debug_assert_eq!(fresh.len(), count);
        self.links.entry(neighbor).or_insert_with(Vec::new).extend(fresh);
        self.nlinks += count;
        if up {
            self.uplinks += count;
        }
    }

    /// Give back the `count` newest ports towards `neighbor`. The caller has checked the
    /// multiplicity. An adjacency whose port list runs empty is dropped entirely, so neighbor
    /// iteration never yields ghost entries.
    pub(crate) fn detach(&mut self, neighbor: SwitchId, count: usize, up: bool) {
        if let Some(ports) = self.links.get_mut(&neighbor) {
            let keep = ports.len().saturating_sub(count);
            ports.truncate(keep);
            if ports.is_empty() {
                self.links.remove(&neighbor);
            }
        }
        self.nlinks -= count;
        if up {
            self.uplinks -= count;
        }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Switch {}, tier '{}', with {} ports", self.sid.0, self.tier, self.nports)?;
        writeln!(f, "Has {} links, with {} of them pointing up", self.nlinks, self.uplinks)?;
        let lnks = self
            .links
            .iter()
            .map(|(n, p)| format!("Switch {} at ports {:?}", n.0, p))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Linked to {}", lnks)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn port_allocation() {
        let mut sw = Switch::new(SwitchId(1), 6, Tier::Agg, 0);
        sw.attach(SwitchId(2), 2, false);
        sw.attach(SwitchId(3), 3, true);
        assert_eq!(sw.ports_to(SwitchId(2)), Some(&[1, 2][..]));
        assert_eq!(sw.ports_to(SwitchId(3)), Some(&[3, 4, 5][..]));
        assert_eq!(sw.nlinks(), 5);
        assert_eq!(sw.uplinks(), 3);
        assert_eq!(sw.free_ports(), 1);
    }

    #[test]
    fn detach_truncates_the_tail() {
        let mut sw = Switch::new(SwitchId(1), 4, Tier::Edge, 0);
        sw.attach(SwitchId(9), 3, true);
        sw.detach(SwitchId(9), 2, true);
        assert_eq!(sw.ports_to(SwitchId(9)), Some(&[1][..]));
        assert_eq!(sw.nlinks(), 1);
        assert_eq!(sw.uplinks(), 1);
        sw.detach(SwitchId(9), 1, true);
        assert_eq!(sw.ports_to(SwitchId(9)), None);
        assert_eq!(sw.neighbors().count(), 0);
    }

    #[test]
    fn freed_ports_are_reallocated() {
        let mut sw = Switch::new(SwitchId(13), 5, Tier::Agg, 0);
        sw.attach(SwitchId(9), 1, false);
        sw.attach(SwitchId(17), 2, true);
        sw.attach(SwitchId(18), 2, true);
        sw.detach(SwitchId(17), 1, true);
        // port 3 is free again and must be the next one handed out
        sw.attach(SwitchId(19), 1, true);
        assert_eq!(sw.ports_to(SwitchId(19)), Some(&[3][..]));
        assert_eq!(sw.uplink_ports(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn uplink_tail() {
        let mut sw = Switch::new(SwitchId(13), 5, Tier::Agg, 0);
        sw.attach(SwitchId(9), 1, false);
        sw.attach(SwitchId(10), 1, false);
        sw.attach(SwitchId(17), 2, true);
        sw.attach(SwitchId(18), 1, true);
        assert_eq!(sw.uplink_ports(), vec![3, 4, 5]);
    }
}
