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

//! Northbound topology export: the fabric as a node-link JSON graph, consumed by the
//! visualization UI.

use crate::fabric::Fabric;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One switch in the exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Switch id
    pub id: usize,
    /// Tier name (`"host"`, `"edge"`, `"agg"` or `"core"`)
    #[serde(rename = "type")]
    pub tier: String,
    /// Ordinal of the switch within its tier
    pub num: usize,
}

/// One adjacency in the exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    /// Lower endpoint id
    pub source: usize,
    /// Higher endpoint id
    pub target: usize,
    /// Link multiplicity
    pub count: usize,
}

/// Node-link representation of a [`Fabric`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    /// All switches, in ascending id order
    pub nodes: Vec<GraphNode>,
    /// All adjacencies, with `source < target`
    pub links: Vec<GraphLink>,
}

/// Build the node-link representation of the fabric.
pub fn node_link_data(fabric: &Fabric) -> NodeLinkGraph {
    let graph = fabric.to_graph();
    let nodes = graph
        .node_indices()
        .map(|ix| {
            let sid = graph[ix];
            let sw = fabric.get_switch(sid).unwrap();
            GraphNode { id: sid.0, tier: sw.tier().to_string(), num: sw.tier_index() }
        })
        .collect();
    let links = graph
        .edge_indices()
        .map(|ex| {
            let (a, b) = graph.edge_endpoints(ex).unwrap();
            GraphLink { source: graph[a].0, target: graph[b].0, count: graph[ex] }
        })
        .collect();
    NodeLinkGraph { nodes, links }
}

/// Serialize the fabric as pretty-printed node-link JSON into `writer`.
pub fn write_topology<W: Write>(fabric: &Fabric, writer: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, &node_link_data(fabric))
}
