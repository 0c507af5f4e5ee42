// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.
//!
//! An edge is stored on the destination node as an [`OutputRef`] in the
//! bound input slot. [`Connection`] is the flattened form used by documents
//! and queries.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Reference to one output port of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// Source node ID
    pub node: NodeId,
    /// Source output port index
    pub port: usize,
}

impl OutputRef {
    /// Create a new output reference
    pub fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

/// A connection between two ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source node ID
    pub from_node: NodeId,
    /// Source output port index
    pub from_port: usize,
    /// Target node ID
    pub to_node: NodeId,
    /// Target input port index
    pub to_port: usize,
}

impl Connection {
    /// Create a new connection
    pub fn new(from_node: NodeId, from_port: usize, to_node: NodeId, to_port: usize) -> Self {
        Self {
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }

    /// Source side of the connection
    pub fn source(&self) -> OutputRef {
        OutputRef::new(self.from_node, self.from_port)
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}
