// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and their input bindings.
//!
//! Edges live on the destination node as one optional [`OutputRef`] per
//! input slot. Every change to a binding or to a node's literal state
//! recomputes the affected node and everything downstream of it.

use crate::compiler::{ShaderCompiler, ShaderSource};
use crate::connection::{Connection, OutputRef};
use crate::document::{DocumentError, GraphDocument};
use crate::evaluation::{self, EvaluationError};
use crate::node::{Node, NodeId, NodeIdAllocator, NodeRegistry};
use crate::nodes::NodeKind;
use crate::port::Value;
use crate::rules::OperationRules;
use indexmap::IndexMap;
use std::collections::HashSet;

/// A shader node graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    ids: NodeIdAllocator,
    /// Designated shader output node
    output: Option<NodeId>,
    rules: &'static OperationRules,
}

impl Graph {
    /// Create a new empty graph using the shared rule tables
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rules(name, OperationRules::shared())
    }

    /// Create a new empty graph resolving kinds with `rules`
    pub fn with_rules(name: impl Into<String>, rules: &'static OperationRules) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            ids: NodeIdAllocator::new(),
            output: None,
            rules,
        }
    }

    /// Rule tables used for kind resolution
    pub fn rules(&self) -> &'static OperationRules {
        self.rules
    }

    /// Add a node and compute its initial outputs
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.ids.allocate();
        self.nodes.insert(id, Node::new(id, kind));
        self.recompute(id);
        tracing::trace!(node = %id, "node added");
        id
    }

    /// Add a node of a registered type with its default literal state
    pub fn add_node_of_type(&mut self, registry: &NodeRegistry, type_id: &str) -> Option<NodeId> {
        registry.create(type_id).map(|kind| self.add_node(kind))
    }

    /// Insert a node under a fixed id without recomputing
    pub(crate) fn insert_node_with_id(&mut self, id: NodeId, kind: NodeKind) -> Result<(), DocumentError> {
        if self.nodes.contains_key(&id) {
            return Err(DocumentError::DuplicateNode(id));
        }
        if !self.ids.reserve(id) {
            return Err(DocumentError::IdOutOfRange(id));
        }
        self.nodes.insert(id, Node::new(id, kind));
        Ok(())
    }

    /// Remove a node.
    ///
    /// Bindings reading from it are cleared first and the former consumers
    /// recompute once.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, EvaluationError> {
        let node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(EvaluationError::NodeNotFound(node_id))?;
        if self.output == Some(node_id) {
            self.output = None;
        }

        let mut affected = Vec::new();
        for consumer in self.nodes.values_mut() {
            for port in 0..consumer.bindings().len() {
                if consumer.binding(port).is_some_and(|source| source.node == node_id) {
                    consumer.bind(port, None);
                    if !affected.contains(&consumer.id()) {
                        affected.push(consumer.id());
                    }
                }
            }
        }
        tracing::debug!(node = %node_id, consumers = affected.len(), "node removed");
        self.propagate(&affected)?;
        Ok(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Whether the graph holds `node_id`
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Designated output node
    pub fn output_node(&self) -> Option<NodeId> {
        self.output
    }

    /// Designate the node whose dependencies get compiled
    pub fn set_output_node(&mut self, node_id: Option<NodeId>) -> Result<(), ConnectionError> {
        if let Some(id) = node_id {
            if !self.contains_node(id) {
                return Err(ConnectionError::NodeNotFound(id));
            }
        }
        self.output = node_id;
        Ok(())
    }

    /// All edges, ordered by destination node then input port
    pub fn connections(&self) -> Vec<Connection> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.bindings()
                    .iter()
                    .enumerate()
                    .filter_map(move |(port, binding)| {
                        binding.map(|source| Connection::new(source.node, source.port, node.id(), port))
                    })
            })
            .collect()
    }

    /// Edges into or out of `node_id`
    pub fn connections_for_node(&self, node_id: NodeId) -> Vec<Connection> {
        self.connections()
            .into_iter()
            .filter(|connection| connection.involves_node(node_id))
            .collect()
    }

    /// Nodes with at least one input bound to an output of `node_id`
    pub fn consumers(&self, node_id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.bindings().iter().flatten().any(|source| source.node == node_id))
            .map(Node::id)
            .collect()
    }

    /// Current value behind an output reference
    pub fn output_value(&self, source: OutputRef) -> Option<&Value> {
        self.nodes.get(&source.node)?.current_output(source.port)
    }

    /// Resolved values for every binding slot of `node`
    pub fn input_values(&self, node: &Node) -> Vec<Option<&Value>> {
        node.bindings()
            .iter()
            .map(|binding| binding.and_then(|source| self.output_value(source)))
            .collect()
    }

    /// Bind (or clear) an input slot and propagate.
    ///
    /// Returns the previous binding. Rejected edges leave the graph unchanged.
    pub fn set_input(
        &mut self,
        node_id: NodeId,
        port: usize,
        source: Option<OutputRef>,
    ) -> Result<Option<OutputRef>, ConnectionError> {
        let target = self
            .nodes
            .get(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?;
        let count = target.bindings().len();
        if port >= count {
            return Err(ConnectionError::InputOutOfRange {
                node: node_id,
                port,
                count,
            });
        }

        if let Some(source) = source {
            let producer = self
                .nodes
                .get(&source.node)
                .ok_or(ConnectionError::NodeNotFound(source.node))?;
            let outputs = producer.output_names().len();
            if source.port >= outputs {
                return Err(ConnectionError::OutputOutOfRange {
                    node: source.node,
                    port: source.port,
                    count: outputs,
                });
            }
            if source.node == node_id {
                return Err(ConnectionError::SelfLoop);
            }
            if self.depends_on(source.node, node_id) {
                return Err(ConnectionError::WouldCycle {
                    from: source.node,
                    to: node_id,
                });
            }
        }

        let previous = self
            .nodes
            .get_mut(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?
            .bind(port, source);
        tracing::debug!(node = %node_id, port, source = ?source, "input binding changed");
        self.propagate(&[node_id])?;
        Ok(previous)
    }

    /// Connect `from_node.from_port` into `to_node.to_port`
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: usize,
        to_node: NodeId,
        to_port: usize,
    ) -> Result<Option<OutputRef>, ConnectionError> {
        self.set_input(to_node, to_port, Some(OutputRef::new(from_node, from_port)))
    }

    /// Clear the binding of `to_node.to_port`
    pub fn disconnect(&mut self, to_node: NodeId, to_port: usize) -> Result<Option<OutputRef>, ConnectionError> {
        self.set_input(to_node, to_port, None)
    }

    /// Change the literal state of a node and propagate.
    ///
    /// Inputs beyond the new port count and downstream bindings to outputs
    /// that no longer exist are dropped.
    pub fn edit_node<F>(&mut self, node_id: NodeId, edit: F) -> Result<(), ConnectionError>
    where
        F: FnOnce(&mut NodeKind),
    {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?;
        edit(node.kind_mut());
        let dropped = node.sync_ports();
        if !dropped.is_empty() {
            tracing::debug!(node = %node_id, dropped = dropped.len(), "inputs dropped by edit");
        }
        let affected = self.detach_stale_consumers(node_id);
        self.propagate_with(node_id, affected)?;
        Ok(())
    }

    /// Replace a node's literal state from a [`Node::save`] document and
    /// propagate
    pub fn restore_node(&mut self, node_id: NodeId, doc: &str) -> Result<(), DocumentError> {
        self.nodes
            .get_mut(&node_id)
            .ok_or(DocumentError::NodeNotFound(node_id))?
            .restore(doc)?;
        let affected = self.detach_stale_consumers(node_id);
        self.propagate_with(node_id, affected)?;
        Ok(())
    }

    /// Run a compile pass into `compiler`
    pub fn compile(&self, compiler: &mut ShaderCompiler) -> Result<ShaderSource, EvaluationError> {
        evaluation::compile_graph(self, compiler)
    }

    /// Serialize the graph as a RON document
    pub fn save(&self) -> Result<String, DocumentError> {
        GraphDocument::from_graph(self).to_ron()
    }

    /// Load a graph from a RON document
    pub fn load(text: &str) -> Result<Self, DocumentError> {
        GraphDocument::from_ron(text)?.into_graph()
    }

    /// Recompute every node
    pub(crate) fn recompute_all(&mut self) -> Result<(), EvaluationError> {
        let all: Vec<NodeId> = self.node_ids().collect();
        self.propagate(&all)
    }

    /// Recompute `starts` and everything downstream, then settle uniform
    /// name conflicts
    fn propagate(&mut self, starts: &[NodeId]) -> Result<(), EvaluationError> {
        self.cascade(starts)?;
        self.resolve_name_conflicts()
    }

    /// Recompute `starts` and everything downstream, each exactly once
    fn cascade(&mut self, starts: &[NodeId]) -> Result<(), EvaluationError> {
        if starts.is_empty() {
            return Ok(());
        }
        let order = evaluation::propagation_order(self, starts)?;
        tracing::trace!(starts = starts.len(), nodes = order.len(), "recompute cascade");
        for id in order {
            self.recompute(id);
        }
        Ok(())
    }

    /// Re-check every node declaring global names in graph order and
    /// cascade from the ones whose state changed.
    ///
    /// A name belongs to the first valid node declaring it.
    fn resolve_name_conflicts(&mut self) -> Result<(), EvaluationError> {
        loop {
            let declaring: Vec<NodeId> = self
                .nodes
                .values()
                .filter(|node| !node.exported_names().is_empty())
                .map(Node::id)
                .collect();
            let changed: Vec<NodeId> = declaring.into_iter().filter(|&id| self.recompute(id)).collect();
            if changed.is_empty() {
                return Ok(());
            }
            tracing::debug!(nodes = changed.len(), "uniform name conflicts changed");
            self.cascade(&changed)?;
        }
    }

    fn propagate_with(&mut self, node_id: NodeId, mut affected: Vec<NodeId>) -> Result<(), EvaluationError> {
        affected.insert(0, node_id);
        self.propagate(&affected)
    }

    /// Recompute one node; returns whether its outputs or validation changed
    fn recompute(&mut self, node_id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&node_id) else {
            return false;
        };
        let mut evaluation = node.evaluate(&self.input_values(node), self.rules);
        if evaluation.validation.is_valid() {
            if let Some(name) = self.claimed_name(node) {
                evaluation = node.reject(format!("Duplicate uniform name '{name}'"));
            }
        }
        self.nodes
            .get_mut(&node_id)
            .is_some_and(|node| node.apply(evaluation))
    }

    /// First global name of `node` already declared by a valid node before
    /// it in graph order
    fn claimed_name(&self, node: &Node) -> Option<String> {
        let names = node.exported_names();
        if names.is_empty() {
            return None;
        }
        self.nodes
            .values()
            .take_while(|other| other.id() != node.id())
            .filter(|other| other.validation_state().is_valid())
            .flat_map(Node::exported_names)
            .find(|name| names.contains(name))
    }

    /// Clear bindings that read outputs `node_id` no longer has
    fn detach_stale_consumers(&mut self, node_id: NodeId) -> Vec<NodeId> {
        let Some(outputs) = self.nodes.get(&node_id).map(|node| node.output_names().len()) else {
            return Vec::new();
        };
        let mut affected = Vec::new();
        for consumer in self.nodes.values_mut() {
            for port in 0..consumer.bindings().len() {
                if consumer
                    .binding(port)
                    .is_some_and(|source| source.node == node_id && source.port >= outputs)
                {
                    consumer.bind(port, None);
                    affected.push(consumer.id());
                }
            }
        }
        affected
    }

    /// Whether `node_id` reads, directly or transitively, from `upstream`
    fn depends_on(&self, node_id: NodeId, upstream: NodeId) -> bool {
        let mut stack = vec![node_id];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == upstream {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.bindings().iter().flatten().map(|source| source.node));
            }
        }
        false
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when changing a binding
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Input port index past the declared ports
    #[error("Node {node} has {count} inputs, no input {port}")]
    InputOutOfRange {
        /// Destination node
        node: NodeId,
        /// Requested port
        port: usize,
        /// Declared input count
        count: usize,
    },

    /// Output port index past the node's outputs
    #[error("Node {node} has {count} outputs, no output {port}")]
    OutputOutOfRange {
        /// Source node
        node: NodeId,
        /// Requested port
        port: usize,
        /// Output count
        count: usize,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Edge would close a cycle
    #[error("Connecting {from} into {to} would create a cycle")]
    WouldCycle {
        /// Source node
        from: NodeId,
        /// Destination node
        to: NodeId,
    },

    /// Propagation failed
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
