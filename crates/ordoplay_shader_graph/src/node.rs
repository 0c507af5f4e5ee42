// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the shader graph.
//!
//! A [`Node`] is the graph-owned record around one concrete node kind: its
//! id, its input bindings, its current output values and its validation
//! state. The per-kind behavior lives behind the [`ShaderNode`] trait.

use crate::compiler::ShaderCompiler;
use crate::connection::OutputRef;
use crate::document::DocumentError;
use crate::nodes::NodeKind;
use crate::port::{Port, Value, ValueKind};
use crate::rules::OperationRules;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Largest id a graph accepts from a document
    pub const MAX: NodeId = NodeId(i64::MAX as u64);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic node id source owned by a graph
#[derive(Debug, Clone, Default)]
pub struct NodeIdAllocator {
    next: u64,
}

impl NodeIdAllocator {
    /// Create an allocator starting at id 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Make sure `id` is never handed out again.
    ///
    /// Returns `false` for ids above [`NodeId::MAX`].
    pub fn reserve(&mut self, id: NodeId) -> bool {
        if id > NodeId::MAX {
            return false;
        }
        self.next = self.next.max(id.0 + 1);
        true
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants, attributes, uniforms)
    Input,
    /// Output nodes
    Output,
    /// Math operations
    Math,
    /// Texture operations
    Texture,
    /// Utility nodes (combine, split, conversions)
    Utility,
    /// Custom/user-defined
    Custom,
}

/// Validation state of a node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationState {
    /// Node can emit code
    #[default]
    Valid,
    /// Node is skipped during emission
    Error(String),
}

impl ValidationState {
    /// Whether the node is valid
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Error message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Error(message) => Some(message),
        }
    }
}

/// How unbound inputs are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPolicy {
    /// Every declared input must be bound
    Required,
    /// Unbound inputs fall back to a neutral default
    Optional,
}

/// Inputs handed to [`ShaderNode::evaluate`]
pub struct EvalContext<'a> {
    /// Derived variable name of the node
    pub var_name: &'a str,
    /// Bound input values, already unwrapped from `Any`
    pub inputs: &'a [Option<&'a Value>],
    /// Operation rule tables
    pub rules: &'a OperationRules,
}

impl<'a> EvalContext<'a> {
    /// Bound value at `port`
    pub fn input(&self, port: usize) -> Option<&'a Value> {
        self.inputs.get(port).copied().flatten()
    }

    /// Kind at `port`, `Invalid` when unbound
    pub fn input_kind(&self, port: usize) -> ValueKind {
        self.input(port).map_or(ValueKind::Invalid, Value::kind)
    }
}

/// Inputs handed to [`ShaderNode::generate_code`]
pub struct CodegenContext<'a> {
    /// Derived variable name of the node
    pub var_name: &'a str,
    /// Bound input values, already unwrapped from `Any`
    pub inputs: &'a [Option<&'a Value>],
    /// Current output values of the node
    pub outputs: &'a [Value],
}

impl<'a> CodegenContext<'a> {
    /// Bound value at `port`
    pub fn input(&self, port: usize) -> Option<&'a Value> {
        self.inputs.get(port).copied().flatten()
    }

    /// Output value at `port`
    pub fn output(&self, port: usize) -> &'a Value {
        static INVALID: Value = Value::Invalid;
        self.outputs.get(port).unwrap_or(&INVALID)
    }
}

/// Behavior shared by every concrete node kind
pub trait ShaderNode {
    /// Kind name used for display and variable names (`Add`, `Float`, ...)
    fn type_name(&self) -> &'static str;

    /// Declared input ports in order
    fn inputs(&self) -> Vec<Port>;

    /// Output port names in order
    fn outputs(&self) -> &'static [&'static str];

    /// How unbound inputs are treated
    fn input_policy(&self) -> InputPolicy {
        InputPolicy::Required
    }

    /// User-chosen name when the node is promoted to a uniform parameter
    fn uniform_name(&self) -> Option<&str> {
        None
    }

    /// Names declared at global scope (uniform block members and samplers)
    /// when the node emits code
    fn exported_names(&self, _var_name: &str) -> Vec<String> {
        Vec::new()
    }

    /// Compute the output values from inputs that already passed port checks.
    ///
    /// An `Err` message becomes the node's validation error.
    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String>;

    /// Emit declarations and statements for a valid node
    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler);
}

/// Result of a recompute, applied to the node afterwards
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evaluation {
    pub outputs: Vec<Value>,
    pub validation: ValidationState,
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    inputs: Vec<Option<OutputRef>>,
    outputs: Vec<Value>,
    validation: ValidationState,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        let inputs = vec![None; kind.behavior().inputs().len()];
        let outputs = vec![Value::Invalid; kind.behavior().outputs().len()];
        Self {
            id,
            kind,
            inputs,
            outputs,
            validation: ValidationState::Valid,
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Literal state of the node
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Kind name
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Variable name emitted for this node: the uniform name when promoted,
    /// `<Kind>_<id>` otherwise
    pub fn variable_name(&self) -> String {
        match self.kind.behavior().uniform_name() {
            Some(name) => name.to_string(),
            None => format!("{}_{}", self.type_name(), self.id),
        }
    }

    /// Global names this node declares, one namespace per compile pass
    pub fn exported_names(&self) -> Vec<String> {
        self.kind.behavior().exported_names(&self.variable_name())
    }

    /// Declared input ports
    pub fn input_ports(&self) -> Vec<Port> {
        self.kind.behavior().inputs()
    }

    /// Declared input kinds
    pub fn declared_input_kinds(&self) -> Vec<ValueKind> {
        self.input_ports().into_iter().map(|port| port.kind).collect()
    }

    /// Output port names
    pub fn output_names(&self) -> &'static [&'static str] {
        self.kind.behavior().outputs()
    }

    /// Current kind of an output port (`Invalid` if out of range)
    pub fn output_kind(&self, port: usize) -> ValueKind {
        self.outputs.get(port).map_or(ValueKind::Invalid, Value::kind)
    }

    /// Current value of an output port
    pub fn current_output(&self, port: usize) -> Option<&Value> {
        self.outputs.get(port)
    }

    /// All current output values
    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }

    /// Input bindings, one slot per declared port
    pub fn bindings(&self) -> &[Option<OutputRef>] {
        &self.inputs
    }

    /// Binding of one input port
    pub fn binding(&self, port: usize) -> Option<OutputRef> {
        self.inputs.get(port).copied().flatten()
    }

    /// Validation state
    pub fn validation_state(&self) -> &ValidationState {
        &self.validation
    }

    /// Serialize the literal state of the node as RON.
    ///
    /// Computed values and bindings are never part of it.
    pub fn save(&self) -> Result<String, DocumentError> {
        Ok(ron::to_string(&self.kind)?)
    }

    /// Replace the literal state from a [`Node::save`] document.
    ///
    /// The caller recomputes afterwards.
    pub(crate) fn restore(&mut self, doc: &str) -> Result<(), DocumentError> {
        let kind: NodeKind = ron::from_str(doc)?;
        if kind.type_name() != self.type_name() {
            return Err(DocumentError::KindMismatch {
                expected: self.type_name(),
                found: kind.type_name(),
            });
        }
        self.kind = kind;
        self.sync_ports();
        Ok(())
    }

    /// Resize binding and output slots after the declared ports changed.
    ///
    /// Returns the bindings that were dropped.
    pub(crate) fn sync_ports(&mut self) -> Vec<OutputRef> {
        let declared = self.kind.behavior().inputs().len();
        let dropped = self
            .inputs
            .iter()
            .skip(declared)
            .filter_map(|binding| *binding)
            .collect();
        self.inputs.resize(declared, None);
        self.outputs
            .resize(self.kind.behavior().outputs().len(), Value::Invalid);
        dropped
    }

    /// Replace the binding of `port`, returning the previous one
    pub(crate) fn bind(&mut self, port: usize, source: Option<OutputRef>) -> Option<OutputRef> {
        std::mem::replace(&mut self.inputs[port], source)
    }

    /// Recompute outputs and validation from resolved input values.
    ///
    /// `inputs` holds one entry per binding slot; unbound or dangling
    /// bindings are `None`.
    pub(crate) fn evaluate(&self, inputs: &[Option<&Value>], rules: &OperationRules) -> Evaluation {
        let behavior = self.kind.behavior();
        let output_count = behavior.outputs().len();

        let result = check_inputs(&behavior.inputs(), behavior.input_policy(), inputs).and_then(|()| {
            let unwrapped: Vec<Option<&Value>> =
                inputs.iter().map(|value| value.map(Value::unwrap_any)).collect();
            let var_name = self.variable_name();
            behavior.evaluate(&EvalContext {
                var_name: &var_name,
                inputs: &unwrapped,
                rules,
            })
        });

        match result {
            Ok(mut outputs) => {
                outputs.resize(output_count, Value::Invalid);
                Evaluation {
                    outputs,
                    validation: ValidationState::Valid,
                }
            }
            Err(message) => Evaluation {
                outputs: vec![Value::Invalid; output_count],
                validation: ValidationState::Error(message),
            },
        }
    }

    /// Evaluation that puts the node in the error state
    pub(crate) fn reject(&self, message: String) -> Evaluation {
        Evaluation {
            outputs: vec![Value::Invalid; self.kind.behavior().outputs().len()],
            validation: ValidationState::Error(message),
        }
    }

    /// Store a recompute result; returns whether anything changed
    pub(crate) fn apply(&mut self, evaluation: Evaluation) -> bool {
        if let ValidationState::Error(message) = &evaluation.validation {
            if self.validation != evaluation.validation {
                tracing::debug!(node = %self.id, kind = self.type_name(), %message, "node validation failed");
            }
        }
        let changed = self.outputs != evaluation.outputs || self.validation != evaluation.validation;
        self.outputs = evaluation.outputs;
        self.validation = evaluation.validation;
        changed
    }

    /// Emit code for this node; callers skip nodes in the error state
    pub(crate) fn generate_code(&self, inputs: &[Option<&Value>], compiler: &mut ShaderCompiler) {
        let unwrapped: Vec<Option<&Value>> =
            inputs.iter().map(|value| value.map(Value::unwrap_any)).collect();
        let var_name = self.variable_name();
        self.kind.behavior().generate_code(
            &CodegenContext {
                var_name: &var_name,
                inputs: &unwrapped,
                outputs: &self.outputs,
            },
            compiler,
        );
    }
}

fn check_inputs(ports: &[Port], policy: InputPolicy, inputs: &[Option<&Value>]) -> Result<(), String> {
    let bound = inputs.iter().filter(|value| value.is_some()).count();
    if inputs.len() > ports.len() || (policy == InputPolicy::Required && bound != ports.len()) {
        return Err("Inputs count error".to_string());
    }

    for (port, value) in ports.iter().zip(inputs) {
        let Some(value) = value else {
            continue;
        };
        if value.is_invalid() {
            return Err(format!("Input '{}' is invalid", port.name));
        }
        if !port.accepts(value) {
            return Err(format!(
                "Input '{}' expects {} but got {}",
                port.name,
                port.kind,
                value.concrete_kind()
            ));
        }
    }
    Ok(())
}

/// Node type definition
pub struct NodeType {
    /// Unique type identifier
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: &'static str,
    /// Constructor for the default literal state
    pub create: fn() -> NodeKind,
}

/// Registry of available node types
pub struct NodeRegistry {
    types: IndexMap<&'static str, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id, node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create the default literal state for a type ID
    pub fn create(&self, type_id: &str) -> Option<NodeKind> {
        self.get(type_id).map(|t| (t.create)())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::math::{BinaryNode, BinaryOp};

    #[test]
    fn test_id_allocator_is_monotonic() {
        let mut ids = NodeIdAllocator::new();
        assert_eq!(ids.allocate(), NodeId(0));
        assert_eq!(ids.allocate(), NodeId(1));
        assert!(ids.reserve(NodeId(9)));
        assert_eq!(ids.allocate(), NodeId(10));
        assert!(ids.reserve(NodeId(2)));
        assert_eq!(ids.allocate(), NodeId(11));
    }

    #[test]
    fn test_reserve_rejects_ids_past_max() {
        let mut ids = NodeIdAllocator::new();
        assert!(!ids.reserve(NodeId(u64::MAX)));
        assert!(ids.reserve(NodeId::MAX));
        assert_eq!(ids.allocate(), NodeId(NodeId::MAX.0 + 1));
    }

    #[test]
    fn test_unbound_input_is_count_error() {
        let node = Node::new(NodeId(7), NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        let a = Value::new(ValueKind::Float, "A_3");
        let evaluation = node.evaluate(&[Some(&a), None], OperationRules::shared());
        assert_eq!(
            evaluation.validation,
            ValidationState::Error("Inputs count error".to_string())
        );
        assert_eq!(evaluation.outputs, vec![Value::Invalid]);
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let node = Node::new(NodeId(1), NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        let a = Value::new(ValueKind::Float, "A_3");
        let evaluation = node.evaluate(&[Some(&a), Some(&Value::Invalid)], OperationRules::shared());
        assert_eq!(evaluation.validation.message(), Some("Input 'B' is invalid"));
    }

    #[test]
    fn test_variable_name_uses_kind_and_id() {
        let node = Node::new(NodeId(7), NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        assert_eq!(node.variable_name(), "Add_7");
        assert_eq!(node.declared_input_kinds(), vec![ValueKind::Any, ValueKind::Any]);
    }

    #[test]
    fn test_restore_rejects_other_kind() {
        let add = Node::new(NodeId(1), NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        let mut max = Node::new(NodeId(2), NodeKind::Binary(BinaryNode::new(BinaryOp::Max)));
        let doc = add.save().unwrap();
        assert!(matches!(
            max.restore(&doc),
            Err(DocumentError::KindMismatch { expected: "Max", found: "Add" })
        ));
    }
}
