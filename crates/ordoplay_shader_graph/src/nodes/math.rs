// SPDX-License-Identifier: MIT OR Apache-2.0
//! Math operator nodes.
//!
//! Inputs are declared `any`; the result kind comes from the operation rule
//! tables (or a fixed mapping for `mod`) on every recompute.

use super::{declaration, widen};
use crate::compiler::ShaderCompiler;
use crate::node::{CodegenContext, EvalContext, ShaderNode};
use crate::port::{Port, Value, ValueKind};
use crate::rules::{BinaryOperator, OperationRules, TernaryOperator};
use serde::{Deserialize, Serialize};

/// Two-operand math node operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `A + B`
    Add,
    /// `A - B`
    Subtract,
    /// `A * B`
    Multiply,
    /// `A / B`
    Divide,
    /// `dot(A, B)`
    DotProduct,
    /// `cross(A, B)`
    CrossProduct,
    /// `pow(A, B)`
    Pow,
    /// `min(A, B)`
    Min,
    /// `max(A, B)`
    Max,
    /// `mod(A, B)`
    Mod,
}

impl BinaryOp {
    /// Node kind name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::DotProduct => "DotProduct",
            Self::CrossProduct => "CrossProduct",
            Self::Pow => "Pow",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Mod => "Mod",
        }
    }

    fn operator(self) -> Option<BinaryOperator> {
        match self {
            Self::Add => Some(BinaryOperator::Addition),
            Self::Subtract => Some(BinaryOperator::Subtraction),
            Self::Multiply => Some(BinaryOperator::Multiplication),
            Self::Divide => Some(BinaryOperator::Division),
            Self::DotProduct => Some(BinaryOperator::DotProduct),
            Self::CrossProduct => Some(BinaryOperator::CrossProduct),
            Self::Pow => Some(BinaryOperator::Pow),
            Self::Min => Some(BinaryOperator::Min),
            Self::Max => Some(BinaryOperator::Max),
            Self::Mod => None,
        }
    }

    /// Result kind for the given operand kinds
    pub fn resolve(self, rules: &OperationRules, a: ValueKind, b: ValueKind) -> ValueKind {
        match self.operator() {
            Some(op) => rules.resolve(op, a, b),
            None => mod_kind(a, b),
        }
    }

    fn expression(self, a: &Value, b: &Value, output: ValueKind) -> String {
        let (a_name, b_name) = (a.name(), b.name());
        match self {
            Self::Add => format!("{a_name} + {b_name}"),
            Self::Subtract => format!("{a_name} - {b_name}"),
            Self::Multiply => format!("{a_name} * {b_name}"),
            Self::Divide => format!("{a_name} / {b_name}"),
            Self::DotProduct => format!("dot({a_name}, {b_name})"),
            Self::CrossProduct => format!("cross({a_name}, {b_name})"),
            Self::Pow => format!("pow({a_name}, {})", widen(b, output)),
            Self::Min => format!("min({}, {})", widen(a, output), widen(b, output)),
            Self::Max => format!("max({}, {})", widen(a, output), widen(b, output)),
            Self::Mod => format!("mod({a_name}, {b_name})"),
        }
    }
}

// mod(genType, genType) and mod(genType, float)
fn mod_kind(a: ValueKind, b: ValueKind) -> ValueKind {
    let numeric = a.components().is_some();
    if numeric && (a == b || (b == ValueKind::Float && a.is_vector())) {
        a
    } else {
        ValueKind::Invalid
    }
}

/// Two-operand math node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryNode {
    /// Operator
    pub op: BinaryOp,
}

impl BinaryNode {
    /// Create a node for `op`
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }
}

impl ShaderNode for BinaryNode {
    fn type_name(&self) -> &'static str {
        self.op.type_name()
    }

    fn inputs(&self) -> Vec<Port> {
        vec![Port::new("A", ValueKind::Any), Port::new("B", ValueKind::Any)]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Result"]
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        let (a, b) = (cx.input_kind(0), cx.input_kind(1));
        match self.op.resolve(cx.rules, a, b) {
            ValueKind::Invalid => Err(format!(
                "No operation rule for {}({a}, {b})",
                self.type_name()
            )),
            kind => Ok(vec![Value::new(kind, cx.var_name)]),
        }
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let (Some(a), Some(b)) = (cx.input(0), cx.input(1)) else {
            return;
        };
        let output = cx.output(0);
        let expr = self.op.expression(a, b, output.kind());
        if let Some(code) = declaration(output, expr) {
            compiler.add_code(&code);
        }
    }
}

/// Three-operand math node operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TernaryOp {
    /// `mix(A, B, T)`
    Mix,
    /// `smoothstep(Edge0, Edge1, X)`
    SmoothStep,
}

impl TernaryOp {
    /// Node kind name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Mix => "Mix",
            Self::SmoothStep => "SmoothStep",
        }
    }

    fn operator(self) -> TernaryOperator {
        match self {
            Self::Mix => TernaryOperator::Mix,
            Self::SmoothStep => TernaryOperator::SmoothStep,
        }
    }
}

/// Three-operand math node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TernaryNode {
    /// Operator
    pub op: TernaryOp,
}

impl TernaryNode {
    /// Create a node for `op`
    pub fn new(op: TernaryOp) -> Self {
        Self { op }
    }
}

impl ShaderNode for TernaryNode {
    fn type_name(&self) -> &'static str {
        self.op.type_name()
    }

    fn inputs(&self) -> Vec<Port> {
        let names = match self.op {
            TernaryOp::Mix => ["A", "B", "T"],
            TernaryOp::SmoothStep => ["Edge0", "Edge1", "X"],
        };
        names
            .into_iter()
            .map(|name| Port::new(name, ValueKind::Any))
            .collect()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Result"]
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        let (a, b, c) = (cx.input_kind(0), cx.input_kind(1), cx.input_kind(2));
        match cx.rules.resolve_ternary(self.op.operator(), a, b, c) {
            ValueKind::Invalid => Err(format!(
                "No operation rule for {}({a}, {b}, {c})",
                self.type_name()
            )),
            kind => Ok(vec![Value::new(kind, cx.var_name)]),
        }
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let (Some(a), Some(b), Some(c)) = (cx.input(0), cx.input(1), cx.input(2)) else {
            return;
        };
        let output = cx.output(0);
        let expr = match self.op {
            TernaryOp::Mix => format!("mix({}, {}, {})", a.name(), b.name(), c.name()),
            // smoothstep has no (genType, genType, float) overload
            TernaryOp::SmoothStep => format!(
                "smoothstep({}, {}, {})",
                a.name(),
                b.name(),
                widen(c, output.kind())
            ),
        };
        if let Some(code) = declaration(output, expr) {
            compiler.add_code(&code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::OutputRef;
    use crate::graph::Graph;
    use crate::nodes::constant::ConstantNode;
    use crate::nodes::NodeKind;
    use crate::port::PortValue;

    fn constant(graph: &mut Graph, value: PortValue) -> OutputRef {
        OutputRef::new(graph.add_node(NodeKind::Constant(ConstantNode::new(value))), 0)
    }

    fn emit(graph: &Graph, id: crate::node::NodeId) -> Vec<String> {
        let node = graph.node(id).unwrap();
        let mut compiler = ShaderCompiler::default();
        node.generate_code(&graph.input_values(node), &mut compiler);
        compiler.statements().to_vec()
    }

    #[test]
    fn test_add_float_float() {
        let mut graph = Graph::new("math");
        let a = constant(&mut graph, PortValue::Float(1.0));
        let b = constant(&mut graph, PortValue::Float(2.0));
        let add = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        graph.set_input(add, 0, Some(a)).unwrap();
        graph.set_input(add, 1, Some(b)).unwrap();

        let node = graph.node(add).unwrap();
        assert_eq!(node.output_kind(0), ValueKind::Float);
        assert!(node.validation_state().is_valid());
        assert_eq!(emit(&graph, add), ["float Add_2 = Float_0 + Float_1;"]);
    }

    #[test]
    fn test_add_with_unbound_input_emits_nothing() {
        let mut graph = Graph::new("math");
        let a = constant(&mut graph, PortValue::Float(1.0));
        let add = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        graph.set_input(add, 0, Some(a)).unwrap();

        let node = graph.node(add).unwrap();
        assert_eq!(node.validation_state().message(), Some("Inputs count error"));
        assert_eq!(node.output_kind(0), ValueKind::Invalid);

        graph.set_output_node(Some(add)).unwrap();
        let mut compiler = ShaderCompiler::default();
        graph.compile(&mut compiler).unwrap();
        assert_eq!(compiler.statements(), ["float Float_0 = 1.0;"]);
    }

    #[test]
    fn test_missing_rule_is_validation_error() {
        let mut graph = Graph::new("math");
        let a = constant(&mut graph, PortValue::Vector2([0.0; 2]));
        let b = constant(&mut graph, PortValue::Vector3([0.0; 3]));
        let cross = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::CrossProduct)));
        graph.set_input(cross, 0, Some(a)).unwrap();
        graph.set_input(cross, 1, Some(b)).unwrap();
        assert_eq!(
            graph.node(cross).unwrap().validation_state().message(),
            Some("No operation rule for CrossProduct(vec2, vec3)")
        );
    }

    #[test]
    fn test_min_widens_scalar_operand() {
        let mut graph = Graph::new("math");
        let a = constant(&mut graph, PortValue::Float(0.5));
        let b = constant(&mut graph, PortValue::Vector3([1.0; 3]));
        let min = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Min)));
        graph.set_input(min, 0, Some(a)).unwrap();
        graph.set_input(min, 1, Some(b)).unwrap();
        assert_eq!(emit(&graph, min), ["vec3 Min_2 = min(vec3(Float_0), Vector3_1);"]);
    }

    #[test]
    fn test_mod_mapping() {
        assert_eq!(mod_kind(ValueKind::Vector3, ValueKind::Float), ValueKind::Vector3);
        assert_eq!(mod_kind(ValueKind::Float, ValueKind::Float), ValueKind::Float);
        assert_eq!(mod_kind(ValueKind::Float, ValueKind::Vector3), ValueKind::Invalid);
        assert_eq!(mod_kind(ValueKind::Texture, ValueKind::Texture), ValueKind::Invalid);
    }

    #[test]
    fn test_mix_kinds() {
        let mut graph = Graph::new("math");
        let a = constant(&mut graph, PortValue::Vector3([0.0; 3]));
        let b = constant(&mut graph, PortValue::Vector3([1.0; 3]));
        let t = constant(&mut graph, PortValue::Float(0.5));
        let mix = graph.add_node(NodeKind::Ternary(TernaryNode::new(TernaryOp::Mix)));
        graph.set_input(mix, 0, Some(a)).unwrap();
        graph.set_input(mix, 1, Some(b)).unwrap();
        graph.set_input(mix, 2, Some(t)).unwrap();
        assert_eq!(graph.node(mix).unwrap().output_kind(0), ValueKind::Vector3);
        assert_eq!(emit(&graph, mix), ["vec3 Mix_3 = mix(Vector3_0, Vector3_1, Float_2);"]);

        let v2 = constant(&mut graph, PortValue::Vector2([1.0; 2]));
        graph.set_input(mix, 1, Some(v2)).unwrap();
        let node = graph.node(mix).unwrap();
        assert_eq!(node.output_kind(0), ValueKind::Invalid);
        assert_eq!(
            node.validation_state().message(),
            Some("No operation rule for Mix(vec3, vec2, float)")
        );
    }

    #[test]
    fn test_smoothstep_widens_scalar_x() {
        let mut graph = Graph::new("math");
        let a = constant(&mut graph, PortValue::Vector2([0.0; 2]));
        let b = constant(&mut graph, PortValue::Vector2([1.0; 2]));
        let x = constant(&mut graph, PortValue::Float(0.5));
        let step = graph.add_node(NodeKind::Ternary(TernaryNode::new(TernaryOp::SmoothStep)));
        graph.set_input(step, 0, Some(a)).unwrap();
        graph.set_input(step, 1, Some(b)).unwrap();
        graph.set_input(step, 2, Some(x)).unwrap();
        assert_eq!(
            emit(&graph, step),
            ["vec2 SmoothStep_3 = smoothstep(Vector2_0, Vector2_1, vec2(Float_2));"]
        );
    }
}
