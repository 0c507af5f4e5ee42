// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nodes that reshape values: combine, split, convert and box to `any`.

use super::declaration;
use crate::compiler::ShaderCompiler;
use crate::node::{CodegenContext, EvalContext, InputPolicy, ShaderNode};
use crate::port::{Port, Value, ValueKind};
use serde::{Deserialize, Serialize};

const COMPONENTS: [&str; 4] = ["X", "Y", "Z", "W"];
const SWIZZLE: [&str; 4] = ["x", "y", "z", "w"];

fn vector_target(kind: ValueKind) -> Result<usize, String> {
    match kind.components() {
        Some(n) if n > 1 => Ok(n),
        _ => Err(format!("Target kind {kind} is not a vector")),
    }
}

/// Builds a vector from float components.
///
/// Unbound components are `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineNode {
    /// Vector kind produced
    pub target: ValueKind,
}

impl Default for CombineNode {
    fn default() -> Self {
        Self {
            target: ValueKind::Vector4,
        }
    }
}

impl CombineNode {
    /// Combine into `target`
    pub fn new(target: ValueKind) -> Self {
        Self { target }
    }
}

impl ShaderNode for CombineNode {
    fn type_name(&self) -> &'static str {
        "Combine"
    }

    fn inputs(&self) -> Vec<Port> {
        let count = self.target.components().unwrap_or(0).min(COMPONENTS.len());
        COMPONENTS[..count]
            .iter()
            .map(|name| Port::new(*name, ValueKind::Float))
            .collect()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Result"]
    }

    fn input_policy(&self) -> InputPolicy {
        InputPolicy::Optional
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        vector_target(self.target)?;
        Ok(vec![Value::new(self.target, cx.var_name)])
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let (Ok(count), Some(glsl_type)) = (vector_target(self.target), self.target.glsl_type())
        else {
            return;
        };
        let args: Vec<&str> = (0..count)
            .map(|i| cx.input(i).map_or("0.0", Value::name))
            .collect();
        if let Some(code) = declaration(cx.output(0), format!("{glsl_type}({})", args.join(", "))) {
            compiler.add_code(&code);
        }
    }
}

/// Splits a vector into float components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitNode;

impl ShaderNode for SplitNode {
    fn type_name(&self) -> &'static str {
        "Split"
    }

    fn inputs(&self) -> Vec<Port> {
        vec![Port::new("In", ValueKind::Any)]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &COMPONENTS
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        let kind = cx.input_kind(0);
        if !kind.is_vector() {
            return Err(format!("Cannot split {kind}"));
        }
        let count = kind.components().unwrap_or(0);
        Ok(SWIZZLE[..count]
            .iter()
            .map(|c| Value::new(ValueKind::Float, format!("{}_{c}", cx.var_name)))
            .collect())
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let Some(input) = cx.input(0) else {
            return;
        };
        for (port, c) in SWIZZLE.iter().enumerate() {
            let output = cx.output(port);
            if let Some(code) = declaration(output, format!("{}.{c}", input.name())) {
                compiler.add_code(&code);
            }
        }
    }
}

/// Widens a float into every component of a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertNode {
    /// Vector kind produced
    pub target: ValueKind,
}

impl Default for ConvertNode {
    fn default() -> Self {
        Self {
            target: ValueKind::Vector3,
        }
    }
}

impl ConvertNode {
    /// Convert into `target`
    pub fn new(target: ValueKind) -> Self {
        Self { target }
    }
}

impl ShaderNode for ConvertNode {
    fn type_name(&self) -> &'static str {
        "Convert"
    }

    fn inputs(&self) -> Vec<Port> {
        vec![Port::new("X", ValueKind::Float)]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Result"]
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        vector_target(self.target)?;
        Ok(vec![Value::new(self.target, cx.var_name)])
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let (Some(x), Some(glsl_type)) = (cx.input(0), self.target.glsl_type()) else {
            return;
        };
        if let Some(code) = declaration(cx.output(0), format!("{glsl_type}({})", x.name())) {
            compiler.add_code(&code);
        }
    }
}

/// Boxes its input so it can feed ports declared as `any`.
///
/// Emits no code; the boxed value keeps the inner name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToAnyNode;

impl ShaderNode for ToAnyNode {
    fn type_name(&self) -> &'static str {
        "ToAny"
    }

    fn inputs(&self) -> Vec<Port> {
        vec![Port::new("In", ValueKind::Any)]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Any"]
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        let input = cx.input(0).ok_or_else(|| "Inputs count error".to_string())?;
        Ok(vec![Value::boxed(input.clone())])
    }

    fn generate_code(&self, _cx: &CodegenContext<'_>, _compiler: &mut ShaderCompiler) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::OutputRef;
    use crate::graph::Graph;
    use crate::node::NodeId;
    use crate::nodes::constant::ConstantNode;
    use crate::nodes::NodeKind;
    use crate::port::PortValue;

    fn constant(graph: &mut Graph, value: PortValue) -> OutputRef {
        OutputRef::new(graph.add_node(NodeKind::Constant(ConstantNode::new(value))), 0)
    }

    fn emit(graph: &Graph, id: NodeId) -> Vec<String> {
        let node = graph.node(id).unwrap();
        let mut compiler = ShaderCompiler::default();
        node.generate_code(&graph.input_values(node), &mut compiler);
        compiler.statements().to_vec()
    }

    #[test]
    fn test_combine_fills_missing_components() {
        let mut graph = Graph::new("structural");
        let x = constant(&mut graph, PortValue::Float(1.0));
        let y = constant(&mut graph, PortValue::Float(2.0));
        let combine = graph.add_node(NodeKind::Combine(CombineNode::default()));
        graph.set_input(combine, 0, Some(x)).unwrap();
        graph.set_input(combine, 1, Some(y)).unwrap();

        let node = graph.node(combine).unwrap();
        assert!(node.validation_state().is_valid());
        assert_eq!(node.output_kind(0), ValueKind::Vector4);
        assert_eq!(
            emit(&graph, combine),
            ["vec4 Combine_2 = vec4(Float_0, Float_1, 0.0, 0.0);"]
        );
    }

    #[test]
    fn test_combine_ports_follow_target() {
        assert_eq!(CombineNode::new(ValueKind::Vector2).inputs().len(), 2);
        assert_eq!(CombineNode::new(ValueKind::Color).inputs().len(), 4);
        assert!(CombineNode::new(ValueKind::Texture).inputs().is_empty());
    }

    #[test]
    fn test_split_vector3() {
        let mut graph = Graph::new("structural");
        let v = constant(&mut graph, PortValue::Vector3([1.0, 2.0, 3.0]));
        let split = graph.add_node(NodeKind::Split(SplitNode));
        graph.set_input(split, 0, Some(v)).unwrap();

        let node = graph.node(split).unwrap();
        assert_eq!(node.output_kind(2), ValueKind::Float);
        assert_eq!(node.output_kind(3), ValueKind::Invalid);
        assert_eq!(
            emit(&graph, split),
            [
                "float Split_1_x = Vector3_0.x;",
                "float Split_1_y = Vector3_0.y;",
                "float Split_1_z = Vector3_0.z;",
            ]
        );
    }

    #[test]
    fn test_split_scalar_is_error() {
        let mut graph = Graph::new("structural");
        let f = constant(&mut graph, PortValue::Float(1.0));
        let split = graph.add_node(NodeKind::Split(SplitNode));
        graph.set_input(split, 0, Some(f)).unwrap();
        assert_eq!(
            graph.node(split).unwrap().validation_state().message(),
            Some("Cannot split float")
        );
    }

    #[test]
    fn test_convert_rejects_vector_input() {
        let mut graph = Graph::new("structural");
        let v = constant(&mut graph, PortValue::Vector2([0.0; 2]));
        let convert = graph.add_node(NodeKind::Convert(ConvertNode::default()));
        graph.set_input(convert, 0, Some(v)).unwrap();
        assert_eq!(
            graph.node(convert).unwrap().validation_state().message(),
            Some("Input 'X' expects float but got vec2")
        );

        let f = constant(&mut graph, PortValue::Float(0.25));
        graph.set_input(convert, 0, Some(f)).unwrap();
        assert_eq!(emit(&graph, convert), ["vec3 Convert_1 = vec3(Float_2);"]);
    }

    #[test]
    fn test_to_any_boxes_without_code() {
        let mut graph = Graph::new("structural");
        let v = constant(&mut graph, PortValue::Color([1.0; 4]));
        let boxed = graph.add_node(NodeKind::ToAny(ToAnyNode));
        graph.set_input(boxed, 0, Some(v)).unwrap();

        let node = graph.node(boxed).unwrap();
        assert_eq!(node.output_kind(0), ValueKind::Any);
        assert_eq!(node.current_output(0).unwrap().concrete_kind(), ValueKind::Color);
        assert_eq!(node.current_output(0).unwrap().name(), "Color_0");
        assert!(emit(&graph, boxed).is_empty());
    }
}
