// SPDX-License-Identifier: MIT OR Apache-2.0
//! User-authored GLSL function node.
//!
//! The parameter list declares the input ports and the body becomes a free
//! function named `<var>_Func`, called once from `main()`.

use super::{declaration, is_identifier};
use crate::compiler::ShaderCompiler;
use crate::node::{CodegenContext, EvalContext, ShaderNode};
use crate::port::{Port, Value, ValueKind};
use serde::{Deserialize, Serialize};

/// Hand-written GLSL function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlslNode {
    /// Comma separated `type name` pairs, e.g. `vec2 uv, float scale`
    pub parameters: String,
    /// Function body without the surrounding braces
    pub body: String,
    /// Kind of the returned value
    pub return_kind: ValueKind,
}

impl Default for GlslNode {
    fn default() -> Self {
        Self {
            parameters: "vec2 uv".to_string(),
            body: "return vec4(uv, 0.0, 1.0);".to_string(),
            return_kind: ValueKind::Vector4,
        }
    }
}

impl GlslNode {
    /// Create a function node
    pub fn new(parameters: impl Into<String>, body: impl Into<String>, return_kind: ValueKind) -> Self {
        Self {
            parameters: parameters.into(),
            body: body.into(),
            return_kind,
        }
    }

    /// Parse the parameter list into `(kind, name)` pairs
    pub fn parse_parameters(&self) -> Result<Vec<(ValueKind, String)>, String> {
        let mut parsed: Vec<(ValueKind, String)> = Vec::new();
        for parameter in self.parameters.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut parts = parameter.split_whitespace();
            let (Some(ty), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(format!("Malformed parameter '{parameter}'"));
            };
            let kind = parameter_kind(ty).ok_or_else(|| format!("Unsupported parameter type '{ty}'"))?;
            if !is_identifier(name) {
                return Err(format!("Invalid parameter name '{name}'"));
            }
            if parsed.iter().any(|(_, existing)| existing == name) {
                return Err(format!("Duplicate parameter '{name}'"));
            }
            parsed.push((kind, name.to_string()));
        }
        Ok(parsed)
    }

    fn function_name(var_name: &str) -> String {
        format!("{var_name}_Func")
    }
}

fn parameter_kind(ty: &str) -> Option<ValueKind> {
    match ty {
        "color" => Some(ValueKind::Color),
        other => ValueKind::from_glsl_type(other),
    }
}

impl ShaderNode for GlslNode {
    fn type_name(&self) -> &'static str {
        "Glsl"
    }

    fn inputs(&self) -> Vec<Port> {
        self.parse_parameters()
            .unwrap_or_default()
            .into_iter()
            .map(|(kind, name)| Port::new(name, kind))
            .collect()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Result"]
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        self.parse_parameters()?;
        if self.return_kind.components().is_none() {
            return Err(format!("Unsupported return type {}", self.return_kind));
        }
        if self.body.trim().is_empty() {
            return Err("Function body is empty".to_string());
        }
        Ok(vec![Value::new(self.return_kind, cx.var_name)])
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let (Ok(parameters), Some(return_type)) = (self.parse_parameters(), self.return_kind.glsl_type())
        else {
            return;
        };
        let function = Self::function_name(cx.var_name);

        let signature: Vec<String> = parameters
            .iter()
            .filter_map(|(kind, name)| Some(format!("{} {name}", kind.glsl_type()?)))
            .collect();
        let body: String = self
            .body
            .lines()
            .map(|line| format!("\t{}\n", line.trim_end()))
            .collect();
        compiler.add_function(&format!(
            "{return_type} {function}({})\n{{\n{body}}}\n",
            signature.join(", ")
        ));

        let args: Vec<&str> = (0..parameters.len())
            .map(|i| cx.input(i).map_or("", Value::name))
            .collect();
        if let Some(code) = declaration(cx.output(0), format!("{function}({})", args.join(", "))) {
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

    #[test]
    fn test_parameters_declare_ports() {
        let node = GlslNode::new("vec2 uv, float scale", "return uv * scale;", ValueKind::Vector2);
        let ports = node.inputs();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0], Port::new("uv", ValueKind::Vector2));
        assert_eq!(ports[1], Port::new("scale", ValueKind::Float));
        assert!(GlslNode::new("", "return 1.0;", ValueKind::Float).inputs().is_empty());
    }

    #[test]
    fn test_malformed_parameters_are_errors() {
        let cases = [
            ("vec2", "Malformed parameter 'vec2'"),
            ("mat3 m", "Unsupported parameter type 'mat3'"),
            ("float 1x", "Invalid parameter name '1x'"),
            ("float a, vec2 a", "Duplicate parameter 'a'"),
        ];
        for (parameters, message) in cases {
            let node = GlslNode::new(parameters, "return 1.0;", ValueKind::Float);
            assert_eq!(node.parse_parameters(), Err(message.to_string()));
        }
    }

    #[test]
    fn test_function_and_call_emitted() {
        let mut graph = Graph::new("glsl");
        let scale = graph.add_node(NodeKind::Constant(ConstantNode::new(PortValue::Float(2.0))));
        let glsl = graph.add_node(NodeKind::Glsl(GlslNode::new(
            "float s",
            "float t = s * s;\nreturn vec3(t);",
            ValueKind::Vector3,
        )));
        graph.set_input(glsl, 0, Some(OutputRef::new(scale, 0))).unwrap();

        let node = graph.node(glsl).unwrap();
        assert!(node.validation_state().is_valid());
        let mut compiler = ShaderCompiler::default();
        node.generate_code(&graph.input_values(node), &mut compiler);
        assert_eq!(compiler.statements(), ["vec3 Glsl_1 = Glsl_1_Func(Float_0);"]);

        let fragment = compiler.compile().fragment;
        assert!(fragment.contains(
            "vec3 Glsl_1_Func(float s)\n{\n    float t = s * s;\n    return vec3(t);\n}\n"
        ));
    }

    #[test]
    fn test_texture_return_is_error() {
        let mut graph = Graph::new("glsl");
        let id = graph.add_node(NodeKind::Glsl(GlslNode::new("", "return 1.0;", ValueKind::Texture)));
        assert_eq!(
            graph.node(id).unwrap().validation_state().message(),
            Some("Unsupported return type texture")
        );
    }
}
