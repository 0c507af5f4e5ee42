// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant leaves: float, vector and color literals.

use super::is_identifier;
use crate::compiler::ShaderCompiler;
use crate::node::{CodegenContext, EvalContext, ShaderNode};
use crate::port::{Port, PortValue, Value, ValueKind};
use serde::{Deserialize, Serialize};

/// Literal constant, baked into the shader or exported as a uniform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantNode {
    /// Literal value
    pub value: PortValue,
    /// Uniform name when promoted to an externally settable parameter
    #[serde(default)]
    pub uniform: Option<String>,
}

impl ConstantNode {
    /// Create a baked constant
    pub fn new(value: PortValue) -> Self {
        Self {
            value,
            uniform: None,
        }
    }

    /// Promote to a uniform parameter named `name`
    pub fn with_uniform(mut self, name: impl Into<String>) -> Self {
        self.uniform = Some(name.into());
        self
    }
}

impl ShaderNode for ConstantNode {
    fn type_name(&self) -> &'static str {
        match self.value.kind() {
            ValueKind::Vector2 => "Vector2",
            ValueKind::Vector3 => "Vector3",
            ValueKind::Vector4 => "Vector4",
            ValueKind::Color => "Color",
            _ => "Float",
        }
    }

    fn inputs(&self) -> Vec<Port> {
        Vec::new()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Value"]
    }

    fn uniform_name(&self) -> Option<&str> {
        self.uniform.as_deref()
    }

    fn exported_names(&self, _var_name: &str) -> Vec<String> {
        self.uniform.iter().cloned().collect()
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        let kind = self.value.kind();
        match &self.uniform {
            Some(name) if !is_identifier(name) => Err(format!("Invalid uniform name '{name}'")),
            Some(name) => Ok(vec![Value::new(kind, format!("fs_ubo.{name}"))]),
            None => Ok(vec![Value::new(kind, cx.var_name)]),
        }
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let Some(glsl_type) = self.value.kind().glsl_type() else {
            return;
        };
        match &self.uniform {
            Some(name) => {
                compiler.add_uniform(&format!("{glsl_type} {name};"));
                compiler.add_uniform_default(name, self.value);
            }
            None => compiler.add_code(&format!(
                "{glsl_type} {} = {};",
                cx.output(0).name(),
                self.value.glsl_literal()
            )),
        }
    }
}
