// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture sample node.

use super::is_identifier;
use crate::compiler::{ShaderCompiler, TextureResource, TextureRole};
use crate::node::{CodegenContext, EvalContext, ShaderNode};
use crate::port::{Port, PortValue, Value, ValueKind};
use serde::{Deserialize, Serialize};

/// Samples a texture resource at the mesh UV.
///
/// Outputs the sampler itself and the sampled RGBA color.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextureNode {
    /// Resource path resolved by the engine
    pub path: String,
    /// Texture is a sub-rect of an atlas
    #[serde(default)]
    pub atlas: bool,
    /// Sampling role
    #[serde(default)]
    pub role: TextureRole,
    /// Sampler name when exported
    #[serde(default)]
    pub uniform: Option<String>,
}

impl TextureNode {
    /// Create a general texture sample of `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the sampling role
    pub fn with_role(mut self, role: TextureRole) -> Self {
        self.role = role;
        self
    }

    /// Sample through an atlas viewport
    pub fn with_atlas(mut self) -> Self {
        self.atlas = true;
        self
    }
}

impl ShaderNode for TextureNode {
    fn type_name(&self) -> &'static str {
        "Texture"
    }

    fn inputs(&self) -> Vec<Port> {
        Vec::new()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Texture", "RGBA"]
    }

    fn uniform_name(&self) -> Option<&str> {
        self.uniform.as_deref()
    }

    fn exported_names(&self, var_name: &str) -> Vec<String> {
        let mut names = vec![var_name.to_string()];
        if self.atlas {
            names.push(format!("{var_name}_Viewport"));
        }
        names
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        if self.path.trim().is_empty() {
            return Err("No texture selected".to_string());
        }
        if let Some(name) = self.uniform.as_deref().filter(|name| !is_identifier(name)) {
            return Err(format!("Invalid uniform name '{name}'"));
        }
        Ok(vec![
            Value::new(ValueKind::Texture, cx.var_name),
            Value::new(ValueKind::Color, format!("{}_Color", cx.var_name)),
        ])
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let sampler = cx.output(0).name();
        let binding = compiler.add_texture_uniform(sampler);
        compiler.add_texture_resource(TextureResource {
            name: sampler.to_string(),
            binding,
            path: self.path.clone(),
            role: self.role,
            atlas: self.atlas,
        });

        let uv = if self.atlas {
            let viewport = format!("{sampler}_Viewport");
            compiler.add_uniform(&format!("vec4 {viewport};"));
            compiler.add_uniform_default(&viewport, PortValue::Vector4([0.0, 0.0, 1.0, 1.0]));
            format!("fs_ubo.{viewport}.xy + v_UV * fs_ubo.{viewport}.zw")
        } else {
            "v_UV".to_string()
        };

        let sample = format!("texture({sampler}, {uv})");
        let color = match self.role {
            TextureRole::General => sample,
            TextureRole::NormalMap => format!("vec4(normalize({sample}.rgb * 2.0 - 1.0), 1.0)"),
        };
        compiler.add_code(&format!("vec4 {} = {color};", cx.output(1).name()));
    }
}
