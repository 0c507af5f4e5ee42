// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine-facing metadata written next to the GLSL stages.

use ordoplay_shader_graph::{ShaderCompiler, TextureResource};
use serde::Serialize;

/// Exported uniform with its default value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformMetadata {
    /// Member name in `fs_ubo`
    pub name: String,
    /// GLSL member type
    #[serde(rename = "type")]
    pub glsl_type: &'static str,
    /// Default components
    pub default: Vec<f32>,
}

/// What the engine needs to bind before drawing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaderMetadata {
    /// Graph name
    pub name: String,
    /// Exported uniforms in declaration order
    pub uniforms: Vec<UniformMetadata>,
    /// Textures by binding
    pub textures: Vec<TextureResource>,
}

impl ShaderMetadata {
    /// Collect the metadata of the last compile pass
    pub fn from_compiler(name: &str, compiler: &ShaderCompiler) -> Self {
        Self {
            name: name.to_string(),
            uniforms: compiler
                .exported_uniform_defaults()
                .iter()
                .map(|(name, value)| UniformMetadata {
                    name: name.clone(),
                    glsl_type: value.kind().glsl_type().unwrap_or("float"),
                    default: value.components().to_vec(),
                })
                .collect(),
            textures: compiler.texture_resources().to_vec(),
        }
    }
}
