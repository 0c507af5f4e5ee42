// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL emission engine.
//!
//! [`ShaderCompiler`] accumulates what the nodes emit during one compile
//! pass (macros, uniform block members, texture samplers, free functions and
//! body statements) and substitutes it into a fixed fragment template. The
//! vertex stage is a fixed passthrough of position and one UV set.

use crate::port::PortValue;
use crate::settings::CompilerSettings;
use serde::{Deserialize, Serialize};

/// Fixed vertex stage
pub const VERTEX_TEMPLATE: &str = r#"#version 450

// inputs
layout(location = 0) in vec3 a_Position;
layout(location = 1) in vec2 a_UV;

// outputs
layout(location = 0) out vec2 v_UV;

void main(void)
{
    gl_Position = vec4(a_Position, 1.0);
    v_UV = a_UV;
}
"#;

/// Fragment stage with the four graph-driven placeholders
pub const FRAGMENT_TEMPLATE: &str = r#"#version 450

${FS_MACROS}
// inputs
layout(location = 0) in vec2 v_UV;

#ifdef ENABLE_VERTEX_UV1
layout(location = 1) in vec2 v_UV1;
#endif

#ifdef ENABLE_VERTEX_POSITION
layout(location = 2) in vec3 v_Position;
#endif

#ifdef ENABLE_VERTEX_WORLD_POSITION
layout(location = 3) in vec3 v_WorldPosition;
#endif

#ifdef ENABLE_VERTEX_NORMAL
layout(location = 4) in vec3 v_Normal;
#endif

#ifdef ENABLE_VERTEX_WORLD_NORMAL
layout(location = 5) in vec3 v_WorldNormal;
#endif

#ifdef ENABLE_VERTEX_COLOR
layout(location = 6) in vec4 v_Color;
#endif

#ifdef ENABLE_SHARED_UNIFORMS
layout(set = 1, binding = 0) uniform SharedUBO
{
    float u_Time;
    vec3 u_CameraPosition;
    vec3 u_CameraDirection;
    vec2 u_ScreenSize;
    float u_CameraNear;
    float u_CameraFar;
};
#endif

// uniforms
${FS_UNIFORMS}
// texture uniforms
${FS_TEXTURE_UNIFORMS}
// outputs
layout(location = 0) out vec4 o_FragColor;

void main(void)
{
    vec3 __BaseColor = vec3(0.75);
    float __Opacity = 1.0;
    vec3 __Normal = vec3(0.0, 0.0, 1.0);
    float __Metallic = 0.0;
    float __Roughness = 0.5;
    float __Occlusion = 1.0;
    vec3 __Emissive = vec3(0.0);

${FS_SHADER_CODE}
#ifdef ENABLE_NORMAL
    float __Diffuse = max(dot(normalize(__Normal), normalize(vec3(0.3, 1.0, 0.5))), 0.0);
    __BaseColor *= 0.2 + 0.8 * __Diffuse;
#endif

    o_FragColor = vec4(__BaseColor * __Occlusion + __Emissive, __Opacity);
}
"#;

/// How a texture is interpreted when sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureRole {
    /// Plain color texture
    #[default]
    General,
    /// Tangent-space normal map, decoded from `[0, 1]` to `[-1, 1]`
    NormalMap,
}

/// Texture the engine must bind before drawing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureResource {
    /// Sampler uniform name
    pub name: String,
    /// Binding index of the sampler
    pub binding: u32,
    /// Resource path
    pub path: String,
    /// Sampling role
    pub role: TextureRole,
    /// Whether the texture is a sub-rect of an atlas
    pub atlas: bool,
}

/// The two GLSL stages produced by a compile pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSource {
    /// Vertex stage text
    pub vertex: String,
    /// Fragment stage text
    pub fragment: String,
}

/// Accumulator for one compile pass
#[derive(Debug, Clone)]
pub struct ShaderCompiler {
    settings: CompilerSettings,
    macros: Vec<String>,
    uniforms: Vec<String>,
    texture_uniforms: Vec<(String, u32)>,
    functions: Vec<String>,
    code: Vec<String>,
    next_texture_binding: u32,
    uniform_defaults: Vec<(String, PortValue)>,
    textures: Vec<TextureResource>,
}

impl ShaderCompiler {
    /// Create a compiler with the given settings
    pub fn new(settings: CompilerSettings) -> Self {
        Self {
            settings,
            macros: Vec::new(),
            uniforms: Vec::new(),
            texture_uniforms: Vec::new(),
            functions: Vec::new(),
            code: Vec::new(),
            next_texture_binding: 1,
            uniform_defaults: Vec::new(),
            textures: Vec::new(),
        }
    }

    /// Settings in use
    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Clear every buffer; called once at the start of each pass
    pub fn reset(&mut self) {
        self.macros.clear();
        self.uniforms.clear();
        self.texture_uniforms.clear();
        self.functions.clear();
        self.code.clear();
        self.uniform_defaults.clear();
        self.textures.clear();
        self.next_texture_binding = 1;
    }

    /// Request `#define <name>`
    pub fn add_macro(&mut self, name: &str) {
        if self.settings.deduplicate_declarations && self.macros.iter().any(|m| m == name) {
            return;
        }
        self.macros.push(name.to_string());
    }

    /// Add a member declaration to the `fs_ubo` uniform block
    pub fn add_uniform(&mut self, chunk: &str) {
        if self.settings.deduplicate_declarations && self.uniforms.iter().any(|u| u == chunk) {
            return;
        }
        self.uniforms.push(chunk.to_string());
    }

    /// Record the default value the engine uploads for an exported uniform
    pub fn add_uniform_default(&mut self, name: &str, value: PortValue) {
        if let Some(entry) = self.uniform_defaults.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
            return;
        }
        self.uniform_defaults.push((name.to_string(), value));
    }

    /// Declare a sampler uniform and return its binding index.
    ///
    /// Bindings are dense and start at 1; binding 0 is the uniform block.
    pub fn add_texture_uniform(&mut self, name: &str) -> u32 {
        if self.settings.deduplicate_declarations {
            if let Some((_, binding)) = self.texture_uniforms.iter().find(|(n, _)| n == name) {
                return *binding;
            }
        }
        let binding = self.next_texture_binding;
        self.next_texture_binding += 1;
        self.texture_uniforms.push((name.to_string(), binding));
        binding
    }

    /// Record the resource behind a sampler for the engine bind step
    pub fn add_texture_resource(&mut self, resource: TextureResource) {
        if self.textures.contains(&resource) {
            return;
        }
        self.textures.push(resource);
    }

    /// Append a free function definition, emitted before `main()`
    pub fn add_function(&mut self, text: &str) {
        self.functions.push(text.to_string());
    }

    /// Append a statement to the body of `main()`
    pub fn add_code(&mut self, chunk: &str) {
        self.code.push(chunk.to_string());
    }

    /// Requested macro names in order
    pub fn macros(&self) -> &[String] {
        &self.macros
    }

    /// Body statements in order
    pub fn statements(&self) -> &[String] {
        &self.code
    }

    /// Exported uniform names with their default values
    pub fn exported_uniform_defaults(&self) -> &[(String, PortValue)] {
        &self.uniform_defaults
    }

    /// Textures referenced by the pass
    pub fn texture_resources(&self) -> &[TextureResource] {
        &self.textures
    }

    /// Substitute the accumulated text into the templates
    pub fn compile(&self) -> ShaderSource {
        let macros: String = self
            .macros
            .iter()
            .map(|name| format!("#define {name}\n"))
            .collect();

        let uniforms = if self.uniforms.is_empty() {
            String::new()
        } else {
            let members: String = self.uniforms.iter().map(|u| format!("\t{u}\n")).collect();
            format!("layout(binding=0) uniform UBO\n{{\n{members}}} fs_ubo;\n")
        };

        let mut textures: String = self
            .texture_uniforms
            .iter()
            .map(|(name, binding)| format!("layout(binding={binding}) uniform sampler2D {name};\n"))
            .collect();
        for function in &self.functions {
            textures.push('\n');
            textures.push_str(function);
            if !function.ends_with('\n') {
                textures.push('\n');
            }
        }

        let code: String = self.code.iter().map(|c| format!("\t{c}\n")).collect();

        let fragment = FRAGMENT_TEMPLATE
            .replace("${FS_MACROS}", &macros)
            .replace("${FS_UNIFORMS}", &uniforms)
            .replace("${FS_TEXTURE_UNIFORMS}", &textures)
            .replace("${FS_SHADER_CODE}", &code);

        ShaderSource {
            vertex: self.normalize(VERTEX_TEMPLATE),
            fragment: self.normalize(&fragment),
        }
    }

    fn normalize(&self, text: &str) -> String {
        text.replace('\t', &" ".repeat(self.settings.indent_width))
    }
}

impl Default for ShaderCompiler {
    fn default() -> Self {
        Self::new(CompilerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> ShaderCompiler {
        ShaderCompiler::new(CompilerSettings::default())
    }

    #[test]
    fn test_empty_pass_has_no_uniform_block() {
        let source = compiler().compile();
        assert!(!source.fragment.contains("fs_ubo"));
        assert!(!source.fragment.contains("${"));
        assert!(source.fragment.contains("o_FragColor = vec4("));
    }

    #[test]
    fn test_uniform_block_wraps_members() {
        let mut compiler = compiler();
        compiler.add_uniform("float Roughness;");
        compiler.add_uniform("vec3 Tint;");
        let source = compiler.compile();
        assert!(source.fragment.contains(
            "layout(binding=0) uniform UBO\n{\n    float Roughness;\n    vec3 Tint;\n} fs_ubo;\n"
        ));
    }

    #[test]
    fn test_texture_bindings_are_dense_from_one() {
        let mut compiler = compiler();
        assert_eq!(compiler.add_texture_uniform("Albedo"), 1);
        assert_eq!(compiler.add_texture_uniform("Normal"), 2);
        assert_eq!(compiler.add_texture_uniform("Albedo"), 1);
        let fragment = compiler.compile().fragment;
        assert!(fragment.contains("layout(binding=1) uniform sampler2D Albedo;\n"));
        assert!(fragment.contains("layout(binding=2) uniform sampler2D Normal;\n"));
        assert_eq!(fragment.matches("sampler2D Albedo").count(), 1);
    }

    #[test]
    fn test_macros_deduplicated_by_name() {
        let mut compiler = compiler();
        compiler.add_macro("ENABLE_VERTEX_UV0");
        compiler.add_macro("ENABLE_VERTEX_UV0");
        let fragment = compiler.compile().fragment;
        assert_eq!(fragment.matches("#define ENABLE_VERTEX_UV0\n").count(), 1);
    }

    #[test]
    fn test_naive_concatenation_when_dedup_disabled() {
        let mut compiler = ShaderCompiler::new(CompilerSettings {
            deduplicate_declarations: false,
            ..Default::default()
        });
        compiler.add_macro("ENABLE_VERTEX_UV0");
        compiler.add_macro("ENABLE_VERTEX_UV0");
        assert_eq!(compiler.add_texture_uniform("T"), 1);
        assert_eq!(compiler.add_texture_uniform("T"), 2);
        assert_eq!(compiler.macros().len(), 2);
    }

    #[test]
    fn test_reset_clears_previous_pass() {
        let mut compiler = compiler();
        compiler.add_macro("ENABLE_NORMAL");
        compiler.add_code("float x = 1.0;");
        compiler.add_texture_uniform("T");
        compiler.reset();
        assert!(compiler.macros().is_empty());
        assert!(compiler.statements().is_empty());
        assert_eq!(compiler.add_texture_uniform("U"), 1);
    }

    #[test]
    fn test_tabs_normalized_and_code_in_order() {
        let mut compiler = ShaderCompiler::new(CompilerSettings {
            indent_width: 2,
            ..Default::default()
        });
        compiler.add_code("float a = 1.0;");
        compiler.add_code("float b = a;");
        compiler.add_function("float Glsl_1_Func()\n{\n\treturn 1.0;\n}");
        let fragment = compiler.compile().fragment;
        assert!(!fragment.contains('\t'));
        assert!(fragment.contains("  float a = 1.0;\n  float b = a;\n"));
        let function = fragment.find("float Glsl_1_Func()").unwrap();
        assert!(function < fragment.find("void main(void)").unwrap());
    }

    #[test]
    fn test_vertex_stage_is_fixed() {
        let mut compiler = compiler();
        let before = compiler.compile().vertex;
        compiler.add_code("float a = 1.0;");
        compiler.add_macro("ENABLE_VERTEX_UV0");
        assert_eq!(compiler.compile().vertex, before);
        assert!(before.contains("v_UV = a_UV;"));
        assert!(before.contains("gl_Position"));
    }
}
