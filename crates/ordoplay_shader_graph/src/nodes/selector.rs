// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vertex attribute, fragment input and shared uniform selectors.

use super::declaration;
use crate::compiler::ShaderCompiler;
use crate::node::{CodegenContext, EvalContext, ShaderNode};
use crate::port::{Port, Value, ValueKind};
use serde::{Deserialize, Serialize};

/// One selectable entry of a selector node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorOption {
    /// Option text shown and saved
    pub label: &'static str,
    /// Kind of the produced value
    pub kind: ValueKind,
    /// GLSL expression reading the value
    pub expression: &'static str,
    /// Macro enabling the value in the template
    pub macro_name: Option<&'static str>,
}

const fn option(
    label: &'static str,
    kind: ValueKind,
    expression: &'static str,
    macro_name: Option<&'static str>,
) -> SelectorOption {
    SelectorOption {
        label,
        kind,
        expression,
        macro_name,
    }
}

const VERTEX_ATTRIBUTES: &[SelectorOption] = &[
    option("uv0", ValueKind::Vector2, "v_UV", Some("ENABLE_VERTEX_UV0")),
    option("uv1", ValueKind::Vector2, "v_UV1", Some("ENABLE_VERTEX_UV1")),
    option("position(local)", ValueKind::Vector3, "v_Position", Some("ENABLE_VERTEX_POSITION")),
    option("position(world)", ValueKind::Vector3, "v_WorldPosition", Some("ENABLE_VERTEX_WORLD_POSITION")),
    option("normal(local)", ValueKind::Vector3, "v_Normal", Some("ENABLE_VERTEX_NORMAL")),
    option("normal(world)", ValueKind::Vector3, "v_WorldNormal", Some("ENABLE_VERTEX_WORLD_NORMAL")),
    option("color", ValueKind::Color, "v_Color", Some("ENABLE_VERTEX_COLOR")),
];

const FRAGMENT_INPUTS: &[SelectorOption] = &[
    option("FragCoord", ValueKind::Vector4, "gl_FragCoord", None),
    option("PointCoord", ValueKind::Vector2, "gl_PointCoord", None),
    option("FrontFacing", ValueKind::Float, "(gl_FrontFacing ? 1.0 : -1.0)", None),
];

const SHARED: Option<&str> = Some("ENABLE_SHARED_UNIFORMS");

const SHARED_UNIFORMS: &[SelectorOption] = &[
    option("u_Time", ValueKind::Float, "u_Time", SHARED),
    option("u_CameraPosition", ValueKind::Vector3, "u_CameraPosition", SHARED),
    option("u_CameraDirection", ValueKind::Vector3, "u_CameraDirection", SHARED),
    option("u_ScreenSize", ValueKind::Vector2, "u_ScreenSize", SHARED),
    option("u_CameraNear", ValueKind::Float, "u_CameraNear", SHARED),
    option("u_CameraFar", ValueKind::Float, "u_CameraFar", SHARED),
];

/// Which fixed option list a selector draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorSource {
    /// Interpolated vertex data
    VertexAttribute,
    /// Built-in fragment inputs
    Input,
    /// Engine-provided uniforms
    SharedUniform,
}

impl SelectorSource {
    /// Available options in display order
    pub fn options(self) -> &'static [SelectorOption] {
        match self {
            Self::VertexAttribute => VERTEX_ATTRIBUTES,
            Self::Input => FRAGMENT_INPUTS,
            Self::SharedUniform => SHARED_UNIFORMS,
        }
    }
}

/// Zero-input node exposing one option of a fixed list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorNode {
    /// Option list
    pub source: SelectorSource,
    /// Selected option label
    pub option: String,
}

impl SelectorNode {
    /// Create a selector with its first option selected
    pub fn new(source: SelectorSource) -> Self {
        Self {
            source,
            option: source.options()[0].label.to_string(),
        }
    }

    /// Select an option by label
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = option.into();
        self
    }

    /// The selected option, if the label is known
    pub fn selected(&self) -> Option<&'static SelectorOption> {
        self.source
            .options()
            .iter()
            .find(|option| option.label == self.option)
    }
}

impl ShaderNode for SelectorNode {
    fn type_name(&self) -> &'static str {
        match self.source {
            SelectorSource::VertexAttribute => "VertexAttribute",
            SelectorSource::Input => "Input",
            SelectorSource::SharedUniform => "SharedUniform",
        }
    }

    fn inputs(&self) -> Vec<Port> {
        Vec::new()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["Value"]
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        let option = self
            .selected()
            .ok_or_else(|| format!("Unknown option '{}'", self.option))?;
        Ok(vec![Value::new(option.kind, cx.var_name)])
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        let Some(option) = self.selected() else {
            return;
        };
        if let Some(name) = option.macro_name {
            compiler.add_macro(name);
        }
        if let Some(code) = declaration(cx.output(0), option.expression) {
            compiler.add_code(&code);
        }
    }
}
