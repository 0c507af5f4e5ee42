// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader output node.

use super::widen;
use crate::compiler::ShaderCompiler;
use crate::node::{CodegenContext, EvalContext, InputPolicy, ShaderNode};
use crate::port::{Port, Value, ValueKind};
use serde::{Deserialize, Serialize};

/// Surface input of the output node
struct Surface {
    port: &'static str,
    kind: ValueKind,
    macro_name: &'static str,
}

const SURFACE: [Surface; 7] = [
    Surface { port: "BaseColor", kind: ValueKind::Vector3, macro_name: "ENABLE_BASE_COLOR" },
    Surface { port: "Opacity", kind: ValueKind::Float, macro_name: "ENABLE_OPACITY" },
    Surface { port: "Normal", kind: ValueKind::Vector3, macro_name: "ENABLE_NORMAL" },
    Surface { port: "Metallic", kind: ValueKind::Float, macro_name: "ENABLE_METALLIC" },
    Surface { port: "Roughness", kind: ValueKind::Float, macro_name: "ENABLE_ROUGHNESS" },
    Surface { port: "Occlusion", kind: ValueKind::Float, macro_name: "ENABLE_OCCLUSION" },
    Surface { port: "Emissive", kind: ValueKind::Vector3, macro_name: "ENABLE_EMISSIVE" },
];

/// Writes the final surface values of the fragment stage.
///
/// Vector surfaces accept floats (splatted), `vec3`, and `vec4`/color values
/// (truncated to `.rgb`). Unbound surfaces keep the template defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShaderOutputNode;

fn surface_expression(surface: &Surface, value: &Value) -> Option<String> {
    match (surface.kind, value.concrete_kind()) {
        (want, got) if want == got => Some(value.name().to_string()),
        (ValueKind::Vector3, ValueKind::Float) => Some(widen(value, ValueKind::Vector3)),
        (ValueKind::Vector3, ValueKind::Vector4 | ValueKind::Color) => {
            Some(format!("{}.rgb", value.name()))
        }
        _ => None,
    }
}

impl ShaderNode for ShaderOutputNode {
    fn type_name(&self) -> &'static str {
        "ShaderOutput"
    }

    fn inputs(&self) -> Vec<Port> {
        SURFACE
            .iter()
            .map(|surface| {
                let kind = if surface.kind == ValueKind::Float {
                    ValueKind::Float
                } else {
                    ValueKind::Any
                };
                Port::new(surface.port, kind)
            })
            .collect()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &[]
    }

    fn input_policy(&self) -> InputPolicy {
        InputPolicy::Optional
    }

    fn evaluate(&self, cx: &EvalContext<'_>) -> Result<Vec<Value>, String> {
        for (port, surface) in SURFACE.iter().enumerate() {
            if let Some(value) = cx.input(port) {
                if surface_expression(surface, value).is_none() {
                    return Err(format!(
                        "Input '{}' cannot take {}",
                        surface.port,
                        value.concrete_kind()
                    ));
                }
            }
        }
        Ok(Vec::new())
    }

    fn generate_code(&self, cx: &CodegenContext<'_>, compiler: &mut ShaderCompiler) {
        for (port, surface) in SURFACE.iter().enumerate() {
            let Some(expr) = cx.input(port).and_then(|value| surface_expression(surface, value))
            else {
                continue;
            };
            compiler.add_macro(surface.macro_name);
            compiler.add_code(&format!("__{} = {expr};", surface.port));
        }
    }
}
