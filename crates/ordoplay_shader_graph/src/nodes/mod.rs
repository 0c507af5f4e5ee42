// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concrete shader node kinds.
//!
//! [`NodeKind`] is the closed set of node kinds. Each variant holds only the
//! literal state of its node (selected option, literal values, resource
//! path, uniform export name, raw GLSL text), which is what gets saved.

pub mod constant;
pub mod glsl;
pub mod math;
pub mod output;
pub mod selector;
pub mod structural;
pub mod texture;

use crate::node::{NodeCategory, NodeRegistry, NodeType, ShaderNode};
use crate::port::{PortValue, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use constant::ConstantNode;
use glsl::GlslNode;
use math::{BinaryNode, BinaryOp, TernaryNode, TernaryOp};
use output::ShaderOutputNode;
use selector::{SelectorNode, SelectorSource};
use structural::{CombineNode, ConvertNode, SplitNode, ToAnyNode};
use texture::TextureNode;

/// Literal state of a node, one variant per node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Float/vector/color literal
    Constant(ConstantNode),
    /// Texture sample
    Texture(TextureNode),
    /// Vertex attribute, fragment input or shared uniform
    Selector(SelectorNode),
    /// Two-operand math
    Binary(BinaryNode),
    /// Three-operand math
    Ternary(TernaryNode),
    /// Floats to vector
    Combine(CombineNode),
    /// Vector to floats
    Split(SplitNode),
    /// Scalar widened to a vector
    Convert(ConvertNode),
    /// Value boxed for `any` ports
    ToAny(ToAnyNode),
    /// User-authored GLSL function
    Glsl(GlslNode),
    /// Shader output
    Output(ShaderOutputNode),
}

impl NodeKind {
    /// Behavior of this node kind
    pub fn behavior(&self) -> &dyn ShaderNode {
        match self {
            Self::Constant(node) => node,
            Self::Texture(node) => node,
            Self::Selector(node) => node,
            Self::Binary(node) => node,
            Self::Ternary(node) => node,
            Self::Combine(node) => node,
            Self::Split(node) => node,
            Self::Convert(node) => node,
            Self::ToAny(node) => node,
            Self::Glsl(node) => node,
            Self::Output(node) => node,
        }
    }

    /// Kind name
    pub fn type_name(&self) -> &'static str {
        self.behavior().type_name()
    }
}

/// `<type> <name> = <expr>;` for a concrete value
pub(crate) fn declaration(value: &Value, expr: impl Display) -> Option<String> {
    let glsl_type = value.concrete_kind().glsl_type()?;
    Some(format!("{glsl_type} {} = {expr};", value.name()))
}

/// Value name, widened with a constructor when a scalar meets a vector kind
pub(crate) fn widen(value: &Value, to: ValueKind) -> String {
    match to.glsl_type() {
        Some(glsl_type) if value.concrete_kind() == ValueKind::Float && to.is_vector() => {
            format!("{glsl_type}({})", value.name())
        }
        _ => value.name().to_string(),
    }
}

/// Whether `name` is usable as a GLSL identifier
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !name.starts_with("gl_")
}

/// Create the shader graph node registry with all available node types
pub fn create_shader_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // ========================================================================
    // Output
    // ========================================================================

    registry.register(NodeType {
        id: "shader_output",
        name: "Shader Output",
        category: NodeCategory::Output,
        description: "Final surface values written by the fragment stage",
        create: || NodeKind::Output(ShaderOutputNode),
    });

    // ========================================================================
    // Constants
    // ========================================================================

    registry.register(NodeType {
        id: "float",
        name: "Float",
        category: NodeCategory::Input,
        description: "Constant float, optionally exported as a uniform",
        create: || NodeKind::Constant(ConstantNode::new(PortValue::Float(0.0))),
    });
    registry.register(NodeType {
        id: "vector2",
        name: "Vector2",
        category: NodeCategory::Input,
        description: "Constant 2D vector",
        create: || NodeKind::Constant(ConstantNode::new(PortValue::Vector2([0.0; 2]))),
    });
    registry.register(NodeType {
        id: "vector3",
        name: "Vector3",
        category: NodeCategory::Input,
        description: "Constant 3D vector",
        create: || NodeKind::Constant(ConstantNode::new(PortValue::Vector3([0.0; 3]))),
    });
    registry.register(NodeType {
        id: "vector4",
        name: "Vector4",
        category: NodeCategory::Input,
        description: "Constant 4D vector",
        create: || NodeKind::Constant(ConstantNode::new(PortValue::Vector4([0.0; 4]))),
    });
    registry.register(NodeType {
        id: "color",
        name: "Color",
        category: NodeCategory::Input,
        description: "Constant RGBA color",
        create: || NodeKind::Constant(ConstantNode::new(PortValue::Color([1.0; 4]))),
    });

    // ========================================================================
    // Attributes and uniforms
    // ========================================================================

    registry.register(NodeType {
        id: "vertex_attribute",
        name: "Vertex Attribute",
        category: NodeCategory::Input,
        description: "Interpolated vertex data (uv, normal, position, color)",
        create: || NodeKind::Selector(SelectorNode::new(SelectorSource::VertexAttribute)),
    });
    registry.register(NodeType {
        id: "input",
        name: "Input",
        category: NodeCategory::Input,
        description: "Built-in fragment inputs",
        create: || NodeKind::Selector(SelectorNode::new(SelectorSource::Input)),
    });
    registry.register(NodeType {
        id: "shared_uniform",
        name: "Shared Uniform",
        category: NodeCategory::Input,
        description: "Engine-provided uniforms such as time and camera",
        create: || NodeKind::Selector(SelectorNode::new(SelectorSource::SharedUniform)),
    });

    // ========================================================================
    // Texture
    // ========================================================================

    registry.register(NodeType {
        id: "texture",
        name: "Texture",
        category: NodeCategory::Texture,
        description: "Sample a 2D texture at the mesh UV",
        create: || NodeKind::Texture(TextureNode::default()),
    });

    // ========================================================================
    // Math
    // ========================================================================

    for (id, op, description) in [
        ("add", BinaryOp::Add, "A + B"),
        ("subtract", BinaryOp::Subtract, "A - B"),
        ("multiply", BinaryOp::Multiply, "A * B"),
        ("divide", BinaryOp::Divide, "A / B"),
        ("dot", BinaryOp::DotProduct, "Dot product"),
        ("cross", BinaryOp::CrossProduct, "Cross product of two 3D vectors"),
        ("pow", BinaryOp::Pow, "A raised to B"),
        ("min", BinaryOp::Min, "Component-wise minimum"),
        ("max", BinaryOp::Max, "Component-wise maximum"),
        ("mod", BinaryOp::Mod, "A modulo B"),
    ] {
        registry.register(NodeType {
            id,
            name: op.type_name(),
            category: NodeCategory::Math,
            description,
            create: binary_constructor(op),
        });
    }

    registry.register(NodeType {
        id: "mix",
        name: "Mix",
        category: NodeCategory::Math,
        description: "Linear interpolation between A and B",
        create: || NodeKind::Ternary(TernaryNode::new(TernaryOp::Mix)),
    });
    registry.register(NodeType {
        id: "smoothstep",
        name: "SmoothStep",
        category: NodeCategory::Math,
        description: "Hermite interpolation between two edges",
        create: || NodeKind::Ternary(TernaryNode::new(TernaryOp::SmoothStep)),
    });

    // ========================================================================
    // Utility
    // ========================================================================

    registry.register(NodeType {
        id: "combine",
        name: "Combine",
        category: NodeCategory::Utility,
        description: "Build a vector from float components",
        create: || NodeKind::Combine(CombineNode::default()),
    });
    registry.register(NodeType {
        id: "split",
        name: "Split",
        category: NodeCategory::Utility,
        description: "Split a vector into float components",
        create: || NodeKind::Split(SplitNode),
    });
    registry.register(NodeType {
        id: "convert",
        name: "Convert",
        category: NodeCategory::Utility,
        description: "Widen a float to a vector",
        create: || NodeKind::Convert(ConvertNode::default()),
    });
    registry.register(NodeType {
        id: "to_any",
        name: "To Any",
        category: NodeCategory::Utility,
        description: "Box a value for generic ports",
        create: || NodeKind::ToAny(ToAnyNode),
    });

    // ========================================================================
    // Custom
    // ========================================================================

    registry.register(NodeType {
        id: "glsl",
        name: "GLSL",
        category: NodeCategory::Custom,
        description: "Hand-written GLSL function",
        create: || NodeKind::Glsl(GlslNode::default()),
    });

    registry
}

fn binary_constructor(op: BinaryOp) -> fn() -> NodeKind {
    match op {
        BinaryOp::Add => || NodeKind::Binary(BinaryNode::new(BinaryOp::Add)),
        BinaryOp::Subtract => || NodeKind::Binary(BinaryNode::new(BinaryOp::Subtract)),
        BinaryOp::Multiply => || NodeKind::Binary(BinaryNode::new(BinaryOp::Multiply)),
        BinaryOp::Divide => || NodeKind::Binary(BinaryNode::new(BinaryOp::Divide)),
        BinaryOp::DotProduct => || NodeKind::Binary(BinaryNode::new(BinaryOp::DotProduct)),
        BinaryOp::CrossProduct => || NodeKind::Binary(BinaryNode::new(BinaryOp::CrossProduct)),
        BinaryOp::Pow => || NodeKind::Binary(BinaryNode::new(BinaryOp::Pow)),
        BinaryOp::Min => || NodeKind::Binary(BinaryNode::new(BinaryOp::Min)),
        BinaryOp::Max => || NodeKind::Binary(BinaryNode::new(BinaryOp::Max)),
        BinaryOp::Mod => || NodeKind::Binary(BinaryNode::new(BinaryOp::Mod)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creates_every_type() {
        let registry = create_shader_registry();
        assert_eq!(registry.types().count(), 27);
        for node_type in registry.types() {
            let kind = (node_type.create)();
            assert!(!kind.type_name().is_empty(), "{}", node_type.id);
        }
        assert_eq!(registry.create("add").map(|k| k.type_name()), Some("Add"));
        assert_eq!(registry.create("color").map(|k| k.type_name()), Some("Color"));
        assert!(registry.create("unknown").is_none());
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("Roughness"));
        assert!(is_identifier("_tint2"));
        assert!(!is_identifier("2tint"));
        assert!(!is_identifier("my tint"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("gl_Color"));
    }

    #[test]
    fn test_widen_only_scalars() {
        let scalar = Value::new(ValueKind::Float, "f");
        let vector = Value::new(ValueKind::Vector3, "v");
        assert_eq!(widen(&scalar, ValueKind::Vector3), "vec3(f)");
        assert_eq!(widen(&vector, ValueKind::Vector3), "v");
        assert_eq!(widen(&scalar, ValueKind::Float), "f");
    }
}
