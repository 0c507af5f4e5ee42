// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions and the values that flow between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a value flowing through a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Unresolved or failed value
    Invalid,
    /// Scalar float
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA, `vec4` in GLSL)
    Color,
    /// Texture sampler
    Texture,
    /// Boxed value of any other kind (for generic ports)
    Any,
}

impl ValueKind {
    /// All concrete kinds a value can resolve to
    pub const CONCRETE: [ValueKind; 6] = [
        Self::Float,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
        Self::Color,
        Self::Texture,
    ];

    /// GLSL type used to declare a variable of this kind
    pub fn glsl_type(self) -> Option<&'static str> {
        match self {
            Self::Float => Some("float"),
            Self::Vector2 => Some("vec2"),
            Self::Vector3 => Some("vec3"),
            Self::Vector4 | Self::Color => Some("vec4"),
            Self::Texture => Some("sampler2D"),
            Self::Invalid | Self::Any => None,
        }
    }

    /// Parse a GLSL type name as written in raw GLSL parameter lists
    pub fn from_glsl_type(name: &str) -> Option<Self> {
        match name {
            "float" => Some(Self::Float),
            "vec2" => Some(Self::Vector2),
            "vec3" => Some(Self::Vector3),
            "vec4" => Some(Self::Vector4),
            "sampler2D" => Some(Self::Texture),
            _ => None,
        }
    }

    /// Number of float components, for numeric kinds
    pub fn components(self) -> Option<usize> {
        match self {
            Self::Float => Some(1),
            Self::Vector2 => Some(2),
            Self::Vector3 => Some(3),
            Self::Vector4 | Self::Color => Some(4),
            _ => None,
        }
    }

    /// Whether this is a vector-like kind (more than one component)
    pub fn is_vector(self) -> bool {
        self.components().is_some_and(|n| n > 1)
    }

    /// Short lowercase name used in messages
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Float => "float",
            Self::Vector2 => "vec2",
            Self::Vector3 => "vec3",
            Self::Vector4 => "vec4",
            Self::Color => "color",
            Self::Texture => "texture",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value produced on an output port.
///
/// Each variant carries the GLSL expression naming the value, so the kind
/// and the variable name can only change together. Values are never mutated
/// in place; a recompute produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// No usable value
    #[default]
    Invalid,
    /// Scalar float
    Float(String),
    /// 2D vector
    Vector2(String),
    /// 3D vector
    Vector3(String),
    /// 4D vector
    Vector4(String),
    /// Color
    Color(String),
    /// Texture sampler
    Texture(String),
    /// Value boxed for `any` ports
    Any(Box<Value>),
}

impl Value {
    /// Create a value of a concrete kind.
    ///
    /// `Any` and `Invalid` cannot be built from a name and yield `Invalid`.
    pub fn new(kind: ValueKind, name: impl Into<String>) -> Self {
        let name = name.into();
        match kind {
            ValueKind::Float => Self::Float(name),
            ValueKind::Vector2 => Self::Vector2(name),
            ValueKind::Vector3 => Self::Vector3(name),
            ValueKind::Vector4 => Self::Vector4(name),
            ValueKind::Color => Self::Color(name),
            ValueKind::Texture => Self::Texture(name),
            ValueKind::Invalid | ValueKind::Any => Self::Invalid,
        }
    }

    /// Box a value for an `any` port
    pub fn boxed(inner: Value) -> Self {
        match inner {
            Self::Invalid => Self::Invalid,
            // Never nest boxes
            Self::Any(inner) => Self::Any(inner),
            other => Self::Any(Box::new(other)),
        }
    }

    /// Kind tag of this value (`Any` for boxed values)
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Invalid => ValueKind::Invalid,
            Self::Float(_) => ValueKind::Float,
            Self::Vector2(_) => ValueKind::Vector2,
            Self::Vector3(_) => ValueKind::Vector3,
            Self::Vector4(_) => ValueKind::Vector4,
            Self::Color(_) => ValueKind::Color,
            Self::Texture(_) => ValueKind::Texture,
            Self::Any(_) => ValueKind::Any,
        }
    }

    /// The value with every `Any` box removed
    pub fn unwrap_any(&self) -> &Value {
        let mut value = self;
        while let Self::Any(inner) = value {
            value = inner;
        }
        value
    }

    /// Kind after unwrapping `Any`
    pub fn concrete_kind(&self) -> ValueKind {
        self.unwrap_any().kind()
    }

    /// GLSL expression naming this value (empty for `Invalid`)
    pub fn name(&self) -> &str {
        match self.unwrap_any() {
            Self::Float(name)
            | Self::Vector2(name)
            | Self::Vector3(name)
            | Self::Vector4(name)
            | Self::Color(name)
            | Self::Texture(name) => name,
            Self::Invalid | Self::Any(_) => "",
        }
    }

    /// Whether this value resolved to nothing usable
    pub fn is_invalid(&self) -> bool {
        self.concrete_kind() == ValueKind::Invalid
    }
}

/// Declared input port on a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Port name
    pub name: String,
    /// Declared kind; `Any` accepts every concrete kind
    pub kind: ValueKind,
}

impl Port {
    /// Create a new port declaration
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Check a bound value against this port.
    ///
    /// Ports never promote: the unwrapped kind must match exactly unless the
    /// port is declared `Any`.
    pub fn accepts(&self, value: &Value) -> bool {
        let kind = value.concrete_kind();
        if kind == ValueKind::Invalid {
            return false;
        }
        self.kind == ValueKind::Any || self.kind == kind
    }
}

/// Literal value carried by constant nodes and exported uniforms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color
    Color([f32; 4]),
}

impl PortValue {
    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Float(_) => ValueKind::Float,
            Self::Vector2(_) => ValueKind::Vector2,
            Self::Vector3(_) => ValueKind::Vector3,
            Self::Vector4(_) => ValueKind::Vector4,
            Self::Color(_) => ValueKind::Color,
        }
    }

    /// Components in order
    pub fn components(&self) -> &[f32] {
        match self {
            Self::Float(v) => std::slice::from_ref(v),
            Self::Vector2(v) => v,
            Self::Vector3(v) => v,
            Self::Vector4(v) | Self::Color(v) => v,
        }
    }

    /// GLSL literal expression, e.g. `vec3(1.0, 0.5, 0.0)`
    pub fn glsl_literal(&self) -> String {
        if let Self::Float(v) = self {
            return float_literal(*v);
        }
        let components: Vec<String> = self.components().iter().copied().map(float_literal).collect();
        format!(
            "{}({})",
            self.kind().glsl_type().unwrap_or("vec4"),
            components.join(", ")
        )
    }
}

/// Format a float so GLSL parses it as a float literal
pub fn float_literal(value: f32) -> String {
    if !value.is_finite() {
        return "0.0".to_string();
    }
    let text = value.to_string();
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}
