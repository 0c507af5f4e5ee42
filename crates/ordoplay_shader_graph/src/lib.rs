// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader node graph for `OrdoPlay` Editor.
//!
//! This crate turns a graph of shader nodes into a GLSL vertex/fragment
//! program pair:
//! - Typed values flowing between node ports
//! - Operation rules resolving result kinds of math nodes
//! - Reactive recompute of downstream nodes on every edit
//! - Dependency-ordered GLSL emission into fixed templates
//!
//! ## Architecture
//!
//! A [`Graph`] owns its [`Node`]s. Each node wraps one [`NodeKind`] holding
//! the literal state of a concrete kind, and records its input bindings, its
//! current output [`Value`]s and its [`ValidationState`]. Compiling walks the
//! nodes reachable from the output node and feeds a [`ShaderCompiler`].

pub mod compiler;
pub mod connection;
pub mod document;
pub mod evaluation;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod port;
pub mod rules;
pub mod settings;

pub use compiler::{ShaderCompiler, ShaderSource, TextureResource, TextureRole};
pub use connection::{Connection, OutputRef};
pub use document::{DocumentError, GraphDocument};
pub use evaluation::EvaluationError;
pub use graph::{ConnectionError, Graph};
pub use node::{Node, NodeCategory, NodeId, NodeRegistry, NodeType, ValidationState};
pub use nodes::{create_shader_registry, NodeKind};
pub use port::{Port, PortValue, Value, ValueKind};
pub use rules::OperationRules;
pub use settings::{CompilerSettings, SettingsError};
