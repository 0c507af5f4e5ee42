// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation ordering and the compile pass.
//!
//! Both recompute cascades and code generation walk nodes producer-first.
//! A cycle or a binding to a missing node aborts the walk.

use crate::compiler::{ShaderCompiler, ShaderSource};
use crate::graph::Graph;
use crate::node::{NodeId, ValidationState};
use std::collections::HashSet;

/// Error during evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// Graph contains a cycle
    #[error("Graph contains a cycle through node {0}")]
    CycleDetected(NodeId),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A binding points at a node that is not in the graph
    #[error("Node {node} reads from missing node {dependency}")]
    UnresolvedDependency {
        /// Reading node
        node: NodeId,
        /// Missing producer
        dependency: NodeId,
    },
}

/// Order `roots` and their dependencies so every node follows the nodes it
/// depends on
pub fn dependency_order<F>(roots: &[NodeId], dependencies: F) -> Result<Vec<NodeId>, EvaluationError>
where
    F: Fn(NodeId) -> Result<Vec<NodeId>, EvaluationError>,
{
    let mut visited = HashSet::new();
    let mut temp_mark = HashSet::new();
    let mut order = Vec::new();

    for root in roots {
        visit(*root, &dependencies, &mut visited, &mut temp_mark, &mut order)?;
    }

    Ok(order)
}

fn visit<F>(
    node_id: NodeId,
    dependencies: &F,
    visited: &mut HashSet<NodeId>,
    temp_mark: &mut HashSet<NodeId>,
    order: &mut Vec<NodeId>,
) -> Result<(), EvaluationError>
where
    F: Fn(NodeId) -> Result<Vec<NodeId>, EvaluationError>,
{
    if visited.contains(&node_id) {
        return Ok(());
    }
    if !temp_mark.insert(node_id) {
        return Err(EvaluationError::CycleDetected(node_id));
    }

    for dependency in dependencies(node_id)? {
        visit(dependency, dependencies, visited, temp_mark, order)?;
    }

    temp_mark.remove(&node_id);
    visited.insert(node_id);
    order.push(node_id);

    Ok(())
}

/// Every node `output` depends on, producers first, ending with `output`
pub fn compile_order(graph: &Graph, output: NodeId) -> Result<Vec<NodeId>, EvaluationError> {
    if !graph.contains_node(output) {
        return Err(EvaluationError::NodeNotFound(output));
    }
    dependency_order(&[output], |id| {
        let node = graph.node(id).ok_or(EvaluationError::NodeNotFound(id))?;
        node.bindings()
            .iter()
            .flatten()
            .map(|source| {
                if graph.contains_node(source.node) {
                    Ok(source.node)
                } else {
                    Err(EvaluationError::UnresolvedDependency {
                        node: id,
                        dependency: source.node,
                    })
                }
            })
            .collect()
    })
}

/// `starts` and every node downstream of them, producers first
pub fn propagation_order(graph: &Graph, starts: &[NodeId]) -> Result<Vec<NodeId>, EvaluationError> {
    let mut affected: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = starts.to_vec();
    while let Some(id) = stack.pop() {
        if affected.insert(id) {
            stack.extend(graph.consumers(id));
        }
    }

    // Keep graph insertion order among independent nodes
    let roots: Vec<NodeId> = graph.node_ids().filter(|id| affected.contains(id)).collect();
    dependency_order(&roots, |id| {
        let node = graph.node(id).ok_or(EvaluationError::NodeNotFound(id))?;
        Ok(node
            .bindings()
            .iter()
            .flatten()
            .map(|source| source.node)
            .filter(|source| affected.contains(source))
            .collect())
    })
}

/// Run one compile pass over the nodes reachable from the output node.
///
/// Nodes in the error state contribute nothing. Without an output node the
/// templates are emitted with empty graph sections.
pub fn compile_graph(graph: &Graph, compiler: &mut ShaderCompiler) -> Result<ShaderSource, EvaluationError> {
    compiler.reset();

    let Some(output) = graph.output_node() else {
        tracing::warn!(graph = %graph.name, "graph has no output node; emitting empty shader");
        return Ok(compiler.compile());
    };

    let order = compile_order(graph, output)?;
    let mut skipped = 0usize;
    for id in &order {
        let node = graph.node(*id).ok_or(EvaluationError::NodeNotFound(*id))?;
        if let ValidationState::Error(message) = node.validation_state() {
            tracing::debug!(node = %id, kind = node.type_name(), %message, "skipping node in error state");
            skipped += 1;
            continue;
        }
        node.generate_code(&graph.input_values(node), compiler);
    }

    tracing::debug!(
        graph = %graph.name,
        nodes = order.len(),
        skipped,
        statements = compiler.statements().len(),
        textures = compiler.texture_resources().len(),
        uniforms = compiler.exported_uniform_defaults().len(),
        "compiled shader graph"
    );
    Ok(compiler.compile())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::OutputRef;
    use crate::nodes::constant::ConstantNode;
    use crate::nodes::math::{BinaryNode, BinaryOp};
    use crate::nodes::output::ShaderOutputNode;
    use crate::nodes::selector::{SelectorNode, SelectorSource};
    use crate::nodes::structural::CombineNode;
    use crate::nodes::NodeKind;
    use crate::port::PortValue;
    use std::collections::HashMap;

    fn float(graph: &mut Graph) -> NodeId {
        graph.add_node(NodeKind::Constant(ConstantNode::new(PortValue::Float(1.0))))
    }

    #[test]
    fn test_dependency_order_is_producer_first() {
        let deps: HashMap<NodeId, Vec<NodeId>> = HashMap::from([
            (NodeId(3), vec![NodeId(1), NodeId(2)]),
            (NodeId(2), vec![NodeId(1)]),
            (NodeId(1), vec![]),
        ]);
        let order = dependency_order(&[NodeId(3)], |id| Ok(deps[&id].clone())).unwrap();
        assert_eq!(order, vec![NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let deps: HashMap<NodeId, Vec<NodeId>> = HashMap::from([
            (NodeId(1), vec![NodeId(2)]),
            (NodeId(2), vec![NodeId(1)]),
        ]);
        let result = dependency_order(&[NodeId(1)], |id| Ok(deps[&id].clone()));
        assert!(matches!(result, Err(EvaluationError::CycleDetected(NodeId(1)))));
    }

    #[test]
    fn test_add_scenario() {
        // Pads ids so the operands land on 3 and 5 and the add on 7
        let mut graph = Graph::new("scenario");
        for _ in 0..3 {
            float(&mut graph);
        }
        let a = float(&mut graph);
        float(&mut graph);
        let b = float(&mut graph);
        float(&mut graph);
        let sum = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        assert_eq!((a, b, sum), (NodeId(3), NodeId(5), NodeId(7)));
        graph.set_input(sum, 0, Some(OutputRef::new(a, 0))).unwrap();
        graph.set_input(sum, 1, Some(OutputRef::new(b, 0))).unwrap();

        let out = graph.add_node(NodeKind::Output(ShaderOutputNode));
        graph.connect(sum, 0, out, 1).unwrap();
        graph.set_output_node(Some(out)).unwrap();

        let mut compiler = ShaderCompiler::default();
        graph.compile(&mut compiler).unwrap();
        assert_eq!(
            compiler.statements(),
            [
                "float Float_3 = 1.0;",
                "float Float_5 = 1.0;",
                "float Add_7 = Float_3 + Float_5;",
                "__Opacity = Add_7;",
            ]
        );
    }

    #[test]
    fn test_error_nodes_are_skipped() {
        let mut graph = Graph::new("scenario");
        let a = float(&mut graph);
        let sum = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        graph.connect(a, 0, sum, 0).unwrap();
        let out = graph.add_node(NodeKind::Output(ShaderOutputNode));
        graph.set_output_node(Some(out)).unwrap();
        // The add node is in error, so the output sees an invalid value
        graph.connect(sum, 0, out, 1).unwrap();

        let mut compiler = ShaderCompiler::default();
        let source = graph.compile(&mut compiler).unwrap();
        assert_eq!(compiler.statements(), ["float Float_0 = 1.0;"]);
        assert!(!source.fragment.contains("Add_1"));
        assert!(source.fragment.contains("o_FragColor"));
    }

    #[test]
    fn test_combine_scenario() {
        let mut graph = Graph::new("scenario");
        let x = float(&mut graph);
        let y = float(&mut graph);
        let combine = graph.add_node(NodeKind::Combine(CombineNode::default()));
        graph.connect(x, 0, combine, 0).unwrap();
        graph.connect(y, 0, combine, 1).unwrap();
        let out = graph.add_node(NodeKind::Output(ShaderOutputNode));
        graph.connect(combine, 0, out, 0).unwrap();
        graph.set_output_node(Some(out)).unwrap();

        let mut compiler = ShaderCompiler::default();
        graph.compile(&mut compiler).unwrap();
        assert!(compiler
            .statements()
            .iter()
            .any(|s| s == "vec4 Combine_2 = vec4(Float_0, Float_1, 0.0, 0.0);"));
        assert_eq!(compiler.statements().last().map(String::as_str), Some("__BaseColor = Combine_2.rgb;"));
    }

    #[test]
    fn test_shared_macro_emitted_once() {
        let mut graph = Graph::new("scenario");
        let uv0 = graph.add_node(NodeKind::Selector(SelectorNode::new(SelectorSource::VertexAttribute)));
        let uv1 = graph.add_node(NodeKind::Selector(SelectorNode::new(SelectorSource::VertexAttribute)));
        let sum = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        graph.connect(uv0, 0, sum, 0).unwrap();
        graph.connect(uv1, 0, sum, 1).unwrap();
        graph.set_output_node(Some(sum)).unwrap();

        let mut compiler = ShaderCompiler::default();
        let source = graph.compile(&mut compiler).unwrap();
        assert_eq!(compiler.macros(), ["ENABLE_VERTEX_UV0"]);
        assert_eq!(source.fragment.matches("#define ENABLE_VERTEX_UV0\n").count(), 1);
        assert_eq!(compiler.statements().len(), 3);
    }

    #[test]
    fn test_unreachable_nodes_are_not_compiled() {
        let mut graph = Graph::new("reachability");
        let used = float(&mut graph);
        let unused = float(&mut graph);
        let out = graph.add_node(NodeKind::Output(ShaderOutputNode));
        graph.connect(used, 0, out, 3).unwrap();
        graph.set_output_node(Some(out)).unwrap();

        let order = compile_order(&graph, out).unwrap();
        assert_eq!(order, vec![used, out]);
        assert!(!order.contains(&unused));
    }

    #[test]
    fn test_statements_follow_definitions() {
        let mut graph = Graph::new("ordering");
        let out = graph.add_node(NodeKind::Output(ShaderOutputNode));
        let last = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Multiply)));
        let middle = graph.add_node(NodeKind::Binary(BinaryNode::new(BinaryOp::Add)));
        let a = float(&mut graph);
        graph.connect(a, 0, middle, 0).unwrap();
        graph.connect(a, 0, middle, 1).unwrap();
        graph.connect(middle, 0, last, 0).unwrap();
        graph.connect(a, 0, last, 1).unwrap();
        graph.connect(last, 0, out, 5).unwrap();
        graph.set_output_node(Some(out)).unwrap();

        let mut compiler = ShaderCompiler::default();
        graph.compile(&mut compiler).unwrap();
        let position = |name: &str| {
            compiler
                .statements()
                .iter()
                .position(|s| s.starts_with(&format!("float {name} ")))
                .unwrap()
        };
        assert!(position("Float_3") < position("Add_2"));
        assert!(position("Add_2") < position("Multiply_1"));
    }

    #[test]
    fn test_no_output_node_emits_template() {
        let mut graph = Graph::new("empty");
        float(&mut graph);
        let mut compiler = ShaderCompiler::default();
        let source = graph.compile(&mut compiler).unwrap();
        assert!(compiler.statements().is_empty());
        assert!(!source.fragment.contains("${"));
    }

    #[test]
    fn test_compile_resets_previous_pass() {
        let mut graph = Graph::new("reset");
        let a = float(&mut graph);
        let out = graph.add_node(NodeKind::Output(ShaderOutputNode));
        graph.connect(a, 0, out, 1).unwrap();
        graph.set_output_node(Some(out)).unwrap();

        let mut compiler = ShaderCompiler::default();
        let first = graph.compile(&mut compiler).unwrap();
        let second = graph.compile(&mut compiler).unwrap();
        assert_eq!(first, second);
    }
}
