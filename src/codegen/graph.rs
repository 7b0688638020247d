// SPDX-License-Identifier: MIT

//! Dependency graph builder
//!
//! Materializes the part of a project reachable from a root element into an
//! arena of nodes. Each element gets exactly one node no matter how many
//! consumers reach it, so shared sub-graphs are built once.

use std::collections::HashMap;

use crate::project::{Connection, Element, Port, Project};

/// Index of a node in a [`DependencyGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A connection feeding a node, resolved to the source node
#[derive(Debug, Clone, Copy)]
pub struct InputEdge<'p> {
    /// Source node
    pub node: NodeId,
    /// The connection as declared in the project
    pub connection: &'p Connection,
}

impl<'p> InputEdge<'p> {
    /// Port on the source element the value is read from
    pub fn from_port(&self) -> &'p Port {
        &self.connection.from_port
    }

    /// Index of the `in-<k>` port this edge lands on, if any
    pub fn index(&self) -> Option<usize> {
        self.connection.to_port.input_index()
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode<'p> {
    pub element: &'p Element,
    /// `in-*` inputs ordered by port index, declaration order within a port
    pub inputs: Vec<InputEdge<'p>>,
    /// The `cond-0` input, if connected
    pub cond_input: Option<InputEdge<'p>>,
}

/// Arena of graph nodes indexed by element id
pub struct DependencyGraph<'p> {
    project: &'p Project,
    incoming: HashMap<&'p str, Vec<&'p Connection>>,
    nodes: Vec<GraphNode<'p>>,
    index: HashMap<&'p str, NodeId>,
}

impl<'p> DependencyGraph<'p> {
    pub fn new(project: &'p Project) -> Self {
        let mut incoming: HashMap<&'p str, Vec<&'p Connection>> = HashMap::new();
        for conn in &project.connections {
            incoming
                .entry(conn.to_element.as_str())
                .or_default()
                .push(conn);
        }
        Self {
            project,
            incoming,
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build (or reuse) the node for `id` and everything it depends on
    ///
    /// Returns `None` when `id` names no element. Connections from missing
    /// elements are dropped from the input lists.
    pub fn build(&mut self, id: &str) -> Option<NodeId> {
        let (root, fresh) = self.intern(id)?;
        if !fresh {
            return Some(root);
        }

        let mut pending = vec![root];
        while let Some(node_id) = pending.pop() {
            let element: &'p Element = self.nodes[node_id.0].element;
            let element_id: &'p str = element.id.as_str();
            let conns = self.incoming.get(element_id).cloned().unwrap_or_default();

            let mut inputs = Vec::new();
            let mut cond_input = None;
            for conn in conns {
                let is_input = matches!(conn.to_port, Port::In(_));
                let is_cond = conn.to_port == Port::Cond && cond_input.is_none();
                if !is_input && !is_cond {
                    continue;
                }
                let Some((child, fresh)) = self.intern(&conn.from_element) else {
                    log::debug!(
                        "Connection into {} from missing element {}",
                        element_id,
                        conn.from_element
                    );
                    continue;
                };
                if fresh {
                    pending.push(child);
                }
                let edge = InputEdge {
                    node: child,
                    connection: conn,
                };
                if is_input {
                    inputs.push(edge);
                } else {
                    cond_input = Some(edge);
                }
            }
            inputs.sort_by_key(|e| e.index().unwrap_or(usize::MAX));

            let node = &mut self.nodes[node_id.0];
            node.inputs = inputs;
            node.cond_input = cond_input;
        }

        Some(root)
    }

    /// Look up or allocate the node for an element; `true` when newly allocated
    fn intern(&mut self, id: &str) -> Option<(NodeId, bool)> {
        if let Some(&node) = self.index.get(id) {
            return Some((node, false));
        }
        let project: &'p Project = self.project;
        let element = project.element(id)?;
        let node = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            element,
            inputs: Vec::new(),
            cond_input: None,
        });
        self.index.insert(element.id.as_str(), node);
        Some((node, true))
    }

    pub fn node(&self, id: NodeId) -> &GraphNode<'p> {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> &'p Element {
        self.nodes[id.0].element
    }

    /// Node connected to `in-<k>`
    pub fn input(&self, id: NodeId, k: usize) -> Option<NodeId> {
        self.nodes[id.0]
            .inputs
            .iter()
            .find(|e| e.index() == Some(k))
            .map(|e| e.node)
    }

    /// Nodes connected to `in-*` ports, in port order, limited to `in-0..in-(limit-1)`
    pub fn inputs_below(&self, id: NodeId, limit: Option<usize>) -> Vec<NodeId> {
        self.nodes[id.0]
            .inputs
            .iter()
            .filter(|e| match (limit, e.index()) {
                (Some(limit), Some(k)) => k < limit,
                _ => true,
            })
            .map(|e| e.node)
            .collect()
    }

    pub fn cond_input(&self, id: NodeId) -> Option<InputEdge<'p>> {
        self.nodes[id.0].cond_input
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
