//! Artifact dependency graph on top of petgraph::StableDiGraph
//!
//! Nodes live in a single arena and refer to each other by index only. An
//! edge `parent -> child` means the child depends on the parent.

use crate::model::{Artifact, ArtifactId};
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::{HashMap, HashSet};

/// Stable index of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> NodeIndex {
        NodeIndex::new(self.0 as usize)
    }

    fn from_index(idx: NodeIndex) -> Self {
        NodeId(idx.index() as u32)
    }
}

/// The artifact graph, immutable once built by [`crate::GraphBuilder`].
pub struct Graph {
    inner: StableDiGraph<Artifact, ()>,
    by_id: HashMap<ArtifactId, NodeId>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub(crate) fn from_parts(inner: StableDiGraph<Artifact, ()>, by_id: HashMap<ArtifactId, NodeId>) -> Self {
        Graph { inner, by_id }
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of parent/child edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = GraphNode<'_>> {
        self.inner
            .node_indices()
            .map(move |idx| GraphNode { graph: self, id: NodeId::from_index(idx) })
    }

    /// View of a node by arena index.
    pub fn node(&self, id: NodeId) -> Option<GraphNode<'_>> {
        self.inner
            .contains_node(id.index())
            .then_some(GraphNode { graph: self, id })
    }

    /// View of a node by artifact id.
    pub fn get(&self, artifact_id: &str) -> Option<GraphNode<'_>> {
        self.node_id(artifact_id).and_then(|id| self.node(id))
    }

    /// Arena index of an artifact id.
    pub fn node_id(&self, artifact_id: &str) -> Option<NodeId> {
        self.by_id.get(artifact_id).copied()
    }

    /// Artifact stored at a node.
    pub fn artifact(&self, id: NodeId) -> Option<&Artifact> {
        self.inner.node_weight(id.index())
    }

    /// Nodes this node depends on.
    pub fn parents(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inner
            .neighbors_directed(id.index(), Direction::Incoming)
            .map(NodeId::from_index)
    }

    /// Nodes that depend on this node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inner
            .neighbors_directed(id.index(), Direction::Outgoing)
            .map(NodeId::from_index)
    }

    /// Check whether `child` directly depends on `parent`.
    pub fn has_edge(&self, parent: NodeId, child: NodeId) -> bool {
        self.inner.contains_edge(parent.index(), child.index())
    }

    fn in_project(&self, id: NodeId, project: &str) -> bool {
        self.artifact(id).is_some_and(|a| a.project == project)
    }

    /// All nodes belonging to a project.
    pub fn nodes_in_project<'a>(&'a self, project: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.inner
            .node_indices()
            .map(NodeId::from_index)
            .filter(move |&id| self.in_project(id, project))
    }

    /// Number of nodes belonging to a project.
    pub fn node_count_in(&self, project: &str) -> usize {
        self.nodes_in_project(project).count()
    }

    /// Roots of a project: its nodes with no parent inside the same project.
    /// Parents from other projects do not disqualify a node.
    pub fn roots(&self, project: &str) -> Vec<NodeId> {
        self.nodes_in_project(project)
            .filter(|&id| !self.parents(id).any(|p| self.in_project(p, project)))
            .collect()
    }

    /// Nodes with no parents at all, regardless of project.
    pub fn all_roots(&self) -> Vec<NodeId> {
        self.inner
            .node_indices()
            .map(NodeId::from_index)
            .filter(|&id| self.parents(id).next().is_none())
            .collect()
    }

    /// Find a node by artifact name (first match).
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|n| n.artifact().name == name).map(|n| n.id())
    }

    /// Find the node whose source path is a suffix of `path`, as when
    /// resolving an editor document URI.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let path = path.replace('\\', "/");
        self.nodes()
            .find(|n| {
                n.artifact()
                    .path
                    .as_deref()
                    .is_some_and(|p| !p.is_empty() && path.ends_with(&p.replace('\\', "/")))
            })
            .map(|n| n.id())
    }

    /// Every node reachable by walking parents transitively.
    pub fn ancestors(&self, id: NodeId) -> HashSet<NodeId> {
        self.reachable(id, Direction::Incoming)
    }

    /// Every node reachable by walking children transitively.
    pub fn descendants(&self, id: NodeId) -> HashSet<NodeId> {
        self.reachable(id, Direction::Outgoing)
    }

    /// Whether `ancestor` is reachable from `id` by walking parents.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor != id && has_path_connecting(&self.inner, ancestor.index(), id.index(), None)
    }

    fn reachable(&self, id: NodeId, direction: Direction) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut to_visit = vec![id];

        while let Some(current) = to_visit.pop() {
            for next in self.inner.neighbors_directed(current.index(), direction) {
                let next = NodeId::from_index(next);
                if seen.insert(next) {
                    to_visit.push(next);
                }
            }
        }

        seen
    }

    /// Breadth-first levels of a project starting from its roots. Each node
    /// appears once, at the first level the walk reaches it.
    pub fn levels(&self, project: &str) -> Vec<Vec<NodeId>> {
        let mut visited = HashSet::new();
        let mut levels = Vec::new();
        let mut frontier = self.roots(project);

        while !frontier.is_empty() {
            let level: Vec<NodeId> = frontier.into_iter().filter(|id| visited.insert(*id)).collect();
            frontier = level
                .iter()
                .flat_map(|&id| self.children(id))
                .filter(|&c| !visited.contains(&c) && self.in_project(c, project))
                .collect();
            if !level.is_empty() {
                levels.push(level);
            }
        }

        levels
    }
}

/// Borrowed view of one node and its relations.
#[derive(Clone, Copy)]
pub struct GraphNode<'g> {
    graph: &'g Graph,
    id: NodeId,
}

impl<'g> GraphNode<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn artifact(&self) -> &'g Artifact {
        &self.graph.inner[self.id.index()]
    }

    pub fn parents(&self) -> impl Iterator<Item = GraphNode<'g>> + 'g {
        let graph = self.graph;
        graph.parents(self.id).map(move |id| GraphNode { graph, id })
    }

    pub fn children(&self) -> impl Iterator<Item = GraphNode<'g>> + 'g {
        let graph = self.graph;
        graph.children(self.id).map(move |id| GraphNode { graph, id })
    }

    /// First parent matching a predicate.
    pub fn find_parent(&self, condition: impl Fn(&GraphNode<'g>) -> bool) -> Option<GraphNode<'g>> {
        self.parents().find(|p| condition(p))
    }
}

impl std::fmt::Debug for GraphNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("artifact", &self.artifact().id)
            .finish()
    }
}
