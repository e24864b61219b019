//! Recipe graph
//!
//! Stores recipe edges in a petgraph `StableDiGraph`, one node per item
//! name, edges pointing from parent to child. Edges that would close a
//! cycle are rejected at insertion, so every traversal terminates.

use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use super::edge::{RecipeEdge, RECIPE_HEADER};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Adding {1} to {0} would create a cycle")]
    CycleDetected(String, String),

    #[error("{0} cannot be an ingredient of itself")]
    SelfReference(String),

    #[error("{0} already uses {1}")]
    DuplicateEdge(String, String),

    #[error("'{0}' is reserved for recipe headers")]
    ReservedName(String),

    #[error("{0} does not use {1}")]
    EdgeNotFound(String, String),
}

/// An edge plus its insertion sequence number
#[derive(Debug, Clone)]
struct Link {
    seq: u64,
    edge: RecipeEdge,
}

/// The recipe graph
#[derive(Debug, Default, Clone)]
pub struct RecipeGraph {
    graph: StableDiGraph<String, Link>,

    /// Map from item name to node index
    node_map: HashMap<String, NodeIndex>,

    next_seq: u64,
}

impl RecipeGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.node_map.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        idx
    }

    /// Adds an edge
    ///
    /// Recipe headers may be duplicated (the first one wins); any other
    /// repeated (parent, child) pair is rejected.
    pub fn add_edge(&mut self, edge: RecipeEdge) -> Result<(), GraphError> {
        if edge.parent == edge.child {
            return Err(GraphError::SelfReference(edge.parent));
        }
        if edge.child == RECIPE_HEADER {
            return Err(GraphError::ReservedName(edge.child));
        }
        if !edge.is_header() && self.edge_index(&edge.parent, &edge.child).is_some() {
            return Err(GraphError::DuplicateEdge(edge.parent, edge.child));
        }

        let parent = self.node(&edge.parent);
        let child = self.node(&edge.child);

        if has_path_connecting(&self.graph, child, parent, None) {
            self.prune(parent);
            self.prune(child);
            return Err(GraphError::CycleDetected(edge.parent, edge.child));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.graph.add_edge(parent, child, Link { seq, edge });
        Ok(())
    }

    /// Removes the (first) edge from `parent` to `child`
    pub fn remove_edge(&mut self, parent: &str, child: &str) -> Option<RecipeEdge> {
        let idx = self.edge_index(parent, child)?;
        let (source, target) = self.graph.edge_endpoints(idx)?;
        let link = self.graph.remove_edge(idx)?;
        self.prune(source);
        self.prune(target);
        Some(link.edge)
    }

    /// Drops a node that no longer has any edges
    fn prune(&mut self, idx: NodeIndex) {
        let isolated = self
            .graph
            .neighbors_undirected(idx)
            .next()
            .is_none();
        if isolated {
            if let Some(name) = self.graph.remove_node(idx) {
                self.node_map.remove(&name);
            }
        }
    }

    /// Edges out of `idx` in insertion order
    fn links_out(&self, idx: NodeIndex) -> Vec<(EdgeIndex, &Link)> {
        let mut links: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.weight()))
            .collect();
        links.sort_by_key(|(_, link)| link.seq);
        links
    }

    /// Edges into `idx` in insertion order
    fn links_in(&self, idx: NodeIndex) -> Vec<(EdgeIndex, &Link)> {
        let mut links: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), e.weight()))
            .collect();
        links.sort_by_key(|(_, link)| link.seq);
        links
    }

    fn edge_index(&self, parent: &str, child: &str) -> Option<EdgeIndex> {
        let parent_idx = *self.node_map.get(parent)?;
        let child_idx = *self.node_map.get(child)?;
        self.links_out(parent_idx)
            .into_iter()
            .find(|(id, _)| {
                self.graph
                    .edge_endpoints(*id)
                    .is_some_and(|(_, target)| target == child_idx)
            })
            .map(|(id, _)| id)
    }

    /// The edge from `parent` to `child`
    pub fn edge(&self, parent: &str, child: &str) -> Option<&RecipeEdge> {
        let idx = self.edge_index(parent, child)?;
        self.graph.edge_weight(idx).map(|link| &link.edge)
    }

    /// Mutable access to the edge from `parent` to `child`
    pub fn edge_mut(&mut self, parent: &str, child: &str) -> Option<&mut RecipeEdge> {
        let idx = self.edge_index(parent, child)?;
        self.graph.edge_weight_mut(idx).map(|link| &mut link.edge)
    }

    /// The recipe header for `name`, first one if duplicated
    pub fn header(&self, name: &str) -> Option<&RecipeEdge> {
        self.edge(RECIPE_HEADER, name)
    }

    /// Number of recipe headers for `name`
    pub fn header_count(&self, name: &str) -> usize {
        let Some(idx) = self.node_map.get(name) else {
            return 0;
        };
        self.links_in(*idx)
            .iter()
            .filter(|(_, link)| link.edge.is_header())
            .count()
    }

    /// Returns true if `name` has a recipe header
    pub fn is_recipe(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Edges whose parent is `name`, in insertion order
    pub fn child_edges(&self, name: &str) -> Vec<&RecipeEdge> {
        match self.node_map.get(name) {
            Some(idx) => self
                .links_out(*idx)
                .into_iter()
                .map(|(_, link)| &link.edge)
                .collect(),
            None => vec![],
        }
    }

    /// Edges whose child is `name`, in insertion order
    pub fn parent_edges(&self, name: &str) -> Vec<&RecipeEdge> {
        match self.node_map.get(name) {
            Some(idx) => self
                .links_in(*idx)
                .into_iter()
                .map(|(_, link)| &link.edge)
                .collect(),
            None => vec![],
        }
    }

    /// Direct ingredients of `name`
    pub fn children_of(&self, name: &str) -> Vec<String> {
        self.child_edges(name)
            .into_iter()
            .map(|e| e.child.clone())
            .collect()
    }

    /// Items (and the header sentinel) that use `name` directly
    pub fn parents_of(&self, name: &str) -> Vec<String> {
        let mut parents: Vec<String> = Vec::new();
        for edge in self.parent_edges(name) {
            if !parents.contains(&edge.parent) {
                parents.push(edge.parent.clone());
            }
        }
        parents
    }

    /// Adds every transitive ingredient of `name` to `acc`
    pub fn all_descendants(&self, name: &str, acc: &mut BTreeSet<String>) {
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            for child in self.children_of(&current) {
                if acc.insert(child.clone()) {
                    stack.push(child);
                }
            }
        }
    }

    /// Adds every transitive user of `name` to `acc`, including the header sentinel
    pub fn all_ancestors(&self, name: &str, acc: &mut BTreeSet<String>) {
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            for parent in self.parents_of(&current) {
                if acc.insert(parent.clone()) {
                    stack.push(parent);
                }
            }
        }
    }

    /// Zeroes the cost of every edge whose child is `name` or one of its ancestors
    ///
    /// Returns the number of edges reset.
    pub fn invalidate(&mut self, name: &str) -> usize {
        let mut targets = BTreeSet::new();
        self.all_ancestors(name, &mut targets);
        targets.insert(name.to_string());

        let batch: Vec<EdgeIndex> = self
            .graph
            .edge_indices()
            .filter(|idx| {
                self.graph
                    .edge_weight(*idx)
                    .is_some_and(|link| targets.contains(&link.edge.child))
            })
            .collect();

        for idx in &batch {
            if let Some(link) = self.graph.edge_weight_mut(*idx) {
                link.edge.cost = 0.0;
            }
        }
        tracing::debug!(name, edges = batch.len(), "invalidated costs");
        batch.len()
    }

    /// Writes a resolved cost onto an edge
    pub fn set_cost(&mut self, parent: &str, child: &str, cost: f64) -> bool {
        match self.edge_mut(parent, child) {
            Some(edge) => {
                edge.cost = cost;
                true
            }
            None => false,
        }
    }

    /// Cached allergens for `name`, if any edge into it holds them
    pub fn cached_allergens(&self, name: &str) -> Option<BTreeSet<String>> {
        self.parent_edges(name)
            .into_iter()
            .find_map(|edge| edge.allergens.clone())
    }

    /// Caches allergens on every edge into `name`
    pub fn cache_allergens(&mut self, name: &str, allergens: &BTreeSet<String>) {
        let Some(idx) = self.node_map.get(name).copied() else {
            return;
        };
        let incoming: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.id())
            .collect();
        for edge in incoming {
            if let Some(link) = self.graph.edge_weight_mut(edge) {
                link.edge.allergens = Some(allergens.clone());
            }
        }
    }

    /// Drops every cached allergen set
    pub fn clear_allergen_cache(&mut self) {
        let all: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for idx in all {
            if let Some(link) = self.graph.edge_weight_mut(idx) {
                link.edge.allergens = None;
            }
        }
    }

    /// All edges in insertion order
    pub fn edges(&self) -> Vec<&RecipeEdge> {
        let mut links: Vec<&Link> = self
            .graph
            .edge_indices()
            .filter_map(|idx| self.graph.edge_weight(idx))
            .collect();
        links.sort_by_key(|link| link.seq);
        links.into_iter().map(|link| &link.edge).collect()
    }

    /// Sorted names of items that have a recipe header
    pub fn recipes(&self) -> Vec<String> {
        let mut names = self.children_of(RECIPE_HEADER);
        names.sort();
        names.dedup();
        names
    }

    /// Returns true if the graph contains `name` as a parent or child
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Returns the number of edges
    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true if the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }
}
