use std::collections::VecDeque;

use tracing::debug;

use crate::data_type::DataType;
use crate::error::{DataError, Result};
use crate::table::Table;
use crate::tuple::Tuple;
use crate::value::Value;

/// Reserved edge-table column holding the source node row.
pub const SOURCE: &str = "source";
/// Reserved edge-table column holding the target node row.
pub const TARGET: &str = "target";

/// A tuple handle denoting one node of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeTuple(Tuple);

impl NodeTuple {
    /// The underlying table handle.
    pub fn tuple(self) -> Tuple {
        self.0
    }

    /// The node's row in the node table.
    pub fn row(self) -> usize {
        self.0.row()
    }
}

/// A tuple handle denoting one edge of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeTuple(Tuple);

impl EdgeTuple {
    /// The underlying table handle.
    pub fn tuple(self) -> Tuple {
        self.0
    }

    /// The edge's row in the edge table.
    pub fn row(self) -> usize {
        self.0.row()
    }
}

/// Spanning structure derived from the graph, built by breadth-first search
/// from a chosen root over the underlying undirected topology.
#[derive(Debug, Clone)]
struct SpanningTree {
    root: usize,
    parent: Vec<Option<usize>>,
    parent_edge: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    depth: Vec<Option<usize>>,
}

/// A directed-or-undirected graph over two tables: one for nodes, one for
/// edges (whose reserved `source`/`target` columns hold node rows).
///
/// The graph owns adjacency bookkeeping and keeps it consistent through node
/// and edge removal; node and edge tuples forward every topology question
/// here rather than implementing any of it themselves. Attribute storage,
/// indexing, and change notification are the tables' business and are
/// reached through [Graph::nodes] / [Graph::edges].
#[derive(Debug)]
pub struct Graph {
    nodes: Table,
    edges: Table,
    directed: bool,
    out_adj: Vec<Vec<usize>>,
    in_adj: Vec<Vec<usize>>,
    spanning: Option<SpanningTree>,
}

impl Graph {
    /// Creates an empty graph. `directed` fixes the interpretation of edge
    /// direction for degree and adjacency queries.
    pub fn new(directed: bool) -> Self {
        let mut edges = Table::new();
        edges
            .add_column(SOURCE, DataType::Long)
            .expect("fresh table accepts the reserved source column");
        edges
            .add_column(TARGET, DataType::Long)
            .expect("fresh table accepts the reserved target column");
        Self {
            nodes: Table::new(),
            edges,
            directed,
            out_adj: Vec::new(),
            in_adj: Vec::new(),
            spanning: None,
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// The node table (read access).
    pub fn nodes(&self) -> &Table {
        &self.nodes
    }

    /// The edge table (read access).
    pub fn edges(&self) -> &Table {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.row_count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.row_count()
    }

    /// Declares an attribute column on the node table.
    pub fn add_node_column(&mut self, name: &str, data_type: DataType) -> Result<()> {
        self.nodes.add_column(name, data_type)
    }

    /// Declares an attribute column on the edge table.
    pub fn add_edge_column(&mut self, name: &str, data_type: DataType) -> Result<()> {
        self.edges.add_column(name, data_type)
    }

    /// Writes a node attribute.
    pub fn set_node_value(&mut self, node: NodeTuple, field: &str, value: &Value) -> Result<()> {
        self.nodes.set(node.0, field, value)
    }

    /// Writes an edge attribute.
    pub fn set_edge_value(&mut self, edge: EdgeTuple, field: &str, value: &Value) -> Result<()> {
        self.edges.set(edge.0, field, value)
    }

    // --- Structure ---

    fn check_node(&self, node: NodeTuple) -> Result<usize> {
        if !self.nodes.is_valid(node.0) {
            return Err(DataError::StaleTuple { row: node.row() });
        }
        Ok(node.row())
    }

    fn check_edge(&self, edge: EdgeTuple) -> Result<usize> {
        if !self.edges.is_valid(edge.0) {
            return Err(DataError::StaleTuple { row: edge.row() });
        }
        Ok(edge.row())
    }

    /// Adds a node and returns its handle.
    pub fn add_node(&mut self) -> NodeTuple {
        let tuple = self.nodes.add_row();
        let row = tuple.row();
        if row >= self.out_adj.len() {
            self.out_adj.resize_with(row + 1, Vec::new);
            self.in_adj.resize_with(row + 1, Vec::new);
        }
        self.spanning = None;
        NodeTuple(tuple)
    }

    /// Adds an edge between two live nodes.
    ///
    /// # Errors
    /// [DataError::StaleTuple] when either endpoint has been removed.
    pub fn add_edge(&mut self, source: NodeTuple, target: NodeTuple) -> Result<EdgeTuple> {
        let source_row = self.check_node(source)?;
        let target_row = self.check_node(target)?;

        let tuple = self.edges.add_row();
        self.edges.set_long(tuple, SOURCE, source_row as i64)?;
        self.edges.set_long(tuple, TARGET, target_row as i64)?;
        self.out_adj[source_row].push(tuple.row());
        self.in_adj[target_row].push(tuple.row());
        self.spanning = None;
        Ok(EdgeTuple(tuple))
    }

    /// Removes an edge. Its handle (and every copy) becomes invalid.
    pub fn remove_edge(&mut self, edge: EdgeTuple) -> Result<()> {
        let row = self.check_edge(edge)?;
        let source = self.edges.get_long(edge.0, SOURCE)? as usize;
        let target = self.edges.get_long(edge.0, TARGET)? as usize;
        self.out_adj[source].retain(|e| *e != row);
        self.in_adj[target].retain(|e| *e != row);
        self.edges.delete_row(edge.0)?;
        self.spanning = None;
        Ok(())
    }

    /// Removes a node together with every incident edge.
    pub fn remove_node(&mut self, node: NodeTuple) -> Result<()> {
        let row = self.check_node(node)?;
        let mut incident: Vec<usize> = self.out_adj[row].clone();
        incident.extend(self.in_adj[row].iter().copied());
        incident.sort_unstable();
        incident.dedup();

        for edge_row in incident {
            let edge = self.edges.tuple(edge_row)?;
            let source = self.edges.get_long(edge, SOURCE)? as usize;
            let target = self.edges.get_long(edge, TARGET)? as usize;
            self.out_adj[source].retain(|e| *e != edge_row);
            self.in_adj[target].retain(|e| *e != edge_row);
            self.edges.delete_row(edge)?;
        }

        self.nodes.delete_row(node.0)?;
        self.spanning = None;
        debug!(node = row, "removed node and incident edges");
        Ok(())
    }

    // --- Topology queries (delegated to by node/edge tuples) ---

    /// Number of outgoing edges (all incident edges when undirected).
    pub fn out_degree(&self, node: NodeTuple) -> Result<usize> {
        let row = self.check_node(node)?;
        if self.directed {
            Ok(self.out_adj[row].len())
        } else {
            Ok(self.out_adj[row].len() + self.in_adj[row].len())
        }
    }

    /// Number of incoming edges (all incident edges when undirected).
    pub fn in_degree(&self, node: NodeTuple) -> Result<usize> {
        let row = self.check_node(node)?;
        if self.directed {
            Ok(self.in_adj[row].len())
        } else {
            Ok(self.out_adj[row].len() + self.in_adj[row].len())
        }
    }

    /// Total number of incident edges.
    pub fn degree(&self, node: NodeTuple) -> Result<usize> {
        let row = self.check_node(node)?;
        Ok(self.out_adj[row].len() + self.in_adj[row].len())
    }

    fn edge_handles(&self, rows: &[usize]) -> Result<Vec<EdgeTuple>> {
        rows.iter()
            .map(|row| Ok(EdgeTuple(self.edges.tuple(*row)?)))
            .collect()
    }

    /// Outgoing edges, in insertion order.
    pub fn out_edges(&self, node: NodeTuple) -> Result<Vec<EdgeTuple>> {
        let row = self.check_node(node)?;
        self.edge_handles(&self.out_adj[row])
    }

    /// Incoming edges, in insertion order.
    pub fn in_edges(&self, node: NodeTuple) -> Result<Vec<EdgeTuple>> {
        let row = self.check_node(node)?;
        self.edge_handles(&self.in_adj[row])
    }

    /// Every incident edge: outgoing first, then incoming.
    pub fn edges_of(&self, node: NodeTuple) -> Result<Vec<EdgeTuple>> {
        let row = self.check_node(node)?;
        let mut all = self.edge_handles(&self.out_adj[row])?;
        all.extend(self.edge_handles(&self.in_adj[row])?);
        Ok(all)
    }

    /// The node an edge leaves from.
    pub fn edge_source(&self, edge: EdgeTuple) -> Result<NodeTuple> {
        self.check_edge(edge)?;
        let row = self.edges.get_long(edge.0, SOURCE)? as usize;
        Ok(NodeTuple(self.nodes.tuple(row)?))
    }

    /// The node an edge points to.
    pub fn edge_target(&self, edge: EdgeTuple) -> Result<NodeTuple> {
        self.check_edge(edge)?;
        let row = self.edges.get_long(edge.0, TARGET)? as usize;
        Ok(NodeTuple(self.nodes.tuple(row)?))
    }

    /// The endpoint of `edge` opposite to `node`.
    pub fn opposite(&self, edge: EdgeTuple, node: NodeTuple) -> Result<NodeTuple> {
        let row = self.check_node(node)?;
        let source = self.edge_source(edge)?;
        if source.row() == row {
            self.edge_target(edge)
        } else {
            Ok(source)
        }
    }

    /// Adjacent nodes across every incident edge, outgoing first.
    pub fn neighbors(&self, node: NodeTuple) -> Result<Vec<NodeTuple>> {
        let edges = self.edges_of(node)?;
        edges
            .into_iter()
            .map(|edge| self.opposite(edge, node))
            .collect()
    }

    /// All live nodes, in row order.
    pub fn node_tuples(&self) -> impl Iterator<Item = NodeTuple> + '_ {
        self.nodes.tuples().map(|t| NodeTuple(t.handle()))
    }

    /// All live edges, in row order.
    pub fn edge_tuples(&self) -> impl Iterator<Item = EdgeTuple> + '_ {
        self.edges.tuples().map(|t| EdgeTuple(t.handle()))
    }

    // --- Spanning tree view ---

    /// Builds the spanning tree by BFS from `root`, ignoring edge direction.
    /// Any structural change to the graph drops the tree; rebuild it before
    /// using the tree accessors again.
    pub fn build_spanning_tree(&mut self, root: NodeTuple) -> Result<()> {
        let root_row = self.check_node(root)?;
        let slots = self.nodes.slot_count();
        let mut tree = SpanningTree {
            root: root_row,
            parent: vec![None; slots],
            parent_edge: vec![None; slots],
            children: vec![Vec::new(); slots],
            depth: vec![None; slots],
        };

        tree.depth[root_row] = Some(0);
        let mut queue = VecDeque::from([root_row]);
        let mut visited = 0usize;
        while let Some(row) = queue.pop_front() {
            visited += 1;
            let node = NodeTuple(self.nodes.tuple(row)?);
            for edge in self.edges_of(node)? {
                let next = self.opposite(edge, node)?.row();
                if tree.depth[next].is_some() {
                    continue;
                }
                tree.depth[next] = Some(tree.depth[row].map(|d| d + 1).unwrap_or(0));
                tree.parent[next] = Some(row);
                tree.parent_edge[next] = Some(edge.row());
                tree.children[row].push(next);
                queue.push_back(next);
            }
        }

        debug!(root = root_row, visited, "built spanning tree");
        self.spanning = Some(tree);
        Ok(())
    }

    fn spanning(&self) -> Result<&SpanningTree> {
        self.spanning.as_ref().ok_or(DataError::NoSpanningTree)
    }

    /// Root of the current spanning tree.
    pub fn tree_root(&self) -> Result<NodeTuple> {
        let tree = self.spanning()?;
        Ok(NodeTuple(self.nodes.tuple(tree.root)?))
    }

    /// Parent of `node` in the spanning tree; `None` for the root or for
    /// nodes the tree did not reach.
    pub fn tree_parent(&self, node: NodeTuple) -> Result<Option<NodeTuple>> {
        let row = self.check_node(node)?;
        match self.spanning()?.parent[row] {
            Some(parent) => Ok(Some(NodeTuple(self.nodes.tuple(parent)?))),
            None => Ok(None),
        }
    }

    /// Edge connecting `node` to its spanning-tree parent.
    pub fn tree_parent_edge(&self, node: NodeTuple) -> Result<Option<EdgeTuple>> {
        let row = self.check_node(node)?;
        match self.spanning()?.parent_edge[row] {
            Some(edge) => Ok(Some(EdgeTuple(self.edges.tuple(edge)?))),
            None => Ok(None),
        }
    }

    /// Children of `node` in the spanning tree, in traversal order.
    pub fn tree_children(&self, node: NodeTuple) -> Result<Vec<NodeTuple>> {
        let row = self.check_node(node)?;
        self.spanning()?.children[row]
            .iter()
            .map(|child| Ok(NodeTuple(self.nodes.tuple(*child)?)))
            .collect()
    }

    /// Depth of `node` below the spanning-tree root; `None` when the tree
    /// did not reach it.
    pub fn tree_depth(&self, node: NodeTuple) -> Result<Option<usize>> {
        let row = self.check_node(node)?;
        Ok(self.spanning()?.depth[row])
    }

    /// The other children of `node`'s spanning-tree parent.
    pub fn tree_siblings(&self, node: NodeTuple) -> Result<Vec<NodeTuple>> {
        let row = self.check_node(node)?;
        let tree = self.spanning()?;
        let Some(parent) = tree.parent[row] else {
            return Ok(Vec::new());
        };
        tree.children[parent]
            .iter()
            .filter(|sibling| **sibling != row)
            .map(|sibling| Ok(NodeTuple(self.nodes.tuple(*sibling)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small diamond with a tail:  a -> b, a -> c, b -> d, c -> d, d -> e
    fn diamond() -> (Graph, Vec<NodeTuple>, Vec<EdgeTuple>) {
        let mut graph = Graph::new(true);
        graph.add_node_column("label", DataType::Text).unwrap();
        let nodes: Vec<NodeTuple> = (0..5).map(|_| graph.add_node()).collect();
        for (node, label) in nodes.iter().zip(["a", "b", "c", "d", "e"]) {
            graph
                .set_node_value(*node, "label", &Value::from(label))
                .unwrap();
        }
        let pairs = [(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)];
        let edges = pairs
            .iter()
            .map(|(s, t)| graph.add_edge(nodes[*s], nodes[*t]).unwrap())
            .collect();
        (graph, nodes, edges)
    }

    #[test]
    fn test_degrees() {
        let (graph, nodes, _edges) = diamond();

        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.out_degree(nodes[0]), Ok(2));
        assert_eq!(graph.in_degree(nodes[0]), Ok(0));
        assert_eq!(graph.in_degree(nodes[3]), Ok(2));
        assert_eq!(graph.out_degree(nodes[3]), Ok(1));
        assert_eq!(graph.degree(nodes[3]), Ok(3));
    }

    #[test]
    fn test_adjacency_and_neighbors() {
        let (graph, nodes, edges) = diamond();

        let out: Vec<usize> = graph
            .out_edges(nodes[0])
            .unwrap()
            .iter()
            .map(|e| e.row())
            .collect();
        assert_eq!(out, vec![edges[0].row(), edges[1].row()]);

        let neighbors: Vec<usize> = graph
            .neighbors(nodes[3])
            .unwrap()
            .iter()
            .map(|n| n.row())
            .collect();
        // outgoing first (d -> e), then incoming (b -> d, c -> d)
        assert_eq!(neighbors, vec![4, 1, 2]);

        assert_eq!(graph.edge_source(edges[2]).unwrap().row(), 1);
        assert_eq!(graph.edge_target(edges[2]).unwrap().row(), 3);
        assert_eq!(
            graph.opposite(edges[2], nodes[1]).unwrap().row(),
            3
        );
    }

    #[test]
    fn test_node_attributes_live_in_the_table() {
        let (graph, nodes, _edges) = diamond();
        let label = graph
            .nodes()
            .get_str(nodes[3].tuple(), "label")
            .unwrap();
        assert_eq!(label.as_ref(), "d");
    }

    #[test]
    fn test_remove_node_removes_incident_edges() {
        let (mut graph, nodes, edges) = diamond();

        graph.remove_node(nodes[3]).unwrap();

        assert_eq!(graph.node_count(), 4);
        // b -> d, c -> d and d -> e all went away
        assert_eq!(graph.edge_count(), 2);
        assert!(!graph.edges().is_valid(edges[2].tuple()));
        assert!(!graph.edges().is_valid(edges[3].tuple()));
        assert!(!graph.edges().is_valid(edges[4].tuple()));
        assert_eq!(graph.out_degree(nodes[1]), Ok(0));
        assert_eq!(graph.degree(nodes[4]), Ok(0));

        assert_eq!(
            graph.degree(nodes[3]),
            Err(DataError::StaleTuple { row: 3 })
        );
    }

    #[test]
    fn test_remove_edge() {
        let (mut graph, nodes, edges) = diamond();
        graph.remove_edge(edges[0]).unwrap();

        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.out_degree(nodes[0]), Ok(1));
        assert_eq!(graph.in_degree(nodes[1]), Ok(0));
        assert_eq!(
            graph.remove_edge(edges[0]),
            Err(DataError::StaleTuple { row: 0 })
        );
    }

    #[test]
    fn test_spanning_tree() {
        let (mut graph, nodes, _edges) = diamond();
        graph.build_spanning_tree(nodes[0]).unwrap();

        assert_eq!(graph.tree_root().unwrap().row(), 0);
        assert_eq!(graph.tree_parent(nodes[0]).unwrap(), None);
        assert_eq!(graph.tree_parent(nodes[1]).unwrap().map(|n| n.row()), Some(0));
        assert_eq!(graph.tree_parent(nodes[3]).unwrap().map(|n| n.row()), Some(1));
        assert_eq!(graph.tree_depth(nodes[0]), Ok(Some(0)));
        assert_eq!(graph.tree_depth(nodes[3]), Ok(Some(2)));
        assert_eq!(graph.tree_depth(nodes[4]), Ok(Some(3)));

        let children: Vec<usize> = graph
            .tree_children(nodes[0])
            .unwrap()
            .iter()
            .map(|n| n.row())
            .collect();
        assert_eq!(children, vec![1, 2]);

        let siblings: Vec<usize> = graph
            .tree_siblings(nodes[1])
            .unwrap()
            .iter()
            .map(|n| n.row())
            .collect();
        assert_eq!(siblings, vec![2]);
    }

    #[test]
    fn test_spanning_tree_invalidated_by_structure() {
        let (mut graph, nodes, _edges) = diamond();
        graph.build_spanning_tree(nodes[0]).unwrap();
        assert!(graph.tree_root().is_ok());

        let extra = graph.add_node();
        assert_eq!(graph.tree_root().err(), Some(DataError::NoSpanningTree));

        graph.build_spanning_tree(nodes[0]).unwrap();
        // the new node is disconnected: no parent, no depth
        assert_eq!(graph.tree_depth(extra), Ok(None));
        assert_eq!(graph.tree_parent(extra), Ok(None));
    }

    #[test]
    fn test_undirected_degrees() {
        let mut graph = Graph::new(false);
        let a = graph.add_node();
        let b = graph.add_node();
        graph.add_edge(a, b).unwrap();

        assert_eq!(graph.out_degree(a), Ok(1));
        assert_eq!(graph.in_degree(a), Ok(1));
        assert_eq!(graph.degree(b), Ok(1));
    }

    #[test]
    fn test_edge_to_stale_node_rejected() {
        let mut graph = Graph::new(true);
        let a = graph.add_node();
        let b = graph.add_node();
        graph.remove_node(b).unwrap();

        assert_eq!(
            graph.add_edge(a, b).err(),
            Some(DataError::StaleTuple { row: 1 })
        );
    }
}
