use std::{collections::HashMap, io::Read, path::Path};

use kdtree::KdTree;
use kdtree::distance::squared_euclidean;
use petgraph::{
    algo::{astar, dijkstra},
    graph::{EdgeReference, NodeIndex, UnGraph},
};

use crate::{
    geodesy::{haversine_m, is_valid_coordinate},
    graph::GraphFile,
    models::{Coordinate, ElevatedPoint},
};

/// Origins farther than this from every node are considered off the network.
pub const MAX_SNAP_DISTANCE_M: f64 = 20_000.0;

/// Index neighbours re-ranked by great-circle distance when snapping.
const SNAP_CANDIDATES: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("failed to read graph file: {0}")]
    Io(#[from] std::io::Error),
    #[error("graph is empty")]
    EmptyGraph,
    #[error("edge references unknown node {0}")]
    MissingNode(u64),
    #[error("edge {from} -> {to} has invalid length {length_m}")]
    InvalidLength { from: u64, to: u64, length_m: f64 },
    #[error("node {id} has invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { id: u64, lat: f64, lon: f64 },
}

#[derive(Clone, Debug)]
struct NodeData {
    coord: Coordinate,
    elevation: Option<f64>,
}

#[derive(Clone, Debug)]
struct EdgeData {
    length_m: f64,
}

/// Weighted road graph with a k-d tree for nearest-node lookup.
///
/// Built once per area by the caller and shared read-only between requests.
#[derive(Clone)]
pub struct RoadNetwork {
    graph: UnGraph<NodeData, EdgeData>,
    spatial_index: KdTree<f64, usize, [f64; 2]>,
}

impl RoadNetwork {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let graph_file = GraphFile::read_from_path(path)?;
        Self::from_graph_file(graph_file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, GraphError> {
        let graph_file = GraphFile::read_json(reader)?;
        Self::from_graph_file(graph_file)
    }

    pub fn from_graph_file(graph_file: GraphFile) -> Result<Self, GraphError> {
        if graph_file.nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }
        let mut graph = UnGraph::with_capacity(graph_file.nodes.len(), graph_file.edges.len());
        let mut id_to_index = HashMap::with_capacity(graph_file.nodes.len());

        for node in graph_file.nodes {
            let coord = Coordinate {
                lat: node.lat,
                lon: node.lon,
            };
            if !is_valid_coordinate(coord) {
                return Err(GraphError::InvalidCoordinate {
                    id: node.id,
                    lat: node.lat,
                    lon: node.lon,
                });
            }
            let idx = graph.add_node(NodeData {
                coord,
                elevation: node.elevation,
            });
            id_to_index.insert(node.id, idx);
        }

        for edge in graph_file.edges {
            let from = *id_to_index
                .get(&edge.from)
                .ok_or(GraphError::MissingNode(edge.from))?;
            let to = *id_to_index
                .get(&edge.to)
                .ok_or(GraphError::MissingNode(edge.to))?;
            if !edge.length_m.is_finite() || edge.length_m < 0.0 {
                return Err(GraphError::InvalidLength {
                    from: edge.from,
                    to: edge.to,
                    length_m: edge.length_m,
                });
            }
            graph.update_edge(
                from,
                to,
                EdgeData {
                    length_m: edge.length_m,
                },
            );
        }

        let spatial_index = Self::build_spatial_index(&graph)?;
        tracing::debug!(
            "road network ready: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Self {
            graph,
            spatial_index,
        })
    }

    fn build_spatial_index(
        graph: &UnGraph<NodeData, EdgeData>,
    ) -> Result<KdTree<f64, usize, [f64; 2]>, GraphError> {
        let mut tree = KdTree::new(2);
        for idx in graph.node_indices() {
            let coord = graph[idx].coord;
            tree.add(project(coord), idx.index())
                .map_err(|_| GraphError::InvalidCoordinate {
                    id: idx.index() as u64,
                    lat: coord.lat,
                    lon: coord.lon,
                })?;
        }
        Ok(tree)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn coordinate(&self, node: NodeIndex) -> Coordinate {
        self.graph[node].coord
    }

    pub fn elevation(&self, node: NodeIndex) -> Option<f64> {
        self.graph[node].elevation
    }

    /// Nearest node to `target` on the ground, or `None` when it lies beyond
    /// [`MAX_SNAP_DISTANCE_M`].
    ///
    /// The index is only approximately metric, so its closest few entries are
    /// re-ranked with the haversine distance.
    pub fn closest_node(&self, target: Coordinate) -> Option<NodeIndex> {
        let nearest = self
            .spatial_index
            .nearest(&project(target), SNAP_CANDIDATES, &squared_euclidean)
            .ok()?;

        let (distance_m, node) = nearest
            .into_iter()
            .map(|(_, &idx)| {
                let node = NodeIndex::new(idx);
                (haversine_m(target, self.coordinate(node)), node)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.index().cmp(&b.1.index())))?;

        (distance_m <= MAX_SNAP_DISTANCE_M).then_some(node)
    }

    /// Dijkstra over edge lengths from `source` to every reachable node,
    /// ordered by node index.
    pub fn shortest_path_lengths(&self, source: NodeIndex) -> Vec<(NodeIndex, f64)> {
        let lengths = dijkstra(&self.graph, source, None, |edge: EdgeReference<EdgeData>| {
            edge.weight().length_m
        });
        let mut lengths: Vec<(NodeIndex, f64)> = lengths.into_iter().collect();
        lengths.sort_by_key(|(node, _)| node.index());
        lengths
    }

    /// Shortest path between two nodes and its length in meters.
    ///
    /// Edge lengths are road lengths and may undercut the straight-line
    /// distance between their ends, so no distance heuristic is admissible.
    /// The search runs uninformed and agrees with
    /// [`RoadNetwork::shortest_path_lengths`].
    pub fn shortest_path(&self, from: NodeIndex, to: NodeIndex) -> Option<(f64, Vec<NodeIndex>)> {
        astar(
            &self.graph,
            from,
            |finish| finish == to,
            |edge: EdgeReference<EdgeData>| edge.weight().length_m,
            |_| 0.0,
        )
    }

    pub fn path_coordinates(&self, path: &[NodeIndex]) -> Vec<Coordinate> {
        path.iter().map(|&node| self.coordinate(node)).collect()
    }

    /// Vertical profile of `path`, or `None` if any node lacks an elevation.
    pub fn path_profile(&self, path: &[NodeIndex]) -> Option<Vec<ElevatedPoint>> {
        path.iter()
            .map(|&node| {
                self.elevation(node).map(|elevation| ElevatedPoint {
                    coord: self.coordinate(node),
                    elevation,
                })
            })
            .collect()
    }
}

/// Equirectangular projection in degrees: longitude scaled by the cosine of
/// latitude so both axes shrink alike towards the poles.
fn project(coord: Coordinate) -> [f64; 2] {
    [coord.lon * coord.lat.to_radians().cos(), coord.lat]
}
