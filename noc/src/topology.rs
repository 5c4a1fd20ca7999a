// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Mesh geometry: coordinates, router ids and the grid graph used to wire
//! routers to their neighbors.

use std::fmt;

use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::{Error, RouterId};

/// A grid position. Used both as router identity and as packet destination.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
}

impl Coordinate {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance, i.e. the minimal number of hops between two routers.
    pub fn distance(self, other: Coordinate) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Size of a rows x columns mesh and the id <-> coordinate mapping.
///
/// Ids are dense, row-major: `id = row * columns + col`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Grid {
    rows: usize,
    columns: usize,
}

impl Grid {
    pub fn new(rows: usize, columns: usize) -> Result<Self, Error> {
        if rows == 0 || columns == 0 {
            return Err(Error::InvalidGrid { rows, columns });
        }
        Ok(Self { rows, columns })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn num_routers(&self) -> usize {
        self.rows * self.columns
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        coordinate.row < self.rows && coordinate.col < self.columns
    }

    pub fn id(&self, coordinate: Coordinate) -> RouterId {
        assert!(
            self.contains(coordinate),
            "coordinate {} outside of the {}x{} mesh",
            coordinate,
            self.rows,
            self.columns
        );
        coordinate.row * self.columns + coordinate.col
    }

    pub fn coordinate(&self, id: RouterId) -> Coordinate {
        assert!(id < self.num_routers(), "router {} outside of the mesh", id);
        Coordinate::new(id / self.columns, id % self.columns)
    }
}

/// A 2D grid graph; node `i` of the graph is router `i`.
///
/// <pre>
/// x --- x --- x --- x   ^
/// |     |     |     |   |
/// x --- x --- x --- x   rows
/// |     |     |     |   |
/// x --- x --- x --- x   v
/// < ---- columns --->
/// </pre>
pub struct Topology {
    grid: Grid,
    graph: UnGraph<Coordinate, ()>,
}

impl Topology {
    pub fn mesh(grid: Grid) -> Self {
        let mut graph = UnGraph::with_capacity(grid.num_routers(), 2 * grid.num_routers());
        for id in 0..grid.num_routers() {
            let node = graph.add_node(grid.coordinate(id));
            debug_assert_eq!(node.index(), id);
        }

        // for each router, add the links to its east and south neighbors.
        for (row, col) in (0..grid.rows()).cartesian_product(0..grid.columns()) {
            let src = NodeIndex::new(grid.id(Coordinate::new(row, col)));
            if col + 1 < grid.columns() {
                let east = grid.id(Coordinate::new(row, col + 1));
                graph.add_edge(src, NodeIndex::new(east), ());
            }
            if row + 1 < grid.rows() {
                let south = grid.id(Coordinate::new(row + 1, col));
                graph.add_edge(src, NodeIndex::new(south), ());
            }
        }
        log::debug!(
            "mesh {}x{}: {} routers, {} links",
            grid.rows(),
            grid.columns(),
            graph.node_count(),
            graph.edge_count()
        );
        Self { grid, graph }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Number of bidirectional links.
    pub fn num_links(&self) -> usize {
        self.graph.edge_count()
    }

    /// Ids of the routers adjacent to `id`, in increasing order.
    pub fn neighbors(&self, id: RouterId) -> Vec<RouterId> {
        self.graph
            .neighbors(NodeIndex::new(id))
            .map(|n| n.index())
            .sorted()
            .collect()
    }
}
