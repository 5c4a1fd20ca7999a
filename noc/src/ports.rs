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

use std::cmp::Ordering;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Number of ports on every router: local injection plus the four mesh links.
pub const NUM_PORTS: usize = 5;

/// A router port, named by the neighbor it faces.
///
/// The discriminants are the port indices used throughout the simulator.
/// `Local` is the only direction that does not move a packet: a packet routed
/// to `Local` has reached its destination.
#[derive(Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Local = 0,
    North = 1,
    East = 2,
    South = 3,
    West = 4,
}

pub const DIRECTIONS: [Direction; NUM_PORTS] = [
    Direction::Local,
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

impl Direction {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_local(self) -> bool {
        self == Direction::Local
    }

    /// The port on the far side of a link leaving through `self`.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Local => Direction::Local,
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Dimension-order direction from `from` toward `to`: columns are resolved
    /// before rows. Returns `Local` when the coordinates are equal.
    ///
    /// Also used at setup to find which port faces an adjacent router.
    pub fn toward(from: Coordinate, to: Coordinate) -> Direction {
        match to.col.cmp(&from.col) {
            Ordering::Greater => Direction::East,
            Ordering::Less => Direction::West,
            Ordering::Equal => match to.row.cmp(&from.row) {
                Ordering::Greater => Direction::South,
                Ordering::Less => Direction::North,
                Ordering::Equal => Direction::Local,
            },
        }
    }
}

impl From<Direction> for usize {
    fn from(direction: Direction) -> usize {
        direction as usize
    }
}

impl TryFrom<usize> for Direction {
    type Error = usize;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        DIRECTIONS.get(index).copied().ok_or(index)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let name = match self {
            Direction::Local => "local",
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        name.fmt(f)
    }
}
