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

use std::fmt;

use crate::{Coordinate, Direction, RouterId};

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    InvalidGrid { rows: usize, columns: usize },
    InvalidBufferSize(usize),
    InvalidRouter(RouterId),
    /// A packet addressed to a position outside of the mesh.
    InvalidDestination(Coordinate),
    NotAdjacent(RouterId, RouterId),
    DuplicateNeighbor(RouterId, Direction),
    UnknownAlgorithm(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidGrid { rows, columns } => {
                write!(f, "ERROR: Invalid {}x{} mesh", rows, columns)
            }
            Self::InvalidBufferSize(size) => {
                write!(f, "ERROR: Invalid buffer size {}", size)
            }
            Self::InvalidRouter(id) => write!(f, "ERROR: Invalid router {}", id),
            Self::InvalidDestination(coordinate) => {
                write!(f, "ERROR: Destination {} outside of the mesh", coordinate)
            }
            Self::NotAdjacent(id, neighbor) => {
                write!(
                    f,
                    "ERROR: Router {} is not adjacent to router {}",
                    neighbor, id
                )
            }
            Self::DuplicateNeighbor(id, direction) => {
                write!(
                    f,
                    "ERROR: Router {} has more than one neighbor on port {:?}",
                    id, direction
                )
            }
            Self::UnknownAlgorithm(name) => {
                write!(f, "ERROR: Unknown routing algorithm: {}", name)
            }
        }
    }
}

// Needed so that `anyhow::Result` accepts our definition of errors in the
// configuration loader and the simulator front-end.
impl std::error::Error for Error {}
