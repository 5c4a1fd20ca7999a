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

use std::str::FromStr;

use noc::RoutingAlgorithm;

// Single injects one packet along each diagonal of the mesh.
// Random injects uniformly random traffic during the load cycles.
// Constant keeps every local port busy during the load cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrafficMode {
    Single,
    Random,
    Constant,
}

impl FromStr for TrafficMode {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(TrafficMode::Single),
            "random" => Ok(TrafficMode::Random),
            "constant" => Ok(TrafficMode::Constant),
            _ => Err(Self::Err::new(
                std::io::ErrorKind::Other,
                format!("Invalid traffic mode: {}", s),
            )),
        }
    }
}

// Either one routing algorithm or all of them, fed the same traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmChoice {
    One(RoutingAlgorithm),
    All,
}

impl AlgorithmChoice {
    pub fn algorithms(self) -> Vec<RoutingAlgorithm> {
        match self {
            AlgorithmChoice::One(algorithm) => vec![algorithm],
            AlgorithmChoice::All => RoutingAlgorithm::ALL.to_vec(),
        }
    }
}

impl FromStr for AlgorithmChoice {
    type Err = noc::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "5" => Ok(AlgorithmChoice::All),
            _ => s.parse().map(AlgorithmChoice::One),
        }
    }
}
