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

//! A cycle-accurate simulator of a 2-D mesh network-on-chip.
//!
//! Every router owns five input buffers (local + N/E/S/W) and moves at most one
//! packet per cycle. A cycle is simulated in two global passes: all routers
//! first attempt to send, and only then do all routers commit their buffer
//! state for the next cycle. See [`Network::simulate_one_cycle`].

mod buffer;
mod config;
mod error;
mod network;
mod packet;
mod ports;
mod router;
mod routing;
mod sim;
mod stats;
mod topology;
mod traffic;

// type to use for cycles
pub type Cycle = usize;

/// Dense router index: `row * columns + column`.
pub type RouterId = usize;

pub use crate::buffer::PortBuffer;
pub use crate::config::{NocConfiguration, DEFAULT_SIDE_BUFFER_SIZE};
pub use crate::error::Error;
pub use crate::network::{CycleStatus, Network};
pub use crate::packet::Packet;
pub use crate::ports::{Direction, DIRECTIONS, NUM_PORTS};
pub use crate::router::{Router, RouterCore};
pub use crate::routing::adaptive::{busy_signal, congested_signal};
pub use crate::routing::congestion_aware::busy_index;
pub use crate::routing::elra::PortStatus;
pub use crate::routing::{
    Adaptive, CongestionAware, Elra, ModifiedXy, Routing, RoutingAlgorithm, Strategy, Xy,
};
pub use crate::sim::{simulate, SimulationReport};
pub use crate::stats::{PacketSink, Receivers};
pub use crate::topology::{Coordinate, Grid, Topology};
pub use crate::traffic::{ConstantTraffic, RandomTraffic, ScriptedTraffic, TrafficSource};
