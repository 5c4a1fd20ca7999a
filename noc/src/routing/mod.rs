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

//! Routing strategies.
//!
//! A strategy decides, for one router, which input port is served in a cycle
//! (scheduling) and where the head packet of that port goes (arbitration).
//! Strategies that keep extra state also hook into blocked sends and into the
//! commit pass.

pub mod adaptive;
pub mod congestion_aware;
pub mod elra;
pub mod modified_xy;
pub mod xy;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::router::RouterCore;
use crate::{Direction, Error, Packet, Router, NUM_PORTS};

pub use adaptive::Adaptive;
pub use congestion_aware::CongestionAware;
pub use elra::Elra;
pub use modified_xy::ModifiedXy;
pub use xy::Xy;

/// The per-router behavior of a routing algorithm.
pub trait Routing {
    /// Called once, after the router's neighbors are known.
    fn setup(&mut self, _router: &RouterCore) {}

    /// Input port to serve this cycle.
    fn schedule(&mut self, router: &RouterCore) -> Direction;

    /// Output direction for `packet`. May inspect the other routers of the
    /// mesh, which are not modified during the send pass.
    fn arbitrate(&self, router: &RouterCore, mesh: &[Router], packet: &Packet) -> Direction;

    /// The packet taken from `port` could not be delivered downstream.
    /// Returning it puts it back at the head of `port`.
    fn on_blocked(
        &mut self,
        _router: &RouterCore,
        _port: Direction,
        packet: Packet,
    ) -> Option<Packet> {
        Some(packet)
    }

    /// Runs in the commit pass, before the router's buffers are latched.
    fn prepare_commit(&mut self, _router: &mut RouterCore) {}

    /// Packets held by the strategy outside the router's buffers.
    fn packets_held(&self) -> usize {
        0
    }
}

/// A router's routing strategy.
#[derive(Debug)]
pub enum Strategy {
    Xy(Xy),
    ModifiedXy(ModifiedXy),
    Adaptive(Adaptive),
    Elra(Elra),
    CongestionAware(CongestionAware),
}

impl Strategy {
    fn routing(&self) -> &dyn Routing {
        match self {
            Strategy::Xy(s) => s,
            Strategy::ModifiedXy(s) => s,
            Strategy::Adaptive(s) => s,
            Strategy::Elra(s) => s,
            Strategy::CongestionAware(s) => s,
        }
    }

    fn routing_mut(&mut self) -> &mut dyn Routing {
        match self {
            Strategy::Xy(s) => s,
            Strategy::ModifiedXy(s) => s,
            Strategy::Adaptive(s) => s,
            Strategy::Elra(s) => s,
            Strategy::CongestionAware(s) => s,
        }
    }

    pub fn algorithm(&self) -> RoutingAlgorithm {
        match self {
            Strategy::Xy(_) => RoutingAlgorithm::Xy,
            Strategy::ModifiedXy(_) => RoutingAlgorithm::ModifiedXy,
            Strategy::Adaptive(_) => RoutingAlgorithm::Adaptive,
            Strategy::Elra(_) => RoutingAlgorithm::Elra,
            Strategy::CongestionAware(_) => RoutingAlgorithm::CongestionAware,
        }
    }

    pub(crate) fn setup(&mut self, router: &RouterCore) {
        self.routing_mut().setup(router)
    }

    pub(crate) fn schedule(&mut self, router: &RouterCore) -> Direction {
        self.routing_mut().schedule(router)
    }

    pub(crate) fn arbitrate(
        &self,
        router: &RouterCore,
        mesh: &[Router],
        packet: &Packet,
    ) -> Direction {
        self.routing().arbitrate(router, mesh, packet)
    }

    pub(crate) fn on_blocked(
        &mut self,
        router: &RouterCore,
        port: Direction,
        packet: Packet,
    ) -> Option<Packet> {
        self.routing_mut().on_blocked(router, port, packet)
    }

    pub(crate) fn prepare_commit(&mut self, router: &mut RouterCore) {
        self.routing_mut().prepare_commit(router)
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.packets_held() == 0
    }

    pub(crate) fn packets_held(&self) -> usize {
        self.routing().packets_held()
    }
}

/// The routing algorithms a network can be built with.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingAlgorithm {
    Xy,
    ModifiedXy,
    Adaptive,
    Elra,
    CongestionAware,
}

impl RoutingAlgorithm {
    pub const ALL: [RoutingAlgorithm; 5] = [
        RoutingAlgorithm::Xy,
        RoutingAlgorithm::ModifiedXy,
        RoutingAlgorithm::Adaptive,
        RoutingAlgorithm::Elra,
        RoutingAlgorithm::CongestionAware,
    ];

    /// Capacity of the mesh-facing input buffers when none is configured.
    pub fn default_buffer_size(self) -> usize {
        match self {
            RoutingAlgorithm::ModifiedXy => 1,
            RoutingAlgorithm::CongestionAware => 4,
            _ => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RoutingAlgorithm::Xy => "xy",
            RoutingAlgorithm::ModifiedXy => "modified-xy",
            RoutingAlgorithm::Adaptive => "adaptive",
            RoutingAlgorithm::Elra => "elra",
            RoutingAlgorithm::CongestionAware => "congestion-aware",
        }
    }

    /// A fresh per-router strategy.
    pub fn strategy(self, side_buffer_size: usize) -> Strategy {
        match self {
            RoutingAlgorithm::Xy => Strategy::Xy(Xy),
            RoutingAlgorithm::ModifiedXy => {
                Strategy::ModifiedXy(ModifiedXy::new(side_buffer_size))
            }
            RoutingAlgorithm::Adaptive => Strategy::Adaptive(Adaptive),
            RoutingAlgorithm::Elra => Strategy::Elra(Elra::default()),
            RoutingAlgorithm::CongestionAware => Strategy::CongestionAware(CongestionAware),
        }
    }
}

impl Default for RoutingAlgorithm {
    fn default() -> Self {
        RoutingAlgorithm::Xy
    }
}

impl FromStr for RoutingAlgorithm {
    type Err = Error;

    /// Accepts the algorithm names and the numeric codes 0..=4.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        match name.as_str() {
            "xy" | "0" => Ok(RoutingAlgorithm::Xy),
            "modified-xy" | "modxy" | "1" => Ok(RoutingAlgorithm::ModifiedXy),
            "adaptive" | "2" => Ok(RoutingAlgorithm::Adaptive),
            "elra" | "3" => Ok(RoutingAlgorithm::Elra),
            "congestion-aware" | "ca" | "4" => Ok(RoutingAlgorithm::CongestionAware),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for RoutingAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

/// Base scheduler: the next connected port after the one served last, wrapping
/// around to the local port.
pub(crate) fn round_robin(router: &RouterCore) -> Direction {
    (router.serving_port().index() + 1..NUM_PORTS)
        .filter_map(|index| Direction::try_from(index).ok())
        .find(|port| router.is_connected(*port))
        .unwrap_or(Direction::Local)
}

/// Round-robin over the ports with a packet to send this cycle. Stays on the
/// current port when there is none.
pub(crate) fn round_robin_sendable(router: &RouterCore) -> Direction {
    let current = router.serving_port().index();
    (1..=NUM_PORTS)
        .filter_map(|offset| Direction::try_from((current + offset) % NUM_PORTS).ok())
        .find(|port| router.buffer(*port).peek().is_some())
        .unwrap_or_else(|| router.serving_port())
}
