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

//! Packet generators feeding the local ports of the routers.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::{Cycle, Grid, Packet, RouterId};

/// A generator of packets, queried once per router and per cycle during the
/// injection phase.
pub trait TrafficSource {
    /// Packets that `router` injects at `cycle`. `local_port_empty` tells
    /// whether the router's local port holds no packet.
    fn generate(&mut self, router: RouterId, cycle: Cycle, local_port_empty: bool)
        -> Vec<Packet>;

    /// No packet will be generated at `cycle` or later.
    fn is_exhausted(&self, cycle: Cycle) -> bool;

    /// Number of packets generated so far.
    fn packets_sent(&self) -> usize;
}

fn packet(grid: &Grid, source: RouterId, destination: RouterId, cycle: Cycle) -> Packet {
    Packet::new(
        source,
        grid.coordinate(source),
        grid.coordinate(destination),
        cycle,
    )
}

/// A fixed list of `(cycle, source, destination)` injections.
#[derive(Debug)]
pub struct ScriptedTraffic {
    grid: Grid,
    injections: Vec<(Cycle, RouterId, RouterId)>,
    sent: usize,
}

impl ScriptedTraffic {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            injections: Vec::new(),
            sent: 0,
        }
    }

    /// Adds an injection. Panics if either router is outside of the grid.
    pub fn with(mut self, cycle: Cycle, source: RouterId, destination: RouterId) -> Self {
        let routers = self.grid.num_routers();
        assert!(source < routers, "source {} outside of the mesh", source);
        assert!(
            destination < routers,
            "destination {} outside of the mesh",
            destination
        );
        self.injections.push((cycle, source, destination));
        self
    }

    /// The functional test: one packet across each diagonal, from the top-left
    /// corner to the bottom-right one and from the top-right corner to the
    /// bottom-left one.
    pub fn corner_to_corner(grid: Grid) -> Self {
        let last = grid.num_routers() - 1;
        let top_right = grid.columns() - 1;
        let bottom_left = (grid.rows() - 1) * grid.columns();
        Self::new(grid)
            .with(0, 0, last)
            .with(0, top_right, bottom_left)
    }
}

impl TrafficSource for ScriptedTraffic {
    fn generate(
        &mut self,
        router: RouterId,
        cycle: Cycle,
        _local_port_empty: bool,
    ) -> Vec<Packet> {
        let packets: Vec<Packet> = self
            .injections
            .iter()
            .filter(|&&(at, source, _)| at == cycle && source == router)
            .map(|&(at, source, destination)| packet(&self.grid, source, destination, at))
            .collect();
        self.sent += packets.len();
        packets
    }

    fn is_exhausted(&self, cycle: Cycle) -> bool {
        self.injections.iter().all(|&(at, _, _)| at < cycle)
    }

    fn packets_sent(&self) -> usize {
        self.sent
    }
}

/// Uniform random traffic: during the load phase every router injects, with
/// probability `1 / rate` per cycle, one packet to another random router.
#[derive(Debug)]
pub struct RandomTraffic {
    grid: Grid,
    probability: f64,
    load_cycles: Cycle,
    seed: u64,
    rng: Xoshiro256StarStar,
    sent: usize,
}

impl RandomTraffic {
    /// The greater the `rate`, the less likely a router injects a packet.
    pub fn new(grid: Grid, rate: f64, load_cycles: Cycle, seed: u64) -> Self {
        assert!(rate > 0.0, "the injection rate must be positive, got {}", rate);
        Self {
            grid,
            probability: (1.0 / rate).min(1.0),
            load_cycles,
            seed,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            sent: 0,
        }
    }

    /// Restart the random stream, so that several networks can be fed the
    /// same traffic.
    pub fn soft_reset(&mut self) {
        self.rng = Xoshiro256StarStar::seed_from_u64(self.seed);
        self.sent = 0;
    }
}

impl TrafficSource for RandomTraffic {
    fn generate(
        &mut self,
        router: RouterId,
        cycle: Cycle,
        _local_port_empty: bool,
    ) -> Vec<Packet> {
        let routers = self.grid.num_routers();
        if cycle >= self.load_cycles || routers < 2 {
            return Vec::new();
        }
        if !self.rng.gen_bool(self.probability) {
            return Vec::new();
        }
        // pick among the other routers
        let mut destination = self.rng.gen_range(0..routers - 1);
        if destination >= router {
            destination += 1;
        }
        self.sent += 1;
        vec![packet(&self.grid, router, destination, cycle)]
    }

    fn is_exhausted(&self, cycle: Cycle) -> bool {
        cycle >= self.load_cycles
    }

    fn packets_sent(&self) -> usize {
        self.sent
    }
}

/// Saturating traffic: during the load phase every router with an empty local
/// port sends a packet to its mirror router, `N - 1 - id`.
#[derive(Debug)]
pub struct ConstantTraffic {
    grid: Grid,
    load_cycles: Cycle,
    sent: usize,
}

impl ConstantTraffic {
    pub fn new(grid: Grid, load_cycles: Cycle) -> Self {
        Self {
            grid,
            load_cycles,
            sent: 0,
        }
    }
}

impl TrafficSource for ConstantTraffic {
    fn generate(
        &mut self,
        router: RouterId,
        cycle: Cycle,
        local_port_empty: bool,
    ) -> Vec<Packet> {
        let mirror = self.grid.num_routers() - 1 - router;
        if cycle >= self.load_cycles || !local_port_empty || mirror == router {
            return Vec::new();
        }
        self.sent += 1;
        vec![packet(&self.grid, router, mirror, cycle)]
    }

    fn is_exhausted(&self, cycle: Cycle) -> bool {
        cycle >= self.load_cycles
    }

    fn packets_sent(&self) -> usize {
        self.sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_injections() {
        let grid = Grid::new(3, 3).unwrap();
        let mut traffic = ScriptedTraffic::corner_to_corner(grid).with(4, 1, 7);
        assert!(!traffic.is_exhausted(4));
        assert!(traffic.is_exhausted(5));

        let packets = traffic.generate(2, 0, true);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].source(), 2);
        assert_eq!(grid.id(packets[0].destination()), 6);
        assert!(traffic.generate(2, 1, true).is_empty());
        assert_eq!(traffic.generate(1, 4, false).len(), 1);
        assert_eq!(traffic.packets_sent(), 2);
    }

    #[test]
    fn random_traffic_is_reproducible() {
        let grid = Grid::new(4, 4).unwrap();
        let mut traffic = RandomTraffic::new(grid, 2.0, 10, 7);
        let run = |traffic: &mut RandomTraffic| {
            let mut trace = vec![];
            for cycle in 0..12 {
                for router in 0..grid.num_routers() {
                    for packet in traffic.generate(router, cycle, true) {
                        assert_eq!(packet.source(), router);
                        assert_ne!(grid.id(packet.destination()), router);
                        assert!(cycle < 10);
                        trace.push((cycle, router, packet.destination()));
                    }
                }
            }
            trace
        };
        let first = run(&mut traffic);
        assert_eq!(first.len(), traffic.packets_sent());
        assert!(!first.is_empty());
        traffic.soft_reset();
        assert_eq!(traffic.packets_sent(), 0);
        assert_eq!(run(&mut traffic), first);
    }

    #[test]
    fn rate_one_always_injects() {
        let grid = Grid::new(2, 2).unwrap();
        let mut traffic = RandomTraffic::new(grid, 1.0, 3, 0);
        for cycle in 0..3 {
            assert_eq!(traffic.generate(0, cycle, false).len(), 1);
        }
        assert!(traffic.generate(0, 3, false).is_empty());
    }

    #[test]
    fn constant_traffic_targets_mirror() {
        let grid = Grid::new(3, 3).unwrap();
        let mut traffic = ConstantTraffic::new(grid, 2);
        let packets = traffic.generate(1, 0, true);
        assert_eq!(grid.id(packets[0].destination()), 7);
        // the center router is its own mirror
        assert!(traffic.generate(4, 0, true).is_empty());
        assert!(traffic.generate(0, 1, false).is_empty());
        assert!(traffic.generate(0, 2, true).is_empty());
        assert_eq!(traffic.packets_sent(), 1);
        assert!(traffic.is_exhausted(2));
    }
}
