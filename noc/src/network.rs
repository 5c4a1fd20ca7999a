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

use crate::{
    Cycle, Direction, Error, Grid, NocConfiguration, Packet, PacketSink, Router, RouterId,
    RoutingAlgorithm, Topology, TrafficSource,
};

/// Outcome of one simulated cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleStatus {
    /// Packets are still in flight, or more will be injected.
    Busy,
    /// Every buffer is empty and the traffic source is exhausted. The send and
    /// commit passes were skipped.
    Drained,
}

/// The routers of a mesh, stored in an arena indexed by [`RouterId`].
#[derive(Debug)]
pub struct Network {
    grid: Grid,
    algorithm: RoutingAlgorithm,
    routers: Vec<Router>,
    injected: usize,
    delivered: usize,
}

impl Network {
    /// Build the mesh in two passes: create every router, then connect each
    /// one to its neighbors and set up its strategy.
    pub fn new(config: &NocConfiguration) -> Result<Self, Error> {
        config.validate()?;
        let grid = config.grid()?;
        let topology = Topology::mesh(grid);
        let mut routers: Vec<Router> = (0..grid.num_routers())
            .map(|id| {
                Router::new(
                    id,
                    grid.coordinate(id),
                    config.buffer_size(),
                    config.algorithm.strategy(config.side_buffer_size),
                )
            })
            .collect();
        for (id, router) in routers.iter_mut().enumerate() {
            let neighbors: Vec<_> = topology
                .neighbors(id)
                .into_iter()
                .map(|neighbor| (neighbor, grid.coordinate(neighbor)))
                .collect();
            router.setup(&neighbors)?;
        }
        log::debug!(
            "{} network of {} routers, buffer size {}",
            config.algorithm,
            routers.len(),
            config.buffer_size()
        );
        Ok(Self {
            grid,
            algorithm: config.algorithm,
            routers,
            injected: 0,
            delivered: 0,
        })
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn algorithm(&self) -> RoutingAlgorithm {
        self.algorithm
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn router(&self, id: RouterId) -> Result<&Router, Error> {
        self.routers.get(id).ok_or(Error::InvalidRouter(id))
    }

    #[cfg(test)]
    pub(crate) fn router_mut(&mut self, id: RouterId) -> &mut Router {
        &mut self.routers[id]
    }

    pub fn packets_injected(&self) -> usize {
        self.injected
    }

    pub fn packets_delivered(&self) -> usize {
        self.delivered
    }

    /// Packets held in router buffers, side buffers included.
    pub fn packets_in_flight(&self) -> usize {
        self.routers.iter().map(Router::packets_held).sum()
    }

    /// No packet is held anywhere in the mesh.
    pub fn is_drained(&self) -> bool {
        self.routers.iter().all(Router::is_drained)
    }

    /// Put `packet` in the local port of its source router. A packet addressed
    /// to its own source is delivered right away.
    pub fn inject(
        &mut self,
        packet: Packet,
        cycle: Cycle,
        sink: &mut (impl PacketSink + ?Sized),
    ) -> Result<(), Error> {
        let source = packet.source();
        if !self.grid.contains(packet.destination()) {
            return Err(Error::InvalidDestination(packet.destination()));
        }
        let destination = self.grid.id(packet.destination());
        let router = self
            .routers
            .get_mut(source)
            .ok_or(Error::InvalidRouter(source))?;
        self.injected += 1;
        if destination == source {
            let mut packet = packet;
            packet.visit(source, router.coordinate());
            packet.finish(cycle);
            log::debug!("router {}: packet to itself delivered at injection", source);
            self.delivered += 1;
            sink.store(packet);
        } else {
            log::trace!("router {}: injected packet to {}", source, destination);
            router.inject(packet);
        }
        Ok(())
    }

    /// Simulate one cycle: inject, then let every router send, then commit
    /// every router.
    ///
    /// No router commits before all routers have sent, so a packet moves at
    /// most one hop per cycle whatever the order of the routers.
    pub fn simulate_one_cycle<T, S>(
        &mut self,
        cycle: Cycle,
        source: &mut T,
        sink: &mut S,
    ) -> CycleStatus
    where
        T: TrafficSource + ?Sized,
        S: PacketSink + ?Sized,
    {
        self.inject_phase(cycle, source, sink);
        if source.is_exhausted(cycle) && self.is_drained() {
            return CycleStatus::Drained;
        }
        self.send_phase(cycle, sink);
        self.commit_phase();
        CycleStatus::Busy
    }

    fn inject_phase<T, S>(&mut self, cycle: Cycle, source: &mut T, sink: &mut S)
    where
        T: TrafficSource + ?Sized,
        S: PacketSink + ?Sized,
    {
        for id in 0..self.routers.len() {
            let local_port_empty = self.routers[id].buffer(Direction::Local).is_empty();
            for packet in source.generate(id, cycle, local_port_empty) {
                if let Err(e) = self.inject(packet, cycle, sink) {
                    log::warn!("dropping generated packet: {}", e);
                }
            }
        }
    }

    fn send_phase<S: PacketSink + ?Sized>(&mut self, cycle: Cycle, sink: &mut S) {
        // Contention between routers sending to the same buffer is resolved by
        // this iteration order: the lower id wins the free slot.
        for id in 0..self.routers.len() {
            self.send(id, cycle, sink);
        }
    }

    /// Let router `id` move the head packet of its scheduled port one hop.
    fn send<S: PacketSink + ?Sized>(&mut self, id: RouterId, cycle: Cycle, sink: &mut S) {
        let port = self.routers[id].schedule();
        let direction = match self.routers[id].buffer(port).peek() {
            Some(packet) => self.routers[id].arbitrate(&self.routers, packet),
            None => return,
        };
        log::trace!("cycle {}: router {} serves {} toward {}", cycle, id, port, direction);

        if direction.is_local() {
            let mut packet = self.routers[id].take(port);
            packet.finish(cycle);
            log::debug!(
                "cycle {}: packet from {} delivered at router {} in {} cycles",
                cycle,
                packet.source(),
                id,
                packet.cycles_taken()
            );
            self.delivered += 1;
            sink.store(packet);
            return;
        }

        let next = match self.routers[id].neighbor(direction) {
            Some(next) => next,
            None => {
                log::warn!(
                    "cycle {}: router {} has no link {}, packet stalls",
                    cycle,
                    id,
                    direction
                );
                return;
            }
        };
        let packet = self.routers[id].take(port);
        if let Err(packet) = self.routers[next].receive(packet, id) {
            log::trace!("cycle {}: router {} is full, router {} stalls", cycle, next, id);
            self.routers[id].block(port, packet);
        }
    }

    fn commit_phase(&mut self) {
        for router in self.routers.iter_mut() {
            router.commit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, ScriptedTraffic};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn construction() {
        init();
        let config = NocConfiguration::new(3, 4, RoutingAlgorithm::Elra);
        let network = Network::new(&config).unwrap();
        assert_eq!(network.routers().len(), 12);
        let router = network.router(5).unwrap();
        assert_eq!(router.coordinate(), Coordinate::new(1, 1));
        assert_eq!(router.neighbor(Direction::North), Some(1));
        assert_eq!(router.neighbor(Direction::East), Some(6));
        assert_eq!(router.neighbor(Direction::South), Some(9));
        assert_eq!(router.neighbor(Direction::West), Some(4));
        assert_eq!(router.buffer(Direction::East).capacity(), Some(8));
        assert_eq!(router.buffer(Direction::Local).capacity(), None);
        assert_eq!(network.router(12).err(), Some(Error::InvalidRouter(12)));

        let config = NocConfiguration::new(0, 4, RoutingAlgorithm::Xy);
        assert!(Network::new(&config).is_err());
    }

    #[test]
    fn one_hop_per_cycle() {
        init();
        let config = NocConfiguration::new(1, 3, RoutingAlgorithm::Xy);
        let mut network = Network::new(&config).unwrap();
        let mut traffic = ScriptedTraffic::new(network.grid()).with(0, 0, 2);
        let mut sink: Vec<Packet> = Vec::new();

        // Round-robin visits empty ports too: router 0 serves its local port
        // at cycle 2, router 1 its west port at cycle 5 and router 2 its west
        // port at cycle 7.
        for cycle in 0..7 {
            let status = network.simulate_one_cycle(cycle, &mut traffic, &mut sink);
            assert_eq!(status, CycleStatus::Busy);
            assert!(sink.is_empty());
            assert_eq!(network.packets_in_flight(), 1);
        }
        assert_eq!(
            network.router(1).unwrap().buffer(Direction::West).len(),
            0
        );
        network.simulate_one_cycle(7, &mut traffic, &mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].path_trace(), &[0, 1, 2]);
        assert_eq!(sink[0].cycles_taken(), 7);
        assert_eq!(
            network.simulate_one_cycle(8, &mut traffic, &mut sink),
            CycleStatus::Drained
        );
        assert_eq!(network.packets_injected(), 1);
        assert_eq!(network.packets_delivered(), 1);
    }

    #[test]
    fn self_addressed_packets() {
        let config = NocConfiguration::new(2, 2, RoutingAlgorithm::Adaptive);
        let mut network = Network::new(&config).unwrap();
        let mut sink: Vec<Packet> = Vec::new();
        let packet = Packet::new(0, Coordinate::new(0, 0), Coordinate::new(0, 0), 7);
        network.inject(packet, 7, &mut sink).unwrap();
        assert_eq!(sink[0].cycles_taken(), 0);
        assert_eq!(sink[0].path_trace(), &[0]);
        assert!(network.is_drained());

        let stray = Packet::new(0, Coordinate::new(0, 0), Coordinate::new(5, 5), 7);
        assert_eq!(
            network.inject(stray, 7, &mut sink),
            Err(Error::InvalidDestination(Coordinate::new(5, 5)))
        );
    }
}
