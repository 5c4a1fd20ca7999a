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
    Coordinate, Direction, Error, Packet, PortBuffer, RouterId, Strategy, DIRECTIONS, NUM_PORTS,
};

/// The state of a router that is shared by every routing strategy: position,
/// links, input buffers and the port being served.
#[derive(Debug)]
pub struct RouterCore {
    id: RouterId,
    coordinate: Coordinate,
    buffers: [PortBuffer; NUM_PORTS],
    /// Neighbor reached through each port. The local port has none.
    neighbors: [Option<RouterId>; NUM_PORTS],
    serving_port: Direction,
}

impl RouterCore {
    fn new(id: RouterId, coordinate: Coordinate, buffer_size: usize) -> Self {
        Self {
            id,
            coordinate,
            buffers: [
                PortBuffer::unbounded(),
                PortBuffer::bounded(buffer_size),
                PortBuffer::bounded(buffer_size),
                PortBuffer::bounded(buffer_size),
                PortBuffer::bounded(buffer_size),
            ],
            neighbors: [None; NUM_PORTS],
            // round-robin starts right after the last port, i.e. at local
            serving_port: Direction::West,
        }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn buffer(&self, port: Direction) -> &PortBuffer {
        &self.buffers[port.index()]
    }

    pub(crate) fn buffer_mut(&mut self, port: Direction) -> &mut PortBuffer {
        &mut self.buffers[port.index()]
    }

    pub fn neighbor(&self, direction: Direction) -> Option<RouterId> {
        self.neighbors[direction.index()]
    }

    /// The local port is always connected; mesh ports only when a neighbor
    /// exists on that side.
    pub fn is_connected(&self, port: Direction) -> bool {
        port.is_local() || self.neighbor(port).is_some()
    }

    pub fn connected_ports(&self) -> impl Iterator<Item = Direction> + '_ {
        DIRECTIONS
            .iter()
            .copied()
            .filter(move |port| self.is_connected(*port))
    }

    /// The input port selected by the scheduler in the current (or last) cycle.
    pub fn serving_port(&self) -> Direction {
        self.serving_port
    }

    /// The port on which packets from `sender` arrive.
    pub fn port_facing(&self, sender: RouterId) -> Option<Direction> {
        DIRECTIONS
            .iter()
            .copied()
            .find(|port| self.neighbor(*port) == Some(sender))
    }

    fn commit_cycle(&mut self) {
        for buffer in self.buffers.iter_mut() {
            buffer.commit_cycle();
        }
    }

    fn is_empty(&self) -> bool {
        self.buffers.iter().all(PortBuffer::is_empty)
    }
}

/// A mesh router: the shared [`RouterCore`] driven by one routing [`Strategy`].
///
/// Routers never hold references to each other. Neighbors are [`RouterId`]s
/// into the network's router vector.
#[derive(Debug)]
pub struct Router {
    core: RouterCore,
    strategy: Strategy,
}

impl Router {
    pub fn new(
        id: RouterId,
        coordinate: Coordinate,
        buffer_size: usize,
        strategy: Strategy,
    ) -> Self {
        Self {
            core: RouterCore::new(id, coordinate, buffer_size),
            strategy,
        }
    }

    pub fn id(&self) -> RouterId {
        self.core.id
    }

    pub fn coordinate(&self) -> Coordinate {
        self.core.coordinate
    }

    pub fn core(&self) -> &RouterCore {
        &self.core
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn buffer(&self, port: Direction) -> &PortBuffer {
        self.core.buffer(port)
    }

    pub fn neighbor(&self, direction: Direction) -> Option<RouterId> {
        self.core.neighbor(direction)
    }

    /// Connect the router to its adjacent routers and initialize the strategy
    /// state that depends on the connected ports.
    pub fn setup(&mut self, neighbors: &[(RouterId, Coordinate)]) -> Result<(), Error> {
        for &(neighbor, coordinate) in neighbors {
            if self.core.coordinate.distance(coordinate) != 1 {
                return Err(Error::NotAdjacent(self.core.id, neighbor));
            }
            let port = Direction::toward(self.core.coordinate, coordinate);
            let slot = &mut self.core.neighbors[port.index()];
            if slot.is_some() {
                return Err(Error::DuplicateNeighbor(self.core.id, port));
            }
            *slot = Some(neighbor);
        }
        log::trace!(
            "router {} at {} connected to {:?}",
            self.core.id,
            self.core.coordinate,
            self.core.neighbors
        );
        self.strategy.setup(&self.core);
        Ok(())
    }

    /// Place a freshly generated packet in the unbounded local port.
    pub(crate) fn inject(&mut self, mut packet: Packet) {
        packet.visit(self.core.id, self.core.coordinate);
        if self.core.buffer_mut(Direction::Local).push(packet).is_err() {
            unreachable!("the local port is unbounded");
        }
    }

    /// Accept a packet sent by the adjacent router `sender`, or hand it back
    /// when the facing buffer is full this cycle.
    pub(crate) fn receive(
        &mut self,
        mut packet: Packet,
        sender: RouterId,
    ) -> Result<(), Packet> {
        let port = match self.core.port_facing(sender) {
            Some(port) => port,
            None => panic!(
                "router {} received a packet from router {}, which is not a neighbor",
                self.core.id, sender
            ),
        };
        let buffer = &mut self.core.buffers[port.index()];
        if buffer.is_full() {
            return Err(packet);
        }
        packet.visit(self.core.id, self.core.coordinate);
        buffer.push(packet)
    }

    /// Select the input port to serve this cycle.
    pub(crate) fn schedule(&mut self) -> Direction {
        let port = self.strategy.schedule(&self.core);
        self.core.serving_port = port;
        port
    }

    /// Output direction for `packet`, which sits at the head of one of this
    /// router's buffers.
    pub(crate) fn arbitrate(&self, mesh: &[Router], packet: &Packet) -> Direction {
        self.strategy.arbitrate(&self.core, mesh, packet)
    }

    pub(crate) fn take(&mut self, port: Direction) -> Packet {
        self.core.buffer_mut(port).pop()
    }

    /// A packet taken from `port` was refused downstream. The strategy may keep
    /// it; otherwise it goes back to the head of its buffer.
    pub(crate) fn block(&mut self, port: Direction, packet: Packet) {
        if let Some(packet) = self.strategy.on_blocked(&self.core, port, packet) {
            self.core.buffer_mut(port).requeue(packet);
        }
    }

    /// Second pass of a cycle: strategy bookkeeping, then buffer latching.
    pub(crate) fn commit(&mut self) {
        self.strategy.prepare_commit(&mut self.core);
        self.core.commit_cycle();
    }

    /// No packet is held anywhere in the router.
    pub fn is_drained(&self) -> bool {
        self.core.is_empty() && self.strategy.is_drained()
    }

    /// Number of packets held in the router's buffers, side buffers included.
    pub fn packets_held(&self) -> usize {
        let held: usize = self.core.buffers.iter().map(PortBuffer::len).sum();
        held + self.strategy.packets_held()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(id: RouterId, row: usize, col: usize) -> Router {
        Router::new(id, Coordinate::new(row, col), 2, Strategy::Xy(Default::default()))
    }

    #[test]
    fn setup_assigns_ports() {
        // center of a 3x3 mesh
        let mut center = router(4, 1, 1);
        center
            .setup(&[
                (1, Coordinate::new(0, 1)),
                (3, Coordinate::new(1, 0)),
                (5, Coordinate::new(1, 2)),
                (7, Coordinate::new(2, 1)),
            ])
            .unwrap();
        assert_eq!(center.neighbor(Direction::North), Some(1));
        assert_eq!(center.neighbor(Direction::West), Some(3));
        assert_eq!(center.neighbor(Direction::East), Some(5));
        assert_eq!(center.neighbor(Direction::South), Some(7));
        assert_eq!(center.neighbor(Direction::Local), None);
        assert_eq!(center.core().connected_ports().count(), NUM_PORTS);
        assert_eq!(center.core().port_facing(7), Some(Direction::South));
        assert_eq!(center.core().port_facing(0), None);
    }

    #[test]
    fn setup_rejects_bad_neighbors() {
        let mut corner = router(0, 0, 0);
        assert_eq!(
            corner.setup(&[(4, Coordinate::new(1, 1))]),
            Err(Error::NotAdjacent(0, 4))
        );
        let mut corner = router(0, 0, 0);
        assert_eq!(
            corner.setup(&[(1, Coordinate::new(0, 1)), (9, Coordinate::new(0, 1))]),
            Err(Error::DuplicateNeighbor(0, Direction::East))
        );
    }

    #[test]
    fn receive_respects_capacity() {
        let mut east = router(1, 0, 1);
        east.setup(&[(0, Coordinate::new(0, 0))]).unwrap();
        let packet = || Packet::new(0, Coordinate::new(0, 0), Coordinate::new(0, 1), 0);
        assert!(east.receive(packet(), 0).is_ok());
        assert!(east.receive(packet(), 0).is_ok());
        let refused = east.receive(packet(), 0).unwrap_err();
        // a refused packet is not traced
        assert!(refused.path_trace().is_empty());
        assert_eq!(east.buffer(Direction::West).len(), 2);
        assert_eq!(
            east.buffer(Direction::West).iter().next().unwrap().path_trace(),
            &[1]
        );
        assert_eq!(east.packets_held(), 2);
        assert!(!east.is_drained());
    }

    #[test]
    #[should_panic]
    fn receive_from_stranger_panics() {
        let mut east = router(1, 0, 1);
        east.setup(&[(0, Coordinate::new(0, 0))]).unwrap();
        let packet = Packet::new(5, Coordinate::new(1, 2), Coordinate::new(0, 1), 0);
        let _ = east.receive(packet, 5);
    }

    #[test]
    fn injected_packets_wait_for_commit() {
        let mut lonely = router(0, 0, 0);
        lonely.setup(&[]).unwrap();
        lonely.inject(Packet::new(0, Coordinate::new(0, 0), Coordinate::new(0, 0), 0));
        assert!(lonely.buffer(Direction::Local).peek().is_none());
        lonely.commit();
        assert_eq!(lonely.schedule(), Direction::Local);
        assert!(lonely.buffer(Direction::Local).peek().is_some());
    }
}
