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

use crate::router::RouterCore;
use crate::routing::xy::xy_direction;
use crate::routing::Routing;
use crate::{Direction, Packet, Router, NUM_PORTS};

/// Traffic status of one input port, refreshed when its group is scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortStatus {
    pub present: bool,
    pub busy: bool,
    pub congested: bool,
    /// Served in the last cycle its group was scheduled.
    pub granted: bool,
    /// Had a packet but was not served in the last cycle its group was
    /// scheduled.
    pub waiting: bool,
}

impl PortStatus {
    pub fn weight(&self) -> i32 {
        3 * i32::from(self.present) + i32::from(self.busy) + 2 * i32::from(self.congested)
            - i32::from(self.granted)
            + i32::from(self.waiting)
    }
}

/// XY routing with weighted group scheduling.
///
/// The local port and the mesh ports form two groups, served on alternate
/// cycles. Among the mesh ports, the one with the heaviest traffic status is
/// served.
#[derive(Debug)]
pub struct Elra {
    groups: [Vec<Direction>; 2],
    status: [PortStatus; NUM_PORTS],
    serving_group: usize,
}

impl Default for Elra {
    fn default() -> Self {
        Self {
            groups: [vec![Direction::Local], Vec::new()],
            status: [PortStatus::default(); NUM_PORTS],
            // the first cycle serves group 0
            serving_group: 1,
        }
    }
}

impl Elra {
    pub fn status(&self, port: Direction) -> PortStatus {
        self.status[port.index()]
    }

    pub fn serving_group(&self) -> usize {
        self.serving_group
    }
}

impl Routing for Elra {
    fn setup(&mut self, router: &RouterCore) {
        self.groups[1] = router.connected_ports().filter(|port| !port.is_local()).collect();
    }

    fn schedule(&mut self, router: &RouterCore) -> Direction {
        self.serving_group = (self.serving_group + 1) % 2;
        for &port in &self.groups[self.serving_group] {
            let buffer = router.buffer(port);
            let status = &mut self.status[port.index()];
            status.present = buffer.is_available();
            status.busy = buffer.is_half_full();
            status.congested = buffer.is_full();
        }
        if self.serving_group == 0 {
            return Direction::Local;
        }
        // a port must weigh more than -1 to win, the first one on ties
        let mut best = (-1, Direction::Local);
        for &port in &self.groups[1] {
            let weight = self.status[port.index()].weight();
            if weight > best.0 {
                best = (weight, port);
            }
        }
        best.1
    }

    fn arbitrate(&self, router: &RouterCore, _mesh: &[Router], packet: &Packet) -> Direction {
        xy_direction(router, packet)
    }

    fn prepare_commit(&mut self, router: &mut RouterCore) {
        let served = router.serving_port();
        for &port in &self.groups[self.serving_group] {
            let buffer = router.buffer(port);
            let status = &mut self.status[port.index()];
            if port == served && buffer.packet_sent() {
                status.granted = true;
                status.waiting = false;
            } else {
                status.granted = false;
                status.waiting = buffer.is_available();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, RouterId, Strategy};

    fn center() -> Router {
        let mut router = Router::new(4, Coordinate::new(1, 1), 2, Strategy::Elra(Elra::default()));
        router
            .setup(&[
                (1, Coordinate::new(0, 1)),
                (3, Coordinate::new(1, 0)),
                (5, Coordinate::new(1, 2)),
                (7, Coordinate::new(2, 1)),
            ])
            .unwrap();
        router
    }

    fn elra(router: &Router) -> &Elra {
        match router.strategy() {
            Strategy::Elra(strategy) => strategy,
            _ => unreachable!(),
        }
    }

    fn receive(router: &mut Router, sender: RouterId, count: usize) {
        for _ in 0..count {
            let packet = Packet::new(sender, Coordinate::new(0, 0), Coordinate::new(2, 2), 0);
            router.receive(packet, sender).unwrap();
        }
    }

    #[test]
    fn weights() {
        let status = PortStatus {
            present: true,
            busy: true,
            congested: true,
            granted: false,
            waiting: true,
        };
        assert_eq!(status.weight(), 7);
        let status = PortStatus {
            granted: true,
            ..Default::default()
        };
        assert_eq!(status.weight(), -1);
    }

    #[test]
    fn groups_alternate() {
        let mut router = center();
        router.commit();
        assert_eq!(router.schedule(), Direction::Local);
        assert_eq!(elra(&router).serving_group(), 0);
        router.commit();
        // nothing to send: the first mesh port wins the tie
        assert_eq!(router.schedule(), Direction::North);
        router.commit();
        assert_eq!(router.schedule(), Direction::Local);
    }

    #[test]
    fn heaviest_port_is_served() {
        let mut router = center();
        receive(&mut router, 3, 1);
        receive(&mut router, 5, 2);
        router.commit();
        router.schedule();
        router.commit();
        // west: present + busy = 4, east: present + busy + congested = 6
        assert_eq!(router.schedule(), Direction::East);
        assert_eq!(elra(&router).status(Direction::West).weight(), 4);
        assert_eq!(elra(&router).status(Direction::East).weight(), 6);

        router.take(Direction::East);
        router.commit();
        let strategy = elra(&router);
        assert!(strategy.status(Direction::East).granted);
        assert!(!strategy.status(Direction::East).waiting);
        assert!(strategy.status(Direction::West).waiting);
        assert!(!strategy.status(Direction::North).waiting);

        router.schedule();
        router.commit();
        // east: present + busy - granted = 3, west: present + busy + waiting = 5
        assert_eq!(router.schedule(), Direction::West);
    }
}
