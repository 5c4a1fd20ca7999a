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

use crate::router::RouterCore;
use crate::routing::{round_robin, Routing};
use crate::{Direction, Packet, Router, DIRECTIONS};

/// Minimal routing that picks, when both axes still need movement, the axis
/// whose next router reports the lower busy index.
#[derive(Clone, Copy, Debug, Default)]
pub struct CongestionAware;

/// Discretized congestion level of `router` as seen by traffic entering through
/// `channel`, from 0 (idle) to 7 (saturated).
pub fn busy_index(router: &RouterCore, channel: Direction) -> u8 {
    let full = DIRECTIONS
        .iter()
        .filter(|port| router.buffer(**port).is_full())
        .count();
    let half_full = DIRECTIONS
        .iter()
        .filter(|port| router.buffer(**port).is_half_full())
        .count();
    let channel_full = router.buffer(channel).is_full();

    // later rows of the table take precedence
    let mut index = 0;
    if !channel_full && half_full > 2 {
        index = 1;
    }
    if !channel_full && full == 1 {
        index = 2;
    }
    if channel_full && half_full < 3 {
        index = 3;
    }
    if channel_full && half_full >= 3 {
        index = 4;
    }
    if !channel_full && full > 2 {
        index = 5;
    }
    if channel_full && full >= 1 {
        index = 6;
    }
    if channel_full && full > 2 {
        index = 7;
    }
    index
}

fn neighbor_busy_index(router: &RouterCore, mesh: &[Router], direction: Direction) -> u8 {
    match router.neighbor(direction) {
        Some(neighbor) => busy_index(mesh[neighbor].core(), direction),
        None => u8::MAX,
    }
}

impl Routing for CongestionAware {
    fn schedule(&mut self, router: &RouterCore) -> Direction {
        round_robin(router)
    }

    fn arbitrate(&self, router: &RouterCore, mesh: &[Router], packet: &Packet) -> Direction {
        let here = router.coordinate();
        let to = packet.destination();
        let x = match to.col.cmp(&here.col) {
            Ordering::Greater => Some(Direction::East),
            Ordering::Less => Some(Direction::West),
            Ordering::Equal => None,
        };
        let y = match to.row.cmp(&here.row) {
            Ordering::Greater => Some(Direction::South),
            Ordering::Less => Some(Direction::North),
            Ordering::Equal => None,
        };
        match (x, y) {
            (None, None) => Direction::Local,
            (Some(direction), None) | (None, Some(direction)) => direction,
            (Some(x), Some(y)) => {
                let x_index = neighbor_busy_index(router, mesh, x);
                let y_index = neighbor_busy_index(router, mesh, y);
                log::trace!(
                    "router {}: busy index {} {}, {} {}",
                    router.id(),
                    x,
                    x_index,
                    y,
                    y_index
                );
                if y_index >= x_index {
                    x
                } else {
                    y
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, Network, NocConfiguration, RouterId, RoutingAlgorithm};

    fn network() -> Network {
        let config = NocConfiguration::new(3, 3, RoutingAlgorithm::CongestionAware);
        Network::new(&config).unwrap()
    }

    fn fill(network: &mut Network, id: RouterId, sender: RouterId, count: usize) {
        for _ in 0..count {
            let packet = Packet::new(sender, Coordinate::new(0, 0), Coordinate::new(0, 0), 0);
            network.router_mut(id).receive(packet, sender).unwrap();
        }
    }

    fn route(network: &Network, id: RouterId, row: usize, col: usize) -> Direction {
        let router = &network.routers()[id];
        let packet = Packet::new(id, router.coordinate(), Coordinate::new(row, col), 0);
        router.arbitrate(network.routers(), &packet)
    }

    fn center(network: &Network) -> &RouterCore {
        network.routers()[4].core()
    }

    #[test]
    fn busy_index_table() {
        let mut network = network();
        assert_eq!(busy_index(center(&network), Direction::East), 0);

        // one full port
        fill(&mut network, 4, 3, 4);
        assert_eq!(busy_index(center(&network), Direction::East), 2);
        // a full channel always has at least one full port
        assert_eq!(busy_index(center(&network), Direction::West), 6);

        // three half-full ports, one of them full
        fill(&mut network, 4, 1, 2);
        fill(&mut network, 4, 5, 2);
        assert_eq!(busy_index(center(&network), Direction::South), 2);
        assert_eq!(busy_index(center(&network), Direction::West), 6);

        // every mesh port full
        fill(&mut network, 4, 1, 2);
        fill(&mut network, 4, 5, 2);
        fill(&mut network, 4, 7, 4);
        assert_eq!(busy_index(center(&network), Direction::West), 7);
    }

    #[test]
    fn single_axis_and_arrival() {
        let network = network();
        assert_eq!(route(&network, 4, 1, 1), Direction::Local);
        assert_eq!(route(&network, 4, 1, 0), Direction::West);
        assert_eq!(route(&network, 4, 0, 1), Direction::North);
        // no column movement left: go along the rows
        assert_eq!(route(&network, 1, 2, 1), Direction::South);
    }

    #[test]
    fn picks_the_less_busy_axis() {
        let mut network = network();
        // ties go to the column axis
        assert_eq!(route(&network, 0, 2, 2), Direction::East);
        // router 1 is full on its west port
        fill(&mut network, 1, 0, 4);
        assert_eq!(route(&network, 0, 2, 2), Direction::South);
        // router 3 is as busy, on its north port
        fill(&mut network, 3, 0, 4);
        assert_eq!(route(&network, 0, 2, 2), Direction::East);
    }
}
