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

//! Congestion-avoiding minimal adaptive routing.
//!
//! The output is chosen by a small boolean network fed with two signals per
//! direction, looking down the whole line of routers in that direction:
//!  - *busy*: some router on the line has its buffer half full;
//!  - *congested*: every router on the line has its buffer full.
//!
//! Directions are encoded on two bits inside the network (N=0, E=1, S=2, W=3),
//! so the inverse of a direction is its bitwise complement.

use crate::router::RouterCore;
use crate::routing::xy::xy_direction;
use crate::routing::{round_robin_sendable, Routing};
use crate::{Direction, Packet, Router, RouterId};

#[derive(Clone, Copy, Debug, Default)]
pub struct Adaptive;

type Code = u8;

fn encode(direction: Direction) -> Code {
    match direction {
        Direction::North => 0,
        Direction::East => 1,
        Direction::South => 2,
        Direction::West => 3,
        Direction::Local => unreachable!("local is not a routing direction"),
    }
}

fn decode(code: Code) -> Direction {
    match code & 0b11 {
        0 => Direction::North,
        1 => Direction::East,
        2 => Direction::South,
        _ => Direction::West,
    }
}

/// The signal multiplexers are wired N, E, W, S.
fn select(code: Code) -> Direction {
    match code & 0b11 {
        0 => Direction::North,
        1 => Direction::East,
        2 => Direction::West,
        _ => Direction::South,
    }
}

fn invert(code: Code) -> Code {
    !code & 0b11
}

/// Walk the line of routers starting at `from` toward `direction` until `test`
/// decides. `None` when the edge of the mesh is reached undecided.
fn along_line(
    mesh: &[Router],
    from: RouterId,
    direction: Direction,
    mut test: impl FnMut(&Router) -> Option<bool>,
) -> Option<bool> {
    let mut id = from;
    // no line is longer than the mesh
    for _ in 0..mesh.len() {
        let router = &mesh[id];
        if let Some(decided) = test(router) {
            return Some(decided);
        }
        id = router.neighbor(direction)?;
    }
    None
}

/// True when any router on the line from `from` toward `direction` has its
/// opposite-facing buffer at least half full. False at the mesh edge.
pub fn busy_signal(mesh: &[Router], from: RouterId, direction: Direction) -> bool {
    let port = direction.opposite();
    along_line(mesh, from, direction, |router| {
        if router.buffer(port).is_half_full() {
            Some(true)
        } else {
            None
        }
    })
    .unwrap_or(false)
}

/// True when every router on the line from `from` toward `direction` has its
/// opposite-facing buffer full.
pub fn congested_signal(mesh: &[Router], from: RouterId, direction: Direction) -> bool {
    let port = direction.opposite();
    along_line(mesh, from, direction, |router| {
        if router.buffer(port).is_full() {
            None
        } else {
            Some(false)
        }
    })
    .unwrap_or(true)
}

impl Routing for Adaptive {
    fn schedule(&mut self, router: &RouterCore) -> Direction {
        round_robin_sendable(router)
    }

    fn arbitrate(&self, router: &RouterCore, mesh: &[Router], packet: &Packet) -> Direction {
        let preferred = xy_direction(router, packet);
        if preferred.is_local() {
            return preferred;
        }
        let busy = |code| busy_signal(mesh, router.id(), select(code));
        let congested = |code| congested_signal(mesh, router.id(), select(code));

        let algo = encode(preferred);
        let s1: Code = [1, 0, 0, 1][usize::from(algo)];
        let s2 = busy(s1);
        let s3 = busy(invert(s1));
        let s4 = s2 || !s3;
        let s5 = !(s2 && s3);
        let s6 = if s4 { invert(s1) } else { s1 };
        let s7 = if s5 { s6 } else { invert(algo) };
        let result = if congested(algo) { s7 } else { algo };

        let chosen = decode(result);
        if router.is_connected(chosen) {
            chosen
        } else {
            log::trace!(
                "router {}: adaptive choice {} has no link, using {}",
                router.id(),
                chosen,
                preferred
            );
            preferred
        }
    }
}
