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

use std::collections::VecDeque;

use crate::router::RouterCore;
use crate::routing::xy::xy_direction;
use crate::routing::Routing;
use crate::{Direction, Packet, Router, DIRECTIONS, NUM_PORTS};

/// Priority of each port, lower is served first. `None` for ports without a
/// link.
type Priorities = [Option<usize>; NUM_PORTS];

/// XY routing with priority-based scheduling and a side buffer per input.
///
/// Every cycle the scheduler groups the sendable head packets by their XY
/// output, picks the output with the best output priority and then the input
/// with the best input priority among those requesting it. The winners drop to
/// the lowest priority once their packet leaves. A packet refused downstream
/// waits in the side buffer of its input, if there is room, which releases the
/// input slot to the upstream router. It moves back at the end of a cycle that
/// started with the input buffer empty, if a slot is still free.
#[derive(Debug)]
pub struct ModifiedXy {
    side_buffers: [VecDeque<Packet>; NUM_PORTS],
    side_buffer_size: usize,
    input_priority: Priorities,
    output_priority: Priorities,
    serving_output: Direction,
}

impl ModifiedXy {
    pub fn new(side_buffer_size: usize) -> Self {
        assert!(side_buffer_size > 0, "side buffers need at least one slot");
        Self {
            side_buffers: Default::default(),
            side_buffer_size,
            input_priority: [None; NUM_PORTS],
            output_priority: [None; NUM_PORTS],
            serving_output: Direction::Local,
        }
    }

    pub fn input_priority(&self) -> &Priorities {
        &self.input_priority
    }

    pub fn output_priority(&self) -> &Priorities {
        &self.output_priority
    }

    pub fn side_buffer_len(&self, port: Direction) -> usize {
        self.side_buffers[port.index()].len()
    }
}

/// The candidate with the smallest priority value; the first one on ties.
fn best(
    priorities: &Priorities,
    candidates: impl Iterator<Item = Direction>,
) -> Option<Direction> {
    candidates.min_by_key(|port| priorities[port.index()].unwrap_or(usize::MAX))
}

/// Move `served` to the lowest priority. Ports that were behind it move up by
/// one, so the values stay a permutation of `0..connected`.
fn demote(priorities: &mut Priorities, served: Direction) {
    let old = match priorities[served.index()] {
        Some(old) => old,
        None => return,
    };
    let mut lowest = 0;
    for priority in priorities.iter_mut().flatten() {
        if *priority > old {
            *priority -= 1;
        }
        lowest += 1;
    }
    priorities[served.index()] = Some(lowest - 1);
}

impl Routing for ModifiedXy {
    fn setup(&mut self, router: &RouterCore) {
        for (priority, port) in router.connected_ports().enumerate() {
            self.input_priority[port.index()] = Some(priority);
            self.output_priority[port.index()] = Some(priority);
        }
    }

    fn schedule(&mut self, router: &RouterCore) -> Direction {
        let requests: Vec<(Direction, Direction)> = router
            .connected_ports()
            .filter_map(|port| {
                let packet = router.buffer(port).peek()?;
                Some((port, xy_direction(router, packet)))
            })
            .collect();
        let output = match best(
            &self.output_priority,
            requests.iter().map(|&(_, output)| output),
        ) {
            Some(output) => output,
            None => return router.serving_port(),
        };
        self.serving_output = output;
        let input = best(
            &self.input_priority,
            requests
                .iter()
                .filter(|&&(_, requested)| requested == output)
                .map(|&(input, _)| input),
        );
        input.unwrap_or_else(|| router.serving_port())
    }

    fn arbitrate(&self, router: &RouterCore, _mesh: &[Router], packet: &Packet) -> Direction {
        xy_direction(router, packet)
    }

    fn on_blocked(
        &mut self,
        router: &RouterCore,
        port: Direction,
        packet: Packet,
    ) -> Option<Packet> {
        let side = &mut self.side_buffers[port.index()];
        if side.len() < self.side_buffer_size {
            log::trace!(
                "router {}: packet from {} parked in the {} side buffer",
                router.id(),
                packet.source(),
                port
            );
            side.push_back(packet);
            None
        } else {
            Some(packet)
        }
    }

    fn prepare_commit(&mut self, router: &mut RouterCore) {
        let served = router.serving_port();
        if router.buffer(served).packet_sent() {
            demote(&mut self.input_priority, served);
            demote(&mut self.output_priority, self.serving_output);
        }
        for port in DIRECTIONS {
            // Only an input buffer that was empty at the start of the cycle
            // takes a packet back. A slot freed during the cycle goes to the
            // upstream router first.
            if router.buffer(port).is_available() {
                continue;
            }
            let side = &mut self.side_buffers[port.index()];
            if let Some(packet) = side.pop_front() {
                if let Err(packet) = router.buffer_mut(port).refill(packet) {
                    side.push_front(packet);
                }
            }
        }
    }

    fn packets_held(&self) -> usize {
        self.side_buffers.iter().map(VecDeque::len).sum()
    }
}
