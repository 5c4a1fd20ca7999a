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

use crate::{Coordinate, Cycle, RouterId};

/// A packet travelling through the mesh, with the trace used for statistics.
///
/// Packets are moved, never cloned, between buffers: at any cycle exactly one
/// router buffer (or the destination's sink) owns a packet.
#[derive(Debug, PartialEq, Eq)]
pub struct Packet {
    source: RouterId,
    destination: Coordinate,
    current: Coordinate,
    injection_cycle: Cycle,
    /// Every router whose buffer accepted the packet, source included.
    path_trace: Vec<RouterId>,
    cycles_taken: Cycle,
}

impl Packet {
    pub fn new(
        source: RouterId,
        source_coordinate: Coordinate,
        destination: Coordinate,
        injection_cycle: Cycle,
    ) -> Self {
        Self {
            source,
            destination,
            current: source_coordinate,
            injection_cycle,
            path_trace: Vec::new(),
            cycles_taken: 0,
        }
    }

    pub fn source(&self) -> RouterId {
        self.source
    }

    pub fn destination(&self) -> Coordinate {
        self.destination
    }

    pub fn current(&self) -> Coordinate {
        self.current
    }

    pub fn injection_cycle(&self) -> Cycle {
        self.injection_cycle
    }

    pub fn path_trace(&self) -> &[RouterId] {
        &self.path_trace
    }

    /// Latency, only meaningful once the packet was delivered.
    pub fn cycles_taken(&self) -> Cycle {
        self.cycles_taken
    }

    /// Number of links traversed so far.
    pub fn hops(&self) -> usize {
        self.path_trace.len().saturating_sub(1)
    }

    /// Called by a router when the packet enters one of its buffers.
    pub(crate) fn visit(&mut self, router: RouterId, coordinate: Coordinate) {
        self.path_trace.push(router);
        self.current = coordinate;
    }

    /// Called once, at the cycle the packet is handed to its destination sink.
    pub(crate) fn finish(&mut self, cycle: Cycle) {
        assert!(
            cycle >= self.injection_cycle,
            "packet from {} delivered at cycle {} before its injection at {}",
            self.source,
            cycle,
            self.injection_cycle
        );
        self.cycles_taken = cycle - self.injection_cycle;
    }
}
