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

use std::fmt;

use crate::{Cycle, CycleStatus, Network, PacketSink, RoutingAlgorithm, TrafficSource};

/// Summary of one simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationReport {
    pub algorithm: RoutingAlgorithm,
    /// The cycle at which the network was found drained, if it was.
    pub ending_cycle: Option<Cycle>,
    /// Cycles whose send and commit passes ran.
    pub cycles_run: Cycle,
    pub injected: usize,
    pub delivered: usize,
    pub in_flight: usize,
}

impl SimulationReport {
    pub fn is_drained(&self) -> bool {
        self.ending_cycle.is_some()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.ending_cycle {
            Some(cycle) => write!(f, "{}: ending cycle = {}", self.algorithm, cycle)?,
            None => write!(
                f,
                "{}: not drained after {} cycles",
                self.algorithm, self.cycles_run
            )?,
        }
        write!(
            f,
            ", {} packets injected, {} delivered, {} in flight",
            self.injected, self.delivered, self.in_flight
        )
    }
}

/// Run `network` for at most `cycle_limit` cycles, stopping early once the
/// source is exhausted and every buffer is empty.
pub fn simulate<T, S>(
    network: &mut Network,
    source: &mut T,
    sink: &mut S,
    cycle_limit: Cycle,
) -> SimulationReport
where
    T: TrafficSource + ?Sized,
    S: PacketSink + ?Sized,
{
    log::info!(
        "simulating {} on a {}x{} mesh for at most {} cycles",
        network.algorithm(),
        network.grid().rows(),
        network.grid().columns(),
        cycle_limit
    );
    let mut ending_cycle = None;
    let mut cycles_run = 0;
    for cycle in 0..cycle_limit {
        if network.simulate_one_cycle(cycle, source, sink) == CycleStatus::Drained {
            log::info!("network drained at cycle {}", cycle);
            ending_cycle = Some(cycle);
            break;
        }
        cycles_run = cycle + 1;
        log::debug!(
            "cycle {}: {} packets in flight",
            cycle,
            network.packets_in_flight()
        );
    }
    if ending_cycle.is_none() {
        log::info!("cycle limit {} reached", cycle_limit);
    }
    SimulationReport {
        algorithm: network.algorithm(),
        ending_cycle,
        cycles_run,
        injected: network.packets_injected(),
        delivered: network.packets_delivered(),
        in_flight: network.packets_in_flight(),
    }
}
