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

use std::io::Write;

use crate::{Cycle, Grid, Packet, RouterId};

/// Destination of delivered packets.
pub trait PacketSink {
    fn store(&mut self, packet: Packet);
}

impl PacketSink for Vec<Packet> {
    fn store(&mut self, packet: Packet) {
        self.push(packet);
    }
}

/// Per-router receivers collecting delivery statistics.
#[derive(Debug)]
pub struct Receivers {
    grid: Grid,
    received: Vec<usize>,
    packets: Vec<Packet>,
}

impl Receivers {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            received: vec![0; grid.num_routers()],
            packets: Vec::new(),
        }
    }

    /// Packets delivered to router `id`.
    pub fn received(&self, id: RouterId) -> usize {
        self.received[id]
    }

    pub fn total(&self) -> usize {
        self.packets.len()
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn average_latency(&self) -> Option<f64> {
        if self.packets.is_empty() {
            return None;
        }
        let total: Cycle = self.packets.iter().map(Packet::cycles_taken).sum();
        Some(total as f64 / self.packets.len() as f64)
    }

    pub fn max_latency(&self) -> Option<Cycle> {
        self.packets.iter().map(Packet::cycles_taken).max()
    }

    /// For every router, the number of delivered packets that were forwarded
    /// into it. Injection at the source does not count.
    pub fn heatmap(&self) -> Vec<usize> {
        let mut heat = vec![0; self.grid.num_routers()];
        for packet in &self.packets {
            for &router in packet.path_trace().iter().skip(1) {
                heat[router] += 1;
            }
        }
        heat
    }

    /// Forget everything received so far.
    pub fn clear(&mut self) {
        self.received.iter_mut().for_each(|count| *count = 0);
        self.packets.clear();
    }

    /// Human readable report. Levels add, in order: mean latency, every
    /// packet, the heat-map.
    pub fn write_report(&self, out: &mut impl Write, verbosity: u8) -> std::io::Result<()> {
        for (id, count) in self.received.iter().enumerate() {
            writeln!(
                out,
                "Router {} ({}): {} packets received",
                id,
                self.grid.coordinate(id),
                count
            )?;
        }
        writeln!(out, "Total: {} packets received", self.total())?;
        if verbosity >= 1 {
            match (self.average_latency(), self.max_latency()) {
                (Some(average), Some(max)) => writeln!(
                    out,
                    "Latency: average {:.2} cycles, max {} cycles",
                    average, max
                )?,
                _ => writeln!(out, "Latency: no packet delivered")?,
            }
        }
        if verbosity >= 2 {
            for packet in &self.packets {
                writeln!(
                    out,
                    "Packet from {} to {}: {} cycles, path {:?}",
                    packet.source(),
                    packet.destination(),
                    packet.cycles_taken(),
                    packet.path_trace()
                )?;
            }
        }
        if verbosity >= 3 {
            writeln!(out, "Heat-map:")?;
            let heat = self.heatmap();
            for row in heat.chunks(self.grid.columns()) {
                let line: Vec<String> = row.iter().map(|h| format!("{:5}", h)).collect();
                writeln!(out, "{}", line.join(""))?;
            }
        }
        Ok(())
    }
}

impl PacketSink for Receivers {
    fn store(&mut self, packet: Packet) {
        let id = self.grid.id(packet.destination());
        log::debug!(
            "router {} received packet from {} after {} cycles",
            id,
            packet.source(),
            packet.cycles_taken()
        );
        self.received[id] += 1;
        self.packets.push(packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn delivered(grid: Grid, trace: &[RouterId], cycle: Cycle) -> Packet {
        let source = trace[0];
        let destination = trace[trace.len() - 1];
        let mut packet = Packet::new(
            source,
            grid.coordinate(source),
            grid.coordinate(destination),
            0,
        );
        for &id in trace {
            packet.visit(id, grid.coordinate(id));
        }
        packet.finish(cycle);
        packet
    }

    #[test]
    fn counts_and_latency() {
        let grid = Grid::new(2, 2).unwrap();
        let mut receivers = Receivers::new(grid);
        assert_eq!(receivers.average_latency(), None);
        receivers.store(delivered(grid, &[0, 1, 3], 4));
        receivers.store(delivered(grid, &[2, 3], 1));
        receivers.store(delivered(grid, &[3, 1], 3));
        assert_eq!(receivers.received(3), 2);
        assert_eq!(receivers.received(1), 1);
        assert_eq!(receivers.received(0), 0);
        assert_eq!(receivers.total(), 3);
        assert_eq!(receivers.max_latency(), Some(4));
        assert!((receivers.average_latency().unwrap() - 8.0 / 3.0).abs() < 1e-9);
        assert_eq!(receivers.heatmap(), vec![0, 2, 0, 2]);

        receivers.clear();
        assert_eq!(receivers.total(), 0);
        assert_eq!(receivers.received(3), 0);
    }

    #[test]
    fn report_levels() {
        let grid = Grid::new(1, 2).unwrap();
        let mut receivers = Receivers::new(grid);
        receivers.store(delivered(grid, &[0, 1], 2));

        let mut quiet = Vec::new();
        receivers.write_report(&mut quiet, 0).unwrap();
        let quiet = String::from_utf8(quiet).unwrap();
        assert!(quiet.contains("Router 1 (0,1): 1 packets received"));
        assert!(!quiet.contains("Latency"));

        let mut full = Vec::new();
        receivers.write_report(&mut full, 3).unwrap();
        let full = String::from_utf8(full).unwrap();
        assert!(full.contains("Latency: average 2.00 cycles, max 2 cycles"));
        assert!(full.contains("Packet from 0 to 0,1: 2 cycles, path [0, 1]"));
        assert!(full.contains("Heat-map:\n    0    1\n"));
    }

    #[test]
    fn vectors_are_sinks() {
        let mut sink: Vec<Packet> = Vec::new();
        sink.store(Packet::new(0, Coordinate::new(0, 0), Coordinate::new(0, 0), 0));
        assert_eq!(sink.len(), 1);
    }
}
