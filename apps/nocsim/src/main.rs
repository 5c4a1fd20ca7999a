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

mod modes;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use env_logger::Target;
use structopt::StructOpt;

use noc::{
    simulate, ConstantTraffic, Cycle, Grid, Network, NocConfiguration, RandomTraffic, Receivers,
    RoutingAlgorithm, ScriptedTraffic, SimulationReport, TrafficSource,
};

use modes::{AlgorithmChoice, TrafficMode};

#[derive(StructOpt)]
#[structopt(name = "nocsim", about = "A cycle-accurate 2D mesh network-on-chip simulator")]
struct Arguments {
    /// YAML network configuration; the options below override it
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// number of rows in the mesh
    #[structopt(short = "m", long)]
    rows: Option<usize>,
    /// number of columns in the mesh
    #[structopt(short = "n", long)]
    columns: Option<usize>,
    /// xy, modified-xy, adaptive, elra, congestion-aware or all
    #[structopt(short, long)]
    algorithm: Option<AlgorithmChoice>,
    /// capacity of the mesh-facing buffers, defaults per algorithm
    #[structopt(short, long)]
    buffer_size: Option<usize>,
    /// supported modes: single, random, constant
    #[structopt(long, default_value = "single")]
    mode: TrafficMode,
    #[structopt(short, long)]
    cycle_limit: Option<Cycle>,
    /// cycles during which random and constant traffic is injected
    #[structopt(short, long, default_value = "100")]
    load_cycles: Cycle,
    /// random traffic: a router injects with probability 1/rate per cycle
    #[structopt(short, long, default_value = "10")]
    rate: f64,
    #[structopt(long, default_value = "1")]
    runs: usize,
    /// seed of the first random run, incremented for every run
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// 0: packets per router, 1: latency, 2: every packet, 3: heat-map
    #[structopt(short, long, default_value = "0")]
    verbose: u8,
    /// simulation data, stdout if absent
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// per-run summary
    #[structopt(short, long, parse(from_os_str))]
    summary: Option<PathBuf>,
}

impl Arguments {
    fn configuration(&self) -> anyhow::Result<NocConfiguration> {
        let mut config = match &self.config {
            Some(path) => NocConfiguration::from_file(path)?,
            None => NocConfiguration::default(),
        };
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if let Some(size) = self.buffer_size {
            config.buffer_size = Some(size);
        }
        if let Some(limit) = self.cycle_limit {
            config.cycle_limit = limit;
        }
        if matches!(self.mode, TrafficMode::Random) {
            anyhow::ensure!(
                self.rate.is_finite() && self.rate > 0.0,
                "ERROR: Invalid injection rate {}",
                self.rate
            );
        }
        config.validate()?;
        Ok(config)
    }

    fn algorithms(&self, config: &NocConfiguration) -> Vec<RoutingAlgorithm> {
        self.algorithm
            .unwrap_or(AlgorithmChoice::One(config.algorithm))
            .algorithms()
    }

    /// A fresh traffic source, so that every algorithm of a run sees the same
    /// packets.
    fn traffic(&self, grid: Grid, run: usize) -> Box<dyn TrafficSource> {
        match self.mode {
            TrafficMode::Single => Box::new(ScriptedTraffic::corner_to_corner(grid)),
            TrafficMode::Random => Box::new(RandomTraffic::new(
                grid,
                self.rate,
                self.load_cycles,
                self.seed + run as u64,
            )),
            TrafficMode::Constant => Box::new(ConstantTraffic::new(grid, self.load_cycles)),
        }
    }
}

fn create(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout()),
    })
}

fn write_summary(
    out: &mut dyn Write,
    reports: &[(usize, SimulationReport)],
) -> anyhow::Result<()> {
    let mut per_algorithm: BTreeMap<&str, Vec<&SimulationReport>> = BTreeMap::new();
    for (run, report) in reports {
        writeln!(
            out,
            "run {} {}: {} packets sent, ending cycle {}",
            run,
            report.algorithm,
            report.injected,
            report
                .ending_cycle
                .map_or_else(|| "none".to_string(), |cycle| cycle.to_string())
        )?;
        per_algorithm
            .entry(report.algorithm.name())
            .or_default()
            .push(report);
    }
    for (algorithm, reports) in per_algorithm {
        let ending: Vec<Cycle> = reports.iter().filter_map(|r| r.ending_cycle).collect();
        let sent: usize = reports.iter().map(|r| r.injected).sum();
        write!(
            out,
            "{}: {} runs, {:.2} packets per run",
            algorithm,
            reports.len(),
            sent as f64 / reports.len() as f64
        )?;
        if ending.is_empty() {
            writeln!(out, ", never drained")?;
        } else {
            let average = ending.iter().sum::<Cycle>() as f64 / ending.len() as f64;
            writeln!(
                out,
                ", {} drained, average ending cycle {:.2}",
                ending.len(),
                average
            )?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::from_args();

    env_logger::builder()
        .filter(Some("noc"), log::LevelFilter::Warn)
        .parse_default_env()
        .target(Target::Stderr)
        .init();

    let config = args.configuration()?;
    let grid = config.grid()?;
    let algorithms = args.algorithms(&config);
    if args.runs > 1 && args.verbose >= 3 {
        log::warn!("heat-maps are only reported for a single run");
    }

    let mut out = create(args.output.as_deref())?;
    let mut reports = vec![];
    for run in 0..args.runs {
        writeln!(out, "-------- Run {} --------", run)?;
        for &algorithm in &algorithms {
            let config = NocConfiguration {
                algorithm,
                ..config.clone()
            };
            let mut network = Network::new(&config)?;
            let mut traffic = args.traffic(grid, run);
            let mut receivers = Receivers::new(grid);
            let report = simulate(
                &mut network,
                traffic.as_mut(),
                &mut receivers,
                config.cycle_limit,
            );

            writeln!(out, "*************** {} ***************", algorithm)?;
            writeln!(out, "{}", report)?;
            let verbosity = if args.runs > 1 {
                args.verbose.min(2)
            } else {
                args.verbose
            };
            receivers.write_report(&mut out, verbosity)?;
            reports.push((run, report));
        }
    }
    out.flush()?;

    if let Some(path) = &args.summary {
        let mut summary = create(Some(path))?;
        write_summary(&mut summary, &reports)?;
        summary.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments(args: &[&str]) -> Arguments {
        Arguments::from_iter(std::iter::once("nocsim").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = arguments(&["-m", "3", "-n", "5", "-b", "2"])
            .configuration()
            .unwrap();
        assert_eq!((config.rows, config.columns), (3, 5));
        assert_eq!(config.buffer_size(), 2);
    }

    #[test]
    fn test_invalid_rate() {
        for rate in ["--rate=0", "--rate=-1"] {
            let args = arguments(&["--mode", "random", rate]);
            let err = args.configuration().unwrap_err();
            assert!(err.to_string().contains("injection rate"), "{}", err);
        }
        // the rate only matters for random traffic
        assert!(arguments(&["--rate", "0"]).configuration().is_ok());
    }
}
