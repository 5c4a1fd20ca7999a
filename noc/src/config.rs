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

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{Cycle, Error, Grid, RoutingAlgorithm};

/// Slots in each Modified-XY side buffer.
pub const DEFAULT_SIDE_BUFFER_SIZE: usize = 3;

const DEFAULT_ROWS: usize = 4;
const DEFAULT_COLUMNS: usize = 4;
const DEFAULT_CYCLE_LIMIT: Cycle = 300;

/// Parameters of one simulated network.
///
/// Every field has a default, so a YAML file only needs to list what it
/// overrides.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NocConfiguration {
    pub rows: usize,
    pub columns: usize,
    pub algorithm: RoutingAlgorithm,
    /// Capacity of the four mesh-facing input buffers. `None` picks the
    /// algorithm's own default.
    pub buffer_size: Option<usize>,
    pub side_buffer_size: usize,
    pub cycle_limit: Cycle,
}

impl Default for NocConfiguration {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            algorithm: RoutingAlgorithm::Xy,
            buffer_size: None,
            side_buffer_size: DEFAULT_SIDE_BUFFER_SIZE,
            cycle_limit: DEFAULT_CYCLE_LIMIT,
        }
    }
}

impl NocConfiguration {
    pub fn new(rows: usize, columns: usize, algorithm: RoutingAlgorithm) -> Self {
        Self {
            rows,
            columns,
            algorithm,
            ..Default::default()
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
            .unwrap_or_else(|| self.algorithm.default_buffer_size())
    }

    pub fn grid(&self) -> Result<Grid, Error> {
        Grid::new(self.rows, self.columns)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.grid()?;
        if self.buffer_size() == 0 {
            return Err(Error::InvalidBufferSize(0));
        }
        if self.algorithm == RoutingAlgorithm::ModifiedXy && self.side_buffer_size == 0 {
            return Err(Error::InvalidBufferSize(0));
        }
        Ok(())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("File {} not found", path.display()))?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

impl FromStr for NocConfiguration {
    type Err = anyhow::Error;

    fn from_str(config: &str) -> Result<Self, Self::Err> {
        let config: Self = serde_yaml::from_str(config)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_yaml_config() {
        let conf_str = "---
rows: 3
columns: 5
algorithm: modified-xy
side_buffer_size: 2
cycle_limit: 1000
";
        let config = NocConfiguration::from_str(conf_str).unwrap();
        assert_eq!(config.rows, 3);
        assert_eq!(config.columns, 5);
        assert_eq!(config.algorithm, RoutingAlgorithm::ModifiedXy);
        assert_eq!(config.buffer_size, None);
        assert_eq!(config.buffer_size(), 1);
        assert_eq!(config.side_buffer_size, 2);
        assert_eq!(config.cycle_limit, 1000);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config = NocConfiguration::from_str("algorithm: congestion-aware\n").unwrap();
        assert_eq!((config.rows, config.columns), (4, 4));
        assert_eq!(config.buffer_size(), 4);
        assert_eq!(config.cycle_limit, 300);

        let config = NocConfiguration::from_str("buffer_size: 2\n").unwrap();
        assert_eq!(config.algorithm, RoutingAlgorithm::Xy);
        assert_eq!(config.buffer_size(), 2);
    }

    #[test]
    fn write_yaml_config() {
        let mut config = NocConfiguration::new(2, 2, RoutingAlgorithm::Elra);
        config.buffer_size = Some(6);
        let text = serde_yaml::to_string(&config).unwrap();
        assert!(text.contains("algorithm: elra"));
        let back = NocConfiguration::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn invalid_configurations() {
        let config = NocConfiguration::new(0, 4, RoutingAlgorithm::Xy);
        assert_eq!(
            config.validate(),
            Err(Error::InvalidGrid {
                rows: 0,
                columns: 4
            })
        );
        let mut config = NocConfiguration::default();
        config.buffer_size = Some(0);
        assert_eq!(config.validate(), Err(Error::InvalidBufferSize(0)));
        assert!(NocConfiguration::from_str("algorithm: west-first\n").is_err());
    }
}
