// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Launch configuration
//!
//! Built from defaults, then an optional TOML file, then command line overrides.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::ShellCommand;
use crate::error::ErrorKind;
use crate::Error;

pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_PORTS: [u16; 3] = [8001, 8002, 8003];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchConfig {
    /// Directory every command runs in, relative paths are resolved against the launch directory
    pub working_dir: PathBuf,
    /// Number of commands allowed to run at once
    pub workers: usize,
    pub runtime: String,
    pub entry: String,
    /// One server instance is started per port, in this order
    pub ports: Vec<u16>,
    pub shell: String,
    pub shell_flag: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from(".."),
            workers: DEFAULT_WORKERS,
            runtime: "go".to_string(),
            entry: "main/main.go".to_string(),
            ports: DEFAULT_PORTS.to_vec(),
            shell: "sh".to_string(),
            shell_flag: "-c".to_string(),
        }
    }
}

impl LaunchConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        Ok(toml::from_str(toml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        debug!("reading config from {}", path.display());
        let toml = fs::read_to_string(path)?;
        Self::from_toml_str(&toml)
    }

    /// Layer the overrides on top of this config, any field that is set wins
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            working_dir,
            workers,
            runtime,
            entry,
            ports,
            shell,
        } = overrides;

        if let Some(working_dir) = working_dir {
            self.working_dir = working_dir;
        }
        if let Some(workers) = workers {
            self.workers = workers;
        }
        if let Some(runtime) = runtime {
            self.runtime = runtime;
        }
        if let Some(entry) = entry {
            self.entry = entry;
        }
        if !ports.is_empty() {
            self.ports = ports;
        }
        if let Some(shell) = shell {
            self.shell = shell;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(ErrorKind::InvalidConfig("workers must be at least 1".to_string()).into());
        }

        if self.ports.is_empty() {
            return Err(ErrorKind::InvalidConfig("at least one port is required".to_string()).into());
        }

        let mut seen = HashSet::with_capacity(self.ports.len());
        for port in &self.ports {
            if !seen.insert(port) {
                return Err(ErrorKind::InvalidConfig(format!("port {} is listed twice", port)).into());
            }
        }

        if self.shell.is_empty() {
            return Err(ErrorKind::InvalidConfig("shell must not be empty".to_string()).into());
        }

        Ok(())
    }

    /// The server commands, one per port and in port order
    pub fn commands(&self) -> Vec<ShellCommand> {
        self.ports
            .iter()
            .map(|port| ShellCommand::server(&self.runtime, &self.entry, *port))
            .collect()
    }
}

/// Values taken from the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub working_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub runtime: Option<String>,
    pub entry: Option<String>,
    pub ports: Vec<u16>,
    pub shell: Option<String>,
}
