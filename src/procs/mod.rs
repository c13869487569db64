// Copyright 2019 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

mod launcher;
mod shell;

pub use launcher::{Launcher, Report};
pub use shell::{ShellSpawner, StdIoConf};

use std::process::ExitStatus;

use async_trait::async_trait;

use crate::command::ShellCommand;
use crate::Error;

/// A trait to define how a command becomes a running process
///
/// Implementations must start the command and only return once it has exited.
#[async_trait]
pub trait Spawner: Send + Sync + 'static {
    async fn run(&self, command: &ShellCommand) -> Result<ExitStatus, Error>;
}

/// What happened to a single command
#[derive(Debug)]
pub enum Outcome {
    /// The process ran and exited, successfully or not
    Exited(ExitStatus),
    /// The process never ran, or its task did not complete
    Failed(Error),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Exited(status) => status.success(),
            Outcome::Failed(_) => false,
        }
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Outcome::Exited(status) => Some(*status),
            Outcome::Failed(_) => None,
        }
    }
}

impl From<Result<ExitStatus, Error>> for Outcome {
    fn from(result: Result<ExitStatus, Error>) -> Self {
        match result {
            Ok(status) => Outcome::Exited(status),
            Err(err) => Outcome::Failed(err),
        }
    }
}
