// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::command::ShellCommand;
use crate::procs::Spawner;
use crate::Error;

pub struct StdIoConf {
    pub stdin: Stdio,
    pub stderr: Stdio,
    pub stdout: Stdio,
}

impl StdIoConf {
    /// Children write straight to the launcher's terminal
    pub fn inherit() -> Self {
        Self {
            stdin: Stdio::inherit(),
            stderr: Stdio::inherit(),
            stdout: Stdio::inherit(),
        }
    }

    pub fn null() -> Self {
        Self {
            stdin: Stdio::null(),
            stderr: Stdio::null(),
            stdout: Stdio::null(),
        }
    }
}

/// Runs commands through the host shell, i.e. `sh -c <line>`
#[derive(Clone, Debug)]
pub struct ShellSpawner {
    shell: String,
    flag: String,
    quiet: bool,
}

impl ShellSpawner {
    pub fn new<S: Into<String>, F: Into<String>>(shell: S, flag: F) -> Self {
        Self {
            shell: shell.into(),
            flag: flag.into(),
            quiet: false,
        }
    }

    /// Discard the children's output instead of inheriting the launcher's stdio
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    fn stdio(&self) -> StdIoConf {
        if self.quiet {
            StdIoConf::null()
        } else {
            StdIoConf::inherit()
        }
    }
}

impl Default for ShellSpawner {
    fn default() -> Self {
        Self::new("sh", "-c")
    }
}

#[async_trait]
impl Spawner for ShellSpawner {
    async fn run(&self, command: &ShellCommand) -> Result<ExitStatus, Error> {
        let stdio = self.stdio();

        let mut process = Command::new(&self.shell);
        process
            .arg(&self.flag)
            .arg(command.line())
            .kill_on_drop(true)
            .stdin(stdio.stdin)
            .stdout(stdio.stdout)
            .stderr(stdio.stderr);

        if let Some(dir) = command.working_dir() {
            process.current_dir(dir);
        }

        let mut child = process.spawn()?;
        debug!("started child process {:?}: {}", child.id(), command);

        Ok(child.wait().await?)
    }
}
