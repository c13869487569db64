// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;
use std::path::{Path, PathBuf};

/// A single line to be handed to the host shell
///
/// The working directory travels with the command instead of being set on the launcher process, so
///   that concurrently running commands never observe each other's directory changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellCommand {
    line: String,
    working_dir: Option<PathBuf>,
}

impl ShellCommand {
    pub fn new<S: Into<String>>(line: S) -> Self {
        Self {
            line: line.into(),
            working_dir: None,
        }
    }

    /// `<runtime> run <entry> -port <port>`
    pub fn server(runtime: &str, entry: &str, port: u16) -> Self {
        Self::new(format!("{} run {} -port {}", runtime, entry, port))
    }

    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_line() {
        let cmd = ShellCommand::server("go", "main/main.go", 8001);
        assert_eq!(cmd.line(), "go run main/main.go -port 8001");
        assert_eq!(cmd.working_dir(), None);
    }

    #[test]
    fn test_working_dir_is_carried() {
        let cmd = ShellCommand::new("true").with_working_dir("/tmp");
        assert_eq!(cmd.working_dir(), Some(Path::new("/tmp")));
        assert_eq!(cmd.to_string(), "true");
    }
}
