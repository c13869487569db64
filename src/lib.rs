// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Common library functions for portfleet

pub mod command;
pub mod config;
mod error;
pub mod logger;
pub mod pool;
pub mod procs;

pub use command::ShellCommand;
pub use config::{ConfigOverrides, LaunchConfig};
pub use error::{Error, ErrorKind};
pub use pool::WorkerPool;
pub use procs::{Launcher, Outcome, Report, ShellSpawner, Spawner};
