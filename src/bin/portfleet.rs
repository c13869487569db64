// Copyright 2019 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{App, Arg, ArgMatches};
use tokio::runtime;
use tracing::{info, warn};

use portfleet::logger::init_logger;
use portfleet::{ConfigOverrides, Error, LaunchConfig, Launcher, ShellSpawner};

const CONFIG: &str = "config";
const DIR: &str = "dir";
const WORKERS: &str = "workers";
const RUNTIME: &str = "runtime";
const ENTRY: &str = "entry";
const PORT: &str = "port";
const SHELL: &str = "shell";
const STRICT: &str = "strict";
const VERBOSE: &str = "verbose";

trait SetupClapApp {
    fn setup_clap_app(self) -> Self;
    fn launch_opts(self) -> Self;
}

impl<'a, 'b> SetupClapApp for App<'a, 'b> {
    fn setup_clap_app(self) -> Self {
        self.version(env!("CARGO_PKG_VERSION"))
            .author(env!("CARGO_PKG_AUTHORS"))
    }

    fn launch_opts(self) -> Self {
        self.arg(
            Arg::with_name(CONFIG)
                .short("c")
                .long(CONFIG)
                .value_name("FILE")
                .help("TOML file with the launch configuration")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(DIR)
                .short("d")
                .long(DIR)
                .value_name("DIR")
                .help("directory the servers run in [default: ..]")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(WORKERS)
                .short("w")
                .long(WORKERS)
                .value_name("NUMBER")
                .validator(validate_number::<usize>)
                .help("number of servers allowed to run at once [default: 3]")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(RUNTIME)
                .long(RUNTIME)
                .value_name("PROGRAM")
                .help("program used to run the entry point [default: go]")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(ENTRY)
                .long(ENTRY)
                .value_name("PATH")
                .help("server entry point [default: main/main.go]")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(PORT)
                .short("p")
                .long(PORT)
                .value_name("PORT")
                .validator(validate_number::<u16>)
                .help("port to start a server on, may be repeated [default: 8001 8002 8003]")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name(SHELL)
                .long(SHELL)
                .value_name("PROGRAM")
                .help("shell that runs each command [default: sh]")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(STRICT)
                .long(STRICT)
                .help("exit with an error if any server did not exit successfully"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .long(VERBOSE)
                .help("enable debug logging"),
        )
    }
}

fn validate_number<N: FromStr>(value: String) -> Result<(), String> {
    value
        .parse::<N>()
        .map(|_| ())
        .map_err(|_| format!("number was expected: {}", value))
}

fn parse_number<N: FromStr>(value: &str) -> Result<N, Error> {
    value
        .parse::<N>()
        .map_err(|_| Error::from(format!("number was expected: {}", value)))
}

fn overrides(args: &ArgMatches<'_>) -> Result<ConfigOverrides, Error> {
    let workers = match args.value_of(WORKERS) {
        Some(workers) => Some(parse_number::<usize>(workers)?),
        None => None,
    };

    let ports = args
        .values_of(PORT)
        .map(|ports| ports.map(parse_number::<u16>).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    Ok(ConfigOverrides {
        working_dir: args.value_of(DIR).map(PathBuf::from),
        workers,
        runtime: args.value_of(RUNTIME).map(str::to_string),
        entry: args.value_of(ENTRY).map(str::to_string),
        ports,
        shell: args.value_of(SHELL).map(str::to_string),
    })
}

fn load_config(args: &ArgMatches<'_>) -> Result<LaunchConfig, Error> {
    let mut config = match args.value_of(CONFIG) {
        Some(path) => LaunchConfig::from_file(Path::new(path))?,
        None => LaunchConfig::default(),
    };

    config.apply(overrides(args)?);
    config.validate()?;

    Ok(config)
}

fn main() -> Result<(), Error> {
    let args = App::new(env!("CARGO_PKG_NAME"))
        .setup_clap_app()
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .launch_opts()
        .get_matches();

    init_logger(args.is_present(VERBOSE));

    let config = load_config(&args)?;
    let commands = config.commands();

    let spawner = ShellSpawner::new(config.shell.clone(), config.shell_flag.clone());
    let launcher = Launcher::new(spawner, config.workers).with_working_dir(config.working_dir.clone());

    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let report = runtime.block_on(launcher.run_all(commands))?;

    let failed = report.failures().count();
    info!("all {} servers have exited, {} unsuccessfully", report.len(), failed);

    if failed > 0 && args.is_present(STRICT) {
        warn!("exiting with an error, {} servers failed", failed);
        std::process::exit(1);
    }

    Ok(())
}
