// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::command::ShellCommand;
use crate::error::ErrorKind;
use crate::pool::WorkerPool;
use crate::procs::{Outcome, Spawner};
use crate::Error;

/// Launch programs
///
/// Rules:
/// - starts every command exactly once, no retries and no restarts
/// - at most `workers` commands run at the same time, the rest queue
/// - the working directory is resolved once and handed to each command, the launcher's own
///   current directory is never changed
/// - a failing command never stops the others, and never fails the launch
pub struct Launcher<S: Spawner> {
    spawner: Arc<S>,
    workers: usize,
    working_dir: Option<PathBuf>,
}

impl<S: Spawner> Launcher<S> {
    pub fn new(spawner: S, workers: usize) -> Self {
        Self {
            spawner: Arc::new(spawner),
            workers,
            working_dir: None,
        }
    }

    /// Directory for every command that doesn't already carry one
    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    fn resolve_working_dir(&self) -> Result<Option<PathBuf>, Error> {
        let dir = match self.working_dir {
            Some(ref dir) => dir,
            None => return Ok(None),
        };

        let resolved = dir.canonicalize().map_err(|source| ErrorKind::WorkingDir {
            path: dir.clone(),
            source,
        })?;

        if !resolved.is_dir() {
            return Err(ErrorKind::WorkingDir {
                path: dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
            }
            .into());
        }

        Ok(Some(resolved))
    }

    /// Run every command on the pool and wait for all of them to exit
    ///
    /// The only error returned is an unusable working directory, detected before anything is
    ///   started. Everything that happens to the individual commands is in the `Report`.
    pub async fn run_all(&self, commands: Vec<ShellCommand>) -> Result<Report, Error> {
        let working_dir = self.resolve_working_dir()?;
        if let Some(ref dir) = working_dir {
            info!("launching {} commands in {}", commands.len(), dir.display());
        }

        let mut pool = WorkerPool::new(self.workers)?;
        let mut submitted = Vec::with_capacity(commands.len());

        for command in commands {
            let command = attach_dir(command, working_dir.as_deref());

            let spawner = Arc::clone(&self.spawner);
            let task_command = command.clone();
            pool.submit(async move {
                let result = spawner.run(&task_command).await;
                log_result(&task_command, &result);
                result
            })?;

            submitted.push(command);
        }

        pool.close();
        let results = pool.join().await?;

        let entries = submitted
            .into_iter()
            .zip(results)
            .map(|(command, result)| (command, Outcome::from(result.and_then(|r| r))))
            .collect();

        Ok(Report { entries })
    }
}

fn attach_dir(command: ShellCommand, dir: Option<&Path>) -> ShellCommand {
    match dir {
        Some(dir) if command.working_dir().is_none() => command.with_working_dir(dir),
        _ => command,
    }
}

fn log_result(command: &ShellCommand, result: &Result<std::process::ExitStatus, Error>) {
    match result {
        Ok(status) if status.success() => info!("exited successfully: {}", command),
        Ok(status) => warn!("exited with {}: {}", status, command),
        Err(err) => error!("failed to run: {}: {}", command, err),
    }
}

/// The outcome of every launched command, in submission order
#[derive(Debug)]
pub struct Report {
    entries: Vec<(ShellCommand, Outcome)>,
}

impl Report {
    pub fn entries(&self) -> &[(ShellCommand, Outcome)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|(_, outcome)| outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &(ShellCommand, Outcome)> {
        self.entries
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Records every command and pretends to run it for a moment
    #[derive(Default)]
    struct RecordingSpawner {
        seen: Mutex<Vec<ShellCommand>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Spawner for RecordingSpawner {
        async fn run(&self, command: &ShellCommand) -> Result<ExitStatus, Error> {
            self.seen.lock().unwrap().push(command.clone());

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if command.line().contains("malformed") {
                return Err(Error::from("failed to spawn process"));
            }

            let code = if command.line().ends_with("8002") { 1 } else { 0 };
            Ok(ExitStatus::from_raw(code << 8))
        }
    }

    fn server_commands() -> Vec<ShellCommand> {
        [8001, 8002, 8003]
            .iter()
            .map(|port| ShellCommand::server("go", "main/main.go", *port))
            .collect()
    }

    #[tokio::test]
    async fn test_each_port_spawned_once() {
        let launcher = Launcher::new(RecordingSpawner::default(), 3);
        let report = launcher.run_all(server_commands()).await.unwrap();

        let mut seen: Vec<String> = launcher
            .spawner()
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.line().to_string())
            .collect();
        seen.sort();

        assert_eq!(
            seen,
            vec![
                "go run main/main.go -port 8001",
                "go run main/main.go -port 8002",
                "go run main/main.go -port 8003",
            ]
        );

        // wait-all only returns once every spawn has returned
        assert_eq!(launcher.spawner().running.load(Ordering::SeqCst), 0);
        assert_eq!(report.len(), 3);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported_not_raised() {
        let launcher = Launcher::new(RecordingSpawner::default(), 3);
        let report = launcher.run_all(server_commands()).await.unwrap();

        assert!(!report.all_succeeded());
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.line(), "go run main/main.go -port 8002");
        assert_eq!(failures[0].1.exit_status().and_then(|s| s.code()), Some(1));
    }

    #[tokio::test]
    async fn test_malformed_command_does_not_stop_others() {
        let mut commands = server_commands();
        commands.insert(1, ShellCommand::new("malformed"));

        let launcher = Launcher::new(RecordingSpawner::default(), 3);
        let report = launcher.run_all(commands).await.unwrap();

        assert_eq!(report.len(), 4);
        assert!(matches!(report.entries()[1].1, Outcome::Failed(_)));
        assert!(report.entries()[0].1.is_success());
        assert!(report.entries()[3].1.is_success());
        assert_eq!(launcher.spawner().seen.lock().unwrap().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fourth_command_queues() {
        let mut commands = server_commands();
        commands.push(ShellCommand::server("go", "main/main.go", 8004));

        let launcher = Launcher::new(RecordingSpawner::default(), 3);
        let report = launcher.run_all(commands).await.unwrap();

        assert_eq!(report.len(), 4);
        assert!(launcher.spawner().peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_single_worker_is_sequential() {
        let launcher = Launcher::new(RecordingSpawner::default(), 1);
        launcher.run_all(server_commands()).await.unwrap();

        assert_eq!(launcher.spawner().peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_working_dir_attached_to_every_command() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();

        let launcher = Launcher::new(RecordingSpawner::default(), 3).with_working_dir(dir.path());
        let report = launcher.run_all(server_commands()).await.unwrap();

        for (command, _) in report.entries() {
            assert_eq!(command.working_dir(), Some(expected.as_path()));
        }
        for command in launcher.spawner().seen.lock().unwrap().iter() {
            assert_eq!(command.working_dir(), Some(expected.as_path()));
        }
    }

    #[tokio::test]
    async fn test_explicit_command_dir_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let own = tempfile::tempdir().unwrap();

        let commands = vec![ShellCommand::new("true").with_working_dir(own.path())];
        let launcher = Launcher::new(RecordingSpawner::default(), 1).with_working_dir(dir.path());
        let report = launcher.run_all(commands).await.unwrap();

        assert_eq!(report.entries()[0].0.working_dir(), Some(own.path()));
    }

    #[tokio::test]
    async fn test_bad_working_dir_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let launcher = Launcher::new(RecordingSpawner::default(), 3).with_working_dir(&missing);
        let err = launcher.run_all(server_commands()).await.unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::WorkingDir { .. }));
        assert!(launcher.spawner().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_workers_is_rejected() {
        let launcher = Launcher::new(RecordingSpawner::default(), 0);
        assert!(launcher.run_all(server_commands()).await.is_err());
    }
}
