// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::error::ErrorKind;
use crate::Error;

/// A fixed number of execution slots for independent tasks
///
/// Every submitted task is spawned onto the runtime right away, but only makes progress once it holds
///   one of the `workers` permits, anything beyond that queues in submission order.
///
/// Lifecycle is submit* -> close -> join.
pub struct WorkerPool<T> {
    permits: Arc<Semaphore>,
    workers: usize,
    tasks: Vec<JoinHandle<T>>,
    closed: bool,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(workers: usize) -> Result<Self, Error> {
        if workers == 0 {
            return Err(ErrorKind::InvalidConfig("a pool needs at least one worker".to_string()).into());
        }

        Ok(Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            tasks: Vec::new(),
            closed: false,
        })
    }

    /// Schedule the task, must be called from within a tokio runtime
    pub fn submit<F>(&mut self, task: F) -> Result<(), Error>
    where
        F: Future<Output = T> + Send + 'static,
    {
        if self.closed {
            return Err(ErrorKind::PoolClosed.into());
        }

        let permits = Arc::clone(&self.permits);
        let id = self.tasks.len();
        let handle = tokio::spawn(async move {
            // the semaphore is never closed, so acquire can not fail
            let _permit = permits.acquire_owned().await.ok();
            trace!("pool task {} acquired a worker", id);
            task.await
        });

        self.tasks.push(handle);
        Ok(())
    }

    /// Refuse any further submissions
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Wait for every submitted task, results are in submission order
    ///
    /// A task that panicked is reported as an error in its own slot, the others are unaffected.
    pub async fn join(&mut self) -> Result<Vec<Result<T, Error>>, Error> {
        if !self.closed {
            return Err(ErrorKind::PoolNotClosed.into());
        }

        let tasks = std::mem::take(&mut self.tasks);
        let results = join_all(tasks).await;

        Ok(results
            .into_iter()
            .map(|r| r.map_err(Error::from))
            .collect())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of submitted tasks not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
