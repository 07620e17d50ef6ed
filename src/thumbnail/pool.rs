use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};
use log::{error, trace};

pub const MIN_WORKERS: usize = 2;
pub const MAX_WORKERS: usize = 8;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker count for a requested size, or for the machine when unset.
pub fn pool_size(requested: Option<usize>) -> usize {
    requested
        .unwrap_or_else(num_cpus::get)
        .clamp(MIN_WORKERS, MAX_WORKERS)
}

/// Fixed set of named threads sharing one job queue.
///
/// Jobs already queued still run after [`shutdown`](Self::shutdown); callers
/// that want them skipped check their own flag at the start of the job.
pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.clamp(MIN_WORKERS, MAX_WORKERS);
        let (tx, rx) = unbounded::<Job>();

        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("cadenza-thumb-{id}"))
                .spawn(move || {
                    trace!("thumbnail worker {id} started");
                    for job in rx.iter() {
                        // One bad file must not take a worker down with it.
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            error!("thumbnail worker {id}: job panicked");
                        }
                    }
                    trace!("thumbnail worker {id} stopped");
                })?;
            handles.push(handle);
        }

        trace!("thumbnail pool: {size} worker(s)");
        Ok(Self {
            tx: Some(tx),
            handles,
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `job`. Returns `false` once the pool has been shut down.
    pub fn execute<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.tx {
            Some(tx) => tx.send(Box::new(job)).is_ok(),
            None => false,
        }
    }

    /// Close the queue and wait for the workers to run it dry.
    pub fn shutdown(&mut self) {
        if self.tx.take().is_none() {
            return;
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        trace!("thumbnail pool: stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
