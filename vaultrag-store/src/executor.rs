use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use vaultrag_common::error::AppError;

type Job<R> = Box<dyn FnOnce(&mut R) + Send>;

/// Serializes access to a thread-confined resource `R` (a database
/// connection) onto a fixed pool of dedicated OS threads. The row-oriented
/// backend must use exactly one worker so SQLite only ever sees a single
/// writer; the column-oriented backend may use more since it tolerates
/// concurrent readers.
///
/// The connection is opened on, and never leaves, its worker thread, so
/// `!Sync` connection types are safe to drive from an async caller.
pub struct Executor<R> {
    sender: mpsc::Sender<Job<R>>,
    _workers: Vec<JoinHandle<()>>,
}

impl<R: 'static> Executor<R> {
    /// Spawns `worker_count` threads, each calling `make_resource` once to
    /// obtain its own connection before entering the job loop. Blocks until
    /// every worker has reported back from its `make_resource` call, so a
    /// connection failure (bad path, missing extension) surfaces here
    /// rather than as a later `submit` failure once the worker has already
    /// panicked out from under it.
    pub fn new<F>(worker_count: usize, make_resource: F) -> Result<Self, AppError>
    where
        F: Fn() -> Result<R, AppError> + Send + Sync + 'static,
    {
        assert!(worker_count > 0, "executor requires at least one worker");
        let (sender, receiver) = mpsc::channel::<Job<R>>();
        let receiver = Arc::new(Mutex::new(receiver));
        let make_resource = Arc::new(make_resource);

        let mut workers = Vec::with_capacity(worker_count);
        let mut init_err = None;

        for _ in 0..worker_count {
            let receiver = Arc::clone(&receiver);
            let make_resource = Arc::clone(&make_resource);
            let (init_tx, init_rx) = mpsc::channel::<Result<(), AppError>>();

            let handle = std::thread::spawn(move || {
                let mut resource = match make_resource() {
                    Ok(resource) => {
                        let _ = init_tx.send(Ok(()));
                        resource
                    }
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                loop {
                    let job = {
                        let guard = receiver.lock().unwrap_or_else(|e| e.into_inner());
                        guard.recv()
                    };
                    match job {
                        Ok(job) => job(&mut resource),
                        Err(_) => break,
                    }
                }
            });

            match init_rx.recv() {
                Ok(Ok(())) => workers.push(handle),
                Ok(Err(e)) => {
                    init_err.get_or_insert(e);
                    let _ = handle.join();
                }
                Err(_) => {
                    init_err.get_or_insert(AppError::StoreIOError(
                        "store worker thread exited before reporting init result".into(),
                    ));
                    let _ = handle.join();
                }
            }
        }

        if let Some(e) = init_err {
            // Dropping `sender` unblocks any already-running workers waiting
            // on `recv`, so they shut down instead of leaking.
            drop(sender);
            for handle in workers {
                let _ = handle.join();
            }
            return Err(e);
        }

        Ok(Self {
            sender,
            _workers: workers,
        })
    }

    /// Submits `f` and awaits its result. `f` runs entirely on a worker
    /// thread against the thread-confined resource; nothing here blocks the
    /// calling async task.
    pub async fn submit<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut R) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let job: Job<R> = Box::new(move |resource| {
            let _ = tx.send(f(resource));
        });
        self.sender
            .send(job)
            .map_err(|_| AppError::StoreIOError("store executor has shut down".into()))?;
        rx.await
            .map_err(|_| AppError::StoreIOError("store executor worker dropped its response".into()))?
    }

    /// Submits a read built by `make_job`, retrying once if the first
    /// attempt fails with a transient store I/O error. `make_job` is called
    /// again to produce a fresh job for the retry since a job is consumed
    /// by the `submit` it's given to.
    pub async fn submit_with_read_retry<G, F, T>(&self, make_job: G) -> Result<T, AppError>
    where
        G: Fn() -> F,
        F: FnOnce(&mut R) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        match self.submit(make_job()).await {
            Err(e) if e.is_transient_io() => self.submit(make_job()).await,
            other => other,
        }
    }

    /// Submits `f` but gives up waiting after `deadline`. The in-flight job
    /// still runs to completion on its worker thread so on-disk state never
    /// ends up half-applied; only the result is discarded.
    pub async fn submit_with_deadline<F, T>(
        &self,
        deadline: std::time::Duration,
        f: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(&mut R) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(deadline, self.submit(f)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(deadline)),
        }
    }
}
