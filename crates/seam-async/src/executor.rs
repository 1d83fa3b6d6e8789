//! The native worker pool.
//!
//! Jobs are fed to a fixed set of named worker threads over a channel.
//! Every job runs behind the boundary guard, so a panicking job never takes
//! a worker down; its ticket resolves to [`AsyncError::Abandoned`] instead.
//! Dropping the executor closes the channel, lets the workers drain what is
//! queued, and joins them.

use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle, Thread, ThreadId};

use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::OnceCell;
use seam_core::config::{self, ExecutorConfig};
use seam_core::envelope::{BoundaryError, ResultEnvelope};
use seam_core::guard;
use seam_core::protocol;

use crate::error::{AsyncError, Result};
use crate::ticket::{ticket, AsyncTicket};

type Job = Box<dyn FnOnce() + Send + 'static>;

static GLOBAL: OnceCell<Executor> = OnceCell::new();

/// A fixed pool of named worker threads.
pub struct Executor {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    worker_ids: Vec<ThreadId>,
    thread_name: String,
    completed: Arc<AtomicU64>,
}

impl Executor {
    /// Start `workers` threads named `<thread_name>-<index>`.
    pub fn new(workers: usize, thread_name: &str) -> Result<Self> {
        if workers == 0 {
            return Err(AsyncError::Config {
                detail: "executor needs at least one worker".to_string(),
            });
        }

        let (sender, receiver) = unbounded::<Job>();
        let completed = Arc::new(AtomicU64::new(0));
        let mut executor = Executor {
            sender: Some(sender),
            workers: Vec::with_capacity(workers),
            worker_ids: Vec::with_capacity(workers),
            thread_name: thread_name.to_string(),
            completed: Arc::clone(&completed),
        };

        for index in 0..workers {
            let name = format!("{thread_name}-{index}");
            let receiver = receiver.clone();
            let completed = Arc::clone(&completed);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(receiver, completed))
                .map_err(|e| AsyncError::Spawn {
                    name,
                    detail: e.to_string(),
                })?;
            executor.worker_ids.push(handle.thread().id());
            executor.workers.push(handle);
        }

        tracing::debug!(workers, thread_name, "executor started");
        Ok(executor)
    }

    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        Self::new(config.workers, &config.thread_name)
    }

    /// The process-wide executor, started from the installed configuration
    /// on first use.
    pub fn global() -> Result<&'static Executor> {
        GLOBAL.get_or_try_init(|| Executor::from_config(&config::current().executor))
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Jobs run to completion or to a caught panic so far.
    pub fn completed_jobs(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Queue a job with no result.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(AsyncError::ShutDown)?;
        sender.send(Box::new(job)).map_err(|_| AsyncError::ShutDown)
    }

    /// Run `f` on a worker and return a ticket for its value.
    ///
    /// If `f` panics, or the executor has shut down, the ticket resolves to
    /// [`AsyncError::Abandoned`].
    pub fn spawn<T, F>(&self, f: F) -> AsyncTicket<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (ticket, completer) = ticket();
        if let Err(error) = self.execute(move || completer.complete(f())) {
            tracing::warn!(%error, "job rejected");
        }
        ticket
    }

    /// Run a fallible `f` on a worker; its outcome, including a panic as
    /// `E::PANIC`, travels in a [`ResultEnvelope`].
    pub fn spawn_checked<T, E, F>(&self, site: &'static str, f: F) -> AsyncTicket<ResultEnvelope<T, E>>
    where
        T: Send + 'static,
        E: BoundaryError + fmt::Debug + Send + 'static,
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    {
        self.spawn(move || guard::boundary(site, f))
    }

    /// Drive a future to completion on a worker.
    pub fn spawn_future<F>(&self, future: F) -> AsyncTicket<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.spawn(move || block_on(future))
    }

    /// Stop accepting jobs, drain the queue, and join the workers.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        let current = thread::current().id();
        for (handle, id) in self.workers.drain(..).zip(self.worker_ids.drain(..)) {
            if id == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!(thread_name = %self.thread_name, "worker thread panicked");
            }
        }
        tracing::debug!(thread_name = %self.thread_name, "executor shut down");
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("thread_name", &self.thread_name)
            .field("workers", &self.workers.len())
            .field("running", &self.sender.is_some())
            .finish()
    }
}

fn worker_loop(receiver: Receiver<Job>, completed: Arc<AtomicU64>) {
    for job in receiver.iter() {
        // A panic drops the job's completer, abandoning its ticket. A protocol
        // violation ends the process.
        let _ = protocol::abort_on_violation(|| guard::catch("executor job", job));
        completed.fetch_add(1, Ordering::Relaxed);
    }
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Poll `future` on the current thread, parking between wakeups.
fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);
    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            Poll::Pending => thread::park(),
        }
    }
}
