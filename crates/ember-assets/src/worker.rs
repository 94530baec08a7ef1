//! Job queues and the I/O and CPU worker threads.
//!
//! Each [`JobCategory`] owns one FIFO queue. The I/O and CPU queues are drained
//! by a dedicated named thread; the Gpu queue has no thread and is drained by
//! [`Workers::run_gpu_jobs`] from the pump on the owner thread.
//!
//! Gpu jobs never overlap with I/O or CPU callbacks: workers hold the shared
//! side of an execution gate while a callback runs and the pump holds the
//! exclusive side while it runs Gpu jobs. A Gpu job must therefore never wait
//! for an I/O or CPU job to finish.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::config::AssetsConfig;
use crate::error::{AssetError, AssetResult};
use crate::job::{AssetJob, JobCategory};

/// Lifecycle of a category's worker.
///
/// `Created → Running → Stopping → Drained → Stopped`. The Gpu category has no
/// thread and goes straight from `Stopping` to `Stopped` at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Queue exists, thread not started yet.
    Created,
    /// Accepting and executing jobs.
    Running,
    /// Run flag cleared; finishing the in-flight job.
    Stopping,
    /// Leftover jobs dropped.
    Drained,
    /// Thread exited (or there never was one).
    Stopped,
}

pub(crate) struct JobQueue {
    category: JobCategory,
    jobs: Mutex<VecDeque<AssetJob>>,
    available: Condvar,
    /// Requested state. Independent of `state`, which is what the worker
    /// actually reached.
    run: AtomicBool,
    state: Mutex<WorkerState>,
    state_changed: Condvar,
}

impl JobQueue {
    fn new(category: JobCategory) -> Self {
        Self {
            category,
            jobs: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            run: AtomicBool::new(true),
            state: Mutex::new(WorkerState::Created),
            state_changed: Condvar::new(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.run.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Enqueue a job. Returns `false`, dropping the job, once the queue stopped.
    fn push(&self, job: AssetJob) -> bool {
        let mut jobs = self.jobs.lock();
        // Checked under the queue lock so nothing slips in after the worker
        // drained.
        if !self.is_running() {
            return false;
        }
        jobs.push_back(job);
        drop(jobs);
        self.available.notify_one();
        true
    }

    /// Block until a job is available or the queue is stopped.
    fn next_job(&self) -> Option<AssetJob> {
        let mut jobs = self.jobs.lock();
        loop {
            if !self.is_running() {
                return None;
            }
            if let Some(job) = jobs.pop_front() {
                return Some(job);
            }
            self.available.wait(&mut jobs);
        }
    }

    fn take_all(&self) -> VecDeque<AssetJob> {
        std::mem::take(&mut *self.jobs.lock())
    }

    fn request_stop(&self) {
        {
            let _jobs = self.jobs.lock();
            self.run.store(false, Ordering::Release);
        }
        self.available.notify_all();
        self.advance(&[WorkerState::Created, WorkerState::Running], WorkerState::Stopping);
    }

    /// Drop leftover jobs and report the queue as stopped.
    fn finish(&self) {
        let dropped = self.take_all();
        if !dropped.is_empty() {
            tracing::debug!(
                "{} queue dropped {} pending job(s) on shutdown",
                self.category,
                dropped.len()
            );
        }
        drop(dropped);
        self.set_state(WorkerState::Drained);
        self.set_state(WorkerState::Stopped);
    }

    fn set_state(&self, next: WorkerState) {
        *self.state.lock() = next;
        self.state_changed.notify_all();
    }

    fn advance(&self, from: &[WorkerState], next: WorkerState) -> bool {
        let mut state = self.state.lock();
        if !from.contains(&*state) {
            return false;
        }
        *state = next;
        drop(state);
        self.state_changed.notify_all();
        true
    }

    fn wait_stopped(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while *state != WorkerState::Stopped {
            if self
                .state_changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return *state == WorkerState::Stopped;
            }
        }
        true
    }
}

/// Marks the queue stopped when the worker exits, including by panic.
struct WorkerExit<'a> {
    queue: &'a JobQueue,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(
                "{} worker panicked; closing its queue",
                self.queue.category
            );
            self.queue.request_stop();
        }
        self.queue.finish();
        tracing::debug!("{} worker stopped", self.queue.category);
    }
}

fn worker_loop(queue: Arc<JobQueue>, gate: Arc<RwLock<()>>) {
    let _exit = WorkerExit { queue: &queue };
    queue.advance(&[WorkerState::Created], WorkerState::Running);
    tracing::debug!("{} worker started", queue.category);

    while let Some(job) = queue.next_job() {
        let _shared = gate.read();
        job.run();
    }
}

/// The three job queues and the threads serving them.
pub(crate) struct Workers {
    queues: [Arc<JobQueue>; 3],
    threads: Mutex<Vec<(JobCategory, JoinHandle<()>)>>,
    /// Kept after the handles are joined, so a repeated shutdown still
    /// recognizes its own worker.
    thread_ids: Mutex<Vec<(JobCategory, ThreadId)>>,
    gate: Arc<RwLock<()>>,
}

impl Workers {
    /// Create the queues and start the I/O and CPU threads.
    pub(crate) fn spawn(config: &AssetsConfig) -> AssetResult<Self> {
        let workers = Self {
            queues: JobCategory::ALL.map(|category| Arc::new(JobQueue::new(category))),
            threads: Mutex::new(Vec::new()),
            thread_ids: Mutex::new(Vec::new()),
            gate: Arc::new(RwLock::new(())),
        };

        // The Gpu queue is serviced by the pump from the start.
        workers
            .queue(JobCategory::Gpu)
            .advance(&[WorkerState::Created], WorkerState::Running);

        for category in JobCategory::ALL {
            if !category.has_worker_thread() {
                continue;
            }

            let queue = workers.queues[category.index()].clone();
            let gate = workers.gate.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name_prefix, category))
                .spawn(move || worker_loop(queue, gate));

            match spawned {
                Ok(handle) => {
                    workers
                        .thread_ids
                        .lock()
                        .push((category, handle.thread().id()));
                    workers.threads.lock().push((category, handle));
                }
                Err(source) => {
                    tracing::error!("Failed to spawn {} worker: {}", category, source);
                    let queue = workers.queue(category);
                    queue.request_stop();
                    queue.finish();
                    if let Err(err) = workers.shutdown(config.shutdown_timeout) {
                        tracing::error!("Cleanup after failed spawn: {}", err);
                    }
                    return Err(AssetError::WorkerSpawn { category, source });
                }
            }
        }

        Ok(workers)
    }

    fn queue(&self, category: JobCategory) -> &JobQueue {
        &self.queues[category.index()]
    }

    /// Route a job to its queue. Blocking jobs go to the Gpu queue. Returns
    /// `false` if the target queue stopped and the job was dropped.
    pub(crate) fn submit(&self, job: AssetJob) -> bool {
        let category = job.target_category();
        if category != job.category() {
            tracing::trace!(
                "Rerouting blocking {} job to the {} queue",
                job.category(),
                category
            );
        }

        let accepted = self.queue(category).push(job);
        if !accepted {
            tracing::trace!("Dropping {} job: queue is not running", category);
        }
        accepted
    }

    /// Run every queued Gpu job on the calling thread, in submission order.
    ///
    /// Jobs submitted while this runs wait for the next call.
    pub(crate) fn run_gpu_jobs(&self) -> usize {
        let jobs = self.queue(JobCategory::Gpu).take_all();
        if jobs.is_empty() {
            return 0;
        }

        let _exclusive = self.gate.write();
        let count = jobs.len();
        for job in jobs {
            job.run();
        }
        count
    }

    pub(crate) fn is_running(&self, category: JobCategory) -> bool {
        self.queue(category).is_running()
    }

    pub(crate) fn state(&self, category: JobCategory) -> WorkerState {
        self.queue(category).state()
    }

    pub(crate) fn pending(&self, category: JobCategory) -> usize {
        self.queue(category).len()
    }

    /// The category whose worker is the calling thread, if any.
    fn current_worker(&self) -> Option<JobCategory> {
        let current = thread::current().id();
        self.thread_ids
            .lock()
            .iter()
            .find(|(_, id)| *id == current)
            .map(|(category, _)| *category)
    }

    /// Stop every queue and wait, up to `timeout`, for the threads to exit.
    ///
    /// Threads that stopped in time are joined; the others are detached and
    /// reported through [`AssetError::ShutdownTimeout`]. Safe to call twice.
    ///
    /// Called from inside a worker's own job, that worker is neither waited
    /// for nor joined: it exits once the job returns.
    pub(crate) fn shutdown(&self, timeout: Duration) -> AssetResult<()> {
        for queue in &self.queues {
            queue.request_stop();
        }
        self.queue(JobCategory::Gpu).finish();

        let own = self.current_worker();
        if let Some(category) = own {
            tracing::debug!(
                "Shutdown requested from the {} worker; it stops after the current job",
                category
            );
        }

        let deadline = Instant::now() + timeout;
        let stuck: Vec<JobCategory> = self
            .queues
            .iter()
            .filter(|queue| queue.category.has_worker_thread())
            .filter(|queue| Some(queue.category) != own)
            .filter(|queue| !queue.wait_stopped(deadline))
            .map(|queue| queue.category)
            .collect();

        let threads = std::mem::take(&mut *self.threads.lock());
        for (category, handle) in threads {
            if Some(category) == own {
                continue;
            }
            if stuck.contains(&category) {
                tracing::warn!("Detaching {} worker that did not stop in time", category);
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("{} worker thread panicked", category);
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            Err(AssetError::ShutdownTimeout {
                categories: stuck,
                waited: timeout,
            })
        }
    }
}
