//! Background jobs and their categories.

use std::fmt;

/// Which execution context may run a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobCategory {
    /// File and network reads, on the I/O worker thread.
    Io,
    /// Decoding and other CPU-heavy work, on the CPU worker thread.
    Cpu,
    /// Graphics-context work, run by the pump on the owner thread.
    Gpu,
}

/// Category that blocking jobs are rerouted to.
pub const BLOCKING_CATEGORY: JobCategory = JobCategory::Gpu;

impl JobCategory {
    pub const ALL: [JobCategory; 3] = [JobCategory::Io, JobCategory::Cpu, JobCategory::Gpu];

    pub const fn index(self) -> usize {
        match self {
            JobCategory::Io => 0,
            JobCategory::Cpu => 1,
            JobCategory::Gpu => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            JobCategory::Io => "io",
            JobCategory::Cpu => "cpu",
            JobCategory::Gpu => "gpu",
        }
    }

    /// Whether this category owns a background thread. Gpu jobs only run
    /// inside the pump.
    pub const fn has_worker_thread(self) -> bool {
        !matches!(self, JobCategory::Gpu)
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unit of work submitted to one of the job queues.
///
/// The payload is whatever the callback captures. Jobs are fire-and-forget:
/// nothing is reported back to the submitter, so a callback that can fail
/// must deal with its own errors.
pub struct AssetJob {
    category: JobCategory,
    blocking: bool,
    callback: Box<dyn FnOnce() + Send + 'static>,
}

impl AssetJob {
    pub fn new(category: JobCategory, callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            category,
            blocking: false,
            callback: Box::new(callback),
        }
    }

    /// Build a job from an explicit payload and a plain function.
    pub fn with_payload<T: Send + 'static>(
        category: JobCategory,
        payload: T,
        callback: fn(T),
    ) -> Self {
        Self::new(category, move || callback(payload))
    }

    pub fn io(callback: impl FnOnce() + Send + 'static) -> Self {
        Self::new(JobCategory::Io, callback)
    }

    pub fn cpu(callback: impl FnOnce() + Send + 'static) -> Self {
        Self::new(JobCategory::Cpu, callback)
    }

    pub fn gpu(callback: impl FnOnce() + Send + 'static) -> Self {
        Self::new(JobCategory::Gpu, callback)
    }

    /// Mark the job as blocking: it will run on the owner thread during the
    /// pump whatever its stated category.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn category(&self) -> JobCategory {
        self.category
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// The queue this job actually goes to.
    pub fn target_category(&self) -> JobCategory {
        if self.blocking {
            BLOCKING_CATEGORY
        } else {
            self.category
        }
    }

    pub(crate) fn run(self) {
        (self.callback)()
    }
}

impl fmt::Debug for AssetJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetJob")
            .field("category", &self.category)
            .field("blocking", &self.blocking)
            .finish_non_exhaustive()
    }
}
