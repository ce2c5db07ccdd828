//! Provides the task runner which performs background cleanups.
//!
//! A single **Scheduler** is shared by all caches of a process. It is created explicitly (most
//! probably by the [Builder](crate::builder::Builder) along with the
//! [Platform](crate::platform::Platform)) and has to be shut down once, after all caches are done
//! with it. Internally this is a small tokio runtime. Each task body is executed via
//! **spawn_blocking**, as closing files is blocking I/O which must not stall the timers.
//!
//! Once [Scheduler::shutdown](Scheduler::shutdown) has been invoked, all tasks are dropped and
//! no new tasks are accepted.
//!
//! # Examples
//!
//! ```
//! # use filecache::scheduler::Scheduler;
//! # use std::sync::atomic::{AtomicUsize, Ordering};
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! let scheduler = Scheduler::new().unwrap();
//! let counter = Arc::new(AtomicUsize::new(0));
//!
//! let task_counter = counter.clone();
//! assert_eq!(scheduler.schedule_once(Duration::from_millis(10), move || {
//!     let _ = task_counter.fetch_add(1, Ordering::SeqCst);
//! }), true);
//!
//! std::thread::sleep(Duration::from_millis(500));
//! assert_eq!(counter.load(Ordering::SeqCst), 1);
//!
//! scheduler.shutdown();
//! assert_eq!(scheduler.schedule_once(Duration::ZERO, || {}), false);
//! ```
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs delayed and periodic tasks.
pub struct Scheduler {
    runtime: Mutex<Option<Runtime>>,
    is_running: AtomicBool,
}

/// Represents a recurring task.
///
/// Dropping this will not stop the task, [cancel](Task::cancel) has to be invoked.
pub struct Task {
    handle: JoinHandle<()>,
}

impl Task {
    /// Stops the task. An execution which is currently running is completed.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Determines if the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Scheduler {
    /// Creates a new scheduler along with its worker threads.
    ///
    /// # Errors
    /// Fails if the underlying runtime cannot be started.
    pub fn new() -> anyhow::Result<Arc<Self>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(4)
            .thread_name("filecache-scheduler")
            .enable_all()
            .build()
            .context("Failed to start the scheduler runtime!")?;

        Ok(Arc::new(Scheduler {
            runtime: Mutex::new(Some(runtime)),
            is_running: AtomicBool::new(true),
        }))
    }

    /// Determines if the scheduler still accepts tasks.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Spawns the given future on the scheduler runtime.
    ///
    /// Returns **None** if the scheduler has already been shut down.
    pub fn spawn<F>(&self, future: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime
            .lock()
            .as_ref()
            .map(|runtime| runtime.spawn(future))
    }

    /// Executes the given task once after the given delay.
    ///
    /// Returns **false** if the scheduler has already been shut down.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(error) = tokio::task::spawn_blocking(task).await {
                log::error!("A scheduled task failed: {}", error);
            }
        })
        .is_some()
    }

    /// Executes the given task at the given rate. The first execution happens after one period.
    ///
    /// If an execution takes longer than the period, the missed runs are skipped. Returns
    /// **None** if the scheduler has already been shut down or if a zero period was given.
    pub fn schedule_repeating<F>(&self, period: Duration, task: F) -> Option<Task>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if period.is_zero() {
            return None;
        }

        let task = Arc::new(task);
        self.spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let _ = interval.tick().await;
                let task = task.clone();
                if let Err(error) = tokio::task::spawn_blocking(move || task()).await {
                    log::error!("A recurring task failed: {}", error);
                }
            }
        })
        .map(|handle| Task { handle })
    }

    /// Stops all tasks and the worker threads.
    ///
    /// This has to be called once near the end of the process, after all caches stopped using
    /// the scheduler. Subsequent calls are ignored.
    pub fn shutdown(&self) {
        let runtime = self.runtime.lock().take();
        self.is_running.store(false, Ordering::Release);

        match runtime {
            Some(runtime) => {
                log::info!("Stopping the scheduler...");
                runtime.shutdown_background();
            }
            None => log::warn!("The scheduler has already been shut down."),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // A runtime must not be dropped (and therefore block) within an async context...
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::Scheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn await_count(counter: &AtomicUsize, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if counter.load(Ordering::SeqCst) >= expected {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        false
    }

    #[test]
    fn repeating_tasks_run_until_cancelled() {
        let scheduler = Scheduler::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let task_counter = counter.clone();
        let task = scheduler
            .schedule_repeating(Duration::from_millis(10), move || {
                let _ = task_counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(await_count(&counter, 3), true);

        task.cancel();
        std::thread::sleep(Duration::from_millis(50));
        let runs = counter.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), runs);
        assert_eq!(task.is_finished(), true);

        scheduler.shutdown();
    }

    #[test]
    fn zero_periods_are_rejected() {
        let scheduler = Scheduler::new().unwrap();
        assert_eq!(scheduler.schedule_repeating(Duration::ZERO, || {}).is_none(), true);
    }

    #[test]
    fn panicking_tasks_do_not_stop_the_scheduler() {
        let scheduler = Scheduler::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        assert_eq!(
            scheduler.schedule_once(Duration::ZERO, || panic!("Failing on purpose...")),
            true
        );

        let task_counter = counter.clone();
        assert_eq!(
            scheduler.schedule_once(Duration::from_millis(10), move || {
                let _ = task_counter.fetch_add(1, Ordering::SeqCst);
            }),
            true
        );
        assert_eq!(await_count(&counter, 1), true);
    }

    #[test]
    fn shutdown_happens_once() {
        let scheduler = Scheduler::new().unwrap();
        assert_eq!(scheduler.is_running(), true);

        scheduler.shutdown();
        assert_eq!(scheduler.is_running(), false);
        assert_eq!(scheduler.spawn(async {}).is_none(), true);
        assert_eq!(
            scheduler
                .schedule_repeating(Duration::from_secs(1), || {})
                .is_none(),
            true
        );

        // A second shutdown is simply ignored...
        scheduler.shutdown();
        assert_eq!(scheduler.is_running(), false);
    }
}
