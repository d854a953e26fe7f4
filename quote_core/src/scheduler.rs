//! Recurring task scheduling with explicit cancel handles.
//!
//! `ThreadScheduler` drives tasks from a background thread using a crossbeam `tick`
//! channel and stops as soon as the handle is cancelled. `ManualScheduler` only runs
//! tasks when `tick()` is called, so tests can drive a periodic sync deterministically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, tick};
use log::{debug, warn};

/// Work run on every tick.
pub type Task = Box<dyn FnMut() + Send>;

/// Something able to run a task periodically.
pub trait Scheduler {
    /// Run `task` every `interval` until the returned handle is cancelled.
    fn schedule_every(&self, interval: Duration, task: Task) -> TaskHandle;
}

/// Cancel handle of a scheduled task. Dropping the handle cancels the task.
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Stop the task. Waits for a running tick to finish; calling it twice is a no-op.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Scheduled task panicked");
            }
        }
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs each task on its own background thread.
#[derive(Debug, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule_every(&self, interval: Duration, mut task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let flag = Arc::clone(&cancelled);

        let worker = thread::spawn(move || {
            let ticker = tick(interval);
            debug!("Recurring task started, every {:?}", interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        if flag.load(Ordering::SeqCst) {
                            break;
                        }
                        task();
                    }
                }
            }
            debug!("Recurring task stopped");
        });

        TaskHandle {
            cancelled,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        }
    }
}

struct ManualEntry {
    cancelled: Arc<AtomicBool>,
    interval: Duration,
    task: Task,
}

/// Runs tasks only when told to.
#[derive(Default)]
pub struct ManualScheduler {
    entries: Mutex<Vec<ManualEntry>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every live task once and return how many ran. Cancelled tasks are dropped.
    pub fn tick(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        entries.retain(|entry| !entry.cancelled.load(Ordering::SeqCst));
        for entry in entries.iter_mut() {
            (entry.task)();
        }
        entries.len()
    }

    /// Intervals of the live tasks, in scheduling order.
    pub fn intervals(&self) -> Vec<Duration> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| !e.cancelled.load(Ordering::SeqCst))
                    .map(|e| e.interval)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_every(&self, interval: Duration, task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(ManualEntry {
                cancelled: Arc::clone(&cancelled),
                interval,
                task,
            });
        }
        TaskHandle {
            cancelled,
            stop_tx: None,
            worker: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn manual_ticks_run_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut handle = scheduler.schedule_every(Duration::from_secs(30), counting_task(&counter));

        assert_eq!(scheduler.intervals(), vec![Duration::from_secs(30)]);
        assert_eq!(scheduler.tick(), 1);
        assert_eq!(scheduler.tick(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.tick(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn thread_scheduler_runs_and_stops() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut handle =
            ThreadScheduler.schedule_every(Duration::from_millis(10), counting_task(&counter));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) < 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.cancel();
        let after_cancel = counter.load(Ordering::SeqCst);
        assert!(after_cancel >= 2);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), after_cancel);
        handle.cancel();
    }

    #[test]
    fn dropping_the_handle_stops_the_task() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        drop(scheduler.schedule_every(Duration::from_secs(1), counting_task(&counter)));
        assert_eq!(scheduler.tick(), 0);

        let handle = ThreadScheduler.schedule_every(Duration::from_millis(5), counting_task(&counter));
        drop(handle);
        let after_drop = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), after_drop);
    }
}
