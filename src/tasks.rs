//! Background execution of analysis runs.
//!
//! A [`TaskHandle`] wraps one unit of work plus its lifecycle
//! (`Idle → Scheduled → Running → Completed | Failed`); a [`TaskRunner`] puts
//! it on a worker thread. Handles are single-use: terminal states are final
//! and a fresh handle is created for every run.
//!
//! [`TaskRunner::run`] on a handle that carries an argument holds the calling
//! (owner) thread in a cooperative wait: it drains the owner's own pending
//! work, checks the worker, sleeps a few milliseconds, and repeats until the
//! worker is terminal. The caller appears blocked while the presentation
//! surface stays responsive. There is no cancellation or timeout: a hung
//! worker keeps its handle non-terminal forever, a known limitation of this
//! design.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard},
    thread,
    time::Duration,
};

use thiserror::Error;

use crate::status_log::LogSink;

/// Argument handed to a work function, when the caller supplied one.
pub type TaskArg = Box<dyn Any + Send>;

/// Work executed on the worker thread. Errors are reported as strings, the
/// same shape worker results take everywhere else in the app.
pub type WorkFn = Box<dyn FnOnce(Option<TaskArg>) -> Result<(), String> + Send + 'static>;

/// How long the blocking wait sleeps between completion checks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4);

/// Observable lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Error or panic captured from a work function.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("worker failed: {message}")]
pub struct WorkerFailure {
    pub message: String,
}

/// Failures surfaced by [`TaskRunner`] itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// The handle already left `Idle`; a new run needs a new handle.
    #[error("task handle already started; create a new handle for another run")]
    AlreadyStarted,
    /// The work function failed; also retrievable via [`TaskHandle::failure`].
    #[error(transparent)]
    Worker(#[from] WorkerFailure),
}

enum Phase {
    Idle,
    Scheduled,
    Running,
    Completed,
    Failed(WorkerFailure),
}

struct TaskShared {
    phase: Mutex<Phase>,
}

impl TaskShared {
    fn set(&self, phase: Phase) {
        *lock_recovering(&self.phase) = phase;
    }
}

/// One schedulable unit of work. Owned by the caller that created it and not
/// shared across runs.
pub struct TaskHandle {
    shared: Arc<TaskShared>,
    work: Option<WorkFn>,
    arg: Option<TaskArg>,
}

impl TaskHandle {
    /// Handle with no argument; [`TaskRunner::run`] treats it fire-and-forget.
    pub fn new(
        work: impl FnOnce(Option<TaskArg>) -> Result<(), String> + Send + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(TaskShared {
                phase: Mutex::new(Phase::Idle),
            }),
            work: Some(Box::new(work)),
            arg: None,
        }
    }

    /// Handle carrying an argument; [`TaskRunner::run`] waits for completion.
    pub fn with_arg(
        work: impl FnOnce(Option<TaskArg>) -> Result<(), String> + Send + 'static,
        arg: impl Any + Send,
    ) -> Self {
        let mut handle = Self::new(work);
        handle.arg = Some(Box::new(arg));
        handle
    }

    pub fn state(&self) -> TaskState {
        match &*lock_recovering(&self.shared.phase) {
            Phase::Idle => TaskState::Idle,
            Phase::Scheduled => TaskState::Scheduled,
            Phase::Running => TaskState::Running,
            Phase::Completed => TaskState::Completed,
            Phase::Failed(_) => TaskState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// The captured failure, once the handle is `Failed`.
    pub fn failure(&self) -> Option<WorkerFailure> {
        match &*lock_recovering(&self.shared.phase) {
            Phase::Failed(failure) => Some(failure.clone()),
            _ => None,
        }
    }

    fn has_arg(&self) -> bool {
        self.arg.is_some()
    }

    /// Move the work and argument out exactly once.
    fn take_work(&mut self) -> Result<(WorkFn, Option<TaskArg>), TaskError> {
        let work = self.work.take().ok_or(TaskError::AlreadyStarted)?;
        Ok((work, self.arg.take()))
    }
}

/// Schedules handles on worker threads and reports their failures to the
/// status log.
pub struct TaskRunner {
    sink: Arc<LogSink>,
    poll_interval: Duration,
}

impl TaskRunner {
    pub fn new(sink: Arc<LogSink>) -> Self {
        Self {
            sink,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the wait-loop poll interval. Mainly for tests.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start the handle on a worker thread and return immediately.
    pub fn schedule(&self, handle: &mut TaskHandle) -> Result<(), TaskError> {
        let (work, arg) = handle.take_work()?;
        let shared = handle.shared.clone();
        let sink = self.sink.clone();
        shared.set(Phase::Scheduled);
        thread::spawn(move || {
            shared.set(Phase::Running);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(arg)));
            match outcome {
                Ok(Ok(())) => shared.set(Phase::Completed),
                Ok(Err(message)) => fail(&shared, &sink, message),
                Err(payload) => fail(&shared, &sink, panic_message(payload)),
            }
        });
        Ok(())
    }

    /// Start the handle and, when it carries an argument, wait for it to reach
    /// a terminal state before returning.
    ///
    /// While waiting, the calling thread alternates between `pump` (the
    /// owner's own pending work: delivering status entries, servicing the
    /// event queue) and checking the worker, with a short sleep in between.
    /// Without an argument this is equivalent to [`TaskRunner::schedule`].
    ///
    /// A worker failure is returned here and stays readable on the handle.
    pub fn run(&self, handle: &mut TaskHandle, pump: &mut dyn FnMut()) -> Result<(), TaskError> {
        let wait = handle.has_arg();
        self.schedule(handle)?;
        if !wait {
            return Ok(());
        }
        loop {
            pump();
            if handle.is_terminal() {
                break;
            }
            thread::sleep(self.poll_interval);
        }
        // One more drain so entries posted just before the terminal
        // transition reach the target before the caller resumes.
        pump();
        match handle.failure() {
            Some(failure) => Err(TaskError::Worker(failure)),
            None => Ok(()),
        }
    }
}

fn fail(shared: &TaskShared, sink: &LogSink, message: String) {
    tracing::error!("background task failed: {message}");
    sink.error(format!("Analysis failed: {message}"));
    shared.set(Phase::Failed(WorkerFailure { message }));
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Instant,
    };

    fn runner() -> TaskRunner {
        TaskRunner::new(Arc::new(LogSink::new())).with_poll_interval(Duration::from_millis(1))
    }

    fn wait_terminal(handle: &TaskHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_terminal() {
            assert!(Instant::now() < deadline, "task never reached a terminal state");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn new_handle_starts_idle() {
        let handle = TaskHandle::new(|_| Ok(()));
        assert_eq!(handle.state(), TaskState::Idle);
        assert!(handle.failure().is_none());
    }

    #[test]
    fn schedule_runs_work_without_blocking_caller() {
        let mut handle = TaskHandle::new(|_| {
            thread::sleep(Duration::from_millis(30));
            Ok(())
        });
        let started = Instant::now();
        runner().schedule(&mut handle).unwrap();
        assert!(
            started.elapsed() < Duration::from_millis(25),
            "schedule must return before the worker finishes"
        );
        wait_terminal(&handle);
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn run_with_arg_blocks_until_terminal() {
        let nap = Duration::from_millis(40);
        let mut handle = TaskHandle::with_arg(
            move |arg| {
                let nap = *arg.unwrap().downcast::<Duration>().unwrap();
                thread::sleep(nap);
                Ok(())
            },
            nap,
        );
        let started = Instant::now();
        runner().run(&mut handle, &mut || {}).unwrap();
        assert!(started.elapsed() >= nap, "run returned before the worker finished");
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn run_without_arg_is_fire_and_forget() {
        let mut handle = TaskHandle::new(|_| {
            thread::sleep(Duration::from_millis(30));
            Ok(())
        });
        let started = Instant::now();
        runner().run(&mut handle, &mut || {}).unwrap();
        assert!(started.elapsed() < Duration::from_millis(25));
        wait_terminal(&handle);
    }

    #[test]
    fn wait_loop_keeps_pumping_owner_work() {
        let pumps = AtomicUsize::new(0);
        let mut handle = TaskHandle::with_arg(
            |_| {
                thread::sleep(Duration::from_millis(30));
                Ok(())
            },
            (),
        );
        runner()
            .run(&mut handle, &mut || {
                pumps.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert!(
            pumps.load(Ordering::Relaxed) >= 2,
            "owner work must be drained repeatedly during the wait"
        );
    }

    #[test]
    fn failing_work_is_captured_not_dropped() {
        let mut handle = TaskHandle::with_arg(|_| Err("no labeled rows".to_string()), ());
        let err = runner().run(&mut handle, &mut || {}).unwrap_err();
        assert_eq!(
            err,
            TaskError::Worker(WorkerFailure {
                message: "no labeled rows".to_string()
            })
        );
        assert_eq!(handle.state(), TaskState::Failed);
        assert_eq!(handle.failure().unwrap().message, "no labeled rows");
    }

    #[test]
    fn panicking_work_fails_the_handle_and_wait_terminates() {
        let mut handle = TaskHandle::with_arg(|_| panic!("split produced empty test set"), ());
        let err = runner().run(&mut handle, &mut || {}).unwrap_err();
        let TaskError::Worker(failure) = err else {
            panic!("expected a worker failure");
        };
        assert!(failure.message.contains("split produced empty test set"));
        assert_eq!(handle.state(), TaskState::Failed);
    }

    #[test]
    fn failure_posts_an_error_entry_to_the_sink() {
        let sink = Arc::new(LogSink::new());
        let runner = TaskRunner::new(sink.clone()).with_poll_interval(Duration::from_millis(1));
        let mut handle = TaskHandle::with_arg(|_| Err("boom".to_string()), ());
        let _ = runner.run(&mut handle, &mut || {});
        assert!(sink.pending_len() >= 1, "worker failure must reach the status log");
    }

    #[test]
    fn handle_is_single_use() {
        let mut handle = TaskHandle::new(|_| Ok(()));
        let runner = runner();
        runner.schedule(&mut handle).unwrap();
        assert_eq!(runner.schedule(&mut handle), Err(TaskError::AlreadyStarted));
        wait_terminal(&handle);
        assert_eq!(
            runner.run(&mut handle, &mut || {}),
            Err(TaskError::AlreadyStarted)
        );
    }

    #[test]
    fn independent_handles_finish_independently() {
        let runner = runner();
        let mut ok = TaskHandle::new(|_| {
            thread::sleep(Duration::from_millis(10));
            Ok(())
        });
        let mut bad = TaskHandle::new(|_| Err("one of two failed".to_string()));
        runner.schedule(&mut ok).unwrap();
        runner.schedule(&mut bad).unwrap();
        wait_terminal(&ok);
        wait_terminal(&bad);
        assert_eq!(ok.state(), TaskState::Completed);
        assert_eq!(bad.state(), TaskState::Failed);
        assert!(ok.failure().is_none());
    }
}
