//! Cooperative time-sliced task scheduler.
//!
//! Long-running generation work is chopped into small work-function
//! invocations organized as a stack of subtasks per task, like a call stack.
//! The host owns the loop: [`Scheduler::step`] runs work-function iterations
//! until the unbroken-execution budget is spent, then returns a
//! [`StepStatus`] and hands control back. Between slices the host sleeps,
//! pumps its UI, collects finished results, or cancels.
//!
//! Work functions advance their state a little on each invocation, push
//! nested subtasks with [`SteppedTask::execute_subaction`], collect finished
//! children with [`SteppedTask::get_result`], and finish by calling
//! [`SteppedTask::provide_result`]. Panics in work functions are not caught.

use std::any::Any;
use std::time::{Duration, Instant};

/// Default unbroken-execution budget per time slice.
pub const DEFAULT_UNBROKEN_INTERVAL: Duration = Duration::from_millis(20);

/// Default host sleep between time slices.
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of one scheduler time slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// Work remains; call `step` again after the sleep interval.
    Continue,
    /// The root task finished. All results have been provided.
    Completed,
    /// The root task was canceled. No result; `completed` stays false.
    Canceled,
}

/// Observer of scheduler progress, invoked once per work-function iteration
/// and exactly once more after completion or cancellation.
///
/// Any `FnMut(&SteppedTask<C>)` closure is a sink.
pub trait ProgressSink<C> {
    fn on_progress(&mut self, task: &SteppedTask<C>);
}

impl<C, F: FnMut(&SteppedTask<C>)> ProgressSink<C> for F {
    fn on_progress(&mut self, task: &SteppedTask<C>) {
        self(task)
    }
}

/// One stack frame: a work function bound to its own nested task, plus the
/// fraction of the parent's progress range it accounts for.
struct Subaction<C> {
    work: Box<dyn FnMut(&mut C, &mut SteppedTask<C>)>,
    task: SteppedTask<C>,
    proportion: f64,
    name: Option<String>,
}

/// A resumable task with a stack of nested subtasks.
///
/// Work functions receive the task bound to their own frame, so pushing a
/// subtask nests under the caller and `get_result` pops the caller's own
/// children. The root task is driven through a [`Scheduler`].
pub struct SteppedTask<C> {
    completed: bool,
    canceled: bool,
    result: Option<Box<dyn Any>>,
    iteration: u64,
    unbroken_interval: Duration,
    sleep_interval: Duration,
    frames: Vec<Subaction<C>>,
    /// Progress already banked by popped subtasks.
    base_progress: f64,
    /// Local progress last reported by this task's own work function.
    reported_progress: f64,
}

impl<C> SteppedTask<C> {
    /// A fresh task with the default timing intervals.
    pub fn new() -> Self {
        Self::with_intervals(DEFAULT_UNBROKEN_INTERVAL, DEFAULT_SLEEP_INTERVAL)
    }

    /// A fresh task with an explicit time-slice budget and host sleep.
    pub fn with_intervals(unbroken_interval: Duration, sleep_interval: Duration) -> Self {
        Self {
            completed: false,
            canceled: false,
            result: None,
            iteration: 0,
            unbroken_interval,
            sleep_interval,
            frames: Vec::new(),
            base_progress: 0.0,
            reported_progress: 0.0,
        }
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn canceled(&self) -> bool {
        self.canceled
    }

    /// Number of times this task's own work function has run.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn unbroken_interval(&self) -> Duration {
        self.unbroken_interval
    }

    pub fn sleep_interval(&self) -> Duration {
        self.sleep_interval
    }

    fn is_terminal(&self) -> bool {
        self.completed || self.canceled
    }

    /// Push a nested subtask. Subtasks run depth-first, most-recent-first:
    /// the pushed work function is invoked instead of the caller until it
    /// completes or is canceled. `proportion` is the fraction of this task's
    /// progress range the subtask accounts for.
    pub fn execute_subaction(
        &mut self,
        proportion: f64,
        work: impl FnMut(&mut C, &mut SteppedTask<C>) + 'static,
    ) {
        self.push_frame(proportion, None, work);
    }

    /// Like [`execute_subaction`](Self::execute_subaction), with a display
    /// name surfaced through [`current_action_name`](Self::current_action_name).
    pub fn execute_named_subaction(
        &mut self,
        name: &str,
        proportion: f64,
        work: impl FnMut(&mut C, &mut SteppedTask<C>) + 'static,
    ) {
        self.push_frame(proportion, Some(name.to_owned()), work);
    }

    fn push_frame(
        &mut self,
        proportion: f64,
        name: Option<String>,
        work: impl FnMut(&mut C, &mut SteppedTask<C>) + 'static,
    ) {
        let mut task = Self::with_intervals(self.unbroken_interval, self.sleep_interval);
        task.iteration = self.iteration;
        self.frames.push(Subaction {
            work: Box::new(work),
            task,
            proportion,
            name,
        });
    }

    /// If the most recently pushed subtask has completed, pop it and return
    /// its result. A no-op returning `None` while the subtask is still
    /// running; the caller's work function is simply invoked again on later
    /// slices and retries.
    ///
    /// A completed subtask always carries a result: `provide_result` is the
    /// only path that marks a frame's task completed.
    pub fn get_result(&mut self) -> Option<Box<dyn Any>> {
        match self.frames.last() {
            Some(frame) if frame.task.completed => {}
            _ => return None,
        }
        let frame = self.frames.pop()?;
        debug_assert!(
            frame.task.result.is_some(),
            "completed subtask without a result"
        );
        self.base_progress = (self.base_progress + frame.proportion).min(1.0);
        frame.task.result
    }

    /// Mark this task completed, storing `value` as its result.
    pub fn provide_result<T: Any>(&mut self, value: T) {
        self.result = Some(Box::new(value));
        self.completed = true;
    }

    /// Mark this task completed with the result of `producer`, invoked now.
    pub fn provide_result_with<T: Any>(&mut self, producer: impl FnOnce() -> T) {
        self.provide_result(producer());
    }

    /// Request cancellation. Cooperative: the current work-function
    /// invocation always finishes; the flag is honored between iterations.
    /// Abandoned subtasks are not torn down.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Run `cleanup` only if no subtask is still on the stack, so it never
    /// observes partial results. Returns whether it ran.
    pub fn finalize(&mut self, cleanup: impl FnOnce(&mut Self)) -> bool {
        if !self.frames.is_empty() {
            return false;
        }
        cleanup(self);
        true
    }

    /// Record this task's own local progress, in `[0, 1]`.
    pub fn report_progress(&mut self, progress: f64) {
        self.reported_progress = progress.clamp(0.0, 1.0);
    }

    /// Aggregate progress in `[0, 1]` across the whole subtask nesting:
    /// banked progress from popped subtasks, this task's own reported
    /// progress, and each live frame weighted by its proportion. Exactly 1.0
    /// once completed. Monotonically non-decreasing for pipelines whose
    /// proportions sum to at most 1.
    pub fn progress(&self) -> f64 {
        if self.completed {
            return 1.0;
        }
        let mut progress = self.base_progress.max(self.reported_progress);
        for frame in &self.frames {
            progress += frame.proportion * frame.task.progress();
        }
        progress.min(1.0)
    }

    /// Display name of the deepest active frame. `None` when the stack is
    /// empty or the deepest frame is unnamed; ancestor names are never
    /// substituted for a nameless leaf.
    pub fn current_action_name(&self) -> Option<&str> {
        let frame = self.frames.last()?;
        if !frame.task.is_terminal() && !frame.task.frames.is_empty() {
            return frame.task.current_action_name();
        }
        frame.name.as_deref()
    }

    /// Run the deepest runnable frame's work function once. Returns false if
    /// nothing is runnable: the stack is empty, or the top subtask finished
    /// and awaits collection by this task's owner.
    fn run_innermost(&mut self, ctx: &mut C) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        if frame.task.is_terminal() {
            return false;
        }
        if frame.task.run_innermost(ctx) {
            return true;
        }
        frame.task.iteration += 1;
        (frame.work)(ctx, &mut frame.task);
        true
    }
}

impl<C> Default for SteppedTask<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a root [`SteppedTask`] one time slice at a time.
pub struct Scheduler<C> {
    task: SteppedTask<C>,
    sink: Box<dyn ProgressSink<C>>,
    finished_notified: bool,
}

impl<C> Scheduler<C> {
    pub fn new(task: SteppedTask<C>, sink: impl ProgressSink<C> + 'static) -> Self {
        Self {
            task,
            sink: Box::new(sink),
            finished_notified: false,
        }
    }

    pub fn task(&self) -> &SteppedTask<C> {
        &self.task
    }

    /// Mutable root task access, used by the host to queue work before the
    /// first slice and to collect root-level results between slices.
    pub fn task_mut(&mut self) -> &mut SteppedTask<C> {
        &mut self.task
    }

    /// Cancel the root task. Takes effect at the next iteration boundary.
    pub fn cancel(&mut self) {
        self.task.cancel();
    }

    /// Run one time slice: work-function iterations until the unbroken
    /// budget is spent or the task reaches a terminal state. Fires the
    /// progress sink after every iteration, and exactly once more when the
    /// task completes or is canceled.
    pub fn step(&mut self, ctx: &mut C) -> StepStatus {
        if self.finished_notified {
            return self.status();
        }
        let deadline = Instant::now() + self.task.unbroken_interval;
        while !self.task.is_terminal() {
            if !self.task.run_innermost(ctx) {
                if !self.task.frames.is_empty() {
                    // Top-level subtask finished; the host collects it.
                    return StepStatus::Continue;
                }
                // Nothing queued and nothing pending: the root is done.
                self.task.completed = true;
                break;
            }
            self.task.iteration += 1;
            self.sink.on_progress(&self.task);
            if Instant::now() >= deadline && !self.task.is_terminal() {
                return StepStatus::Continue;
            }
        }
        self.finished_notified = true;
        self.sink.on_progress(&self.task);
        self.status()
    }

    /// Drive the task to a terminal state, sleeping between slices and
    /// handing every root-level result to `on_result`. Realizes the
    /// execute/sleep loop for hosts without their own event loop.
    pub fn run_to_completion(
        &mut self,
        ctx: &mut C,
        mut on_result: impl FnMut(Box<dyn Any>),
    ) -> StepStatus {
        loop {
            let status = self.step(ctx);
            while let Some(result) = self.task.get_result() {
                on_result(result);
            }
            match status {
                StepStatus::Continue => std::thread::sleep(self.task.sleep_interval),
                terminal => return terminal,
            }
        }
    }

    fn status(&self) -> StepStatus {
        if self.task.canceled {
            StepStatus::Canceled
        } else if self.task.completed {
            StepStatus::Completed
        } else {
            StepStatus::Continue
        }
    }
}
