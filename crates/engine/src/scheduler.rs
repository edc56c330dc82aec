// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Scheduler: the per-run execution pipeline. Selects ready tasks,
//! enforces the worker parallelism cap, awaits worker completions, drives the
//! judge queue, detects terminal quiescence, and honors abort.
//!
//! One [`run_pipeline`] call drives exactly one [`Run`] from whatever state
//! [`crate::run_manager::RunManager::start`]/`resume` found it in through to
//! a terminal status (or until aborted into `paused`/`stopped`).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use fleet_adapters::{PlannerAdapter, WorkerAdapter, WorkerHandle, WorkerOutcome};
use fleet_core::{
    Clock, Event, Judgement, JudgementId, LogLevel, Run, RunId, RunStatus, Task, TaskId, TaskStatus, WorkerStatus,
};
use fleet_storage::RunStore;

use crate::event_bus::EventBus;

/// How long the scheduler sleeps between re-polls when nothing is running
/// but pending tasks remain (§4.3 step 7). Bounded at ≤1s by the spec; kept
/// short here so tests and real runs both notice new work promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long finalization sleeps between checks that the judge queue has
/// fully drained. Bounded at ≤500ms by the spec.
const JUDGE_DRAIN_POLL: Duration = Duration::from_millis(25);

/// Everything one scheduler invocation needs to drive a single run. Cheap to
/// clone: every field is a handle (`Arc`, a `Copy` id, or a cancellation
/// token) so completion continuations and the judge-queue drainer can each
/// hold their own copy.
#[derive(Clone)]
pub struct SchedulerHandles<C: Clock + 'static> {
    pub run_id: RunId,
    pub run: Arc<AsyncMutex<Run>>,
    pub abort: CancellationToken,
    pub planner: Arc<dyn PlannerAdapter>,
    pub worker_adapter: Arc<dyn WorkerAdapter>,
    pub bus: Arc<EventBus>,
    pub store: Arc<RunStore>,
    pub clock: C,
}

struct WorkerFinished {
    task_id: TaskId,
    worker_id: fleet_core::WorkerId,
    outcome: WorkerOutcome,
}

/// Drive `ctx.run` from its current status through to a terminal status, or
/// until `ctx.abort` fires (in which case the run lands in `paused`/`stopped`,
/// whichever status the caller already set before firing the token).
pub async fn run_pipeline<C: Clock + 'static>(ctx: SchedulerHandles<C>) {
    if !planning_phase(&ctx).await {
        return;
    }

    {
        let mut run = ctx.run.lock().await;
        if run.status == RunStatus::Planning {
            run.status = RunStatus::Executing;
            ctx.bus.emit(Event::run_updated(&run));
            ctx.store.save(&run);
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerFinished>();
    let mut in_flight: HashMap<TaskId, WorkerHandle> = HashMap::new();
    let judge_gate = Arc::new(JudgeGate::new());

    loop {
        if ctx.abort.is_cancelled() {
            break;
        }
        {
            let run = ctx.run.lock().await;
            if run.status.is_terminal() {
                break;
            }
        }

        loop {
            let cap = current_max_workers(&ctx).await;
            if ctx.abort.is_cancelled() || in_flight.len() >= cap {
                break;
            }
            match pick_ready_task(&ctx).await {
                Some(task_id) => launch_worker(&ctx, &judge_gate, &mut in_flight, tx.clone(), task_id).await,
                None => break,
            }
        }

        let ready_empty = ready_is_empty(&ctx).await;
        if in_flight.is_empty() && ready_empty {
            cancel_blocked_tasks(&ctx).await;
            let (queue_empty, judging) = judge_gate.state();
            let still_pending = {
                let run = ctx.run.lock().await;
                run.tasks.iter().any(|t| t.status == TaskStatus::Pending)
            };
            if !judging && queue_empty && !still_pending {
                break;
            }
        }

        if !in_flight.is_empty() {
            tokio::select! {
                _ = ctx.abort.cancelled() => break,
                msg = rx.recv() => {
                    if let Some(finished) = msg {
                        handle_worker_finished(&ctx, &judge_gate, &mut in_flight, finished).await;
                    }
                }
            }
        } else {
            tokio::select! {
                _ = ctx.abort.cancelled() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    if ctx.abort.is_cancelled() {
        handle_abort(&ctx, &mut in_flight).await;
        return;
    }

    while !in_flight.is_empty() {
        match rx.recv().await {
            Some(finished) => handle_worker_finished(&ctx, &judge_gate, &mut in_flight, finished).await,
            None => break,
        }
    }

    loop {
        let (queue_empty, judging) = judge_gate.state();
        if !judging && queue_empty {
            break;
        }
        tokio::time::sleep(JUDGE_DRAIN_POLL).await;
    }

    let mut run = ctx.run.lock().await;
    if !run.status.is_terminal() {
        run.status = RunStatus::Completed;
        run.completed_at_ms = Some(ctx.clock.epoch_ms());
        ctx.store.save(&run);
        ctx.bus.emit(Event::run_completed(ctx.run_id));
    }
}

/// Returns `false` (and leaves the run `failed`) when the initial plan call
/// itself fails. Skips planning entirely, with a resume-note log, when the
/// run already has pending tasks (this is a resume, not a first start).
async fn planning_phase<C: Clock + 'static>(ctx: &SchedulerHandles<C>) -> bool {
    let has_pending = {
        let run = ctx.run.lock().await;
        run.tasks.iter().any(|t| t.status == TaskStatus::Pending)
    };
    if has_pending {
        ctx.bus.emit(Event::log(Some(ctx.run_id), LogLevel::Info, "resuming run with pending tasks; skipping planning"));
        return true;
    }

    {
        let mut run = ctx.run.lock().await;
        run.status = RunStatus::Planning;
        ctx.bus.emit(Event::run_updated(&run));
    }

    let snapshot = { ctx.run.lock().await.clone() };
    let result = ctx.planner.plan(&snapshot).await;
    if ctx.abort.is_cancelled() {
        // Paused/stopped mid-plan: discard whatever the planner returned so the
        // run lands with zero tasks and empty analysis, per §8's boundary case.
        // `run_pipeline`'s abort check fires immediately on the next loop turn.
        return true;
    }
    match result {
        Ok(plan) => {
            let now = ctx.clock.epoch_ms();
            let mut minted: Vec<Task> = plan
                .tasks
                .iter()
                .map(|pt| {
                    let mut t = Task::new(pt.title.clone(), pt.description.clone(), now);
                    t.priority = pt.priority.unwrap_or(fleet_core::task::DEFAULT_TASK_PRIORITY);
                    t
                })
                .collect();
            let pool = minted.clone();
            for (i, pt) in plan.tasks.iter().enumerate() {
                minted[i].dependencies = resolve_dependency_titles(&pool, &pt.dependency_titles);
            }

            let mut run = ctx.run.lock().await;
            run.analysis = plan.analysis;
            for t in &minted {
                ctx.bus.emit(Event::task_updated(ctx.run_id, t));
            }
            run.tasks.extend(minted);
            ctx.store.save(&run);
            ctx.bus.emit(Event::run_updated(&run));
            true
        }
        Err(e) => {
            let mut run = ctx.run.lock().await;
            run.status = RunStatus::Failed;
            run.error = Some(e.to_string());
            run.completed_at_ms = Some(ctx.clock.epoch_ms());
            ctx.store.save(&run);
            ctx.bus.emit(Event::run_failed(ctx.run_id, e.to_string()));
            false
        }
    }
}

/// Resolve dependency titles against `pool`, case-insensitively. A title with
/// no match is dropped with a warning; a title matching more than one task
/// (undefined per spec) resolves to the first match, also with a warning.
fn resolve_dependency_titles(pool: &[Task], titles: &[String]) -> Vec<TaskId> {
    let mut resolved = Vec::new();
    for title in titles {
        let lower = title.to_lowercase();
        let matches: Vec<&Task> = pool.iter().filter(|t| t.title.to_lowercase() == lower).collect();
        if matches.len() > 1 {
            tracing::warn!("dependency title {title:?} matches {} tasks case-insensitively; using the first", matches.len());
        }
        match matches.first() {
            Some(t) => resolved.push(t.id),
            None => tracing::warn!("dependency title {title:?} did not resolve to any task; dropping"),
        }
    }
    resolved
}

async fn current_max_workers<C: Clock + 'static>(ctx: &SchedulerHandles<C>) -> usize {
    ctx.run.lock().await.max_workers as usize
}

async fn ready_is_empty<C: Clock + 'static>(ctx: &SchedulerHandles<C>) -> bool {
    let run = ctx.run.lock().await;
    let completed: HashSet<TaskId> = run.tasks.iter().filter(|t| t.status == TaskStatus::Completed).map(|t| t.id).collect();
    !run.tasks.iter().any(|t| t.is_ready(&completed))
}

/// Pick the highest-priority ready task (ties broken by creation order),
/// atomically claiming it by flipping it to `in_progress` under the same
/// lock so a concurrent caller never double-picks it.
async fn pick_ready_task<C: Clock + 'static>(ctx: &SchedulerHandles<C>) -> Option<TaskId> {
    let mut run = ctx.run.lock().await;
    let completed: HashSet<TaskId> = run.tasks.iter().filter(|t| t.status == TaskStatus::Completed).map(|t| t.id).collect();
    let mut candidates: Vec<(i32, u64, TaskId)> =
        run.tasks.iter().filter(|t| t.is_ready(&completed)).map(|t| (t.priority, t.created_at_ms, t.id)).collect();
    candidates.sort();
    let picked = candidates.first().map(|(_, _, id)| *id);
    if let Some(id) = picked {
        let now = ctx.clock.epoch_ms();
        if let Some(t) = run.task_mut(&id) {
            t.status = TaskStatus::InProgress;
            t.started_at_ms = Some(now);
        }
        if let Some(t) = run.tasks.iter().find(|t| t.id == id) {
            ctx.bus.emit(Event::task_updated(ctx.run_id, t));
        }
    }
    picked
}

async fn launch_worker<C: Clock + 'static>(
    ctx: &SchedulerHandles<C>,
    judge_gate: &Arc<JudgeGate>,
    in_flight: &mut HashMap<TaskId, WorkerHandle>,
    tx: mpsc::UnboundedSender<WorkerFinished>,
    task_id: TaskId,
) {
    let (task_snapshot, target_dir) = {
        let run = ctx.run.lock().await;
        (run.tasks.iter().find(|t| t.id == task_id).cloned(), run.target_dir.clone())
    };
    let Some(task_snapshot) = task_snapshot else { return };

    match ctx.worker_adapter.spawn(ctx.run_id, &task_snapshot, &target_dir).await {
        Ok(spawned) => {
            let worker_id = spawned.worker.id;
            let handle = spawned.handle.clone();
            {
                let mut run = ctx.run.lock().await;
                if let Some(t) = run.task_mut(&task_id) {
                    t.worker_id = Some(worker_id);
                }
                run.workers.push(spawned.worker.clone());
                ctx.bus.emit(Event::worker_created(ctx.run_id, &spawned.worker));
                ctx.bus.emit(Event::run_updated(&run));
                ctx.store.save(&run);
            }
            in_flight.insert(task_id, handle);
            let tx2 = tx.clone();
            let done = spawned.done;
            tokio::spawn(async move {
                let outcome = done.await.unwrap_or_else(|_| WorkerOutcome::failed("worker dropped without resolving"));
                let _ = tx2.send(WorkerFinished { task_id, worker_id, outcome });
            });
        }
        Err(e) => {
            let now = ctx.clock.epoch_ms();
            {
                let mut run = ctx.run.lock().await;
                if let Some(t) = run.task_mut(&task_id) {
                    t.status = TaskStatus::Failed;
                    t.error = Some(format!("spawn failed: {e}"));
                    t.completed_at_ms = Some(now);
                }
                if let Some(t) = run.tasks.iter().find(|t| t.id == task_id) {
                    ctx.bus.emit(Event::task_updated(ctx.run_id, t));
                }
                ctx.store.save(&run);
            }
            judge_gate.clone().push_and_maybe_drain(task_id, ctx.clone());
        }
    }
}

async fn handle_worker_finished<C: Clock + 'static>(
    ctx: &SchedulerHandles<C>,
    judge_gate: &Arc<JudgeGate>,
    in_flight: &mut HashMap<TaskId, WorkerHandle>,
    finished: WorkerFinished,
) {
    in_flight.remove(&finished.task_id);
    let now = ctx.clock.epoch_ms();
    {
        let mut run = ctx.run.lock().await;
        if let Some(w) = run.worker_mut(&finished.worker_id) {
            w.finish(finished.outcome.status, now);
        }
        if let Some(t) = run.task_mut(&finished.task_id) {
            match finished.outcome.status {
                WorkerStatus::Completed => t.complete(finished.outcome.result.clone().unwrap_or_default(), now),
                _ => t.fail(finished.outcome.error.clone().unwrap_or_else(|| "worker failed".to_string()), now),
            }
        }
        if let Some(t) = run.tasks.iter().find(|t| t.id == finished.task_id) {
            ctx.bus.emit(Event::task_updated(ctx.run_id, t));
        }
        if let Some(w) = run.workers.iter().find(|w| w.id == finished.worker_id) {
            ctx.bus.emit(Event::worker_updated(ctx.run_id, w));
        }
        ctx.bus.emit(Event::run_updated(&run));
        ctx.store.save(&run);
    }
    judge_gate.clone().push_and_maybe_drain(finished.task_id, ctx.clone());
}

/// Cancel every `pending` task at least one of whose dependencies is
/// `failed`/`cancelled` — a dead end that will never become ready.
async fn cancel_blocked_tasks<C: Clock + 'static>(ctx: &SchedulerHandles<C>) {
    let mut run = ctx.run.lock().await;
    let by_id: HashMap<TaskId, Task> = run.tasks.iter().map(|t| (t.id, t.clone())).collect();
    let blocked: Vec<TaskId> =
        run.tasks.iter().filter(|t| t.status == TaskStatus::Pending && t.is_blocked(&by_id)).map(|t| t.id).collect();
    if blocked.is_empty() {
        return;
    }
    for id in &blocked {
        if let Some(t) = run.task_mut(id) {
            t.cancel("Blocked by failed dependencies");
        }
    }
    for id in &blocked {
        if let Some(t) = run.tasks.iter().find(|t| t.id == *id) {
            ctx.bus.emit(Event::task_updated(ctx.run_id, t));
        }
    }
    ctx.store.save(&run);
}

async fn handle_abort<C: Clock + 'static>(ctx: &SchedulerHandles<C>, in_flight: &mut HashMap<TaskId, WorkerHandle>) {
    for (_, handle) in in_flight.drain() {
        ctx.worker_adapter.cancel(&handle).await;
    }
    let mut run = ctx.run.lock().await;
    let reverted: Vec<TaskId> = run.tasks.iter().filter(|t| t.status == TaskStatus::InProgress).map(|t| t.id).collect();
    for id in &reverted {
        if let Some(t) = run.task_mut(id) {
            t.revert_to_pending();
        }
    }
    for id in &reverted {
        if let Some(t) = run.tasks.iter().find(|t| t.id == *id) {
            ctx.bus.emit(Event::task_updated(ctx.run_id, t));
        }
    }
    ctx.store.save(&run);
    ctx.bus.emit(Event::run_updated(&run));
}

/// Serializes judge invocations for one run. Only one `drain_loop` is ever
/// active at a time (guarded by `judging`); a completion continuation that
/// finds one already running just enqueues and trusts the active drainer to
/// pick its item up.
struct JudgeGate {
    queue: SyncMutex<VecDeque<TaskId>>,
    judging: AtomicBool,
}

impl JudgeGate {
    fn new() -> Self {
        Self { queue: SyncMutex::new(VecDeque::new()), judging: AtomicBool::new(false) }
    }

    /// `(queue_is_empty, a_drain_loop_is_active)`.
    fn state(&self) -> (bool, bool) {
        (self.queue.lock().is_empty(), self.judging.load(Ordering::Acquire))
    }

    fn push_and_maybe_drain<C: Clock + 'static>(self: Arc<Self>, task_id: TaskId, ctx: SchedulerHandles<C>) {
        self.queue.lock().push_back(task_id);
        self.try_start_drain(ctx);
    }

    fn try_start_drain<C: Clock + 'static>(self: Arc<Self>, ctx: SchedulerHandles<C>) {
        if self.judging.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
            let gate = self.clone();
            tokio::spawn(async move { gate.drain_loop(ctx).await });
        }
    }

    async fn drain_loop<C: Clock + 'static>(self: Arc<Self>, ctx: SchedulerHandles<C>) {
        loop {
            if ctx.abort.is_cancelled() {
                self.judging.store(false, Ordering::Release);
                return;
            }
            let next = self.queue.lock().pop_front();
            let Some(task_id) = next else {
                self.judging.store(false, Ordering::Release);
                if self.queue.lock().is_empty() {
                    break;
                }
                if self.judging.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
                    break;
                }
                continue;
            };
            self.process_one(&ctx, task_id).await;
        }
    }

    async fn process_one<C: Clock + 'static>(&self, ctx: &SchedulerHandles<C>, task_id: TaskId) {
        if ctx.abort.is_cancelled() {
            return;
        }
        {
            let mut run = ctx.run.lock().await;
            if run.status == RunStatus::Executing {
                run.status = RunStatus::Judging;
                ctx.bus.emit(Event::run_updated(&run));
            }
        }

        let (run_snapshot, task_snapshot) = {
            let run = ctx.run.lock().await;
            (run.clone(), run.tasks.iter().find(|t| t.id == task_id).cloned())
        };
        let Some(task) = task_snapshot else { return };
        let now = ctx.clock.epoch_ms();

        let activity_summary = task
            .worker_id
            .and_then(|wid| run_snapshot.workers.iter().find(|w| w.id == wid))
            .map(crate::activity_summary::summarize_activity)
            .unwrap_or_else(|| "(no recorded activity)".to_string());

        match ctx.planner.judge(&run_snapshot, &task, &activity_summary).await {
            Ok(jr) => {
                let judgement_id = JudgementId::new();
                let mut minted: Vec<Task> = jr
                    .new_tasks
                    .iter()
                    .map(|pt| {
                        let mut t = Task::new(pt.title.clone(), pt.description.clone(), now);
                        t.priority = pt.priority.unwrap_or(fleet_core::task::DEFAULT_TASK_PRIORITY);
                        t.spawned_by = Some(judgement_id);
                        t
                    })
                    .collect();

                let mut run = ctx.run.lock().await;
                let mut pool: Vec<Task> = run.tasks.clone();
                pool.extend(minted.iter().cloned());
                for (i, pt) in jr.new_tasks.iter().enumerate() {
                    minted[i].dependencies = resolve_dependency_titles(&pool, &pt.dependency_titles);
                }

                let mut new_task_ids = Vec::with_capacity(minted.len());
                for t in &minted {
                    new_task_ids.push(t.id);
                    ctx.bus.emit(Event::task_updated(ctx.run_id, t));
                }
                run.tasks.extend(minted);

                let judgement = Judgement::new(task_id, jr.assessment.clone(), new_task_ids, jr.goal_complete, now);
                run.judgements.push(judgement.clone());
                ctx.bus.emit(Event::judgement_created(ctx.run_id, &judgement));
                ctx.bus.emit(Event::log(Some(ctx.run_id), LogLevel::Info, format!("judge: {}", jr.assessment)));

                // A pause/stop may have landed the run in `Paused`/`Stopped` while this
                // judge call was in flight; in that case the tasks it would cancel here
                // have already been reverted to `pending` for resume, and the run must
                // not be silently completed out from under the abort. Only apply
                // goal-complete side effects while still actively running.
                if jr.goal_complete && matches!(run.status, RunStatus::Judging | RunStatus::Executing) {
                    let pending_ids: Vec<TaskId> =
                        run.tasks.iter().filter(|t| t.status == TaskStatus::Pending).map(|t| t.id).collect();
                    for id in &pending_ids {
                        if let Some(t) = run.task_mut(id) {
                            t.cancel("Goal marked complete");
                        }
                    }
                    for id in &pending_ids {
                        if let Some(t) = run.tasks.iter().find(|t| t.id == *id) {
                            ctx.bus.emit(Event::task_updated(ctx.run_id, t));
                        }
                    }
                    let any_in_progress = run.tasks.iter().any(|t| t.status == TaskStatus::InProgress);
                    if !any_in_progress && !run.status.is_terminal() {
                        run.status = RunStatus::Completed;
                        run.completed_at_ms = Some(now);
                        ctx.store.save(&run);
                        ctx.bus.emit(Event::run_completed(ctx.run_id));
                    } else if any_in_progress {
                        ctx.bus.emit(Event::log(
                            Some(ctx.run_id),
                            LogLevel::Info,
                            "goal marked complete — waiting for running tasks",
                        ));
                    }
                }
                ctx.store.save(&run);
            }
            Err(e) => {
                let mut run = ctx.run.lock().await;
                let j = Judgement::synthetic_error(task_id, &e, now);
                run.judgements.push(j.clone());
                ctx.bus.emit(Event::judgement_created(ctx.run_id, &j));
                ctx.bus.emit(Event::log(Some(ctx.run_id), LogLevel::Error, format!("judge failed: {e}")));
                ctx.store.save(&run);
            }
        }

        let queue_now_empty = self.queue.lock().is_empty();
        let mut run = ctx.run.lock().await;
        if queue_now_empty && run.status == RunStatus::Judging {
            run.status = RunStatus::Executing;
            ctx.bus.emit(Event::run_updated(&run));
            ctx.store.save(&run);
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
