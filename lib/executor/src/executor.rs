//! The run executor: accepts queued runs and drives them to completion.
//!
//! Each call to [`Executor::execute`] resolves the task record, registers a
//! live worker, and spawns an independent activity that compiles the script,
//! submits it to the query service, and resolves the run promise.
//! [`Executor::wait`] is the shutdown barrier: it blocks until every worker
//! launched by prior `execute` calls has fully cleaned up.

use crate::error::ExecutorError;
use crate::promise::{QueuedRun, RunPromise, RunResult};
use crate::store::TaskStore;
use quarry_core::{OrgId, UserId};
use quarry_query::{
    Authorization, QueryRequest, QueryService, ResultSets, ScriptCompiler, Statistics,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Drives queued task runs against the query service.
pub struct Executor<S, C, Q> {
    store: S,
    compiler: Arc<C>,
    query: Arc<Q>,
    live: LiveWorkers,
}

impl<S, C, Q> Executor<S, C, Q>
where
    S: TaskStore,
    C: ScriptCompiler + 'static,
    Q: QueryService + 'static,
{
    /// Creates an executor over the given collaborators.
    pub fn new(store: S, compiler: C, query: Q) -> Self {
        Self {
            store,
            compiler: Arc::new(compiler),
            query: Arc::new(query),
            live: LiveWorkers::new(),
        }
    }

    /// Accepts a queued run and starts a worker for it.
    ///
    /// Returns the run promise for the caller to await or cancel.
    /// Query-service errors never surface here; they are delivered through
    /// the promise. Canceling `ctx` tears the run down with the context
    /// identity rather than the canonical canceled error.
    ///
    /// # Errors
    ///
    /// Returns an error if the task record cannot be resolved.
    #[instrument(skip_all, fields(task_id = %queued.task_id, run_id = %queued.run_id))]
    pub async fn execute(
        &self,
        ctx: CancellationToken,
        queued: QueuedRun,
    ) -> Result<RunPromise, ExecutorError> {
        let task = self.store.find_task(queued.task_id).await?;
        let promise = RunPromise::new(queued);

        // Register before returning so a wait() issued immediately after
        // execute() cannot miss this worker.
        let guard = self.live.register();
        let worker = RunWorker {
            compiler: Arc::clone(&self.compiler),
            query: Arc::clone(&self.query),
            script: task.script,
            org: task.org,
            owner: task.owner,
            promise: promise.clone(),
            ctx,
        };
        tokio::spawn(worker.run(guard));

        Ok(promise)
    }

    /// Blocks until every previously launched worker has finished.
    ///
    /// Returns immediately when no workers are live. Callers must not
    /// issue further `execute` calls once `wait` has been invoked; the
    /// executor does not refuse new runs during shutdown.
    pub async fn wait(&self) {
        self.live.quiesced().await;
    }
}

/// Per-run background activity.
struct RunWorker<C, Q> {
    compiler: Arc<C>,
    query: Arc<Q>,
    script: String,
    org: OrgId,
    owner: UserId,
    promise: RunPromise,
    ctx: CancellationToken,
}

/// What woke the worker while it was blocked on the upstream query.
enum RunEvent {
    Canceled(ExecutorError),
    Delivered(Option<ResultSets>),
}

impl<C, Q> RunWorker<C, Q>
where
    C: ScriptCompiler,
    Q: QueryService,
{
    async fn run(self, guard: LiveGuard) {
        // Held for the whole run; dropping it is the final observable
        // action, after every local (including the upstream handle) has
        // been released.
        let _guard = guard;
        let queued = self.promise.run();
        let cancel = self.promise.cancel_signal();

        debug!(task_id = %queued.task_id, run_id = %queued.run_id, "run worker started");

        let spec = match self.compiler.compile(&self.script, queued.now).await {
            Ok(spec) => spec,
            Err(err) => {
                warn!(
                    task_id = %queued.task_id,
                    run_id = %queued.run_id,
                    error = %err,
                    "script compilation failed"
                );
                self.promise
                    .resolve(Ok(RunResult::failed(err, Statistics::default())));
                return;
            }
        };

        let request = QueryRequest {
            org: self.org,
            spec,
            authorization: Authorization::for_user(self.owner),
        };

        // Submission races both cancel sources so a slow submit cannot
        // wedge cancellation. Cancellation wins ties.
        let submitted = tokio::select! {
            biased;
            // cancel() already latched the canonical outcome.
            _ = cancel.cancelled() => None,
            _ = self.ctx.cancelled() => {
                self.promise.resolve(Err(ExecutorError::ContextCanceled));
                None
            }
            submitted = self.query.submit(request) => Some(submitted),
        };
        let Some(submitted) = submitted else {
            return;
        };
        let mut handle = match submitted {
            Ok(handle) => handle,
            Err(err) => {
                warn!(
                    task_id = %queued.task_id,
                    run_id = %queued.run_id,
                    error = %err,
                    "query submission refused"
                );
                self.promise.resolve(Err(ExecutorError::Query(err)));
                return;
            }
        };

        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => RunEvent::Canceled(ExecutorError::RunCanceled),
            _ = self.ctx.cancelled() => RunEvent::Canceled(ExecutorError::ContextCanceled),
            delivery = handle.ready() => RunEvent::Delivered(delivery),
        };
        match event {
            RunEvent::Canceled(err) => {
                handle.cancel();
                // Drain so the engine releases the query before the live
                // count drops.
                let _ = handle.ready().await;
                self.promise.resolve(Err(err));
            }
            RunEvent::Delivered(delivery) => {
                // Rows are drained only to observe the engine's verdict.
                drop(delivery);
                let result = match handle.err() {
                    Some(err) => {
                        warn!(
                            task_id = %queued.task_id,
                            run_id = %queued.run_id,
                            error = %err,
                            "query evaluation failed"
                        );
                        RunResult::failed(err, handle.statistics())
                    }
                    None => RunResult::succeeded(handle.statistics()),
                };
                self.promise.resolve(Ok(result));
            }
        }

        debug!(task_id = %queued.task_id, run_id = %queued.run_id, "run worker finished");
        // `handle` drops here, releasing the upstream query; `_guard`
        // drops after it, waking the quiescence barrier.
    }
}

/// Count of live run workers, with a quiescence barrier.
#[derive(Debug)]
struct LiveWorkers {
    count: Arc<watch::Sender<usize>>,
}

impl LiveWorkers {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Registers a worker. The returned guard decrements on drop.
    fn register(&self) -> LiveGuard {
        self.count.send_modify(|count| *count += 1);
        LiveGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Resolves once the live count is zero.
    async fn quiesced(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while
        // this borrow is held.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

/// Drop guard that decrements the live-worker count.
#[derive(Debug)]
struct LiveGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.count.send_modify(|count| *count -= 1);
    }
}
