//! Sync Scheduler & Worker Pool.
//!
//! Decides **when** each job runs and **where** (which worker). Jobs are
//! drawn from a priority queue keyed by `earliest_run_at`, with secondary
//! ordering by [`JobKind`] rank so user-visible writes take precedence over
//! background pulls. A fixed-size worker pool cooperatively drains the
//! queue; each worker calls a caller-supplied [`JobExecutor`] under a
//! deadline, then feeds the outcome back into the retry/dead-letter policy.
//!
//! This module knows nothing about connector adapters or the domain
//! reducers — it is generic over [`JobExecutor`] so the engine crate can
//! wire it to whichever adapter a [`SyncJob`]'s channel resolves to,
//! following the same separation the teacher draws between `Store` (generic
//! effect execution) and the reducers that describe what an effect means.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// The six kinds of work the scheduler dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Pull the product catalogue from a channel.
    PullProducts,
    /// Pull inventory levels from a channel.
    PullInventory,
    /// Pull new and updated orders from a channel.
    PullOrders,
    /// Push an inventory quantity to a channel.
    PushInventory,
    /// Push a price to a channel.
    PushPrice,
    /// Push a fulfilment update (shipment, cancellation) to a channel.
    PushFulfilment,
}

impl JobKind {
    /// Secondary sort rank used to break ties when two jobs share the same
    /// `earliest_run_at`: `pushInventory > pushFulfilment > pullOrders >
    /// pullInventory > pullProducts`. Higher rank runs first.
    const fn priority_rank(self) -> u8 {
        match self {
            Self::PushInventory => 5,
            Self::PushFulfilment => 4,
            Self::PullOrders => 3,
            Self::PullInventory => 2,
            Self::PullProducts => 1,
            Self::PushPrice => 0,
        }
    }
}

/// Descriptor of work to do, drawn from a durable queue between the
/// scheduler and the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    /// Unique job identifier, stable across retries.
    pub id: String,
    /// What operation this job performs.
    pub kind: JobKind,
    /// Which channel instance this job targets.
    pub channel: String,
    /// Opaque, kind-specific payload (e.g. the SKU and quantity for a
    /// `pushInventory` job).
    pub payload: serde_json::Value,
    /// Number of attempts made so far, including the current one.
    pub attempt: u32,
    /// Earliest instant this job is eligible to run.
    ///
    /// Not meaningfully serializable (it's a process-local monotonic
    /// instant), so it is skipped by `Serialize`/`Deserialize` and
    /// reconstructed as "now" on the rare path that deserializes a
    /// `SyncJob` (e.g. dead-letter archival, which only reads other
    /// fields back out).
    #[serde(skip, default = "Instant::now")]
    pub earliest_run_at: Instant,
}

impl SyncJob {
    /// Create a job ready to run immediately, at attempt 1.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: JobKind, channel: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind,
            channel: channel.into(),
            payload,
            attempt: 1,
            earliest_run_at: Instant::now(),
        }
    }

    /// This job, incremented for another attempt and deferred until `at`.
    #[must_use]
    fn retry_at(mut self, at: Instant) -> Self {
        self.attempt += 1;
        self.earliest_run_at = at;
        self
    }

    /// This job, deferred until `at` without consuming attempt budget. Used
    /// for auth failures, which are expected to resolve via a token refresh
    /// rather than by exhausting retries.
    #[must_use]
    fn requeue_at(mut self, at: Instant) -> Self {
        self.earliest_run_at = at;
        self
    }
}

/// Ordered wrapper so [`SyncJob`]s can live in a [`BinaryHeap`] as a
/// min-heap on `earliest_run_at` with [`JobKind::priority_rank`] breaking
/// ties. `BinaryHeap` is a max-heap, so comparisons are reversed: the job
/// with the *earliest* `earliest_run_at` (and, for ties, the *highest*
/// priority rank) sorts greatest.
struct QueuedJob(SyncJob);

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.0.earliest_run_at == other.0.earliest_run_at
            && self.0.kind.priority_rank() == other.0.kind.priority_rank()
    }
}
impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .0
            .earliest_run_at
            .cmp(&self.0.earliest_run_at)
            .then_with(|| self.0.kind.priority_rank().cmp(&other.0.kind.priority_rank()))
    }
}

/// How a [`JobExecutor`] call concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The job completed; remove it from the queue permanently.
    Success,
    /// A transient or rate-limited failure; counts against the attempt
    /// budget and retries with backoff.
    Transient,
    /// An authentication failure; does not count against the attempt
    /// budget (a token refresh is expected to happen before the retry).
    AuthFailure,
    /// A non-retryable failure; moves straight to the dead-letter log
    /// regardless of remaining attempt budget.
    Fatal,
}

/// Executes one [`SyncJob`], dispatching to whichever adapter operation its
/// `kind` and `channel` resolve to. Implemented by the engine crate, which
/// owns the connector factory.
#[allow(async_fn_in_trait)]
pub trait JobExecutor: Send + Sync {
    /// Run `job` to completion (or failure) within `deadline`.
    fn execute(&self, job: &SyncJob, deadline: Instant) -> impl std::future::Future<Output = Outcome> + Send;
}

/// A job that exceeded its retry budget, with enough history to diagnose
/// why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The job as it stood at final failure.
    pub job: SyncJob,
    /// Why it was archived.
    pub reason: String,
}

/// Sink for jobs that exhaust their retry budget. Implemented by the
/// postgres crate's dead-letter table in production, and by an in-memory
/// `Vec` in tests.
#[allow(async_fn_in_trait)]
pub trait DeadLetterSink: Send + Sync {
    /// Archive a job that will not be retried further.
    fn archive(&self, dead_letter: DeadLetter) -> impl std::future::Future<Output = ()> + Send;
}

/// Per-job-kind configuration: timeout and retry policy.
#[derive(Debug, Clone)]
pub struct JobKindConfig {
    /// Deadline given to a single attempt of this job kind.
    pub timeout: Duration,
    /// Backoff/attempt-budget policy for this job kind.
    pub retry_policy: RetryPolicy,
}

impl JobKindConfig {
    /// A reasonable default: 30s timeout, the runtime's default retry
    /// policy.
    #[must_use]
    pub fn default_for(_kind: JobKind) -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::builder().build(),
        }
    }
}

/// Priority queue of ready and not-yet-ready [`SyncJob`]s, shared by the
/// scheduler loop and the worker pool.
struct JobQueue {
    heap: Mutex<BinaryHeap<QueuedJob>>,
}

impl JobQueue {
    fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
        }
    }

    async fn push(&self, job: SyncJob) {
        self.heap.lock().await.push(QueuedJob(job));
    }

    /// Pop the highest-priority job whose `earliest_run_at` has elapsed, if
    /// any. Jobs that aren't ready yet stay in the heap.
    async fn pop_ready(&self) -> Option<SyncJob> {
        let mut heap = self.heap.lock().await;
        match heap.peek() {
            Some(top) if top.0.earliest_run_at <= Instant::now() => heap.pop().map(|q| q.0),
            _ => None,
        }
    }
}

/// The scheduler: owns the job queue and a fixed-size worker pool draining
/// it.
///
/// Workers poll the queue on a short interval rather than blocking on a
/// channel, because readiness depends on wall-clock time
/// (`earliest_run_at`), not just queue non-emptiness — a job can be present
/// but not yet due.
pub struct Scheduler<E, D> {
    queue: Arc<JobQueue>,
    executor: Arc<E>,
    dead_letters: Arc<D>,
    kind_config: Arc<dyn Fn(JobKind) -> JobKindConfig + Send + Sync>,
    worker_count: usize,
    poll_interval: Duration,
}

impl<E, D> Scheduler<E, D>
where
    E: JobExecutor + 'static,
    D: DeadLetterSink + 'static,
{
    /// Build a scheduler with `worker_count` workers, each polling the
    /// queue every `poll_interval` for ready work.
    pub fn new(
        executor: Arc<E>,
        dead_letters: Arc<D>,
        worker_count: usize,
        poll_interval: Duration,
        kind_config: impl Fn(JobKind) -> JobKindConfig + Send + Sync + 'static,
    ) -> Self {
        Self {
            queue: Arc::new(JobQueue::new()),
            executor,
            dead_letters,
            kind_config: Arc::new(kind_config),
            worker_count,
            poll_interval,
        }
    }

    /// Enqueue a job for eventual execution.
    pub async fn submit(&self, job: SyncJob) {
        metrics::counter!("scheduler_jobs_submitted_total", "kind" => format!("{:?}", job.kind)).increment(1);
        self.queue.push(job).await;
    }

    /// Start the worker pool. Each worker runs until `shutdown` resolves;
    /// callers typically `tokio::spawn` the returned future or select over
    /// it alongside other shutdown signals.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut workers = Vec::with_capacity(self.worker_count);
        for worker_id in 0..self.worker_count {
            let queue = self.queue.clone();
            let executor = self.executor.clone();
            let dead_letters = self.dead_letters.clone();
            let kind_config = self.kind_config.clone();
            let poll_interval = self.poll_interval;
            let mut shutdown = shutdown.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = tokio::time::sleep(poll_interval) => {
                            if let Some(job) = queue.pop_ready().await {
                                run_one(worker_id, &job, &executor, &dead_letters, &queue, &kind_config).await;
                            }
                        }
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!(worker_id, "scheduler worker shutting down");
                                break;
                            }
                        }
                    }
                }
            }));
        }

        let _ = shutdown.changed().await;
        for worker in workers {
            let _ = worker.await;
        }
    }

    /// Access the queue for submitting jobs from other tasks (e.g. a
    /// reconciler reacting to a domain event).
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            queue: self.queue.clone(),
        }
    }

    /// Build a scheduler that drains an existing [`SchedulerHandle`]'s queue
    /// rather than a fresh one. Some callers need a handle to construct a
    /// reducer `Environment` before the executor depending on that
    /// environment exists to pass to [`Scheduler::new`]; building the handle
    /// first with [`SchedulerHandle::detached`] and wiring the scheduler to
    /// it afterwards with this constructor breaks that ordering cycle
    /// without ever dropping a submitted job on the floor.
    pub fn from_handle(
        handle: SchedulerHandle,
        executor: Arc<E>,
        dead_letters: Arc<D>,
        worker_count: usize,
        poll_interval: Duration,
        kind_config: impl Fn(JobKind) -> JobKindConfig + Send + Sync + 'static,
    ) -> Self {
        Self {
            queue: handle.queue,
            executor,
            dead_letters,
            kind_config: Arc::new(kind_config),
            worker_count,
            poll_interval,
        }
    }
}

/// Cloneable handle for submitting jobs without holding a reference to the
/// full [`Scheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    queue: Arc<JobQueue>,
}

impl SchedulerHandle {
    /// A handle backed by a fresh, unattached queue. Useful where a caller
    /// (or a unit test) needs a handle to pass into an environment but no
    /// running worker pool drains it.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            queue: Arc::new(JobQueue::new()),
        }
    }

    /// Enqueue a job.
    pub async fn submit(&self, job: SyncJob) {
        self.queue.push(job).await;
    }
}

#[instrument(skip(executor, dead_letters, queue, kind_config), fields(job_id = %job.id, kind = ?job.kind, attempt = job.attempt))]
async fn run_one<E, D>(
    worker_id: usize,
    job: &SyncJob,
    executor: &Arc<E>,
    dead_letters: &Arc<D>,
    queue: &Arc<JobQueue>,
    kind_config: &Arc<dyn Fn(JobKind) -> JobKindConfig + Send + Sync>,
) where
    E: JobExecutor,
    D: DeadLetterSink,
{
    let config = kind_config(job.kind);
    let deadline = Instant::now() + config.timeout;

    let started = Instant::now();
    let outcome = executor.execute(job, deadline).await;
    metrics::histogram!("scheduler_job_duration_seconds", "kind" => format!("{:?}", job.kind))
        .record(started.elapsed().as_secs_f64());

    match outcome {
        Outcome::Success => {
            metrics::counter!("scheduler_jobs_succeeded_total", "kind" => format!("{:?}", job.kind)).increment(1);
            info!(worker_id, "job completed");
        }
        Outcome::AuthFailure => {
            // Auth failures don't consume the attempt budget: a token
            // refresh is expected before the adapter call runs again.
            warn!(worker_id, "auth failure, retrying without consuming attempt budget");
            let retry_at = Instant::now() + config.retry_policy.delay_for_attempt(job.attempt as usize);
            queue.push(job.clone().requeue_at(retry_at)).await;
        }
        Outcome::Transient => {
            if job.attempt as usize >= config.retry_policy.max_retries {
                archive(dead_letters, job.clone(), "exceeded retry budget on transient failure").await;
            } else {
                let delay = config.retry_policy.full_jitter_delay_for_attempt(job.attempt as usize);
                warn!(worker_id, delay_ms = delay.as_millis() as u64, "transient failure, retrying");
                queue.push(job.clone().retry_at(Instant::now() + delay)).await;
            }
        }
        Outcome::Fatal => {
            archive(dead_letters, job.clone(), "fatal error").await;
        }
    }
}

async fn archive<D: DeadLetterSink>(dead_letters: &Arc<D>, job: SyncJob, reason: &str) {
    metrics::counter!("scheduler_jobs_dead_lettered_total", "kind" => format!("{:?}", job.kind)).increment(1);
    warn!(job_id = %job.id, reason, "archiving job to dead-letter log");
    dead_letters
        .archive(DeadLetter {
            job,
            reason: reason.to_string(),
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex as TokioMutex;

    struct ScriptedExecutor {
        outcomes: TokioMutex<Vec<Outcome>>,
        calls: AtomicU32,
    }

    impl JobExecutor for ScriptedExecutor {
        async fn execute(&self, _job: &SyncJob, _deadline: Instant) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().await;
            if outcomes.is_empty() {
                Outcome::Success
            } else {
                outcomes.remove(0)
            }
        }
    }

    struct VecDeadLetters {
        archived: TokioMutex<Vec<DeadLetter>>,
    }

    impl DeadLetterSink for VecDeadLetters {
        async fn archive(&self, dead_letter: DeadLetter) {
            self.archived.lock().await.push(dead_letter);
        }
    }

    #[test]
    fn priority_rank_orders_pushes_before_pulls() {
        assert!(JobKind::PushInventory.priority_rank() > JobKind::PushFulfilment.priority_rank());
        assert!(JobKind::PushFulfilment.priority_rank() > JobKind::PullOrders.priority_rank());
        assert!(JobKind::PullOrders.priority_rank() > JobKind::PullInventory.priority_rank());
        assert!(JobKind::PullInventory.priority_rank() > JobKind::PullProducts.priority_rank());
    }

    #[tokio::test]
    async fn queue_pops_by_earliest_run_at_then_priority() {
        let queue = JobQueue::new();
        let now = Instant::now();

        let low_priority_now = SyncJob {
            id: "a".into(),
            kind: JobKind::PullProducts,
            channel: "shopify".into(),
            payload: serde_json::json!({}),
            attempt: 1,
            earliest_run_at: now,
        };
        let high_priority_now = SyncJob {
            id: "b".into(),
            kind: JobKind::PushInventory,
            channel: "shopify".into(),
            payload: serde_json::json!({}),
            attempt: 1,
            earliest_run_at: now,
        };

        queue.push(low_priority_now).await;
        queue.push(high_priority_now).await;

        let first = queue.pop_ready().await.unwrap();
        assert_eq!(first.id, "b");
        let second = queue.pop_ready().await.unwrap();
        assert_eq!(second.id, "a");
    }

    #[tokio::test]
    async fn queue_does_not_release_jobs_before_their_time() {
        let queue = JobQueue::new();
        let future_job = SyncJob {
            id: "future".into(),
            kind: JobKind::PullProducts,
            channel: "shopify".into(),
            payload: serde_json::json!({}),
            attempt: 1,
            earliest_run_at: Instant::now() + Duration::from_secs(60),
        };
        queue.push(future_job).await;
        assert!(queue.pop_ready().await.is_none());
    }

    #[tokio::test]
    async fn auth_failure_does_not_consume_attempt_budget() {
        let executor = Arc::new(ScriptedExecutor {
            outcomes: TokioMutex::new(vec![Outcome::AuthFailure]),
            calls: AtomicU32::new(0),
        });
        let dead_letters = Arc::new(VecDeadLetters {
            archived: TokioMutex::new(Vec::new()),
        });
        let queue = Arc::new(JobQueue::new());
        let kind_config: Arc<dyn Fn(JobKind) -> JobKindConfig + Send + Sync> =
            Arc::new(JobKindConfig::default_for);

        let job = SyncJob::new("j1", JobKind::PushInventory, "shopify", serde_json::json!({}));
        run_one(0, &job, &executor, &dead_letters, &queue, &kind_config).await;

        let retried = queue.heap.lock().await.peek().map(|q| q.0.attempt);
        assert_eq!(retried, Some(1), "auth failure must not increment attempt count");
    }

    #[tokio::test]
    async fn transient_failure_exceeding_budget_is_dead_lettered() {
        let policy = RetryPolicy::builder().max_retries(2).build();
        let executor = Arc::new(ScriptedExecutor {
            outcomes: TokioMutex::new(vec![Outcome::Transient]),
            calls: AtomicU32::new(0),
        });
        let dead_letters = Arc::new(VecDeadLetters {
            archived: TokioMutex::new(Vec::new()),
        });
        let queue = Arc::new(JobQueue::new());
        let kind_config: Arc<dyn Fn(JobKind) -> JobKindConfig + Send + Sync> = Arc::new(move |_| JobKindConfig {
            timeout: Duration::from_secs(5),
            retry_policy: policy.clone(),
        });

        let mut job = SyncJob::new("j2", JobKind::PullOrders, "shopify", serde_json::json!({}));
        job.attempt = 2; // already at the budget ceiling
        run_one(0, &job, &executor, &dead_letters, &queue, &kind_config).await;

        assert_eq!(dead_letters.archived.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn fatal_failure_dead_letters_regardless_of_attempt() {
        let executor = Arc::new(ScriptedExecutor {
            outcomes: TokioMutex::new(vec![Outcome::Fatal]),
            calls: AtomicU32::new(0),
        });
        let dead_letters = Arc::new(VecDeadLetters {
            archived: TokioMutex::new(Vec::new()),
        });
        let queue = Arc::new(JobQueue::new());
        let kind_config: Arc<dyn Fn(JobKind) -> JobKindConfig + Send + Sync> =
            Arc::new(JobKindConfig::default_for);

        let job = SyncJob::new("j3", JobKind::PullProducts, "shopify", serde_json::json!({}));
        run_one(0, &job, &executor, &dead_letters, &queue, &kind_config).await;

        assert_eq!(dead_letters.archived.lock().await.len(), 1);
    }
}
