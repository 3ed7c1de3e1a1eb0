//! Automation task queue and worker pool.
//!
//! One task channel, N workers. Within a task, actions run in declared
//! order: a blocking action serializes the automation and aborts the rest
//! of its actions on final failure, a non-blocking action is spawned
//! fire-and-forget and never delays the next dispatch.
//!
//! The `action_timeout` deadline applies to each attempt individually, so
//! the worst case for one action is bounded by
//! `max_attempts * (timeout + backoff)`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{ActionConfig, Event, ServiceInvocation};
use crate::services::service_registry::ServiceRegistry;

/// One automation firing: the causing event plus a resolved copy of each
/// action.
#[derive(Debug, Clone)]
pub struct AutomationTask {
    pub automation_id: i64,
    pub alias: String,
    pub event: Event,
    pub invocations: Vec<ServiceInvocation>,
}

/// Shared receiving end of the task channel.
pub type TaskReceiver = Arc<Mutex<mpsc::Receiver<AutomationTask>>>;

/// Create the task channel. The queue is deliberately tiny: workers are
/// the buffer, and a saturated queue applies backpressure to the event
/// processor rather than accumulating unbounded work.
pub fn task_channel() -> (mpsc::Sender<AutomationTask>, TaskReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (tx, Arc::new(Mutex::new(rx)))
}

pub struct WorkerPool {
    registry: Arc<ServiceRegistry>,
    config: ActionConfig,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(registry: Arc<ServiceRegistry>, config: ActionConfig, cancel: CancellationToken) -> Self {
        Self {
            registry,
            config,
            cancel,
        }
    }

    /// Spawn `count` workers draining the shared receiver. Workers exit
    /// when the task channel closes. A pool of size zero is a documented
    /// failure mode: tasks back up and producers block.
    pub fn spawn(&self, count: usize, receiver: TaskReceiver) -> Vec<JoinHandle<()>> {
        if count == 0 {
            warn!("worker pool size is 0, automation tasks will not be executed");
        }
        (0..count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let registry = self.registry.clone();
                let config = self.config.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, receiver, registry, config, cancel).await;
                })
            })
            .collect()
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: TaskReceiver,
    registry: Arc<ServiceRegistry>,
    config: ActionConfig,
    cancel: CancellationToken,
) {
    loop {
        let task = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(task) = task else {
            debug!(worker_id, "task channel closed, worker exiting");
            return;
        };
        run_task(worker_id, task, &registry, &config, &cancel).await;
    }
}

async fn run_task(
    worker_id: usize,
    task: AutomationTask,
    registry: &Arc<ServiceRegistry>,
    config: &ActionConfig,
    cancel: &CancellationToken,
) {
    info!(worker_id, automation = %task.alias, actions = task.invocations.len(), "executing task");

    for (index, invocation) in task.invocations.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return;
        }
        if invocation.blocking {
            if let Err(err) = execute_with_retry(registry, config, cancel, &invocation).await {
                error!(
                    automation = %task.alias,
                    service = %invocation.qualified_name(),
                    action = index,
                    error = %err,
                    "blocking action failed, aborting remaining actions"
                );
                return;
            }
        } else {
            let registry = registry.clone();
            let config = config.clone();
            let cancel = cancel.clone();
            let alias = task.alias.clone();
            tokio::spawn(async move {
                if let Err(err) = execute_with_retry(&registry, &config, &cancel, &invocation).await
                {
                    error!(
                        automation = %alias,
                        service = %invocation.qualified_name(),
                        error = %err,
                        "non-blocking action failed"
                    );
                }
            });
        }
    }
}

/// Run one service call under the per-attempt deadline, retrying with a
/// fixed backoff up to the configured attempt budget. Cancellation aborts
/// between and during attempts.
async fn execute_with_retry(
    registry: &ServiceRegistry,
    config: &ActionConfig,
    cancel: &CancellationToken,
    invocation: &ServiceInvocation,
) -> EngineResult<()> {
    let timeout = Duration::from_millis(config.timeout_ms);
    let backoff = Duration::from_millis(config.retry.backoff_ms);
    let max_attempts = config.retry.max_attempts.max(1);

    let mut last_err = EngineError::ServiceCall("no attempts made".to_string());
    for attempt in 1..=max_attempts {
        let result = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = tokio::time::timeout(timeout, registry.call(invocation)) => result,
        };

        match result {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err @ EngineError::UnknownService(_))) => {
                // Retrying an unregistered service cannot help.
                return Err(err);
            }
            Ok(Err(err)) => {
                warn!(
                    service = %invocation.qualified_name(),
                    attempt,
                    error = %err,
                    "service call failed"
                );
                last_err = err;
            }
            Err(_) => {
                warn!(
                    service = %invocation.qualified_name(),
                    attempt,
                    "service call timed out"
                );
                last_err = EngineError::ServiceCallTimeout(timeout);
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                () = cancel.cancelled() => return Err(EngineError::Cancelled),
                () = tokio::time::sleep(backoff) => {}
            }
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Context, RetryConfig, ServiceHandler, ServiceSpec, TargetSpec};
    use async_trait::async_trait;
    use serde_json::Map;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingHandler {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ServiceHandler for FailingHandler {
        async fn call(&self, _invocation: &ServiceInvocation) -> EngineResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::ServiceCall("boom".to_string()))
        }
    }

    struct SlowHandler {
        calls: Arc<AtomicU32>,
        delay: Duration,
    }

    #[async_trait]
    impl ServiceHandler for SlowHandler {
        async fn call(&self, _invocation: &ServiceInvocation) -> EngineResult<()> {
            tokio::time::sleep(self.delay).await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn spec(handler: Arc<dyn ServiceHandler>) -> ServiceSpec {
        ServiceSpec {
            handler,
            required_params: HashMap::new(),
            allowed_targets: TargetSpec::default(),
        }
    }

    fn invocation(domain: &str, service: &str, blocking: bool) -> ServiceInvocation {
        ServiceInvocation {
            domain: domain.into(),
            service: service.into(),
            targets: vec![],
            params: Map::new(),
            blocking,
            context: Context::new(),
        }
    }

    fn config(max_attempts: u32, backoff_ms: u64, timeout_ms: u64) -> ActionConfig {
        ActionConfig {
            timeout_ms,
            retry: RetryConfig {
                max_attempts,
                backoff_ms,
            },
        }
    }

    #[tokio::test]
    async fn test_retry_budget_is_spent_then_fails() {
        let registry = Arc::new(ServiceRegistry::new());
        let calls = Arc::new(AtomicU32::new(0));
        registry.register("hue", "broken", spec(Arc::new(FailingHandler { calls: calls.clone() })));

        let cancel = CancellationToken::new();
        let result = execute_with_retry(
            &registry,
            &config(3, 10, 1_000),
            &cancel,
            &invocation("hue", "broken", true),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_attempts_one_means_no_retry() {
        let registry = Arc::new(ServiceRegistry::new());
        let calls = Arc::new(AtomicU32::new(0));
        registry.register("hue", "broken", spec(Arc::new(FailingHandler { calls: calls.clone() })));

        let cancel = CancellationToken::new();
        let _ = execute_with_retry(
            &registry,
            &config(1, 10, 1_000),
            &cancel,
            &invocation("hue", "broken", true),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_against_budget() {
        let registry = Arc::new(ServiceRegistry::new());
        let calls = Arc::new(AtomicU32::new(0));
        registry.register(
            "hue",
            "slow",
            spec(Arc::new(SlowHandler {
                calls: calls.clone(),
                delay: Duration::from_millis(200),
            })),
        );

        let cancel = CancellationToken::new();
        let result = execute_with_retry(
            &registry,
            &config(2, 5, 20),
            &cancel,
            &invocation("hue", "slow", true),
        )
        .await;

        assert!(matches!(result, Err(EngineError::ServiceCallTimeout(_))));
        // The handler never finished inside the deadline.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_service_is_not_retried() {
        let registry = Arc::new(ServiceRegistry::new());
        let cancel = CancellationToken::new();
        let result = execute_with_retry(
            &registry,
            &config(3, 10, 1_000),
            &cancel,
            &invocation("hue", "missing", true),
        )
        .await;
        assert!(matches!(result, Err(EngineError::UnknownService(_))));
    }

    #[tokio::test]
    async fn test_blocking_failure_halts_remaining_actions() {
        let registry = Arc::new(ServiceRegistry::new());
        let failing = Arc::new(AtomicU32::new(0));
        let after = Arc::new(AtomicU32::new(0));
        registry.register("hue", "broken", spec(Arc::new(FailingHandler { calls: failing.clone() })));
        registry.register(
            "hue",
            "after",
            spec(Arc::new(SlowHandler {
                calls: after.clone(),
                delay: Duration::from_millis(1),
            })),
        );

        let task = AutomationTask {
            automation_id: 1,
            alias: "halts".into(),
            event: Event::time_changed(chrono::Utc::now()),
            invocations: vec![
                invocation("hue", "broken", true),
                invocation("hue", "after", true),
            ],
        };

        let cancel = CancellationToken::new();
        run_task(0, task, &registry, &config(2, 1, 100), &cancel).await;

        assert_eq!(failing.load(Ordering::SeqCst), 2);
        assert_eq!(after.load(Ordering::SeqCst), 0, "second action must not run");
    }

    #[tokio::test]
    async fn test_non_blocking_action_does_not_delay_next() {
        let registry = Arc::new(ServiceRegistry::new());
        let slow = Arc::new(AtomicU32::new(0));
        let fast = Arc::new(AtomicU32::new(0));
        registry.register(
            "hue",
            "slow",
            spec(Arc::new(SlowHandler {
                calls: slow.clone(),
                delay: Duration::from_millis(300),
            })),
        );
        registry.register(
            "hue",
            "fast",
            spec(Arc::new(SlowHandler {
                calls: fast.clone(),
                delay: Duration::from_millis(1),
            })),
        );

        let task = AutomationTask {
            automation_id: 1,
            alias: "fire-and-forget".into(),
            event: Event::time_changed(chrono::Utc::now()),
            invocations: vec![
                invocation("hue", "slow", false),
                invocation("hue", "fast", true),
            ],
        };

        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();
        run_task(0, task, &registry, &config(1, 1, 1_000), &cancel).await;
        let elapsed = started.elapsed();

        // The fast blocking action completed without waiting for the slow
        // non-blocking one.
        assert_eq!(fast.load(Ordering::SeqCst), 1);
        assert!(elapsed < Duration::from_millis(250), "took {elapsed:?}");

        // The spawned action still finishes on its own.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(slow.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_workers_back_up_the_queue() {
        let registry = Arc::new(ServiceRegistry::new());
        let cancel = CancellationToken::new();
        let pool = WorkerPool::new(registry, config(1, 1, 100), cancel);
        let (tx, rx) = task_channel();
        let handles = pool.spawn(0, rx);
        assert!(handles.is_empty());

        let task = || AutomationTask {
            automation_id: 1,
            alias: "stuck".into(),
            event: Event::time_changed(chrono::Utc::now()),
            invocations: vec![],
        };
        // The channel buffer absorbs one task; the next producer blocks.
        tx.send(task()).await.unwrap();
        assert!(tx.try_send(task()).is_err(), "queue full with no workers");
    }

    #[tokio::test]
    async fn test_workers_drain_and_exit_on_close() {
        let registry = Arc::new(ServiceRegistry::new());
        let calls = Arc::new(AtomicU32::new(0));
        registry.register(
            "hue",
            "fast",
            spec(Arc::new(SlowHandler {
                calls: calls.clone(),
                delay: Duration::from_millis(1),
            })),
        );

        let cancel = CancellationToken::new();
        let pool = WorkerPool::new(registry, config(1, 1, 100), cancel);
        let (tx, rx) = task_channel();
        let handles = pool.spawn(2, rx);

        for i in 0..4 {
            tx.send(AutomationTask {
                automation_id: i,
                alias: format!("task-{i}"),
                event: Event::time_changed(chrono::Utc::now()),
                invocations: vec![invocation("hue", "fast", true)],
            })
            .await
            .unwrap();
        }
        drop(tx);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
