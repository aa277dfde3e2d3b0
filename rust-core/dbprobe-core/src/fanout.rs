// SPDX-License-Identifier: PMPL-1.0-or-later
//! Partial-failure tolerant fan-out over replica pods.
//!
//! One construction task per replica runs in a [`JoinSet`]; successful
//! clients are appended to a single mutex-guarded list, failures are logged
//! and dropped. Each task id maps back to its pod, so a replica whose task
//! panics is still reported by name. The join loop is the barrier: nothing outlives it, and the
//! list is read only after every task has finished. A hung replica holds
//! the barrier until its transport timeouts fire.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::{Id, JoinSet};
use tracing::{debug, warn};

use crate::error::{ProbeError, Result};

/// A replica whose construction failed.
#[derive(Debug)]
pub struct ReplicaFailure {
    pub pod: String,
    pub error: ProbeError,
}

/// Outcome of a fan-out: the clients that were built, and how many were
/// expected.
#[derive(Debug)]
pub struct ReplicaClients<C> {
    clients: Vec<(String, C)>,
    failures: Vec<ReplicaFailure>,
    expected: usize,
}

impl<C> ReplicaClients<C> {
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.clients.len() == self.expected
    }

    /// Built clients with their pod names, in replica order.
    pub fn clients(&self) -> &[(String, C)] {
        &self.clients
    }

    pub fn failures(&self) -> &[ReplicaFailure] {
        &self.failures
    }

    /// All clients, or [`ProbeError::PartialListFailure`] if any replica
    /// failed.
    pub fn into_complete(self) -> Result<Vec<C>> {
        if !self.is_complete() {
            return Err(ProbeError::PartialListFailure {
                expected: self.expected,
                built: self.clients.len(),
            });
        }
        Ok(self.clients.into_iter().map(|(_, c)| c).collect())
    }
}

/// Build one client per pod in parallel.
///
/// `build` is called once per pod on the calling task; the futures it
/// returns run concurrently.
pub async fn build_replicas<C, F, Fut>(pods: Vec<String>, build: F) -> ReplicaClients<C>
where
    C: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<C>> + Send + 'static,
{
    let expected = pods.len();
    let built: Arc<Mutex<Vec<(usize, String, C)>>> = Arc::new(Mutex::new(Vec::with_capacity(expected)));
    let mut tasks = JoinSet::new();
    let mut pods_by_task: HashMap<Id, String> = HashMap::with_capacity(expected);

    for (ordinal, pod) in pods.into_iter().enumerate() {
        let construct = build(pod.clone());
        let built = Arc::clone(&built);
        let task_pod = pod.clone();
        let handle = tasks.spawn(async move {
            match construct.await {
                Ok(client) => {
                    built.lock().await.push((ordinal, task_pod, client));
                    None
                }
                Err(error) => Some(ReplicaFailure { pod: task_pod, error }),
            }
        });
        pods_by_task.insert(handle.id(), pod);
    }

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, None)) => {}
            Ok((_, Some(failure))) => {
                warn!(pod = %failure.pod, error = %failure.error, "replica client construction failed");
                failures.push(failure);
            }
            Err(join_error) => {
                let pod = pods_by_task.remove(&join_error.id()).unwrap_or_default();
                warn!(pod = %pod, error = %join_error, "replica construction task aborted");
                failures.push(ReplicaFailure {
                    pod,
                    error: ProbeError::transport("replica construction", join_error.to_string()),
                });
            }
        }
    }

    let mut built = std::mem::take(&mut *built.lock().await);
    built.sort_by_key(|(ordinal, _, _)| *ordinal);
    debug!(expected, built = built.len(), "replica fan-out finished");

    ReplicaClients {
        clients: built.into_iter().map(|(_, pod, c)| (pod, c)).collect(),
        failures,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tracing_subscriber::EnvFilter;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn test_all_replicas_built() {
        let pods: Vec<String> = (0..4).map(|i| format!("pb-{i}")).collect();
        let result = build_replicas(pods, |pod| async move { Ok(pod.len()) }).await;
        assert!(result.is_complete());
        assert_eq!(result.clients()[3].0, "pb-3");
        assert_eq!(result.into_complete().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_one_failure_drops_only_that_replica() {
        init_tracing();
        let pods: Vec<String> = (0..3).map(|i| format!("pb-{i}")).collect();
        let result = build_replicas(pods, |pod| async move {
            if pod == "pb-1" {
                Err(ProbeError::ConnectivityFailure {
                    target: pod,
                    reason: "refused".to_string(),
                })
            } else {
                Ok(pod)
            }
        })
        .await;

        assert_eq!(result.len(), 2);
        assert_eq!(result.expected(), 3);
        assert_eq!(result.failures().len(), 1);
        assert_eq!(result.failures()[0].pod, "pb-1");
        let names: Vec<&str> = result.clients().iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, ["pb-0", "pb-2"]);

        match result.into_complete() {
            Err(ProbeError::PartialListFailure { expected, built }) => {
                assert_eq!((expected, built), (3, 2));
            }
            other => panic!("expected PartialListFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_replica_keeps_its_pod_name() {
        init_tracing();
        let pods: Vec<String> = (0..3).map(|i| format!("pb-{i}")).collect();
        let result = build_replicas(pods, |pod| async move {
            if pod == "pb-1" {
                panic!("driver crashed");
            }
            Ok(pod)
        })
        .await;

        assert_eq!(result.len(), 2);
        let failed: Vec<&str> = result.failures().iter().map(|f| f.pod.as_str()).collect();
        assert_eq!(failed, ["pb-1"]);
        assert!(matches!(
            result.failures()[0].error,
            ProbeError::Transport { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replicas_run_concurrently() {
        let pods: Vec<String> = (0..5).map(|i| format!("pb-{i}")).collect();
        let started = tokio::time::Instant::now();
        let result = build_replicas(pods, |pod| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(pod)
        })
        .await;
        assert!(result.is_complete());
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_no_replicas() {
        let result = build_replicas(Vec::new(), |pod: String| async move { Ok(pod) }).await;
        assert!(result.is_empty());
        assert!(result.into_complete().unwrap().is_empty());
    }
}
