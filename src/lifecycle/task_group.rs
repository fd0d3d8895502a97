//! Supervised task group.
//!
//! Spawns named tasks that share one cancellation token. The first task to
//! fail cancels the token so its siblings can unwind; [`TaskGroup::wait`]
//! joins every task and returns that first error.

use std::future::Future;

use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::lifecycle::runtime::RuntimeError;

type Joined = (&'static str, Result<Result<(), RuntimeError>, tokio::task::JoinError>);

pub struct TaskGroup {
    token: CancellationToken,
    tasks: JoinSet<Joined>,
    handles: Vec<AbortHandle>,
}

impl TaskGroup {
    /// Create a group whose token is a child of `parent`.
    ///
    /// Cancelling `parent` cancels the group; a failing task cancels only
    /// the group's own token.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tasks: JoinSet::new(),
            handles: Vec::new(),
        }
    }

    /// Token shared by every task in the group.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn a supervised task.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), RuntimeError>> + Send + 'static,
    {
        let inner = tokio::spawn(task);
        self.handles.push(inner.abort_handle());
        self.tasks.spawn(async move { (name, inner.await) });
        tracing::debug!(task = name, "Task spawned");
    }

    /// Join every task and return the first error, if any.
    pub async fn wait(mut self) -> Result<(), RuntimeError> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let (name, outcome) = match joined {
                Ok(joined) => joined,
                Err(e) => {
                    tracing::error!(error = %e, "Task supervisor failed");
                    continue;
                }
            };

            let result = outcome.unwrap_or_else(|e| {
                let reason = if e.is_panic() { "panicked" } else { "was cancelled" };
                Err(RuntimeError::Task {
                    task: name.to_string(),
                    reason: reason.to_string(),
                })
            });

            match result {
                Ok(()) => tracing::debug!(task = name, "Task finished"),
                Err(e) => {
                    tracing::debug!(task = name, error = %e, "Task failed");
                    if first_error.is_none() {
                        self.token.cancel();
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_tasks_succeed() {
        let root = CancellationToken::new();
        let mut group = TaskGroup::new(&root);
        group.spawn("a", async { Ok(()) });
        group.spawn("b", async { Ok(()) });

        assert!(group.wait().await.is_ok());
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn test_first_error_cancels_siblings() {
        let root = CancellationToken::new();
        let mut group = TaskGroup::new(&root);
        let token = group.token();
        let sibling_saw_cancel = Arc::new(AtomicBool::new(false));

        let seen = sibling_saw_cancel.clone();
        group.spawn("sibling", async move {
            token.cancelled().await;
            seen.store(true, Ordering::SeqCst);
            Ok(())
        });
        group.spawn("failing", async {
            Err(RuntimeError::Failed("boom".into()))
        });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, RuntimeError::Failed(ref msg) if msg == "boom"));
        assert!(sibling_saw_cancel.load(Ordering::SeqCst));
        // The parent is never cancelled by a child failure.
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn test_only_first_error_is_returned() {
        let root = CancellationToken::new();
        let mut group = TaskGroup::new(&root);
        let token = group.token();

        group.spawn("first", async {
            Err(RuntimeError::Failed("first".into()))
        });
        group.spawn("second", async move {
            token.cancelled().await;
            Err(RuntimeError::Failed("second".into()))
        });

        let err = group.wait().await.unwrap_err();
        assert_eq!(err.to_string(), "first");
    }

    #[tokio::test]
    async fn test_panic_becomes_task_error() {
        let root = CancellationToken::new();
        let mut group = TaskGroup::new(&root);
        group.spawn("panicky", async { panic!("task exploded") });

        match group.wait().await {
            Err(RuntimeError::Task { task, reason }) => {
                assert_eq!(task, "panicky");
                assert_eq!(reason, "panicked");
            }
            other => panic!("expected task error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_group() {
        let root = CancellationToken::new();
        let mut group = TaskGroup::new(&root);
        let token = group.token();
        group.spawn("waiter", async move {
            token.cancelled().await;
            Ok(())
        });

        root.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), group.wait()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
