use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::models::Message;
use crate::ollama::InferenceEngine;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{0:#}")]
    Engine(anyhow::Error),

    #[error("inference timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The engine task panicked or was cancelled.
    #[error("inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("inference pool is closed")]
    PoolClosed,
}

/// Runs engine calls on a bounded pool of tasks, off the request path.
///
/// At most `workers` calls are in flight at once; further callers wait for a
/// slot. The timeout covers the engine call only, not the wait for a slot,
/// and is enforced inside the task so it holds even if the caller goes away.
/// Dropping the caller aborts its task.
#[derive(Clone)]
pub struct InferenceGateway {
    engine: Arc<dyn InferenceEngine>,
    slots: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl InferenceGateway {
    pub fn new(engine: Arc<dyn InferenceEngine>, workers: usize, timeout: Option<Duration>) -> Self {
        Self {
            engine,
            slots: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
        }
    }

    pub async fn complete(&self, history: Vec<Message>) -> Result<String, InferenceError> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| InferenceError::PoolClosed)?;

        let engine = self.engine.clone();
        let timeout = self.timeout;
        let mut task = AbortOnDrop(tokio::spawn(async move {
            let _permit = permit;
            let call = engine.chat(&history);
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(InferenceError::Engine),
                    Err(_) => {
                        tracing::warn!("inference call exceeded {:?}; cancelled", limit);
                        Err(InferenceError::Timeout(limit))
                    }
                },
                None => call.await.map_err(InferenceError::Engine),
            }
        }));

        (&mut task.0).await?
    }

    #[cfg(test)]
    fn idle_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
