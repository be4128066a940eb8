//! In-memory job queue implementation.
//!
//! Carries the fire-and-forget push/email dispatch work. Jobs are stored
//! in memory and processed by local workers; they are lost on restart,
//! which is acceptable for notification side effects.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use quill_core::ports::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats};

/// In-memory job queue configuration.
#[derive(Debug, Clone)]
pub struct InMemoryJobQueueConfig {
    /// Maximum queue size (0 = unlimited).
    pub max_size: usize,
    /// Number of worker tasks.
    pub workers: usize,
}

impl Default for InMemoryJobQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10000,
            workers: 4,
        }
    }
}

/// In-memory job queue.
pub struct InMemoryJobQueue {
    stats: Arc<JobStats>,
    config: InMemoryJobQueueConfig,
    job_sender: mpsc::Sender<Job>,
    job_receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
}

#[derive(Default)]
struct JobStats {
    pending: AtomicUsize,
    processing: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl InMemoryJobQueue {
    pub fn new(config: InMemoryJobQueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.max_size.max(100));

        Self {
            stats: Arc::new(JobStats::default()),
            config,
            job_sender: tx,
            job_receiver: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn from_env() -> Self {
        let config = InMemoryJobQueueConfig {
            max_size: std::env::var("JOB_QUEUE_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10000),
            workers: std::env::var("JOB_QUEUE_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        };
        Self::new(config)
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(InMemoryJobQueueConfig::default())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        if self.config.max_size > 0 {
            let current_size = self.stats.pending.load(Ordering::Relaxed);
            if current_size >= self.config.max_size {
                return Err(JobQueueError::QueueFull);
            }
        }

        self.stats.pending.fetch_add(1, Ordering::Relaxed);

        self.job_sender
            .send(job)
            .await
            .map_err(|e| JobQueueError::EnqueueError(e.to_string()))?;

        tracing::debug!(
            pending = self.stats.pending.load(Ordering::Relaxed),
            "Job enqueued"
        );

        Ok(())
    }

    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError> {
        let handler = Arc::new(handler);
        let receiver = self.job_receiver.clone();
        let stats = self.stats.clone();
        let sender = self.job_sender.clone();

        for worker_id in 0..self.config.workers {
            let handler = handler.clone();
            let receiver = receiver.clone();
            let stats = stats.clone();
            let sender = sender.clone();

            tokio::spawn(async move {
                tracing::info!(worker = worker_id, "Job worker started");

                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };

                    let Some(mut job) = job else {
                        tracing::info!(worker = worker_id, "Job worker shutting down");
                        break;
                    };

                    stats.pending.fetch_sub(1, Ordering::Relaxed);
                    stats.processing.fetch_add(1, Ordering::Relaxed);

                    tracing::debug!(
                        worker = worker_id,
                        job_id = %job.id,
                        job_type = %job.job_type,
                        "Processing job"
                    );

                    job.attempts += 1;
                    let result = handler(job.clone()).await;

                    stats.processing.fetch_sub(1, Ordering::Relaxed);

                    match result {
                        JobResult::Success => {
                            stats.completed.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(job_id = %job.id, "Job completed");
                        }
                        JobResult::Retry(reason) => {
                            if job.attempts < job.max_attempts {
                                tracing::warn!(
                                    job_id = %job.id,
                                    attempt = job.attempts,
                                    max_attempts = job.max_attempts,
                                    reason = %reason,
                                    "Job failed, will retry"
                                );
                                // Backoff grows with the attempt count
                                let sender = sender.clone();
                                let stats = stats.clone();
                                stats.pending.fetch_add(1, Ordering::Relaxed);
                                tokio::spawn(async move {
                                    tokio::time::sleep(tokio::time::Duration::from_millis(
                                        100 * job.attempts as u64,
                                    ))
                                    .await;
                                    if let Err(e) = sender.send(job).await {
                                        stats.pending.fetch_sub(1, Ordering::Relaxed);
                                        tracing::error!(
                                            error = %e,
                                            "Failed to re-enqueue job for retry"
                                        );
                                    }
                                });
                            } else {
                                stats.failed.fetch_add(1, Ordering::Relaxed);
                                tracing::error!(
                                    job_id = %job.id,
                                    reason = %reason,
                                    "Job failed after max retries"
                                );
                            }
                        }
                        JobResult::Failed(reason) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(job_id = %job.id, reason = %reason, "Job failed permanently");
                        }
                    }
                }
            });
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        Ok(QueueStats {
            pending: self.stats.pending.load(Ordering::Relaxed),
            processing: self.stats.processing.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn worker_processes_enqueued_jobs() {
        let queue = InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 10,
            workers: 1,
        });
        let (tx, mut rx) = mpsc::channel(1);

        queue
            .start_worker(Box::new(move |job| {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx.send(job.job_type).await;
                    JobResult::Success
                })
            }))
            .await
            .unwrap();

        queue
            .enqueue(Job::new("push.post_approved", serde_json::json!({})))
            .await
            .unwrap();

        let processed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(processed, "push.post_approved");
    }
}
