//! Analysis hand-off between webhook intake and the analysis worker.
//!
//! The webhook stores the call result, flips the interview to `analyzing` and
//! enqueues its id. A single background worker drains the queue. The row
//! status is the durable record: the worker's recovery sweep re-enqueues every
//! interview still in `analyzing`, and `analyze` skips ids that already moved on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::interviews::lifecycle::InterviewService;

const QUEUE_KEY: &str = "screening:analysis_queue";
const POLL_TIMEOUT_SECS: u64 = 5;
const ERROR_PAUSE: Duration = Duration::from_secs(1);
const RECOVERY_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait AnalysisQueue: Send + Sync {
    async fn enqueue(&self, interview_id: i32) -> Result<(), QueueError>;

    /// Waits a bounded time for the next id. `None` means nothing arrived.
    async fn dequeue(&self) -> Result<Option<i32>, QueueError>;
}

/// Redis list queue: `LPUSH` to enqueue, `BRPOP` to consume (FIFO).
pub struct RedisAnalysisQueue {
    producer: MultiplexedConnection,
    // BRPOP blocks its connection, so the consumer gets its own.
    consumer: Mutex<MultiplexedConnection>,
}

impl RedisAnalysisQueue {
    pub async fn connect(client: &redis::Client) -> Result<Self, QueueError> {
        let producer = client.get_multiplexed_async_connection().await?;
        let consumer = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            producer,
            consumer: Mutex::new(consumer),
        })
    }
}

#[async_trait]
impl AnalysisQueue for RedisAnalysisQueue {
    async fn enqueue(&self, interview_id: i32) -> Result<(), QueueError> {
        let mut conn = self.producer.clone();
        let _: () = conn.lpush(QUEUE_KEY, interview_id).await?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<i32>, QueueError> {
        let mut conn = self.consumer.lock().await;
        let popped: Option<(String, i32)> = redis::cmd("BRPOP")
            .arg(QUEUE_KEY)
            .arg(POLL_TIMEOUT_SECS)
            .query_async(&mut *conn)
            .await?;
        Ok(popped.map(|(_, id)| id))
    }
}

/// Takes one id off the queue and analyzes it. Returns whether an id was processed.
pub async fn process_next(
    service: &InterviewService,
    queue: &dyn AnalysisQueue,
) -> Result<bool, QueueError> {
    let Some(interview_id) = queue.dequeue().await? else {
        return Ok(false);
    };

    match service.analyze(interview_id).await {
        Ok(Some(interview)) => info!(
            "Analysis step finished for interview {interview_id}: status={}",
            interview.status
        ),
        Ok(None) => warn!("Queued interview {interview_id} no longer exists"),
        Err(e) => error!("Analysis step failed for interview {interview_id}: {e}"),
    }
    Ok(true)
}

/// Background consumer of the analysis queue.
///
/// Besides draining the queue it runs a recovery sweep: at startup, after
/// any queue error, and whenever the queue is idle and the last sweep is
/// older than `RECOVERY_INTERVAL`. The sweep re-enqueues interviews left in
/// `analyzing` (e.g. when the webhook could not enqueue) and fails calls
/// that were claimed but never confirmed.
pub struct AnalysisWorker {
    service: Arc<InterviewService>,
    queue: Arc<dyn AnalysisQueue>,
    last_sweep: Option<Instant>,
}

impl AnalysisWorker {
    pub fn new(service: Arc<InterviewService>, queue: Arc<dyn AnalysisQueue>) -> Self {
        Self {
            service,
            queue,
            last_sweep: None,
        }
    }

    pub async fn run(mut self) {
        info!("Analysis worker started");
        loop {
            if let Err(e) = self.tick().await {
                warn!("Analysis queue unavailable: {e}");
                tokio::time::sleep(ERROR_PAUSE).await;
            }
        }
    }

    /// Processes at most one queued id, sweeping first or afterwards when due.
    pub async fn tick(&mut self) -> Result<bool, QueueError> {
        if self.last_sweep.is_none() {
            self.sweep().await;
        }

        let processed = match process_next(&self.service, self.queue.as_ref()).await {
            Ok(processed) => processed,
            Err(e) => {
                self.last_sweep = None;
                return Err(e);
            }
        };

        if !processed && self.sweep_due() {
            self.sweep().await;
        }
        Ok(processed)
    }

    fn sweep_due(&self) -> bool {
        self.last_sweep
            .map_or(true, |at| at.elapsed() >= RECOVERY_INTERVAL)
    }

    async fn sweep(&mut self) {
        match self.service.fail_stalled_calls().await {
            Ok(0) => {}
            Ok(n) => warn!("Moved {n} unconfirmed call(s) to error"),
            Err(e) => error!("Failed to sweep unconfirmed calls: {e}"),
        }

        match self.service.recover_pending_analyses().await {
            Ok(n) => {
                if n > 0 {
                    info!("Re-enqueued {n} interview(s) left in analyzing");
                }
                self.last_sweep = Some(Instant::now());
            }
            Err(e) => error!("Failed to recover pending analyses: {e}"),
        }
    }
}
