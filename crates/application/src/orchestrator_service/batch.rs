use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tactic_domain::EventPayload;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::OrchestratorService;
use super::tracker::RunTracker;
use crate::event_ports::{BatchRun, CreationReport, WorkflowType};

const CANCELLED_MESSAGE: &str = "cancelled";

type WorkQueue = Arc<Mutex<VecDeque<(usize, EventPayload)>>>;
type ResultSlots = Arc<Mutex<Vec<Option<CreationReport>>>>;

impl OrchestratorService {
    /// Runs the creation pipeline for every payload with bounded concurrency.
    ///
    /// Item failures, including panics, are reported per item and never fail the
    /// batch. Results keep the input order.
    pub async fn orchestrate_batch_processing(&self, events: Vec<EventPayload>) -> BatchRun {
        self.orchestrate_batch_processing_with_cancellation(events, CancellationToken::new())
            .await
    }

    /// Same as [`Self::orchestrate_batch_processing`], but stops when `cancellation`
    /// fires. Queued and in-flight items are then reported as `cancelled`, each with a
    /// failed run persisted under its own workflow id.
    pub async fn orchestrate_batch_processing_with_cancellation(
        &self,
        events: Vec<EventPayload>,
        cancellation: CancellationToken,
    ) -> BatchRun {
        let batch_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let started = Instant::now();
        let total_events = events.len();
        info!(batch_id = %batch_id, total_events, "batch processing started");

        let queue: WorkQueue = Arc::new(Mutex::new(events.into_iter().enumerate().collect()));
        let slots: ResultSlots = Arc::new(Mutex::new(vec![None; total_events]));

        let mut workers = JoinSet::new();
        for _ in 0..self.batch_concurrency.min(total_events) {
            workers.spawn(self.clone().run_batch_worker(
                queue.clone(),
                slots.clone(),
                cancellation.clone(),
            ));
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                warn!(batch_id = %batch_id, error = %error, "batch worker stopped unexpectedly");
            }
        }

        let unstarted: Vec<(usize, EventPayload)> = queue.lock().await.drain(..).collect();
        for (index, payload) in unstarted {
            let report = self
                .record_abandoned_item(Uuid::new_v4().to_string(), &payload, CANCELLED_MESSAGE)
                .await;
            if let Some(slot) = slots.lock().await.get_mut(index) {
                *slot = Some(report);
            }
        }

        let results: Vec<CreationReport> = std::mem::take(&mut *slots.lock().await)
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| CreationReport::failed(None, CANCELLED_MESSAGE)))
            .collect();
        let processed_events = results.iter().filter(|report| report.success).count();

        let batch = BatchRun {
            success: true,
            batch_id,
            total_events,
            processed_events,
            failed_events: total_events - processed_events,
            duration: started.elapsed().as_secs_f64(),
            results,
            started_at,
        };

        info!(
            batch_id = %batch.batch_id,
            processed_events = batch.processed_events,
            failed_events = batch.failed_events,
            "batch processing finished"
        );
        if let Err(error) = self.metadata_store.store_batch_result(&batch).await {
            warn!(batch_id = %batch.batch_id, error = %error, "failed to persist batch result");
        }

        batch
    }

    async fn run_batch_worker(
        self,
        queue: WorkQueue,
        slots: ResultSlots,
        cancellation: CancellationToken,
    ) {
        loop {
            if cancellation.is_cancelled() {
                return;
            }

            let Some((index, payload)) = queue.lock().await.pop_front() else {
                return;
            };

            let workflow_id = Uuid::new_v4().to_string();
            let pipeline = self.clone();
            let item_payload = payload.clone();
            let item_workflow_id = workflow_id.clone();
            let mut item = tokio::spawn(async move {
                pipeline
                    .orchestrate_event_creation_with_id(item_workflow_id, item_payload)
                    .await
            });

            let outcome = tokio::select! {
                joined = &mut item => joined.map_err(join_error_message),
                () = cancellation.cancelled() => {
                    item.abort();
                    Err(CANCELLED_MESSAGE.to_owned())
                }
            };
            let report = match outcome {
                Ok(report) => report,
                Err(message) => {
                    self.record_abandoned_item(workflow_id, &payload, message.as_str())
                        .await
                }
            };

            if let Some(slot) = slots.lock().await.get_mut(index) {
                *slot = Some(report);
            }
        }
    }

    /// Persists a failed run for an item whose pipeline never reached a terminal
    /// status on its own.
    async fn record_abandoned_item(
        &self,
        workflow_id: String,
        payload: &EventPayload,
        message: &str,
    ) -> CreationReport {
        let run = RunTracker::start_with_id(workflow_id, WorkflowType::EventCreation, payload)
            .fail(message.to_owned());
        warn!(workflow_id = %run.workflow_id, error = %message, "batch item abandoned");
        self.persist_run(&run).await;
        CreationReport::failed(Some(run.workflow_id), message)
    }
}

fn join_error_message(error: JoinError) -> String {
    if error.is_cancelled() {
        return CANCELLED_MESSAGE.to_owned();
    }

    match error.try_into_panic() {
        Ok(panic) => panic_message(panic.as_ref()),
        Err(error) => error.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "batch item panicked".to_owned())
}
