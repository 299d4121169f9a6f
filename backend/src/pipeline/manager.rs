//! Sequential job runner
//!
//! Jobs are queued in submission order and drained by a single worker task.
//! For each job the worker walks the agent registry in order, ticking progress,
//! running the agent under a timeout and logging the request/response pair on
//! the message bus.

use super::events::PipelineEvent;
use crate::agents::{AgentError, AgentRegistry, JobContext, MediaAgent};
use crate::config::PipelineConfig;
use crate::protocol::{A2AMessage, MessageBus, MessagePriority, Transport, ORCHESTRATOR_ID};
use crate::state::{
    AgentStatus, AppState, FileSubmission, JobId, JobStatus, PipelineDb, ProcessingJob,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct Inner {
    state: Arc<RwLock<AppState>>,
    registry: AgentRegistry,
    bus: MessageBus,
    config: PipelineConfig,
    db: Option<PipelineDb>,
    events: broadcast::Sender<PipelineEvent>,
    queue: Mutex<VecDeque<JobId>>,
    draining: AtomicBool,
}

/// Outcome of running one job
enum JobOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Owns the job queue and the drain loop
///
/// Cloning is cheap; all clones share the same queue and state.
#[derive(Clone)]
pub struct PipelineManager {
    inner: Arc<Inner>,
}

impl PipelineManager {
    /// Create a manager
    ///
    /// Must be called inside a tokio runtime: it spawns the task that mirrors
    /// bus traffic into `a2a_message` events.
    pub fn new(
        state: Arc<RwLock<AppState>>,
        registry: AgentRegistry,
        bus: MessageBus,
        config: PipelineConfig,
        db: Option<PipelineDb>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut bus_rx = bus.subscribe();
        let forward = events.clone();
        tokio::spawn(async move {
            loop {
                match bus_rx.recv().await {
                    Ok(message) => {
                        let _ = forward.send(PipelineEvent::A2aMessage(message));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Message forwarder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self {
            inner: Arc::new(Inner {
                state,
                registry,
                bus,
                config,
                db,
                events,
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> &Arc<RwLock<AppState>> {
        &self.inner.state
    }

    pub fn bus(&self) -> &MessageBus {
        &self.inner.bus
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.inner.events.subscribe()
    }

    /// Number of jobs waiting behind the current one
    pub async fn queue_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Whether the drain loop is running
    pub fn is_processing(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    fn emit(&self, event: PipelineEvent) {
        debug!(event = event.event_type(), job_id = ?event.job_id(), "Pipeline event");
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    async fn persist(&self, job_id: &str) {
        let Some(db) = &self.inner.db else {
            return;
        };
        let job = self.inner.state.read().await.job(job_id).cloned();
        if let Some(job) = job {
            if let Err(e) = db.upsert_job(&job).await {
                warn!(job_id = %job_id, error = %e, "Failed to persist job");
            }
        }
    }

    /// Load jobs from an earlier run
    ///
    /// Jobs that were still queued or processing can never finish; they are
    /// marked as errors.
    pub async fn restore_jobs(&self, jobs: Vec<ProcessingJob>) -> usize {
        let mut interrupted = Vec::new();
        let mut restored = 0;
        {
            let mut state = self.inner.state.write().await;
            for job in jobs {
                let id = job.id.clone();
                let unfinished = !job.status.is_terminal();
                if state.insert_job(job) {
                    restored += 1;
                    if unfinished {
                        state.fail_job(&id, "Interrupted by server restart");
                        interrupted.push(id);
                    }
                }
            }
        }
        for id in &interrupted {
            self.persist(id).await;
        }
        info!(restored, interrupted = interrupted.len(), "Restored jobs");
        restored
    }

    /// Queue a file for processing
    ///
    /// # Returns
    /// The job as created (status `queued`)
    pub async fn submit_job(&self, submission: FileSubmission) -> ProcessingJob {
        let job = self.inner.state.write().await.create_job(submission);
        self.persist(&job.id).await;
        self.inner.queue.lock().await.push_back(job.id.clone());

        info!(job_id = %job.id, file_name = %job.file_name, "Job submitted");

        self.inner
            .bus
            .broadcast_to_agents(
                ORCHESTRATOR_ID,
                "job_queued",
                json!({ "jobId": job.id, "fileName": job.file_name }),
            )
            .await;
        self.emit(PipelineEvent::JobSubmitted(job.clone()));

        if !self.inner.draining.swap(true, Ordering::SeqCst) {
            let manager = self.clone();
            tokio::spawn(async move { manager.drain().await });
        }

        job
    }

    async fn drain(self) {
        loop {
            let next = self.inner.queue.lock().await.pop_front();
            match next {
                Some(job_id) => self.process_job(&job_id).await,
                None => {
                    self.inner.draining.store(false, Ordering::SeqCst);
                    // A submit may have queued a job after the pop above
                    let more = !self.inner.queue.lock().await.is_empty();
                    if more && !self.inner.draining.swap(true, Ordering::SeqCst) {
                        continue;
                    }
                    break;
                }
            }
        }
        debug!("Drain loop idle");
    }

    /// Cancel a queued or processing job
    ///
    /// # Returns
    /// * `Some(job)` - the job after the call (unchanged if it had already finished)
    /// * `None` - no such job
    pub async fn cancel_job(&self, job_id: &str) -> Option<ProcessingJob> {
        let (job, cancelled) = {
            let mut state = self.inner.state.write().await;
            let cancelled = state.set_job_status(job_id, JobStatus::Cancelled);
            (state.job(job_id).cloned()?, cancelled)
        };

        if cancelled {
            info!(job_id = %job_id, "Job cancelled");
            self.inner.queue.lock().await.retain(|id| id != job_id);
            self.persist(job_id).await;
            self.inner
                .bus
                .broadcast_to_agents(ORCHESTRATOR_ID, "job_cancelled", json!({ "jobId": job_id }))
                .await;
            self.emit(PipelineEvent::JobCancelled {
                job_id: job_id.to_string(),
            });
        }
        Some(job)
    }

    async fn is_cancelled(&self, job_id: &str) -> bool {
        self.inner
            .state
            .read()
            .await
            .job(job_id)
            .map(|job| job.status == JobStatus::Cancelled)
            .unwrap_or(true)
    }

    /// Update an agent card and emit the matching event
    async fn set_agent(
        &self,
        job_id: &str,
        agent_id: &str,
        status: AgentStatus,
        progress: u8,
        message: String,
    ) {
        let job_progress = {
            let mut state = self.inner.state.write().await;
            state.update_agent(
                agent_id,
                status,
                progress,
                message.clone(),
                Some(job_id.to_string()),
            );
            state.job(job_id).map(|job| job.progress).unwrap_or(0.0)
        };
        self.emit(PipelineEvent::AgentProgress {
            job_id: job_id.to_string(),
            agent_id: agent_id.to_string(),
            status,
            progress,
            job_progress,
            message,
        });
    }

    /// Run every agent over one job
    async fn process_job(&self, job_id: &str) {
        let job = {
            let mut state = self.inner.state.write().await;
            match state.job(job_id) {
                Some(job) if job.status == JobStatus::Queued => {}
                _ => {
                    debug!(job_id = %job_id, "Skipping job that is no longer queued");
                    return;
                }
            }
            state.set_job_status(job_id, JobStatus::Processing);
            state.job(job_id).cloned()
        };
        let Some(job) = job else {
            return;
        };

        info!(job_id = %job_id, file_name = %job.file_name, "Starting processing pipeline");
        self.persist(job_id).await;
        self.emit(PipelineEvent::JobStarted(job.clone()));

        let ctx = JobContext::from_job(&job);
        let outcome = self.run_stages(&ctx).await;

        match outcome {
            JobOutcome::Completed => {
                let completed = {
                    let mut state = self.inner.state.write().await;
                    state.set_job_status(job_id, JobStatus::Completed);
                    state.job(job_id).cloned()
                };
                self.persist(job_id).await;
                self.inner
                    .bus
                    .broadcast_to_agents(ORCHESTRATOR_ID, "job_completed", json!({ "jobId": job_id }))
                    .await;
                if let Some(job) = completed {
                    info!(job_id = %job_id, "Processing pipeline completed");
                    self.emit(PipelineEvent::JobCompleted(job));
                }
            }
            JobOutcome::Failed => self.persist(job_id).await,
            JobOutcome::Cancelled => debug!(job_id = %job_id, "Pipeline stopped after cancellation"),
        }

        self.schedule_reset(job_id.to_string());
    }

    async fn run_stages(&self, ctx: &JobContext) -> JobOutcome {
        let agents = self.inner.registry.order().to_vec();
        let total = agents.len().max(1) as f32;
        let step = self.inner.config.progress_step.max(1);
        let mut previous: Option<&'static str> = None;

        for (index, agent) in agents.iter().enumerate() {
            let agent_id = agent.id();
            if self.is_cancelled(&ctx.job_id).await {
                return JobOutcome::Cancelled;
            }

            self.set_agent(
                &ctx.job_id,
                agent_id,
                AgentStatus::Processing,
                0,
                format!("Processing {}", ctx.file_name),
            )
            .await;

            let request = A2AMessage::new(
                ORCHESTRATOR_ID,
                agent_id,
                "process_request",
                json!({
                    "jobId": ctx.job_id,
                    "fileName": ctx.file_name,
                    "fileType": ctx.file_type,
                    "dependencies": previous.map(|p| vec![p]).unwrap_or_default(),
                }),
                MessagePriority::High,
                Transport::A2A,
            );
            let request_id = request.header.message_id.clone();
            self.inner.bus.publish(request).await;

            let mut progress: u8 = 0;
            loop {
                tokio::time::sleep(self.inner.config.step_delay).await;
                if self.is_cancelled(&ctx.job_id).await {
                    self.set_agent(
                        &ctx.job_id,
                        agent_id,
                        AgentStatus::Idle,
                        progress,
                        format!("Cancelled {}", ctx.file_name),
                    )
                    .await;
                    return JobOutcome::Cancelled;
                }
                let job_progress = (index as f32 * 100.0 + progress as f32) / total;
                self.inner
                    .state
                    .write()
                    .await
                    .update_job_progress(&ctx.job_id, job_progress);
                self.set_agent(
                    &ctx.job_id,
                    agent_id,
                    AgentStatus::Processing,
                    progress,
                    format!("Processing {} - {}%", ctx.file_name, progress),
                )
                .await;
                if progress >= 100 {
                    break;
                }
                progress = progress.saturating_add(step).min(100);
            }

            match self.run_agent(agent.as_ref(), ctx).await {
                Ok(results) => {
                    // Check and insert under one lock so a cancel cannot slip in between
                    let recorded = self.inner.state.write().await.record_result(
                        &ctx.job_id,
                        agent_id,
                        results.clone(),
                    );
                    if !recorded {
                        debug!(job_id = %ctx.job_id, agent_id, "Discarding result of finished job");
                        return JobOutcome::Cancelled;
                    }
                    self.set_agent(
                        &ctx.job_id,
                        agent_id,
                        AgentStatus::Completed,
                        100,
                        format!("Completed processing {}", ctx.file_name),
                    )
                    .await;

                    let processing_time = results
                        .get("processing_time")
                        .or_else(|| results.get("extraction_time"))
                        .cloned()
                        .unwrap_or(serde_json::Value::Null);
                    let response = A2AMessage::new(
                        agent_id,
                        ORCHESTRATOR_ID,
                        "process_complete",
                        json!({
                            "jobId": ctx.job_id,
                            "results": results,
                            "processingTime": processing_time,
                        }),
                        MessagePriority::Normal,
                        Transport::A2A,
                    )
                    .correlated_to(request_id);
                    self.inner.bus.publish(response).await;

                    self.emit(PipelineEvent::AgentCompleted {
                        job_id: ctx.job_id.clone(),
                        agent_id: agent_id.to_string(),
                        results,
                    });
                    self.persist(&ctx.job_id).await;
                }
                Err(AgentError::Cancelled) => {
                    self.set_agent(
                        &ctx.job_id,
                        agent_id,
                        AgentStatus::Idle,
                        100,
                        format!("Cancelled {}", ctx.file_name),
                    )
                    .await;
                    return JobOutcome::Cancelled;
                }
                Err(e) => {
                    error!(job_id = %ctx.job_id, agent_id, error = %e, "Agent stage failed");
                    let message = e.to_string();
                    let failed = self
                        .inner
                        .state
                        .write()
                        .await
                        .fail_job(&ctx.job_id, message.clone());
                    if !failed {
                        // Cancelled while the agent ran
                        return JobOutcome::Cancelled;
                    }
                    self.set_agent(
                        &ctx.job_id,
                        agent_id,
                        AgentStatus::Error,
                        0,
                        format!("Error processing {}", ctx.file_name),
                    )
                    .await;

                    let report = A2AMessage::new(
                        agent_id,
                        ORCHESTRATOR_ID,
                        "process_error",
                        json!({ "jobId": ctx.job_id, "error": message }),
                        MessagePriority::Critical,
                        Transport::A2A,
                    )
                    .correlated_to(request_id);
                    self.inner.bus.publish(report).await;

                    self.emit(PipelineEvent::JobError {
                        job_id: ctx.job_id.clone(),
                        agent_id: Some(agent_id.to_string()),
                        error: message,
                    });
                    return JobOutcome::Failed;
                }
            }

            previous = Some(agent_id);
        }

        JobOutcome::Completed
    }

    /// Run one stage under the agent timeout
    ///
    /// A stage that returns after its job was cancelled yields
    /// `AgentError::Cancelled` whatever its own outcome.
    async fn run_agent(
        &self,
        agent: &dyn MediaAgent,
        ctx: &JobContext,
    ) -> Result<serde_json::Value, AgentError> {
        let timeout = self.inner.config.agent_timeout;
        let result = match tokio::time::timeout(timeout, agent.process(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(timeout.as_secs())),
        };
        if self.is_cancelled(&ctx.job_id).await {
            return Err(AgentError::Cancelled);
        }
        result
    }

    /// Return this job's agents to idle after the configured delay
    fn schedule_reset(&self, job_id: JobId) {
        let manager = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(manager.inner.config.agent_reset_delay).await;
            let agents = {
                let mut state = manager.inner.state.write().await;
                if state.reset_agents_for_job(&job_id) == 0 {
                    return;
                }
                state.agents_list().into_iter().cloned().collect()
            };
            manager.emit(PipelineEvent::AgentsReset { agents });
        });
    }
}
