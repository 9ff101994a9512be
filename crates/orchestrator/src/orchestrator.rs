//! One research run: plan, schedule, execute and review.

use std::sync::Arc;

use chrono::Utc;
use events::{Event, EventBus};
use researcher_core::{LogEntry, Plan, PlannerFailure, RunOutcome, RunReport, RunState};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{FailurePolicy, OrchestratorConfig};
use crate::emitter::OrderedEventEmitter;
use crate::error::{OrchestratorError, Result};
use crate::parsing;
use crate::planner::Planner;
use crate::registry::CapabilityRegistry;
use crate::review_gate::ReviewGate;
use crate::reviewer::Reviewer;
use crate::scheduler::{Schedule, Scheduler};
use crate::state_machine::{RunPhase, RunStateMachine};
use crate::worker::{Worker, WorkerOutcome};

/// State key seeded with the query unless the caller already set it.
pub const QUERY_KEY: &str = "query";

pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    worker: Worker,
    review_gate: Option<ReviewGate>,
    config: OrchestratorConfig,
    emitter: Option<OrderedEventEmitter>,
}

impl Orchestrator {
    pub fn new(planner: Arc<dyn Planner>, registry: Arc<CapabilityRegistry>) -> Self {
        let config = OrchestratorConfig::default();
        Self {
            planner,
            worker: Worker::new(registry).with_failure_policy(config.failure_policy),
            review_gate: None,
            config,
            emitter: None,
        }
    }

    /// Enable the review gate. [`Orchestrator::run`] uses it when the config's
    /// `review_each_task` is set.
    pub fn with_reviewer(mut self, reviewer: Arc<dyn Reviewer>) -> Self {
        self.review_gate = Some(ReviewGate::new(reviewer));
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.worker = self.worker.with_failure_policy(config.failure_policy);
        self.config = config;
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.emitter = Some(OrderedEventEmitter::new(bus));
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Whether [`Orchestrator::run`] will critique each task.
    pub fn review_enabled(&self) -> bool {
        self.review_gate.is_some() && self.config.review_each_task
    }

    fn emit(&self, event: Event) {
        if let Some(ref emitter) = self.emitter {
            emitter.emit(event);
        }
    }

    async fn obtain_plan(&self, query: &str) -> std::result::Result<Plan, String> {
        let value = self.planner.plan(query).await.map_err(|e| e.to_string())?;
        parsing::plan_from_value(value).map_err(|e| e.to_string())
    }

    /// Ask the planner for a plan and order it, without executing anything.
    pub async fn schedule(&self, query: &str) -> Result<Schedule> {
        let plan = self
            .obtain_plan(query)
            .await
            .map_err(OrchestratorError::PlanningFailed)?;
        Ok(Scheduler::schedule(plan.tasks()))
    }

    /// Run `query` end to end, reviewing tasks as the config says.
    pub async fn run(&self, query: &str, initial_state: Option<RunState>) -> Result<RunOutcome> {
        self.run_with_review(query, initial_state, self.config.review_each_task)
            .await
    }

    /// Run `query` end to end, overriding the configured review flag.
    ///
    /// A planner that errors or returns anything other than a valid, non-empty
    /// task list yields [`RunOutcome::PlannerFailed`] carrying the seeded
    /// state. Capability and reviewer errors surface as `Err` under
    /// [`FailurePolicy::Abort`] and are recorded in the log otherwise.
    pub async fn run_with_review(
        &self,
        query: &str,
        initial_state: Option<RunState>,
        review_each_task: bool,
    ) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut phase = RunPhase::Planning;

        let mut state = initial_state.unwrap_or_default();
        state.insert_if_absent(QUERY_KEY, query);

        info!(run_id = %run_id, query = %query, "Starting research run");
        self.emit(Event::RunStarted {
            run_id,
            query: query.to_string(),
        });

        let plan = match self.obtain_plan(query).await {
            Ok(plan) => plan,
            Err(reason) => {
                RunStateMachine::advance(&mut phase, RunPhase::PlanFailed)?;
                warn!(run_id = %run_id, reason = %reason, "Planner failed");
                self.emit(Event::PlanFailed {
                    run_id,
                    reason: reason.clone(),
                });
                return Ok(RunOutcome::PlannerFailed(PlannerFailure::new(
                    state,
                    Some(reason),
                )));
            }
        };

        info!(run_id = %run_id, tasks = plan.len(), "Plan received");
        self.emit(Event::PlanReceived {
            run_id,
            task_count: plan.len(),
        });

        RunStateMachine::advance(&mut phase, RunPhase::Scheduling)?;
        let Schedule { order, degraded } = Scheduler::schedule(plan.tasks());
        let task_names: Vec<String> = order.iter().map(|t| t.name.clone()).collect();
        self.emit(Event::PlanScheduled {
            run_id,
            order: task_names.clone(),
            degraded: degraded.clone(),
        });

        let review_gate = self.review_gate.as_ref().filter(|_| review_each_task);
        let mut run_log = Vec::with_capacity(order.len());

        for (position, task) in order.iter().enumerate() {
            RunStateMachine::advance(&mut phase, RunPhase::Executing(position))?;
            self.emit(Event::TaskStarted {
                run_id,
                task: task.name.clone(),
                position,
            });

            let outcome = match self.worker.execute(task, &mut state).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.emit(Event::TaskFailed {
                        run_id,
                        task: task.name.clone(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };

            let mut entry = match outcome {
                WorkerOutcome::Completed { produced } => {
                    self.emit(Event::TaskCompleted {
                        run_id,
                        task: task.name.clone(),
                        produced: produced.clone(),
                    });
                    LogEntry::completed(&task.name, produced)
                }
                WorkerOutcome::Skipped => {
                    self.emit(Event::TaskSkipped {
                        run_id,
                        task: task.name.clone(),
                    });
                    LogEntry::skipped(&task.name)
                }
                WorkerOutcome::Failed { error } => {
                    self.emit(Event::TaskFailed {
                        run_id,
                        task: task.name.clone(),
                        error: error.clone(),
                    });
                    LogEntry::failed(&task.name, error)
                }
            };

            if let Some(gate) = review_gate {
                RunStateMachine::advance(&mut phase, RunPhase::Reviewing(position))?;
                match gate.review_task(task, &mut state).await {
                    Ok(Some(result)) => {
                        self.emit(Event::TaskReviewed {
                            run_id,
                            task: task.name.clone(),
                            issue_count: result.issues_found.len(),
                            quality_score: result.quality_score,
                        });
                        entry = entry.with_review(task.review_key(), result.issues_found);
                    }
                    Ok(None) => {}
                    Err(e) => match self.config.failure_policy {
                        FailurePolicy::Abort => {
                            return Err(OrchestratorError::review_failed(&task.name, e));
                        }
                        FailurePolicy::Isolate => {
                            warn!(task = %task.name, error = %e, "Review failed, continuing without it");
                            self.emit(Event::Error {
                                message: format!("Review failed: {}", e),
                                context: Some(task.name.clone()),
                            });
                        }
                    },
                }
            }

            run_log.push(entry);
        }

        RunStateMachine::advance(&mut phase, RunPhase::Done)?;
        info!(
            run_id = %run_id,
            tasks = task_names.len(),
            degraded = degraded.len(),
            "Research run complete"
        );
        self.emit(Event::RunCompleted {
            run_id,
            task_count: task_names.len(),
        });

        Ok(RunOutcome::Completed(RunReport {
            run_id,
            query: query.to_string(),
            state,
            run_log,
            tasks: task_names,
            degraded,
            started_at,
            finished_at: Utc::now(),
        }))
    }
}
