//! Research task orchestration.
//!
//! A [`Planner`] turns a query into tasks, the [`Scheduler`] orders them by
//! dependency, the [`Worker`] runs each one against shared [`RunState`]
//! through the [`CapabilityRegistry`], and an optional [`ReviewGate`]
//! critiques every task's output. [`Orchestrator`] ties the steps together.
//!
//! [`RunState`]: researcher_core::RunState

pub mod arxiv;
pub mod capabilities;
pub mod config;
pub mod emitter;
pub mod error;
pub mod orchestrator;
pub mod parsing;
pub mod planner;
pub mod prompts;
pub mod registry;
pub mod reports;
pub mod review_gate;
pub mod reviewer;
pub mod scheduler;
pub mod state_machine;
pub mod worker;

pub use arxiv::{ArxivClient, Paper, SearchPapersCapability};
pub use capabilities::{builtin_registry, builtin_task_names, PromptCapability, PromptKind};
pub use config::{FailurePolicy, OrchestratorConfig};
pub use emitter::OrderedEventEmitter;
pub use error::{OrchestratorError, Result};
pub use orchestrator::{Orchestrator, QUERY_KEY};
pub use planner::{LlmPlanner, Planner, StaticPlanner};
pub use registry::{
    Capability, CapabilityError, CapabilityInputs, CapabilityOutput, CapabilityRegistry,
    CapabilityResult, FnCapability,
};
pub use reports::{ReportPaths, ReportStore};
pub use review_gate::ReviewGate;
pub use reviewer::{LlmReviewer, Reviewer};
pub use scheduler::{Schedule, Scheduler};
pub use state_machine::{RunPhase, RunStateMachine};
pub use worker::{Worker, WorkerOutcome};
