//! Dependency ordering for planned tasks.
//!
//! Kahn's algorithm with plan-order tie breaking. Tasks whose dependencies
//! never resolve (cycles, names missing from the plan, or anything
//! downstream of those) are appended after the sorted prefix in plan order
//! and reported as degraded instead of rejected.

use std::collections::{HashSet, VecDeque};

use researcher_core::Task;
use serde::Serialize;
use tracing::{debug, warn};

/// Execution order produced by [`Scheduler::schedule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub order: Vec<Task>,
    /// Names of tasks placed without a dependency guarantee.
    pub degraded: Vec<String>,
}

impl Schedule {
    pub fn task_names(&self) -> Vec<String> {
        self.order.iter().map(|t| t.name.clone()).collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn into_order(self) -> Vec<Task> {
        self.order
    }
}

pub struct Scheduler;

impl Scheduler {
    pub fn schedule(tasks: &[Task]) -> Schedule {
        let mut pending: Vec<HashSet<&str>> = tasks
            .iter()
            .map(|t| t.dependencies.iter().map(String::as_str).collect())
            .collect();
        let mut emitted = vec![false; tasks.len()];

        let mut ready: VecDeque<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(tasks.len());

        while let Some(index) = ready.pop_front() {
            if emitted[index] {
                continue;
            }
            emitted[index] = true;
            let name = tasks[index].name.as_str();
            order.push(tasks[index].clone());

            for (other, deps) in pending.iter_mut().enumerate() {
                if emitted[other] || deps.is_empty() {
                    continue;
                }
                if deps.remove(name) && deps.is_empty() {
                    ready.push_back(other);
                }
            }
        }

        let mut degraded = Vec::new();
        for (index, task) in tasks.iter().enumerate() {
            if !emitted[index] {
                degraded.push(task.name.clone());
                order.push(task.clone());
            }
        }

        if degraded.is_empty() {
            debug!(tasks = order.len(), "Scheduled plan");
        } else {
            warn!(
                degraded = ?degraded,
                "Unresolved dependencies (cycle or missing task); appending in plan order"
            );
        }

        Schedule { order, degraded }
    }

    /// Ordered tasks only, for callers that ignore degradation.
    pub fn order(tasks: &[Task]) -> Vec<Task> {
        Self::schedule(tasks).into_order()
    }
}
