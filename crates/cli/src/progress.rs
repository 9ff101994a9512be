//! Live progress lines for a running research query.

use events::{Event, EventBus};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// One human-readable line for `event`, or `None` for events not worth showing.
pub fn progress_line(event: &Event) -> Option<String> {
    let line = match event {
        Event::PlanReceived { task_count, .. } => format!("Planned {} tasks", task_count),
        Event::PlanScheduled { degraded, .. } if !degraded.is_empty() => {
            format!("Scheduled (no dependency guarantees for {})", degraded.join(", "))
        }
        Event::PlanFailed { reason, .. } => format!("Planning failed: {}", reason),
        Event::TaskStarted { task, position, .. } => format!("[{}] {}...", position + 1, task),
        Event::TaskCompleted { task, produced, .. } if produced.is_empty() => {
            format!("    {} done", task)
        }
        Event::TaskCompleted { task, produced, .. } => {
            format!("    {} done -> {}", task, produced.join(", "))
        }
        Event::TaskSkipped { task, .. } => format!("    {} skipped (no capability)", task),
        Event::TaskFailed { task, error, .. } => format!("    {} failed: {}", task, error),
        Event::TaskReviewed {
            task,
            issue_count,
            quality_score,
            ..
        } => format!(
            "    {} reviewed: {} issues, quality {:.2}",
            task, issue_count, quality_score
        ),
        Event::Error { message, context } => match context {
            Some(context) => format!("    {}: {}", context, message),
            None => format!("    {}", message),
        },
        Event::RunStarted { .. } | Event::PlanScheduled { .. } | Event::RunCompleted { .. } => {
            return None
        }
    };
    Some(line)
}

/// Print progress for every event on `bus` to stderr until the run ends or
/// the bus goes away.
pub fn spawn_printer(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    if let Some(line) = progress_line(&envelope.event) {
                        eprintln!("{}", line);
                    }
                    if matches!(
                        envelope.event,
                        Event::RunCompleted { .. } | Event::PlanFailed { .. }
                    ) {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => eprintln!("    ({} progress events dropped)", n),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
