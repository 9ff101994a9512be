mod config;
mod progress;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use events::EventBus;
use llm::{ChatClient, ChatModel, Provider};
use orchestrator::{
    builtin_registry, builtin_task_names, ArxivClient, FailurePolicy, LlmPlanner, LlmReviewer,
    Orchestrator, ReportStore,
};
use researcher_core::{RunOutcome, RunReport, RunState, TaskRunStatus};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ResearcherConfig;

#[derive(Parser)]
#[command(name = "researcher")]
#[command(about = "Plan, run and review research tasks with an LLM", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the configured provider (groq, openrouter)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Override the configured model
    #[arg(long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .researcher/config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Plan, execute and review a research query
    Run {
        query: String,

        /// Skip the per-task review
        #[arg(long)]
        no_review: bool,

        /// Record capability and review failures instead of aborting
        #[arg(long)]
        isolate_failures: bool,

        /// Seed run state, e.g. `--seed text="..."` (values parse as JSON when possible)
        #[arg(long = "seed", value_name = "KEY=VALUE")]
        seeds: Vec<String>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the scheduled plan for a query without executing it
    Plan { query: String },
    /// List the built-in capabilities
    Tasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let mut config = ResearcherConfig::read(&cwd).await;

    if let Some(ref provider) = cli.provider {
        let provider = Provider::parse(provider)
            .ok_or_else(|| anyhow!("Unknown provider '{}'", provider))?;
        config.llm.provider = provider;
    }
    if let Some(ref model) = cli.model {
        config.llm.model = Some(model.clone());
    }

    match cli.command {
        Commands::Init { force } => init_project(&cwd, &config, force).await?,
        Commands::Run {
            query,
            no_review,
            isolate_failures,
            seeds,
            json,
        } => {
            if no_review {
                config.orchestrator.review_each_task = false;
            }
            if isolate_failures {
                config.orchestrator.failure_policy = FailurePolicy::Isolate;
            }
            let seed_state = parse_seeds(&seeds)?;
            run(&cwd, config, &query, seed_state, json).await?;
        }
        Commands::Plan { query } => plan(config, &query).await?,
        Commands::Tasks => list_tasks(),
    }

    Ok(())
}

async fn init_project(cwd: &Path, config: &ResearcherConfig, force: bool) -> Result<()> {
    let config_path = ResearcherConfig::path_in(cwd);

    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    let written = config
        .write(cwd)
        .await
        .context("Failed to write config")?;

    println!("Initialized researcher in {}", cwd.display());
    println!("  Config: {}", written.display());
    println!(
        "  API key: set {} in your environment or .env",
        config.llm.effective_api_key_env()
    );

    Ok(())
}

fn chat_model(config: &ResearcherConfig) -> Result<Arc<dyn ChatModel>> {
    let client = ChatClient::from_env(&config.llm).context("Failed to create LLM client")?;
    tracing::debug!(model = %client.model(), base_url = %client.base_url(), "LLM client ready");
    Ok(Arc::new(client))
}

fn build_orchestrator(config: &ResearcherConfig) -> Result<Orchestrator> {
    let model = chat_model(config)?;
    let papers = ArxivClient::new().context("Failed to create arXiv client")?;
    let registry = builtin_registry(model.clone(), papers);
    let known_tasks: Vec<String> = registry.names().into_iter().map(String::from).collect();

    let planner = LlmPlanner::new(model.clone()).with_known_tasks(known_tasks);

    Ok(Orchestrator::new(Arc::new(planner), Arc::new(registry))
        .with_reviewer(Arc::new(LlmReviewer::new(model)))
        .with_config(config.orchestrator.clone()))
}

async fn run(
    cwd: &Path,
    config: ResearcherConfig,
    query: &str,
    seed_state: RunState,
    json: bool,
) -> Result<()> {
    let bus = EventBus::new();
    let orchestrator = build_orchestrator(&config)?.with_event_bus(bus.clone());
    let printer = (!json).then(|| progress::spawn_printer(&bus));
    drop(bus);

    if !json {
        let review = if orchestrator.review_enabled() { "on" } else { "off" };
        eprintln!("Researching \"{}\" (review {})", query, review);
    }

    let outcome = orchestrator.run(query, Some(seed_state)).await;
    drop(orchestrator);
    if let Some(printer) = printer {
        printer.await.ok();
    }
    let outcome = outcome.context("Research run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        RunOutcome::Completed(report) => {
            let store = ReportStore::new(config.output_dir(cwd));
            let paths = store
                .write_report(&report)
                .await
                .context("Failed to write run report")?;

            if !json {
                print_summary(&report);
                println!("Report: {}", paths.markdown.display());
                println!("JSON:   {}", paths.json.display());
                println!();
            }
            Ok(())
        }
        RunOutcome::PlannerFailed(failure) => {
            let reason = failure.reason.unwrap_or_else(|| failure.error.clone());
            bail!("Planner failed: {}", reason)
        }
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{} {}", "Query:".bold(), report.query);
    println!("{} {}", "Run:  ".bold(), report.run_id);
    println!();

    for entry in &report.run_log {
        let icon = match entry.status {
            TaskRunStatus::Completed => "●".green(),
            TaskRunStatus::Skipped => "○".yellow(),
            TaskRunStatus::Failed => "✗".red(),
        };
        let mut line = format!("  {} {}", icon, entry.task);
        if !entry.produced.is_empty() {
            line.push_str(&format!(" -> {}", entry.produced.join(", ")));
        }
        if let Some(ref review) = entry.review {
            line.push_str(&format!(" ({} review issues)", review.issues.len()));
        }
        println!("{}", line);
        if let Some(ref error) = entry.error {
            println!("      {}", error.red());
        }
    }

    if !report.degraded.is_empty() {
        println!();
        println!(
            "{} {}",
            "Scheduled without dependency guarantees:".yellow(),
            report.degraded.join(", ")
        );
    }

    println!();
    println!(
        "{} completed, {} skipped, {} failed",
        report.count_with_status(TaskRunStatus::Completed),
        report.count_with_status(TaskRunStatus::Skipped),
        report.count_with_status(TaskRunStatus::Failed)
    );
}

async fn plan(config: ResearcherConfig, query: &str) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let schedule = orchestrator
        .schedule(query)
        .await
        .context("Failed to plan query")?;

    println!();
    println!("{} {}", "Query:".bold(), query);
    println!();
    if schedule.is_degraded() {
        println!(
            "{} {}",
            "Cycle or unknown dependency, scheduled without guarantees:".yellow(),
            schedule.degraded.join(", ")
        );
        println!();
    }
    for (i, task) in schedule.order.iter().enumerate() {
        let degraded = schedule.degraded.contains(&task.name);
        let marker = if degraded { " (degraded)".yellow() } else { "".normal() };
        println!("  {}. {}{}", i + 1, task.name, marker);
        if !task.dependencies.is_empty() {
            println!("      after: {}", task.dependencies.join(", "));
        }
    }
    println!();

    Ok(())
}

fn list_tasks() {
    println!("Built-in tasks:");
    for name in builtin_task_names() {
        println!("  {}", name);
    }
}

/// Parse `key=value` pairs into seed state. Values that are valid JSON keep
/// their type, anything else is stored as a string.
fn parse_seeds(seeds: &[String]) -> Result<RunState> {
    let mut state = RunState::new();
    for seed in seeds {
        let (key, raw) = seed
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid seed '{}', expected KEY=VALUE", seed))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid seed '{}', key must not be empty", seed);
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        state.insert(key, value);
    }
    Ok(state)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "researcher=info,orchestrator=info,llm=info".into()),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_seeds_keeps_json_types() {
        let seeds = vec![
            "text=RAG reduces hallucinations".to_string(),
            "limit=5".to_string(),
            "meta={\"source\": \"arxiv\"}".to_string(),
        ];
        let state = parse_seeds(&seeds).unwrap();

        assert_eq!(state.get("text"), Some(&json!("RAG reduces hallucinations")));
        assert_eq!(state.get("limit"), Some(&json!(5)));
        assert_eq!(state.get("meta"), Some(&json!({"source": "arxiv"})));
    }

    #[test]
    fn test_parse_seeds_value_may_contain_equals() {
        let state = parse_seeds(&["q=a=b".to_string()]).unwrap();
        assert_eq!(state.get("q"), Some(&json!("a=b")));
    }

    #[test]
    fn test_parse_seeds_rejects_malformed() {
        assert!(parse_seeds(&["no-separator".to_string()]).is_err());
        assert!(parse_seeds(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::parse_from([
            "researcher",
            "run",
            "rag hallucinations",
            "--no-review",
            "--isolate-failures",
            "--seed",
            "text=abc",
            "--seed",
            "n=1",
            "--json",
        ]);

        match cli.command {
            Commands::Run {
                query,
                no_review,
                isolate_failures,
                seeds,
                json,
            } => {
                assert_eq!(query, "rag hallucinations");
                assert!(no_review);
                assert!(isolate_failures);
                assert_eq!(seeds, vec!["text=abc", "n=1"]);
                assert!(json);
            }
            _ => panic!("Expected run command"),
        }
    }
}
