//! # MathShorts — Daily Content Workflow Engine
//!
//! One binary wires the pipeline together: problem generation with
//! fallback, per-language narration, the approval gate with its
//! auto-approve sweep, and publishing.
//!
//! Usage:
//!   mathshorts start                     # schedule + sweep loops + gateway
//!   mathshorts run-slot morning          # trigger one slot manually
//!   mathshorts pending                   # list tickets awaiting review
//!   mathshorts resolve <id> approve      # decide a ticket from the CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mathshorts_approval::{ApprovalGate, Notifier, TicketStore};
use mathshorts_core::MathShortsConfig;
use mathshorts_core::config::expand_tilde;
use mathshorts_core::types::TimeSlot;
use mathshorts_gateway::AppState;
use mathshorts_problems::ApiProblemSource;
use mathshorts_publish::VideoUploadSink;
use mathshorts_scheduler::WorkflowEngine;
use mathshorts_scheduler::engine::{run_schedule_loop, run_sweep_loop};
use mathshorts_voice::TtsNarrationSource;

#[derive(Parser)]
#[command(
    name = "mathshorts",
    version,
    about = "📚 MathShorts — automated daily math video workflow"
)]
struct Cli {
    /// Config file (default: ~/.mathshorts/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full engine: slot schedule, approval sweep, and gateway.
    Start,
    /// Trigger one slot run now and leave it awaiting approval.
    RunSlot {
        /// morning | lunch
        slot: TimeSlot,
    },
    /// List tickets awaiting review.
    Pending,
    /// Decide a pending ticket.
    Resolve {
        ticket_id: String,
        /// approve | reject
        decision: String,
        #[arg(long)]
        feedback: Option<String>,
    },
}

fn build_engine(config: MathShortsConfig) -> Result<Arc<WorkflowEngine>> {
    let store = TicketStore::open(&expand_tilde(&config.approval.db_path))
        .map_err(|e| anyhow::anyhow!("ticket store: {e}"))?;
    let gate = ApprovalGate::new(
        store,
        Notifier::from_config(&config.notify),
        config.approval.window_secs,
    );

    let problems = Arc::new(ApiProblemSource::new(&config.generator));
    let narrator = Arc::new(TtsNarrationSource::new(&config.voice));
    let publisher = Arc::new(VideoUploadSink::new(&config.publish));

    Ok(Arc::new(WorkflowEngine::new(
        problems,
        narrator,
        Arc::new(gate),
        publisher,
        config,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mathshorts=debug,tower_http=debug"
    } else {
        "mathshorts=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => MathShortsConfig::load_from(path)?,
        None => MathShortsConfig::load()?,
    };

    match cli.command {
        Command::Start => {
            tracing::info!(
                "📚 MathShorts starting: {} languages, {} schedule entries",
                config.content.languages.len(),
                config.schedule.entries.len()
            );
            let engine = build_engine(config)?;
            let gateway_config = engine.config().gateway.clone();

            tokio::spawn(run_schedule_loop(Arc::clone(&engine)));
            tokio::spawn(run_sweep_loop(Arc::clone(&engine)));

            mathshorts_gateway::serve(
                AppState::new(engine),
                &gateway_config.host,
                gateway_config.port,
            )
            .await?;
        }
        Command::RunSlot { slot } => {
            let engine = build_engine(config)?;
            let run = engine.run_slot(slot).await?;
            println!("🎫 Submitted for approval:");
            println!("   bundle: {}", run.bundle_id);
            println!("   ticket: {}", run.ticket_id);
            for (language, ok) in &run.narration_succeeded {
                println!("   {language}: {}", if *ok { "narrated" } else { "failed" });
            }
        }
        Command::Pending => {
            let engine = build_engine(config)?;
            let pending = engine.pending_tickets()?;
            if pending.is_empty() {
                println!("No tickets awaiting review.");
            }
            for ticket in pending {
                println!(
                    "{}  [{}]  deadline {}  {}",
                    ticket.id,
                    ticket.bundle.time_slot,
                    ticket.deadline.format("%Y-%m-%d %H:%M UTC"),
                    ticket.bundle.preview()
                );
            }
        }
        Command::Resolve {
            ticket_id,
            decision,
            feedback,
        } => {
            let engine = build_engine(config)?;
            let decision = decision
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let (ticket, result) = engine
                .resolve(&ticket_id, decision, feedback.as_deref())
                .await?;
            println!("🎯 Ticket {} → {}", ticket.id, ticket.status);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
