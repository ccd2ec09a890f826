//! CLI entrypoint for llm-council
//!
//! Wires together all layers using dependency injection: config, the
//! OpenRouter gateway, the retrieval engine, and the orchestrator, then
//! streams one council turn (plus optional follow-ups) to the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use council_application::{
    ConversationStore, ModelGateway, NoTurnLogger, RetrievalEngine, SendMessageUseCase,
    TurnLogger,
};
use council_domain::{ConversationId, ModelId, ModelRegistry, TurnEvent, TurnMode};
use council_infrastructure::{
    ConfigLoader, GatewaySettings, HashedEmbedder, InMemoryConversationStore, JsonlTurnLogger,
    OpenRouterGateway,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "llm-council",
    about = "Ask a council of LLMs, let them peer-review anonymously, and get a synthesized answer"
)]
struct Cli {
    /// The question to ask the council
    question: Option<String>,

    /// Follow-up questions, answered by the chairman with retrieved context
    #[arg(long = "follow-up")]
    follow_ups: Vec<String>,

    /// Council member model ids (overrides configuration)
    #[arg(long = "member")]
    members: Vec<String>,

    /// Chairman model id (overrides configuration)
    #[arg(long)]
    chairman: Option<String>,

    /// Session budget in USD
    #[arg(long)]
    budget: Option<f64>,

    /// Pipeline selection: auto (structural), council, or chat
    #[arg(long, default_value = "auto")]
    mode: String,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip config files and use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress progress output, print only the final answer
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let question = match cli.question {
        Some(q) => q,
        None => bail!("A question is required."),
    };

    // Configuration
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    let registry = Arc::new(ModelRegistry::curated());
    for issue in config.validate(&registry) {
        warn!("config: {issue}");
    }

    // === Dependency injection ===
    let api_key = std::env::var(&config.gateway.api_key_env).with_context(|| {
        format!(
            "{} is not set. Get a key at https://openrouter.ai/ and export it.",
            config.gateway.api_key_env
        )
    })?;
    let settings = GatewaySettings::new(api_key)
        .with_base_url(config.gateway.base_url.clone())
        .with_timeout(config.gateway.timeout())
        .with_max_retries(config.gateway.max_retries);
    let gateway = Arc::new(OpenRouterGateway::new(settings, Arc::clone(&registry))?);

    // Refresh pricing from the live listing when reachable
    let registry = match gateway.list_models().await {
        Ok(models) => Arc::new(ModelRegistry::new(models)),
        Err(e) => {
            warn!("model listing refresh failed, using curated registry: {e}");
            registry
        }
    };

    let logger: Arc<dyn TurnLogger> = match &config.logging.turn_log_dir {
        Some(dir) => match JsonlTurnLogger::new(dir.join("turns.jsonl")) {
            Some(logger) => {
                info!("logging turn events to {}", logger.path().display());
                Arc::new(logger)
            }
            None => Arc::new(NoTurnLogger),
        },
        None => Arc::new(NoTurnLogger),
    };

    let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
    let retrieval = Arc::new(RetrievalEngine::new(
        Arc::new(HashedEmbedder::default()),
        config.retrieval_params(),
    ));

    let members: Vec<ModelId> = if cli.members.is_empty() {
        config.council_members(&registry)
    } else {
        cli.members.iter().map(|m| ModelId::from(m.as_str())).collect()
    };
    let chairman = match cli.chairman.map(|c| ModelId::from(c.as_str())) {
        Some(chairman) => chairman,
        None => config
            .chairman(&registry)
            .context("no chairman model configured and none available in the registry")?,
    };

    let mut budget_policy = config.budget_policy();
    if let Some(budget) = cli.budget {
        budget_policy.budget_usd = Some(budget);
    }

    let orchestrator = SendMessageUseCase::new(
        gateway,
        Arc::clone(&registry),
        store,
        retrieval,
        logger,
        config.utility_model(),
        config.council.include_self_in_ranking,
    )
    .with_tier_ceilings(config.tier_ceilings());

    if !cli.quiet {
        println!();
        println!("{}", "llm-council".bold());
        println!("Question: {question}");
        println!(
            "Council:  {}",
            members
                .iter()
                .map(|m| m.short_name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Chairman: {}", chairman.short_name());
        println!();
    }

    let mode = match cli.mode.as_str() {
        "auto" => TurnMode::Auto,
        "council" => TurnMode::Council,
        "chat" => TurnMode::Chat,
        other => bail!("unknown mode '{other}' (expected auto, council, or chat)"),
    };

    let conversation = orchestrator
        .create_conversation(None, members, chairman, budget_policy)
        .await?;

    stream_turn(&orchestrator, &conversation.id, &question, mode, cli.quiet).await?;

    for follow_up in &cli.follow_ups {
        if !cli.quiet {
            println!();
            println!("{} {follow_up}", "Follow-up:".bold());
        }
        stream_turn(&orchestrator, &conversation.id, follow_up, mode, cli.quiet).await?;
    }

    Ok(())
}

/// Run one streaming turn and print its events.
async fn stream_turn(
    orchestrator: &SendMessageUseCase,
    conversation: &ConversationId,
    content: &str,
    mode: TurnMode,
    quiet: bool,
) -> Result<()> {
    let mut rx = orchestrator
        .send_message_stream(conversation, content, mode, vec![])
        .await?;

    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        print_event(&event, quiet);
        if terminal {
            if let TurnEvent::Error { message } = event {
                bail!("turn failed: {message}");
            }
            break;
        }
    }

    Ok(())
}

fn print_event(event: &TurnEvent, quiet: bool) {
    match event {
        TurnEvent::Stage1Start => {
            if !quiet {
                println!("{}", "Stage 1: collecting council answers...".dimmed());
            }
        }
        TurnEvent::Stage1Complete { data } => {
            if !quiet {
                for response in data {
                    println!(
                        "  {} answered ({} tokens)",
                        response.model.short_name().green(),
                        response.usage.total()
                    );
                }
            }
        }
        TurnEvent::Stage2Start => {
            if !quiet {
                println!("{}", "Stage 2: anonymized peer ranking...".dimmed());
            }
        }
        TurnEvent::Stage2Complete { metadata, .. } => {
            if !quiet {
                for entry in &metadata.aggregate_rankings {
                    match entry.average_rank {
                        Some(avg) => println!(
                            "  {} avg rank {:.2} ({} votes)",
                            entry.model.short_name().cyan(),
                            avg,
                            entry.rankings_count
                        ),
                        None => println!(
                            "  {} {}",
                            entry.model.short_name().cyan(),
                            "unranked".dimmed()
                        ),
                    }
                }
            }
        }
        TurnEvent::Stage3Start => {
            if !quiet {
                println!("{}", "Stage 3: chairman synthesis...".dimmed());
            }
        }
        TurnEvent::Stage3Complete { data } => {
            println!();
            println!(
                "{} (confidence: {})",
                "Final answer".bold(),
                data.confidence.as_str().yellow()
            );
            println!("{}", data.response);
        }
        TurnEvent::ChatStart => {
            if !quiet {
                println!("{}", "Asking the chairman...".dimmed());
            }
        }
        TurnEvent::ChatResponse { data } => {
            println!();
            println!("{}", data.content);
        }
        TurnEvent::TitleComplete { data } => {
            if !quiet {
                println!("{} {}", "Title:".dimmed(), data.title);
            }
        }
        TurnEvent::Complete { data } => {
            if !quiet {
                match data {
                    Some(stats) => {
                        println!();
                        println!("{} ${:.4}", "Total cost:".dimmed(), stats.total_cost);
                    }
                    None => println!(),
                }
            }
        }
        TurnEvent::Error { message } => {
            eprintln!("{} {message}", "Error:".red().bold());
        }
    }
}
