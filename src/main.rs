mod cli;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use tickflow::anthropic::AnthropicClient;
use tickflow::applier::ResultApplier;
use tickflow::bus::InMemoryEventBus;
use tickflow::config::TickflowConfig;
use tickflow::domain::{Actor, NewComment, NewTicket, Priority};
use tickflow::enrichment::{
    EnrichmentOrchestrator, EnrichmentOutcome, KeywordScorer, LlmScorer, ScoreRequest,
    SentimentProvider,
};
use tickflow::events::DomainEventPublisher;
use tickflow::service::TicketService;
use tickflow::store::{InMemoryStore, TicketStore};
use tickflow::workflow::{SUPPORT_WORKFLOW, TicketStatus};
use ui::PipelineProgress;

const CUSTOMER: u64 = 10;
const AGENT: u64 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = TickflowConfig::load()?;
    if let Some(ms) = cli.timeout_ms {
        config.provider_timeout_ms = ms;
    }

    match cli.command {
        Command::Demo { live } => {
            if live && config.has_api_key() {
                let client = AnthropicClient::new(config.api_key.clone(), config.provider_timeout())
                    .context("failed to build Anthropic client")?;
                let scorer = LlmScorer::new(client, config.model.clone(), config.max_tokens);
                run_demo(scorer, &config).await
            } else {
                if live {
                    tracing::warn!("No API key configured, using the keyword scorer");
                }
                run_demo(KeywordScorer, &config).await
            }
        }
        Command::Workflow => {
            ui::print_workflow(&SUPPORT_WORKFLOW);
            Ok(())
        }
        Command::Transitions { status } => {
            println!(
                "{status} → {}",
                ui::describe_targets(SUPPORT_WORKFLOW.targets(status))
            );
            Ok(())
        }
        Command::Analyze { text, comment } => analyze(&config, text, comment).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tickflow=debug" } else { "tickflow=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn analyze(config: &TickflowConfig, text: String, comment: bool) -> Result<()> {
    if !config.has_api_key() {
        bail!("no API key: set ANTHROPIC_API_KEY or api_key in tickflow.toml");
    }
    let client = AnthropicClient::new(config.api_key.clone(), config.provider_timeout())
        .context("failed to build Anthropic client")?;
    let scorer = LlmScorer::new(client, config.model.clone(), config.max_tokens);
    let publisher = DomainEventPublisher::new(InMemoryEventBus::new(), config.topics.clone());
    let orchestrator = EnrichmentOrchestrator::new(scorer, publisher, config.provider_timeout());

    let request = if comment {
        ScoreRequest::Comment { content: text }
    } else {
        ScoreRequest::Ticket {
            title: text,
            description: String::new(),
            category: None,
        }
    };

    match orchestrator.evaluate(&request).await {
        EnrichmentOutcome::Scored(analysis) => {
            println!("sentiment: {}", analysis.score);
            println!(
                "category:  {}",
                analysis.category.as_deref().unwrap_or("-")
            );
        }
        EnrichmentOutcome::Fallback(e) => {
            println!("sentiment: 0.00 (fallback: {e})");
        }
    }
    Ok(())
}

/// Runs the whole pipeline in-process against one scripted ticket.
async fn run_demo<P: SentimentProvider>(provider: P, config: &TickflowConfig) -> Result<()> {
    let progress = PipelineProgress::start("Wiring pipeline");
    let topics = config.topics.clone();

    let store = Arc::new(InMemoryStore::new());
    let bus = InMemoryEventBus::new();
    let publisher = DomainEventPublisher::new(bus.clone(), topics.clone());
    let service = TicketService::new(Arc::clone(&store), publisher.clone())
        .with_max_conflict_retries(config.max_conflict_retries);

    let lifecycle = bus.subscribe(&topics.lifecycle());
    let results = bus.subscribe(&[topics.analysis_result.as_str()]);
    let orchestrator = EnrichmentOrchestrator::new(provider, publisher, config.provider_timeout());
    let enrichment = tokio::spawn(orchestrator.run(lifecycle));
    let applier = tokio::spawn(ResultApplier::new(Arc::clone(&store)).run(results));

    progress.stage("Creating ticket");
    let billing = store_category_id(&service, "Billing")?;
    let ticket = service
        .create_ticket(NewTicket {
            title: "Charged twice for my subscription".into(),
            description: "I was charged twice this month and I'm furious. I want a refund now."
                .into(),
            customer_id: CUSTOMER,
            category_id: billing,
            priority: Priority::High,
        })
        .await?;
    progress.ok(&format!("Created ticket #{} ({})", ticket.id, ticket.status));

    service.assign(ticket.id, AGENT, Actor::User(1))?;
    progress.ok(&format!("Assigned to agent {AGENT}"));

    progress.stage("Walking the workflow");
    let record = service
        .transition(
            ticket.id,
            TicketStatus::InProgress,
            Actor::User(AGENT),
            Some("looking into the duplicate charge"),
        )
        .await?;
    progress.ok(&record.message());

    match service
        .transition(ticket.id, TicketStatus::Closed, Actor::User(AGENT), None)
        .await
    {
        Ok(record) => progress.ok(&record.message()),
        Err(e) => progress.rejected(&e.to_string()),
    }

    service
        .add_comment(NewComment {
            ticket_id: ticket.id,
            author: Actor::User(CUSTOMER),
            content: "Still waiting on this, it's unacceptable.".into(),
            internal: false,
        })
        .await?;
    progress.ok("Customer commented");

    let record = service
        .transition(ticket.id, TicketStatus::Resolved, Actor::User(AGENT), Some("refund issued"))
        .await?;
    progress.ok(&record.message());

    service
        .add_comment(NewComment {
            ticket_id: ticket.id,
            author: Actor::User(CUSTOMER),
            content: "Thanks, that works now!".into(),
            internal: false,
        })
        .await?;
    progress.ok("Customer commented");

    let record = service
        .transition(ticket.id, TicketStatus::Closed, Actor::User(AGENT), None)
        .await?;
    progress.ok(&record.message());

    progress.stage("Draining enrichment");
    let lifecycle_topics = topics.lifecycle();
    progress.note(&format!("Closing {}", lifecycle_topics.join(", ")));
    bus.close_topics(&lifecycle_topics);
    let scored = enrichment.await.context("enrichment task panicked")?;
    bus.close_topics(&[topics.analysis_result.as_str()]);
    let applied = applier.await.context("applier task panicked")?;
    progress.finish();
    println!("  Scored {scored} events, applied {applied} results");

    let ticket = service.ticket(ticket.id)?;
    progress.print_ticket(&ticket);
    progress.print_comments(&service.comments(ticket.id)?);
    progress.print_json("Audit Trail", &service.history(ticket.id));
    Ok(())
}

fn store_category_id(
    service: &TicketService<InMemoryStore, InMemoryEventBus>,
    name: &str,
) -> Result<u64> {
    service
        .store()
        .category_by_name(name)
        .map(|c| c.id)
        .with_context(|| format!("category {name} missing from catalog"))
}
