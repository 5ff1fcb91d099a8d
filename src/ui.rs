//! Interface de terminal do tickflow: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`PipelineProgress`] acompanha visualmente
//! a execução da demonstração no terminal.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use tickflow::domain::{Comment, Ticket};
use tickflow::workflow::{TicketStatus, WorkflowDefinition};

/// Indicador visual de progresso para a demonstração do pipeline.
pub struct PipelineProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl PipelineProgress {
    /// Inicia o spinner com uma mensagem inicial.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Atualiza a mensagem do spinner.
    pub fn stage(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    pub fn ok(&self, message: &str) {
        self.pb
            .println(format!("  {} {message}", self.green.apply_to("✓")));
    }

    pub fn rejected(&self, message: &str) {
        self.pb
            .println(format!("  {} {message}", self.red.apply_to("✗")));
    }

    pub fn note(&self, message: &str) {
        self.pb
            .println(format!("  {} {message}", self.yellow.apply_to("•")));
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    pub fn print_ticket(&self, ticket: &Ticket) {
        let sentiment = ticket
            .sentiment_score
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        let suggested = ticket
            .suggested_category
            .as_ref()
            .map_or("-", |c| c.name.as_str());
        println!();
        println!("{}", self.green.apply_to(format!("─── Ticket #{} ───", ticket.id)));
        println!("  title:      {}", ticket.title);
        println!("  status:     {}", ticket.status);
        println!("  category:   {}", ticket.category.name);
        println!("  suggested:  {suggested}");
        println!("  sentiment:  {sentiment}");
        println!("  version:    {}", ticket.version);
    }

    pub fn print_comments(&self, comments: &[Comment]) {
        println!();
        println!("{}", self.yellow.apply_to("─── Comments ───"));
        for comment in comments {
            let sentiment = comment
                .sentiment_score
                .map_or_else(|| "-".to_string(), |s| s.to_string());
            let visibility = if comment.internal { "internal" } else { "public" };
            println!(
                "  #{} {} [{visibility}] sentiment {sentiment}: {}",
                comment.id,
                comment.author,
                self.dim.apply_to(&comment.content)
            );
        }
    }

    /// Imprime um valor serializável em JSON com estilo colorido.
    pub fn print_json<T: Serialize>(&self, title: &str, value: &T) {
        println!();
        println!("{}", self.yellow.apply_to(format!("─── {title} ───")));
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

/// Imprime a tabela de transições.
pub fn print_workflow(definition: &WorkflowDefinition) {
    let bold = Style::new().bold();
    for (from, targets) in definition.edges() {
        let label = format!("{:<18}", from.as_str());
        println!("{} → {}", bold.apply_to(label), describe_targets(targets));
    }
}

pub fn describe_targets(targets: &[TicketStatus]) -> String {
    if targets.is_empty() {
        "NONE (terminal state)".to_string()
    } else {
        targets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
