//! Interface de linha de comando do tickflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (demo, workflow,
//! transitions, analyze) e flags globais (--timeout-ms, --verbose).

use clap::{Parser, Subcommand};
use tickflow::workflow::TicketStatus;

/// tickflow: fluxo de tickets de suporte com enriquecimento de sentimento.
#[derive(Debug, Parser)]
#[command(name = "tickflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Timeout de cada chamada ao provedor, em milissegundos.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o pipeline completo em memória com um ticket de exemplo.
    Demo {
        /// Usa a API da Anthropic em vez do avaliador por palavras-chave.
        #[arg(long, default_value_t = false)]
        live: bool,
    },

    /// Mostra a tabela de transições do workflow.
    Workflow,

    /// Lista os destinos permitidos a partir de um status.
    Transitions {
        /// Status de origem (ex.: OPEN, in-progress).
        status: TicketStatus,
    },

    /// Avalia um texto com uma única chamada ao provedor.
    Analyze {
        /// Texto a avaliar.
        text: String,

        /// Trata o texto como comentário (sem sugestão de categoria).
        #[arg(long, default_value_t = false)]
        comment: bool,
    },
}
