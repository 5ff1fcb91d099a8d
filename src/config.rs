//! Configuração do tickflow carregada a partir de `tickflow.toml`.
//!
//! A struct [`TickflowConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `ANTHROPIC_API_KEY` tem precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuração de nível superior carregada de `tickflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TickflowConfig {
    /// Chave da API Anthropic usada pelo provedor de pontuação.
    #[serde(default)]
    pub api_key: String,

    /// Modelo usado para análise de sentimento.
    #[serde(default = "default_model")]
    pub model: String,

    /// Limite de tokens da resposta do provedor.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Tempo máximo de uma chamada ao provedor antes do resultado de fallback.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Retentativas após conflito de versão ao salvar um ticket.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Nomes dos tópicos do barramento de eventos.
    #[serde(default)]
    pub topics: Topics,
}

/// Topic names shared by both services.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Topics {
    pub ticket_created: String,
    pub ticket_updated: String,
    pub comment_created: String,
    pub analysis_result: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            ticket_created: "ticket-created".to_string(),
            ticket_updated: "ticket-updated".to_string(),
            comment_created: "comment-created".to_string(),
            analysis_result: "ai-analysis-result".to_string(),
        }
    }
}

impl Topics {
    /// The three topics the enrichment side consumes.
    pub fn lifecycle(&self) -> [&str; 3] {
        [
            self.ticket_created.as_str(),
            self.ticket_updated.as_str(),
            self.comment_created.as_str(),
        ]
    }
}

// Valor padrão para o modelo: Haiku, rápido e barato para classificação.
fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

// Valor padrão para o timeout do provedor: 30s.
fn default_provider_timeout_ms() -> u64 {
    30_000
}

fn default_max_conflict_retries() -> u32 {
    3
}

impl Default for TickflowConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            provider_timeout_ms: default_provider_timeout_ms(),
            max_conflict_retries: default_max_conflict_retries(),
            topics: Topics::default(),
        }
    }
}

impl TickflowConfig {
    /// Carrega a configuração de `tickflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("tickflow.toml"))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<TickflowConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para a chave API.
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        Ok(config)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
