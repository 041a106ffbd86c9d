//! Configuração do audiograb carregada a partir de `audiograb.toml`.
//!
//! A struct [`AppConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `AUDIOGRAB_SERVER` tem precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::backend::DEFAULT_SERVER_URL;
use crate::session::{AudioFormat, Quality};

pub const CONFIG_FILE: &str = "audiograb.toml";
pub const SERVER_ENV: &str = "AUDIOGRAB_SERVER";

/// Configuração de nível superior carregada de `audiograb.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// URL base da API do servidor de extração.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Intervalo entre o fim de uma consulta de status e o início da próxima.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Por quantos segundos o link do áudio continua válido.
    #[serde(default = "default_artifact_ttl_secs")]
    pub artifact_ttl_secs: u64,

    /// Máximo de consultas antes de considerar o job travado.
    /// Ausente: consulta indefinidamente.
    #[serde(default)]
    pub max_polls: Option<u32>,

    /// Timeout de cada requisição HTTP, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Formato usado quando a CLI não recebe `--format`.
    #[serde(default = "default_format")]
    pub default_format: AudioFormat,

    /// Qualidade usada quando a CLI não recebe `--quality`.
    #[serde(default = "default_quality")]
    pub default_quality: Quality,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

// Valor padrão: 1000ms entre consultas.
fn default_poll_interval_ms() -> u64 {
    1000
}

// Valor padrão: o áudio se autodestrói após 60 segundos.
fn default_artifact_ttl_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_format() -> AudioFormat {
    AudioFormat::Mp3
}

fn default_quality() -> Quality {
    Quality::Kbps192
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_ms: default_poll_interval_ms(),
            artifact_ttl_secs: default_artifact_ttl_secs(),
            max_polls: None,
            request_timeout_secs: default_request_timeout_secs(),
            default_format: default_format(),
            default_quality: default_quality(),
        }
    }
}

impl AppConfig {
    /// Carrega a configuração de `audiograb.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;
        config.apply_server_override(std::env::var(SERVER_ENV).ok());
        Ok(config)
    }

    /// Carrega a configuração de um caminho específico, sem olhar o ambiente.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Variável de ambiente tem precedência sobre o arquivo para a URL do servidor.
    pub fn apply_server_override(&mut self, server: Option<String>) {
        if let Some(server) = server.filter(|s| !s.trim().is_empty()) {
            self.server_url = server;
        }
    }
}
