//! Interface de linha de comando do audiograb baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (fetch, info, formats,
//! check) e flags globais (--server, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::session::{AudioFormat, Quality};

/// audiograb: extrai o áudio de vídeos do YouTube por meio de um servidor remoto.
#[derive(Debug, Parser)]
#[command(name = "audiograb", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base da API do servidor (sobrepõe config e ambiente).
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Formato aceito pela CLI, mapeado para [`AudioFormat`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Mp3,
    M4a,
    Wav,
}

impl From<FormatArg> for AudioFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Mp3 => AudioFormat::Mp3,
            FormatArg::M4a => AudioFormat::M4a,
            FormatArg::Wav => AudioFormat::Wav,
        }
    }
}

/// Qualidade aceita pela CLI, em kbps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    #[value(name = "128")]
    Kbps128,
    #[value(name = "192")]
    Kbps192,
    #[value(name = "320")]
    Kbps320,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Kbps128 => Quality::Kbps128,
            QualityArg::Kbps192 => Quality::Kbps192,
            QualityArg::Kbps320 => Quality::Kbps320,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Envia o vídeo para extração e acompanha até o link de download.
    Fetch {
        /// URL do vídeo ou playlist do YouTube.
        url: String,

        /// Formato de saída (padrão vem da configuração).
        #[arg(long)]
        format: Option<FormatArg>,

        /// Bitrate de saída em kbps.
        #[arg(long)]
        quality: Option<QualityArg>,

        /// Salva o áudio neste caminho antes que o link expire.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Não consulta os metadados do vídeo antes de enviar.
        #[arg(long, default_value_t = false)]
        skip_info: bool,
    },

    /// Mostra os metadados de um vídeo sem iniciar a extração.
    Info {
        url: String,
    },

    /// Lista os formatos e qualidades aceitos pelo servidor.
    Formats,

    /// Valida uma URL localmente, sem contatar o servidor.
    Check {
        url: String,
    },
}
