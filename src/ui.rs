//! Interface de terminal do audiograb: barra de progresso e saída colorida.
//!
//! [`render`] é uma função pura que traduz o [`SessionView`] publicado pelo
//! controlador numa [`RenderView`]. O [`JobProgress`] usa as crates
//! `indicatif` e `console` para exibir essa descrição no terminal.

use std::path::Path;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::backend::{FormatCatalog, VideoInfo};
use crate::controller::SessionView;
use crate::session::{FailureReason, JobStatus, LifecycleState, Quality, SessionRecord};

/// Tom visual de uma mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Warning,
    Success,
    Error,
}

/// Descrição do que deve ser exibido para um estado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderView {
    pub tone: Tone,
    pub message: String,
    /// Percentual da barra de progresso, quando visível.
    pub progress: Option<u8>,
    pub progress_label: Option<&'static str>,
    /// Caminho relativo do áudio, enquanto ainda é válido.
    pub download_url: Option<String>,
    pub countdown: Option<String>,
}

impl RenderView {
    fn message(tone: Tone, message: impl Into<String>) -> Self {
        Self {
            tone,
            message: message.into(),
            progress: None,
            progress_label: None,
            download_url: None,
            countdown: None,
        }
    }
}

/// Traduz o estado publicado numa descrição de renderização.
pub fn render(view: &SessionView) -> RenderView {
    match &view.state {
        LifecycleState::Idle => RenderView::message(Tone::Info, "Ready"),
        LifecycleState::Submitting => RenderView::message(Tone::Warning, "Starting download..."),
        LifecycleState::Polling(snapshot) => {
            let message = match snapshot.status {
                JobStatus::Queued => "Download started! Checking status...",
                _ => "Processing audio...",
            };
            RenderView {
                progress: Some(snapshot.progress),
                progress_label: Some(snapshot.status.label()),
                ..RenderView::message(Tone::Warning, message)
            }
        }
        LifecycleState::Succeeded { artifact, .. } => RenderView {
            progress: Some(100),
            progress_label: Some("Finished"),
            download_url: Some(artifact.download_url.clone()),
            countdown: view
                .remaining_secs
                .map(|secs| format!("Time remaining: {secs} seconds")),
            ..RenderView::message(Tone::Success, "Audio ready for download!")
        },
        LifecycleState::Failed(reason) => RenderView::message(Tone::Error, failure_message(reason)),
        LifecycleState::Expired => {
            RenderView::message(Tone::Info, "The audio has self-destructed!")
        }
    }
}

// Mensagem específica para cada tipo de falha.
fn failure_message(reason: &FailureReason) -> String {
    match reason {
        FailureReason::Submission(msg) => format!("Could not start the download: {msg}"),
        FailureReason::Transport(_) => "Could not check the download status.".to_string(),
        FailureReason::Backend(msg) => format!("Download failed: {msg}"),
        FailureReason::Stalled { .. } => format!("Download failed: {reason}"),
    }
}

/// Formata contagens de visualizações de forma compacta (1.2K, 3.4M).
pub fn format_view_count(count: Option<u64>) -> String {
    match count {
        None | Some(0) => "0".to_string(),
        Some(n) if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        Some(n) if n >= 1_000 => format!("{:.1}K", n as f64 / 1_000.0),
        Some(n) => n.to_string(),
    }
}

/// Indicador visual de progresso de um download no terminal.
///
/// Exibe uma barra de 0 a 100% durante o processamento, a contagem
/// regressiva enquanto o link é válido e mensagens coloridas para sucesso
/// (verde), falha (vermelho) e avisos (amarelo).
pub struct JobProgress {
    // Barra de progresso do indicatif.
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    bold: Style,
}

impl JobProgress {
    /// Inicia a barra de progresso para a URL informada.
    pub fn start(url: &str) -> Self {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(format!("Fetching {url}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            bold: Style::new().bold(),
        }
    }

    /// Mostra os metadados do vídeo acima da barra.
    pub fn show_info(&self, info: &VideoInfo, quality: Quality) {
        for line in info_lines(info, quality, &self.bold) {
            self.pb.println(line);
        }
    }

    /// Atualiza a barra a partir de uma descrição de renderização.
    pub fn apply(&self, view: &RenderView) {
        if let Some(progress) = view.progress {
            self.pb.set_position(u64::from(progress));
        }
        let message = match (&view.countdown, view.progress_label) {
            (Some(countdown), _) => format!("{} {countdown}", view.message),
            (None, Some(label)) => format!("{label}..."),
            (None, None) => view.message.clone(),
        };
        self.pb.set_message(message);
    }

    /// Exibe o link absoluto de download uma única vez, acima da barra.
    pub fn announce_link(&self, url: &str) {
        self.pb.println(format!(
            "  {} Download link: {url}",
            self.green.apply_to("↓")
        ));
    }

    /// Imprime uma linha acima da barra sem interrompê-la.
    pub fn note(&self, message: &str) {
        self.pb
            .println(format!("  {} {message}", self.yellow.apply_to("•")));
    }

    /// Finaliza a barra e exibe o resultado final.
    pub fn finish(&self, view: &RenderView) {
        self.pb.finish_and_clear();
        match view.tone {
            Tone::Success => println!("  {} {}", self.green.apply_to("✓"), view.message),
            Tone::Error => println!("  {} {}", self.red.apply_to("✗"), view.message),
            Tone::Warning | Tone::Info => {
                println!("  {} {}", self.yellow.apply_to("•"), view.message)
            }
        }
    }

    /// Finaliza a barra após salvar o áudio em disco.
    pub fn finish_saved(&self, path: &Path, bytes: usize) {
        self.pb.finish_and_clear();
        println!(
            "  {} Saved {} ({bytes} bytes)",
            self.green.apply_to("✓"),
            path.display()
        );
    }

    /// Remove a barra sem exibir resultado (o erro é reportado pelo chamador).
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }

    /// Imprime o registro da sessão formatado em JSON.
    pub fn print_record(&self, record: &SessionRecord) {
        println!();
        println!("{}", self.bold.apply_to("─── Session Record ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(record).unwrap_or_default()
        );
    }
}

/// Linhas de metadados do vídeo, usadas pelo `fetch` e pelo `info`.
pub fn info_lines(info: &VideoInfo, quality: Quality, bold: &Style) -> Vec<String> {
    let duration = info.formatted_duration.as_deref().unwrap_or("00:00");
    let uploader = info.uploader.as_deref().unwrap_or("unknown");
    vec![
        format!("  {}", bold.apply_to(&info.title)),
        format!(
            "  {duration} · {} views · {uploader} · {} kbps",
            format_view_count(info.view_count),
            quality.kbps()
        ),
    ]
}

/// Imprime o catálogo de formatos aceitos pelo servidor.
pub fn print_formats(catalog: &FormatCatalog) {
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("Formats"));
    for format in &catalog.formats {
        let marker = if *format == catalog.default_format { " (default)" } else { "" };
        println!("  {format}{marker}");
    }
    println!("{}", bold.apply_to("Qualities (kbps)"));
    for quality in &catalog.qualities {
        let marker = if *quality == catalog.default_quality { " (default)" } else { "" };
        println!("  {quality}{marker}");
    }
}
