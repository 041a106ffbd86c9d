mod backend;
mod cli;
mod config;
mod controller;
mod error;
mod poller;
mod session;
mod timer;
mod ui;
mod validate;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::{Style, style};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::BackendClient;
use cli::{Cli, Command};
use config::AppConfig;
use controller::{JobController, SessionConfig};
use error::AppError;
use session::{ArtifactRef, JobRequest, LifecycleState, Quality, SessionRecord, StateKind};
use ui::JobProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "audiograb=debug"
    } else {
        "audiograb=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("error:").red().bold());
            let code = e.downcast_ref::<AppError>().map_or(1, AppError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load().map_err(|e| AppError::Config(format!("{e:#}")))?;
    config.apply_server_override(cli.server);
    tracing::debug!(server = %config.server_url, "Configuration loaded");

    match cli.command {
        Command::Check { url } => check(&url),
        Command::Info { url } => {
            let client = connect(&config)?;
            info(&client, &url, config.default_quality).await
        }
        Command::Formats => {
            let client = connect(&config)?;
            let catalog = client.fetch_formats().await.map_err(AppError::from)?;
            ui::print_formats(&catalog);
            Ok(())
        }
        Command::Fetch {
            url,
            format,
            quality,
            output,
            skip_info,
        } => {
            let client = connect(&config)?;
            let request = JobRequest {
                url,
                format: format.map_or(config.default_format, Into::into),
                quality: quality.map_or(config.default_quality, Into::into),
            };
            let options = FetchOptions {
                output: output.as_deref(),
                skip_info,
                verbose: cli.verbose,
            };
            fetch(&config, client, request, options).await
        }
    }
}

fn connect(config: &AppConfig) -> Result<BackendClient, AppError> {
    let client = BackendClient::new(
        &config.server_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    tracing::debug!(base_url = %client.base_url(), "Backend client ready");
    Ok(client)
}

fn check(url: &str) -> Result<()> {
    let url = validate::validate_url(url).map_err(AppError::from)?;
    let id = validate::extract_video_id(&url).unwrap_or("-");
    println!("  {} {url} (video id: {id})", style("✓").green().bold());
    Ok(())
}

async fn info(client: &BackendClient, url: &str, quality: Quality) -> Result<()> {
    let url = validate::validate_url(url).map_err(AppError::from)?;
    let info = client.fetch_info(&url).await.map_err(AppError::from)?;
    for line in ui::info_lines(&info, quality, &Style::new().bold()) {
        println!("{line}");
    }
    if let Some(id) = info
        .video_id
        .as_deref()
        .or_else(|| validate::extract_video_id(&url))
    {
        println!("  video id: {id}");
    }
    if let Some(thumbnail) = &info.thumbnail {
        println!("  thumbnail: {thumbnail}");
    }
    Ok(())
}

struct FetchOptions<'a> {
    output: Option<&'a Path>,
    skip_info: bool,
    verbose: bool,
}

/// Runs one session to its end, mirroring every published state on the
/// terminal.
async fn fetch(
    config: &AppConfig,
    client: BackendClient,
    request: JobRequest,
    options: FetchOptions<'_>,
) -> Result<()> {
    let client = Arc::new(client);
    let mut controller = JobController::new(Arc::clone(&client), SessionConfig::from(config));
    let mut rx = controller.subscribe();
    let progress = JobProgress::start(&request.url);

    if !options.skip_info {
        let preview = match validate::validate_url(&request.url) {
            Ok(url) => client.fetch_info(&url).await.map_err(AppError::from),
            Err(e) => Err(AppError::from(e)),
        };
        match preview {
            Ok(info) => progress.show_info(&info, request.quality),
            Err(e) => {
                progress.clear();
                return Err(e.into());
            }
        }
    }

    if let Err(e) = controller.submit(request).await {
        progress.clear();
        return Err(AppError::from(e).into());
    }

    // Registered once so a Ctrl-C during the artifact download is not lost.
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut announced = false;
    let mut cancel_session = false;
    let outcome: Result<(), AppError> = loop {
        let view = rx.borrow_and_update().clone();
        let rendered = ui::render(&view);
        progress.apply(&rendered);

        match &view.state {
            LifecycleState::Succeeded { .. } if !announced => {
                announced = true;
                if let Some(artifact) = controller.artifact() {
                    match client.artifact_url(&artifact) {
                        Ok(link) => progress.announce_link(link.as_str()),
                        Err(e) => tracing::warn!(error = %e, "Could not build the download link"),
                    }
                    if let Some(path) = options.output {
                        progress.note(&format!("Saving to {}", path.display()));
                        let saved = tokio::select! {
                            saved = save_artifact(&client, &artifact, path) => saved,
                            _ = &mut interrupt => Err(AppError::Interrupted),
                        };
                        cancel_session = true;
                        match saved {
                            Ok(bytes) => {
                                progress.finish_saved(path, bytes);
                                break Ok(());
                            }
                            Err(e) => {
                                progress.clear();
                                break Err(e);
                            }
                        }
                    }
                }
            }
            state if state.is_terminal() => {
                progress.finish(&rendered);
                break match (state, options.output) {
                    (LifecycleState::Failed(reason), _) => Err(AppError::JobFailed(reason.clone())),
                    (_, Some(_)) => Err(AppError::ArtifactExpired),
                    (_, None) => Ok(()),
                };
            }
            _ => {}
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            _ = &mut interrupt => {
                progress.clear();
                cancel_session = true;
                break Err(AppError::Interrupted);
            }
        }
    };

    let settled: StateKind = controller.view().state.kind();
    let session = if cancel_session {
        controller.abandon().await
    } else {
        controller.wait().await
    };
    tracing::debug!(state = %settled, "Session settled");
    if options.verbose {
        if let Some(session) = session {
            progress.print_record(&SessionRecord::from_session(session));
        }
    }

    outcome.map_err(Into::into)
}

async fn save_artifact(
    client: &BackendClient,
    artifact: &ArtifactRef,
    path: &Path,
) -> Result<usize, AppError> {
    let bytes = client.fetch_artifact(artifact).await?;
    tokio::fs::write(path, &bytes).await?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Artifact saved");
    Ok(bytes.len())
}
