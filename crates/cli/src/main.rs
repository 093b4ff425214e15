//! `memoria` -- animate photos into short videos with Google Veo.
//!
//! Loads one or more photos, picks one, and asks the Veo model to turn it
//! into a vertical video following a motion prompt. The finished video is
//! downloaded next to the current directory unless `--no-download` is set.
//!
//! `memoria select-key` prompts for a key and saves it to `.env` in the
//! current directory, which is loaded on every start. A variable already
//! set in the environment takes precedence over the file.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default                         | Description                      |
//! |----------------------------|----------|---------------------------------|----------------------------------|
//! | `GEMINI_API_KEY`           | no       | --                              | API key (`API_KEY` also accepted) |
//! | `VEO_API_BASE`             | no       | public v1beta endpoint          | API root                         |
//! | `VEO_MODEL`                | no       | `veo-3.1-fast-generate-preview` | Model name                       |
//! | `VEO_POLL_INTERVAL_SECS`   | no       | `5`                             | Seconds between status queries   |
//! | `VEO_POLL_MAX_WAIT_SECS`   | no       | `1800`                          | Polling deadline, `0` = none     |
//! | `VEO_REQUEST_TIMEOUT_SECS` | no       | `60`                            | Per-request HTTP timeout         |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memoria_cli::credentials::{persist_key, TerminalCredentialProvider, DOTENV_FILE, PERSISTED_KEY_VAR};
use memoria_cli::session::{self, GenerateOptions, GenerationOutcome, GENERIC_FAILURE_MESSAGE};
use memoria_core::prompt::{preset_label, PROMPT_PRESETS};
use memoria_core::studio::Studio;
use memoria_veo::config::VeoConfig;
use memoria_veo::credentials::CredentialProvider;
use memoria_veo::driver::VideoJobDriver;

/// Default file name for downloaded videos.
const DEFAULT_OUTPUT: &str = "memoria.mp4";

#[derive(Debug, Parser)]
#[command(name = "memoria", version, about = "Turn photos into AI-generated videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a video from one of the given photos.
    Generate {
        /// Image files to upload.
        #[arg(required = true)]
        photos: Vec<PathBuf>,

        /// Which photo to animate (1-based). Defaults to the first.
        #[arg(long)]
        select: Option<usize>,

        /// Motion prompt. Empty means the default cinematic prompt.
        #[arg(long, conflicts_with = "preset")]
        prompt: Option<String>,

        /// Use a built-in prompt (see `memoria presets`).
        #[arg(long)]
        preset: Option<usize>,

        /// Where to save the video.
        #[arg(long, short, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Print the playback URL without downloading.
        #[arg(long)]
        no_download: bool,

        /// Override `VEO_POLL_INTERVAL_SECS`.
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Override `VEO_POLL_MAX_WAIT_SECS`.
        #[arg(long)]
        max_wait: Option<u64>,
    },

    /// List the built-in prompt presets.
    Presets,

    /// Choose the API key used for generation and save it to `.env`.
    SelectKey,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memoria=info,memoria_cli=info,memoria_core=info,memoria_veo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %format!("{e:#}"), "memoria failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Presets => {
            for (index, text) in PROMPT_PRESETS.iter().enumerate() {
                println!("{index}: {}  ({text})", preset_label(text));
            }
            Ok(())
        }
        Command::SelectKey => {
            let credentials = TerminalCredentialProvider::from_env().await;
            if !credentials.can_select() {
                anyhow::bail!("key selection needs an interactive terminal; set GEMINI_API_KEY instead");
            }
            credentials.open_select_key().await?;
            let key = credentials
                .current_key()
                .await
                .context("key selection finished without a key")?;

            let path = Path::new(DOTENV_FILE);
            persist_key(path, &key)
                .await
                .with_context(|| format!("failed to save the key to {}", path.display()))?;
            eprintln!("Saved {PERSISTED_KEY_VAR} to {}.", path.display());
            Ok(())
        }
        Command::Generate {
            photos,
            select,
            prompt,
            preset,
            output,
            no_download,
            poll_interval,
            max_wait,
        } => {
            let mut config = VeoConfig::from_env().context("invalid Veo configuration")?;
            if let Some(secs) = poll_interval {
                config.poll_interval_secs = secs;
            }
            if let Some(secs) = max_wait {
                config.poll_max_wait_secs = secs;
            }

            let options = GenerateOptions {
                photos,
                select,
                prompt,
                preset,
            };
            let download_to = (!no_download).then_some(output);
            generate(&config, &options, download_to).await
        }
    }
}

async fn generate(
    config: &VeoConfig,
    options: &GenerateOptions,
    download_to: Option<PathBuf>,
) -> anyhow::Result<()> {
    tracing::info!(
        model = %config.model,
        poll_interval_secs = config.poll_interval_secs,
        poll_max_wait_secs = config.poll_max_wait_secs,
        "Starting memoria",
    );

    let api = Arc::new(config.build_api().context("failed to build HTTP client")?);
    let credentials = Arc::new(TerminalCredentialProvider::from_env().await);
    let driver = VideoJobDriver::new(api.clone(), credentials).with_poll_policy(config.poll_policy());

    let progress = tokio::spawn(session::report_progress(driver.subscribe()));
    let mut studio = Studio::new();
    let outcome = session::generate(&mut studio, &driver, options).await;

    // Closing the channel lets the reporter drain and exit.
    drop(driver);
    let _ = progress.await;

    match outcome? {
        GenerationOutcome::Completed(video) => {
            if let Some(photo) = studio.selected_photo() {
                eprintln!("Animated {}", photo.preview_url());
            }
            println!("{}", video.uri);
            if let Some(dest) = download_to {
                api.download_video(&video.uri, &dest)
                    .await
                    .with_context(|| format!("failed to download video to {}", dest.display()))?;
                eprintln!("Saved {}", dest.display());
            }
            Ok(())
        }
        GenerationOutcome::Failed(e) => {
            eprintln!("{GENERIC_FAILURE_MESSAGE}");
            if e.is_retryable() {
                eprintln!("This may succeed if you run the same command again.");
            }
            Err(e).context(format!("status: {}", studio.status()))
        }
    }
}
