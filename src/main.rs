// src/main.rs
// =============================================================================
// Entry point of the job-digest daemon.
//
// What happens here:
// 1. Set up logging (RUST_LOG controls verbosity)
// 2. Parse flags and load configuration from the environment
// 3. Wire up engine -> extractor -> fetcher -> formatter -> notifier
// 4. Either run once (--once) or hand the pipeline to the scheduler forever
//
// Only startup problems (bad configuration) end the process with an error.
// Once the scheduler is running, no single run can take it down.
// =============================================================================

mod cli;
mod config;
mod digest;
mod extract;
mod notify;
mod pipeline;
mod retry;
mod scheduler;
mod stats;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::{Config, EngineKind};
use digest::DigestFormatter;
use extract::{HttpEngine, PageExtractor, RenderEngine};
use notify::{LogTransport, MailTransport, MailjetTransport, Notifier};
use pipeline::{Pipeline, RunOutcome};
use retry::RetryingFetcher;
use scheduler::Scheduler;
use stats::RunStats;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_digest=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(secs) = cli.interval_secs {
        config.run_interval = Duration::from_secs(secs);
    }

    tracing::info!(
        target_url = %config.target_url,
        interval_secs = config.run_interval.as_secs(),
        max_attempts = config.retry.max_attempts(),
        engine = ?config.engine,
        recipients = config.recipients.len(),
        environment = %config.environment,
        dry_run = cli.dry_run,
        "job-digest starting"
    );

    let stats = Arc::new(RunStats::default());
    let pipeline = Arc::new(build_pipeline(&config, cli.dry_run, stats)?);

    if cli.once {
        if let RunOutcome::Notified { listings, delivery } = pipeline.run_once(1).await {
            delivery.await.context("delivery task panicked")?;
            tracing::info!(listings, "single run complete");
        }
        return Ok(());
    }

    Scheduler::new(config.run_interval)
        .run(move |firing| {
            let pipeline = pipeline.clone();
            async move {
                // The outcome is already logged; the delivery task runs detached
                let _ = pipeline.run_once(firing).await;
            }
            .boxed()
        })
        .await;

    Ok(())
}

fn build_pipeline(config: &Config, dry_run: bool, stats: Arc<RunStats>) -> Result<Pipeline> {
    let engine = build_engine(config)?;
    let extractor = PageExtractor::new(engine, config.page_timeout, stats.clone());
    let fetcher = RetryingFetcher::new(Arc::new(extractor), config.retry, stats.clone());

    let formatter =
        DigestFormatter::new(config.subject.clone(), config.utc_offset, config.escape_html);

    let transport: Arc<dyn MailTransport> = if dry_run {
        Arc::new(LogTransport)
    } else {
        let credentials = config
            .mailjet
            .clone()
            .ok_or_else(|| {
                anyhow!("MJ_APIKEY_PUBLIC and MJ_APIKEY_PRIVATE must be set (or use --dry-run)")
            })?;
        if !config.is_production() {
            tracing::warn!("APP_ENV is not 'production', Mailjet will run in sandbox mode");
        }
        Arc::new(
            MailjetTransport::new(credentials, !config.is_production())
                .context("Failed to create Mailjet client")?,
        )
    };
    let notifier = Notifier::new(
        transport,
        config.sender.clone(),
        config.recipients.clone(),
        config.text_part.clone(),
    );

    Ok(Pipeline::new(
        config.target_url.clone(),
        fetcher,
        formatter,
        notifier,
        stats,
    ))
}

fn build_engine(config: &Config) -> Result<Arc<dyn RenderEngine>> {
    match config.engine {
        EngineKind::Http => {
            if let Some(path) = &config.chrome_executable {
                tracing::warn!("CHROME_EXECUTABLE={} ignored by the http engine", path.display());
            }
            Ok(Arc::new(HttpEngine::new(config.page_timeout)))
        }
        #[cfg(feature = "chrome")]
        EngineKind::Chrome => Ok(Arc::new(extract::ChromeEngine::new(
            config.chrome_executable.clone(),
            config.page_timeout,
        ))),
        #[cfg(not(feature = "chrome"))]
        EngineKind::Chrome => Err(anyhow!("this build does not include the chrome engine")),
    }
}
