//! websnap: screenshot dataset collection engine

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use websnap::{
    capture::build_provider,
    categories::{category_names, WEBSITE_CATEGORIES},
    config::{Config, LogFormat, OutputConfig},
    export::ExportGenerator,
    job::{CollectOptions, JobRegistry, JobState},
    server::HttpServer,
    store::MetadataStore,
};

#[derive(Parser)]
#[command(name = "websnap")]
#[command(about = "Screenshot dataset collection for multimodal fine-tuning")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "websnap.toml")]
    config: PathBuf,

    /// Data directory override
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Run a collection job in the foreground
    Collect {
        /// Explicit target URLs; omit to use the curated categories
        urls: Vec<String>,

        /// Number of curated URLs to collect when none are given
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Concurrent captures
        #[arg(long)]
        concurrency: Option<usize>,

        /// Screenshot API access key for this run only
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Convert a job's metadata into fine-tuning records
    Export {
        /// Job ID to export
        job_id: uuid::Uuid,

        /// Seed for reproducible prompt selection
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// List the curated website categories
    Categories,

    /// Initialize a starter configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    if let Some(data_dir) = cli.data_dir {
        config.output.data_dir = data_dir;
    }

    let log_level = match cli.verbose {
        0 => config.logging.level.as_tracing_level(),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false);
    match config.logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }

    std::fs::create_dir_all(&config.output.data_dir)
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Serve { listen } => serve(config, listen).await,
        Commands::Collect {
            urls,
            count,
            concurrency,
            api_key,
        } => collect(config, urls, count, concurrency, api_key).await,
        Commands::Export { job_id, seed } => export(config, job_id, seed).await,
        Commands::Categories => {
            list_categories();
            Ok(())
        }
        Commands::Init { path } => init_config(path),
    }
}

async fn serve(mut config: Config, listen: Option<String>) -> Result<()> {
    if let Some(addr) = listen {
        config.http.listen_addr = addr;
    }

    let provider = build_provider(&config.capture)?;
    info!("Capture provider: {}", provider.name());

    let registry = Arc::new(JobRegistry::new(provider, config.clone()));
    let server = HttpServer::new(config.http.clone(), config.output.clone(), registry);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    server.run(shutdown_rx).await
}

async fn collect(
    config: Config,
    urls: Vec<String>,
    count: Option<usize>,
    concurrency: Option<usize>,
    api_key: Option<String>,
) -> Result<()> {
    let provider = build_provider(&config.capture)?;
    info!("Capture provider: {}", provider.name());

    let registry = JobRegistry::new(provider, config);
    let options = CollectOptions {
        urls: (!urls.is_empty()).then_some(urls),
        count,
        concurrency,
        api_key,
    };

    // The receiver is subscribed before the job task spawns, so even a job
    // that finishes immediately cannot complete unobserved.
    let (job_id, mut events) = registry.start_collection(options)?;

    use websnap::job::CollectEvent;
    while let Ok(event) = events.recv().await {
        match event {
            CollectEvent::TargetCompleted {
                metadata, progress, ..
            } => {
                info!(
                    "[{}/{}] {} -> {}",
                    progress.resolved(),
                    progress.total,
                    metadata.url,
                    metadata.filename
                );
            }
            CollectEvent::TargetFailed {
                url,
                error,
                progress,
                ..
            } => {
                info!(
                    "[{}/{}] {} failed: {}",
                    progress.resolved(),
                    progress.total,
                    url,
                    error
                );
            }
            CollectEvent::JobCompleted {
                state, progress, ..
            } => {
                info!(
                    "Job {}: {:?}, {} completed, {} failed",
                    job_id, state, progress.completed, progress.failed
                );
                if state == JobState::Failed {
                    anyhow::bail!("Collection job failed");
                }
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

async fn export(config: Config, job_id: uuid::Uuid, seed: Option<u64>) -> Result<()> {
    let job_dir = config.output.job_dir(job_id);
    let metadata_path = OutputConfig::metadata_path(&job_dir);
    let metadata = MetadataStore::load(&metadata_path)
        .with_context(|| format!("No metadata found for job {}", job_id))?;

    let summary = ExportGenerator::new(seed).generate(&job_dir, &metadata)?;
    info!(
        "Exported {} records to {}",
        summary.record_count,
        summary.artifact_path.display()
    );
    Ok(())
}

fn list_categories() {
    for (category, urls) in WEBSITE_CATEGORIES {
        println!("{}", category);
        for url in *urls {
            println!("  {}", url);
        }
    }
    println!("\n{} categories", category_names().len());
}

fn init_config(path: PathBuf) -> Result<()> {
    let config_path = path.join("websnap.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    let content = r#"# websnap configuration

[output]
data_dir = "./dataset"

[capture]
# "api" requires an access key (here or via SCREENSHOT_API_KEY);
# "placeholder" renders deterministic local images
provider = "placeholder"
api_url = "http://api.screenshotlayer.com/api/capture"
timeout_secs = 30
max_width = 2048
max_height = 2048
jpeg_quality = 80

[capture.viewport]
width = 1024
height = 768

[collection]
concurrency = 2
retry_attempts = 3
retry_base_delay_ms = 1000
default_count = 10
job_retention_secs = 3600

[http]
listen_addr = "127.0.0.1:8080"
api_keys = []
cors_enabled = true

[logging]
format = "text"
level = "info"
"#;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
