use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3explorer::config::{self, Config};
use s3explorer::{api, Core};

#[derive(Parser)]
#[command(name = "s3explorer")]
#[command(version, about = "File-explorer REST API over S3-compatible storage", long_about = None)]
struct Cli {
    /// Config file path (default: config.yml if present)
    #[arg(long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (json, console)
    #[arg(long)]
    log_format: Option<String>,

    /// Address to listen on, overrides server.address
    #[arg(long)]
    listen: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }
    if let Some(listen) = cli.listen {
        config.server.address = listen;
    }
    let config = config.normalize()?;

    init_logging(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

/// RUST_LOG wins over the configured level
fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log.level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.log.format == "console" {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stdout),
            )
            .init();
    }
}

async fn async_main(config: Config) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        region = %config.aws.region,
        "starting s3explorer"
    );

    let core = Core::new(config)?;
    api::run_server(core).await?;

    tracing::info!("server stopped");
    Ok(())
}
