mod args;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::process::ExitCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing_subscriber::EnvFilter;

use args::{Cli, Command, ConvertArgs, InspectArgs};
use fcp_core::endpoint::Endpoint;
use fcp_core::inspect::inspect;
use fcp_core::keys::{load_app_key, parse_app_key};
use fcp_core::transfer::utils::open_secure_file;
use fcp_core::{FcpConfig, LogProgress, TransferOptions, convert};

type Input = Box<dyn AsyncRead + Unpin + Send>;
type Output = Box<dyn AsyncWrite + Unpin + Send>;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays clean for piped data
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => FcpConfig::load_from(path),
        None => FcpConfig::load(),
    };

    match cli.command {
        Command::Inspect(args) => run_inspect(args, &config).await,
        Command::Convert(args) => run_convert(args, &config).await,
        Command::Endpoint { target } => {
            let endpoint = Endpoint::parse(&target)?;
            match &endpoint {
                Endpoint::Hub {
                    address,
                    ssl,
                    identifier,
                } => {
                    println!("hub:        {}", address);
                    println!("tls:        {}", ssl);
                    match identifier {
                        Some(id) => println!("identifier: {}", id),
                        None => println!("identifier: (none)"),
                    }
                }
                Endpoint::Std => println!("standard input/output"),
                Endpoint::Local(path) => println!("local file: {}", path.display()),
            }
            Ok(())
        }
        Command::Config { init } => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => FcpConfig::config_path().context("no config directory available")?,
            };
            if init {
                FcpConfig::default()
                    .save_to(&path)
                    .with_context(|| format!("failed to write {:?}", path))?;
                tracing::info!("Wrote default config to {:?}", path);
            } else {
                println!("# {}", path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}

async fn run_inspect(args: InspectArgs, config: &FcpConfig) -> Result<()> {
    let endpoint = Endpoint::parse(&args.file)?;
    let reader = open_input(&endpoint).await?;
    let format = args.format.unwrap_or(config.format);
    let filters = args.categories.apply(config.filters());

    let mut stdout = tokio::io::stdout();
    let summary = inspect(reader, format, filters, &mut stdout, !args.stats)
        .await
        .with_context(|| format!("failed to read {}", endpoint))?;
    if args.stats {
        print!("{}", summary);
    }
    Ok(())
}

async fn run_convert(args: ConvertArgs, config: &FcpConfig) -> Result<()> {
    let src = Endpoint::parse(&args.src)?;
    let dst = Endpoint::parse(&args.dst)?;

    let mut options = TransferOptions::from_config(config)
        .with_filters(args.categories.apply(config.filters()));
    if let Some(format) = args.to {
        options = options.with_format(format);
    }
    if let Some(hex) = &args.app_key {
        options = options.with_signing_key(parse_app_key(hex)?);
    } else if let Some(path) = &args.app_key_file {
        options = options.with_signing_key(load_app_key(path).await?);
    }

    let reader = open_input(&src).await?;
    let mut writer = open_output(&dst).await?;
    let report = convert(
        reader,
        args.from.unwrap_or(config.format),
        &mut writer,
        &options,
        &LogProgress,
    )
    .await
    .with_context(|| format!("failed to convert {} to {}", src, dst))?;

    tracing::info!(
        "Converted {} of {} records into {} frames",
        report.success,
        report.total,
        report.frames
    );
    Ok(())
}

async fn open_input(endpoint: &Endpoint) -> Result<Input> {
    match endpoint {
        Endpoint::Std => Ok(Box::new(tokio::io::stdin())),
        Endpoint::Local(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {:?}", path))?;
            Ok(Box::new(file))
        }
        Endpoint::Hub { .. } => bail!("{} is a hub; no hub transport is configured", endpoint),
    }
}

async fn open_output(endpoint: &Endpoint) -> Result<Output> {
    match endpoint {
        Endpoint::Std => Ok(Box::new(tokio::io::stdout())),
        Endpoint::Local(path) => {
            let file = open_secure_file(path, false)
                .await
                .with_context(|| format!("failed to create {:?}", path))?;
            Ok(Box::new(file))
        }
        Endpoint::Hub { .. } => bail!("{} is a hub; no hub transport is configured", endpoint),
    }
}
