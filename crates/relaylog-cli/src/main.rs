//! relaylog CLI
//!
//! Thin wrapper around relaylog-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Append a formatted line to a rotating log file
//! relaylog write ./app.log "service started" --level info
//!
//! # Append raw text, rotating past 1 KiB
//! relaylog write ./raw.log "chunk" --raw --max-size 1024
//!
//! # List level names
//! relaylog levels
//!
//! # Run a responder with two requesters and show them converge
//! relaylog demo --dir /tmp/relaylog-demo
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relaylog_core::{
    DiskFileService, FileLogger, FileLoggerFactory, InProcessChannel, LogLevel, LogResource,
    Logger, LoggerChannel, LoggerChannelClient, LoggerDirectory, LoggerLayer, LoggerOptions,
    LoggerRecord, LoggingConfig, ScopeId,
};
use tracing_subscriber::prelude::*;

/// relaylog - ordered, rotating, cross-process logging
#[derive(Parser)]
#[command(name = "relaylog")]
#[command(version = "0.1.0")]
#[command(about = "relaylog - ordered, rotating, cross-process logging")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON logging configuration (level, maxFileSize, raw)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write this tool's own diagnostics to a rotating log file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one message to a log file
    Write {
        /// Log file path
        file: PathBuf,
        /// Message text
        message: String,
        /// Message level
        #[arg(short, long, default_value = "info")]
        level: LogLevel,
        /// Append the message verbatim (no timestamp, level or newline)
        #[arg(long)]
        raw: bool,
        /// Rotate once the file is larger than this many bytes
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// List level names, most verbose first
    Levels,

    /// Propagation demo: one responder, two requesters
    Demo {
        /// Directory for the demo log files (default: ~/.relaylog/demo)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

fn setup_logging(verbosity: u8, log_file: Option<&Path>, config: &LoggingConfig) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let file_layer = log_file.map(|path| {
        let logger = FileLogger::new(
            LogResource::new(path),
            config.level,
            &LoggerOptions::default(),
            Arc::new(DiskFileService::new()),
            config.writer_config(),
        );
        LoggerLayer::new(Arc::new(logger))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

/// Get the default demo directory (~/.relaylog/demo)
fn default_demo_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relaylog")
        .join("demo")
}

fn load_config(path: Option<&Path>) -> Result<LoggingConfig> {
    let config = match path {
        Some(path) => LoggingConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LoggingConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

/// Poll `check` until it holds or a second has passed
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

async fn run_write(
    config: &LoggingConfig,
    file: PathBuf,
    message: String,
    level: LogLevel,
    raw: bool,
    max_size: Option<usize>,
) -> Result<()> {
    let mut writer_config = config.writer_config();
    if let Some(max_size) = max_size {
        writer_config.max_file_size = max_size;
    }
    let options = LoggerOptions {
        donot_use_formatters: raw || config.raw,
        ..Default::default()
    };

    let resource = LogResource::new(&file);
    let logger = FileLogger::new(
        resource.clone(),
        config.level,
        &options,
        Arc::new(DiskFileService::new()),
        writer_config,
    );

    match logger.write(level, &message) {
        Some(handle) => {
            handle
                .completed()
                .await
                .with_context(|| format!("Failed to write {}", resource))?;
            println!("Wrote [{}] to {}", level, resource);
        }
        None => {
            println!("Skipped: {} is below the configured level {}", level, logger.level());
        }
    }
    Ok(())
}

async fn run_demo(config: &LoggingConfig, dir: PathBuf) -> Result<()> {
    let factory = FileLoggerFactory::new(Arc::new(DiskFileService::new()), config.writer_config());
    let directory = Arc::new(LoggerDirectory::new(Arc::new(factory), config.level));
    let responder = Arc::new(LoggerChannel::new(directory.clone()));

    let connect = |scope: &str| {
        let channel = Arc::new(InProcessChannel::new(
            responder.clone(),
            Some(ScopeId::new(scope)),
        ));
        LoggerChannelClient::connect(channel, config.level, directory.registered_loggers())
    };
    let first = connect("window-1")?;
    let second = connect("window-2")?;

    let resource = LogResource::new(dir.join("shared.log"));
    first
        .register_logger(LoggerRecord::new(resource.clone()))
        .await?;
    first
        .set_log_level(LogLevel::Debug, Some(&resource))
        .await?;

    let converged = eventually(|| {
        second.directory().log_level(Some(&resource)) == LogLevel::Debug
    })
    .await;

    println!("Responder level: {}", directory.log_level(Some(&resource)));
    println!("window-1 level:  {}", first.directory().log_level(Some(&resource)));
    println!("window-2 level:  {}", second.directory().log_level(Some(&resource)));
    println!("Converged: {}", converged);

    let logger = second.get_logger(&resource)?;
    logger.debug("hello from window-2");
    first.console_logger(LogLevel::Info).info("console message from window-1");

    let written = eventually(|| {
        std::fs::read_to_string(resource.path())
            .map(|content| content.contains("hello from window-2"))
            .unwrap_or(false)
    })
    .await;

    println!("Log file: {}", resource);
    if written {
        let content = std::fs::read_to_string(resource.path())?;
        print!("{}", content);
    } else {
        anyhow::bail!("Message did not reach {}", resource);
    }

    directory.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    setup_logging(cli.verbose, cli.log_file.as_deref(), &config);

    match cli.command {
        Commands::Write {
            file,
            message,
            level,
            raw,
            max_size,
        } => run_write(&config, file, message, level, raw, max_size).await?,

        Commands::Levels => {
            for level in LogLevel::ALL {
                println!("{}", level);
            }
        }

        Commands::Demo { dir } => {
            let dir = dir.unwrap_or_else(default_demo_dir);
            run_demo(&config, dir).await?;
        }
    }

    Ok(())
}
