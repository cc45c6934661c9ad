use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use raven_rs::logging::{init_logger_with_default, log_error, log_warn};
use raven_rs::{
    connect_with_config, log_info, parse_document, BridgeConfig, FragmentAccumulator,
    ParsedReading, Publisher, RavenBridge, RavenCommand, ThingSpeakSink, WriteKey,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "raven-cli")]
#[command(about = "Bridge a RAVEn smart-meter dongle to a ThingSpeak channel")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Serial device of the dongle
    #[arg(short, long)]
    port: Option<String>,
    #[arg(short, long)]
    baudrate: Option<u32>,
    /// Log every reading and diagnostic message
    #[arg(long)]
    trace: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the dongle and publish to ThingSpeak until interrupted
    Run {
        #[arg(long)]
        channel: Option<u64>,
        #[arg(long)]
        write_key: Option<String>,
        /// Poll demand and summation every SECS seconds
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,
    },
    /// Send one poll command and print the replies until interrupted
    Query {
        #[arg(value_enum)]
        kind: QueryKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QueryKind {
    ConnectionStatus,
    DeviceInfo,
    Summation,
    Demand,
    Message,
    Time,
    Price,
}

impl From<QueryKind> for RavenCommand {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::ConnectionStatus => RavenCommand::ConnectionStatus,
            QueryKind::DeviceInfo => RavenCommand::DeviceInfo,
            QueryKind::Summation => RavenCommand::CurrentSummationDelivered,
            QueryKind::Demand => RavenCommand::InstantaneousDemand,
            QueryKind::Message => RavenCommand::Message,
            QueryKind::Time => RavenCommand::Time,
            QueryKind::Price => RavenCommand::CurrentPrice,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(port) = cli.port {
        config.serial_path = port;
    }
    if let Some(baudrate) = cli.baudrate {
        config.baudrate = baudrate;
    }
    config.trace |= cli.trace;

    init_logger_with_default("info");

    match cli.command {
        Commands::Run {
            channel,
            write_key,
            poll_interval,
        } => {
            if channel.is_some() {
                config.channel_id = channel;
            }
            if let Some(key) = write_key {
                config.write_key = Some(WriteKey::new(key));
            }
            if poll_interval.is_some() {
                config.poll_interval_secs = poll_interval;
            }
            config.validate()?;
            run_bridge(config).await
        }
        Commands::Query { kind } => {
            config.validate()?;
            query(config, kind.into()).await
        }
    }
}

async fn run_bridge(config: BridgeConfig) -> anyhow::Result<()> {
    let (channel_id, write_key) = config.channel()?;
    let sink = ThingSpeakSink::new(config.endpoint.clone(), write_key)?;
    let publisher = Publisher::spawn(Arc::new(sink));
    let mut bridge = RavenBridge::new(channel_id, publisher, config.day_boundary, config.trace);

    let handle = connect_with_config(&config.serial_path, config.serial_config())
        .await
        .with_context(|| format!("opening {}", config.serial_path))?;
    let (mut lines, mut commands) = handle.into_split();
    log_info(&format!("bridging {} to channel {channel_id}", config.serial_path));

    let result = tokio::select! {
        result = bridge.run(&mut lines, &mut commands, config.poll_interval()) => result,
        _ = tokio::signal::ctrl_c() => {
            log_info("interrupted");
            Ok(())
        }
    };

    let (stats, publish) = bridge.shutdown().await;
    log_info(&format!(
        "documents={} decode_errors={} published={} delivered={} failed={}",
        stats.documents, stats.decode_errors, stats.published, publish.delivered, publish.failed
    ));

    if let Err(e) = &result {
        log_error(&format!("session ended: {e}"));
    }
    result?;
    Ok(())
}

async fn query(config: BridgeConfig, command: RavenCommand) -> anyhow::Result<()> {
    let handle = connect_with_config(&config.serial_path, config.serial_config())
        .await
        .with_context(|| format!("opening {}", config.serial_path))?;
    let (mut lines, mut commands) = handle.into_split();
    commands.issue(command).await?;

    let mut accumulator = FragmentAccumulator::new();
    let read_replies = async {
        while let Some(line) = lines.next_line().await? {
            let Some(document) = accumulator.feed(&line) else {
                continue;
            };
            match parse_document(&document) {
                Ok(ParsedReading::Unrecognized { raw }) => log_info(&raw.summary()),
                Ok(reading) => log_info(&format!("{reading:?}")),
                Err(e) => log_warn(&format!("{e}")),
            }
        }
        Ok::<(), raven_rs::RavenError>(())
    };

    tokio::select! {
        result = read_replies => result?,
        _ = tokio::signal::ctrl_c() => {}
    }
    Ok(())
}
