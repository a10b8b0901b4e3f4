//! LED badge uploader CLI.
//!
//! # Usage
//!
//! ```bash
//! ledbadge-cli upload --device "LED-Badge" --kind still photo.jpg
//! ledbadge-cli info --device "LED-Badge"
//! ledbadge-cli browse --device "LED-Badge" /
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ledbadge_client::{RcspClient, UploadConfig, UploadKind, UploadSession};
use ledbadge_core::{AuthEngine, ConnectionState, NotificationBus, SystemEnv};
use ledbadge_transport::{DEFAULT_SCAN_TIMEOUT, DeviceFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// LED badge BLE uploader.
#[derive(Parser, Debug)]
#[command(name = "ledbadge-cli")]
#[command(about = "Upload stills/animations to a Jieli RCSP LED badge over BLE")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a still image or animation to the badge.
    Upload {
        /// Device address or a substring of its advertised name.
        #[arg(short, long)]
        device: String,

        /// Match `device` against the advertised name instead of the
        /// platform address.
        #[arg(long)]
        by_name: bool,

        /// Kind of media being uploaded.
        #[arg(short, long, value_enum)]
        kind: MediaKind,

        /// Path to the JPEG still or MJPG/AVI animation to upload.
        file: PathBuf,

        /// Override the chunk-size fallback used when the device proposes
        /// one outside `(0, 4096]`. Never changes wire-level constants.
        #[arg(long)]
        chunk_size_override: Option<u16>,
    },

    /// Query device capabilities, battery, and screen info.
    Info {
        /// Device address or a substring of its advertised name.
        #[arg(short, long)]
        device: String,

        /// Match `device` against the advertised name instead of the
        /// platform address.
        #[arg(long)]
        by_name: bool,
    },

    /// Browse a small-file directory on the device.
    Browse {
        /// Device address or a substring of its advertised name.
        #[arg(short, long)]
        device: String,

        /// Match `device` against the advertised name instead of the
        /// platform address.
        #[arg(long)]
        by_name: bool,

        /// Directory path on the device to browse.
        path: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum MediaKind {
    Still,
    Animation,
}

impl From<MediaKind> for UploadKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Still => Self::Still,
            MediaKind::Animation => Self::Animation,
        }
    }
}

fn filter_for(device: &str, by_name: bool) -> DeviceFilter {
    if by_name { DeviceFilter::Name(device.to_owned()) } else { DeviceFilter::Address(device.to_owned()) }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match args.command {
        Command::Upload { device, by_name, kind, file, chunk_size_override } => {
            upload(filter_for(&device, by_name), kind.into(), &file, chunk_size_override).await
        },
        Command::Info { device, by_name } => info(filter_for(&device, by_name)).await,
        Command::Browse { device, by_name, path } => browse(filter_for(&device, by_name), &path).await,
    }
}

async fn upload(
    filter: DeviceFilter,
    kind: UploadKind,
    file: &PathBuf,
    chunk_size_override: Option<u16>,
) -> Result<()> {
    let payload = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    tracing::info!(bytes = payload.len(), path = %file.display(), "loaded payload");

    let link = ledbadge_transport::connect(filter, DEFAULT_SCAN_TIMEOUT)
        .await
        .context("connecting to badge")?;
    let bus = NotificationBus::spawn(link.transport.clone()).await.context("spawning notification bus")?;
    let connection = Arc::new(ConnectionState::new());

    let mut config = UploadConfig::default();
    if let Some(chunk_size) = chunk_size_override {
        config.chunk_size_fallback = chunk_size;
    }

    let session = UploadSession::new(link.transport.clone(), bus, connection, SystemEnv::new(), config);
    let cancel = session.cancel_handle();
    let _ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("cancellation requested");
            cancel.cancel();
        }
    });

    session
        .upload_with_progress(
            payload,
            kind,
            Some(Arc::new(|sent, total| {
                tracing::info!(sent, total, "upload progress");
            })),
        )
        .await
        .context("upload failed")?;

    tracing::info!("upload complete");
    Ok(())
}

async fn info(filter: DeviceFilter) -> Result<()> {
    let link = ledbadge_transport::connect(filter, DEFAULT_SCAN_TIMEOUT).await.context("connecting to badge")?;
    let bus = NotificationBus::spawn(link.transport.clone()).await.context("spawning notification bus")?;
    let connection = ConnectionState::new();
    AuthEngine::new(link.transport.clone(), bus.clone())
        .authenticate(&connection)
        .await
        .context("auth handshake")?;
    let client = RcspClient::new(link.transport.clone(), bus, Duration::from_secs(8));

    let feature_map = client.get_target_feature_map(&connection.rcsp_seq).await.context("GetTargetFeatureMap")?;
    tracing::info!(feature_map = format!("{feature_map:#010x}"), "target feature map");

    let battery = client.req_data(&connection).await.context("ReqData (battery)")?;
    tracing::info!(status = battery.0, level = battery.1, "battery status");

    let screen = client.req_screen_info(&connection).await.context("ReqScreenInfo")?;
    tracing::info!(
        width = screen.width,
        height = screen.height,
        picture_width = screen.picture_width,
        picture_height = screen.picture_height,
        memory = screen.memory,
        "screen info"
    );

    Ok(())
}

async fn browse(filter: DeviceFilter, path: &str) -> Result<()> {
    let link = ledbadge_transport::connect(filter, DEFAULT_SCAN_TIMEOUT).await.context("connecting to badge")?;
    let bus = NotificationBus::spawn(link.transport.clone()).await.context("spawning notification bus")?;
    let connection = ConnectionState::new();
    AuthEngine::new(link.transport.clone(), bus.clone())
        .authenticate(&connection)
        .await
        .context("auth handshake")?;
    let client = RcspClient::new(link.transport.clone(), bus, Duration::from_secs(8));

    if path.len() > u16::MAX as usize {
        bail!("path too long to encode in a 16-bit length prefix");
    }

    let entries = client
        .start_file_browse(&connection.rcsp_seq, 0x00, 0xFF, 0, 0, path.as_bytes())
        .await
        .context("StartFileBrowse")?;
    tracing::info!(bytes = entries.len(), "raw directory listing body");
    client.stop_file_browse(&connection.rcsp_seq).await.context("StopFileBrowse")?;

    Ok(())
}
