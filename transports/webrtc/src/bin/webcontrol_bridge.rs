//! WebControl signaling bridge binary entry point
//!
//! Listens for a display surface on a WebSocket and bridges it to a WebRTC
//! peer connection.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address with the default STUN server
//! cargo run --bin webcontrol_bridge
//!
//! # Custom STUN servers and data channel label
//! cargo run --bin webcontrol_bridge -- \
//!   --listen 0.0.0.0:8765 \
//!   --stun-servers stun:stun.example.org:19302 \
//!   --label Control
//!
//! # Load a TOML configuration, overriding the glare policy
//! cargo run --bin webcontrol_bridge -- \
//!   --config ./bridge.toml \
//!   --glare-policy rollback-local
//! ```

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webcontrol_webrtc::{BridgeConfig, DataChannelMode, GlarePolicy, WebSocketSignalingServer};

/// WebControl signaling bridge
///
/// Accepts one display surface connection at a time and negotiates a
/// WebRTC session on its behalf.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the WebSocket signaling server listens on
    #[arg(long, default_value = "127.0.0.1:8765", env = "WEBCONTROL_LISTEN")]
    listen: SocketAddr,

    /// TOML configuration file; flags below override its values
    #[arg(short, long, env = "WEBCONTROL_CONFIG")]
    config: Option<PathBuf>,

    /// STUN servers (comma-separated)
    #[arg(long, value_delimiter = ',', env = "WEBCONTROL_STUN_SERVERS")]
    stun_servers: Vec<String>,

    /// Data channel label
    #[arg(long, env = "WEBCONTROL_LABEL")]
    label: Option<String>,

    /// Data channel mode: reliable, unreliable
    #[arg(long, env = "WEBCONTROL_DATA_CHANNEL_MODE")]
    data_channel_mode: Option<DataChannelModeArg>,

    /// What to do when a remote offer collides with a pending local offer
    #[arg(long, env = "WEBCONTROL_GLARE_POLICY")]
    glare_policy: Option<GlarePolicyArg>,

    /// Forward removed local candidates to the display surface
    #[arg(long, env = "WEBCONTROL_RELAY_REMOVED")]
    relay_removed_candidates: bool,
}

/// Data channel mode CLI argument wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum DataChannelModeArg {
    Reliable,
    Unreliable,
}

impl From<DataChannelModeArg> for DataChannelMode {
    fn from(arg: DataChannelModeArg) -> Self {
        match arg {
            DataChannelModeArg::Reliable => DataChannelMode::Reliable,
            DataChannelModeArg::Unreliable => DataChannelMode::Unreliable,
        }
    }
}

/// Glare policy CLI argument wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum GlarePolicyArg {
    RejectRemote,
    RollbackLocal,
}

impl From<GlarePolicyArg> for GlarePolicy {
    fn from(arg: GlarePolicyArg) -> Self {
        match arg {
            GlarePolicyArg::RejectRemote => GlarePolicy::RejectRemote,
            GlarePolicyArg::RollbackLocal => GlarePolicy::RollbackLocal,
        }
    }
}

fn build_config_from_args(args: &Args) -> anyhow::Result<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    if !args.stun_servers.is_empty() {
        config.ice_servers = args.stun_servers.clone();
    }
    if let Some(label) = &args.label {
        config.data_channel_label = label.clone();
    }
    if let Some(mode) = args.data_channel_mode {
        config.data_channel_mode = mode.into();
    }
    if let Some(policy) = args.glare_policy {
        config.glare_policy = policy.into();
    }
    if args.relay_removed_candidates {
        config.relay_removed_candidates = true;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("webcontrol-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    init_tracing()?;

    info!(
        version = webcontrol_webrtc::version(),
        "WebControl signaling bridge starting"
    );

    let config = build_config_from_args(&args)?;
    info!(
        listen = %args.listen,
        ice_servers = ?config.ice_servers,
        turn_servers = config.turn_servers.len(),
        label = %config.data_channel_label,
        data_channel_mode = ?config.data_channel_mode,
        glare_policy = ?config.glare_policy,
        relay_removed_candidates = config.relay_removed_candidates,
        "Bridge configuration"
    );

    let server = WebSocketSignalingServer::new(args.listen, config);
    let handle = server
        .start()
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!("Waiting for display surface on ws://{}", handle.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");

    handle.shutdown().await;
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    // Initialize tracing with EnvFilter for RUST_LOG support
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}
