use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use honeypot_node::config::Config;
use honeypot_node::events::{EventRecorder, InstanceInfo, JsonlEventLog};
use honeypot_node::geolocation::GeoLocator;
use honeypot_node::http_service::HttpService;
use honeypot_node::listener;
use honeypot_node::management::ManagementApi;
use honeypot_node::router::Router;
use honeypot_node::rtsp::RtspService;
use honeypot_node::ssh::{self, SshService};

/// Multi-protocol deception node
#[derive(Parser, Debug)]
#[command(name = "honeypot-node")]
#[command(version)]
#[command(about = "HTTP, SSH and RTSP honeypot with switchable personas", long_about = None)]
struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Active persona (overrides config and HONEYPOT_PROFILE)
    #[arg(short, long)]
    profile: Option<String>,

    /// Event log directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", toml::to_string_pretty(&Config::default())?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env();
    if let Some(profile) = &args.profile {
        config.set_profile(profile);
    }
    if let Some(dir) = args.log_dir {
        config.logging.dir = dir;
    }

    let default_level = if args.verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    config.validate()?;

    info!("Starting honeypot node v{}", env!("CARGO_PKG_VERSION"));
    info!("  Instance: {} ({})", config.instance.name, config.instance.environment);
    info!("  Profile: {}", config.profile.active);
    info!("  Event log: {}", config.logging.dir.display());

    let router = Arc::new(Router::from_config(&config));
    let recorder = EventRecorder::new(
        Arc::new(JsonlEventLog::new(&config.logging.dir)),
        Arc::new(GeoLocator::new(&config.geolocation)),
        InstanceInfo::from(&config.instance),
        &config.logging,
    );
    let timeout = config.network.socket_timeout();

    let http = listener::bind("HTTP", &config.http.host, config.http.port).await?;
    let http_service = Arc::new(HttpService::new(router.clone(), recorder.clone(), &config));
    tokio::spawn(listener::serve(http, "HTTP", timeout, http_service));

    if config.ssh.enabled {
        let host_key = ssh::load_or_generate_host_key(&config.ssh.host_key_path)?;
        let ssh_listener = listener::bind("SSH", &config.ssh.host, config.ssh.port).await?;
        let ssh_service = Arc::new(
            SshService::new(&config.ssh, host_key, recorder.clone(), timeout)
                .with_line_limit(config.network.buffer_size),
        );
        tokio::spawn(listener::serve(
            ssh_listener,
            "SSH",
            config.ssh.session_timeout(),
            ssh_service,
        ));
    }

    if config.rtsp.enabled {
        let rtsp = listener::bind("RTSP", &config.rtsp.host, config.rtsp.port).await?;
        let rtsp_service = Arc::new(RtspService::new(recorder.clone(), config.network.buffer_size));
        tokio::spawn(listener::serve(rtsp, "RTSP", timeout, rtsp_service));
    }

    if config.management.enabled {
        let addr: SocketAddr = format!("{}:{}", config.management.host, config.management.port).parse()?;
        let api = Arc::new(ManagementApi::new(router.clone(), &config.logging.dir));
        tokio::spawn(async move {
            if let Err(e) = api.serve(addr).await {
                error!("Management API error: {}", e);
            }
        });
    }

    info!("Honeypot ready! Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down honeypot...");

    Ok(())
}
