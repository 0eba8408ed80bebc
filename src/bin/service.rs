use anyhow::Context as _;
use clap::Parser;
use facegate::{
    auth::{FaceGate, SessionIssuer},
    common::{config::ADMIN_PASSWORD_ENV, setup_logging, Config, Paths},
    core::OnnxExtractor,
    service::ServiceServer,
    storage::{FailedLoginLog, FileIdentityStore},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "facegate-service")]
#[command(about = "FaceGate login service")]
struct Args {
    /// Run in development mode (local config, data and socket)
    #[arg(long)]
    dev: bool,

    /// Run with system-wide paths
    #[arg(long)]
    system: bool,

    /// Config file to load instead of the mode's default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Socket path to listen on
    #[arg(long)]
    socket: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let paths = Paths::new(args.dev, args.system)?;
    let config_path = args.config.clone().unwrap_or_else(|| paths.config_file());
    let config = Config::load_from_path(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    setup_logging(paths.is_development(), config.logging.file.as_deref())?;
    tracing::info!("Starting FaceGate service ({:?})", paths.mode());

    let paths = paths.with_data_dir(config.storage.data_dir.clone());
    let registry = FileIdentityStore::new(paths.users_dir())?;
    let audit = FailedLoginLog::new(paths.audit_log())?;
    let extractor = OnnxExtractor::new(&config, paths.models_dir().as_deref())
        .context("Failed to load face models")?;

    let secret = config.jwt_secret()?;
    let sessions = SessionIssuer::new(
        secret.as_bytes(),
        config.auth.token_ttl_hours,
        &config.auth.admin_username,
    )?;

    let gate = FaceGate::new(
        &config,
        Box::new(extractor),
        Box::new(registry),
        Box::new(audit),
        sessions,
    );

    let admin_password = std::env::var(ADMIN_PASSWORD_ENV).ok();
    if gate.bootstrap_admin(admin_password.as_deref())? {
        tracing::info!("Admin account '{}' bootstrapped", config.auth.admin_username);
    }

    let socket_path = args
        .socket
        .or_else(|| config.service.socket_path.clone())
        .unwrap_or_else(|| paths.socket_path());
    let server = ServiceServer::bind(&socket_path, &config.service)
        .with_context(|| format!("Failed to bind {}", socket_path.display()))?;

    server.serve(&gate)?;
    Ok(())
}
