use source_proxy::StdError;
use source_proxy::config::ProxyConfig;
use source_proxy::policy::Policy;
use source_proxy::service::ProxyServiceBuilder;
use source_proxy_fs::FileSystem;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(version)]
struct Opt {
    /// Host name to listen on.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port number to listen on.
    #[arg(long, default_value = "8014")]
    port: u16,

    /// JSON policy file listing API keys and access rules.
    ///
    /// Without a policy every object request is forbidden.
    #[arg(long)]
    policy: Option<PathBuf>,

    /// JSON proxy configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured filename match expression.
    #[arg(long)]
    match_expression: Option<String>,

    /// Root directory of stored objects.
    #[arg(long)]
    root: PathBuf,
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env();
    let enable_color = std::io::stdout().is_terminal();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(env_filter)
        .with_ansi(enable_color)
        .init();
}

fn check_cli_args(opt: &Opt) -> Result<(), StdError> {
    if !opt.root.is_dir() {
        return Err(format!("root directory {:?} does not exist", opt.root).into());
    }
    Ok(())
}

fn main() -> Result<(), StdError> {
    let opt = Opt::parse();
    check_cli_args(&opt)?;
    setup_tracing();
    run(opt)
}

#[tokio::main]
async fn run(opt: Opt) -> Result<(), StdError> {
    let mut config = match opt.config {
        Some(ref path) => ProxyConfig::from_file(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(match_expression) = opt.match_expression {
        config.match_expression = match_expression;
    }

    let policy = match opt.policy {
        Some(ref path) => Policy::from_file(path)?,
        None => Policy::default(),
    };
    info!(?policy, match_expression = %config.match_expression, "loaded configuration");
    let (keys, permissions) = policy.into_parts();

    let fs = FileSystem::new(&opt.root)?;

    let service = {
        let mut b = ProxyServiceBuilder::new(fs);
        b.set_config(config);
        b.set_key_resolver(keys);
        b.set_permissions(permissions);
        b.build()?
    };

    let listener = TcpListener::bind((opt.host.as_str(), opt.port)).await?;
    let local_addr = listener.local_addr()?;
    info!(root = %opt.root.display(), "server is running at http://{local_addr}");

    axum::serve(listener, service.router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl+C, shutting down");
        })
        .await?;

    info!("server is stopped");
    Ok(())
}
