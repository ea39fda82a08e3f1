use anyhow::{Result, anyhow};
use movies_app::state::AppState;
use movies_server::config::{Parser, ServerConfig};
use movies_server::run::{build_state, run_graceful_with_state};
use rand::Rng as _;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::{debug, info};

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

/// Keeps test data alive, server is stopped when dropped
pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}/", port);
    let args = &[
        "movies-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
            shutdown: None,
        },
    ))
}

/// Test config with database already created and migrated
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let (args, guard) = test_config(test_name)?;
    let pool = movies_dal::new_pool(&args.database_url()).await?;
    movies_dal::migrate(&pool).await?;
    pool.close().await;
    Ok((args, guard))
}

async fn wait_for_health(client: &reqwest::Client, args: &ServerConfig) -> Result<()> {
    let url = args.base_url.join("health")?;
    for _ in 0..50 {
        match client.get(url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start"))
}

/// Starts server in background task, it runs until the guard is dropped
pub async fn spawn_server(args: ServerConfig, guard: &mut ConfigGuard) -> Result<AppState> {
    let state = build_state(&args).await?;
    let (sender, receiver) = oneshot::channel::<()>();
    guard.shutdown = Some(sender);
    let server_state = state.clone();
    let server_args = args.clone();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = receiver.await;
        };
        if let Err(e) = run_graceful_with_state(server_args, server_state, shutdown).await {
            tracing::error!("Server failed: {e}");
        }
    });

    wait_for_health(&reqwest::Client::new(), &args).await?;
    info!("Test server listening on {}", args.base_url);
    Ok(state)
}

/// Starts server and returns client, which keeps cookies (and thus toasts)
pub async fn launch_env(
    args: ServerConfig,
    guard: &mut ConfigGuard,
) -> Result<(reqwest::Client, AppState)> {
    let state = spawn_server(args, guard).await?;
    let client = reqwest::Client::builder().cookie_store(true).build()?;
    Ok((client, state))
}
