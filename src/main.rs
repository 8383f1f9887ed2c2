use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use schlangen::config::{self, GameConfig};
use schlangen::error::ServerError;
use schlangen::game::engine::Game;
use schlangen::server;

#[derive(Parser, Debug)]
#[command(name = "schlangen", version, about = "Authoritative multiplayer snake arena server")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    // Per-field overrides; anything set here wins over the config file.
    #[arg(long)]
    world_size: Option<u32>,
    #[arg(long)]
    food_count: Option<usize>,
    #[arg(long)]
    ai_count: Option<usize>,
    #[arg(long)]
    base_speed: Option<f64>,
    #[arg(long)]
    boost_speed: Option<f64>,
    #[arg(long)]
    turn_speed: Option<f64>,
    #[arg(long)]
    max_boost: Option<f64>,
    #[arg(long)]
    boost_drain: Option<f64>,
    #[arg(long)]
    boost_regen: Option<f64>,
    #[arg(long)]
    base_snake_len: Option<usize>,
    #[arg(long)]
    kill_food_count: Option<usize>,
    #[arg(long)]
    boundary_margin: Option<f64>,
    #[arg(long)]
    ai_respawn_ticks: Option<i32>,
    #[arg(long)]
    tick_rate: Option<u32>,
}

fn build_config(args: &Args) -> Result<GameConfig, ServerError> {
    let mut cfg = match &args.config {
        Some(path) => {
            let cfg = GameConfig::from_file(path)?;
            info!(path = %path.display(), "loaded config file");
            cfg
        }
        None => GameConfig::default(),
    };

    macro_rules! apply {
        ($($field:ident),* $(,)?) => {
            $(if let Some(v) = args.$field {
                cfg.$field = v;
            })*
        };
    }
    apply!(
        world_size,
        food_count,
        ai_count,
        base_speed,
        boost_speed,
        turn_speed,
        max_boost,
        boost_drain,
        boost_regen,
        base_snake_len,
        kill_food_count,
        boundary_margin,
        ai_respawn_ticks,
        tick_rate,
    );
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = build_config(&args)?;
    info!(
        world_size = cfg.world_size,
        food = cfg.food_count,
        ai = cfg.ai_count,
        speed = cfg.base_speed,
        boost = cfg.boost_speed,
        "config",
    );

    let (game, handle) = Game::new(cfg);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let game_task = tokio::spawn(game.run(shutdown_rx));

    let app = server::router(handle);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(version = env!("CARGO_PKG_VERSION"), %addr, "server listening");
    info!("WebSocket: ws://{addr}/ws");
    info!("Dashboard: http://{addr}/dashboard");

    tokio::select! {
        res = async { axum::serve(listener, app).await } => res?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }

    // Acceptor is down; the tick loop finishes its current tick and
    // exits, then open sessions die with the process.
    let _ = shutdown_tx.send(true);
    let _ = game_task.await;
    Ok(())
}
