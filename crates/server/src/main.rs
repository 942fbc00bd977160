use std::time::Duration;

use animelog_scanner::ScanConfig;
use animelog_scanner::feed::SystemClock;
use animelog_scanner::replay::ReplayFeed;
use animelog_scanner::scan::ScanSession;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn env_millis(name: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(v) => {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("{name} must be a number of milliseconds"))?;
            Ok(Some(Duration::from_millis(ms)))
        }
        Err(_) => Ok(None),
    }
}

fn scan_config() -> anyhow::Result<ScanConfig> {
    let mut config = ScanConfig::default();
    if let Some(delay) = env_millis("ANIMELOG_SCROLL_DELAY_MS")? {
        config.scroll_delay = delay;
    }
    if let Some(interval) = env_millis("ANIMELOG_QUICK_INTERVAL_MS")? {
        config.quick_scan_interval = interval;
    }
    Ok(config)
}

fn load_feed() -> anyhow::Result<ReplayFeed> {
    let Ok(path) = std::env::var("ANIMELOG_FEED") else {
        info!("no ANIMELOG_FEED set, scanning an empty feed");
        return Ok(ReplayFeed::new(Vec::new()));
    };
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read captured feed {path}"))?;
    let feed = ReplayFeed::from_json(&json).context("failed to parse captured feed")?;
    info!(path = %path, entries = feed.len(), "loaded captured feed");
    Ok(feed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_path = std::env::var("ANIMELOG_DB").unwrap_or_else(|_| "animelog.db".to_string());
    info!(db_path = %db_path, "connecting to database");

    let pool = animelog_db::connect(&db_path)
        .await
        .context("failed to connect to database")?;
    animelog_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations complete");

    let config = scan_config()?;
    info!(?config, "scan configuration");
    let (session, scan_events) = ScanSession::new(load_feed()?, SystemClock, config);

    let app_state = animelog_server::start_services(pool, session, scan_events);

    // Spawn heartbeat emitter
    {
        let tx = app_state.events.clone();
        tokio::spawn(async move {
            let mut seq = 0u64;
            loop {
                tokio::time::sleep(Duration::from_secs(30)).await;
                let _ = tx.send(animelog_server::state::ServerEvent::Heartbeat { seq });
                seq += 1;
            }
        });
    }

    let app = animelog_server::routes::build_router(app_state);

    let bind_addr =
        std::env::var("ANIMELOG_BIND").unwrap_or_else(|_| "127.0.0.1:8097".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
