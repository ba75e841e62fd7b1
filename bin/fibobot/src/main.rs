use std::sync::Arc;

use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{CandleSource, Config, Notifier, SignalStore};
use engine::{
    FileConfig, Jobs, RateLimiter, Scheduler, SchedulerCommand, SqliteStore, TwelveDataClient,
};
use strategy::Scanner;
use telegram_ctrl::{start_bot, BotDeps, TelegramNotifier};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let file = FileConfig::load(&cfg.config_path);
    info!(
        pairs = file.scanner.pairs.len(),
        daily_scan_time = %file.schedule.daily_scan_time,
        "FiboBot starting"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to open database: {e}"));
    info!("Database ready");
    let store: Arc<dyn SignalStore> = Arc::new(store);

    // ── Market data ───────────────────────────────────────────────────────────
    let limiter = RateLimiter::new(
        file.market_data.requests_per_minute,
        file.market_data.daily_credit_limit,
    );
    let source: Arc<dyn CandleSource> = Arc::new(
        TwelveDataClient::new(cfg.twelvedata_api_key.clone(), limiter)
            .unwrap_or_else(|e| panic!("Failed to build market data client: {e}")),
    );

    // ── Telegram ──────────────────────────────────────────────────────────────
    let bot = Bot::new(cfg.telegram_token.clone());
    let notifier: Arc<dyn Notifier> =
        Arc::new(TelegramNotifier::new(bot.clone(), cfg.telegram_chat_id));

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let scanner = Scanner::new(source.clone(), store.clone(), file.scanner.clone());
    let jobs = Jobs::new(scanner, store.clone(), source.clone(), notifier);
    let (scheduler, scheduler_handle) = Scheduler::new(jobs, &file.schedule)
        .unwrap_or_else(|e| panic!("Invalid schedule config: {e}"));

    let bot_deps = BotDeps {
        store: store.clone(),
        source,
        scheduler: scheduler_handle.clone(),
        allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
        pair_count: file.scanner.pairs.len(),
        daily_scan_time: file.schedule.daily_scan_time.clone(),
    };

    // ── HTTP ──────────────────────────────────────────────────────────────────
    let api_state = api::AppState {
        store,
        scheduler: scheduler_handle.clone(),
        dashboard_token: cfg.dashboard_token.clone(),
    };
    let port = cfg.port;

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let scheduler_task = tokio::spawn(scheduler.run());
    tokio::spawn(start_bot(bot, bot_deps));
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "HTTP server stopped");
        }
    });

    info!("All subsystems started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Stopping scheduler.");
    scheduler_handle.send(SchedulerCommand::Shutdown).await;
    let _ = scheduler_task.await;
}
