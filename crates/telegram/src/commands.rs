use std::sync::Arc;

use chrono::{Duration, Utc};
use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

use common::{CandleSource, SignalStore};
use engine::{SchedulerCommand, SchedulerHandle};

use crate::format;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub store: Arc<dyn SignalStore>,
    /// Used only for API credit reporting.
    pub source: Arc<dyn CandleSource>,
    pub scheduler: SchedulerHandle,
    pub allowed_user_ids: Arc<Vec<i64>>,
    pub pair_count: usize,
    pub daily_scan_time: String,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "FiboBot commands:")]
pub enum Command {
    #[command(description = "Show the welcome message")]
    Start,
    #[command(description = "Aligned pairs and API credits")]
    Status,
    #[command(description = "Weekly and daily detail per pair")]
    Pairs,
    #[command(description = "Signals from the last 24 hours")]
    History,
    #[command(description = "Signal counts over the last 7 days (weekends only)")]
    Stats,
    #[command(description = "Run the daily and hourly passes now")]
    Scan,
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Pairs].endpoint(handle_pairs))
        .branch(case![Command::History].endpoint(handle_history))
        .branch(case![Command::Stats].endpoint(handle_stats))
        .branch(case![Command::Scan].endpoint(handle_scan));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = is_allowed(&deps.allowed_user_ids, uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

fn is_allowed(allowed_user_ids: &[i64], uid: i64) -> bool {
    allowed_user_ids.contains(&uid)
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let text = format::welcome(deps.pair_count, &deps.daily_scan_time);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let states = deps.store.pair_states().await?;
    let usage = deps.source.usage().await;
    let snapshot = deps.scheduler.snapshot().await;
    let text = format::status(&states, usage, snapshot.last_daily, snapshot.last_hourly);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_pairs(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let states = deps.store.pair_states().await?;
    bot.send_message(msg.chat.id, format::pairs_detail(&states)).await?;
    Ok(())
}

async fn handle_history(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let signals = deps.store.recent_signals(Duration::hours(24), None).await?;
    bot.send_message(msg.chat.id, format::history(&signals)).await?;
    Ok(())
}

async fn handle_stats(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    if !format::is_weekend(Utc::now()) {
        bot.send_message(msg.chat.id, "Statistics are only available on weekends.")
            .await?;
        return Ok(());
    }
    let signals = deps.store.recent_signals(Duration::days(7), None).await?;
    bot.send_message(msg.chat.id, format::stats(&signals)).await?;
    Ok(())
}

async fn handle_scan(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    deps.scheduler.send(SchedulerCommand::RunDaily).await;
    deps.scheduler.send(SchedulerCommand::RunHourly).await;
    bot.send_message(
        msg.chat.id,
        "Scan queued. Signals and the daily summary will follow.",
    )
    .await?;
    Ok(())
}
