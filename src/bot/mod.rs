//! Telegram command surface
//!
//! One admin user controls the bot through commands; messages from anyone
//! else are rejected without side effects. Control commands talk to the
//! scheduler handle and the shared cycle runner; `send_batch` and
//! `rotate_source` go through the same `try_lock` as scheduled ticks and
//! report busy instead of queueing behind a running cycle.

pub mod poster;

pub use poster::{Poster, TelegramPoster};

use crate::batch::CycleRunner;
use crate::scheduler::{self, SchedulerHandle};
use crate::storage::StatsTracker;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Wallpaper bot commands:")]
pub enum Command {
    #[command(description = "start the automatic scheduler")]
    Start,
    #[command(description = "stop the scheduler after the current cycle")]
    Stop,
    #[command(description = "show run state and source rotation")]
    Status,
    #[command(description = "show posting statistics")]
    Stats,
    #[command(description = "post one batch now")]
    SendBatch,
    #[command(description = "advance to the next wallpaper source")]
    RotateSource,
    #[command(description = "show this help")]
    Help,
}

/// Shared state injected into the dispatcher
pub struct BotState {
    pub admin_user_id: u64,
    pub quota: usize,
    pub interval_hours: u64,
    pub channel_id: String,
    pub runner: Arc<Mutex<CycleRunner>>,
    pub stats: Arc<Mutex<StatsTracker>>,
    pub scheduler: SchedulerHandle,
}

/// Run the long-polling dispatcher until shutdown
pub async fn run_dispatcher(bot: Bot, state: Arc<BotState>) {
    info!("command dispatcher starting");

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn is_admin(msg: &Message, state: &BotState) -> bool {
    msg.from.as_ref().map(|user| user.id.0) == Some(state.admin_user_id)
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    if !is_admin(&msg, &state) {
        warn!(chat = %msg.chat.id, "command from non-admin rejected");
        bot.send_message(msg.chat.id, "⛔ You are not authorized to control this bot.")
            .await?;
        return Ok(());
    }

    let reply = match cmd {
        Command::Start => {
            if state.scheduler.start() {
                format!(
                    "🟢 Scheduler started: {} wallpapers to {} every {} hour(s).",
                    state.quota, state.channel_id, state.interval_hours
                )
            } else {
                "Scheduler is already running.".to_string()
            }
        }

        Command::Stop => {
            if state.scheduler.stop() {
                "🔴 Scheduler stopping. An in-flight cycle will finish first.".to_string()
            } else {
                "Scheduler is not running.".to_string()
            }
        }

        Command::Status => status_text(&state).await,

        Command::Stats => stats_text(&state).await,

        Command::SendBatch => match scheduler::try_fire(&state.runner).await {
            Some(result) if result.is_success() => format!(
                "✅ Batch sent: {}/{} wallpapers from {} ({} candidates considered).",
                result.sent,
                state.quota,
                result.source.display_name(),
                result.attempted
            ),
            Some(result) => format!(
                "⚠️ Batch failed: no source could be queried (last tried {}).",
                result.source.display_name()
            ),
            None => "⏳ A cycle is already running, try again in a moment.".to_string(),
        },

        Command::RotateSource => match state.runner.try_lock() {
            Ok(mut runner) => {
                let (old, new) = runner.rotate_source();
                format!(
                    "🔄 Source rotated: {} -> {}.",
                    old.display_name(),
                    new.display_name()
                )
            }
            Err(_) => "⏳ A cycle is already running, try again in a moment.".to_string(),
        },

        Command::Help => Command::descriptions().to_string(),
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    // only nudge the admin; strangers get silence
    if is_admin(&msg, &state) {
        bot.send_message(msg.chat.id, "Use /help to see available commands.")
            .await?;
    }
    Ok(())
}

async fn status_text(state: &BotState) -> String {
    let run_state = if state.scheduler.is_running() {
        "🟢 Running"
    } else {
        "🔴 Stopped"
    };

    let (current, next, seen) = match state.runner.try_lock() {
        Ok(runner) => (
            runner.current_source().display_name().to_string(),
            runner.next_source().display_name().to_string(),
            runner.seen_count().to_string(),
        ),
        Err(_) => (
            "(cycle in flight)".to_string(),
            "(cycle in flight)".to_string(),
            "?".to_string(),
        ),
    };

    let stats_guard = state.stats.lock().await;
    let stats = stats_guard.stats();
    let last_cycle = stats
        .last_cycle_time
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "📊 Status\n\
         State: {run_state}\n\
         Current source: {current}\n\
         Next source: {next}\n\
         Channel: {channel}\n\
         Last cycle: {last_cycle}\n\
         Total sent: {total}\n\
         Seen images: {seen}",
        channel = state.channel_id,
        total = stats.total_sent,
    )
}

async fn stats_text(state: &BotState) -> String {
    let stats_guard = state.stats.lock().await;
    let stats = stats_guard.stats();

    let mut text = format!(
        "📈 Statistics\n\
         Total sent: {}\n\
         Cycles: {} ok / {} failed ({:.0}% success)\n\
         Filtered candidates: {}\n\
         Retry exhaustions: {}\n\
         Tracking since: {}\n",
        stats.total_sent,
        stats.successful_cycles,
        stats.failed_cycles,
        stats.success_rate() * 100.0,
        stats.filtered_images,
        stats.retry_exhaustions,
        stats.start_time.format("%Y-%m-%d"),
    );

    text.push_str("\nPer source:\n");
    for (source, count) in &stats.sources_used {
        text.push_str(&format!("  {source}: {count}\n"));
    }

    let recent = stats.recent_daily(7);
    if !recent.is_empty() {
        text.push_str("\nLast days:\n");
        for (day, count) in recent {
            text.push_str(&format!("  {day}: {count}\n"));
        }
    }

    text
}
