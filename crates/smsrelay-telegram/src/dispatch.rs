//! Update dispatcher wiring.
//!
//! Inbound relay messages arrive by subscription: teloxide long-polls
//! getUpdates and pushes each new message through the dptree handler, so no
//! history cursor is needed on the live path.

use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use tracing::info;

use smsrelay_core::{
    config::Config,
    domain::ChatId,
    messaging::MessagingPort,
    report::{ReportScheduler, ReportSettings},
    store::InterestStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<Mutex<InterestStore>>,
    pub messenger: Arc<dyn MessagingPort>,
}

pub async fn run(cfg: Arc<Config>, store: Arc<Mutex<InterestStore>>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("smsrelay started as @{}", me.username());
    }
    info!(
        "source chat {}, relay sender {}, {} operator(s)",
        cfg.source_chat_id,
        cfg.relay_sender_id,
        cfg.operator_user_ids.len()
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let cancel = CancellationToken::new();
    let scheduler = ReportScheduler::new(
        ReportSettings {
            report_chat: ChatId(cfg.report_chat_id),
            hour: cfg.report_hour,
            minute: cfg.report_minute,
            offset: cfg.report_offset,
        },
        store.clone(),
        messenger.clone(),
    );
    let scheduler_cancel = cancel.clone();
    tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
    });

    let state = Arc::new(AppState {
        cfg,
        store,
        messenger,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    cancel.cancel();
    info!("dispatcher stopped");
    Ok(())
}
