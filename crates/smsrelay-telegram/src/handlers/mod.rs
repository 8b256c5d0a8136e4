//! Telegram update handlers.
//!
//! Two paths through `handle_message`: messages in the configured source
//! chat are relay intake (sender-filtered, never commands), everything else
//! only matters when it is an operator command.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::dispatch::AppState;

mod commands;
mod relay;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.chat.id.0 == state.cfg.source_chat_id {
        return relay::handle_relay(msg, state).await;
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
    }

    Ok(())
}
